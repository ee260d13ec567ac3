//! Crowdsourcing configuration
//!
//! Loaded from the `settings` table at startup, with environment
//! variable overrides for deployment without touching the database.

use crate::db::get_setting;
use crate::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::info;

/// Configuration consumed by the consensus engine and query resolver
#[derive(Debug, Clone)]
pub struct CrowdConfig {
    /// Codes with `confirms < confidence_threshold` (and not persisted)
    /// are withheld from query results
    pub confidence_threshold: i64,
    /// Minimum time since a record's last update before a matching
    /// re-submission counts as a confirmation
    pub grace_interval_ms: i64,
    /// User names whose submissions bypass consensus entirely
    pub privileged_users: HashSet<String>,
    /// Bound on every individual store operation
    pub store_timeout_ms: u64,
    /// Idle sessions older than this are evicted
    pub session_idle_timeout_ms: u64,
}

impl CrowdConfig {
    /// Load configuration from the settings table, then apply
    /// environment overrides (`CODIBOT_CONFIDENCE`,
    /// `CODIBOT_GRACE_INTERVAL_MS`, `CODIBOT_PRIVILEGED_USERS`).
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let confidence_threshold = read_i64(pool, "confidence_threshold", 2).await?;
        let grace_interval_ms = read_i64(pool, "grace_interval_ms", 3_600_000).await?;
        let store_timeout_ms =
            read_non_negative(pool, "store_timeout_ms", 5_000).await? as u64;
        let session_idle_timeout_ms =
            read_non_negative(pool, "session_idle_timeout_ms", 900_000).await? as u64;

        let privileged_raw = get_setting(pool, "privileged_users")
            .await?
            .unwrap_or_default();

        let mut config = Self {
            confidence_threshold,
            grace_interval_ms,
            privileged_users: parse_user_list(&privileged_raw),
            store_timeout_ms,
            session_idle_timeout_ms,
        };
        config.apply_env_overrides()?;

        if config.confidence_threshold < 0 {
            return Err(Error::Config(format!(
                "confidence_threshold must be >= 0, got {}",
                config.confidence_threshold
            )));
        }
        if config.grace_interval_ms < 0 {
            return Err(Error::Config(format!(
                "grace_interval_ms must be >= 0, got {}",
                config.grace_interval_ms
            )));
        }

        info!(
            "Crowd config: confidence_threshold={}, grace_interval_ms={}, {} privileged user(s)",
            config.confidence_threshold,
            config.grace_interval_ms,
            config.privileged_users.len()
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("CODIBOT_CONFIDENCE") {
            self.confidence_threshold = v
                .parse()
                .map_err(|_| Error::Config(format!("CODIBOT_CONFIDENCE not an integer: {v}")))?;
        }
        if let Ok(v) = std::env::var("CODIBOT_GRACE_INTERVAL_MS") {
            self.grace_interval_ms = v.parse().map_err(|_| {
                Error::Config(format!("CODIBOT_GRACE_INTERVAL_MS not an integer: {v}"))
            })?;
        }
        if let Ok(v) = std::env::var("CODIBOT_PRIVILEGED_USERS") {
            self.privileged_users = parse_user_list(&v);
        }
        Ok(())
    }

    /// Whether the given user name (if any) is on the allow-list.
    /// Identification is by user name, not user id: the allow-list is
    /// maintained by hand.
    pub fn is_privileged(&self, user_name: Option<&str>) -> bool {
        user_name
            .map(|name| self.privileged_users.contains(name))
            .unwrap_or(false)
    }
}

impl Default for CrowdConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 2,
            grace_interval_ms: 3_600_000,
            privileged_users: HashSet::new(),
            store_timeout_ms: 5_000,
            session_idle_timeout_ms: 900_000,
        }
    }
}

async fn read_i64(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    match get_setting(pool, key).await? {
        Some(v) => v
            .parse()
            .map_err(|_| Error::Config(format!("setting '{key}' not an integer: {v}"))),
        None => Ok(default),
    }
}

/// Like `read_i64`, but rejects negative values instead of letting a
/// later unsigned cast wrap them around
async fn read_non_negative(pool: &SqlitePool, key: &str, default: i64) -> Result<i64> {
    let value = read_i64(pool, key, default).await?;
    if value < 0 {
        return Err(Error::Config(format!(
            "setting '{key}' must be >= 0, got {value}"
        )));
    }
    Ok(value)
}

fn parse_user_list(raw: &str) -> HashSet<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
