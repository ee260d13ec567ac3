//! Query resolver
//!
//! Read path: given a (vehicle kind, vehicle name) key, returns the
//! codes currently considered authoritative.

use crate::store::CodeStore;
use codibot_common::config::CrowdConfig;
use codibot_common::db::VehicleKind;
use codibot_common::Result;
use tracing::debug;

#[derive(Clone)]
pub struct QueryResolver {
    store: CodeStore,
    confidence_threshold: i64,
}

impl QueryResolver {
    pub fn new(store: CodeStore, config: &CrowdConfig) -> Self {
        Self {
            store,
            confidence_threshold: config.confidence_threshold,
        }
    }

    /// All authoritative codes for the key, in retrieval order.
    /// An empty result is a normal outcome, not an error.
    pub async fn resolve(&self, kind: VehicleKind, name: &str) -> Result<Vec<String>> {
        let codes = self
            .store
            .query_confident(kind, name, self.confidence_threshold)
            .await?;

        debug!("Query {} {:?}: {} code(s)", kind, name, codes.len());
        Ok(codes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codibot_common::db::{connect_memory, CodeRecord};
    use std::time::Duration;

    fn record(code: &str, kind: VehicleKind, name: &str, confirms: i64, persist: bool) -> CodeRecord {
        CodeRecord {
            code: code.to_string(),
            vehicle_kind: kind,
            vehicle_name: name.to_string(),
            persist,
            confirms,
            submitted_by: "u1".to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn resolve_returns_confident_and_persisted_codes_only() {
        let pool = connect_memory().await.unwrap();
        let store = CodeStore::new(pool, Duration::from_secs(5));
        let resolver = QueryResolver::new(store.clone(), &CrowdConfig::default());

        // below threshold, not persisted: invisible
        store
            .insert(&record("TT100", VehicleKind::Bus, "402", 1, false))
            .await
            .unwrap();
        assert!(resolver
            .resolve(VehicleKind::Bus, "402")
            .await
            .unwrap()
            .is_empty());

        // persisted low-confidence record is visible
        store
            .insert(&record("TT200", VehicleKind::Bus, "402", 0, true))
            .await
            .unwrap();
        // at-threshold record is visible; several codes may share a name
        store
            .insert(&record("TT300", VehicleKind::Bus, "402", 2, false))
            .await
            .unwrap();

        let codes = resolver.resolve(VehicleKind::Bus, "402").await.unwrap();
        assert_eq!(codes, vec!["TT200".to_string(), "TT300".to_string()]);
    }
}
