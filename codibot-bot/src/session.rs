//! Per-user dialogue session tracking
//!
//! Each user has at most one session: an explicit phase in the feed
//! dialogue plus the vehicle name carried between steps. Sessions live
//! in process memory only; the dialogue is short-lived and losing it on
//! restart is acceptable. Idle sessions are evicted to bound memory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Where a user is inside the multi-turn feed dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingVehicleIdentifier,
    AwaitingCodeForTrain,
    AwaitingCodeForBus,
}

/// Transient dialogue state for one user
#[derive(Debug)]
pub struct Session {
    pub phase: Phase,
    pub pending_vehicle_name: Option<String>,
    last_active: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            pending_vehicle_name: None,
            last_active: Instant::now(),
        }
    }

    /// Back to Idle with no carried context
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.pending_vehicle_name = None;
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

/// Concurrency-safe map of user id to session
///
/// Handing out an `Arc<Mutex<Session>>` per user makes each user's
/// dialogue step atomic while keeping different users fully independent.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session handle for a user, created implicitly on first contact
    pub async fn get(&self, user_id: &str) -> Arc<Mutex<Session>> {
        // Common case: session already exists
        {
            let map = self.inner.read().await;
            if let Some(session) = map.get(user_id) {
                return Arc::clone(session);
            }
        }

        let mut map = self.inner.write().await;
        Arc::clone(
            map.entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new()))),
        )
    }

    /// Drop sessions idle for longer than `idle_timeout`. Sessions whose
    /// lock is currently held are in use and skipped. Returns the number
    /// evicted.
    pub async fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, session| match session.try_lock() {
            Ok(guard) => guard.last_active.elapsed() < idle_timeout,
            Err(_) => true,
        });
        let evicted = before - map.len();
        if evicted > 0 {
            debug!("Evicted {} idle session(s), {} remain", evicted, map.len());
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
