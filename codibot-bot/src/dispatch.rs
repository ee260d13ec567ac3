//! Event dispatcher
//!
//! Routes each inbound event through the sender's session phase to the
//! read path (query resolver) or the write path (consensus engine), and
//! turns every outcome or error into reply text. No error escapes: a
//! failing event answers with the generic error reply and leaves every
//! other session untouched.

use crate::classify::{classify_feed_name, classify_query};
use crate::consensus::{ConsensusEngine, Outcome, Submission};
use crate::replies;
use crate::resolver::QueryResolver;
use crate::session::{Phase, SessionStore};
use crate::store::CodeStore;
use codibot_common::config::CrowdConfig;
use codibot_common::db::VehicleKind;
use codibot_common::events::{EventKind, InboundEvent};
use codibot_common::Result;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, warn};

pub struct Dispatcher {
    sessions: SessionStore,
    engine: ConsensusEngine,
    resolver: QueryResolver,
    config: CrowdConfig,
}

impl Dispatcher {
    pub fn new(db: SqlitePool, config: CrowdConfig) -> Self {
        let store = CodeStore::new(db, Duration::from_millis(config.store_timeout_ms));
        Self {
            sessions: SessionStore::new(),
            engine: ConsensusEngine::new(store.clone(), &config),
            resolver: QueryResolver::new(store, &config),
            config,
        }
    }

    /// Session store handle, for the background eviction task
    pub fn sessions(&self) -> SessionStore {
        self.sessions.clone()
    }

    /// Handle one inbound event and produce the ordered replies for it.
    /// Infallible by design: errors become the generic failure reply.
    pub async fn handle_event(&self, event: InboundEvent) -> Vec<String> {
        if event.is_bot {
            return vec![replies::NO_BOTS.to_string()];
        }

        match event.kind {
            EventKind::Start => {
                info!("Started: {}", event.user_id);
                vec![format!("{}\n{}", replies::GREETING, replies::HELP)]
            }
            EventKind::Help => vec![replies::HELP.to_string()],
            EventKind::Feed => self.begin_feed(&event).await,
            EventKind::Text => self.handle_text(&event).await,
        }
    }

    /// /feed: (re)start the dialogue, dropping any half-finished one
    async fn begin_feed(&self, event: &InboundEvent) -> Vec<String> {
        let handle = self.sessions.get(&event.user_id).await;
        let mut session = handle.lock().await;
        session.reset();
        session.phase = Phase::AwaitingVehicleIdentifier;
        session.touch();
        vec![replies::FEED_PROMPT.to_string()]
    }

    async fn handle_text(&self, event: &InboundEvent) -> Vec<String> {
        let handle = self.sessions.get(&event.user_id).await;
        let mut session = handle.lock().await;
        session.touch();

        match session.phase {
            Phase::AwaitingVehicleIdentifier => {
                match classify_feed_name(&event.text) {
                    Some((VehicleKind::Train, name)) => {
                        session.phase = Phase::AwaitingCodeForTrain;
                        let prompt = replies::code_prompt_train(&name);
                        session.pending_vehicle_name = Some(name);
                        vec![prompt]
                    }
                    Some((_, name)) => {
                        session.phase = Phase::AwaitingCodeForBus;
                        let prompt = replies::code_prompt_bus(&name);
                        session.pending_vehicle_name = Some(name);
                        vec![prompt]
                    }
                    None => {
                        // Abandon silently rather than pestering the user
                        session.reset();
                        vec![replies::NEVER_MIND.to_string()]
                    }
                }
            }
            Phase::AwaitingCodeForTrain => {
                self.finish_feed(&mut session, event, VehicleKind::Train)
                    .await
            }
            Phase::AwaitingCodeForBus => {
                self.finish_feed(&mut session, event, VehicleKind::Bus).await
            }
            Phase::Idle => self.answer_query(&event.text).await,
        }
    }

    /// Final dialogue step: the text is the submitted code for the
    /// carried vehicle name. The session returns to Idle regardless of
    /// the outcome.
    async fn finish_feed(
        &self,
        session: &mut crate::session::Session,
        event: &InboundEvent,
        kind: VehicleKind,
    ) -> Vec<String> {
        let Some(name) = session.pending_vehicle_name.take() else {
            session.reset();
            warn!("Session for {} had no pending vehicle name", event.user_id);
            return vec![replies::INTERNAL_ERROR.to_string()];
        };
        session.reset();

        let submission = Submission {
            vehicle_kind: kind,
            vehicle_name: name,
            raw_code: event.text.clone(),
            submitter_id: event.user_id.clone(),
            is_privileged: self.config.is_privileged(event.user_name.as_deref()),
        };

        match self.engine.submit(submission).await {
            Ok(Outcome::InvalidFormat) => vec![replies::INVALID_CODE.to_string()],
            Ok(Outcome::Acknowledged) => vec![replies::THANKS.to_string()],
            Ok(_) => vec![replies::THANKS_RECORDED.to_string()],
            Err(err) => {
                warn!("Submission by {} failed: {}", event.user_id, err);
                vec![replies::INTERNAL_ERROR.to_string()]
            }
        }
    }

    /// Idle text: classify and resolve, one reply per code
    async fn answer_query(&self, text: &str) -> Vec<String> {
        let Some((kind, name)) = classify_query(text) else {
            return vec![replies::DONT_UNDERSTAND.to_string()];
        };

        match self.resolve(kind, &name).await {
            Ok(codes) if codes.is_empty() => vec![replies::UNKNOWN_CODE.to_string()],
            Ok(codes) => codes,
            Err(err) => {
                warn!("Query for {} {:?} failed: {}", kind, name, err);
                vec![replies::INTERNAL_ERROR.to_string()]
            }
        }
    }

    async fn resolve(&self, kind: VehicleKind, name: &str) -> Result<Vec<String>> {
        self.resolver.resolve(kind, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codibot_common::db::connect_memory;

    fn text_event(user: &str, text: &str) -> InboundEvent {
        InboundEvent {
            user_id: user.to_string(),
            user_name: None,
            is_bot: false,
            kind: EventKind::Text,
            text: text.to_string(),
        }
    }

    fn command_event(user: &str, kind: EventKind) -> InboundEvent {
        InboundEvent {
            user_id: user.to_string(),
            user_name: None,
            is_bot: false,
            kind,
            text: String::new(),
        }
    }

    async fn dispatcher() -> Dispatcher {
        let pool = connect_memory().await.unwrap();
        Dispatcher::new(pool, CrowdConfig::default())
    }

    async fn dispatcher_with_privileged(user_name: &str) -> Dispatcher {
        let pool = connect_memory().await.unwrap();
        let mut config = CrowdConfig::default();
        config.privileged_users.insert(user_name.to_string());
        Dispatcher::new(pool, config)
    }

    #[tokio::test]
    async fn bots_are_rejected() {
        let dispatcher = dispatcher().await;
        let mut event = text_event("u1", "402");
        event.is_bot = true;
        assert_eq!(
            dispatcher.handle_event(event).await,
            vec![replies::NO_BOTS.to_string()]
        );
    }

    #[tokio::test]
    async fn start_and_help_reply_with_static_text() {
        let dispatcher = dispatcher().await;

        let replies_start = dispatcher
            .handle_event(command_event("u1", EventKind::Start))
            .await;
        assert_eq!(replies_start.len(), 1);
        assert!(replies_start[0].contains(replies::HELP));

        let replies_help = dispatcher
            .handle_event(command_event("u1", EventKind::Help))
            .await;
        assert_eq!(replies_help, vec![replies::HELP.to_string()]);
    }

    #[tokio::test]
    async fn full_feed_dialogue_records_a_code() {
        let dispatcher = dispatcher().await;

        let out = dispatcher
            .handle_event(command_event("u1", EventKind::Feed))
            .await;
        assert_eq!(out, vec![replies::FEED_PROMPT.to_string()]);

        let out = dispatcher.handle_event(text_event("u1", "Trento")).await;
        assert_eq!(out, vec![replies::code_prompt_train("Trento")]);

        let out = dispatcher.handle_event(text_event("u1", "TT001")).await;
        assert_eq!(out, vec![replies::THANKS_RECORDED.to_string()]);

        // session is back to Idle: the same text now queries
        let session = dispatcher.sessions.get("u1").await;
        assert_eq!(session.lock().await.phase, Phase::Idle);

        // below the confidence threshold, the code is withheld
        let out = dispatcher.handle_event(text_event("u1", "trento")).await;
        assert_eq!(out, vec![replies::UNKNOWN_CODE.to_string()]);
    }

    #[tokio::test]
    async fn privileged_feed_is_immediately_queryable() {
        let dispatcher = dispatcher_with_privileged("admin").await;

        for (kind, text) in [
            (EventKind::Feed, ""),
            (EventKind::Text, "402"),
            (EventKind::Text, "TT555"),
        ] {
            let mut event = text_event("u9", text);
            event.kind = kind;
            event.user_name = Some("admin".to_string());
            dispatcher.handle_event(event).await;
        }

        // persisted on creation, so visible despite confirms = 1 < 2
        let out = dispatcher.handle_event(text_event("u2", "402")).await;
        assert_eq!(out, vec!["TT555".to_string()]);
    }

    #[tokio::test]
    async fn unclassifiable_name_abandons_the_dialogue() {
        let dispatcher = dispatcher().await;

        dispatcher
            .handle_event(command_event("u1", EventKind::Feed))
            .await;
        let out = dispatcher
            .handle_event(text_event("u1", "something else"))
            .await;
        assert_eq!(out, vec![replies::NEVER_MIND.to_string()]);

        let session = dispatcher.sessions.get("u1").await;
        let guard = session.lock().await;
        assert_eq!(guard.phase, Phase::Idle);
        assert!(guard.pending_vehicle_name.is_none());
    }

    #[tokio::test]
    async fn invalid_code_resets_the_session() {
        let dispatcher = dispatcher().await;

        dispatcher
            .handle_event(command_event("u1", EventKind::Feed))
            .await;
        dispatcher.handle_event(text_event("u1", "402")).await;
        let out = dispatcher.handle_event(text_event("u1", "bogus")).await;
        assert_eq!(out, vec![replies::INVALID_CODE.to_string()]);

        let session = dispatcher.sessions.get("u1").await;
        assert_eq!(session.lock().await.phase, Phase::Idle);
    }

    #[tokio::test]
    async fn dialogues_of_different_users_are_independent() {
        let dispatcher = dispatcher().await;

        dispatcher
            .handle_event(command_event("u1", EventKind::Feed))
            .await;

        // u2 is still in Idle: their text is a query, not a dialogue step
        let out = dispatcher.handle_event(text_event("u2", "rovereto")).await;
        assert_eq!(out, vec![replies::UNKNOWN_CODE.to_string()]);

        // u1's dialogue continues unharmed
        let out = dispatcher.handle_event(text_event("u1", "rovereto")).await;
        assert_eq!(out, vec![replies::code_prompt_train("rovereto")]);
    }

    #[tokio::test]
    async fn unclassifiable_idle_text_gets_the_hint_reply() {
        let dispatcher = dispatcher().await;
        let out = dispatcher
            .handle_event(text_event("u1", "hello there"))
            .await;
        assert_eq!(out, vec![replies::DONT_UNDERSTAND.to_string()]);
    }

    #[tokio::test]
    async fn feed_during_a_dialogue_restarts_it() {
        let dispatcher = dispatcher().await;

        dispatcher
            .handle_event(command_event("u1", EventKind::Feed))
            .await;
        dispatcher.handle_event(text_event("u1", "Trento")).await;

        let out = dispatcher
            .handle_event(command_event("u1", EventKind::Feed))
            .await;
        assert_eq!(out, vec![replies::FEED_PROMPT.to_string()]);

        let session = dispatcher.sessions.get("u1").await;
        let guard = session.lock().await;
        assert_eq!(guard.phase, Phase::AwaitingVehicleIdentifier);
        assert!(guard.pending_vehicle_name.is_none());
    }

    #[tokio::test]
    async fn confirmed_code_becomes_queryable_at_the_threshold() {
        let pool = connect_memory().await.unwrap();
        let mut config = CrowdConfig::default();
        config.grace_interval_ms = 0; // confirmations count immediately
        let dispatcher = Dispatcher::new(pool, config);

        for _ in 0..2 {
            dispatcher
                .handle_event(command_event("u1", EventKind::Feed))
                .await;
            dispatcher.handle_event(text_event("u1", "402")).await;
            let out = dispatcher.handle_event(text_event("u1", "TT123")).await;
            assert_eq!(out, vec![replies::THANKS_RECORDED.to_string()]);
        }

        // created with confirms = 1, confirmed to 2 = threshold
        let out = dispatcher.handle_event(text_event("u2", "402")).await;
        assert_eq!(out, vec!["TT123".to_string()]);
    }
}
