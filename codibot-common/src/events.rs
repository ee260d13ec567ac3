//! Inbound event types
//!
//! The transport layer (chat frontend) classifies each incoming message
//! into one of a handful of event kinds before it reaches the core; the
//! core never parses routing commands itself.

use serde::{Deserialize, Serialize};

/// Pre-classified kind of an inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// First contact; replies with the help text
    Start,
    /// Explicit help request
    Help,
    /// Starts the code-feeding dialogue
    Feed,
    /// Free text, routed by the sender's session phase
    Text,
}

/// One inbound message from a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Opaque stable identifier of the sender
    pub user_id: String,
    /// Display name, if the transport knows one; privilege checks key
    /// off this
    #[serde(default)]
    pub user_name: Option<String>,
    /// Whether the transport flagged the sender as a bot
    #[serde(default)]
    pub is_bot: bool,
    pub kind: EventKind,
    /// Raw message text; empty for command-only events
    #[serde(default)]
    pub text: String,
}
