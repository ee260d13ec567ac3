//! Crowdsourced transit ticketing-code service
//!
//! Users look up the ticketing code of a bus, train station, or ropeway
//! station by sending free-text messages, and contribute missing or
//! corrected codes through a short guided dialogue. A per-code consensus
//! policy decides which submission is authoritative.

pub mod api;
pub mod classify;
pub mod consensus;
pub mod dispatch;
pub mod replies;
pub mod resolver;
pub mod session;
pub mod store;
