//! # Codibot Common Library
//!
//! Shared code for the codibot service:
//! - Database models and pool bootstrap
//! - Crowdsourcing configuration
//! - Inbound event types
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
