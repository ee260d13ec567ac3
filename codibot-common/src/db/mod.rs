//! Database models and pool bootstrap

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
