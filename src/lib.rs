//! UniDB conference client
//!
//! Reads the conference app's flat UniDB tables and builds the denormalized
//! event, speaker, feedback and dashboard view-models the app renders, plus
//! the write operations its screens perform.

pub mod config;
pub mod errors;
pub mod models;
pub mod store;
pub mod views;

pub use config::Config;
pub use errors::ClientError;
pub use store::{Repository, UniDbClient};
pub use views::{Assembler, RefreshOutcome, ViewStatus};

#[cfg(test)]
mod tests;
