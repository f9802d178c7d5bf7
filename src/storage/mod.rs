//! Storage Layer
//!
//! Handles all persistence: SQLite profiles and applications, voice-note
//! blobs, and TOML config.

pub mod application_store;
pub mod blob;
pub mod config;
pub mod database;
pub mod profile_store;

pub use application_store::*;
pub use blob::*;
pub use config::*;
pub use database::*;
pub use profile_store::*;
