//! Models
//!
//! Configuration and HTTP response types.

pub mod response;
pub mod settings;

pub use response::*;
pub use settings::*;
