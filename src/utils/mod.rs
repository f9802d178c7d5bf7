//! Utilities
//!
//! Common utilities used throughout the service.

pub mod error;
pub mod mask;

pub use error::*;
pub use mask::*;
