//! Shared error taxonomy and logging setup used across the parlor crates.

pub mod error;
pub mod logging;

pub use error::{Result, ServerError};
