//! Shared application-level types.
//!
//! - `error` - conversion of any error into a colored, user-facing report

pub mod error;

pub use error::{ErrorContext, user_friendly_error};
