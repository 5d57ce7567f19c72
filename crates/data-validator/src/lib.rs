//! Reading Validation
//!
//! Required-field checks and optional physical-range checks for station
//! readings, applied before anything reaches the store.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationConfig, Validator};
