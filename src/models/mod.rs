//! Shared value types that cross stage boundaries: questionnaire answers,
//! the enumerations they are built from, and the aggregate check-in record.

pub mod enums;
pub mod symptom;
pub mod check_in;

pub use check_in::*;
pub use enums::*;
pub use symptom::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },
}
