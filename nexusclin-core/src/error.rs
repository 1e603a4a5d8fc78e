//! Error types for core parsing and validation.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid competency code {value:?}: expected exactly six digits (AAAAMM)")]
    InvalidCompetencia { value: String },

    #[error("Invalid timestamp {value:?}")]
    InvalidTimestamp { value: String },

    #[error("Unknown role {value:?}")]
    UnknownRole { value: String },
}
