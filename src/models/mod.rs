pub mod appointment;
pub mod enums;
pub mod ids;

pub use appointment::*;
pub use enums::*;
pub use ids::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("{kind} must not be empty")]
    EmptyId { kind: &'static str },

    #[error("Invalid time of day (expected HH:MM): {0}")]
    InvalidTime(String),
}
