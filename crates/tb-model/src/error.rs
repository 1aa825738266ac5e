//! Error types for model operations.

use tb_core::{Id, TbError};
use tb_controls::ControlError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid optical properties: {what}")]
    InvalidOptics { what: String },

    #[error("Invalid shape: {what}")]
    InvalidShape { what: &'static str },

    #[error("UID already in use: {uid}")]
    DuplicateUid { uid: String },

    #[error("Thermostat endpoint {0} must keep a uid")]
    EndpointUid(Id),

    #[error("Unknown part: {0}")]
    UnknownPart(Id),

    #[error("Unknown thermometer: {0}")]
    UnknownThermometer(Id),

    #[error("Control error: {0}")]
    Control(#[from] ControlError),

    #[error(transparent)]
    Core(#[from] TbError),
}
