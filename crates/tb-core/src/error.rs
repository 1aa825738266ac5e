use thiserror::Error;

pub type TbResult<T> = Result<T, TbError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TbError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Value out of range for {what}: {value} not in [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}
