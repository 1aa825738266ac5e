//! tb-core: stable foundation for thermobox.
//!
//! Contains:
//! - ids (stable compact IDs for parts and sensors)
//! - numeric (Real + tolerances + float helpers)
//! - constants (physical properties of air used as model defaults)
//! - error (shared error types)

pub mod constants;
pub mod error;
pub mod ids;
pub mod numeric;

pub use error::{TbError, TbResult};
pub use ids::*;
pub use numeric::*;
