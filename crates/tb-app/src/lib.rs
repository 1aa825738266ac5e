//! Application layer for thermobox.
//!
//! This crate ties the model to a background stepping worker and to the
//! outside world: lifecycle control, user manipulation events, save/load
//! through the state codec, and redraw notifications.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod script;
pub mod view;

pub use config::EngineConfig;
pub use dispatcher::{
    ManipulationDispatcher, ManipulationEvent, ManipulationKind, SUN_ANGLE_STEP, Target,
};
pub use engine::{EngineState, ExecutionEngine};
pub use error::{EngineError, EngineResult};
pub use script::Scripter;
pub use view::{ChannelObserver, NullObserver, ViewEvent, ViewObserver};
