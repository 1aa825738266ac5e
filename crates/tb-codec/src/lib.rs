//! Saved-state codec for thermobox.
//!
//! Provides:
//! - [`encode`]: deterministic nested-tag text for a whole [`Simulation`]
//! - [`read_state_into`]: streaming decode that never aborts on bad content
//! - [`write_state`]: encode into any writer, which is closed afterwards
//!
//! Fields still at their default are omitted on save, and the decoder starts
//! from the same defaults, so a missing tag always means "default".

mod decode;
mod schema;
mod token;
mod writer;

use std::io::Write;

use tb_model::Simulation;
use thiserror::Error;

pub use decode::{DecodeIssue, DecodeReport, read_state_into};
pub use writer::{TagWriter, encode};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encode `sim` into `writer`. The writer is flushed and dropped before this
/// returns, whether or not the write succeeded.
pub fn write_state<W: Write>(sim: &Simulation, mut writer: W) -> CodecResult<()> {
    writer.write_all(encode(sim).as_bytes())?;
    writer.flush()?;
    Ok(())
}
