//! Error types for the engine layer.

use tb_codec::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("state codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid engine config: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("engine has been shut down")]
    ShutDown,

    #[error("failed to spawn the stepping worker: {0}")]
    WorkerSpawn(std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
