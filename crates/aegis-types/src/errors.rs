use thiserror::Error;

pub type Result<T, E = AegisError> = std::result::Result<T, E>;

/// Unified error type covering the console's failure taxonomy.
///
/// `Configuration` is fatal to the call that produced it; `Decode`,
/// `Transport`, and `Dispatch` are all recovered locally and surface to the
/// operator as alert-log entries rather than crashes.
#[derive(Debug, Error)]
pub enum AegisError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("frame decode error: {0}")]
    Decode(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("dispatch error: {0}")]
    Dispatch(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
