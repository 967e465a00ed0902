use thiserror::Error;

/// Errors from `EngineBuilder::build`. Per-tick problems never surface as
/// errors; they are counted and feed the safe-mode breaker.
#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing store")]
    MissingStore,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
