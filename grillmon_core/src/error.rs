use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum GrillError {
    #[error("telemetry error: {0}")]
    Telemetry(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
