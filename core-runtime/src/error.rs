use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing {
        capability: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
