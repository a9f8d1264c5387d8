use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("A bridge service is already installed for this process")]
    AlreadyInstalled,

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] core_bridge::CoreError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
