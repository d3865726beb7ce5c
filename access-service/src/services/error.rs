use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Malformed endpoint: {0}")]
    MalformedEndpoint(String),

    #[error("Invalid fixture: {0}")]
    Fixture(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Store(e) => AppError::StoreError(e),
            ServiceError::Session(e) => AppError::SessionError(e),
            ServiceError::MalformedEndpoint(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            ServiceError::Fixture(e) => AppError::ConfigError(anyhow::anyhow!(e)),
        }
    }
}
