use thiserror::Error;

use crate::models::UrlError;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),
    #[error("could not allocate a unique short code after {attempts} attempts")]
    AllocationExhausted { attempts: u32 },
    #[error("storage unavailable")]
    StorageUnavailable(#[source] anyhow::Error),
    #[error("short code '{0}' not found")]
    NotFound(String),
}

pub type LinkResult<T> = Result<T, LinkError>;
