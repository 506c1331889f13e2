//! Link store service
//!
//! Validates submitted URLs, drives the allocator/insert retry loop and maps
//! storage outcomes onto [`LinkError`] kinds. This is the only caller of the
//! code allocator.

mod error;

pub use error::{LinkError, LinkResult};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::allocator::{AllocatorError, CodeAllocator};
use crate::models::{normalize_original_url, LinkRecord, ShortCode};
use crate::storage::{Storage, StorageError};

/// Top-level paths served by the HTTP layer that a code must never shadow.
const RESERVED_CODES: &[&str] = &["health", "shorten", "urls"];

#[derive(Debug, Clone)]
pub struct LinkStoreOptions {
    /// Candidates tried per create before reporting exhaustion
    pub max_attempts: u32,
    /// Return the newest existing link for an already shortened URL
    pub deduplicate: bool,
}

impl Default for LinkStoreOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            deduplicate: false,
        }
    }
}

pub struct LinkStore {
    storage: Arc<dyn Storage>,
    allocator: Arc<dyn CodeAllocator>,
    options: LinkStoreOptions,
}

impl LinkStore {
    pub fn new(
        storage: Arc<dyn Storage>,
        allocator: Arc<dyn CodeAllocator>,
        options: LinkStoreOptions,
    ) -> Self {
        Self {
            storage,
            allocator,
            options,
        }
    }

    /// Shorten `original_url`, returning the stored record.
    pub async fn create(&self, original_url: &str) -> LinkResult<LinkRecord> {
        let original_url = normalize_original_url(original_url)?;

        if self.options.deduplicate {
            let existing = self
                .storage
                .find_by_url(&original_url)
                .await
                .map_err(storage_failure)?;
            if let Some(record) = existing {
                debug!(short_code = %record.short_code, "reusing existing link for URL");
                return Ok(record);
            }
        }

        for attempt in 1..=self.options.max_attempts {
            let code = match self.allocator.candidate().await {
                Ok(code) => code,
                Err(AllocatorError::SpaceExhausted { length }) => {
                    warn!(
                        code_length = length,
                        "short code space exhausted; increase CODE_LENGTH"
                    );
                    return Err(LinkError::AllocationExhausted { attempts: attempt });
                }
                Err(AllocatorError::Sequence(err)) => return Err(storage_failure(err)),
            };
            if RESERVED_CODES.contains(&code.as_str()) {
                debug!(short_code = %code, attempt, "candidate is a reserved path, retrying");
                continue;
            }

            match self
                .storage
                .create_with_code(code.as_str(), &original_url)
                .await
            {
                Ok(record) => {
                    info!(short_code = %record.short_code, attempt, "created link");
                    return Ok(record);
                }
                Err(StorageError::Conflict) => {
                    debug!(short_code = %code, attempt, "short code collision, retrying");
                }
                Err(StorageError::Other(err)) => return Err(storage_failure(err)),
            }
        }

        warn!(
            attempts = self.options.max_attempts,
            code_length = self.allocator.code_length(),
            "could not allocate a free short code; code space may be close to saturation"
        );
        Err(LinkError::AllocationExhausted {
            attempts: self.options.max_attempts,
        })
    }

    /// Every link, newest first.
    pub async fn list(&self) -> LinkResult<Vec<LinkRecord>> {
        self.storage.list().await.map_err(storage_failure)
    }

    /// Remove every link, returning how many were removed.
    pub async fn clear_all(&self) -> LinkResult<u64> {
        let removed = self.storage.clear().await.map_err(storage_failure)?;
        info!(removed, "cleared all links");
        Ok(removed)
    }

    /// Resolve a short code to its record.
    pub async fn lookup(&self, short_code: &str) -> LinkResult<LinkRecord> {
        // Nothing outside the alphabet was ever issued
        let Some(code) = ShortCode::parse(short_code) else {
            return Err(LinkError::NotFound(short_code.to_string()));
        };

        match self.storage.get(code.as_str()).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(LinkError::NotFound(code.into_inner())),
            Err(err) => Err(storage_failure(err)),
        }
    }
}

fn storage_failure(err: anyhow::Error) -> LinkError {
    error!(error = %err, "storage operation failed");
    LinkError::StorageUnavailable(err)
}
