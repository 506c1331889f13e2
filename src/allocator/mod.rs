//! Short code allocation
//!
//! Allocators only propose candidate codes. Uniqueness is enforced by the
//! storage layer, which rejects a candidate that is already taken so the
//! caller can ask for another one.

pub mod random;
pub mod sequential;

use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{ShortCode, ALPHABET};

pub use random::RandomAllocator;
pub use sequential::SequentialAllocator;

/// Shortest code length accepted by configuration.
pub const MIN_CODE_LENGTH: usize = 4;
/// Longest code length accepted by configuration; 62^10 still fits in a u64.
pub const MAX_CODE_LENGTH: usize = 10;

#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("code space of length {length} is exhausted")]
    SpaceExhausted { length: usize },
    #[error("failed to advance code sequence")]
    Sequence(#[source] anyhow::Error),
}

#[async_trait]
pub trait CodeAllocator: Send + Sync {
    /// Produce the next candidate code.
    async fn candidate(&self) -> Result<ShortCode, AllocatorError>;

    /// Length of every code this allocator produces.
    fn code_length(&self) -> usize;
}

/// Monotonic counter backing the sequential policy.
///
/// Implementations must persist every increment before returning it so a
/// restarted process never hands out the same value twice.
#[async_trait]
pub trait SequenceSource: Send + Sync {
    async fn next_sequence(&self) -> anyhow::Result<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePolicy {
    Random,
    Sequential,
}

impl FromStr for CodePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random" => Ok(CodePolicy::Random),
            "sequential" | "counter" => Ok(CodePolicy::Sequential),
            other => Err(anyhow::anyhow!(
                "unknown code policy '{other}', supported values: random, sequential"
            )),
        }
    }
}

/// Allocator for `policy`; `sequence` is only consulted by the sequential policy.
pub fn build_allocator(
    policy: CodePolicy,
    length: usize,
    sequence: Arc<dyn SequenceSource>,
) -> Arc<dyn CodeAllocator> {
    match policy {
        CodePolicy::Random => Arc::new(RandomAllocator::new(length)),
        CodePolicy::Sequential => Arc::new(SequentialAllocator::new(sequence, length)),
    }
}

/// Number of distinct codes of the given length.
pub(crate) fn code_space(length: usize) -> u128 {
    (ALPHABET.len() as u128).pow(length as u32)
}

/// Base62-encode `value`, left-padded with the zero digit to exactly `length` characters.
///
/// `value` must be below `code_space(length)`.
pub(crate) fn encode_fixed(mut value: u128, length: usize) -> String {
    let base = ALPHABET.len() as u128;
    let mut digits = vec![ALPHABET[0]; length];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(value % base) as usize];
        value /= base;
    }
    // ALPHABET is ASCII
    digits.into_iter().map(char::from).collect()
}
