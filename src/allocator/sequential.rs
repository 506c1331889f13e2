use async_trait::async_trait;
use std::sync::Arc;

use super::{code_space, encode_fixed, AllocatorError, CodeAllocator, SequenceSource};
use crate::models::ShortCode;

/// Odd and not a multiple of 31, so coprime with every power of 62.
const SCRAMBLE_MULTIPLIER: u128 = 25_214_903_917;

fn scramble(value: u128, space: u128) -> u128 {
    (value * SCRAMBLE_MULTIPLIER) % space
}

/// Derives codes from a persisted counter.
///
/// Each counter value is multiplied by a constant coprime with `62^length`
/// modulo that space. The mapping is a bijection, so distinct counter values
/// always give distinct codes while consecutive links do not get visibly
/// consecutive codes.
pub struct SequentialAllocator {
    source: Arc<dyn SequenceSource>,
    length: usize,
}

impl SequentialAllocator {
    pub fn new(source: Arc<dyn SequenceSource>, length: usize) -> Self {
        Self { source, length }
    }

    fn encode(&self, value: u64) -> Result<ShortCode, AllocatorError> {
        let space = code_space(self.length);
        let value = value as u128;
        if value >= space {
            return Err(AllocatorError::SpaceExhausted {
                length: self.length,
            });
        }
        Ok(ShortCode::new_unchecked(encode_fixed(
            scramble(value, space),
            self.length,
        )))
    }
}

#[async_trait]
impl CodeAllocator for SequentialAllocator {
    async fn candidate(&self) -> Result<ShortCode, AllocatorError> {
        let value = self
            .source
            .next_sequence()
            .await
            .map_err(AllocatorError::Sequence)?;
        self.encode(value)
    }

    fn code_length(&self) -> usize {
        self.length
    }
}
