use async_trait::async_trait;
use rand::RngExt;

use super::{AllocatorError, CodeAllocator};
use crate::models::{ShortCode, ALPHABET};

/// Draws every character uniformly from the base62 alphabet.
#[derive(Debug, Clone)]
pub struct RandomAllocator {
    length: usize,
}

impl RandomAllocator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

fn random_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

#[async_trait]
impl CodeAllocator for RandomAllocator {
    async fn candidate(&self) -> Result<ShortCode, AllocatorError> {
        Ok(ShortCode::new_unchecked(random_code(self.length)))
    }

    fn code_length(&self) -> usize {
        self.length
    }
}
