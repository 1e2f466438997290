//! Showcase rotation over the collection's token ids.

use crate::{MAX_TOKEN_IDS, ParseError};

pub const FIRST_TOKEN_ID: u64 = 1;

/// Cycles `1..=last`, wrapping back to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRotation {
    current: u64,
    last: u64,
}

impl Default for TokenRotation {
    fn default() -> Self {
        Self::new(MAX_TOKEN_IDS)
    }
}

impl TokenRotation {
    pub fn new(last: u64) -> Self {
        Self {
            current: FIRST_TOKEN_ID,
            last: last.max(FIRST_TOKEN_ID),
        }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    /// Advance and return the new current id.
    pub fn advance(&mut self) -> u64 {
        self.current = if self.current >= self.last {
            FIRST_TOKEN_ID
        } else {
            self.current + 1
        };
        self.current
    }

    /// Parse and range-check a token id from a URL path segment.
    pub fn parse_id(&self, raw: &str) -> Result<u64, ParseError> {
        raw.parse::<u64>()
            .ok()
            .filter(|id| (FIRST_TOKEN_ID..=self.last).contains(id))
            .ok_or_else(|| ParseError::InvalidTokenId(raw.to_string()))
    }
}
