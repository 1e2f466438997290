use serde::Serialize;

/// Collection cap of the reference deployment.
pub const MAX_TOKEN_IDS: u64 = 20;

/// Minted-so-far vs. cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupplyCounter {
    pub minted: u64,
    pub cap: u64,
    /// False until the first successful read.
    pub observed: bool,
}

impl Default for SupplyCounter {
    fn default() -> Self {
        Self::new(MAX_TOKEN_IDS)
    }
}

impl SupplyCounter {
    pub fn new(cap: u64) -> Self {
        Self {
            minted: 0,
            cap,
            observed: false,
        }
    }

    /// Record a fresh read. Returns `false` (and keeps the old value) when the
    /// read is lower than what was already observed.
    pub fn observe(&mut self, minted: u64) -> bool {
        if self.observed && minted < self.minted {
            return false;
        }
        self.minted = minted;
        self.observed = true;
        true
    }

    pub fn remaining(&self) -> u64 {
        self.cap.saturating_sub(self.minted)
    }

    pub fn is_sold_out(&self) -> bool {
        self.observed && self.minted >= self.cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_is_non_decreasing() {
        let mut s = SupplyCounter::default();
        assert!(s.observe(3));
        assert!(s.observe(5));
        assert!(!s.observe(4));
        assert_eq!(s.minted, 5);
        assert_eq!(s.remaining(), 15);
    }

    #[test]
    fn test_first_observation_accepts_zero() {
        let mut s = SupplyCounter::new(20);
        assert!(!s.observed);
        assert!(s.observe(0));
        assert!(s.observed);
        assert!(!s.is_sold_out());
    }

    #[test]
    fn test_sold_out() {
        let mut s = SupplyCounter::new(20);
        s.observe(20);
        assert!(s.is_sold_out());
        assert_eq!(s.remaining(), 0);
    }
}
