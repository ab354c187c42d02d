//! Token buckets for span rate limits.
//!
//! Levels are kept in token-nanoseconds so refills are exact integer math.

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A token bucket refilled continuously at a fixed rate.
///
/// The bucket starts full. Time is supplied by the caller; a clock that moves
/// backwards refills nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBucket {
    rate_per_sec: u64,
    capacity: u128,
    level: u128,
    last_refill_ns: Option<u64>,
}

impl TokenBucket {
    /// Creates a full bucket holding one second of tokens.
    #[must_use]
    pub fn new(rate_per_sec: u64) -> Self {
        let capacity = u128::from(rate_per_sec) * NANOS_PER_SEC;
        Self {
            rate_per_sec,
            capacity,
            level: capacity,
            last_refill_ns: None,
        }
    }

    /// Tokens added per second.
    #[must_use]
    pub const fn rate_per_sec(&self) -> u64 {
        self.rate_per_sec
    }

    /// Returns true if `tokens` could be consumed at `now_ns`.
    pub fn has(&mut self, tokens: u64, now_ns: u64) -> bool {
        self.refill(now_ns);
        u128::from(tokens) * NANOS_PER_SEC <= self.level
    }

    /// Consumes `tokens` if available at `now_ns`; returns whether it did.
    pub fn try_consume(&mut self, tokens: u64, now_ns: u64) -> bool {
        self.refill(now_ns);
        let needed = u128::from(tokens) * NANOS_PER_SEC;
        if needed <= self.level {
            self.level -= needed;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now_ns: u64) {
        if let Some(last) = self.last_refill_ns {
            let elapsed = now_ns.saturating_sub(last);
            let added = u128::from(elapsed) * u128::from(self.rate_per_sec);
            self.level = self.level.saturating_add(added).min(self.capacity);
            self.last_refill_ns = Some(last.max(now_ns));
        } else {
            self.last_refill_ns = Some(now_ns);
        }
    }
}
