//! Retry policy (C9) — spec §4.5.
//!
//! Pure function from attempt count to next-due timestamp. Carries no I/O
//! and no mutable state; the outbox row is the sole place retry progress
//! is recorded (spec §9's open question on the ledger columns resolves in
//! favor of the outbox as sole owner).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay_ms: i64,
    pub multiplier: i64,
    pub max_attempts: i32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            multiplier: 4,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay in milliseconds before the *n*-th attempt (1-indexed).
    ///
    /// `delay(1) = 0`, `delay(n) = base_delay_ms * multiplier^(n-2)` for `n >= 2`.
    pub fn delay_ms(&self, attempt: i32) -> i64 {
        if attempt <= 1 {
            return 0;
        }
        self.base_delay_ms * self.multiplier.pow((attempt - 2) as u32)
    }

    /// `next_retry_at` to write after a transient failure that bumped
    /// `retry_count` to `new_retry_count`.
    pub fn next_retry_at(&self, new_retry_count: i32, now: DateTime<Utc>) -> DateTime<Utc> {
        now + chrono::Duration::milliseconds(self.delay_ms(new_retry_count + 1))
    }

    pub fn is_max_retries_exceeded(&self, retry_count: i32) -> bool {
        retry_count >= self.max_attempts
    }
}
