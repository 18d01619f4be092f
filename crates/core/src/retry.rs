// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

//! Retry policy for fallible external calls.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for any computed backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(15 * 60);

/// How the delay grows between retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles with each retry (`base * 2^(retry - 1)`).
    Exponential,
}

crate::simple_display! {
    Backoff {
        Fixed => "fixed",
        Exponential => "exponential",
    }
}

/// Maximum attempts plus the backoff function between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub retries: u32,
    pub backoff: Backoff,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { retries: 0, backoff: Backoff::Fixed, base_delay: Duration::ZERO }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32) -> Self {
        Self { retries, ..Self::default() }
    }

    crate::setters! {
        set { backoff: Backoff, base_delay: Duration }
    }

    /// Total attempts allowed (first attempt plus retries).
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Whether another attempt is allowed after `attempt` (1-based) failed.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Delay before the given retry (1-based: the first retry is `1`).
    pub fn delay_before(&self, retry: u32) -> Duration {
        if retry == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(retry.saturating_sub(1).min(16));
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(MAX_BACKOFF)
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
