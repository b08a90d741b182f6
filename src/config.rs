use std::time::Duration;

use anyhow::{ensure, Result};

use crate::typo::DEFAULT_TYPO_BUDGET;

pub const DEFAULT_MIN_TYPING_DELAY_MS: u64 = 30;
pub const DEFAULT_MAX_TYPING_DELAY_MS: u64 = 120;
/// Upper bound for any per-character delay, whatever a command or setting asks for.
pub const DELAY_CEILING_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct TypingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Maximum simulated typos per run. Zero disables them.
    pub typo_budget: usize,
    pub typo_delay_ms_min: u64,
    pub typo_delay_ms_max: u64,
    pub sentence_pause_ms: u64,
    pub comma_pause_ms: u64,
    /// Overlay countdown between the click and `Start`.
    pub countdown: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: DEFAULT_MIN_TYPING_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_TYPING_DELAY_MS,
            typo_budget: DEFAULT_TYPO_BUDGET,
            typo_delay_ms_min: 120,
            typo_delay_ms_max: 220,
            sentence_pause_ms: 200,
            comma_pause_ms: 100,
            countdown: Duration::from_secs(5),
        }
    }
}

impl TypingConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.min_delay_ms >= 1, "min_delay_ms must be >= 1");
        ensure!(
            self.min_delay_ms <= self.max_delay_ms,
            "min_delay_ms must be <= max_delay_ms"
        );
        ensure!(
            self.max_delay_ms <= DELAY_CEILING_MS,
            "max_delay_ms must be <= {DELAY_CEILING_MS}"
        );
        ensure!(
            self.typo_delay_ms_min <= self.typo_delay_ms_max,
            "typo_delay_ms_min must be <= typo_delay_ms_max"
        );
        Ok(())
    }

    pub fn delays(&self) -> DelayRange {
        DelayRange::sanitized(self.min_delay_ms, self.max_delay_ms)
    }
}

/// Per-character delay bounds, always `1 <= min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

impl DelayRange {
    /// Clamp both bounds into `1..=DELAY_CEILING_MS` and order them.
    pub fn sanitized(min_ms: u64, max_ms: u64) -> Self {
        let a = min_ms.clamp(1, DELAY_CEILING_MS);
        let b = max_ms.clamp(1, DELAY_CEILING_MS);
        Self {
            min_ms: a.min(b),
            max_ms: a.max(b),
        }
    }

    pub fn min_ms(&self) -> u64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> u64 {
        self.max_ms
    }

    /// Fill in whatever a `Start` command left out from `fallback`.
    pub fn or_defaults(min_ms: Option<u64>, max_ms: Option<u64>, fallback: DelayRange) -> Self {
        Self::sanitized(
            min_ms.unwrap_or(fallback.min_ms),
            max_ms.unwrap_or(fallback.max_ms),
        )
    }
}
