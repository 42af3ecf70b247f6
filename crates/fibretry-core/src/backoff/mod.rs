//! Fibonacci backoff sequence.
//!
//! Each call to [`FibonacciBackoff::next_wait`] advances a Fibonacci pair and
//! yields `min(curr * unit, max_wait)`. With jitter enabled the value is drawn
//! uniformly from `[base / 2, base]` so that independent callers backing off
//! from the same failure do not retry in lockstep.
//!
//! The sequence is owned by exactly one retry session; it is not meant to be
//! shared between threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Duration of one Fibonacci step unless overridden with [`FibonacciBackoff::with_unit`].
pub const DEFAULT_UNIT: Duration = Duration::from_secs(1);

/// Stateful generator of capped Fibonacci wait durations.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff<R = StdRng> {
    prev: u64,
    curr: u64,
    max_wait: Duration,
    unit: Duration,
    attempts_elapsed: u32,
    /// `None` disables jitter.
    jitter: Option<R>,
}

impl FibonacciBackoff<StdRng> {
    /// Jittered sequence with a fresh entropy-seeded RNG.
    pub fn new(max_wait: Duration) -> Self {
        Self::with_rng(max_wait, StdRng::from_entropy())
    }

    /// Deterministic sequence: every wait is exactly the capped base.
    pub fn without_jitter(max_wait: Duration) -> Self {
        Self::build(max_wait, None)
    }
}

impl<R: Rng> FibonacciBackoff<R> {
    /// Jittered sequence drawing from the given source (e.g. a seeded `StdRng` in tests).
    pub fn with_rng(max_wait: Duration, rng: R) -> Self {
        Self::build(max_wait, Some(rng))
    }

    fn build(max_wait: Duration, jitter: Option<R>) -> Self {
        Self {
            prev: 0,
            curr: 1,
            max_wait,
            unit: DEFAULT_UNIT,
            attempts_elapsed: 0,
            jitter,
        }
    }

    /// Replace the duration that one Fibonacci step stands for.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Advance the sequence and return the next wait.
    ///
    /// The first call returns one unit (or `max_wait` if that is smaller).
    pub fn next_wait(&mut self) -> Duration {
        let next = self.prev.saturating_add(self.curr);
        self.prev = self.curr;
        self.curr = next;
        self.attempts_elapsed = self.attempts_elapsed.saturating_add(1);

        let base = self.capped_base();
        match self.jitter.as_mut() {
            Some(rng) => jittered(rng, base),
            None => base,
        }
    }

    /// Restart growth from the first step. The attempt counter is kept.
    pub fn reset(&mut self) {
        self.prev = 0;
        self.curr = 1;
    }

    /// Number of waits produced so far.
    pub fn attempts_elapsed(&self) -> u32 {
        self.attempts_elapsed
    }

    /// Current `(prev, curr)` Fibonacci pair.
    pub fn fib_pair(&self) -> (u64, u64) {
        (self.prev, self.curr)
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn unit(&self) -> Duration {
        self.unit
    }

    pub fn is_jittered(&self) -> bool {
        self.jitter.is_some()
    }

    /// `curr` units clamped to `max_wait`. The uncapped pair keeps growing.
    fn capped_base(&self) -> Duration {
        u32::try_from(self.curr)
            .ok()
            .and_then(|steps| self.unit.checked_mul(steps))
            .map_or(self.max_wait, |d| d.min(self.max_wait))
    }
}

/// Uniform draw from `[base / 2, base]`.
fn jittered<R: Rng>(rng: &mut R, base: Duration) -> Duration {
    let half = base / 2;
    let spread = u64::try_from((base - half).as_nanos()).unwrap_or(u64::MAX);
    half + Duration::from_nanos(rng.gen_range(0..=spread))
}
