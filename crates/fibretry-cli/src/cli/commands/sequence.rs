//! `fibretry sequence` – print the waits a session would take.

use anyhow::Result;
use fibretry_core::backoff::FibonacciBackoff;
use fibretry_core::config::FibretryConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Draw the next `count` waits from `backoff`.
pub fn sequence_waits<R: Rng>(backoff: &mut FibonacciBackoff<R>, count: usize) -> Vec<Duration> {
    (0..count).map(|_| backoff.next_wait()).collect()
}

pub fn run_sequence(cfg: &FibretryConfig, count: usize, seed: Option<u64>) -> Result<()> {
    let max_wait = cfg.max_wait()?;
    let unit = cfg.unit()?;
    let waits = match (cfg.jitter, seed) {
        (false, _) => sequence_waits(
            &mut FibonacciBackoff::without_jitter(max_wait).with_unit(unit),
            count,
        ),
        (true, Some(seed)) => sequence_waits(
            &mut FibonacciBackoff::with_rng(max_wait, StdRng::seed_from_u64(seed)).with_unit(unit),
            count,
        ),
        (true, None) => sequence_waits(&mut cfg.backoff()?, count),
    };

    println!("{:<8} {}", "ATTEMPT", "WAIT");
    for (i, wait) in waits.iter().enumerate() {
        println!("{:<8} {:.3}s", i + 1, wait.as_secs_f64());
    }
    Ok(())
}
