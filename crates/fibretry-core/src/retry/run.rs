//! Retry loop: run a closure until success, a fatal error, or the policy says stop.

use rand::rngs::StdRng;
use rand::Rng;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use super::error::{AttemptError, Termination};
use super::policy::{AttemptLimit, Cancellable, Deadline, Interrupted, StopPolicy};
use crate::backoff::FibonacciBackoff;

/// Result of a cancellable session that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion<T> {
    /// The operation succeeded.
    Done(T),
    /// The stop signal fired during a wait; the operation was not re-invoked.
    Interrupted,
}

/// Drives an operation through the retry loop, owning the backoff sequence
/// that spaces the attempts apart.
#[derive(Debug, Clone)]
pub struct Retrier<R = StdRng> {
    backoff: FibonacciBackoff<R>,
}

impl<R: Rng> Retrier<R> {
    pub fn new(backoff: FibonacciBackoff<R>) -> Self {
        Self { backoff }
    }

    pub fn backoff(&self) -> &FibonacciBackoff<R> {
        &self.backoff
    }

    /// Mutable access, e.g. to [`FibonacciBackoff::reset`] between sessions.
    pub fn backoff_mut(&mut self) -> &mut FibonacciBackoff<R> {
        &mut self.backoff
    }

    pub fn into_backoff(self) -> FibonacciBackoff<R> {
        self.backoff
    }

    /// Waits taken so far, across every session run on this retrier.
    pub fn attempts_elapsed(&self) -> u32 {
        self.backoff.attempts_elapsed()
    }

    /// Run `op` under `policy`.
    ///
    /// On a transient failure the policy is consulted first; only if it allows
    /// another attempt is the next wait computed and slept. Fatal errors end the
    /// session at once regardless of the remaining budget. The policy sees
    /// only the waits taken in this session, so a retrier can be reused.
    pub fn run<T, E, P, F>(
        &mut self,
        policy: &mut P,
        mut op: F,
    ) -> Result<T, Termination<E, P::Interrupt>>
    where
        P: StopPolicy,
        F: FnMut() -> Result<T, AttemptError<E>>,
    {
        policy.begin();
        let baseline = self.backoff.attempts_elapsed();
        let mut attempt = 1u32;
        loop {
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => {
                    tracing::warn!(attempt, "fatal error, not retrying");
                    return Err(Termination::Fatal(e));
                }
                Err(AttemptError::Transient(e)) => e,
            };

            let session_waits = self.backoff.attempts_elapsed().saturating_sub(baseline);
            if !policy.should_retry(session_waits) {
                tracing::debug!(attempt, "stopping policy exhausted, giving up");
                return Err(Termination::Exhausted(err));
            }

            let wait = self.backoff.next_wait();
            tracing::debug!(
                attempt,
                wait_ms = whole_millis(wait),
                "attempt failed, backing off"
            );
            if let Err(interrupt) = policy.pause(wait) {
                tracing::info!(attempt, "retry interrupted during backoff");
                return Err(Termination::Interrupted(interrupt));
            }
            attempt = attempt.saturating_add(1);
        }
    }

    /// Retry until `max_attempts` invocations have failed; returns the last error.
    pub fn run_with_attempt_limit<T, E, F>(&mut self, max_attempts: u32, op: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, AttemptError<E>>,
    {
        self.run(&mut AttemptLimit::new(max_attempts), op)
            .map_err(Termination::into_error)
    }

    /// Retry until `relative_deadline` has passed; returns the last error.
    pub fn run_with_deadline<T, E, F>(
        &mut self,
        relative_deadline: Duration,
        op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Result<T, AttemptError<E>>,
    {
        self.run(&mut Deadline::new(relative_deadline), op)
            .map_err(Termination::into_error)
    }

    /// Retry without limit until success, a fatal error, or `stop` fires during a wait.
    ///
    /// Interruption is reported as [`Completion::Interrupted`], not as an error.
    pub fn run_cancellable<T, E, F>(
        &mut self,
        stop: &Receiver<()>,
        op: F,
    ) -> Result<Completion<T>, E>
    where
        F: FnMut() -> Result<T, AttemptError<E>>,
    {
        match self.run(&mut Cancellable::new(stop), op) {
            Ok(value) => Ok(Completion::Done(value)),
            Err(Termination::Interrupted(Interrupted)) => Ok(Completion::Interrupted),
            Err(Termination::Exhausted(e) | Termination::Fatal(e)) => Err(e),
        }
    }
}

/// One-shot session: jittered backoff capped at `max_wait`, bounded by attempts.
pub fn retry_with_attempt_limit<T, E, F>(
    max_wait: Duration,
    max_attempts: u32,
    op: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, AttemptError<E>>,
{
    Retrier::new(FibonacciBackoff::new(max_wait)).run_with_attempt_limit(max_attempts, op)
}

/// One-shot session: jittered backoff capped at `max_wait`, bounded by a deadline.
pub fn retry_with_deadline<T, E, F>(
    max_wait: Duration,
    relative_deadline: Duration,
    op: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, AttemptError<E>>,
{
    Retrier::new(FibonacciBackoff::new(max_wait)).run_with_deadline(relative_deadline, op)
}

/// Milliseconds for log fields, saturating for waits too long to fit a `u64`.
fn whole_millis(wait: Duration) -> u64 {
    u64::try_from(wait.as_millis()).unwrap_or(u64::MAX)
}
