//! Stopping policies: when the retry loop gives up, and how it waits.

use std::convert::Infallible;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Decides whether a failed attempt is retried and performs the backoff wait.
pub trait StopPolicy {
    /// Returned from [`StopPolicy::pause`] when the wait is cut short.
    type Interrupt;

    /// Called once when a session starts, before the first attempt.
    fn begin(&mut self) {}

    /// Called after each transient failure, before the next wait is computed.
    /// `attempts_elapsed` is the number of waits taken in the current session.
    fn should_retry(&mut self, attempts_elapsed: u32) -> bool;

    /// Suspend for `wait`. Blocking sleep unless the policy can be interrupted.
    fn pause(&mut self, wait: Duration) -> Result<(), Self::Interrupt> {
        std::thread::sleep(wait);
        Ok(())
    }
}

/// Give up once `max_attempts` invocations have failed.
///
/// `0` and `1` both mean a single attempt with no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptLimit {
    pub max_attempts: u32,
}

impl AttemptLimit {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl StopPolicy for AttemptLimit {
    type Interrupt = Infallible;

    fn should_retry(&mut self, attempts_elapsed: u32) -> bool {
        attempts_elapsed < self.max_attempts.saturating_sub(1)
    }
}

/// Give up once `relative` has elapsed since the session started.
///
/// Checked only before starting a wait; a wait already in progress runs to
/// completion, so a session may overshoot by up to one wait.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    relative: Duration,
    started: Instant,
}

impl Deadline {
    pub fn new(relative: Duration) -> Self {
        Self {
            relative,
            started: Instant::now(),
        }
    }

    pub fn relative(&self) -> Duration {
        self.relative
    }
}

impl StopPolicy for Deadline {
    type Interrupt = Infallible;

    fn begin(&mut self) {
        self.started = Instant::now();
    }

    fn should_retry(&mut self, _attempts_elapsed: u32) -> bool {
        self.started.elapsed() < self.relative
    }
}

/// Marker returned when a [`Cancellable`] wait is stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted;

/// Retry without limit until the stop channel fires during a wait.
///
/// A message on the channel and a disconnected channel (every sender
/// dropped) both stop the session.
#[derive(Debug)]
pub struct Cancellable<'a> {
    stop: &'a Receiver<()>,
}

impl<'a> Cancellable<'a> {
    pub fn new(stop: &'a Receiver<()>) -> Self {
        Self { stop }
    }
}

impl StopPolicy for Cancellable<'_> {
    type Interrupt = Interrupted;

    fn should_retry(&mut self, _attempts_elapsed: u32) -> bool {
        true
    }

    fn pause(&mut self, wait: Duration) -> Result<(), Interrupted> {
        match self.stop.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => Ok(()),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Err(Interrupted),
        }
    }
}
