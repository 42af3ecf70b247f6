//! Simulated dependency that fails a configurable number of times before recovering.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Unavailable(u32),
    Rejected(u32),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Unavailable(n) => write!(f, "unavailable (call {})", n),
            ServiceError::Rejected(n) => write!(f, "rejected (call {})", n),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Fails with `Unavailable` for the first `failures` calls, then answers with the call number.
/// If `reject_on` is set, that call fails with `Rejected` instead.
#[derive(Clone)]
pub struct FlakyService {
    calls: Arc<AtomicU32>,
    failures: u32,
    reject_on: Option<u32>,
}

impl FlakyService {
    pub fn new(failures: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            failures,
            reject_on: None,
        }
    }

    pub fn rejecting_on(mut self, call: u32) -> Self {
        self.reject_on = Some(call);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn call(&self) -> Result<u32, ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.reject_on == Some(n) {
            return Err(ServiceError::Rejected(n));
        }
        if n <= self.failures {
            return Err(ServiceError::Unavailable(n));
        }
        Ok(n)
    }
}
