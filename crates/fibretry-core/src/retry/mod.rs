//! Retry loop and stopping policies.
//!
//! An operation reports each failure as an [`AttemptError`]: transient
//! failures are retried after a [`FibonacciBackoff`](crate::backoff::FibonacciBackoff)
//! wait for as long as the [`StopPolicy`] allows, fatal ones end the session
//! immediately. The loop never invents errors of its own; it hands back the
//! operation's last error, or reports interruption for cancellable sessions.

mod error;
mod policy;
mod run;

pub use error::{AttemptError, Classify, Termination};
pub use policy::{AttemptLimit, Cancellable, Deadline, Interrupted, StopPolicy};
pub use run::{retry_with_attempt_limit, retry_with_deadline, Completion, Retrier};
