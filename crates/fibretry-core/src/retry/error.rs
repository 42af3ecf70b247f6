//! Error tags flowing into and out of the retry loop.

use std::convert::Infallible;
use std::fmt;

/// Failure of a single attempt, tagged with whether retrying can help.
///
/// Any `E` converts into [`AttemptError::Transient`], so `?` inside an
/// operation yields retryable errors; fatal ones must be built explicitly.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// Retried subject to the stopping policy.
    Transient(E),
    /// Ends the session immediately; the inner error is handed back unwrapped.
    Fatal(E),
}

impl<E> AttemptError<E> {
    pub fn transient(err: E) -> Self {
        AttemptError::Transient(err)
    }

    pub fn fatal(err: E) -> Self {
        AttemptError::Fatal(err)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, AttemptError::Fatal(_))
    }

    pub fn into_inner(self) -> E {
        match self {
            AttemptError::Transient(e) | AttemptError::Fatal(e) => e,
        }
    }
}

impl<E> From<E> for AttemptError<E> {
    fn from(err: E) -> Self {
        AttemptError::Transient(err)
    }
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transient(e) => write!(f, "{}", e),
            AttemptError::Fatal(e) => write!(f, "fatal: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AttemptError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Transient(e) | AttemptError::Fatal(e) => Some(e),
        }
    }
}

/// Tag a plain `Result` for the retry loop.
pub trait Classify<T, E> {
    /// Mark the error, if any, as non-retryable.
    fn fatal(self) -> Result<T, AttemptError<E>>;
    /// Mark the error, if any, as retryable.
    fn transient(self) -> Result<T, AttemptError<E>>;
}

impl<T, E> Classify<T, E> for Result<T, E> {
    fn fatal(self) -> Result<T, AttemptError<E>> {
        self.map_err(AttemptError::Fatal)
    }

    fn transient(self) -> Result<T, AttemptError<E>> {
        self.map_err(AttemptError::Transient)
    }
}

/// Why a retry session ended without a value.
///
/// `I` is the stopping policy's interrupt type; it is [`Infallible`] for
/// policies that can never be interrupted.
#[derive(Debug, PartialEq, Eq)]
pub enum Termination<E, I = Infallible> {
    /// The stopping policy gave up; carries the last transient error.
    Exhausted(E),
    /// The operation reported a fatal error; carries it unwrapped.
    Fatal(E),
    /// The wait was cancelled from outside.
    Interrupted(I),
}

impl<E, I> Termination<E, I> {
    /// The operation's error, unless the session was interrupted.
    pub fn error(&self) -> Option<&E> {
        match self {
            Termination::Exhausted(e) | Termination::Fatal(e) => Some(e),
            Termination::Interrupted(_) => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Termination::Interrupted(_))
    }
}

impl<E> Termination<E, Infallible> {
    /// Collapse to the operation's own error (exhaustion and fatal alike).
    pub fn into_error(self) -> E {
        match self {
            Termination::Exhausted(e) | Termination::Fatal(e) => e,
            Termination::Interrupted(never) => match never {},
        }
    }
}

impl<E: fmt::Display, I> fmt::Display for Termination<E, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exhausted(e) => write!(f, "retries exhausted: {}", e),
            Termination::Fatal(e) => write!(f, "{}", e),
            Termination::Interrupted(_) => write!(f, "retry interrupted"),
        }
    }
}

impl<E, I> std::error::Error for Termination<E, I>
where
    E: std::error::Error + 'static,
    I: fmt::Debug,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Termination::Exhausted(e) | Termination::Fatal(e) => Some(e),
            Termination::Interrupted(_) => None,
        }
    }
}
