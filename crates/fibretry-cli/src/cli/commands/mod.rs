//! CLI command handlers. Each command is in its own file.

mod completions;
mod config;
mod run;
mod sequence;

pub use completions::run_completions;
pub use config::run_config;
pub use run::{run_retry, CommandSpec};
pub use sequence::run_sequence;

#[cfg(test)]
pub use run::{classify_exit, run_cancellable_session, CommandError};
#[cfg(test)]
pub use sequence::sequence_waits;
