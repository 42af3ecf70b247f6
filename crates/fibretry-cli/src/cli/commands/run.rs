//! `fibretry run` – retry an external command with Fibonacci backoff.

use anyhow::{bail, Result};
use fibretry_core::config::FibretryConfig;
use fibretry_core::retry::{AttemptError, Completion, Retrier, StopPolicy, Termination};
use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::process::Command;
use std::sync::mpsc;
use thiserror::Error;

/// Exit status reported when the session is stopped with Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Why one run of the command failed.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started at all (not found, not executable). Never retried.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    /// The program ran and exited unsuccessfully.
    #[error("{program} {}", describe_exit(.code))]
    Exit { program: String, code: Option<i32> },
}

impl CommandError {
    /// Exit code fibretry itself should report for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Spawn { .. } => 127,
            CommandError::Exit { code, .. } => code.unwrap_or(1),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with status {}", c),
        None => "was terminated by a signal".to_string(),
    }
}

/// Map an exit code to the retry loop's classification.
pub fn classify_exit(
    program: &str,
    code: Option<i32>,
    fatal_exit_codes: &[i32],
) -> Result<(), AttemptError<CommandError>> {
    let err = CommandError::Exit {
        program: program.to_string(),
        code,
    };
    match code {
        Some(0) => Ok(()),
        Some(c) if fatal_exit_codes.contains(&c) => Err(AttemptError::Fatal(err)),
        _ => Err(AttemptError::Transient(err)),
    }
}

/// The command line to retry and the exit codes that end the session.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    fatal_exit_codes: Vec<i32>,
}

impl CommandSpec {
    pub fn new(command: &[String], fatal_exit_codes: Vec<i32>) -> Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("no command given");
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            fatal_exit_codes,
        })
    }

    /// Run the command once, blocking until it exits.
    pub fn attempt(&self) -> Result<(), AttemptError<CommandError>> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .map_err(|source| {
                AttemptError::Fatal(CommandError::Spawn {
                    program: self.program.clone(),
                    source,
                })
            })?;
        classify_exit(&self.program, status.code(), &self.fatal_exit_codes)
    }
}

/// Run `spec` under the policy in `cfg`; returns the exit code to report.
pub async fn run_retry(cfg: &FibretryConfig, spec: CommandSpec) -> Result<i32> {
    let retrier = Retrier::new(cfg.backoff()?);
    tracing::info!(
        program = %spec.program,
        policy = ?cfg.policy,
        "starting retry session"
    );

    let outcome = if let Some(limit) = cfg.policy.attempt_limit() {
        run_bounded(retrier, limit, spec).await?
    } else if let Some(deadline) = cfg.policy.deadline()? {
        run_bounded(retrier, deadline, spec).await?
    } else {
        run_until_interrupted(retrier, spec).await?
    };

    match outcome {
        Ok(Completion::Done(())) => Ok(0),
        Ok(Completion::Interrupted) => {
            eprintln!("fibretry: interrupted");
            Ok(INTERRUPTED_EXIT_CODE)
        }
        Err(err) => {
            eprintln!("fibretry: {}", err);
            Ok(err.exit_code())
        }
    }
}

async fn run_bounded<P>(
    mut retrier: Retrier,
    mut policy: P,
    spec: CommandSpec,
) -> Result<Result<Completion<()>, CommandError>>
where
    P: StopPolicy<Interrupt = Infallible> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || {
        retrier
            .run(&mut policy, || spec.attempt())
            .map(Completion::Done)
            .map_err(Termination::into_error)
    })
    .await?;
    Ok(outcome)
}

/// Unbounded session; Ctrl-C stops it at the next wait, a second Ctrl-C at once.
async fn run_until_interrupted(
    retrier: Retrier,
    spec: CommandSpec,
) -> Result<Result<Completion<()>, CommandError>> {
    run_cancellable_session(retrier, spec, tokio::signal::ctrl_c).await
}

/// Race an unbounded session against `interrupt`.
///
/// The first interrupt asks the loop to stop at its next wait. A second one
/// abandons the attempt still running and reports the session as interrupted.
pub async fn run_cancellable_session<S, Fut>(
    mut retrier: Retrier,
    spec: CommandSpec,
    mut interrupt: S,
) -> Result<Result<Completion<()>, CommandError>>
where
    S: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    let (stop_tx, stop_rx) = mpsc::channel();
    let mut session =
        tokio::task::spawn_blocking(move || retrier.run_cancellable(&stop_rx, || spec.attempt()));

    let outcome = tokio::select! {
        joined = &mut session => joined?,
        _ = interrupt() => {
            tracing::info!("interrupt received, stopping at the next wait");
            let _ = stop_tx.send(());
            tokio::select! {
                joined = &mut session => joined?,
                _ = interrupt() => {
                    tracing::warn!("second interrupt received, abandoning the running attempt");
                    Ok(Completion::Interrupted)
                }
            }
        }
    };
    Ok(outcome)
}
