//! CLI for the fibretry backoff/retry engine.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use fibretry_core::config::{self, FibretryConfig, PolicyConfig};

use commands::{run_completions, run_config, run_retry, run_sequence, CommandSpec};

/// Top-level CLI for fibretry.
#[derive(Debug, Parser)]
#[command(name = "fibretry")]
#[command(about = "fibretry: retry commands with Fibonacci backoff", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run a command, retrying it with backoff until it succeeds or the policy gives up.
    Run(RunArgs),

    /// Print the first waits of a backoff sequence.
    Sequence(SequenceArgs),

    /// Show the config file path and the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Backoff overrides shared by `run` and `sequence`.
#[derive(Debug, Args)]
pub struct BackoffArgs {
    /// Ceiling for a single wait, in seconds.
    #[arg(long, value_name = "SECS")]
    pub max_wait: Option<f64>,
    /// Duration of one Fibonacci step, in milliseconds.
    #[arg(long, value_name = "MS")]
    pub unit_ms: Option<u64>,
    /// Wait exactly the capped Fibonacci value instead of a random point in [base/2, base].
    #[arg(long)]
    pub no_jitter: bool,
}

impl BackoffArgs {
    pub fn overlay(&self, mut cfg: FibretryConfig) -> FibretryConfig {
        if let Some(secs) = self.max_wait {
            cfg.max_wait_secs = secs;
        }
        if let Some(ms) = self.unit_ms {
            cfg.unit_ms = ms;
        }
        if self.no_jitter {
            cfg.jitter = false;
        }
        cfg
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Give up after N attempts (including the first).
    #[arg(long, value_name = "N", conflicts_with = "deadline")]
    pub attempts: Option<u32>,
    /// Give up once SECS seconds have passed since the first attempt.
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<f64>,
    /// Retry until the command succeeds or Ctrl-C is pressed.
    #[arg(long, conflicts_with_all = ["attempts", "deadline"])]
    pub forever: bool,
    #[command(flatten)]
    pub backoff: BackoffArgs,
    /// Exit code that must not be retried (repeatable).
    #[arg(long = "fatal-exit-code", value_name = "CODE")]
    pub fatal_exit_codes: Vec<i32>,
    /// Command to run, followed by its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Config file values with command-line overrides applied.
    pub fn effective_config(&self, cfg: FibretryConfig) -> FibretryConfig {
        let mut cfg = self.backoff.overlay(cfg);
        if let Some(max_attempts) = self.attempts {
            cfg.policy = PolicyConfig::Attempts { max_attempts };
        } else if let Some(deadline_secs) = self.deadline {
            cfg.policy = PolicyConfig::Deadline { deadline_secs };
        } else if self.forever {
            cfg.policy = PolicyConfig::Unbounded;
        }
        cfg
    }
}

#[derive(Debug, Args)]
pub struct SequenceArgs {
    #[command(flatten)]
    pub backoff: BackoffArgs,
    /// Number of waits to print.
    #[arg(long, default_value = "10", value_name = "N")]
    pub count: usize,
    /// Seed for the jitter source, for reproducible output.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

impl CliCommand {
    /// Returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Run(args) => {
                let cfg = args.effective_config(load_config()?);
                cfg.validate()?;
                let spec = CommandSpec::new(&args.command, args.fatal_exit_codes.clone())?;
                run_retry(&cfg, spec).await
            }
            CliCommand::Sequence(args) => {
                let cfg = args.backoff.overlay(load_config()?);
                cfg.validate()?;
                run_sequence(&cfg, args.count, args.seed)?;
                Ok(0)
            }
            CliCommand::Config => {
                run_config(&load_config()?)?;
                Ok(0)
            }
            CliCommand::Completions { shell } => {
                run_completions(shell);
                Ok(0)
            }
        }
    }
}

fn load_config() -> Result<FibretryConfig> {
    let cfg = config::load_or_init()?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok(cfg)
}

#[cfg(test)]
mod tests;
