//! Argument parsing and config overlay.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use clap_complete::Shell;
use fibretry_core::config::{FibretryConfig, PolicyConfig};

#[test]
fn cli_parse_run_with_attempts() {
    match parse(&["fibretry", "run", "--attempts", "3", "--", "curl", "-f", "http://x"]) {
        CliCommand::Run(args) => {
            assert_eq!(args.attempts, Some(3));
            assert_eq!(args.command, vec!["curl", "-f", "http://x"]);
            assert!(args.fatal_exit_codes.is_empty());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_without_separator_keeps_command_flags() {
    match parse(&["fibretry", "run", "ls", "-la"]) {
        CliCommand::Run(args) => assert_eq!(args.command, vec!["ls", "-la"]),
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_backoff_and_fatal_codes() {
    match parse(&[
        "fibretry",
        "run",
        "--max-wait",
        "2.5",
        "--unit-ms",
        "100",
        "--no-jitter",
        "--fatal-exit-code",
        "2",
        "--fatal-exit-code",
        "64",
        "--",
        "true",
    ]) {
        CliCommand::Run(args) => {
            assert_eq!(args.backoff.max_wait, Some(2.5));
            assert_eq!(args.backoff.unit_ms, Some(100));
            assert!(args.backoff.no_jitter);
            assert_eq!(args.fatal_exit_codes, vec![2, 64]);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_run_requires_a_command() {
    assert!(Cli::try_parse_from(["fibretry", "run", "--attempts", "2"]).is_err());
}

#[test]
fn cli_run_policies_conflict() {
    let both = ["fibretry", "run", "--attempts", "2", "--deadline", "5", "true"];
    assert!(Cli::try_parse_from(both).is_err());
    let forever = ["fibretry", "run", "--forever", "--attempts", "2", "true"];
    assert!(Cli::try_parse_from(forever).is_err());
}

#[test]
fn run_flags_override_config_policy() {
    let base = FibretryConfig::default();

    let CliCommand::Run(args) = parse(&["fibretry", "run", "--deadline", "30", "true"]) else {
        panic!("expected Run");
    };
    let cfg = args.effective_config(base.clone());
    assert_eq!(cfg.policy, PolicyConfig::Deadline { deadline_secs: 30.0 });
    assert_eq!(cfg.max_wait_secs, base.max_wait_secs);

    let forever = parse(&["fibretry", "run", "--forever", "--no-jitter", "true"]);
    let CliCommand::Run(args) = forever else {
        panic!("expected Run");
    };
    let cfg = args.effective_config(base.clone());
    assert_eq!(cfg.policy, PolicyConfig::Unbounded);
    assert!(!cfg.jitter);

    let CliCommand::Run(args) = parse(&["fibretry", "run", "true"]) else {
        panic!("expected Run");
    };
    assert_eq!(args.effective_config(base.clone()), base);
}

#[test]
fn cli_parse_sequence() {
    match parse(&["fibretry", "sequence", "--count", "5", "--seed", "9", "--max-wait", "15"]) {
        CliCommand::Sequence(args) => {
            assert_eq!(args.count, 5);
            assert_eq!(args.seed, Some(9));
            assert_eq!(args.backoff.max_wait, Some(15.0));
        }
        _ => panic!("expected Sequence"),
    }
    match parse(&["fibretry", "sequence"]) {
        CliCommand::Sequence(args) => {
            assert_eq!(args.count, 10);
            assert!(args.seed.is_none());
        }
        _ => panic!("expected Sequence"),
    }
}

#[test]
fn cli_parse_config_and_completions() {
    assert!(matches!(parse(&["fibretry", "config"]), CliCommand::Config));
    match parse(&["fibretry", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
}
