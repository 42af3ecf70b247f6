//! Command handlers: exit classification, backoff printing, and real child processes.

use crate::cli::commands::{classify_exit, run_retry, sequence_waits, CommandError, CommandSpec};
use fibretry_core::backoff::FibonacciBackoff;
use fibretry_core::config::{FibretryConfig, PolicyConfig};
use std::time::Duration;

fn fast_config(policy: PolicyConfig) -> FibretryConfig {
    FibretryConfig {
        max_wait_secs: 0.01,
        unit_ms: 1,
        jitter: false,
        policy,
    }
}

#[test]
fn exit_zero_is_success() {
    assert!(classify_exit("prog", Some(0), &[1]).is_ok());
}

#[test]
fn listed_exit_code_is_fatal() {
    let err = classify_exit("prog", Some(2), &[2, 64]).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.into_inner().exit_code(), 2);
}

#[test]
fn other_exit_codes_and_signals_are_transient() {
    assert!(!classify_exit("prog", Some(1), &[2]).unwrap_err().is_fatal());
    let err = classify_exit("prog", None, &[2]).unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(err.to_string(), "prog was terminated by a signal");
}

#[test]
fn exit_error_message_names_program_and_status() {
    let err = CommandError::Exit {
        program: "curl".into(),
        code: Some(22),
    };
    assert_eq!(err.to_string(), "curl exited with status 22");
}

#[test]
fn sequence_waits_match_capped_fibonacci() {
    let mut b = FibonacciBackoff::without_jitter(Duration::from_secs(15));
    let secs: Vec<u64> = sequence_waits(&mut b, 9).iter().map(|d| d.as_secs()).collect();
    assert_eq!(secs, vec![1, 2, 3, 5, 8, 13, 15, 15, 15]);
}

#[test]
fn spec_requires_a_program() {
    assert!(CommandSpec::new(&[], vec![]).is_err());
}

#[tokio::test]
async fn missing_program_reports_127_without_retrying() {
    let spec = CommandSpec::new(&["fibretry-no-such-program-xyz".to_string()], vec![]).unwrap();
    let cfg = fast_config(PolicyConfig::Attempts { max_attempts: 5 });
    assert_eq!(run_retry(&cfg, spec).await.unwrap(), 127);
}

#[test]
fn spawn_error_exit_code_matches_shells() {
    let err = CommandError::Spawn {
        program: "nope".into(),
        source: std::io::Error::from(std::io::ErrorKind::NotFound),
    };
    assert_eq!(err.exit_code(), 127);
}

#[cfg(unix)]
mod unix {
    use super::*;
    use crate::cli::commands::run_cancellable_session;
    use fibretry_core::retry::{Completion, Retrier};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// `sh -c` script that appends a line to `log` on every run, then runs `tail`.
    fn counting(log: &Path, tail: &str) -> CommandSpec {
        let script = format!("echo run >> '{}'; {}", log.display(), tail);
        CommandSpec::new(&["sh".into(), "-c".into(), script], vec![]).unwrap()
    }

    fn runs(log: &Path) -> usize {
        fs::read_to_string(log).map(|s| s.lines().count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn succeeding_command_runs_once() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("runs");
        let cfg = fast_config(PolicyConfig::Attempts { max_attempts: 5 });
        assert_eq!(run_retry(&cfg, counting(&log, "exit 0")).await.unwrap(), 0);
        assert_eq!(runs(&log), 1);
    }

    #[tokio::test]
    async fn failing_command_exhausts_attempts_and_reports_last_status() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("runs");
        let cfg = fast_config(PolicyConfig::Attempts { max_attempts: 3 });
        assert_eq!(run_retry(&cfg, counting(&log, "exit 3")).await.unwrap(), 3);
        assert_eq!(runs(&log), 3);
    }

    #[tokio::test]
    async fn fatal_exit_code_stops_immediately() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("runs");
        let script = format!("echo run >> '{}'; exit 7", log.display());
        let spec = CommandSpec::new(&["sh".into(), "-c".into(), script], vec![7]).unwrap();
        let cfg = fast_config(PolicyConfig::Attempts { max_attempts: 5 });
        assert_eq!(run_retry(&cfg, spec).await.unwrap(), 7);
        assert_eq!(runs(&log), 1);
    }

    #[tokio::test]
    async fn deadline_policy_keeps_retrying_until_deadline() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("runs");
        let cfg = fast_config(PolicyConfig::Deadline { deadline_secs: 0.05 });
        assert_eq!(run_retry(&cfg, counting(&log, "exit 4")).await.unwrap(), 4);
        assert!(runs(&log) >= 2);
    }

    #[tokio::test]
    async fn unbounded_policy_runs_until_success() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("runs");
        // succeeds on the third run
        let tail = format!("[ $(wc -l < '{}') -ge 3 ]", log.display());
        let cfg = fast_config(PolicyConfig::Unbounded);
        assert_eq!(run_retry(&cfg, counting(&log, &tail)).await.unwrap(), 0);
        assert_eq!(runs(&log), 3);
    }

    #[tokio::test]
    async fn first_interrupt_stops_at_the_next_wait() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("runs");
        let cfg = fast_config(PolicyConfig::Unbounded);
        let retrier = Retrier::new(cfg.backoff().unwrap());
        let mut fired = 0;
        let interrupt = move || {
            fired += 1;
            let fire = fired == 1;
            async move {
                if !fire {
                    std::future::pending::<()>().await;
                }
                Ok::<(), std::io::Error>(())
            }
        };

        let outcome = run_cancellable_session(retrier, counting(&log, "exit 1"), interrupt)
            .await
            .unwrap();
        assert!(matches!(outcome, Ok(Completion::Interrupted)));
        assert_eq!(runs(&log), 1);
    }

    #[tokio::test]
    async fn second_interrupt_abandons_a_running_attempt() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("runs");
        let cfg = fast_config(PolicyConfig::Unbounded);
        let retrier = Retrier::new(cfg.backoff().unwrap());
        let interrupt = || async { Ok::<(), std::io::Error>(()) };

        let start = std::time::Instant::now();
        // the child outlives both interrupts; only the second one ends the session early
        let outcome = run_cancellable_session(retrier, counting(&log, "sleep 2"), interrupt)
            .await
            .unwrap();
        assert!(matches!(outcome, Ok(Completion::Interrupted)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
