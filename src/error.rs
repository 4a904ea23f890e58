//! Error types for herakles-jstat-probe.
//!
//! External invocations fail with a [`CommandError`]; the pipeline stages wrap
//! those (or their own parse failures) in a [`ProbeError`] that tells the
//! caller which stage broke.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single external command invocation.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {}s", .timeout.as_secs_f64())]
    Timeout { program: String, timeout: Duration },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }
}

/// Stage-level failures of a probe run.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("process lookup failed: {0}")]
    Lookup(String),

    #[error("process lookup failed: {0}")]
    LookupCommand(#[source] CommandError),

    #[error("stats fetch failed for pid {pid} ({flag}): {message}")]
    StatsFetch {
        pid: u32,
        flag: &'static str,
        message: String,
    },

    #[error("stats fetch failed for pid {pid} ({flag}): {source}")]
    StatsFetchCommand {
        pid: u32,
        flag: &'static str,
        #[source]
        source: CommandError,
    },

    #[error("stats parse failed: field '{field}' {reason}")]
    StatsParse { field: String, reason: String },

    #[error("submission of '{key}' failed: {source}")]
    Submission {
        key: String,
        #[source]
        source: CommandError,
    },
}

impl ProbeError {
    pub fn stats_parse(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ProbeError::StatsParse {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_program() {
        let err = CommandError::Timeout {
            program: "jstat".into(),
            timeout: Duration::from_secs(5),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "'jstat' timed out after 5s");
    }

    #[test]
    fn test_submission_message_names_key() {
        let err = ProbeError::Submission {
            key: "custom.proc.java.app[heap_used]".into(),
            source: CommandError::Failed {
                program: "zabbix_sender".into(),
                status: "exit status: 2".into(),
                stderr: String::new(),
            },
        };
        assert!(err
            .to_string()
            .starts_with("submission of 'custom.proc.java.app[heap_used]' failed"));
        assert_eq!(
            ProbeError::stats_parse("PU", "is missing").to_string(),
            "stats parse failed: field 'PU' is missing"
        );
    }
}
