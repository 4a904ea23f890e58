//! Java process lookup via `jps`.
//!
//! `jps` prints one `<pid> <name>` line per running JVM. A process matches
//! when its name field is exactly the requested name; when several match, the
//! last one listed is the one we sample.

use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::ProbeError;
use crate::jstat::JvmStats;
use crate::runner::{CommandRunner, CommandSpec};

/// Everything known about the requested Java process during one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRecord {
    /// Process name as seen in jps output
    pub name: String,
    /// Number of jps lines whose name matched
    pub matches: usize,
    /// Pid of the last matching line; set iff `matches > 0`
    pub pid: Option<u32>,
    /// Raw jstat fields, filled only once a process was found
    pub stats: JvmStats,
}

impl ProcessRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.matches > 0
    }
}

/// Scans jps output for `name`, recording the match count and last pid.
pub fn parse_jps_output(output: &str, name: &str) -> Result<ProcessRecord, ProbeError> {
    let mut record = ProcessRecord::new(name);

    for (idx, line) in output.lines().enumerate() {
        let mut fields = line.split_whitespace();
        let Some(pid_field) = fields.next() else {
            continue;
        };
        let pid = pid_field.parse::<u32>().map_err(|_| {
            ProbeError::Lookup(format!(
                "unparsable jps line {}: '{}'",
                idx + 1,
                line.trim_end()
            ))
        })?;

        // A bare pid means jps could not resolve the main class.
        if fields.next() == Some(name) {
            debug!("Process found : {} with pid : {}", name, pid);
            record.pid = Some(pid);
            record.matches += 1;
        }
    }

    Ok(record)
}

/// Runs `<elevate> <jps>` and scans its output for the named process.
#[instrument(skip(runner, config))]
pub async fn locate(
    runner: &dyn CommandRunner,
    config: &Config,
    name: &str,
) -> Result<ProcessRecord, ProbeError> {
    let spec = CommandSpec::elevated(config.elevate(), config.jps_path(), Vec::<String>::new());
    let output = runner.run(&spec).await.map_err(ProbeError::LookupCommand)?;

    let record = parse_jps_output(&output.stdout, name)?;
    info!(
        "There is {} running process named {}",
        record.matches, record.name
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match() {
        let out = "1234 Jps\n5678 Bootstrap\n";
        let record = parse_jps_output(out, "Tomcat").unwrap();
        assert_eq!(record.matches, 0);
        assert_eq!(record.pid, None);
        assert!(!record.is_running());
    }

    #[test]
    fn test_single_match_records_pid() {
        let out = "1234 Jps\n5678 Bootstrap\n";
        let record = parse_jps_output(out, "Bootstrap").unwrap();
        assert_eq!(record.matches, 1);
        assert_eq!(record.pid, Some(5678));
    }

    #[test]
    fn test_last_match_wins() {
        let out = "100 Worker\n200 Jps\n300 Worker\n400 Other\n";
        let record = parse_jps_output(out, "Worker").unwrap();
        assert_eq!(record.matches, 2);
        assert_eq!(record.pid, Some(300));
    }

    #[test]
    fn test_match_is_exact_and_case_sensitive() {
        let out = "100 WorkerMain\n200 worker\n";
        let record = parse_jps_output(out, "Worker").unwrap();
        assert_eq!(record.matches, 0);
    }

    #[test]
    fn test_blank_and_bare_pid_lines_are_skipped() {
        let out = "\n4242\n   \n100 Worker\n";
        let record = parse_jps_output(out, "Worker").unwrap();
        assert_eq!(record.matches, 1);
        assert_eq!(record.pid, Some(100));
    }

    #[test]
    fn test_unparsable_line_is_lookup_error() {
        let out = "100 Worker\nsudo: a password is required\n";
        let err = parse_jps_output(out, "Worker").unwrap_err();
        assert!(matches!(err, ProbeError::Lookup(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_output() {
        let record = parse_jps_output("", "Worker").unwrap();
        assert_eq!(record.matches, 0);
        assert!(record.stats.is_empty());
    }
}
