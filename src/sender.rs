//! Metric submission through `zabbix_sender`.
//!
//! Every metric is sent with its own `zabbix_sender` call so one failing
//! submission never blocks the others. In dry-run mode the command line is
//! printed instead of executed.

use std::io::Write;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ProbeError;
use crate::metrics::{format_value, MetricName, MetricSet};
use crate::runner::{CommandRunner, CommandSpec};

/// Builds the Zabbix item key `<root>.<lowercased name>[<metric>]`.
pub fn zabbix_key(root: &str, process_name: &str, metric: MetricName) -> String {
    format!("{}.{}[{}]", root, process_name.to_lowercase(), metric)
}

/// Outcome of a single metric submission.
#[derive(Debug)]
pub enum SendOutcome {
    Sent,
    Simulated,
    Failed(ProbeError),
}

/// Per-metric results of one `send_all` pass, in submission order.
#[derive(Debug, Default)]
pub struct SendReport {
    pub entries: Vec<(MetricName, SendOutcome)>,
}

impl SendReport {
    pub fn failures(&self) -> impl Iterator<Item = (MetricName, &ProbeError)> + '_ {
        self.entries.iter().filter_map(|(m, o)| match o {
            SendOutcome::Failed(e) => Some((*m, e)),
            _ => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Sends (or simulates sending) a process's metrics.
pub struct MetricSender<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a Config,
}

impl<'a> MetricSender<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a Config) -> Self {
        Self { runner, config }
    }

    /// The zabbix_sender invocation for one key/value pair.
    pub fn command(&self, key: &str, value: &str) -> CommandSpec {
        CommandSpec::new(
            self.config.sender_path(),
            ["-c", self.config.sender_config(), "-k", key, "-o", value],
        )
    }

    /// Submits every metric in order. Dry-run output goes to `out`.
    pub async fn send_all<W: Write>(
        &self,
        process_name: &str,
        metrics: &MetricSet,
        out: &mut W,
    ) -> SendReport {
        let mut report = SendReport::default();
        for (metric, value) in metrics.iter() {
            let outcome = self.send_one(process_name, metric, value, out).await;
            report.entries.push((metric, outcome));
        }
        info!(
            "Submitted {} metrics, {} failed",
            report.entries.len(),
            report.failure_count()
        );
        report
    }

    async fn send_one<W: Write>(
        &self,
        process_name: &str,
        metric: MetricName,
        value: f64,
        out: &mut W,
    ) -> SendOutcome {
        let key = zabbix_key(self.config.key_root(), process_name, metric);
        let value = format_value(value);
        let spec = self.command(&key, &value);

        if !self.config.send_enabled() {
            // Write errors on the dry-run output are ignored.
            let _ = writeln!(
                out,
                "Simulation: the following command would be executed :\n{}\n",
                spec
            );
            return SendOutcome::Simulated;
        }

        debug!("Sending {} = {}", key, value);
        match self.runner.run(&spec).await {
            Ok(_) => SendOutcome::Sent,
            Err(source) => SendOutcome::Failed(ProbeError::Submission { key, source }),
        }
    }
}
