//! The probe pipeline: locate, sample, compute, send.
//!
//! Stages run strictly one after another. `alive` stops after the lookup;
//! `mem` and `all` continue into jstat sampling and submission when the
//! process was found.

use std::io::Write;
use tracing::{debug, info, instrument};

use crate::cli::Mode;
use crate::config::Config;
use crate::error::ProbeError;
use crate::jstat;
use crate::metrics::MetricSet;
use crate::process::{self, ProcessRecord};
use crate::runner::CommandRunner;
use crate::sender::{MetricSender, SendReport};

/// Result of one probe run.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub record: ProcessRecord,
    pub metrics: MetricSet,
    /// Present when metrics were submitted (or simulated)
    pub report: Option<SendReport>,
}

impl ProbeOutcome {
    fn idle(record: ProcessRecord) -> Self {
        Self {
            record,
            metrics: MetricSet::default(),
            report: None,
        }
    }
}

/// Runs the pipeline for `name` in `mode`, writing the item value to `out`.
///
/// `out` receives the match count for `alive`/`all` and a literal `0` for
/// `mem`, followed by any dry-run simulation lines.
#[instrument(skip(runner, config, out))]
pub async fn run_probe<W: Write>(
    runner: &dyn CommandRunner,
    config: &Config,
    name: &str,
    mode: Mode,
    out: &mut W,
) -> Result<ProbeOutcome, ProbeError> {
    let mut record = process::locate(runner, config, name).await?;

    // mem mode prints a 0 placeholder instead of the count
    let printed = if mode.reports_count() { record.matches } else { 0 };
    let _ = writeln!(out, "{}", printed);

    let pid = match record.pid {
        Some(pid) if mode.sends_memory() => pid,
        Some(_) => return Ok(ProbeOutcome::idle(record)),
        None => {
            debug!("No process named {} found, skipping jstat and zabbix_sender", name);
            return Ok(ProbeOutcome::idle(record));
        }
    };

    record.stats = jstat::fetch_all(runner, config, pid).await?;
    let metrics = MetricSet::compute(&record.stats)?;
    debug!("Dumping zabbix stat set: {:?}", metrics);

    let sender = MetricSender::new(runner, config);
    let report = sender.send_all(&record.name, &metrics, out).await;
    info!(
        "Probe of {} (pid {}) finished, {} submission failures",
        record.name,
        pid,
        report.failure_count()
    );

    Ok(ProbeOutcome {
        record,
        metrics,
        report: Some(report),
    })
}
