//! JVM statistics sampling via `jstat`.
//!
//! `jstat -gc <pid>` and `jstat -gccapacity <pid>` both print a header line of
//! column names followed by one line of values. Both tables are folded into a
//! single [`JvmStats`] mapping keyed by column name.

use ahash::AHashMap as HashMap;
use std::fmt;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::ProbeError;
use crate::runner::{CommandRunner, CommandSpec};

/// jstat output option selecting which counters are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatCategory {
    /// Garbage-collected heap usage counters
    Gc,
    /// Generation capacities
    GcCapacity,
}

impl StatCategory {
    pub const ALL: [StatCategory; 2] = [StatCategory::Gc, StatCategory::GcCapacity];

    pub fn flag(self) -> &'static str {
        match self {
            StatCategory::Gc => "-gc",
            StatCategory::GcCapacity => "-gccapacity",
        }
    }
}

/// Raw jstat fields, column name to unparsed value.
#[derive(Debug, Clone, Default)]
pub struct JvmStats(HashMap<String, String>);

impl JvmStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Merges `other` into self; keys from `other` win.
    pub fn merge(&mut self, other: JvmStats) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for JvmStats {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().all(|(k, v)| other.0.get(k) == Some(v))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JvmStats {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for JvmStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        for key in keys {
            writeln!(f, "{:>8} = {}", key, self.0[key])?;
        }
        Ok(())
    }
}

/// Pairs header tokens with data tokens.
///
/// Pairing stops at the shorter line: surplus names or values are dropped
/// rather than treated as an error.
pub fn pair_columns(header: &str, data: &str) -> JvmStats {
    header
        .split_whitespace()
        .zip(data.split_whitespace())
        .collect()
}

/// Parses a two-line jstat table. Fails only when a line is missing.
pub fn parse_jstat_table(output: &str) -> Result<JvmStats, String> {
    let mut lines = output.lines().filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or("empty output")?;
    let data = lines
        .next()
        .ok_or_else(|| format!("no data line after header '{}'", header.trim()))?;
    Ok(pair_columns(header, data))
}

/// Runs `<elevate> <jstat> <flag> <pid>` and parses the table.
#[instrument(skip(runner, config))]
pub async fn fetch(
    runner: &dyn CommandRunner,
    config: &Config,
    pid: u32,
    category: StatCategory,
) -> Result<JvmStats, ProbeError> {
    let flag = category.flag();
    let spec = CommandSpec::elevated(
        config.elevate(),
        config.jstat_path(),
        [flag.to_string(), pid.to_string()],
    );
    debug!("Getting {} stats for process {} with command : {}", flag, pid, spec);

    let output = runner
        .run(&spec)
        .await
        .map_err(|source| ProbeError::StatsFetchCommand { pid, flag, source })?;

    parse_jstat_table(&output.stdout).map_err(|message| ProbeError::StatsFetch {
        pid,
        flag,
        message,
    })
}

/// Fetches every category and merges them in order.
pub async fn fetch_all(
    runner: &dyn CommandRunner,
    config: &Config,
    pid: u32,
) -> Result<JvmStats, ProbeError> {
    let mut stats = JvmStats::new();
    for category in StatCategory::ALL {
        stats.merge(fetch(runner, config, pid, category).await?);
    }
    debug!("Dumping collected stat dictionary\n{}", stats);
    Ok(stats)
}
