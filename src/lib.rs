//! herakles-jstat-probe library.
//!
//! Reports whether a named Java process is running and forwards its heap and
//! permanent generation usage to Zabbix. The binary in `main.rs` is a thin
//! wrapper around [`probe::run_probe`].

pub mod cli;
pub mod config;
pub mod error;
pub mod jstat;
pub mod metrics;
pub mod probe;
pub mod process;
pub mod runner;
pub mod sender;

pub use error::{CommandError, ProbeError};
pub use probe::{run_probe, ProbeOutcome};
