//! CLI arguments for herakles-jstat-probe.
//!
//! This module defines the command-line interface structure using the clap library.
//! The two positional arguments mirror the Zabbix UserParameter contract:
//! `herakles-jstat-probe <process_name> alive|mem|all`.

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Which stages of the probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Print the number of running processes
    Alive,
    /// Send memory stats
    Mem,
    /// Do both
    All,
}

impl Mode {
    pub fn reports_count(self) -> bool {
        matches!(self, Mode::Alive | Mode::All)
    }

    pub fn sends_memory(self) -> bool {
        matches!(self, Mode::Mem | Mode::All)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Alive => "alive",
            Mode::Mem => "mem",
            Mode::All => "all",
        };
        f.write_str(s)
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-jstat-probe",
    about = "Zabbix probe for JVM process presence and heap/permgen usage",
    long_about = "Zabbix probe for JVM process presence and heap/permgen usage.\n\n\
                  Looks up a Java process by its jps name, prints how many are running and \
                  forwards heap and permanent generation usage collected with jstat to Zabbix \
                  through zabbix_sender.",
    author = "Michael Moll <proc-mem@herakles.io> - Herakles IO",
    version = "0.1.0",
    after_help = "Modes:\n  alive  Return number of running process\n  mem    Send memory stats\n  all    Do both"
)]
pub struct Args {
    /// Java process name as seen in jps output
    #[arg(required_unless_present_any = ["show_config", "check_config"])]
    pub process_name: Option<String>,

    /// alive | mem | all
    #[arg(value_enum, required_unless_present_any = ["show_config", "check_config"])]
    pub mode: Option<Mode>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print zabbix_sender commands instead of executing them
    #[arg(long, conflicts_with = "send")]
    pub dry_run: bool,

    /// Execute zabbix_sender even if the config disables sending
    #[arg(long)]
    pub send: bool,

    /// Timeout in seconds for every external command
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Log level (logs go to stderr)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Short usage text printed on argument errors.
pub fn usage(program: &str) -> String {
    format!(
        "\nUsage : {program} process_name alive|mem|all\n\
         process_name : java process name as seen in jps output\n\
         Modes : \n\talive : Return number of running process\n\tmem : Send memory stats\n\tall : Do both\n"
    )
}
