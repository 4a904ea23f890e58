//! Configuration management for herakles-jstat-probe.
//!
//! The effective configuration is built once at startup from, in increasing
//! precedence: built-in defaults, a YAML/JSON/TOML config file, environment
//! variables and finally CLI flags. The result is passed explicitly to every
//! pipeline stage.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_JPS_PATH: &str = "/usr/java/default/bin/jps";
pub const DEFAULT_JSTAT_PATH: &str = "/usr/java/default/bin/jstat";
pub const DEFAULT_ELEVATE: &str = "sudo";
pub const DEFAULT_SENDER_PATH: &str = "/usr/bin/zabbix_sender";
pub const DEFAULT_SENDER_CONFIG: &str = "/etc/zabbix/zabbix_agentd.conf";
pub const DEFAULT_KEY_ROOT: &str = "custom.proc.java";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Config file locations probed when no `--config` is given.
const DEFAULT_CONFIG_LOCATIONS: &[&str] = &[
    "/etc/herakles/jstat-probe.yaml",
    "/etc/herakles/jstat-probe.yml",
    "/etc/herakles/jstat-probe.json",
    "/etc/herakles/jstat-probe.toml",
    "./herakles-jstat-probe.yaml",
    "./herakles-jstat-probe.yml",
    "./herakles-jstat-probe.json",
    "./herakles-jstat-probe.toml",
];

/// Probe configuration; every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // External tools
    #[serde(alias = "jps")]
    pub jps_path: Option<String>,
    #[serde(alias = "jstat")]
    pub jstat_path: Option<String>,
    /// Privilege wrapper for jps/jstat; empty string disables it
    pub elevate: Option<String>,

    // Zabbix
    #[serde(alias = "zabbix-sender", alias = "zabbix_sender")]
    pub sender_path: Option<String>,
    #[serde(alias = "zabbix-conf", alias = "zabbix_conf")]
    pub sender_config: Option<String>,
    #[serde(alias = "zabbix-key", alias = "zabbix_key")]
    pub key_root: Option<String>,
    /// false = dry run, print the zabbix_sender commands instead
    #[serde(alias = "send-to-zabbix", alias = "send_to_zabbix")]
    pub send: Option<bool>,

    // Execution
    pub command_timeout_secs: Option<u64>,

    // Logging
    pub log_level: Option<String>,

    /// File the configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jps_path: Some(DEFAULT_JPS_PATH.into()),
            jstat_path: Some(DEFAULT_JSTAT_PATH.into()),
            elevate: Some(DEFAULT_ELEVATE.into()),
            sender_path: Some(DEFAULT_SENDER_PATH.into()),
            sender_config: Some(DEFAULT_SENDER_CONFIG.into()),
            key_root: Some(DEFAULT_KEY_ROOT.into()),
            send: Some(true),
            command_timeout_secs: Some(DEFAULT_COMMAND_TIMEOUT_SECS),
            log_level: Some("warn".into()),
            source: None,
        }
    }
}

impl Config {
    /// Fills every unset field from `Config::default()`.
    pub fn with_defaults(mut self) -> Self {
        let d = Config::default();
        self.jps_path = self.jps_path.or(d.jps_path);
        self.jstat_path = self.jstat_path.or(d.jstat_path);
        self.elevate = self.elevate.or(d.elevate);
        self.sender_path = self.sender_path.or(d.sender_path);
        self.sender_config = self.sender_config.or(d.sender_config);
        self.key_root = self.key_root.or(d.key_root);
        self.send = self.send.or(d.send);
        self.command_timeout_secs = self.command_timeout_secs.or(d.command_timeout_secs);
        self.log_level = self.log_level.or(d.log_level);
        self
    }

    pub fn jps_path(&self) -> &str {
        self.jps_path.as_deref().unwrap_or(DEFAULT_JPS_PATH)
    }

    pub fn jstat_path(&self) -> &str {
        self.jstat_path.as_deref().unwrap_or(DEFAULT_JSTAT_PATH)
    }

    pub fn elevate(&self) -> Option<&str> {
        self.elevate.as_deref()
    }

    pub fn sender_path(&self) -> &str {
        self.sender_path.as_deref().unwrap_or(DEFAULT_SENDER_PATH)
    }

    pub fn sender_config(&self) -> &str {
        self.sender_config.as_deref().unwrap_or(DEFAULT_SENDER_CONFIG)
    }

    pub fn key_root(&self) -> &str {
        self.key_root.as_deref().unwrap_or(DEFAULT_KEY_ROOT)
    }

    pub fn send_enabled(&self) -> bool {
        self.send.unwrap_or(true)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(
            self.command_timeout_secs
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        )
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    let paths = [
        ("jps_path", cfg.jps_path()),
        ("jstat_path", cfg.jstat_path()),
        ("sender_path", cfg.sender_path()),
        ("sender_config", cfg.sender_config()),
    ];
    for (name, value) in paths {
        if value.trim().is_empty() {
            bail!("{} must not be empty", name);
        }
    }

    let root = cfg.key_root();
    if root.trim().is_empty() {
        bail!("key_root must not be empty");
    }
    if root.contains('[') || root.contains(']') {
        bail!("Invalid key_root '{}': brackets are reserved for the metric", root);
    }

    if cfg.command_timeout_secs == Some(0) {
        bail!("command_timeout_secs must be greater than 0");
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if parse_log_level(level).is_none() {
            bail!(
                "Invalid log_level '{}', expected off|error|warn|info|debug|trace",
                level
            );
        }
    }

    Ok(())
}

/// Maps a config log level string onto the CLI enum.
pub fn parse_log_level(level: &str) -> Option<crate::cli::LogLevel> {
    use crate::cli::LogLevel;
    match level.to_ascii_lowercase().as_str() {
        "off" => Some(LogLevel::Off),
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}

/// Resolves configuration from CLI args, environment, config file, and defaults
pub fn resolve_config(args: &Args) -> Result<Config> {
    let config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };
    let mut config = apply_env_overrides(config.with_defaults(), |name| std::env::var(name).ok())?;

    // Override with CLI args
    if args.dry_run {
        config.send = Some(false);
    }
    if args.send {
        config.send = Some(true);
    }
    if let Some(secs) = args.timeout {
        config.command_timeout_secs = Some(secs);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(format!("{:?}", level).to_ascii_lowercase());
    }

    Ok(config)
}

/// Applies `HERAKLES_JSTAT_*` overrides read through `lookup`.
pub fn apply_env_overrides<F>(
    mut config: Config,
    lookup: F,
) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("HERAKLES_JSTAT_JPS") {
        config.jps_path = Some(v);
    }
    if let Some(v) = lookup("HERAKLES_JSTAT_JSTAT") {
        config.jstat_path = Some(v);
    }
    if let Some(v) = lookup("HERAKLES_JSTAT_ELEVATE") {
        config.elevate = Some(v);
    }
    if let Some(v) = lookup("HERAKLES_JSTAT_SENDER") {
        config.sender_path = Some(v);
    }
    if let Some(v) = lookup("HERAKLES_JSTAT_SENDER_CONFIG") {
        config.sender_config = Some(v);
    }
    if let Some(v) = lookup("HERAKLES_JSTAT_KEY_ROOT") {
        config.key_root = Some(v);
    }
    if let Some(v) = lookup("HERAKLES_JSTAT_SEND") {
        config.send = Some(
            parse_bool(&v)
                .ok_or_else(|| anyhow!("HERAKLES_JSTAT_SEND: expected a boolean, got '{}'", v))?,
        );
    }
    if let Some(v) = lookup("HERAKLES_JSTAT_TIMEOUT_SECS") {
        config.command_timeout_secs = Some(
            v.trim()
                .parse::<u64>()
                .with_context(|| format!("HERAKLES_JSTAT_TIMEOUT_SECS: invalid value '{}'", v))?,
        );
    }
    Ok(config)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Loads the config file at `path`, or the first default location that exists.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                bail!("Config file not found: {}", p.display());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
        {
            Some(p) => p,
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let parsed: Result<Config> = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(Into::into),
        Some("toml") => toml::from_str(&content).map_err(Into::into),
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(Into::into),
    };
    let mut config = parsed.with_context(|| format!("Invalid config file {}", path.display()))?;
    config.source = Some(path);
    Ok(config)
}

/// Renders configuration in requested format
pub fn render_config(
    config: &Config,
    format: &ConfigFormat,
) -> Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}
