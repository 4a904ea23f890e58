// herakles-jstat-probe - version 0.1.0
// Zabbix probe for JVM heap/permgen usage with tracing logging
use clap::error::ErrorKind;
use clap::Parser;
use std::io::Write;
use tracing::{debug, info, Level};

use herakles_jstat_probe::cli::{usage, Args, LogLevel};
use herakles_jstat_probe::config::{
    parse_log_level, render_config, resolve_config, validate_effective_config, Config,
};
use herakles_jstat_probe::run_probe;
use herakles_jstat_probe::runner::SystemRunner;

/// Initializes tracing logging subsystem with configured log level.
/// Logs go to stderr; stdout carries the Zabbix item value.
fn setup_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .and_then(parse_log_level)
        .unwrap_or(LogLevel::Warn);

    let log_level = match level {
        LogLevel::Off => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    debug!("Logging initialized with level: {:?}", level);
}

/// Parses arguments; usage errors exit with code 1.
fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(e) => {
            let program = std::env::args()
                .next()
                .unwrap_or_else(|| "herakles-jstat-probe".into());
            let _ = e.print();
            eprintln!("{}", usage(&program));
            std::process::exit(1);
        }
    }
}

/// -------------------------------------------------------------------
/// MAIN APPLICATION ENTRY POINT
/// -------------------------------------------------------------------
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = parse_args();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {:#}", e);
        std::process::exit(1);
    }

    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    if args.show_config {
        println!("{}", render_config(&config, &args.config_format)?);
        return Ok(());
    }

    setup_logging(&config);
    match &config.source {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => debug!("No config file loaded, using defaults"),
    }

    // clap enforces both positionals unless --show-config/--check-config is given
    let (Some(name), Some(mode)) = (args.process_name.as_deref(), args.mode) else {
        eprintln!("{}", usage("herakles-jstat-probe"));
        std::process::exit(1);
    };

    info!(
        "Probing '{}' in mode {} ({})",
        name,
        mode,
        if config.send_enabled() { "send" } else { "dry run" }
    );

    let runner = SystemRunner::new(config.command_timeout());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match run_probe(&runner, &config, name, mode, &mut out).await {
        Ok(outcome) => {
            out.flush()?;
            if let Some(report) = &outcome.report {
                for (metric, e) in report.failures() {
                    eprintln!("Something went wrong while sending {}: {}", metric, e);
                }
            }
            Ok(())
        }
        Err(e) => {
            let _ = out.flush();
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}
