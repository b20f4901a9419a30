mod cli;
mod commands;
mod error_fmt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use gamalog_config::Config;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

/// Exit code for a rotation pass that reported `Failed`.
const EXIT_ROTATION_FAILED: i32 = 3;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> eyre::Result<i32> {
    let cfg = gamalog_config::load_file(&cli.config)?;
    init_tracing(&cli, &cfg)?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install signal handler; stop with SIGKILL");
        }
    }

    match cli.cmd {
        Commands::Tail { interval_ms, once } => {
            commands::run_tail(&cfg, interval_ms, once, cli.json, shutdown)?;
        }
        Commands::Rotate => {
            let result = commands::run_rotate(&cfg, cli.json);
            if result.is_failure() {
                return Ok(EXIT_ROTATION_FAILED);
            }
        }
        Commands::Simulate {
            count,
            interval_ms,
            step_secs,
        } => {
            commands::run_simulate(&cfg, count, interval_ms, step_secs, shutdown)?;
        }
        Commands::SelfCheck => commands::self_check(&cfg, cli.json)?,
        Commands::Health => commands::health(&cfg, cli.json)?,
    }
    Ok(0)
}

/// Console layer on stderr (pretty or JSON) plus an optional JSON file layer.
///
/// Level precedence: `RUST_LOG`, then `--log-level`, then `[logging] level`.
fn init_tracing(cli: &Cli, cfg: &Config) -> eyre::Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&level).wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if cli.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(fmt::layer().with_writer(std::io::stderr).boxed());
    }

    if let Some(file) = cfg.logging.file.as_deref() {
        let path = Path::new(file);
        let dir = match path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        let appender = match cfg.logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
