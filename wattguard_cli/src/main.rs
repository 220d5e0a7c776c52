mod backend;
mod cli;
mod error_fmt;
mod session;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wattguard_core::error::GuardError;
use wattguard_core::{CommandInput, NoInput};
use wattguard_traits::{Clock, ManualClock, Reading};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::session::LoopOpts;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    match real_main(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "wattguard failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", error_fmt::format_error_json(&err));
            } else {
                eprintln!("{}", error_fmt::humanize(&err));
            }
            let code = error_fmt::exit_code_for_error(&err);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn load_config(path: &std::path::Path) -> eyre::Result<wattguard_config::Config> {
    let text = std::fs::read_to_string(path).wrap_err_with(|| format!("read config {path:?}"))?;
    let cfg = wattguard_config::load_toml(&text)?;
    cfg.validate()
        .map_err(|e| eyre::Report::new(GuardError::Config(e.to_string())))?;
    Ok(cfg)
}

/// Console layer on stderr plus an optional JSON file layer from `[logging]`.
fn init_tracing(cli: &Cli, logging: &wattguard_config::Logging) {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = if cli.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = logging.file.as_ref().map(|path| {
        let path = std::path::Path::new(path);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "wattguard.log".into(), |n| n.to_os_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
}

fn shutdown_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    flag
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging);
    tracing::info!(config = ?cli.config, "config loaded");

    match &cli.cmd {
        Commands::Run {
            max_ticks,
            period_ms,
            replay_history,
        } => {
            let backend = backend::open(&cfg)?;
            let mut monitor = session::build_monitor(&cfg, backend, None)?;
            let mut input = CommandInput::spawn(std::io::stdin());
            let opts = LoopOpts {
                period: Duration::from_millis(period_ms.unwrap_or(cfg.sampling.period_ms)),
                max_ticks: *max_ticks,
                replay_history: *replay_history,
            };
            session::run_loop(&mut monitor, &mut input, cli.json, opts, shutdown_flag())?;
        }
        Commands::Replay { csv, max_ticks } => {
            let rows = wattguard_config::load_replay_file(csv)?;
            let source = wattguard_hardware::ReplaySource::new(
                rows.iter().map(|r| Reading::new(r.voltage, r.current)),
            );
            tracing::info!(rows = source.remaining(), file = ?csv, "replaying");
            let backend: backend::Backend = (
                Box::new(source),
                Box::new(wattguard_hardware::SimulatedRelay::new()),
            );
            // Timestamps follow the configured period without real sleeps.
            let clock: Box<dyn Clock + Send + Sync> = Box::new(ManualClock::new());
            let mut monitor = session::build_monitor(&cfg, backend, Some(clock))?;
            let opts = LoopOpts {
                period: Duration::from_millis(cfg.sampling.period_ms),
                max_ticks: *max_ticks,
                replay_history: false,
            };
            session::run_loop(&mut monitor, &mut NoInput, cli.json, opts, shutdown_flag())?;
        }
        Commands::SelfCheck => {
            let backend = backend::open(&cfg)?;
            session::self_check(&cfg, backend, cli.json)?;
        }
    }
    Ok(())
}
