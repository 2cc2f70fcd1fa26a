mod cli;
mod error_fmt;
mod run;
mod sim;
mod trace;
mod watch;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use livestate_config::{Config, Logging, Rotation};
use livestate_core::error::LiveStateError;
use livestate_core::{CompletionCfg, CompletionStatus, DeltaEngine, SerialCounter, wait_complete};
use livestate_traits::CommandState;
use livestate_traits::clock::MonotonicClock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);

    if let Err(e) = real_main(cli) {
        tracing::error!(error = %format!("{e:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    color_eyre::install()?;
    let cfg = load_config(cli.config.as_deref())?;
    init_logging(&cfg.logging, cli.log_level.as_deref(), cli.json)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("installing Ctrl-C handler")?;
    }

    match cli.cmd {
        Commands::Watch { ticks, full } => watch::run_watch(&cfg, ticks, full, cli.json, &shutdown),
        Commands::Trace {
            ticks,
            interval_ms,
            max_history,
        } => trace::run_trace(&cfg, ticks, interval_ms, max_history, cli.json, &shutdown),
        Commands::Run { timeout_ms } => run::run_program(&cfg, timeout_ms, cli.json, &shutdown),
        Commands::Tool { number } => tool_lookup(&cfg, number, cli.json),
        Commands::SelfCheck => self_check(&cfg),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let cfg = match path {
        None => Config::default(),
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("reading config {}", p.display()))?;
            livestate_config::load_toml(&text)
                .wrap_err_with(|| format!("parsing config {}", p.display()))?
        }
    };
    cfg.validate().wrap_err("invalid config")?;
    Ok(cfg)
}

fn init_logging(cfg: &Logging, cli_level: Option<&str>, json: bool) -> Result<()> {
    let level = cli_level.or(cfg.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    // Logs go to stderr; stdout carries command output.
    let (pretty, jsonl) = if json {
        (
            None,
            Some(fmt::layer().json().with_writer(std::io::stderr)),
        )
    } else {
        (
            Some(fmt::layer().with_target(false).with_writer(std::io::stderr)),
            None,
        )
    };

    let file = match cfg.file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name"))?;
            let appender = match cfg.rotation {
                Rotation::Never => tracing_appender::rolling::never(dir, name),
                Rotation::Daily => tracing_appender::rolling::daily(dir, name),
                Rotation::Hourly => tracing_appender::rolling::hourly(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(jsonl)
        .with(file)
        .try_init()
        .wrap_err("initializing logging")?;
    Ok(())
}

fn tool_lookup(cfg: &Config, number: i32, json: bool) -> Result<()> {
    let machine = sim::build_machine(&cfg.sim)?;
    let engine = DeltaEngine::builder()
        .with_source(machine.snapshot_source())
        .with_tool_table(machine.tool_table())
        .try_build()?;
    let tool = engine.tool_info(number)?;
    let mut out = std::io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string(&tool)?)?;
    } else {
        writeln!(
            out,
            "tool {} pocket {} diameter {} z-offset {} {}",
            tool.tool_no, tool.pocket_no, tool.diameter, tool.offset.z, tool.comment
        )?;
    }
    Ok(())
}

/// Force one full poll and complete one no-op command round trip.
fn self_check(cfg: &Config) -> Result<()> {
    let machine = sim::build_machine(&cfg.sim)?;
    let mut engine = DeltaEngine::builder()
        .with_source(machine.snapshot_source())
        .with_tool_table(machine.tool_table())
        .try_build()?;
    let cs = engine.poll(true)?;
    tracing::debug!(fields = cs.len(), cursor = cs.cursor, "forced poll");

    let serials = SerialCounter::new();
    let serial = serials.next();
    machine.accept_command(serial);
    machine.finish_command(CommandState::Done);
    let completion = CompletionCfg::from(&cfg.completion);
    match wait_complete(
        &mut machine.command_status(),
        serial,
        &completion,
        &MonotonicClock::new(),
    ) {
        CompletionStatus::Done => {}
        CompletionStatus::Timeout => return Err(eyre::Report::new(LiveStateError::Timeout)),
        CompletionStatus::Error => {
            return Err(eyre::Report::new(LiveStateError::State(
                "controller rejected the self-check command".into(),
            )));
        }
    }
    tracing::info!("self-check ok");
    println!("ok");
    Ok(())
}
