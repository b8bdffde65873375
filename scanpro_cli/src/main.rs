mod cli;
mod error_fmt;
mod logging;
mod scan;
mod stage;

use clap::Parser;
use eyre::WrapErr;
use scanpro_core::AbortToken;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if !cli.json {
        let _ = color_eyre::install();
    }

    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&e));
            } else {
                eprintln!("{}", humanize(&e));
            }
            exit_code_for_error(&e)
        }
    };
    logging::flush();
    std::process::exit(code);
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = match &cli.config {
        Some(path) => scanpro_config::load_file(path).wrap_err("invalid config")?,
        None => scanpro_config::Config::default(),
    };

    let level = cli
        .log_level
        .clone()
        .or_else(|| cfg.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());
    logging::init(&level, cli.json, &cfg.logging)?;

    match cli.cmd {
        Commands::Scan { rate, pitch, aux } => {
            // Inputs are validated before anything moves.
            let params = scan::resolve_params(&cfg, rate, pitch, aux)?;
            let abort = AbortToken::new();
            let on_signal = abort.clone();
            if let Err(e) = ctrlc::set_handler(move || on_signal.cancel()) {
                tracing::warn!(error = %e, "ctrl-c handler not installed");
            }
            scan::run_scan(&cfg, &params, &abort, cli.json)
        }
        Commands::Analyze { image } => scan::run_analyze(&image),
        Commands::SelfCheck => scan::run_self_check(&cfg, cli.json),
        Commands::Serve { bind } => {
            let listener = scan::bind_service(&cfg, bind.as_deref())?;
            let (tx, rx) = tokio::sync::oneshot::channel::<()>();
            let on_signal = std::sync::Mutex::new(Some(tx));
            if let Err(e) = ctrlc::set_handler(move || {
                if let Some(tx) = on_signal.lock().ok().and_then(|mut g| g.take()) {
                    let _ = tx.send(());
                }
            }) {
                tracing::warn!(error = %e, "ctrl-c handler not installed");
            }
            scan::run_serve(listener, async move {
                let _ = rx.await;
            })
        }
    }
}
