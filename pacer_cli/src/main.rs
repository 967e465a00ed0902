#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod live;
mod logging;
mod record;
mod render;
mod replay;
mod session;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error hooks: {e}");
    }
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
            tracing::debug!(error = ?err, "command failed");
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<pacer_config::Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .wrap_err_with(|| format!("read config file {}", p.display()))?;
            toml::from_str::<pacer_config::Config>(&text).map_err(|e| {
                eyre::Report::new(e)
                    .wrap_err(format!("invalid configuration: parse {}", p.display()))
            })?
        }
        None => pacer_config::Config::default(),
    };
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    match cli.cmd {
        Commands::Replay {
            trace,
            fresh,
            every,
            stats,
        } => replay::run_replay(
            &cfg,
            &replay::ReplayOpts {
                trace: &trace,
                fresh,
                every,
                stats,
                json: cli.json,
            },
        ),
        Commands::Live => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
            live::run_live(&cfg, cli.json, &shutdown)
        }
        Commands::Inspect => record::run_inspect(&cfg, cli.json),
        Commands::Reset => record::run_reset(&cfg),
    }
}
