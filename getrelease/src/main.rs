// getrelease/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use getrelease_common::config::Config;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod ui;

use cli::CliArgs;

fn init_tracing(cli_args: &CliArgs, config: Option<&Config>) {
    let level_filter = if cli_args.quiet {
        LevelFilter::ERROR
    } else {
        match cli_args.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("GETRELEASE_LOG")
        .from_env_lossy();

    let log_dir = match config {
        Some(config) if cli_args.verbose > 0 => {
            let dir = config.logs_dir();
            match fs::create_dir_all(&dir) {
                Ok(()) => Some(dir),
                Err(e) => {
                    eprintln!(
                        "{} Failed to create log directory {}: {}",
                        "Warning:".yellow(),
                        dir.display(),
                        e
                    );
                    None
                }
            }
        }
        _ => None,
    };

    if let Some(log_dir) = log_dir {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "getrelease.log");
        let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

        let stderr_writer = std::io::stderr.with_max_level(max_log_level);
        let file_writer = non_blocking_appender.with_max_level(max_log_level);

        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(stderr_writer.and(file_writer))
            .with_ansi(true)
            .without_time()
            .try_init();

        // The guard flushes the file writer; it must live until exit.
        Box::leak(Box::new(guard));

        debug!(
            "Verbose logging enabled. Writing logs to: {}/getrelease.log",
            log_dir.display()
        );
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
    }
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            init_tracing(&cli_args, None);
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            process::exit(1);
        }
    };
    init_tracing(&cli_args, Some(&config));

    if let Err(e) = cli_args.command.run(&config).await {
        error!("Command failed: {:#}", e);
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(1);
    }

    debug!("Command completed successfully.");
}
