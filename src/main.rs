mod api;
mod cli;
mod config;
mod error;
mod models;

use clap::Parser;
use cli::{exit_code, App, Cli, ReportOptions, EXIT_SETUP_ERROR};
use colored::*;
use error::{AppError, Result};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = ReportOptions::new(
        cli.format,
        cli.no_color,
        std::io::stdout().is_terminal(),
        std::io::stderr().is_terminal(),
    );

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = match init_logging(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            print_setup_error(&e, options.color_stderr);
            return ExitCode::from(EXIT_SETUP_ERROR);
        },
    };

    info!("Initializing Supabase probe...");

    let app = match App::new(&cli, options) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize probe: {:?}", e);
            print_setup_error(&e, options.color_stderr);
            return ExitCode::from(EXIT_SETUP_ERROR);
        },
    };

    match app.run().await {
        Ok(result) => {
            info!(
                "Probe completed (success: {}, rows: {:?})",
                result.is_success(),
                result.row_count()
            );
            ExitCode::from(exit_code(cli.strict, &result))
        },
        Err(e) => {
            error!("Failed to write probe report: {:?}", e);
            ExitCode::FAILURE
        },
    }
}

fn print_setup_error(e: &AppError, color: bool) {
    if color {
        eprintln!("{} {}", "Error:".red(), e.query_message());
    } else {
        eprintln!("Error: {}", e.query_message());
    }
}

/// Logs go to stderr so stdout carries only the probe transcript.
/// Verbosity comes from `RUST_LOG` (default `warn`).
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let (writer, guard) = tracing_appender::non_blocking(file_appender(path)?);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(Some(guard))
}

/// Opens `path` for appending log lines, creating parent directories as needed.
fn file_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::Cli(format!("invalid log file path '{}'", path.display())))?;
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy().into_owned())
        .build(directory)
        .map_err(|e| {
            AppError::Cli(format!(
                "cannot open log file '{}': {}",
                path.display(),
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_appender_rejects_directory() {
        let dir = std::env::temp_dir();
        match file_appender(&dir) {
            Err(AppError::Cli(msg)) => assert!(msg.contains("cannot open log file")),
            Err(other) => panic!("Expected Cli error, got {:?}", other),
            Ok(_) => panic!("Expected an error for directory path {}", dir.display()),
        }
    }

    #[test]
    fn test_init_logging_directory_is_setup_error() {
        // Fails before any subscriber is installed, so no global state leaks
        let result = init_logging(Some(&std::env::temp_dir()));
        assert!(matches!(result, Err(AppError::Cli(_))));
    }

    #[test]
    fn test_file_appender_creates_missing_parent() {
        let dir = std::env::temp_dir().join(format!("supabase-logs-{}", std::process::id()));
        let path = dir.join("app.log");

        assert!(file_appender(&path).is_ok());
        assert!(path.is_file());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
