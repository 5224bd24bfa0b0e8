use crate::api::SupabaseClient;
use crate::config::{ConfigOverrides, ProbeConfig};
use crate::error::Result;
use crate::models::{QueryResult, Row};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use colored::*;
use comfy_table::Table;
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};

/// First line of every transcript, followed by a blank line.
pub const HEADLINE: &str = "Testing Supabase connection...";

/// Exit status when the probe could not even start (bad configuration, logging setup).
pub const EXIT_SETUP_ERROR: u8 = 2;
/// Exit status for a failed query under `--strict`.
pub const EXIT_QUERY_FAILED: u8 = 1;

/// Connectivity probe for a hosted Supabase project
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project URL, e.g. https://xyz.supabase.co (default: $SUPABASE_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// API key (default: $SUPABASE_KEY, then $SUPABASE_ANON_KEY)
    #[arg(long)]
    pub key: Option<String>,

    /// Table to read (default: $SUPABASE_TABLE or "test")
    #[arg(long)]
    pub table: Option<String>,

    /// Schema exposed through the REST API (default: $SUPABASE_SCHEMA or "public")
    #[arg(long)]
    pub schema: Option<String>,

    /// How to print the returned rows
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Exit with a non-zero status when the query fails
    #[arg(long)]
    pub strict: bool,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            url: self.url.clone(),
            api_key: self.key.clone(),
            table: self.table.clone(),
            schema: self.schema.clone(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON array
    Pretty,
    /// Compact single-line JSON array
    Json,
    /// Text table, one column per key
    Table,
}

/// Controls how the transcript is rendered.
#[derive(Copy, Clone, Debug)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// Colour the success header on stdout.
    pub color_stdout: bool,
    /// Colour the `Error:` prefix on stderr.
    pub color_stderr: bool,
}

impl ReportOptions {
    /// Colour is decided per stream, so redirecting one of them yields plain text there.
    pub fn new(
        format: OutputFormat,
        no_color: bool,
        stdout_is_terminal: bool,
        stderr_is_terminal: bool,
    ) -> Self {
        Self {
            format,
            color_stdout: !no_color && stdout_is_terminal,
            color_stderr: !no_color && stderr_is_terminal,
        }
    }
}

/// CLI application
pub struct App {
    client: SupabaseClient,
    options: ReportOptions,
}

impl App {
    /// Create a new CLI application from parsed arguments.
    ///
    /// Loads `.env` (if present) before resolving the endpoint credentials.
    pub fn new(cli: &Cli, options: ReportOptions) -> Result<Self> {
        dotenv::dotenv().ok();

        let config = ProbeConfig::resolve(cli.overrides())?;
        info!(
            "Probing {} (table '{}')",
            config.base_url(),
            config.table()
        );

        let client = SupabaseClient::new(config)?;

        Ok(Self { client, options })
    }

    /// Run the probe, writing the transcript to stdout and stderr.
    pub async fn run(&self) -> Result<QueryResult> {
        let mut out = io::stdout();
        let mut err = io::stderr();
        run_probe(&self.client, &self.options, &mut out, &mut err).await
    }
}

/// Issues the single read query and writes the transcript.
///
/// The headline goes to `out` before the request is sent. On success the rows
/// follow on `out`; on failure exactly one `Error: ` line goes to `err`. A failed
/// query is reported, not returned as `Err`: the only errors returned here come
/// from writing the transcript itself.
pub async fn run_probe<O: Write, E: Write>(
    client: &SupabaseClient,
    options: &ReportOptions,
    out: &mut O,
    err: &mut E,
) -> Result<QueryResult> {
    writeln!(out, "{}\n", HEADLINE)?;
    out.flush()?;

    info!("Probe started at {}", Utc::now().to_rfc3339());
    let started = Instant::now();
    let result = match client.select_all().await {
        Ok(rows) => QueryResult::Success(rows),
        Err(e) => {
            error!("Probe query failed (status {:?}): {:?}", e.status(), e);
            QueryResult::Failure(e.query_message())
        },
    };
    info!("Probe finished in {} ms", started.elapsed().as_millis());

    write_report(&result, client.config().table(), options, out, err)?;
    Ok(result)
}

/// Writes the outcome section of the transcript.
pub fn write_report<O: Write, E: Write>(
    result: &QueryResult,
    table: &str,
    options: &ReportOptions,
    out: &mut O,
    err: &mut E,
) -> Result<()> {
    match result {
        QueryResult::Success(rows) => {
            let header = format!("Success! Data from {} table:", table);
            if options.color_stdout {
                writeln!(out, "{}", header.green().bold())?;
            } else {
                writeln!(out, "{}", header)?;
            }
            writeln!(out, "{}", render_rows(rows, options.format)?)?;
            out.flush()?;
        },
        QueryResult::Failure(message) => {
            if options.color_stderr {
                writeln!(err, "{} {}", "Error:".red().bold(), message)?;
            } else {
                writeln!(err, "Error: {}", message)?;
            }
            err.flush()?;
        },
    }
    Ok(())
}

/// Renders the row sequence in the requested format. An empty sequence is still rendered.
pub fn render_rows(rows: &[Row], format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(rows)?,
        OutputFormat::Json => serde_json::to_string(rows)?,
        OutputFormat::Table => render_table(rows),
    };
    Ok(rendered)
}

fn render_table(rows: &[Row]) -> String {
    let footer = match rows.len() {
        1 => "(1 row)".to_string(),
        n => format!("({} rows)", n),
    };
    if rows.is_empty() {
        return footer;
    }

    // Columns in first-seen order across all rows; rows may not share a shape.
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut table = Table::new();
    table.set_header(columns.iter().copied());
    for row in rows {
        table.add_row(
            columns
                .iter()
                .map(|column| row.get(*column).map(cell_text).unwrap_or_default()),
        );
    }

    format!("{}\n{}", table, footer)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Maps a probe outcome to the process exit status.
///
/// Without `strict`, success and failure both exit 0.
pub fn exit_code(strict: bool, result: &QueryResult) -> u8 {
    match result {
        QueryResult::Failure(_) if strict => EXIT_QUERY_FAILED,
        _ => 0,
    }
}
