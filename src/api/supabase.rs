//! Provides a client for reading tables through the Supabase REST (PostgREST) API.
//!
//! This module defines the `SupabaseClient` struct, which issues a single
//! `select=*` request against the configured table and maps any failure onto
//! `AppError`.

use crate::config::{ProbeConfig, DEFAULT_SCHEMA};
use crate::error::{AppError, Result};
use crate::models::{GatewayError, PostgrestError, Row};
use reqwest::{header, Client, StatusCode};
use tracing::{debug, error, info};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// An asynchronous client bound to one Supabase project and API key.
pub struct SupabaseClient {
    client: Client,
    config: ProbeConfig,
}

impl SupabaseClient {
    /// Creates a new `SupabaseClient` for the given endpoint credentials.
    ///
    /// No request timeout is configured; a call waits until the remote side resolves it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Api` if the underlying HTTP client cannot be built (e.g. TLS backend init).
    pub fn new(config: ProbeConfig) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Fetches every column of every row of the configured table.
    ///
    /// Equivalent to `GET /rest/v1/<table>?select=*`. Exactly one request is sent;
    /// there is no retry.
    pub async fn select_all(&self) -> Result<Vec<Row>> {
        let url = self.config.table_url();
        info!("Querying table '{}'", self.config.table());
        debug!("GET {}?select=*", url);

        let mut request = self
            .client
            .get(&url)
            .header("apikey", self.config.api_key())
            .bearer_auth(self.config.api_key())
            .header(header::ACCEPT, "application/json")
            .query(&[("select", "*")]);

        if self.config.schema() != DEFAULT_SCHEMA {
            request = request.header("Accept-Profile", self.config.schema());
        }

        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            AppError::Api(e.into())
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read response body from {}: {}", url, e);
            AppError::Api(e.into())
        })?;

        if !status.is_success() {
            let message = remote_error_message(status, &body);
            error!(
                "Query against '{}' failed with status {}: {}",
                self.config.table(),
                status,
                message
            );
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                error!("Received 401/403. Check the Supabase API key and the table's row level security policies.");
            } else if status == StatusCode::NOT_FOUND {
                error!("Received 404. Check the Supabase URL and that the table is exposed via the REST API.");
            }
            return Err(AppError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let rows: Vec<Row> = serde_json::from_str(&body).map_err(|e| {
            error!("Error parsing response JSON: {}", e);
            AppError::from(e)
        })?;

        debug!("Received {} rows from '{}'", rows.len(), self.config.table());
        Ok(rows)
    }
}

/// Extracts the most useful message from a failed response body.
///
/// PostgREST errors carry `message`; the gateway and auth layers use a handful of
/// other field names. Anything unparseable falls back to the status line.
pub fn remote_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<PostgrestError>(body) {
        if !err.message.trim().is_empty() {
            return err.message;
        }
    }

    if let Some(message) = serde_json::from_str::<GatewayError>(body)
        .ok()
        .and_then(GatewayError::into_message)
    {
        return message;
    }

    let body = body.trim();
    if body.is_empty() {
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        )
    } else {
        format!("HTTP {}: {}", status.as_u16(), body)
    }
}
