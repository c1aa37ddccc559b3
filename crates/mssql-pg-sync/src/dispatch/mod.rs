//! Request/response contract for invoking a sync.
//!
//! A [`SyncRequest`] names a mode and optionally the tables to work on. The
//! [`Dispatcher`] validates it, runs the matching orchestrator operation and
//! wraps the result in a [`SyncResponse`] carrying an HTTP-style status code:
//! 200 when the work succeeded, 500 when it ran but failed, 400 when the
//! request itself was rejected (no connection is opened for a 400).

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::engine::SyncOutcome;
use crate::error::SyncError;
use crate::orchestrator::{BatchReport, ConnectivityReport, Orchestrator};
use crate::registry::Catalog;

/// Crate version reported in every response.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Operation selected by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    SyncMany,
    TestMany,
    SyncOne,
    Describe,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::SyncMany, Mode::TestMany, Mode::SyncOne, Mode::Describe];

    /// Parse a mode name, accepting the legacy aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "sync-many" | "multi_sync" => Some(Mode::SyncMany),
            "test-many" | "multi_test" => Some(Mode::TestMany),
            "sync-one" | "single_sync" => Some(Mode::SyncOne),
            "describe" | "info" => Some(Mode::Describe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::SyncMany => "sync-many",
            Mode::TestMany => "test-many",
            Mode::SyncOne => "sync-one",
            Mode::Describe => "describe",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Mode name; `sync-many` when absent.
    #[serde(default)]
    pub mode: Option<String>,

    /// Tables for the multi-table modes; default order when absent or empty.
    #[serde(default)]
    pub tables: Option<Vec<String>>,

    /// Table for `sync-one`.
    #[serde(default, alias = "tableName")]
    pub table_name: Option<String>,
}

impl SyncRequest {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode: Some(mode.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }
}

/// Payload of a successful dispatch.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DispatchResult {
    Table(SyncOutcome),
    Batch(BatchReport),
    Connectivity(ConnectivityReport),
    Catalog(Catalog),
}

/// Response body.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DispatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_modes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_tables: Option<Vec<String>>,
    pub execution_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Status code plus body.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub status_code: u16,
    pub body: ResponseBody,
}

impl SyncResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds a response while tracking elapsed time.
struct ResponseBuilder {
    started: Instant,
    mode: Option<Mode>,
}

impl ResponseBuilder {
    fn finish(self, status_code: u16, body: impl FnOnce(&mut ResponseBody)) -> SyncResponse {
        let mut response_body = ResponseBody {
            success: status_code == 200,
            mode: self.mode.map(|m| m.as_str().to_string()),
            result: None,
            error: None,
            valid_modes: None,
            available_tables: None,
            execution_time_seconds: self.started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
            version: VERSION.to_string(),
        };
        body(&mut response_body);
        SyncResponse {
            status_code,
            body: response_body,
        }
    }

    fn bad_request(self, error: impl Into<String>) -> SyncResponse {
        let error = error.into();
        warn!("Rejected request: {}", error);
        self.finish(400, |b| b.error = Some(error))
    }

    fn ok_or_failed(self, succeeded: bool, result: DispatchResult, error: Option<String>) -> SyncResponse {
        let status = if succeeded { 200 } else { 500 };
        self.finish(status, |b| {
            b.result = Some(result);
            if !succeeded {
                b.error = error;
            }
        })
    }
}

/// Entry point shared by the CLI and any embedding host.
#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Orchestrator,
}

impl Dispatcher {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Parse a raw JSON request and handle it. Malformed JSON is a 400.
    pub async fn handle_json(&self, raw: &str) -> SyncResponse {
        match serde_json::from_str::<SyncRequest>(raw) {
            Ok(request) => self.handle(request).await,
            Err(e) => ResponseBuilder {
                started: Instant::now(),
                mode: None,
            }
            .bad_request(format!("Invalid request: {}", e)),
        }
    }

    /// Handle a request.
    pub async fn handle(&self, request: SyncRequest) -> SyncResponse {
        let started = Instant::now();
        let mode = match request.mode.as_deref() {
            None => Some(Mode::SyncMany),
            Some(raw) => Mode::parse(raw),
        };

        let Some(mode) = mode else {
            let raw = request.mode.unwrap_or_default();
            let response = ResponseBuilder {
                started,
                mode: None,
            };
            warn!("Rejected request: invalid mode '{}'", raw);
            return response.finish(400, |b| {
                b.mode = Some(raw.clone());
                b.error = Some(format!("Invalid mode: {}", raw));
                b.valid_modes = Some(Mode::ALL.iter().map(|m| m.as_str().to_string()).collect());
            });
        };

        info!("Handling {} request", mode);
        let response = ResponseBuilder {
            started,
            mode: Some(mode),
        };
        let registry = self.orchestrator.registry();

        match mode {
            Mode::Describe => response.finish(200, |b| {
                b.result = Some(DispatchResult::Catalog(registry.catalog()))
            }),

            Mode::SyncOne => {
                let Some(name) = request.table_name.filter(|n| !n.trim().is_empty()) else {
                    return response.bad_request("table_name is required for sync-one mode");
                };
                match self.orchestrator.sync_table(&name).await {
                    Ok(outcome) => {
                        let error = outcome.error.clone();
                        response.ok_or_failed(outcome.succeeded, DispatchResult::Table(outcome), error)
                    }
                    Err(e) => self.error_response(response, e),
                }
            }

            Mode::SyncMany => {
                match self.orchestrator.sync_tables(request.tables.as_deref()).await {
                    Ok(report) => {
                        let error = (!report.succeeded).then(|| {
                            format!(
                                "{} of {} tables failed: {}",
                                report.failed_tables,
                                report.processed_tables,
                                report.failed_table_names().join(", ")
                            )
                        });
                        response.ok_or_failed(report.succeeded, DispatchResult::Batch(report), error)
                    }
                    Err(e) => self.error_response(response, e),
                }
            }

            Mode::TestMany => {
                match self.orchestrator.test_tables(request.tables.as_deref()).await {
                    Ok(report) => {
                        let error = (!report.succeeded).then(|| {
                            format!(
                                "{} of {} tables failed the connectivity check",
                                report.failed_connections, report.tested_tables
                            )
                        });
                        response.ok_or_failed(
                            report.succeeded,
                            DispatchResult::Connectivity(report),
                            error,
                        )
                    }
                    Err(e) => self.error_response(response, e),
                }
            }
        }
    }

    fn error_response(&self, response: ResponseBuilder, error: SyncError) -> SyncResponse {
        match error {
            SyncError::UnknownTable { .. } => {
                let available = self
                    .orchestrator
                    .registry()
                    .names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                let message = error.to_string();
                warn!("Rejected request: {}", message);
                response.finish(400, |b| {
                    b.error = Some(message);
                    b.available_tables = Some(available);
                })
            }
            other => {
                let message = other.to_string();
                response.finish(500, |b| b.error = Some(message))
            }
        }
    }
}
