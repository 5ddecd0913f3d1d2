//! Asynchronous remote operations
//!
//! Copies are executed server-side. Submitting one with
//! `Prefer: respond-async` returns a monitor URL in the `Location` header
//! that is polled until the operation finishes.
//!
//! An [`AsyncOperation`] moves strictly from `Pending` to either
//! `Succeeded` or `Failed`; terminal states are final and polling a
//! terminal operation returns it unchanged without any request.
//!
//! Polling is bounded by a maximum number of attempts and a total timeout
//! and can be cancelled by the caller through a [`CancellationToken`].

use std::time::Duration;

use drivefs_core::config::PollingConfig;
use drivefs_core::domain::ItemId;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{json, ApiClient};
use crate::models::{CopyRequest, DriveItem, ItemReference, MonitorStatus};
use crate::GraphError;

/// Why an operation failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The server reported a failure, or the monitor could not be read
    Remote(String),
    /// The attempt or time budget was exhausted
    TimedOut,
    /// The caller cancelled the wait
    Cancelled,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Remote(msg) => write!(f, "{msg}"),
            FailureReason::TimedOut => f.write_str("timed out"),
            FailureReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Succeeded { resource_id: String },
    Failed(FailureReason),
}

/// Handle of a server-side operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncOperation {
    monitor_url: Option<String>,
    status: OperationStatus,
    attempts: u32,
}

impl AsyncOperation {
    /// An operation still running behind `monitor_url`
    pub fn pending(monitor_url: impl Into<String>) -> Self {
        Self {
            monitor_url: Some(monitor_url.into()),
            status: OperationStatus::Pending,
            attempts: 0,
        }
    }

    /// An operation that completed synchronously
    pub fn succeeded(resource_id: impl Into<String>) -> Self {
        Self {
            monitor_url: None,
            status: OperationStatus::Succeeded {
                resource_id: resource_id.into(),
            },
            attempts: 0,
        }
    }

    pub fn status(&self) -> &OperationStatus {
        &self.status
    }

    pub fn monitor_url(&self) -> Option<&str> {
        self.monitor_url.as_deref()
    }

    /// Number of monitor requests made so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.status, OperationStatus::Pending)
    }

    /// ID of the resulting item, once succeeded
    pub fn result_id(&self) -> Option<&str> {
        match &self.status {
            OperationStatus::Succeeded { resource_id } => Some(resource_id),
            _ => None,
        }
    }

    /// Moves a pending operation to `status`; terminal ones are kept as-is
    fn finish(mut self, status: OperationStatus) -> Self {
        if !self.is_terminal() {
            self.status = status;
        }
        self
    }
}

/// Bounds of a polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each monitor request
    pub interval: Duration,
    pub max_attempts: u32,
    /// Total time budget
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

impl PollPolicy {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Interprets a monitor body; `None` means still running
fn interpret(body: MonitorStatus) -> Option<OperationStatus> {
    match body.status.as_deref() {
        Some("failed") => Some(OperationStatus::Failed(FailureReason::Remote(
            "operation failed on the server".to_string(),
        ))),
        Some("completed") => Some(match body.resource_id.or(body.id) {
            Some(resource_id) => OperationStatus::Succeeded { resource_id },
            None => OperationStatus::Failed(FailureReason::Remote(
                "operation completed without a resource id".to_string(),
            )),
        }),
        Some(_) => None,
        // The monitor redirects to the new item once the copy is done
        None => Some(match body.id {
            Some(resource_id) => OperationStatus::Succeeded { resource_id },
            None => OperationStatus::Failed(FailureReason::Remote(
                "monitor response has neither status nor id".to_string(),
            )),
        }),
    }
}

impl ApiClient {
    /// Submits a server-side copy of `id` into `parent` as `name`
    ///
    /// Returns a pending operation carrying the monitor URL, or an already
    /// succeeded one when the server answers with the new item directly.
    pub async fn submit_copy(
        &self,
        id: &ItemId,
        name: &str,
        parent: &ItemReference,
    ) -> Result<AsyncOperation, GraphError> {
        let url = self.item_url(&[id.as_str(), "action.copy"]);
        let body = CopyRequest {
            name,
            parent_reference: parent,
        };

        debug!(item = %id, name, "Submitting asynchronous copy");
        let response = self
            .send("copy", |http| {
                http.post(url.clone())
                    .header("Prefer", "respond-async")
                    .json(&body)
            })
            .await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(location) = location {
            let monitor = response
                .url()
                .join(&location)
                .map_err(|e| GraphError::InvalidUrl(format!("monitor {location}: {e}")))?;
            debug!(monitor = %monitor, "Copy accepted");
            return Ok(AsyncOperation::pending(monitor));
        }

        let item: DriveItem = json(response).await?;
        if item.id.is_empty() {
            return Err(GraphError::InvalidResponse(
                "copy accepted without monitor URL or item id".to_string(),
            ));
        }
        Ok(AsyncOperation::succeeded(item.id))
    }

    /// Polls an operation until it is terminal
    ///
    /// Never fails: rejected monitor requests, exhausted bounds and
    /// cancellation all end in `Failed` with the matching [`FailureReason`].
    /// Transient monitor failures (see [`GraphError::is_transient`]) count
    /// as an attempt and polling continues.
    pub async fn poll(
        &self,
        operation: AsyncOperation,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> AsyncOperation {
        if operation.is_terminal() {
            return operation;
        }
        let Some(monitor) = operation.monitor_url.clone() else {
            return operation.finish(OperationStatus::Failed(FailureReason::Remote(
                "pending operation has no monitor URL".to_string(),
            )));
        };

        let polling = self.poll_monitor(operation.clone(), &monitor, policy);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(monitor = %monitor, "Polling cancelled");
                operation.finish(OperationStatus::Failed(FailureReason::Cancelled))
            }
            result = tokio::time::timeout(policy.timeout, polling) => match result {
                Ok(done) => done,
                Err(_) => {
                    warn!(monitor = %monitor, timeout_secs = policy.timeout.as_secs(), "Polling timed out");
                    operation.finish(OperationStatus::Failed(FailureReason::TimedOut))
                }
            }
        }
    }

    async fn poll_monitor(
        &self,
        mut operation: AsyncOperation,
        monitor: &str,
        policy: &PollPolicy,
    ) -> AsyncOperation {
        let url = match Url::parse(monitor) {
            Ok(url) => url,
            Err(e) => {
                return operation.finish(OperationStatus::Failed(FailureReason::Remote(format!(
                    "invalid monitor URL: {e}"
                ))))
            }
        };

        loop {
            if operation.attempts >= policy.max_attempts {
                warn!(monitor, attempts = operation.attempts, "Polling attempts exhausted");
                return operation.finish(OperationStatus::Failed(FailureReason::TimedOut));
            }

            tokio::time::sleep(policy.interval).await;
            operation.attempts += 1;

            let body = match self.send("monitor", |http| http.get(url.clone())).await {
                Ok(response) => json::<MonitorStatus>(response).await,
                Err(e) => Err(e),
            };

            match body {
                Ok(body) => {
                    debug!(
                        monitor,
                        attempt = operation.attempts,
                        status = body.status.as_deref().unwrap_or("-"),
                        progress = body.percentage_complete.unwrap_or_default(),
                        "Polled operation"
                    );
                    if let Some(status) = interpret(body) {
                        return operation.finish(status);
                    }
                }
                Err(e) if e.is_transient() => {
                    // The copy keeps running server-side; try again next round
                    warn!(monitor, attempt = operation.attempts, error = %e, "Monitor request failed, retrying");
                }
                Err(e) => {
                    warn!(monitor, error = %e, "Monitor request failed");
                    return operation
                        .finish(OperationStatus::Failed(FailureReason::Remote(e.to_string())));
                }
            }
        }
    }
}
