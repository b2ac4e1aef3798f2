//! Video generation jobs
//!
//! A job starts the remote operation immediately and polls it on a Tokio
//! task. Polling stops on completion, on error, after the attempt limit, at
//! the overall timeout, or when the job's token is cancelled. Settled jobs
//! stay readable for a retention window, then leave the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, watch};

use super::client::{OperationStatus, VideoConfig, VideoOperations};
use crate::config::AiConfig;
use crate::data::EntityId;
use crate::error::AppError;
use crate::metrics::VIDEO_JOBS_TOTAL;

/// Cooperative cancellation flag shared between a job and its owner
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in self, so the channel cannot close here
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounds of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
            max_attempts: config.poll_max_attempts.max(1),
            timeout: Duration::from_secs(config.poll_timeout_seconds.max(1)),
        }
    }
}

/// Observable state of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VideoJobStatus {
    Running { attempts: u32 },
    #[serde(rename_all = "camelCase")]
    Completed { video_uri: String },
    Failed { message: String },
    Cancelled,
    TimedOut,
}

impl VideoJobStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::Running { .. } => "running",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Replace a running status; finished states are final
fn finish(status: &watch::Sender<VideoJobStatus>, outcome: VideoJobStatus) -> bool {
    status.send_if_modified(|current| {
        if current.is_running() {
            *current = outcome;
            true
        } else {
            false
        }
    })
}

/// Count a poll attempt while the job is still running
fn record_attempt(status: &watch::Sender<VideoJobStatus>, attempts: u32) -> bool {
    status.send_if_modified(|current| {
        if current.is_running() {
            *current = VideoJobStatus::Running { attempts };
            true
        } else {
            false
        }
    })
}

/// Poll `operation` until it settles or a bound is hit
///
/// Each attempt waits one interval first, then polls once.
pub async fn poll_until_done(
    operations: &dyn VideoOperations,
    operation: &str,
    policy: PollPolicy,
    token: &CancellationToken,
    status: &watch::Sender<VideoJobStatus>,
) -> VideoJobStatus {
    let poll_loop = async {
        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
            if !record_attempt(status, attempt) {
                // Settled elsewhere, e.g. cancelled by the owner
                return status.borrow().clone();
            }

            match operations.poll_operation(operation).await {
                Ok(OperationStatus::Running) => {
                    tracing::debug!(operation, attempt, "Video operation still running");
                }
                Ok(OperationStatus::Done { video_uri }) => {
                    return VideoJobStatus::Completed { video_uri };
                }
                Ok(OperationStatus::Failed { message }) => {
                    return VideoJobStatus::Failed { message };
                }
                Err(error) => {
                    return VideoJobStatus::Failed {
                        message: error.to_string(),
                    };
                }
            }
        }
        tracing::warn!(
            operation,
            max_attempts = policy.max_attempts,
            "Video operation exceeded poll attempts"
        );
        VideoJobStatus::TimedOut
    };

    tokio::select! {
        outcome = poll_loop => outcome,
        _ = token.cancelled() => VideoJobStatus::Cancelled,
        _ = tokio::time::sleep(policy.timeout) => VideoJobStatus::TimedOut,
    }
}

struct JobEntry {
    owner_id: String,
    token: CancellationToken,
    status: Arc<watch::Sender<VideoJobStatus>>,
}

/// A job as reported to its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoJob {
    pub id: String,
    #[serde(flatten)]
    pub status: VideoJobStatus,
}

/// Registry of video jobs
pub struct VideoJobs {
    operations: Arc<dyn VideoOperations>,
    policy: PollPolicy,
    /// How long a settled job stays readable
    retention: Duration,
    jobs: Arc<RwLock<HashMap<String, JobEntry>>>,
}

impl VideoJobs {
    pub fn new(
        operations: Arc<dyn VideoOperations>,
        policy: PollPolicy,
        retention: Duration,
    ) -> Self {
        Self {
            operations,
            policy,
            retention,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start the remote operation and spawn its poll loop
    pub async fn start(
        &self,
        owner_id: &str,
        prompt: &str,
        config: &VideoConfig,
    ) -> Result<VideoJob, AppError> {
        if prompt.trim().is_empty() {
            return Err(AppError::Validation("prompt is required".to_string()));
        }

        let operation = self.operations.start_operation(prompt, config).await?;
        let id = EntityId::new().0;
        let token = CancellationToken::new();
        let (sender, _) = watch::channel(VideoJobStatus::Running { attempts: 0 });
        let status = Arc::new(sender);

        self.jobs.write().await.insert(
            id.clone(),
            JobEntry {
                owner_id: owner_id.to_string(),
                token: token.clone(),
                status: Arc::clone(&status),
            },
        );
        tracing::info!(job_id = %id, operation = %operation, owner_id, "Video job started");

        let operations = Arc::clone(&self.operations);
        let policy = self.policy;
        let retention = self.retention;
        let jobs = Arc::clone(&self.jobs);
        let job_id = id.clone();
        tokio::spawn(async move {
            let outcome =
                poll_until_done(operations.as_ref(), &operation, policy, &token, &status).await;
            if finish(&status, outcome.clone()) {
                VIDEO_JOBS_TOTAL
                    .with_label_values(&[outcome.outcome()])
                    .inc();
            }
            let settled = status.borrow().clone();
            tracing::info!(job_id = %job_id, outcome = settled.outcome(), "Video job finished");

            tokio::time::sleep(retention).await;
            jobs.write().await.remove(&job_id);
            tracing::debug!(job_id = %job_id, "Video job evicted");
        });

        Ok(VideoJob {
            id,
            status: VideoJobStatus::Running { attempts: 0 },
        })
    }

    /// Current status of one of `owner_id`'s jobs
    pub async fn get(&self, owner_id: &str, id: &str) -> Result<VideoJob, AppError> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(id)
            .filter(|entry| entry.owner_id == owner_id)
            .ok_or(AppError::NotFound)?;

        Ok(VideoJob {
            id: id.to_string(),
            status: entry.status.borrow().clone(),
        })
    }

    /// Trip the job's token; a finished job keeps its outcome
    pub async fn cancel(&self, owner_id: &str, id: &str) -> Result<VideoJob, AppError> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(id)
            .filter(|entry| entry.owner_id == owner_id)
            .ok_or(AppError::NotFound)?;

        entry.token.cancel();
        if finish(&entry.status, VideoJobStatus::Cancelled) {
            VIDEO_JOBS_TOTAL.with_label_values(&["cancelled"]).inc();
            tracing::info!(job_id = id, "Video job cancelled");
        }

        Ok(VideoJob {
            id: id.to_string(),
            status: entry.status.borrow().clone(),
        })
    }
}
