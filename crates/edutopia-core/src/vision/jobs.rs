//! Background extraction jobs keyed by session id
//!
//! Jobs run on the tokio runtime behind a semaphore that caps how many
//! extract at once. Each job owns a cancellation token; finished jobs stay
//! queryable until swept after the session TTL.

use super::extractor::{DetectedObject, DiagramExtractor, Extraction};
use crate::error::{EdutopiaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Work performed by a job
#[async_trait]
pub trait VideoProcessor: Send + Sync {
    async fn process(
        &self,
        video_url: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Extraction>;
}

#[async_trait]
impl VideoProcessor for DiagramExtractor {
    async fn process(
        &self,
        video_url: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Extraction> {
        self.extract_url(video_url, output_dir, cancel).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Error | JobStatus::Cancelled
        )
    }
}

/// Point-in-time view of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub session_id: String,
    pub status: JobStatus,
    pub message: String,
    pub detected_objects: Vec<DetectedObject>,
    pub object_count: usize,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct JobRecord {
    status: JobStatus,
    message: String,
    extraction: Option<Extraction>,
    cancel: CancellationToken,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    fn snapshot(&self, session_id: &str) -> JobSnapshot {
        let detected_objects = self
            .extraction
            .as_ref()
            .map(|e| e.objects.clone())
            .unwrap_or_default();
        JobSnapshot {
            session_id: session_id.to_string(),
            status: self.status,
            message: self.message.clone(),
            object_count: detected_objects.len(),
            detected_objects,
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }
}

/// Registry of extraction jobs
#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<DashMap<String, JobRecord>>,
    permits: Arc<Semaphore>,
    processor: Arc<dyn VideoProcessor>,
    output_root: PathBuf,
}

impl JobRegistry {
    pub fn new(
        processor: Arc<dyn VideoProcessor>,
        output_root: impl Into<PathBuf>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            jobs: Arc::new(DashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            processor,
            output_root: output_root.into(),
        }
    }

    /// Directory holding a session's crops
    pub fn output_dir(&self, session_id: &str) -> PathBuf {
        self.output_root.join(session_id)
    }

    /// Queue a video for extraction, returning the session id.
    ///
    /// A caller-supplied id may be reused once its previous job has finished.
    pub fn submit(&self, session_id: Option<String>, video_url: String) -> Result<String> {
        let (session_id, cancel) = self.register(session_id, &video_url)?;

        let registry = self.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            let _ = registry.execute(&id, &video_url, &cancel).await;
        });

        Ok(session_id)
    }

    /// Run an extraction to completion for the caller.
    ///
    /// The job waits for a permit like queued jobs do and is recorded under a
    /// fresh session id, so its crops expire with the session TTL. Dropping
    /// the returned future cancels the job.
    pub async fn run_sync(&self, video_url: &str) -> Result<(String, Extraction)> {
        let (session_id, cancel) = self.register(None, video_url)?;
        let abort_on_drop = cancel.clone().drop_guard();

        let registry = self.clone();
        let id = session_id.clone();
        let url = video_url.to_string();
        let result = tokio::spawn(async move { registry.execute(&id, &url, &cancel).await })
            .await
            .map_err(|e| EdutopiaError::Other(e.into()))?;
        abort_on_drop.disarm();

        Ok((session_id, result?))
    }

    fn register(
        &self,
        session_id: Option<String>,
        video_url: &str,
    ) -> Result<(String, CancellationToken)> {
        let session_id = match session_id.map(|s| s.trim().to_string()) {
            Some(id) if !id.is_empty() => id,
            _ => uuid::Uuid::new_v4().to_string(),
        };
        if session_id.contains(['/', '\\']) || session_id.contains("..") {
            return Err(EdutopiaError::InvalidInput(format!(
                "Invalid session id: {}",
                session_id
            )));
        }

        let cancel = CancellationToken::new();
        let record = JobRecord {
            status: JobStatus::Queued,
            message: "Queued for processing".to_string(),
            extraction: None,
            cancel: cancel.clone(),
            created_at: Utc::now(),
            finished_at: None,
        };

        match self.jobs.entry(session_id.clone()) {
            Entry::Occupied(mut existing) => {
                if !existing.get().status.is_finished() {
                    return Err(EdutopiaError::Conflict(format!(
                        "Session {} is already being processed",
                        session_id
                    )));
                }
                existing.insert(record);
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        tracing::info!("Queued extraction job {} for {}", session_id, video_url);
        Ok((session_id, cancel))
    }

    async fn execute(
        &self,
        session_id: &str,
        video_url: &str,
        cancel: &CancellationToken,
    ) -> Result<Extraction> {
        let permit = tokio::select! {
            _ = cancel.cancelled() => Err(EdutopiaError::Cancelled),
            permit = self.permits.clone().acquire_owned() => {
                permit.map_err(|e| EdutopiaError::Other(e.into()))
            }
        };

        let result = match permit {
            Ok(_permit) => {
                self.update(session_id, JobStatus::Processing, "Processing video");
                let output_dir = self.output_dir(session_id);
                self.processor.process(video_url, &output_dir, cancel).await
            }
            Err(e) => Err(e),
        };
        self.finish(session_id, &result);
        result
    }

    fn update(&self, session_id: &str, status: JobStatus, message: &str) {
        if let Some(mut record) = self.jobs.get_mut(session_id) {
            record.status = status;
            record.message = message.to_string();
        }
    }

    fn finish(&self, session_id: &str, result: &Result<Extraction>) {
        let Some(mut record) = self.jobs.get_mut(session_id) else {
            return;
        };
        match result {
            Ok(extraction) => {
                tracing::info!(
                    "Job {} completed with {} objects",
                    session_id,
                    extraction.object_count
                );
                record.status = JobStatus::Completed;
                record.message = extraction.message();
                record.extraction = Some(extraction.clone());
            }
            Err(EdutopiaError::Cancelled) => {
                tracing::info!("Job {} cancelled", session_id);
                record.status = JobStatus::Cancelled;
                record.message = "Processing cancelled".to_string();
            }
            Err(e) => {
                tracing::error!("Job {} failed: {}", session_id, e);
                record.status = JobStatus::Error;
                record.message = e.to_string();
            }
        }
        record.finished_at = Some(Utc::now());
    }

    pub fn status(&self, session_id: &str) -> Option<JobSnapshot> {
        self.jobs
            .get(session_id)
            .map(|record| record.snapshot(session_id))
    }

    /// Request cancellation. Returns false if the job is unknown or already finished.
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.jobs.get(session_id) {
            Some(record) if !record.status.is_finished() => {
                record.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel every unfinished job
    pub fn cancel_all(&self) {
        for record in self.jobs.iter() {
            record.cancel.cancel();
        }
    }

    /// Drop finished jobs older than `ttl` along with their crop directories,
    /// returning how many were removed
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let now = Utc::now();
        let mut expired = Vec::new();
        self.jobs.retain(|session_id, record| match record.finished_at {
            Some(finished) if now.signed_duration_since(finished) >= ttl => {
                expired.push(session_id.clone());
                false
            }
            _ => true,
        });

        for session_id in &expired {
            let dir = self.output_dir(session_id);
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", dir.display(), e),
            }
        }
        if !expired.is_empty() {
            tracing::debug!("Swept {} expired extraction sessions", expired.len());
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|record| !record.status.is_finished())
            .count()
    }
}
