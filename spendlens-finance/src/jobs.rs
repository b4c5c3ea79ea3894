//! Background job board for classification and insights runs.
//!
//! Jobs move `pending -> running -> done | error` and are polled by id.
//! Classification jobs for the same owner run one at a time: a queued job
//! stays `pending` until the owner's lock is free.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::insights::InsightsEngine;
use crate::workflow::ClassificationWorkflow;

/// Lock key for runs that span every owner.
const ALL_OWNERS: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Classification,
    Insights,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub kind: JobKind,
    pub owner: Option<String>,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct JobBoard {
    jobs: Arc<RwLock<HashMap<Uuid, JobRecord>>>,
    owner_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    async fn owner_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.owner_locks
            .lock()
            .await
            .entry(key.to_string())
            .or_default()
            .clone()
    }

    /// Drop a key's lock once no queued or running job holds it.
    async fn release_owner_lock(&self, key: &str) {
        let mut locks = self.owner_locks.lock().await;
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }

    /// Forget finished jobs last updated at least `older_than` ago. Returns how many went.
    pub async fn prune_finished(&self, older_than: chrono::Duration) -> usize {
        let cutoff = Utc::now() - older_than;
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, j| !(j.status.is_terminal() && j.updated_at <= cutoff));
        before - jobs.len()
    }

    async fn update(&self, id: Uuid, f: impl FnOnce(&mut JobRecord)) {
        if let Some(job) = self.jobs.write().await.get_mut(&id) {
            f(job);
            job.updated_at = Utc::now();
        }
    }

    /// Register a job and run `work` on the tokio runtime.
    ///
    /// With `serialize_on`, the job waits (pending) for that key's lock first.
    /// A panic inside `work` lands the job in `error`.
    pub async fn spawn<Fut, T>(&self, kind: JobKind, owner: Option<String>, serialize_on: Option<String>, work: Fut) -> Uuid
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.jobs.write().await.insert(
            id,
            JobRecord {
                id,
                kind,
                owner: owner.clone(),
                status: JobStatus::Pending,
                result: None,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        tracing::info!(job_id = %id, ?kind, owner = owner.as_deref().unwrap_or("*"), "job queued");

        let board = self.clone();
        tokio::spawn(async move {
            let lock = match serialize_on.as_deref() {
                Some(key) => Some(board.owner_lock(key).await),
                None => None,
            };
            let guard = match lock {
                Some(l) => Some(l.lock_owned().await),
                None => None,
            };

            board.update(id, |j| j.status = JobStatus::Running).await;
            tracing::info!(job_id = %id, "job running");

            let outcome = match tokio::spawn(work).await {
                Ok(Ok(value)) => serde_json::to_value(value).map_err(|e| format!("serializing job result: {e}")),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(join) => Err(format!("job task failed: {join}")),
            };

            drop(guard);
            if let Some(key) = serialize_on.as_deref() {
                board.release_owner_lock(key).await;
            }

            match outcome {
                Ok(value) => {
                    board
                        .update(id, |j| {
                            j.status = JobStatus::Done;
                            j.result = Some(value);
                        })
                        .await;
                    tracing::info!(job_id = %id, "job done");
                }
                Err(message) => {
                    tracing::error!(job_id = %id, error = %message, "job failed");
                    board
                        .update(id, |j| {
                            j.status = JobStatus::Error;
                            j.error = Some(message);
                        })
                        .await;
                }
            }
        });

        id
    }

    /// Queue a classification run; runs for the same owner never overlap.
    pub async fn spawn_classification(
        &self,
        workflow: Arc<ClassificationWorkflow>,
        owner: Option<String>,
        email: Option<String>,
    ) -> Uuid {
        let key = owner.clone().unwrap_or_else(|| ALL_OWNERS.to_string());
        let run_owner = owner.clone();
        self.spawn(JobKind::Classification, owner, Some(key), async move {
            anyhow::Ok(workflow.run(run_owner.as_deref(), email.as_deref()).await)
        })
        .await
    }

    pub async fn spawn_insights(&self, engine: Arc<InsightsEngine>, owner: String) -> Uuid {
        let run_owner = owner.clone();
        self.spawn(JobKind::Insights, Some(owner), None, async move {
            anyhow::Ok(engine.generate(&run_owner, &[]).await)
        })
        .await
    }

    /// Poll until the job reaches a terminal state. `None` for an unknown id.
    pub async fn wait(&self, id: Uuid, poll: Duration) -> Option<JobRecord> {
        loop {
            let job = self.get(id).await?;
            if job.status.is_terminal() {
                return Some(job);
            }
            tokio::time::sleep(poll).await;
        }
    }
}
