//! Long-running generation jobs: the store contract the redesign flow submits
//! to and polls, plus an in-process implementation driving a [`Generator`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::engine::Generator;
use crate::prompt;

/// Parameter carrying the user-side input of a conversation.
pub const USER_INPUT_PARAM: &str = "userInput";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConversationType {
    BreakTheMonolith,
}

impl ConversationType {
    pub fn key(&self) -> &'static str {
        match self {
            ConversationType::BreakTheMonolith => "BreakTheMonolith",
        }
    }

    pub fn system_prompt(&self) -> String {
        match self {
            ConversationType::BreakTheMonolith => prompt::break_the_monolith_system_prompt(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationParam {
    pub name: String,
    pub value: String,
}

/// Store-side job states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobLifecycle {
    Queued,
    Running,
    Completed,
    Failed,
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: String,
    pub conversation_type: ConversationType,
    pub user_id: String,
    pub resource_id: String,
    pub lifecycle: JobLifecycle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobMetadata {
    pub resource_id: String,
    /// Generator output, present once the job completed
    pub raw_metadata: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job '{0}' not found")]
    NotFound(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn submit(
        &self,
        conversation_type: ConversationType,
        params: Vec<ConversationParam>,
        user_id: &str,
        resource_id: &str,
    ) -> Result<JobHandle, JobStoreError>;

    async fn metadata(&self, job_id: &str) -> Result<JobMetadata, JobStoreError>;

    async fn lifecycle(&self, job_id: &str) -> Result<JobLifecycle, JobStoreError>;
}

#[derive(Debug, Clone)]
struct JobRecord {
    handle: JobHandle,
    raw_metadata: Option<String>,
    error: Option<String>,
}

type Jobs = Arc<RwLock<HashMap<String, JobRecord>>>;

/// Keeps jobs in memory and runs each generation on the tokio runtime.
/// Must be used from within a runtime. Records live for the lifetime of the
/// process; nothing is evicted.
pub struct InMemoryJobStore {
    jobs: Jobs,
    generator: Arc<dyn Generator>,
}

impl InMemoryJobStore {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            generator,
        }
    }

    async fn record(&self, job_id: &str) -> Result<JobRecord, JobStoreError> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobStoreError::NotFound(job_id.to_string()))
    }
}

async fn finish(jobs: &Jobs, job_id: &str, outcome: Result<String, String>) {
    let mut guard = jobs.write().await;
    let Some(record) = guard.get_mut(job_id) else {
        return;
    };
    match outcome {
        Ok(text) => {
            record.handle.lifecycle = JobLifecycle::Completed;
            record.raw_metadata = Some(text);
        }
        Err(e) => {
            record.handle.lifecycle = JobLifecycle::Failed;
            record.error = Some(e);
        }
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn submit(
        &self,
        conversation_type: ConversationType,
        params: Vec<ConversationParam>,
        user_id: &str,
        resource_id: &str,
    ) -> Result<JobHandle, JobStoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let input = params
            .into_iter()
            .find(|p| p.name == USER_INPUT_PARAM)
            .map(|p| p.value);

        let mut handle = JobHandle {
            id: id.clone(),
            conversation_type,
            user_id: user_id.to_string(),
            resource_id: resource_id.to_string(),
            lifecycle: JobLifecycle::Queued,
        };

        let Some(input) = input else {
            tracing::warn!(job_id = %id, conversation = conversation_type.key(), "conversation submitted without user input");
            handle.lifecycle = JobLifecycle::Invalid;
            self.jobs.write().await.insert(
                id,
                JobRecord {
                    handle: handle.clone(),
                    raw_metadata: None,
                    error: Some(format!("missing '{}' parameter", USER_INPUT_PARAM)),
                },
            );
            return Ok(handle);
        };

        self.jobs.write().await.insert(
            id.clone(),
            JobRecord {
                handle: handle.clone(),
                raw_metadata: None,
                error: None,
            },
        );
        tracing::info!(job_id = %id, conversation = conversation_type.key(), resource_id, "job queued");

        let jobs = Arc::clone(&self.jobs);
        let generator = Arc::clone(&self.generator);
        let system = conversation_type.system_prompt();
        tokio::spawn(async move {
            if let Some(record) = jobs.write().await.get_mut(&id) {
                record.handle.lifecycle = JobLifecycle::Running;
            }
            // A panicking generator must still settle the job.
            let generation =
                tokio::spawn(async move { generator.generate(&system, &input).await });
            let outcome = match generation.await {
                Ok(result) => result.map_err(|e| {
                    tracing::error!(job_id = %id, error = %e, "generation failed");
                    e.to_string()
                }),
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "generation task aborted");
                    Err(format!("generation aborted: {e}"))
                }
            };
            if outcome.is_ok() {
                tracing::info!(job_id = %id, "job completed");
            }
            finish(&jobs, &id, outcome).await;
        });

        Ok(handle)
    }

    async fn metadata(&self, job_id: &str) -> Result<JobMetadata, JobStoreError> {
        let record = self.record(job_id).await?;
        Ok(JobMetadata {
            resource_id: record.handle.resource_id,
            raw_metadata: record.raw_metadata,
            error: record.error,
        })
    }

    async fn lifecycle(&self, job_id: &str) -> Result<JobLifecycle, JobStoreError> {
        Ok(self.record(job_id).await?.handle.lifecycle)
    }
}
