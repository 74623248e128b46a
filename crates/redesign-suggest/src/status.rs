use serde::{Deserialize, Serialize};

use crate::jobs::{JobLifecycle, JobStore, JobStoreError};

/// Redesign job status as reported to callers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RedesignStatus {
    Running,
    Completed,
    Failed,
}

impl From<JobLifecycle> for RedesignStatus {
    fn from(lifecycle: JobLifecycle) -> Self {
        match lifecycle {
            JobLifecycle::Queued | JobLifecycle::Running => RedesignStatus::Running,
            JobLifecycle::Completed => RedesignStatus::Completed,
            JobLifecycle::Failed | JobLifecycle::Invalid => RedesignStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusReport {
    pub status: RedesignStatus,
    pub original_resource_id: String,
    /// Raw generator output; only read when `status` is `Completed`
    pub raw_metadata: Option<String>,
}

/// Read-only status lookup. Never waits for the job; callers poll.
pub async fn check_status(
    jobs: &dyn JobStore,
    job_id: &str,
) -> Result<JobStatusReport, JobStoreError> {
    let metadata = jobs.metadata(job_id).await?;
    let status = RedesignStatus::from(jobs.lifecycle(job_id).await?);
    tracing::debug!(job_id, ?status, "job status checked");
    Ok(JobStatusReport {
        status,
        original_resource_id: metadata.resource_id,
        raw_metadata: metadata.raw_metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_maps_onto_three_states() {
        assert_eq!(RedesignStatus::from(JobLifecycle::Queued), RedesignStatus::Running);
        assert_eq!(RedesignStatus::from(JobLifecycle::Running), RedesignStatus::Running);
        assert_eq!(RedesignStatus::from(JobLifecycle::Completed), RedesignStatus::Completed);
        assert_eq!(RedesignStatus::from(JobLifecycle::Failed), RedesignStatus::Failed);
        assert_eq!(RedesignStatus::from(JobLifecycle::Invalid), RedesignStatus::Failed);
    }

    #[test]
    fn status_serializes_by_name() {
        assert_eq!(serde_json::to_string(&RedesignStatus::Running).unwrap(), "\"Running\"");
    }
}
