pub mod analytics;
pub mod engine;
pub mod error;
pub mod jobs;
mod parse;
pub mod prompt;
pub mod reconcile;
pub mod snapshot;
pub mod status;

use std::sync::Arc;

use redesign_core::{SchemaStore, User};
use serde::{Deserialize, Serialize};

use analytics::{EventEmitter, EventType, ResourceContext};
use jobs::{ConversationParam, ConversationType, JobHandle, JobStore, USER_INPUT_PARAM};
use snapshot::ResourceSnapshot;
use status::RedesignStatus;

pub use error::{RedesignError, Result};
pub use parse::{parse_recommendation, RawMicroservice, RawRecommendationOutput};
pub use reconcile::{DecompositionProposal, ProposedDataModel, ProposedMicroservice};

/// Outcome of a finalize call. `data` is only set once the job completed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakServiceToMicroservicesResult {
    pub status: RedesignStatus,
    pub original_resource_id: String,
    pub data: Option<DecompositionProposal>,
}

/// Break-the-monolith flow: snapshot a resource, submit it for generation,
/// and reconcile the generated proposal once the job is done.
pub struct RedesignService {
    schema: Arc<dyn SchemaStore>,
    jobs: Arc<dyn JobStore>,
    events: EventEmitter,
}

impl RedesignService {
    pub fn new(schema: Arc<dyn SchemaStore>, jobs: Arc<dyn JobStore>, events: EventEmitter) -> Self {
        Self {
            schema,
            jobs,
            events,
        }
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub async fn resource_snapshot(&self, resource_id: &str) -> Result<ResourceSnapshot> {
        snapshot::take_snapshot(self.schema.as_ref(), resource_id).await
    }

    /// Confirm the monolith about to be redesigned.
    pub async fn start_redesign(&self, user: &User, resource_id: &str) -> Result<ResourceSnapshot> {
        let resource = self.resource_snapshot(resource_id).await?;
        self.events
            .track(
                user,
                ResourceContext::from(&resource),
                EventType::ArchitectureRedesignStartRedesign,
                Default::default(),
            )
            .await?;
        Ok(resource)
    }

    /// Submit the resource's data model for decomposition and return the job handle.
    pub async fn trigger_break_service_into_microservices(
        &self,
        resource_id: &str,
        user: &User,
    ) -> Result<JobHandle> {
        let resource = self.resource_snapshot(resource_id).await?;
        let user_input = prompt::user_message(&resource).map_err(RedesignError::Prompt)?;
        tracing::debug!(resource_id, prompt_bytes = user_input.len(), "break-the-monolith prompt built");

        let params = vec![ConversationParam {
            name: USER_INPUT_PARAM.to_string(),
            value: user_input,
        }];
        let handle = self
            .jobs
            .submit(ConversationType::BreakTheMonolith, params, &user.id, resource_id)
            .await?;
        tracing::info!(resource_id, job_id = %handle.id, "break-the-monolith job submitted");

        self.events
            .track(
                user,
                ResourceContext::from(&resource),
                EventType::ArchitectureRedesignStartBreakTheMonolith,
                Default::default(),
            )
            .await?;
        Ok(handle)
    }

    /// Report the job's status and, once completed, the reconciled proposal.
    /// Safe to call repeatedly; the job record is never modified.
    pub async fn finalize_break_service_into_microservices(
        &self,
        job_id: &str,
    ) -> Result<BreakServiceToMicroservicesResult> {
        let report = status::check_status(self.jobs.as_ref(), job_id).await?;

        if report.status != RedesignStatus::Completed {
            return Ok(BreakServiceToMicroservicesResult {
                status: report.status,
                original_resource_id: report.original_resource_id,
                data: None,
            });
        }

        let raw = report.raw_metadata.unwrap_or_default();
        let recommendations = self
            .prepare_recommendations(&raw, &report.original_resource_id)
            .await?;

        Ok(BreakServiceToMicroservicesResult {
            status: RedesignStatus::Completed,
            original_resource_id: report.original_resource_id,
            data: Some(recommendations),
        })
    }

    /// Parse raw generator output and reconcile it against a fresh snapshot.
    pub async fn prepare_recommendations(
        &self,
        raw: &str,
        resource_id: &str,
    ) -> Result<DecompositionProposal> {
        let output = parse_recommendation(raw)?;
        let ground_truth = self.resource_snapshot(resource_id).await?;
        let proposal = reconcile::reconcile(output, &ground_truth);
        tracing::info!(
            resource_id,
            microservices = proposal.microservices.len(),
            "break-the-monolith proposal reconciled"
        );
        Ok(proposal)
    }
}
