//! Usage analytics for the redesign flow: resolves the caller's plan and
//! forwards lifecycle events to a sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redesign_core::{AnalyticsPolicy, AnalyticsSettings, BillingSettings, User};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{RedesignError, Result};
use crate::snapshot::ResourceSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    ArchitectureRedesignStartRedesign,
    ArchitectureRedesignStartBreakTheMonolith,
    ArchitectureRedesignCompleted,
}

impl EventType {
    pub fn name(&self) -> &'static str {
        match self {
            EventType::ArchitectureRedesignStartRedesign => "ArchitectureRedesignStartRedesign",
            EventType::ArchitectureRedesignStartBreakTheMonolith => {
                "ArchitectureRedesignStartBreakTheMonolith"
            }
            EventType::ArchitectureRedesignCompleted => "ArchitectureRedesignCompleted",
        }
    }
}

// --- Billing ---

#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub subscription_plan: String,
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("billing unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BillingService: Send + Sync {
    async fn get_subscription(&self, workspace_id: Option<&str>) -> std::result::Result<Subscription, BillingError>;
}

/// Plans configured in the settings file.
pub struct LocalBilling {
    settings: BillingSettings,
}

impl LocalBilling {
    pub fn new(settings: BillingSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BillingService for LocalBilling {
    async fn get_subscription(&self, workspace_id: Option<&str>) -> std::result::Result<Subscription, BillingError> {
        let plan = workspace_id
            .and_then(|id| self.settings.workspaces.get(id))
            .unwrap_or(&self.settings.default_plan);
        Ok(Subscription {
            subscription_plan: plan.clone(),
        })
    }
}

// --- Sinks ---

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    pub user_id: String,
    pub event: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum AnalyticsSinkError {
    #[error("analytics request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn track(&self, event: TrackEvent) -> std::result::Result<(), AnalyticsSinkError>;
}

/// Writes events to the structured log.
pub struct LogSink;

#[async_trait]
impl AnalyticsSink for LogSink {
    async fn track(&self, event: TrackEvent) -> std::result::Result<(), AnalyticsSinkError> {
        let properties = Value::Object(event.properties);
        tracing::info!(
            target: "redesign::analytics",
            user_id = %event.user_id,
            event = %event.event,
            properties = %properties,
            "track"
        );
        Ok(())
    }
}

/// Upper bound on a single `track` request, connect included.
pub const HTTP_SINK_TIMEOUT: Duration = Duration::from_secs(10);

/// POSTs Segment-style `track` calls to an HTTP endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
    write_key: String,
}

impl HttpSink {
    pub fn new(
        endpoint: impl Into<String>,
        write_key: impl Into<String>,
    ) -> std::result::Result<Self, AnalyticsSinkError> {
        Self::with_timeout(endpoint, write_key, HTTP_SINK_TIMEOUT)
    }

    pub fn with_timeout(
        endpoint: impl Into<String>,
        write_key: impl Into<String>,
        timeout: Duration,
    ) -> std::result::Result<Self, AnalyticsSinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, endpoint, write_key))
    }

    fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        write_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            write_key: write_key.into(),
        }
    }
}

#[async_trait]
impl AnalyticsSink for HttpSink {
    async fn track(&self, event: TrackEvent) -> std::result::Result<(), AnalyticsSinkError> {
        self.client
            .post(&self.endpoint)
            .basic_auth(&self.write_key, None::<&str>)
            .json(&event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Pick the sink the analytics settings describe.
pub fn sink_from_settings(
    settings: &AnalyticsSettings,
) -> std::result::Result<Arc<dyn AnalyticsSink>, AnalyticsSinkError> {
    let sink: Arc<dyn AnalyticsSink> = match &settings.endpoint {
        Some(endpoint) => Arc::new(HttpSink::new(endpoint.clone(), settings.write_key.clone())?),
        None => Arc::new(LogSink),
    };
    Ok(sink)
}

// --- Emitter ---

/// Identifying properties of the resource an event is about.
#[derive(Debug, Clone, Copy)]
pub struct ResourceContext<'a> {
    pub project_id: Option<&'a str>,
    pub resource_id: &'a str,
    pub resource_name: &'a str,
}

impl<'a> From<&'a ResourceSnapshot> for ResourceContext<'a> {
    fn from(snapshot: &'a ResourceSnapshot) -> Self {
        Self {
            project_id: snapshot.project_id(),
            resource_id: &snapshot.id,
            resource_name: &snapshot.name,
        }
    }
}

pub struct EventEmitter {
    billing: Arc<dyn BillingService>,
    sink: Arc<dyn AnalyticsSink>,
    policy: AnalyticsPolicy,
}

impl EventEmitter {
    pub fn new(
        billing: Arc<dyn BillingService>,
        sink: Arc<dyn AnalyticsSink>,
        policy: AnalyticsPolicy,
    ) -> Self {
        Self {
            billing,
            sink,
            policy,
        }
    }

    /// Record `event` for `user`. Failures are fatal under the strict policy.
    pub async fn track(
        &self,
        user: &User,
        resource: ResourceContext<'_>,
        event: EventType,
        extra: Map<String, Value>,
    ) -> Result<()> {
        match self.try_track(user, resource, event, extra).await {
            Ok(()) => Ok(()),
            Err(message) => {
                tracing::error!(
                    user_id = %user.id,
                    workspace_id = ?user.workspace_id(),
                    resource_id = %resource.resource_id,
                    event = event.name(),
                    error = %message,
                    "failed to track analytics event"
                );
                match self.policy {
                    AnalyticsPolicy::Strict => Err(RedesignError::Analytics(message)),
                    AnalyticsPolicy::BestEffort => Ok(()),
                }
            }
        }
    }

    async fn try_track(
        &self,
        user: &User,
        resource: ResourceContext<'_>,
        event: EventType,
        extra: Map<String, Value>,
    ) -> std::result::Result<(), String> {
        let subscription = self
            .billing
            .get_subscription(user.workspace_id())
            .await
            .map_err(|e| e.to_string())?;

        let mut properties = Map::new();
        properties.insert(
            "projectId".into(),
            resource.project_id.map_or(Value::Null, |id| Value::String(id.to_string())),
        );
        properties.insert("resourceId".into(), resource.resource_id.into());
        properties.insert("serviceName".into(), resource.resource_name.into());
        properties.insert("plan".into(), subscription.subscription_plan.into());
        properties.extend(extra);

        self.sink
            .track(TrackEvent {
                user_id: user.id.clone(),
                event: event.name().to_string(),
                properties,
            })
            .await
            .map_err(|e| e.to_string())
    }
}
