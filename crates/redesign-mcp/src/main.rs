use std::sync::Arc;

use redesign_core::{FileSchemaStore, Resource, SchemaStore, Settings, User};
use redesign_suggest::analytics::{
    sink_from_settings, EventEmitter, EventType, LocalBilling, ResourceContext,
};
use redesign_suggest::engine::LlmGenerator;
use redesign_suggest::jobs::InMemoryJobStore;
use redesign_suggest::status::RedesignStatus;
use redesign_suggest::{RedesignError, RedesignService};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ResourceRequest {
    /// ID of the resource (service) whose data model should be redesigned
    resource_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct ImportResourceRequest {
    /// The complete resource: {id, name, project?: {id, name}, entities: [{id, name, displayName, deletedAt?, versions: [{versionNumber, fields: [{name, displayName, dataType, properties}]}]}]}. Lookup fields reference their target with properties.relatedEntityId.
    resource: Resource,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct FinalizeRequest {
    /// Job ID returned by trigger_break_the_monolith
    job_id: String,
}

// --- Server ---

#[derive(Clone)]
pub struct RedesignServer {
    service: Arc<RedesignService>,
    schema: Arc<dyn SchemaStore>,
    user: User,
    tool_router: ToolRouter<Self>,
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
        Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
            "Serialization error: {}",
            e
        ))])),
    }
}

fn error_result(context: &str, err: &RedesignError) -> Result<CallToolResult, McpError> {
    let mut text = format!("{}: {}", context, err);
    if let RedesignError::BadFormat { raw, .. } = err {
        text.push_str("\n\nRaw output:\n");
        text.push_str(raw);
    }
    Ok(CallToolResult::error(vec![Content::text(text)]))
}

#[tool_router]
impl RedesignServer {
    pub fn new(service: Arc<RedesignService>, schema: Arc<dyn SchemaStore>, user: User) -> Self {
        Self {
            service,
            schema,
            user,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List all resources (services) available for redesign, with their live entity counts")]
    async fn list_resources(&self) -> Result<CallToolResult, McpError> {
        match self.schema.list_resources().await {
            Ok(summaries) if summaries.is_empty() => Ok(CallToolResult::success(vec![
                Content::text("No resources found. Use import_resource to add one."),
            ])),
            Ok(summaries) => json_result(&summaries),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(e.to_string())])),
        }
    }

    #[tool(
        description = "Create or overwrite a resource and its data model. Use this to load a monolith before redesigning it."
    )]
    async fn import_resource(
        &self,
        Parameters(req): Parameters<ImportResourceRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.schema.put_resource(&req.resource).await {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Imported resource '{}' with {} entities.",
                req.resource.id,
                req.resource.entities.len()
            ))])),
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Failed to import resource '{}': {}",
                req.resource.id, e
            ))])),
        }
    }

    #[tool(
        description = "Start a redesign: returns the resource's current data model (live entities, baseline fields) so it can be confirmed before breaking it into microservices."
    )]
    async fn start_redesign(
        &self,
        Parameters(req): Parameters<ResourceRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.service.start_redesign(&self.user, &req.resource_id).await {
            Ok(snapshot) => json_result(&snapshot),
            Err(e) => error_result(&format!("Failed to start redesign of '{}'", req.resource_id), &e),
        }
    }

    #[tool(
        description = "Ask the AI to propose a microservice decomposition of a resource. Returns immediately with a job handle {id, lifecycle, ...}; poll finalize_break_the_monolith with the job id until status is Completed or Failed."
    )]
    async fn trigger_break_the_monolith(
        &self,
        Parameters(req): Parameters<ResourceRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .service
            .trigger_break_service_into_microservices(&req.resource_id, &self.user)
            .await
        {
            Ok(handle) => json_result(&handle),
            Err(e) => error_result(
                &format!("Failed to trigger break-the-monolith for '{}'", req.resource_id),
                &e,
            ),
        }
    }

    #[tool(
        description = "Check a break-the-monolith job. Returns {status: Running|Completed|Failed, originalResourceId, data}. While Running, data is null; call again later. When Completed, data is {microservices: [{name, functionality, dataModels: [{name, originalEntityId}]}]} where every entity exists in the resource and belongs to exactly one microservice."
    )]
    async fn finalize_break_the_monolith(
        &self,
        Parameters(req): Parameters<FinalizeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = match self
            .service
            .finalize_break_service_into_microservices(&req.job_id)
            .await
        {
            Ok(result) => result,
            Err(e) => return error_result(&format!("Failed to finalize job '{}'", req.job_id), &e),
        };

        if let (RedesignStatus::Completed, Some(proposal)) = (result.status, &result.data) {
            self.track_completed(&result.original_resource_id, proposal.microservices.len())
                .await;
        }
        json_result(&result)
    }
}

impl RedesignServer {
    /// Completion events never fail the finalize call.
    async fn track_completed(&self, resource_id: &str, microservices: usize) {
        let snapshot = match self.service.resource_snapshot(resource_id).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(resource_id, error = %e, "skipping completion event");
                return;
            }
        };
        let mut extra = serde_json::Map::new();
        extra.insert("microservicesCount".into(), microservices.into());
        if let Err(e) = self
            .service
            .events()
            .track(
                &self.user,
                ResourceContext::from(&snapshot),
                EventType::ArchitectureRedesignCompleted,
                extra,
            )
            .await
        {
            tracing::warn!(resource_id, error = %e, "completion event not recorded");
        }
    }
}

#[tool_handler]
impl ServerHandler for RedesignServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            "{}\n\n## Decomposition Guidelines\n{}",
            INSTRUCTIONS,
            redesign_core::guidelines::GUIDELINES
        );
        ServerInfo {
            instructions: Some(instructions.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

const INSTRUCTIONS: &str = r#"This server proposes how to break a monolithic service into microservices.

Workflow:
1. `list_resources` to find the monolith, or `import_resource` to load one.
2. `start_redesign` to review its data model.
3. `trigger_break_the_monolith` to submit it; keep the returned job id.
4. `finalize_break_the_monolith` with that id. While the status is Running, wait and call it again. Once Completed, `data` holds the proposal.

Proposals only contain entities that exist in the resource at finalize time, and each entity appears in exactly one microservice. If finalize reports a bad format, the AI produced unusable output; trigger a new job."#;

fn load_settings() -> Settings {
    match redesign_core::read_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "could not read settings, using defaults");
            Settings::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the MCP protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("REDESIGN_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    if !redesign_core::ai_configured(&settings.ai) {
        tracing::warn!("AI provider is not configured; generation jobs will fail");
    }

    let schema: Arc<dyn SchemaStore> = Arc::new(FileSchemaStore::default_location());
    let jobs = Arc::new(InMemoryJobStore::new(Arc::new(LlmGenerator::new(
        settings.ai.clone(),
    ))));
    let events = EventEmitter::new(
        Arc::new(LocalBilling::new(settings.billing.clone())),
        sink_from_settings(&settings.analytics)?,
        settings.analytics.policy,
    );
    let service = Arc::new(RedesignService::new(schema.clone(), jobs, events));

    let server = RedesignServer::new(service, schema, settings.user.to_user());
    let running = server
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    running.waiting().await?;
    Ok(())
}
