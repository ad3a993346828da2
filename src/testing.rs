//! Test harnesses for the provider.
//!
//! [`ProviderTester`] drives a [`ProviderService`] directly, without a gRPC
//! server in between. [`MemoryStreamdal`] is an in-memory Streamdal server
//! behind the [`StreamdalApi`] seam, so the provider can be exercised end to
//! end without a network.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use serde_json::json;
//! use streamdal_provider::provider::StreamdalProvider;
//! use streamdal_provider::testing::{MemoryStreamdal, ProviderTester};
//!
//! # tokio_test::block_on(async {
//! let api = Arc::new(MemoryStreamdal::new());
//! let tester = ProviderTester::new(StreamdalProvider::with_api(api.clone()));
//!
//! let state = tester
//!     .lifecycle_create("streamdal_pipeline", json!({"name": "ingest"}))
//!     .await
//!     .unwrap();
//! assert_eq!(state["name"], "ingest");
//! assert_eq!(api.calls().await, vec!["CreatePipeline", "GetPipeline"]);
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tonic::{Code, Status};

use crate::audience;
use crate::client::StreamdalApi;
use crate::error::ProviderError;
use crate::proto::streamdal::{
    Audience, GetAllResponse, NotificationConfig, Pipeline, PipelineInfo,
};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

/// Drives a provider through the same calls the host makes.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Every schema the provider exposes.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    /// Validate the provider block; error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider; error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration; error diagnostics become `Err`.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a data source configuration; error diagnostics become `Err`.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource that does not exist yet.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a change to an existing resource.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan the removal of a resource.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a resource.
    pub async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update a resource in place.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import a resource by id.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    /// Plan, create, then read back. Returns the refreshed state.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read(resource_type, created).await
    }

    /// Plan, update, then read back. Returns the refreshed state.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read(resource_type, updated).await
    }
}

/// Why a validating call failed.
#[derive(Debug, Error)]
pub enum TestError {
    /// The call returned error diagnostics.
    #[error("{} error diagnostic(s): {}", .0.len(), summaries(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// The call itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn summaries(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| match &d.attribute {
            Some(attr) => format!("{} (at {})", d.summary, attr),
            None => d.summary.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(diagnostics))
    }
}

/// Assert that a plan changes `path`.
///
/// # Panics
///
/// Panics if no change names `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "expected plan to change '{}', changed: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan changes nothing.
///
/// # Panics
///
/// Panics if the plan has changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "expected no changes, got: {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan destroys and recreates the resource.
///
/// # Panics
///
/// Panics if the plan updates in place.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(plan.requires_replace, "expected plan to require replacement");
}

/// Assert that a plan updates the resource in place.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(!plan.requires_replace, "expected plan to update in place");
}

/// Assert that a validating call failed with an error mentioning `substring`.
///
/// # Panics
///
/// Panics if the call succeeded or no error summary or detail matches.
pub fn assert_error_contains(result: &Result<(), TestError>, substring: &str) {
    match result {
        Err(TestError::Diagnostics(diagnostics)) => assert!(
            diagnostics.iter().any(|d| {
                d.summary.contains(substring)
                    || d.detail.as_deref().is_some_and(|detail| detail.contains(substring))
            }),
            "no error mentions '{}': {}",
            substring,
            summaries(diagnostics)
        ),
        Err(TestError::Provider(err)) => assert!(
            err.to_string().contains(substring),
            "error '{}' does not mention '{}'",
            err,
            substring
        ),
        Ok(()) => panic!("expected an error mentioning '{}'", substring),
    }
}

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    pipelines: BTreeMap<String, Pipeline>,
    notifications: BTreeMap<String, NotificationConfig>,
    audiences: Vec<Audience>,
    /// Attached pipeline ids keyed by audience id.
    attachments: BTreeMap<String, Vec<String>>,
    calls: Vec<String>,
    failures: HashMap<String, (Code, String)>,
}

impl MemoryState {
    fn enter(&mut self, rpc: &str) -> Result<(), ProviderError> {
        self.calls.push(rpc.to_string());
        match self.failures.get(rpc) {
            Some((code, message)) => Err(ProviderError::Rpc(Status::new(*code, message.clone()))),
            None => Ok(()),
        }
    }

    fn next_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", kind, self.next_id)
    }

    fn register(&mut self, audience: &Audience) {
        if !audience::contains(&self.audiences, audience) {
            self.audiences.push(audience.clone());
        }
    }

    fn audiences_of(&self, pipeline_id: &str) -> Vec<Audience> {
        self.audiences
            .iter()
            .filter(|a| {
                self.attachments
                    .get(&audience::to_id(a))
                    .is_some_and(|ids| ids.iter().any(|id| id == pipeline_id))
            })
            .cloned()
            .collect()
    }
}

fn not_found(kind: &str, id: &str) -> ProviderError {
    ProviderError::NotFound(format!("{} '{}'", kind, id))
}

fn bad_request(message: String) -> ProviderError {
    ProviderError::Server {
        code: "bad_request".to_string(),
        message,
    }
}

/// An in-memory Streamdal server.
///
/// Ids are assigned as `pipeline-N` and `notification-N`. Every call is
/// recorded by its RPC name, and any RPC can be made to fail with a status.
#[derive(Default)]
pub struct MemoryStreamdal {
    state: Mutex<MemoryState>,
}

impl MemoryStreamdal {
    /// An empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// RPC names called so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    /// Forget the recorded calls.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Make every later call to `rpc` fail with `code`.
    pub async fn fail(&self, rpc: &str, code: Code, message: &str) {
        self.state
            .lock()
            .await
            .failures
            .insert(rpc.to_string(), (code, message.to_string()));
    }

    /// A stored pipeline.
    pub async fn pipeline(&self, id: &str) -> Option<Pipeline> {
        self.state.lock().await.pipelines.get(id).cloned()
    }

    /// A stored notification config.
    pub async fn notification(&self, id: &str) -> Option<NotificationConfig> {
        self.state.lock().await.notifications.get(id).cloned()
    }

    /// Registered audiences, in registration order.
    pub async fn audiences(&self) -> Vec<Audience> {
        self.state.lock().await.audiences.clone()
    }

    /// Pipeline ids attached to `audience`, in the order they were set.
    pub async fn attached(&self, audience: &Audience) -> Vec<String> {
        self.state
            .lock()
            .await
            .attachments
            .get(&audience::to_id(audience))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl StreamdalApi for MemoryStreamdal {
    async fn get_all(&self) -> Result<GetAllResponse, ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("GetAll")?;

        let pipelines = state
            .pipelines
            .iter()
            .map(|(id, pipeline)| {
                let info = PipelineInfo {
                    audiences: state.audiences_of(id),
                    pipeline: Some(pipeline.clone()),
                };
                (id.clone(), info)
            })
            .collect();

        Ok(GetAllResponse {
            audiences: state.audiences.clone(),
            pipelines,
        })
    }

    async fn get_pipelines(&self) -> Result<Vec<Pipeline>, ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("GetPipelines")?;
        Ok(state.pipelines.values().cloned().collect())
    }

    async fn get_pipeline(&self, id: &str) -> Result<Pipeline, ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("GetPipeline")?;
        state
            .pipelines
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("pipeline", id))
    }

    async fn create_pipeline(&self, mut pipeline: Pipeline) -> Result<String, ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("CreatePipeline")?;

        let id = state.next_id("pipeline");
        pipeline.id = id.clone();
        pipeline.paused.get_or_insert(false);
        state.pipelines.insert(id.clone(), pipeline);
        Ok(id)
    }

    async fn update_pipeline(&self, mut pipeline: Pipeline) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("UpdatePipeline")?;

        let Some(existing) = state.pipelines.get_mut(&pipeline.id) else {
            return Err(not_found("pipeline", &pipeline.id));
        };
        if pipeline.paused.is_none() {
            pipeline.paused = existing.paused;
        }
        *existing = pipeline;
        Ok(())
    }

    async fn delete_pipeline(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("DeletePipeline")?;

        state
            .pipelines
            .remove(id)
            .ok_or_else(|| not_found("pipeline", id))?;
        for ids in state.attachments.values_mut() {
            ids.retain(|attached| attached != id);
        }
        Ok(())
    }

    async fn set_pipelines(
        &self,
        audience: Audience,
        pipeline_ids: Vec<String>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("SetPipelines")?;

        if let Some(missing) = pipeline_ids
            .iter()
            .find(|id| !state.pipelines.contains_key(id.as_str()))
        {
            return Err(bad_request(format!("pipeline '{}' does not exist", missing)));
        }

        state.register(&audience);
        state
            .attachments
            .insert(audience::to_id(&audience), pipeline_ids);
        Ok(())
    }

    async fn get_notifications(&self) -> Result<HashMap<String, NotificationConfig>, ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("GetNotifications")?;
        Ok(state
            .notifications
            .iter()
            .map(|(id, config)| (id.clone(), config.clone()))
            .collect())
    }

    async fn get_notification(&self, id: &str) -> Result<NotificationConfig, ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("GetNotification")?;
        state
            .notifications
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("notification config", id))
    }

    async fn create_notification(
        &self,
        mut config: NotificationConfig,
    ) -> Result<NotificationConfig, ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("CreateNotification")?;

        let id = state.next_id("notification");
        config.id = Some(id.clone());
        state.notifications.insert(id, config.clone());
        Ok(config)
    }

    async fn update_notification(&self, config: NotificationConfig) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("UpdateNotification")?;

        let id = config.id.clone().unwrap_or_default();
        match state.notifications.get_mut(&id) {
            Some(existing) => {
                *existing = config;
                Ok(())
            },
            None => Err(not_found("notification config", &id)),
        }
    }

    async fn delete_notification(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("DeleteNotification")?;
        state
            .notifications
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("notification config", id))
    }

    async fn create_audience(&self, audience: Audience) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("CreateAudience")?;
        state.register(&audience);
        Ok(())
    }

    async fn delete_audience(&self, audience: Audience, force: bool) -> Result<(), ProviderError> {
        let mut state = self.state.lock().await;
        state.enter("DeleteAudience")?;

        let id = audience::to_id(&audience);
        if !audience::contains(&state.audiences, &audience) {
            return Err(not_found("audience", &id));
        }
        let attached = state.attachments.get(&id).is_some_and(|ids| !ids.is_empty());
        if attached && !force {
            return Err(bad_request(format!(
                "audience '{}' has attached pipelines",
                id
            )));
        }

        state.audiences.retain(|a| !audience::same(a, &audience));
        state.attachments.remove(&id);
        Ok(())
    }
}
