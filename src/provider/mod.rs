//! The Streamdal provider.
//!
//! [`StreamdalProvider`] implements [`ProviderService`] for three resource
//! types and three data sources of the same names:
//!
//! - `streamdal_pipeline`
//! - `streamdal_notification`
//! - `streamdal_audience`
//!
//! All server access goes through a [`StreamdalApi`] installed by
//! Configure, or supplied up front with [`StreamdalProvider::with_api`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::client::{GrpcStreamdal, StreamdalApi};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema, Schema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

mod audience;
mod data_sources;
mod notification;
mod pipeline;
mod plan;
pub mod schemas;

/// Pipeline resource and data source name.
pub const PIPELINE: &str = "streamdal_pipeline";
/// Notification config resource and data source name.
pub const NOTIFICATION: &str = "streamdal_notification";
/// Audience resource and data source name.
pub const AUDIENCE: &str = "streamdal_audience";

/// The object kinds the provider manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Pipeline,
    Notification,
    Audience,
}

impl Kind {
    fn parse(type_name: &str) -> Result<Self, ProviderError> {
        match type_name {
            PIPELINE => Ok(Kind::Pipeline),
            NOTIFICATION => Ok(Kind::Notification),
            AUDIENCE => Ok(Kind::Audience),
            other => Err(ProviderError::UnknownResource(other.to_string())),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Kind::Pipeline => PIPELINE,
            Kind::Notification => NOTIFICATION,
            Kind::Audience => AUDIENCE,
        }
    }

    fn resource_schema(self) -> Schema {
        match self {
            Kind::Pipeline => schemas::pipeline(),
            Kind::Notification => schemas::notification(),
            Kind::Audience => schemas::audience(),
        }
    }

    fn data_source_schema(self) -> Schema {
        match self {
            Kind::Pipeline => schemas::pipeline_data_source(),
            Kind::Notification => schemas::notification_data_source(),
            Kind::Audience => schemas::audience_data_source(),
        }
    }
}

/// Server-assigned id stored in a resource's state.
fn state_id(state: &Value) -> Result<String, ProviderError> {
    match state.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ProviderError::InvalidAttribute {
            attribute: "id".to_string(),
            message: "resource state has no id".to_string(),
        }),
    }
}

/// Provider for the Streamdal pipeline-management server.
pub struct StreamdalProvider {
    api: RwLock<Option<Arc<dyn StreamdalApi>>>,
}

impl StreamdalProvider {
    /// A provider that connects on Configure.
    pub fn new() -> Self {
        Self {
            api: RwLock::new(None),
        }
    }

    /// A provider that already has a client. Configure replaces it.
    pub fn with_api(api: Arc<dyn StreamdalApi>) -> Self {
        Self {
            api: RwLock::new(Some(api)),
        }
    }

    async fn api(&self) -> Result<Arc<dyn StreamdalApi>, ProviderError> {
        self.api
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
    }
}

impl Default for StreamdalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderService for StreamdalProvider {
    fn schema(&self) -> ProviderSchema {
        schemas::provider_schema()
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validate(&schemas::provider_config(), &config);
        if diagnostics.is_empty() {
            if let Err(err) = ProviderConfig::from_value(&config) {
                diagnostics.push(Diagnostic::from(&err));
            }
        }
        Ok(diagnostics)
    }

    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate(&schemas::provider_config(), &config);
        if !diagnostics.is_empty() {
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value(&config)?;
        info!(address = %config.address, timeout = ?config.connection_timeout, "Connecting to Streamdal");

        let client = GrpcStreamdal::connect(&config).await?;
        *self.api.write().await = Some(Arc::new(client));
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind = Kind::parse(resource_type)?;
        Ok(validate(&kind.resource_schema(), &config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let kind = Kind::parse(resource_type)?;
        plan::plan(kind, prior_state, proposed_state)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let kind = Kind::parse(resource_type)?;
        let api = self.api().await?;
        let api = api.as_ref();

        match kind {
            Kind::Pipeline => pipeline::create(api, &planned_state).await,
            Kind::Notification => notification::create(api, &planned_state).await,
            Kind::Audience => audience::create(api, &planned_state).await,
        }
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let kind = Kind::parse(resource_type)?;
        let api = self.api().await?;
        let api = api.as_ref();

        match kind {
            Kind::Pipeline => pipeline::read(api, &current_state).await,
            Kind::Notification => notification::read(api, &current_state).await,
            Kind::Audience => audience::read(api, &current_state).await,
        }
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let kind = Kind::parse(resource_type)?;
        let api = self.api().await?;
        let api = api.as_ref();

        match kind {
            Kind::Pipeline => pipeline::update(api, &prior_state, &planned_state).await,
            Kind::Notification => notification::update(api, &prior_state, &planned_state).await,
            Kind::Audience => audience::update(api, &prior_state, &planned_state).await,
        }
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let kind = Kind::parse(resource_type)?;
        let api = self.api().await?;
        let api = api.as_ref();

        match kind {
            Kind::Pipeline => pipeline::delete(api, &current_state).await,
            Kind::Notification => notification::delete(api, &current_state).await,
            Kind::Audience => audience::delete(api, &current_state).await,
        }
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let kind = Kind::parse(resource_type)?;
        let api = self.api().await?;
        let api = api.as_ref();

        let state = match kind {
            Kind::Pipeline => pipeline::import(api, id).await?,
            Kind::Notification => notification::import(api, id).await?,
            Kind::Audience => audience::import(api, id).await?,
        };
        Ok(vec![ImportedResource::new(kind.name(), state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let kind = Kind::parse(data_source_type)?;
        Ok(validate(&kind.data_source_schema(), &config))
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let kind = Kind::parse(data_source_type)?;
        let api = self.api().await?;
        data_sources::read(kind, api.as_ref(), &config).await
    }
}
