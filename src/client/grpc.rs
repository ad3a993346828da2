//! tonic implementation of [`StreamdalApi`].

use std::collections::HashMap;

use async_trait::async_trait;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};
use tracing::{debug, info, instrument};

use super::{check_response, StreamdalApi};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::proto::streamdal::external_client::ExternalClient;
use crate::proto::streamdal::{
    Audience, CreateAudienceRequest, CreateNotificationRequest, CreatePipelineRequest,
    DeleteAudienceRequest, DeleteNotificationRequest, DeletePipelineRequest, GetAllRequest,
    GetAllResponse, GetNotificationRequest, GetNotificationsRequest, GetPipelineRequest,
    GetPipelinesRequest, NotificationConfig, Pipeline, SetPipelinesRequest,
    UpdateNotificationRequest, UpdatePipelineRequest,
};

/// Metadata header carrying the API token.
pub const AUTH_TOKEN_HEADER: &str = "auth-token";

/// Adds the `auth-token` header to every outgoing call.
#[derive(Clone)]
pub struct AuthInterceptor {
    token: AsciiMetadataValue,
}

impl AuthInterceptor {
    /// Fails if the token is not a valid header value.
    pub fn new(token: &str) -> Result<Self, ProviderError> {
        let token = token.parse::<AsciiMetadataValue>().map_err(|_| {
            ProviderError::Configuration(
                "token contains characters that are not allowed in a header".to_string(),
            )
        })?;
        Ok(Self { token })
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(AUTH_TOKEN_HEADER, self.token.clone());
        Ok(request)
    }
}

type Client = ExternalClient<InterceptedService<Channel, AuthInterceptor>>;

/// Streamdal client over a tonic channel.
#[derive(Clone)]
pub struct GrpcStreamdal {
    client: Client,
}

impl GrpcStreamdal {
    /// Dial the server eagerly, failing if it cannot be reached within the
    /// configured timeout.
    pub async fn connect(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let interceptor = AuthInterceptor::new(&config.token)?;
        let endpoint = Endpoint::from_shared(config.endpoint_uri())?
            .connect_timeout(config.connection_timeout);

        debug!(address = %config.address, timeout = ?config.connection_timeout, "Dialing Streamdal server");

        let channel = tokio::time::timeout(config.connection_timeout, endpoint.connect())
            .await
            .map_err(|_| {
                ProviderError::Configuration(format!(
                    "timed out after {:?} connecting to Streamdal server at {}",
                    config.connection_timeout, config.address
                ))
            })??;

        info!(address = %config.address, "Connected to Streamdal server");
        Ok(Self::with_channel(channel, interceptor))
    }

    /// Wrap an existing channel.
    pub fn with_channel(channel: Channel, interceptor: AuthInterceptor) -> Self {
        Self {
            client: ExternalClient::with_interceptor(channel, interceptor),
        }
    }

    // tonic clients take `&mut self`; clones share the channel.
    fn client(&self) -> Client {
        self.client.clone()
    }
}

#[async_trait]
impl StreamdalApi for GrpcStreamdal {
    #[instrument(skip(self), name = "streamdal.get_all")]
    async fn get_all(&self) -> Result<GetAllResponse, ProviderError> {
        let resp = self.client().get_all(GetAllRequest {}).await?.into_inner();
        debug!(
            audiences = resp.audiences.len(),
            pipelines = resp.pipelines.len(),
            "GetAll completed"
        );
        Ok(resp)
    }

    #[instrument(skip(self), name = "streamdal.get_pipelines")]
    async fn get_pipelines(&self) -> Result<Vec<Pipeline>, ProviderError> {
        let resp = self
            .client()
            .get_pipelines(GetPipelinesRequest {})
            .await?
            .into_inner();
        debug!(pipelines = resp.pipelines.len(), "GetPipelines completed");
        Ok(resp.pipelines)
    }

    #[instrument(skip(self), name = "streamdal.get_pipeline")]
    async fn get_pipeline(&self, id: &str) -> Result<Pipeline, ProviderError> {
        let resp = self
            .client()
            .get_pipeline(GetPipelineRequest {
                pipeline_id: id.to_string(),
            })
            .await?
            .into_inner();
        resp.pipeline
            .ok_or_else(|| ProviderError::NotFound(format!("pipeline '{}'", id)))
    }

    #[instrument(skip(self, pipeline), fields(name = %pipeline.name), name = "streamdal.create_pipeline")]
    async fn create_pipeline(&self, pipeline: Pipeline) -> Result<String, ProviderError> {
        let resp = self
            .client()
            .create_pipeline(CreatePipelineRequest {
                pipeline: Some(pipeline),
            })
            .await?
            .into_inner();
        info!(id = %resp.pipeline_id, "Pipeline created");
        Ok(resp.pipeline_id)
    }

    #[instrument(skip(self, pipeline), fields(id = %pipeline.id), name = "streamdal.update_pipeline")]
    async fn update_pipeline(&self, pipeline: Pipeline) -> Result<(), ProviderError> {
        let resp = self
            .client()
            .update_pipeline(UpdatePipelineRequest {
                pipeline: Some(pipeline),
            })
            .await?
            .into_inner();
        check_response(resp)?;
        info!("Pipeline updated");
        Ok(())
    }

    #[instrument(skip(self), name = "streamdal.delete_pipeline")]
    async fn delete_pipeline(&self, id: &str) -> Result<(), ProviderError> {
        let resp = self
            .client()
            .delete_pipeline(DeletePipelineRequest {
                pipeline_id: id.to_string(),
            })
            .await?
            .into_inner();
        check_response(resp)?;
        info!("Pipeline deleted");
        Ok(())
    }

    #[instrument(skip(self, audience), fields(audience = %crate::audience::to_id(&audience)), name = "streamdal.set_pipelines")]
    async fn set_pipelines(
        &self,
        audience: Audience,
        pipeline_ids: Vec<String>,
    ) -> Result<(), ProviderError> {
        let resp = self
            .client()
            .set_pipelines(SetPipelinesRequest {
                pipeline_ids,
                audience: Some(audience),
            })
            .await?
            .into_inner();
        check_response(resp)?;
        info!("Audience pipelines set");
        Ok(())
    }

    #[instrument(skip(self), name = "streamdal.get_notifications")]
    async fn get_notifications(&self) -> Result<HashMap<String, NotificationConfig>, ProviderError> {
        let resp = self
            .client()
            .get_notifications(GetNotificationsRequest {})
            .await?
            .into_inner();
        debug!(notifications = resp.notifications.len(), "GetNotifications completed");
        Ok(resp.notifications)
    }

    #[instrument(skip(self), name = "streamdal.get_notification")]
    async fn get_notification(&self, id: &str) -> Result<NotificationConfig, ProviderError> {
        let resp = self
            .client()
            .get_notification(GetNotificationRequest {
                notification_id: id.to_string(),
            })
            .await?
            .into_inner();
        resp.notification
            .ok_or_else(|| ProviderError::NotFound(format!("notification config '{}'", id)))
    }

    #[instrument(skip(self, config), fields(name = %config.name), name = "streamdal.create_notification")]
    async fn create_notification(
        &self,
        config: NotificationConfig,
    ) -> Result<NotificationConfig, ProviderError> {
        let resp = self
            .client()
            .create_notification(CreateNotificationRequest {
                notification: Some(config),
            })
            .await?
            .into_inner();
        let created = resp.notification.ok_or_else(|| ProviderError::Server {
            code: "generic_error".to_string(),
            message: "CreateNotification returned no notification config".to_string(),
        })?;
        info!(id = ?created.id, "Notification config created");
        Ok(created)
    }

    #[instrument(skip(self, config), fields(id = ?config.id), name = "streamdal.update_notification")]
    async fn update_notification(&self, config: NotificationConfig) -> Result<(), ProviderError> {
        let resp = self
            .client()
            .update_notification(UpdateNotificationRequest {
                notification: Some(config),
            })
            .await?
            .into_inner();
        check_response(resp)?;
        info!("Notification config updated");
        Ok(())
    }

    #[instrument(skip(self), name = "streamdal.delete_notification")]
    async fn delete_notification(&self, id: &str) -> Result<(), ProviderError> {
        let resp = self
            .client()
            .delete_notification(DeleteNotificationRequest {
                notification_id: id.to_string(),
            })
            .await?
            .into_inner();
        check_response(resp)?;
        info!("Notification config deleted");
        Ok(())
    }

    #[instrument(skip(self, audience), fields(audience = %crate::audience::to_id(&audience)), name = "streamdal.create_audience")]
    async fn create_audience(&self, audience: Audience) -> Result<(), ProviderError> {
        let resp = self
            .client()
            .create_audience(CreateAudienceRequest {
                audience: Some(audience),
            })
            .await?
            .into_inner();
        check_response(resp)?;
        info!("Audience created");
        Ok(())
    }

    #[instrument(skip(self, audience), fields(audience = %crate::audience::to_id(&audience)), name = "streamdal.delete_audience")]
    async fn delete_audience(&self, audience: Audience, force: bool) -> Result<(), ProviderError> {
        let resp = self
            .client()
            .delete_audience(DeleteAudienceRequest {
                audience: Some(audience),
                force: Some(force),
            })
            .await?
            .into_inner();
        check_response(resp)?;
        info!("Audience deleted");
        Ok(())
    }
}
