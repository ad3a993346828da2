//! Access to the Streamdal external API.
//!
//! [`StreamdalApi`] is the seam between provider logic and the wire: the
//! provider only ever talks to a `dyn StreamdalApi`, [`GrpcStreamdal`]
//! implements it over tonic, and tests substitute an in-memory server.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::enums::ProtoEnum;
use crate::error::ProviderError;
use crate::proto::streamdal::{
    Audience, GetAllResponse, NotificationConfig, Pipeline, ResponseCode, StandardResponse,
};

pub mod grpc;
pub mod lookup;

pub use grpc::{AuthInterceptor, GrpcStreamdal, AUTH_TOKEN_HEADER};

/// The Streamdal calls the provider makes.
#[async_trait]
pub trait StreamdalApi: Send + Sync {
    /// Every audience and every pipeline with its attachments.
    async fn get_all(&self) -> Result<GetAllResponse, ProviderError>;

    /// Every pipeline.
    async fn get_pipelines(&self) -> Result<Vec<Pipeline>, ProviderError>;

    /// One pipeline by id.
    async fn get_pipeline(&self, id: &str) -> Result<Pipeline, ProviderError>;

    /// Create a pipeline, returning the server-assigned id.
    async fn create_pipeline(&self, pipeline: Pipeline) -> Result<String, ProviderError>;

    /// Replace a pipeline. `pipeline.id` selects the target.
    async fn update_pipeline(&self, pipeline: Pipeline) -> Result<(), ProviderError>;

    /// Delete a pipeline.
    async fn delete_pipeline(&self, id: &str) -> Result<(), ProviderError>;

    /// Set the ordered list of pipelines attached to an audience.
    async fn set_pipelines(
        &self,
        audience: Audience,
        pipeline_ids: Vec<String>,
    ) -> Result<(), ProviderError>;

    /// Every notification config, keyed by id.
    async fn get_notifications(&self) -> Result<HashMap<String, NotificationConfig>, ProviderError>;

    /// One notification config by id.
    async fn get_notification(&self, id: &str) -> Result<NotificationConfig, ProviderError>;

    /// Create a notification config, returning it with its id.
    async fn create_notification(
        &self,
        config: NotificationConfig,
    ) -> Result<NotificationConfig, ProviderError>;

    /// Replace a notification config. `config.id` selects the target.
    async fn update_notification(&self, config: NotificationConfig) -> Result<(), ProviderError>;

    /// Delete a notification config.
    async fn delete_notification(&self, id: &str) -> Result<(), ProviderError>;

    /// Register an audience.
    async fn create_audience(&self, audience: Audience) -> Result<(), ProviderError>;

    /// Remove an audience, detaching its pipelines when `force` is set.
    async fn delete_audience(&self, audience: Audience, force: bool) -> Result<(), ProviderError>;
}

/// Turn a non-OK `StandardResponse` into an error.
pub fn check_response(resp: StandardResponse) -> Result<(), ProviderError> {
    match resp.code() {
        ResponseCode::Ok => Ok(()),
        ResponseCode::NotFound => Err(ProviderError::NotFound(resp.message)),
        code => Err(ProviderError::Server {
            code: code.name(),
            message: resp.message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: ResponseCode, message: &str) -> StandardResponse {
        StandardResponse {
            id: "req-1".to_string(),
            code: code as i32,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_ok_response() {
        assert!(check_response(response(ResponseCode::Ok, "")).is_ok());
    }

    #[test]
    fn test_not_found_response() {
        let err = check_response(response(ResponseCode::NotFound, "no such pipeline")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_error_responses() {
        let err = check_response(response(ResponseCode::BadRequest, "bad step")).unwrap_err();
        assert_eq!(err.to_string(), "Server error (bad_request): bad step");

        let err = check_response(response(ResponseCode::Unset, "")).unwrap_err();
        assert!(matches!(err, ProviderError::Server { .. }));
    }
}
