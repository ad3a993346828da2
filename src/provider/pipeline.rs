//! `streamdal_pipeline` operations.

use serde_json::Value;
use tracing::info;

use super::state_id;
use crate::builder::{build_pipeline, pipeline_to_state};
use crate::client::StreamdalApi;
use crate::error::ProviderError;

pub(super) async fn create(api: &dyn StreamdalApi, planned: &Value) -> Result<Value, ProviderError> {
    let mut pipeline = build_pipeline(planned)?;
    pipeline.id.clear();

    let id = api.create_pipeline(pipeline.clone()).await?;
    info!(id = %id, name = %pipeline.name, "Created pipeline");

    pipeline.id = id;
    Ok(pipeline_to_state(&pipeline))
}

pub(super) async fn read(api: &dyn StreamdalApi, state: &Value) -> Result<Value, ProviderError> {
    import(api, &state_id(state)?).await
}

pub(super) async fn update(
    api: &dyn StreamdalApi,
    prior: &Value,
    planned: &Value,
) -> Result<Value, ProviderError> {
    let mut pipeline = build_pipeline(planned)?;
    pipeline.id = state_id(prior)?;

    api.update_pipeline(pipeline.clone()).await?;
    info!(id = %pipeline.id, "Updated pipeline");

    Ok(pipeline_to_state(&pipeline))
}

pub(super) async fn delete(api: &dyn StreamdalApi, state: &Value) -> Result<(), ProviderError> {
    let id = state_id(state)?;
    api.delete_pipeline(&id).await?;
    info!(id = %id, "Deleted pipeline");
    Ok(())
}

pub(super) async fn import(api: &dyn StreamdalApi, id: &str) -> Result<Value, ProviderError> {
    let mut pipeline = api.get_pipeline(id).await?;
    if pipeline.id.is_empty() {
        pipeline.id = id.to_string();
    }
    Ok(pipeline_to_state(&pipeline))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tonic::Code;

    use crate::proto::streamdal::{pipeline_step, DetectiveType};
    use crate::provider::{StreamdalProvider, PIPELINE};
    use crate::testing::{MemoryStreamdal, ProviderTester};

    fn setup() -> (Arc<MemoryStreamdal>, ProviderTester<StreamdalProvider>) {
        let api = Arc::new(MemoryStreamdal::new());
        let tester = ProviderTester::new(StreamdalProvider::with_api(api.clone()));
        (api, tester)
    }

    fn config(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "step": [{
                "name": "find email",
                "detective": {"type": "pii_email", "path": "user.email"},
                "on_true": {"abort": "abort_current"},
            }],
        })
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let (api, tester) = setup();
        let state = tester.lifecycle_create(PIPELINE, config("pii")).await.unwrap();

        assert_eq!(state["id"], "pipeline-1");
        assert_eq!(state["name"], "pii");
        assert_eq!(state["step"][0]["detective"]["type"], "pii_email");
        assert_eq!(state["step"][0]["on_true"]["abort"], "abort_current");

        let stored = api.pipeline("pipeline-1").await.unwrap();
        let Some(pipeline_step::Step::Detective(d)) = &stored.steps[0].step else {
            panic!("expected detective step");
        };
        assert_eq!(d.r#type(), DetectiveType::PiiEmail);
        assert_eq!(api.calls().await, vec!["CreatePipeline", "GetPipeline"]);
    }

    #[tokio::test]
    async fn test_update_keeps_id() {
        let (api, tester) = setup();
        let created = tester.lifecycle_create(PIPELINE, config("pii")).await.unwrap();

        let mut changed = config("pii-v2");
        changed["paused"] = json!(true);
        let updated = tester
            .lifecycle_update(PIPELINE, created, changed)
            .await
            .unwrap();

        assert_eq!(updated["id"], "pipeline-1");
        assert_eq!(updated["name"], "pii-v2");
        assert_eq!(updated["paused"], true);
        assert_eq!(api.pipeline("pipeline-1").await.unwrap().paused, Some(true));
    }

    #[tokio::test]
    async fn test_delete() {
        let (api, tester) = setup();
        let state = tester.lifecycle_create(PIPELINE, config("pii")).await.unwrap();

        tester.delete(PIPELINE, state.clone()).await.unwrap();
        assert!(api.pipeline("pipeline-1").await.is_none());

        let err = tester.read(PIPELINE, state).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_server_errors_pass_through() {
        let (api, tester) = setup();
        api.fail("CreatePipeline", Code::PermissionDenied, "token lacks write access")
            .await;

        let err = tester.create(PIPELINE, config("pii")).await.unwrap_err();
        assert_eq!(err.to_string(), "token lacks write access");
    }

    #[tokio::test]
    async fn test_invalid_config_makes_no_call() {
        let (api, tester) = setup();
        let err = tester
            .create(PIPELINE, json!({"name": "pii", "step": [{"name": "empty"}]}))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("step must define one of"));
        assert!(api.calls().await.is_empty());
    }
}
