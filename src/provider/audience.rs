//! `streamdal_audience` operations.
//!
//! An audience has no server-side id; its identifier string doubles as the
//! resource id. Only `pipeline_ids` can change in place.

use serde_json::{json, Value};
use tracing::info;

use super::state_id;
use crate::audience::{from_id, parse_operation_type, to_id};
use crate::client::lookup::{get_audience, pipelines_for_audience};
use crate::client::StreamdalApi;
use crate::enums::ProtoEnum;
use crate::error::ProviderError;
use crate::fields::Fields;
use crate::proto::streamdal::{Audience, OperationType};

fn from_config(config: &Value) -> Result<(Audience, Vec<String>), ProviderError> {
    let fields = Fields::root(config)?;

    let raw_type = fields.str("operation_type")?;
    let operation_type = parse_operation_type(&raw_type)
        .filter(|t| *t != OperationType::Unset)
        .ok_or_else(|| ProviderError::InvalidEnum {
            kind: OperationType::KIND,
            value: raw_type.clone(),
            attribute: fields.path_of("operation_type"),
            allowed: vec!["consumer".to_string(), "producer".to_string()],
        })?;

    // Audience identity is case-insensitive; keep state in the id's case.
    let audience = Audience {
        service_name: fields.str("service_name")?.to_lowercase(),
        component_name: fields.str("component_name")?.to_lowercase(),
        operation_type: operation_type as i32,
        operation_name: fields.str("operation_name")?.to_lowercase(),
    };
    Ok((audience, fields.strings("pipeline_ids")?))
}

fn to_state(audience: &Audience, pipeline_ids: &[String]) -> Value {
    json!({
        "id": to_id(audience),
        "service_name": audience.service_name,
        "component_name": audience.component_name,
        "operation_name": audience.operation_name,
        "operation_type": audience.operation_type().name(),
        "pipeline_ids": pipeline_ids,
    })
}

/// Configuration as it will read back from the server.
pub(super) fn canonical(config: &Value) -> Result<Value, ProviderError> {
    let (audience, pipeline_ids) = from_config(config)?;
    Ok(to_state(&audience, &pipeline_ids))
}

fn prior_pipeline_ids(state: &Value) -> Vec<String> {
    Fields::root(state)
        .and_then(|f| f.strings("pipeline_ids"))
        .unwrap_or_default()
}

pub(super) async fn create(api: &dyn StreamdalApi, planned: &Value) -> Result<Value, ProviderError> {
    let (audience, pipeline_ids) = from_config(planned)?;
    let id = to_id(&audience);

    api.create_audience(audience.clone()).await?;
    info!(id = %id, "Created audience");

    if !pipeline_ids.is_empty() {
        api.set_pipelines(audience.clone(), pipeline_ids.clone()).await?;
        info!(id = %id, pipelines = ?pipeline_ids, "Attached pipelines");
    }

    Ok(to_state(&audience, &pipeline_ids))
}

pub(super) async fn read(api: &dyn StreamdalApi, state: &Value) -> Result<Value, ProviderError> {
    let id = state_id(state)?;
    let audience = get_audience(api, &id).await?;
    let attached = pipelines_for_audience(api, &audience).await?;

    // Attachment order is not reported back, so keep the configured order
    // while the set is unchanged.
    let prior = prior_pipeline_ids(state);
    let mut sorted = prior.clone();
    sorted.sort();
    let pipeline_ids = if sorted == attached { prior } else { attached };

    Ok(to_state(&audience, &pipeline_ids))
}

pub(super) async fn update(
    api: &dyn StreamdalApi,
    prior: &Value,
    planned: &Value,
) -> Result<Value, ProviderError> {
    let (audience, pipeline_ids) = from_config(planned)?;

    let id = state_id(prior)?;
    if id != to_id(&audience) {
        return Err(ProviderError::Validation(format!(
            "audience '{}' cannot be changed to '{}' in place",
            id,
            to_id(&audience)
        )));
    }

    api.set_pipelines(audience.clone(), pipeline_ids.clone()).await?;
    info!(id = %id, pipelines = ?pipeline_ids, "Attached pipelines");

    Ok(to_state(&audience, &pipeline_ids))
}

pub(super) async fn delete(api: &dyn StreamdalApi, state: &Value) -> Result<(), ProviderError> {
    let id = state_id(state)?;
    let audience = from_id(&id).ok_or_else(|| ProviderError::InvalidId {
        kind: "audience",
        id: id.clone(),
    })?;

    // Pipelines this resource attached go with it.
    let force = !prior_pipeline_ids(state).is_empty();
    api.delete_audience(audience, force).await?;
    info!(id = %id, force, "Deleted audience");
    Ok(())
}

pub(super) async fn import(api: &dyn StreamdalApi, id: &str) -> Result<Value, ProviderError> {
    let audience = get_audience(api, id).await?;
    let attached = pipelines_for_audience(api, &audience).await?;
    Ok(to_state(&audience, &attached))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::proto::streamdal::Pipeline;
    use crate::provider::{StreamdalProvider, AUDIENCE};
    use crate::testing::{assert_plan_no_changes, MemoryStreamdal, ProviderTester};

    fn setup() -> (Arc<MemoryStreamdal>, ProviderTester<StreamdalProvider>) {
        let api = Arc::new(MemoryStreamdal::new());
        let tester = ProviderTester::new(StreamdalProvider::with_api(api.clone()));
        (api, tester)
    }

    fn config(pipeline_ids: Value) -> Value {
        json!({
            "service_name": "billing",
            "component_name": "kafka",
            "operation_name": "orders",
            "operation_type": "consumer",
            "pipeline_ids": pipeline_ids,
        })
    }

    async fn pipelines(api: &MemoryStreamdal, n: usize) -> Vec<String> {
        let mut ids = Vec::new();
        for _ in 0..n {
            ids.push(api.create_pipeline(Pipeline::default()).await.unwrap());
        }
        ids
    }

    #[test]
    fn test_from_config_rejects_unset_operation_type() {
        let mut cfg = config(json!([]));
        cfg["operation_type"] = json!("unset");
        let err = from_config(&cfg).unwrap_err();
        assert_eq!(err.attribute(), Some("operation_type"));
        assert!(err.to_string().contains("consumer, producer"));
    }

    #[tokio::test]
    async fn test_create_without_pipelines() {
        let (api, tester) = setup();
        let state = tester.lifecycle_create(AUDIENCE, config(json!([]))).await.unwrap();

        assert_eq!(state["id"], "billing:operation_type_consumer:orders:kafka");
        assert_eq!(state["operation_type"], "consumer");
        assert_eq!(api.calls().await, vec!["CreateAudience", "GetAll", "GetAll"]);
    }

    #[tokio::test]
    async fn test_create_attaches_pipelines_in_order() {
        let (api, tester) = setup();
        let ids = pipelines(&api, 2).await;
        let ordered = json!([ids[1], ids[0]]);

        let state = tester.lifecycle_create(AUDIENCE, config(ordered.clone())).await.unwrap();
        assert_eq!(state["pipeline_ids"], ordered);

        let (audience, _) = from_config(&config(json!([]))).unwrap();
        assert_eq!(api.attached(&audience).await, vec![ids[1].clone(), ids[0].clone()]);
    }

    #[tokio::test]
    async fn test_update_pipeline_ids() {
        let (api, tester) = setup();
        let ids = pipelines(&api, 2).await;
        let created = tester
            .lifecycle_create(AUDIENCE, config(json!([ids[0]])))
            .await
            .unwrap();

        let updated = tester
            .lifecycle_update(AUDIENCE, created.clone(), config(json!([ids[0], ids[1]])))
            .await
            .unwrap();
        assert_eq!(updated["pipeline_ids"], json!([ids[0], ids[1]]));

        let cleared = tester
            .lifecycle_update(AUDIENCE, updated, config(json!([])))
            .await
            .unwrap();
        assert_eq!(cleared["pipeline_ids"], json!([]));
    }

    #[tokio::test]
    async fn test_update_refuses_identity_change() {
        let (_, tester) = setup();
        let created = tester.lifecycle_create(AUDIENCE, config(json!([]))).await.unwrap();

        let mut changed = config(json!([]));
        changed["service_name"] = json!("shipping");
        let err = tester.update(AUDIENCE, created, changed).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_read_reports_detached_pipelines() {
        let (api, tester) = setup();
        let ids = pipelines(&api, 2).await;
        let created = tester
            .lifecycle_create(AUDIENCE, config(json!([ids[1], ids[0]])))
            .await
            .unwrap();

        api.delete_pipeline(&ids[1]).await.unwrap();
        let refreshed = tester.read(AUDIENCE, created).await.unwrap();
        assert_eq!(refreshed["pipeline_ids"], json!([ids[0]]));
    }

    #[tokio::test]
    async fn test_delete_detaches_managed_pipelines() {
        let (api, tester) = setup();
        let ids = pipelines(&api, 1).await;
        let created = tester
            .lifecycle_create(AUDIENCE, config(json!(ids)))
            .await
            .unwrap();

        tester.delete(AUDIENCE, created.clone()).await.unwrap();
        assert!(api.audiences().await.is_empty());
        assert!(tester.read(AUDIENCE, created).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_rejects_malformed_id() {
        let (_, tester) = setup();
        let err = tester
            .delete(AUDIENCE, json!({"id": "billing:orders"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid audience id 'billing:orders'");
    }

    #[tokio::test]
    async fn test_import() {
        let (api, tester) = setup();
        let ids = pipelines(&api, 1).await;
        tester
            .lifecycle_create(AUDIENCE, config(json!(ids)))
            .await
            .unwrap();

        let imported = tester
            .import_resource(AUDIENCE, "billing:consumer:orders:kafka")
            .await
            .unwrap();
        assert_eq!(imported[0].state["pipeline_ids"], json!(ids));
        assert_eq!(imported[0].state["service_name"], "billing");
    }

    #[tokio::test]
    async fn test_mixed_case_config_plans_no_changes() {
        let (api, tester) = setup();
        let mut cfg = config(json!([]));
        cfg["service_name"] = json!("Billing");
        cfg["operation_name"] = json!("ORDERS");

        let state = tester.lifecycle_create(AUDIENCE, cfg.clone()).await.unwrap();
        assert_eq!(state["service_name"], "billing");
        assert_eq!(state["operation_name"], "orders");
        assert_eq!(api.audiences().await[0].service_name, "billing");

        let plan = tester.plan_update(AUDIENCE, state, cfg).await.unwrap();
        assert_plan_no_changes(&plan);
    }

    #[test]
    fn test_same_audience_regardless_of_case() {
        let (upper, _) = from_config(&json!({
            "service_name": "Billing",
            "component_name": "Kafka",
            "operation_name": "Orders",
            "operation_type": "CONSUMER",
        }))
        .unwrap();
        let (lower, _) = from_config(&config(json!([]))).unwrap();
        assert!(crate::audience::same(&upper, &lower));
    }
}
