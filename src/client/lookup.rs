//! Lookups composed from several Streamdal calls.
//!
//! Data sources select objects by filtering a flat record per object; the
//! record shapes here are the attribute sets those data sources return.

use serde_json::{json, Value};
use tracing::debug;

use super::StreamdalApi;
use crate::audience;
use crate::enums::ProtoEnum;
use crate::error::ProviderError;
use crate::filter::{select_one, Filter, Record};
use crate::proto::streamdal::{Audience, NotificationConfig, Pipeline};

/// Find a registered audience by its identifier string.
pub async fn get_audience(api: &dyn StreamdalApi, id: &str) -> Result<Audience, ProviderError> {
    let wanted = audience::from_id(id).ok_or_else(|| ProviderError::InvalidId {
        kind: "audience",
        id: id.to_string(),
    })?;

    let all = api.get_all().await?;
    all.audiences
        .into_iter()
        .find(|a| audience::same(a, &wanted))
        .ok_or_else(|| ProviderError::NotFound(format!("audience '{}'", id)))
}

/// Ids of the pipelines attached to `audience`, sorted.
pub async fn pipelines_for_audience(
    api: &dyn StreamdalApi,
    audience: &Audience,
) -> Result<Vec<String>, ProviderError> {
    let all = api.get_all().await?;
    let mut ids: Vec<String> = all
        .pipelines
        .into_iter()
        .filter(|(_, info)| audience::contains(&info.audiences, audience))
        .map(|(id, _)| id)
        .collect();
    ids.sort();

    debug!(audience = %audience::to_id(audience), pipelines = ids.len(), "Resolved attached pipelines");
    Ok(ids)
}

/// Select exactly one pipeline matching `filters`.
pub async fn find_pipeline(
    api: &dyn StreamdalApi,
    filters: &[Filter],
) -> Result<Pipeline, ProviderError> {
    if filters.is_empty() {
        return Err(ProviderError::NoFilters);
    }

    let pipelines = api.get_pipelines().await?;
    let records: Vec<Record> = pipelines.iter().map(pipeline_record).collect();
    let index = pick(records, filters, "pipeline")?;
    Ok(pipelines.into_iter().nth(index).unwrap_or_default())
}

/// Select exactly one notification config matching `filters`.
pub async fn find_notification(
    api: &dyn StreamdalApi,
    filters: &[Filter],
) -> Result<NotificationConfig, ProviderError> {
    if filters.is_empty() {
        return Err(ProviderError::NoFilters);
    }

    let mut configs: Vec<(String, NotificationConfig)> =
        api.get_notifications().await?.into_iter().collect();
    configs.sort_by(|a, b| a.0.cmp(&b.0));

    let records: Vec<Record> = configs
        .iter()
        .map(|(id, config)| notification_record(id, config))
        .collect();
    let index = pick(records, filters, "notification config")?;

    let (id, mut config) = configs.into_iter().nth(index).unwrap_or_default();
    config.id.get_or_insert(id);
    Ok(config)
}

/// Select exactly one audience matching `filters`.
pub async fn find_audience(
    api: &dyn StreamdalApi,
    filters: &[Filter],
) -> Result<Audience, ProviderError> {
    if filters.is_empty() {
        return Err(ProviderError::NoFilters);
    }

    let audiences = api.get_all().await?.audiences;
    let records: Vec<Record> = audiences.iter().map(audience_record).collect();
    let index = pick(records, filters, "audience")?;
    Ok(audiences.into_iter().nth(index).unwrap_or_default())
}

/// Index of the single record matching `filters`.
fn pick(records: Vec<Record>, filters: &[Filter], what: &str) -> Result<usize, ProviderError> {
    let chosen = select_one(records.clone(), filters, what)?;
    records
        .iter()
        .position(|r| *r == chosen)
        .ok_or_else(|| ProviderError::NotFound(what.to_string()))
}

/// Filterable attributes of a pipeline.
pub fn pipeline_record(pipeline: &Pipeline) -> Record {
    record(json!({
        "id": pipeline.id,
        "name": pipeline.name,
        "paused": pipeline.paused.unwrap_or(false),
    }))
}

/// Filterable attributes of a notification config stored under `id`.
pub fn notification_record(id: &str, config: &NotificationConfig) -> Record {
    record(json!({
        "id": id,
        "name": config.name,
        "type": config.r#type().name(),
    }))
}

/// Filterable attributes of an audience.
pub fn audience_record(audience: &Audience) -> Record {
    record(json!({
        "service_name": audience.service_name,
        "component_name": audience.component_name,
        "operation_name": audience.operation_name,
        "operation_type": audience.operation_type().name(),
    }))
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::streamdal::{NotificationType, OperationType};
    use crate::testing::MemoryStreamdal;

    fn aud(service: &str, op_type: OperationType) -> Audience {
        Audience {
            service_name: service.to_string(),
            component_name: "kafka".to_string(),
            operation_type: op_type as i32,
            operation_name: "orders".to_string(),
        }
    }

    fn pipeline(name: &str) -> Pipeline {
        Pipeline {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_audience() {
        let api = MemoryStreamdal::new();
        api.create_audience(aud("billing", OperationType::Consumer))
            .await
            .unwrap();

        let found = get_audience(&api, "BILLING:consumer:orders:kafka").await.unwrap();
        assert_eq!(found.service_name, "billing");

        let err = get_audience(&api, "billing:producer:orders:kafka")
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = get_audience(&api, "billing:orders").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidId { kind: "audience", .. }));
    }

    #[tokio::test]
    async fn test_pipelines_for_audience() {
        let api = MemoryStreamdal::new();
        let consumer = aud("billing", OperationType::Consumer);
        let producer = aud("billing", OperationType::Producer);

        let a = api.create_pipeline(pipeline("a")).await.unwrap();
        let b = api.create_pipeline(pipeline("b")).await.unwrap();
        let c = api.create_pipeline(pipeline("c")).await.unwrap();
        api.set_pipelines(consumer.clone(), vec![c.clone(), a.clone()])
            .await
            .unwrap();
        api.set_pipelines(producer.clone(), vec![b.clone()])
            .await
            .unwrap();

        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(pipelines_for_audience(&api, &consumer).await.unwrap(), expected);
        assert_eq!(pipelines_for_audience(&api, &producer).await.unwrap(), vec![b]);
    }

    #[tokio::test]
    async fn test_find_pipeline() {
        let api = MemoryStreamdal::new();
        api.create_pipeline(pipeline("prod-ingest")).await.unwrap();
        let id = api.create_pipeline(pipeline("dev-ingest")).await.unwrap();

        let found = find_pipeline(&api, &[Filter::new("name", ["dev-*"])])
            .await
            .unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.name, "dev-ingest");

        let err = find_pipeline(&api, &[Filter::new("name", ["*-ingest"])])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Filter returned more than one pipeline");

        let err = find_pipeline(&api, &[]).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoFilters));
        assert_eq!(api.calls().await, vec!["CreatePipeline", "CreatePipeline", "GetPipelines", "GetPipelines"]);
    }

    #[tokio::test]
    async fn test_find_notification_fills_id() {
        let api = MemoryStreamdal::new();
        let created = api
            .create_notification(NotificationConfig {
                name: "ops-alerts".to_string(),
                r#type: NotificationType::Slack as i32,
                ..Default::default()
            })
            .await
            .unwrap();

        let found = find_notification(&api, &[Filter::new("type", ["slack"])])
            .await
            .unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.name, "ops-alerts");

        let err = find_notification(&api, &[Filter::new("type", ["email"])])
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_audience_by_operation_type() {
        let api = MemoryStreamdal::new();
        api.create_audience(aud("billing", OperationType::Consumer))
            .await
            .unwrap();
        api.create_audience(aud("billing", OperationType::Producer))
            .await
            .unwrap();

        let found = find_audience(
            &api,
            &[Filter::new("operation_type", ["producer"])],
        )
        .await
        .unwrap();
        assert_eq!(found.operation_type(), OperationType::Producer);

        let err = find_audience(&api, &[Filter::new("topic", ["orders"])])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "topic is not a valid key");
    }

    #[test]
    fn test_record_shapes() {
        let rec = pipeline_record(&Pipeline {
            id: "p1".to_string(),
            name: "n".to_string(),
            paused: None,
            ..Default::default()
        });
        assert_eq!(rec["paused"], false);

        let rec = audience_record(&aud("svc", OperationType::Consumer));
        assert_eq!(rec["operation_type"], "consumer");
        assert_eq!(rec.len(), 4);
    }
}
