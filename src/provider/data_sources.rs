//! Data sources: select exactly one object with `filter` blocks.
//!
//! ```text
//! data "streamdal_pipeline" "ingest" {
//!   filter {
//!     name   = "name"
//!     values = ["prod-*"]
//!   }
//! }
//! ```

use serde_json::Value;
use tracing::debug;

use super::Kind;
use crate::client::lookup::{
    audience_record, find_audience, find_notification, find_pipeline, notification_record,
    pipeline_record,
};
use crate::client::StreamdalApi;
use crate::error::ProviderError;
use crate::fields::Fields;
use crate::filter::Filter;

fn parse_filters(config: &Value) -> Result<Vec<Filter>, ProviderError> {
    let fields = Fields::root(config)?;
    fields
        .blocks("filter")?
        .iter()
        .map(|block| {
            let filter = block.fields()?;
            Ok(Filter::new(filter.str("name")?, filter.strings("values")?))
        })
        .collect()
}

pub(super) async fn read(
    kind: Kind,
    api: &dyn StreamdalApi,
    config: &Value,
) -> Result<Value, ProviderError> {
    let filters = parse_filters(config)?;

    let mut record = match kind {
        Kind::Pipeline => pipeline_record(&find_pipeline(api, &filters).await?),
        Kind::Notification => {
            let found = find_notification(api, &filters).await?;
            notification_record(found.id.as_deref().unwrap_or_default(), &found)
        },
        Kind::Audience => audience_record(&find_audience(api, &filters).await?),
    };
    debug!(data_source = kind.name(), record = ?record, "Selected record");

    if let Some(filter) = config.get("filter") {
        record.insert("filter".to_string(), filter.clone());
    }
    Ok(Value::Object(record))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::proto::streamdal::{Audience, NotificationConfig, NotificationType, OperationType, Pipeline};
    use crate::provider::{StreamdalProvider, AUDIENCE, NOTIFICATION, PIPELINE};
    use crate::testing::{MemoryStreamdal, ProviderTester};

    async fn seeded() -> (Arc<MemoryStreamdal>, ProviderTester<StreamdalProvider>) {
        let api = Arc::new(MemoryStreamdal::new());
        for name in ["prod-svc", "dev-svc"] {
            api.create_pipeline(Pipeline {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        }
        api.create_notification(NotificationConfig {
            name: "ops".to_string(),
            r#type: NotificationType::Email as i32,
            ..Default::default()
        })
        .await
        .unwrap();
        api.create_audience(Audience {
            service_name: "billing".to_string(),
            component_name: "kafka".to_string(),
            operation_type: OperationType::Producer as i32,
            operation_name: "orders".to_string(),
        })
        .await
        .unwrap();
        api.clear_calls().await;

        let tester = ProviderTester::new(StreamdalProvider::with_api(api.clone()));
        (api, tester)
    }

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(&json!({
            "filter": [
                {"name": "name", "values": ["prod-*", "dev-*"]},
                {"name": "paused", "values": ["false"]},
            ],
        }))
        .unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0], Filter::new("name", ["prod-*", "dev-*"]));

        let err = parse_filters(&json!({"filter": [{"values": ["x"]}]})).unwrap_err();
        assert_eq!(err.attribute(), Some("filter.0.name"));
    }

    #[tokio::test]
    async fn test_pipeline_wildcard() {
        let (_, tester) = seeded().await;
        let filter = json!([{"name": "name", "values": ["prod-*"]}]);

        let state = tester
            .read_data_source(PIPELINE, json!({"filter": filter}))
            .await
            .unwrap();
        assert_eq!(state["name"], "prod-svc");
        assert_eq!(state["id"], "pipeline-1");
        assert_eq!(state["paused"], false);
        assert_eq!(state["filter"], filter);
    }

    #[tokio::test]
    async fn test_ambiguous_and_missing() {
        let (_, tester) = seeded().await;

        let err = tester
            .read_data_source(PIPELINE, json!({"filter": [{"name": "name", "values": ["*-svc"]}]}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AmbiguousFilter(_)));

        let err = tester
            .read_data_source(PIPELINE, json!({"filter": [{"name": "name", "values": ["qa-*"]}]}))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_no_filters_makes_no_call() {
        let (api, tester) = seeded().await;
        let err = tester
            .read_data_source(NOTIFICATION, json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NoFilters));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_notification_and_audience() {
        let (_, tester) = seeded().await;

        let state = tester
            .read_data_source(NOTIFICATION, json!({"filter": [{"name": "type", "values": ["email"]}]}))
            .await
            .unwrap();
        assert_eq!(state["id"], "notification-3");
        assert_eq!(state["name"], "ops");

        let state = tester
            .read_data_source(
                AUDIENCE,
                json!({"filter": [{"name": "service_name", "values": ["bill*"]}]}),
            )
            .await
            .unwrap();
        assert_eq!(state["operation_type"], "producer");
        assert_eq!(state["component_name"], "kafka");
    }
}
