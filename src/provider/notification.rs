//! `streamdal_notification` operations.
//!
//! The server may redact secrets when a notification config is read back,
//! so Read only refreshes `id`, `name` and `type` and keeps the nested
//! configuration blocks from prior state.

use serde_json::Value;
use tracing::info;

use super::state_id;
use crate::builder::notification::CONFIG_BLOCKS;
use crate::builder::{build_notification, notification_to_state};
use crate::client::StreamdalApi;
use crate::error::ProviderError;

pub(super) async fn create(api: &dyn StreamdalApi, planned: &Value) -> Result<Value, ProviderError> {
    let mut config = build_notification(planned)?;
    config.id = None;

    let created = api.create_notification(config.clone()).await?;
    let id = created
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::Server {
            code: "generic_error".to_string(),
            message: "server did not assign a notification config id".to_string(),
        })?;
    info!(id = %id, name = %config.name, "Created notification config");

    config.id = Some(id);
    Ok(notification_to_state(&config))
}

pub(super) async fn read(api: &dyn StreamdalApi, state: &Value) -> Result<Value, ProviderError> {
    let id = state_id(state)?;
    let mut refreshed = import(api, &id).await?;

    if let Value::Object(out) = &mut refreshed {
        for block in CONFIG_BLOCKS {
            out.remove(block);
            if let Some(prior) = state.get(block).filter(|v| !v.is_null()) {
                out.insert(block.to_string(), prior.clone());
            }
        }
    }

    Ok(refreshed)
}

pub(super) async fn update(
    api: &dyn StreamdalApi,
    prior: &Value,
    planned: &Value,
) -> Result<Value, ProviderError> {
    let mut config = build_notification(planned)?;
    config.id = Some(state_id(prior)?);

    api.update_notification(config.clone()).await?;
    info!(id = ?config.id, "Updated notification config");

    Ok(notification_to_state(&config))
}

pub(super) async fn delete(api: &dyn StreamdalApi, state: &Value) -> Result<(), ProviderError> {
    let id = state_id(state)?;
    api.delete_notification(&id).await?;
    info!(id = %id, "Deleted notification config");
    Ok(())
}

pub(super) async fn import(api: &dyn StreamdalApi, id: &str) -> Result<Value, ProviderError> {
    let mut config = api.get_notification(id).await?;
    config.id = Some(id.to_string());
    Ok(notification_to_state(&config))
}
