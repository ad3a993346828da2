//! Planning.
//!
//! Proposed configuration is run through the builders and back into state
//! before it is compared with prior state, so defaults are filled in, enum
//! names are normalized and configuration errors surface at plan time.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use super::{audience, Kind};
use crate::builder::{build_notification, build_pipeline, notification_to_state, pipeline_to_state};
use crate::error::ProviderError;
use crate::types::{AttributeChange, PlanResult};

pub(super) fn plan(
    kind: Kind,
    prior: Option<Value>,
    proposed: Value,
) -> Result<PlanResult, ProviderError> {
    let prior = prior.filter(|v| !v.is_null());

    if proposed.is_null() {
        let changes = diff(prior.as_ref(), &Value::Null);
        return Ok(PlanResult::with_changes(Value::Null, changes, false));
    }

    let mut planned = canonical(kind, &proposed)?;

    // Pipeline and notification ids are assigned by the server on create.
    if kind != Kind::Audience {
        if let Value::Object(map) = &mut planned {
            match prior.as_ref().and_then(|p| p.get("id")).filter(|id| !id.is_null()) {
                Some(id) => {
                    map.insert("id".to_string(), id.clone());
                },
                None => {
                    map.remove("id");
                },
            }
        }
    }

    let changes = diff(prior.as_ref(), &planned);
    let requires_replace = prior.is_some() && {
        let forced = force_new(kind);
        changes.iter().any(|c| forced.contains(&c.path))
    };

    Ok(PlanResult::with_changes(planned, changes, requires_replace))
}

/// Configuration as it will read back from the server.
fn canonical(kind: Kind, config: &Value) -> Result<Value, ProviderError> {
    match kind {
        Kind::Pipeline => Ok(pipeline_to_state(&build_pipeline(config)?)),
        Kind::Notification => Ok(notification_to_state(&build_notification(config)?)),
        Kind::Audience => audience::canonical(config),
    }
}

fn force_new(kind: Kind) -> BTreeSet<String> {
    kind.resource_schema()
        .block
        .attributes
        .into_iter()
        .filter(|(_, attr)| attr.force_new)
        .map(|(name, _)| name)
        .collect()
}

/// Per top-level attribute changes. Null counts as absent.
fn diff(prior: Option<&Value>, planned: &Value) -> Vec<AttributeChange> {
    let empty = Map::new();
    let before = prior.and_then(Value::as_object).unwrap_or(&empty);
    let after = planned.as_object().unwrap_or(&empty);

    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    keys.into_iter()
        .filter_map(|key| {
            let old = before.get(key).filter(|v| !v.is_null());
            let new = after.get(key).filter(|v| !v.is_null());
            match (old, new) {
                (None, Some(new)) => Some(AttributeChange::added(key.clone(), new.clone())),
                (Some(old), None) => Some(AttributeChange::removed(key.clone(), old.clone())),
                (Some(old), Some(new)) if old != new => {
                    Some(AttributeChange::modified(key.clone(), old.clone(), new.clone()))
                },
                _ => None,
            }
        })
        .collect()
}
