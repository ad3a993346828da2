//! Pipeline configuration to and from `protos::Pipeline`.
//!
//! A step is configured as a block with exactly one payload sub-block:
//!
//! ```text
//! step {
//!   name = "mask emails"
//!   on_true { abort = "abort_current" }
//!
//!   transform {
//!     type = "mask_value"
//!     mask { path = "user.email" }
//!   }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::enums::ProtoEnum;
use crate::error::ProviderError;
use crate::fields::{Fields, Nested};
use crate::proto::streamdal::{
    pipeline_step, pipeline_step_notification::PayloadType, schema_validation_step,
    transform_step, AbortCondition, DetectiveStep, DetectiveType, HttpRequest, HttpRequestMethod,
    HttpRequestStep, JsonSchemaDraft, KvAction, KvMode, KvStep, Pipeline, PipelineStep,
    PipelineStepConditions, PipelineStepNotification, SchemaValidationCondition,
    SchemaValidationJsonSchema, SchemaValidationStep, SchemaValidationType,
    TransformDeleteFieldOptions, TransformExtractOptions, TransformMaskOptions,
    TransformObfuscateOptions, TransformReplaceValueOptions, TransformStep,
    TransformTruncateOptions, TransformTruncateType, TransformType, ValidJsonStep,
};

/// Default mask character for `mask_value` transforms.
pub const DEFAULT_MASK: &str = "*";

/// The payload a step carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Inspect the payload.
    Detective,
    /// Rewrite the payload.
    Transform,
    /// Call out over HTTP.
    HttpRequest,
    /// Check that the payload is valid JSON.
    ValidJson,
    /// Validate the payload against a schema.
    SchemaValidation,
    /// Key/value store operation.
    Kv,
}

impl StepKind {
    /// Every step kind, in configuration order.
    pub const ALL: [StepKind; 6] = [
        StepKind::Detective,
        StepKind::Transform,
        StepKind::HttpRequest,
        StepKind::ValidJson,
        StepKind::SchemaValidation,
        StepKind::Kv,
    ];

    /// Name of the step's configuration block.
    pub fn block_name(self) -> &'static str {
        match self {
            StepKind::Detective => "detective",
            StepKind::Transform => "transform",
            StepKind::HttpRequest => "http_request",
            StepKind::ValidJson => "valid_json",
            StepKind::SchemaValidation => "schema_validation",
            StepKind::Kv => "kv",
        }
    }

    fn block_names() -> String {
        Self::ALL
            .iter()
            .map(|k| k.block_name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_name())
    }
}

impl FromStr for StepKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.block_name() == s)
            .ok_or_else(|| {
                ProviderError::Validation(format!(
                    "unknown step type '{}' (expected one of: {})",
                    s,
                    Self::block_names()
                ))
            })
    }
}

/// Configuration block holding the options of each transform type.
fn transform_block(kind: TransformType) -> Option<&'static str> {
    match kind {
        TransformType::ReplaceValue => Some("replace_value"),
        TransformType::DeleteField => Some("delete_field"),
        TransformType::ObfuscateValue => Some("obfuscate"),
        TransformType::MaskValue => Some("mask"),
        TransformType::TruncateValue => Some("truncate"),
        TransformType::Extract => Some("extract"),
        TransformType::Unknown => None,
    }
}

/// Build a pipeline from resource configuration or state.
pub fn build_pipeline(config: &Value) -> Result<Pipeline, ProviderError> {
    let fields = Fields::root(config)?;

    let steps = fields
        .blocks("step")?
        .iter()
        .map(build_step)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Pipeline {
        id: fields.str_or("id", "")?,
        name: fields.str("name")?,
        steps,
        paused: Some(fields.bool_or("paused", false)?),
    })
}

/// Step attributes that are not payload blocks.
const STEP_ATTRIBUTES: [&str; 5] = ["name", "dynamic", "on_true", "on_false", "on_error"];

/// Build a single step.
pub fn build_step(step: &Nested<'_>) -> Result<PipelineStep, ProviderError> {
    let fields = step.fields()?;

    for key in fields.keys().filter(|k| !STEP_ATTRIBUTES.contains(k)) {
        if let Err(err) = key.parse::<StepKind>() {
            let message = match err {
                ProviderError::Validation(message) => message,
                other => other.to_string(),
            };
            return Err(ProviderError::InvalidAttribute {
                attribute: fields.path_of(key),
                message,
            });
        }
    }

    let mut present = Vec::new();
    for kind in StepKind::ALL {
        if let Some(block) = fields.block(kind.block_name())? {
            present.push((kind, block));
        }
    }

    let (kind, block) = match present.len() {
        0 => {
            return Err(ProviderError::InvalidAttribute {
                attribute: step.path().to_string(),
                message: format!("step must define one of: {}", StepKind::block_names()),
            })
        },
        1 => present.remove(0),
        _ => {
            return Err(ProviderError::InvalidAttribute {
                attribute: step.path().to_string(),
                message: format!(
                    "step defines more than one payload: {}",
                    present
                        .iter()
                        .map(|(k, _)| k.block_name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
        },
    };

    Ok(PipelineStep {
        name: fields.str_or("name", "")?,
        on_true: build_optional_condition(&fields, "on_true")?,
        on_false: build_optional_condition(&fields, "on_false")?,
        dynamic: fields.bool_or("dynamic", false)?,
        on_error: build_optional_condition(&fields, "on_error")?,
        step: Some(build_payload(kind, &block)?),
    })
}

fn build_payload(kind: StepKind, block: &Nested<'_>) -> Result<pipeline_step::Step, ProviderError> {
    let fields = block.fields()?;
    let step = match kind {
        StepKind::Detective => pipeline_step::Step::Detective(build_detective(&fields)?),
        StepKind::Transform => pipeline_step::Step::Transform(build_transform(&fields)?),
        StepKind::HttpRequest => pipeline_step::Step::HttpRequest(build_http_request(&fields)?),
        StepKind::ValidJson => pipeline_step::Step::ValidJson(ValidJsonStep {}),
        StepKind::SchemaValidation => {
            pipeline_step::Step::SchemaValidation(build_schema_validation(&fields)?)
        },
        StepKind::Kv => pipeline_step::Step::Kv(build_kv(&fields)?),
    };
    Ok(step)
}

fn build_optional_condition(
    fields: &Fields<'_>,
    key: &str,
) -> Result<Option<PipelineStepConditions>, ProviderError> {
    fields
        .block(key)?
        .map(|block| build_condition(&block))
        .transpose()
}

/// Build the conditions attached to a step outcome.
pub fn build_condition(block: &Nested<'_>) -> Result<PipelineStepConditions, ProviderError> {
    let fields = block.fields()?;

    let notification = match fields.block("notification")? {
        Some(nested) => {
            let n = nested.fields()?;
            let payload_type = n.enum_or("payload_type", PayloadType::Exclude)?;
            let paths = n.strings("paths")?;

            if payload_type == PayloadType::SelectPaths && paths.is_empty() {
                return Err(ProviderError::InvalidAttribute {
                    attribute: n.path_of("paths"),
                    message: "paths are required when payload_type is 'select_paths'".to_string(),
                });
            }

            Some(PipelineStepNotification {
                notification_config_ids: n.strings("notification_config_ids")?,
                payload_type: payload_type as i32,
                paths,
            })
        },
        None => None,
    };

    Ok(PipelineStepConditions {
        abort: fields.enum_or("abort", AbortCondition::Unset)? as i32,
        metadata: fields.string_map("metadata")?,
        notification,
    })
}

fn build_detective(fields: &Fields<'_>) -> Result<DetectiveStep, ProviderError> {
    let kind: DetectiveType = fields.enum_value("type")?;

    Ok(DetectiveStep {
        path: fields.opt_str("path")?,
        args: fields.strings("args")?,
        negate: Some(fields.bool_or("negate", false)?),
        r#type: kind as i32,
    })
}

fn build_transform(fields: &Fields<'_>) -> Result<TransformStep, ProviderError> {
    let kind: TransformType = fields.enum_value("type")?;
    let block_name = transform_block(kind).ok_or_else(|| unsupported_transform(fields, kind))?;

    let context = format!("transform type '{}'", kind.name());
    let block = fields.required_block(block_name, &context)?;
    let opts = block.fields()?;

    let options = match kind {
        TransformType::ReplaceValue => {
            transform_step::Options::ReplaceValueOptions(TransformReplaceValueOptions {
                path: opts.str_or("path", "")?,
                value: opts.str_or("value", "")?,
            })
        },
        TransformType::DeleteField => {
            transform_step::Options::DeleteFieldOptions(TransformDeleteFieldOptions {
                paths: opts.strings("paths")?,
            })
        },
        TransformType::ObfuscateValue => {
            transform_step::Options::ObfuscateOptions(TransformObfuscateOptions {
                path: opts.str_or("path", "")?,
            })
        },
        TransformType::MaskValue => transform_step::Options::MaskOptions(TransformMaskOptions {
            path: opts.str_or("path", "")?,
            mask: opts.str_or("mask", DEFAULT_MASK)?,
        }),
        TransformType::TruncateValue => {
            let truncate: TransformTruncateType = opts.enum_value("type")?;
            transform_step::Options::TruncateOptions(TransformTruncateOptions {
                r#type: truncate as i32,
                path: opts.str_or("path", "")?,
                value: opts.int32("value")?,
            })
        },
        TransformType::Extract => {
            transform_step::Options::ExtractOptions(TransformExtractOptions {
                paths: opts.strings("paths")?,
                flatten: opts.bool_or("flatten", false)?,
            })
        },
        TransformType::Unknown => return Err(unsupported_transform(fields, kind)),
    };

    Ok(TransformStep {
        r#type: kind as i32,
        options: Some(options),
    })
}

fn unsupported_transform(fields: &Fields<'_>, kind: TransformType) -> ProviderError {
    ProviderError::InvalidAttribute {
        attribute: fields.path_of("type"),
        message: format!("transform type '{}' is not supported", kind.name()),
    }
}

fn build_http_request(fields: &Fields<'_>) -> Result<HttpRequestStep, ProviderError> {
    let method: HttpRequestMethod = fields.enum_value("method")?;

    Ok(HttpRequestStep {
        request: Some(HttpRequest {
            method: method as i32,
            url: fields.str("url")?,
            body: fields.str_or("body", "")?.into_bytes(),
            headers: fields.string_map("headers")?,
        }),
    })
}

fn build_schema_validation(fields: &Fields<'_>) -> Result<SchemaValidationStep, ProviderError> {
    let kind: SchemaValidationType = fields.enum_value("type")?;
    let condition: SchemaValidationCondition = fields.enum_value("condition")?;

    let options = match kind {
        SchemaValidationType::Jsonschema => {
            let block = fields.required_block("json_schema", "schema validation type 'jsonschema'")?;
            let js = block.fields()?;
            let draft: JsonSchemaDraft = js.enum_value("draft")?;

            schema_validation_step::Options::JsonSchema(SchemaValidationJsonSchema {
                json_schema: js.str("json_schema")?.into_bytes(),
                draft: draft as i32,
            })
        },
        SchemaValidationType::Unknown => {
            return Err(ProviderError::InvalidAttribute {
                attribute: fields.path_of("type"),
                message: format!("schema validation type '{}' is not supported", kind.name()),
            })
        },
    };

    Ok(SchemaValidationStep {
        r#type: kind as i32,
        condition: condition as i32,
        options: Some(options),
    })
}

fn build_kv(fields: &Fields<'_>) -> Result<KvStep, ProviderError> {
    let action: KvAction = fields.enum_value("action")?;
    let mode: KvMode = fields.enum_value("mode")?;

    Ok(KvStep {
        action: action as i32,
        mode: mode as i32,
        key: fields.str_or("key", "")?,
        value: fields.str_or("value", "")?.into_bytes(),
    })
}

/// Canonical state for a pipeline.
///
/// Mirrors the configuration shape with every default filled in. Only the
/// populated payload block of each step is emitted.
pub fn pipeline_to_state(pipeline: &Pipeline) -> Value {
    json!({
        "id": pipeline.id,
        "name": pipeline.name,
        "paused": pipeline.paused.unwrap_or(false),
        "step": pipeline.steps.iter().map(step_to_state).collect::<Vec<_>>(),
    })
}

fn step_to_state(step: &PipelineStep) -> Value {
    let mut out = Map::new();
    out.insert("name".into(), json!(step.name));
    out.insert("dynamic".into(), json!(step.dynamic));

    for (key, cond) in [
        ("on_true", &step.on_true),
        ("on_false", &step.on_false),
        ("on_error", &step.on_error),
    ] {
        if let Some(cond) = cond {
            out.insert(key.into(), condition_to_state(cond));
        }
    }

    if let Some(payload) = &step.step {
        let (kind, value) = payload_to_state(payload);
        out.insert(kind.block_name().into(), value);
    }

    Value::Object(out)
}

fn condition_to_state(cond: &PipelineStepConditions) -> Value {
    let mut out = Map::new();
    out.insert("abort".into(), json!(cond.abort().name()));
    out.insert("metadata".into(), json!(cond.metadata));

    if let Some(n) = &cond.notification {
        out.insert(
            "notification".into(),
            json!({
                "notification_config_ids": n.notification_config_ids,
                "payload_type": n.payload_type().name(),
                "paths": n.paths,
            }),
        );
    }

    Value::Object(out)
}

fn payload_to_state(payload: &pipeline_step::Step) -> (StepKind, Value) {
    match payload {
        pipeline_step::Step::Detective(d) => {
            let mut out = Map::new();
            out.insert("type".into(), json!(d.r#type().name()));
            if let Some(path) = &d.path {
                out.insert("path".into(), json!(path));
            }
            out.insert("args".into(), json!(d.args));
            out.insert("negate".into(), json!(d.negate.unwrap_or(false)));
            (StepKind::Detective, Value::Object(out))
        },
        pipeline_step::Step::Transform(t) => (StepKind::Transform, transform_to_state(t)),
        pipeline_step::Step::HttpRequest(h) => {
            let request = h.request.clone().unwrap_or_default();
            (
                StepKind::HttpRequest,
                json!({
                    "method": request.method().name(),
                    "url": request.url,
                    "headers": request.headers,
                    "body": String::from_utf8_lossy(&request.body),
                }),
            )
        },
        pipeline_step::Step::ValidJson(_) => (StepKind::ValidJson, json!({})),
        pipeline_step::Step::SchemaValidation(s) => {
            let mut out = Map::new();
            out.insert("type".into(), json!(s.r#type().name()));
            out.insert("condition".into(), json!(s.condition().name()));
            if let Some(schema_validation_step::Options::JsonSchema(js)) = &s.options {
                out.insert(
                    "json_schema".into(),
                    json!({
                        "draft": js.draft().name(),
                        "json_schema": String::from_utf8_lossy(&js.json_schema),
                    }),
                );
            }
            (StepKind::SchemaValidation, Value::Object(out))
        },
        pipeline_step::Step::Kv(kv) => (
            StepKind::Kv,
            json!({
                "action": kv.action().name(),
                "mode": kv.mode().name(),
                "key": kv.key,
                "value": String::from_utf8_lossy(&kv.value),
            }),
        ),
    }
}

fn transform_to_state(t: &TransformStep) -> Value {
    let kind = t.r#type();
    let mut out = Map::new();
    out.insert("type".into(), json!(kind.name()));

    let options = match &t.options {
        Some(transform_step::Options::ReplaceValueOptions(o)) => {
            Some(("replace_value", json!({"path": o.path, "value": o.value})))
        },
        Some(transform_step::Options::DeleteFieldOptions(o)) => {
            Some(("delete_field", json!({"paths": o.paths})))
        },
        Some(transform_step::Options::ObfuscateOptions(o)) => {
            Some(("obfuscate", json!({"path": o.path})))
        },
        Some(transform_step::Options::MaskOptions(o)) => {
            Some(("mask", json!({"path": o.path, "mask": o.mask})))
        },
        Some(transform_step::Options::TruncateOptions(o)) => Some((
            "truncate",
            json!({"type": o.r#type().name(), "path": o.path, "value": o.value}),
        )),
        Some(transform_step::Options::ExtractOptions(o)) => {
            Some(("extract", json!({"paths": o.paths, "flatten": o.flatten})))
        },
        None => None,
    };

    if let Some((key, value)) = options {
        out.insert(key.into(), value);
    }

    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_config(step: Value) -> Value {
        json!({"name": "p", "step": [step]})
    }

    fn only_step(config: Value) -> PipelineStep {
        let mut pipeline = build_pipeline(&config).unwrap();
        assert_eq!(pipeline.steps.len(), 1);
        pipeline.steps.remove(0)
    }

    #[test]
    fn test_step_kind_from_str() {
        assert_eq!("detective".parse::<StepKind>().unwrap(), StepKind::Detective);
        assert_eq!("kv".parse::<StepKind>().unwrap(), StepKind::Kv);
        for kind in StepKind::ALL {
            assert_eq!(kind.to_string().parse::<StepKind>().unwrap(), kind);
        }

        let err = "teleport".parse::<StepKind>().unwrap_err();
        assert!(err.to_string().contains("unknown step type 'teleport'"));
        assert!(err.to_string().contains("schema_validation"));
    }

    #[test]
    fn test_pipeline_defaults() {
        let pipeline = build_pipeline(&json!({"name": "empty"})).unwrap();
        assert_eq!(pipeline.name, "empty");
        assert_eq!(pipeline.id, "");
        assert_eq!(pipeline.paused, Some(false));
        assert!(pipeline.steps.is_empty());
    }

    #[test]
    fn test_pipeline_requires_name() {
        let err = build_pipeline(&json!({})).unwrap_err();
        assert_eq!(err.attribute(), Some("name"));
    }

    #[test]
    fn test_detective_step() {
        let step = only_step(step_config(json!({
            "name": "find emails",
            "detective": {"type": "pii_email", "path": "user.email", "args": ["x"]},
            "on_true": {"abort": "abort_current", "metadata": {"k": "v"}},
        })));

        assert_eq!(step.name, "find emails");
        assert!(!step.dynamic);
        let Some(pipeline_step::Step::Detective(d)) = step.step else {
            panic!("expected detective step");
        };
        assert_eq!(d.r#type(), DetectiveType::PiiEmail);
        assert_eq!(d.path.as_deref(), Some("user.email"));
        assert_eq!(d.args, vec!["x".to_string()]);
        assert_eq!(d.negate, Some(false));

        let on_true = step.on_true.unwrap();
        assert_eq!(on_true.abort(), AbortCondition::AbortCurrent);
        assert_eq!(on_true.metadata.get("k").map(String::as_str), Some("v"));
        assert!(on_true.notification.is_none());
        assert!(step.on_false.is_none());
    }

    #[test]
    fn test_step_without_payload() {
        let err = build_pipeline(&step_config(json!({"name": "nothing"}))).unwrap_err();
        assert!(err.to_string().contains("step must define one of"));
        assert_eq!(err.attribute(), Some("step.0"));
    }

    #[test]
    fn test_step_with_two_payloads() {
        let err = build_pipeline(&step_config(json!({
            "valid_json": {},
            "detective": {"type": "is_empty"},
        })))
        .unwrap_err();
        assert!(err.to_string().contains("more than one payload"));
        assert!(err.to_string().contains("detective, valid_json"));
    }

    #[test]
    fn test_step_with_unknown_block() {
        let err = build_pipeline(&step_config(json!({
            "valid_json": {},
            "teleport": {"to": "mars"},
        })))
        .unwrap_err();
        assert!(err.to_string().contains("unknown step type 'teleport'"));
        assert_eq!(err.attribute(), Some("step.0.teleport"));

        // Unset blocks sent as null by the host are not payloads.
        let pipeline = build_pipeline(&step_config(json!({
            "valid_json": {},
            "detective": null,
            "on_true": null,
        })))
        .unwrap();
        assert_eq!(pipeline.steps.len(), 1);
    }

    #[test]
    fn test_transform_requires_matching_options() {
        let err = build_pipeline(&step_config(json!({
            "transform": {"type": "mask_value", "obfuscate": {"path": "a"}},
        })))
        .unwrap_err();

        match err {
            ProviderError::MissingBlock {
                block, attribute, ..
            } => {
                assert_eq!(block, "mask");
                assert_eq!(attribute, "step.0.transform.mask");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_transform_mask_default() {
        let step = only_step(step_config(json!({
            "transform": {"type": "mask_value", "mask": {"path": "card"}},
        })));
        let Some(pipeline_step::Step::Transform(t)) = step.step else {
            panic!("expected transform step");
        };
        let Some(transform_step::Options::MaskOptions(mask)) = t.options else {
            panic!("expected mask options");
        };
        assert_eq!(mask.path, "card");
        assert_eq!(mask.mask, DEFAULT_MASK);
    }

    #[test]
    fn test_transform_truncate_reads_value() {
        let step = only_step(step_config(json!({
            "transform": {
                "type": "truncate_value",
                "truncate": {"type": "percentage", "path": "body", "value": 50},
            },
        })));
        let Some(pipeline_step::Step::Transform(t)) = step.step else {
            panic!("expected transform step");
        };
        let Some(transform_step::Options::TruncateOptions(o)) = t.options else {
            panic!("expected truncate options");
        };
        assert_eq!(o.r#type(), TransformTruncateType::Percentage);
        assert_eq!(o.value, 50);
    }

    #[test]
    fn test_transform_delete_field_reads_paths() {
        let step = only_step(step_config(json!({
            "transform": {"type": "delete_field", "delete_field": {"paths": ["a", "b.c"]}},
        })));
        let Some(pipeline_step::Step::Transform(t)) = step.step else {
            panic!("expected transform step");
        };
        let Some(transform_step::Options::DeleteFieldOptions(o)) = t.options else {
            panic!("expected delete_field options");
        };
        assert_eq!(o.paths, vec!["a".to_string(), "b.c".to_string()]);
    }

    #[test]
    fn test_transform_unknown_type_rejected() {
        let err = build_pipeline(&step_config(json!({"transform": {"type": "unknown"}}))).unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert_eq!(err.attribute(), Some("step.0.transform.type"));
    }

    #[test]
    fn test_invalid_enum_names_attribute() {
        let err =
            build_pipeline(&step_config(json!({"detective": {"type": "pii_everything"}}))).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidEnum { .. }));
        assert_eq!(err.attribute(), Some("step.0.detective.type"));
    }

    #[test]
    fn test_http_request_step() {
        let step = only_step(step_config(json!({
            "http_request": {
                "method": "post",
                "url": "https://hooks.example.com",
                "headers": {"X-Token": "t"},
                "body": "{}",
            },
        })));
        let Some(pipeline_step::Step::HttpRequest(h)) = step.step else {
            panic!("expected http_request step");
        };
        let request = h.request.unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Post);
        assert_eq!(request.body, b"{}".to_vec());
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_schema_validation_requires_json_schema_block() {
        let err = build_pipeline(&step_config(json!({
            "schema_validation": {"type": "jsonschema", "condition": "match"},
        })))
        .unwrap_err();
        assert!(matches!(err, ProviderError::MissingBlock { .. }));

        let step = only_step(step_config(json!({
            "schema_validation": {
                "type": "jsonschema",
                "condition": "not_match",
                "json_schema": {"draft": "draft_07", "json_schema": "{\"type\":\"object\"}"},
            },
        })));
        let Some(pipeline_step::Step::SchemaValidation(s)) = step.step else {
            panic!("expected schema_validation step");
        };
        assert_eq!(s.condition(), SchemaValidationCondition::NotMatch);
        let Some(schema_validation_step::Options::JsonSchema(js)) = s.options else {
            panic!("expected json schema options");
        };
        assert_eq!(js.draft(), JsonSchemaDraft::JsonschemaDraft07);
    }

    #[test]
    fn test_kv_step() {
        let step = only_step(step_config(json!({
            "dynamic": true,
            "kv": {"action": "exists", "mode": "dynamic", "key": "user.id"},
        })));
        assert!(step.dynamic);
        let Some(pipeline_step::Step::Kv(kv)) = step.step else {
            panic!("expected kv step");
        };
        assert_eq!(kv.action(), KvAction::Exists);
        assert_eq!(kv.mode(), KvMode::Dynamic);
        assert!(kv.value.is_empty());
    }

    #[test]
    fn test_notification_condition() {
        let step = only_step(step_config(json!({
            "valid_json": {},
            "on_false": {"notification": {"notification_config_ids": ["n1"]}},
        })));
        let notification = step.on_false.unwrap().notification.unwrap();
        assert_eq!(notification.notification_config_ids, vec!["n1".to_string()]);
        assert_eq!(notification.payload_type(), PayloadType::Exclude);
    }

    #[test]
    fn test_select_paths_requires_paths() {
        let err = build_pipeline(&step_config(json!({
            "valid_json": {},
            "on_error": {"notification": {"payload_type": "select_paths"}},
        })))
        .unwrap_err();
        assert_eq!(err.attribute(), Some("step.0.on_error.notification.paths"));
    }

    #[test]
    fn test_state_is_canonical() {
        let config = json!({
            "name": "orders",
            "step": [
                {
                    "name": "detect",
                    "detective": {"type": "PII_EMAIL", "path": "email"},
                    "on_true": {"notification": {"notification_config_ids": ["n1"]}},
                },
                {"transform": {"type": "extract", "extract": {"paths": ["a"]}}},
            ],
        });

        let state = pipeline_to_state(&build_pipeline(&config).unwrap());
        assert_eq!(state["paused"], json!(false));
        assert_eq!(state["step"][0]["detective"]["type"], "pii_email");
        assert_eq!(state["step"][0]["detective"]["negate"], json!(false));
        assert_eq!(state["step"][0]["on_true"]["abort"], "unset");
        assert_eq!(
            state["step"][0]["on_true"]["notification"]["payload_type"],
            "exclude"
        );
        assert_eq!(state["step"][1]["name"], "");
        assert_eq!(state["step"][1]["transform"]["extract"]["flatten"], json!(false));
        assert!(state["step"][1].get("detective").is_none());

        // Canonical state builds back into the same pipeline.
        let again = pipeline_to_state(&build_pipeline(&state).unwrap());
        assert_eq!(again, state);
    }
}
