//! Provider, resource and data source schemas.

use serde_json::{json, Value};

use crate::enums::ProtoEnum;
use crate::proto::streamdal::{
    notification_email, notification_pager_duty::Urgency, pipeline_step_notification::PayloadType,
    AbortCondition, DetectiveType, HttpRequestMethod, JsonSchemaDraft, KvAction, KvMode,
    NotificationType, SchemaValidationCondition, SchemaValidationType, TransformTruncateType,
    TransformType,
};
use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, ProviderSchema, Schema};

use super::{AUDIENCE, NOTIFICATION, PIPELINE};

/// Every schema the provider exposes.
pub fn provider_schema() -> ProviderSchema {
    ProviderSchema::new()
        .with_provider_config(provider_config())
        .with_resource(PIPELINE, pipeline())
        .with_resource(NOTIFICATION, notification())
        .with_resource(AUDIENCE, audience())
        .with_data_source(PIPELINE, pipeline_data_source())
        .with_data_source(NOTIFICATION, notification_data_source())
        .with_data_source(AUDIENCE, audience_data_source())
}

/// The provider block.
pub fn provider_config() -> Schema {
    Schema::v0()
        .with_attribute(
            "token",
            Attribute::optional_string()
                .with_description("Streamdal Server API token. Falls back to `STREAMDAL_TOKEN`.")
                .sensitive(),
        )
        .with_attribute(
            "address",
            Attribute::optional_string().with_description(
                "The address of the Streamdal server. Falls back to `STREAMDAL_ADDRESS`. (Default: `localhost:8082`)",
            ),
        )
        .with_attribute(
            "connection_timeout",
            Attribute::optional_int64().with_description(
                "The connection timeout for the Streamdal server, in seconds. Falls back to `STREAMDAL_CONNECTION_TIMEOUT`. (Default: `10`)",
            ),
        )
}

/// Attach a default and mention it in the description.
fn defaulted(attr: Attribute, description: &str, default: Value) -> Attribute {
    let shown = match &default {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    attr.with_description(format!("{} (Default: `{}`)", description, shown))
        .with_default(default)
}

fn enum_attr<E: ProtoEnum>(attr: Attribute, description: &str) -> Attribute {
    attr.with_description(description)
        .with_allowed_values(E::names())
}

fn required_enum<E: ProtoEnum>(description: &str) -> Attribute {
    enum_attr::<E>(Attribute::required_string(), description)
}

fn optional_enum<E: ProtoEnum>(description: &str, default: E) -> Attribute {
    defaulted(
        enum_attr::<E>(Attribute::optional_string(), description),
        description,
        json!(default.name()),
    )
}

fn strings(description: &str) -> Attribute {
    Attribute::string_list(AttributeFlags::optional()).with_description(description)
}

fn string(description: &str) -> Attribute {
    Attribute::optional_string().with_description(description)
}

fn required(description: &str) -> Attribute {
    Attribute::required_string().with_description(description)
}

fn id(description: &str) -> Attribute {
    Attribute::computed_string().with_description(description)
}

fn single(block: Block, description: &str) -> NestedBlock {
    NestedBlock::single(block.with_description(description))
}

/// The `streamdal_pipeline` resource.
pub fn pipeline() -> Schema {
    Schema::v0()
        .with_description("Pipelines")
        .with_attribute("id", id("Pipeline ID"))
        .with_attribute("name", required("Name"))
        .with_attribute(
            "paused",
            defaulted(Attribute::optional_bool(), "Whether the pipeline is paused", json!(false)),
        )
        .with_block(
            "step",
            NestedBlock::list(step().with_description("Steps for this pipeline")),
        )
}

fn step() -> Block {
    Block::new()
        .with_attribute("name", string("Step Name"))
        .with_attribute(
            "dynamic",
            defaulted(
                Attribute::optional_bool(),
                "Should this step use the result from the previous step",
                json!(false),
            ),
        )
        .with_block(
            "on_true",
            single(condition(), "Determines the next action if the result of the step is true"),
        )
        .with_block(
            "on_false",
            single(condition(), "Determines the next action if the result of the step is false"),
        )
        .with_block(
            "on_error",
            single(condition(), "Determines the next action if the result of the step is an error"),
        )
        .with_block("detective", single(detective(), "Detective Step"))
        .with_block("transform", single(transform(), "Transform Step"))
        .with_block("http_request", single(http_request(), "HTTP Request Step"))
        .with_block("valid_json", single(Block::new(), "Valid JSON Step"))
        .with_block(
            "schema_validation",
            single(schema_validation(), "Schema Validation Step"),
        )
        .with_block("kv", single(kv(), "Key/Value Step"))
}

fn condition() -> Block {
    Block::new()
        .with_attribute("abort", optional_enum("Abort", AbortCondition::Unset))
        .with_attribute("metadata", Attribute::string_map().with_description("Metadata"))
        .with_block(
            "notification",
            single(
                Block::new()
                    .with_attribute("notification_config_ids", strings("Notification Config IDs"))
                    .with_attribute(
                        "payload_type",
                        optional_enum("Payload Type", PayloadType::Exclude),
                    )
                    .with_attribute(
                        "paths",
                        strings("Paths to Extract (If Payload Type is 'select_paths')"),
                    ),
                "Notification Config",
            ),
        )
}

fn detective() -> Block {
    Block::new()
        .with_attribute("type", required_enum::<DetectiveType>("Detective Type"))
        .with_attribute("path", string("Path"))
        .with_attribute("args", strings("Arguments"))
        .with_attribute(
            "negate",
            defaulted(Attribute::optional_bool(), "Negate", json!(false)),
        )
}

fn transform() -> Block {
    let path = || string("Path");
    let paths = || strings("Paths");

    Block::new()
        .with_attribute("type", required_enum::<TransformType>("Transform Type"))
        .with_block(
            "replace_value",
            single(
                Block::new()
                    .with_attribute("path", path())
                    .with_attribute("value", string("Value")),
                "Replace value of a field",
            ),
        )
        .with_block(
            "delete_field",
            single(Block::new().with_attribute("paths", paths()), "Delete field"),
        )
        .with_block(
            "obfuscate",
            single(Block::new().with_attribute("path", path()), "Obfuscate value"),
        )
        .with_block(
            "mask",
            single(
                Block::new().with_attribute("path", path()).with_attribute(
                    "mask",
                    defaulted(Attribute::optional_string(), "Mask", json!("*")),
                ),
                "Mask value",
            ),
        )
        .with_block(
            "truncate",
            single(
                Block::new()
                    .with_attribute(
                        "type",
                        required_enum::<TransformTruncateType>("Truncate Type"),
                    )
                    .with_attribute("path", path())
                    .with_attribute(
                        "value",
                        Attribute::required_int64()
                            .with_description("Length or percentage to truncate to"),
                    ),
                "Truncate value",
            ),
        )
        .with_block(
            "extract",
            single(
                Block::new().with_attribute("paths", paths()).with_attribute(
                    "flatten",
                    defaulted(Attribute::optional_bool(), "Flatten extracted fields", json!(false)),
                ),
                "Extract value",
            ),
        )
}

fn http_request() -> Block {
    Block::new()
        .with_attribute("method", required_enum::<HttpRequestMethod>("HTTP Method"))
        .with_attribute("url", required("URL"))
        .with_attribute("headers", Attribute::string_map().with_description("Headers"))
        .with_attribute("body", string("Body"))
}

fn schema_validation() -> Block {
    Block::new()
        .with_attribute(
            "type",
            required_enum::<SchemaValidationType>("Schema Validation Type"),
        )
        .with_attribute(
            "condition",
            required_enum::<SchemaValidationCondition>("Schema Validation Condition"),
        )
        .with_block(
            "json_schema",
            single(
                Block::new()
                    .with_attribute("draft", required_enum::<JsonSchemaDraft>("JSON Schema Draft"))
                    .with_attribute("json_schema", required("Schema Definition")),
                "JSON Schema",
            ),
        )
}

fn kv() -> Block {
    Block::new()
        .with_attribute("action", required_enum::<KvAction>("KV Action"))
        .with_attribute("mode", required_enum::<KvMode>("KV Mode"))
        .with_attribute("key", string("Key"))
        .with_attribute("value", string("Value"))
}

/// The `streamdal_notification` resource.
pub fn notification() -> Schema {
    Schema::v0()
        .with_description("Notification configurations")
        .with_attribute("id", id("The ID of the notification configuration"))
        .with_attribute("name", required("Name"))
        .with_attribute(
            "type",
            required_enum::<NotificationType>("Notification type"),
        )
        .with_block(
            "slack",
            single(
                Block::new()
                    .with_attribute(
                        "channel",
                        required("The Slack channel to send the notification to"),
                    )
                    .with_attribute(
                        "bot_token",
                        required("The bot token to use for sending the notification").sensitive(),
                    ),
                "Slack",
            ),
        )
        .with_block(
            "pagerduty",
            single(
                Block::new()
                    .with_attribute("token", required("PagerDuty API token").sensitive())
                    .with_attribute("email", required("Valid pagerduty user's email"))
                    .with_attribute("service_id", required("PagerDuty service's ID"))
                    .with_attribute(
                        "urgency",
                        optional_enum("The urgency of the notification", Urgency::Low),
                    ),
                "PagerDuty",
            ),
        )
        .with_block("email", single(email(), "Email"))
}

fn email() -> Block {
    Block::new()
        .with_attribute(
            "type",
            required_enum::<notification_email::Type>("Service sending the email notification"),
        )
        .with_attribute(
            "recipients",
            Attribute::string_list(AttributeFlags::required())
                .with_description("The email addresses to send the notification to"),
        )
        .with_attribute(
            "from_address",
            required("The email address to send the notification from"),
        )
        .with_block(
            "smtp",
            single(
                Block::new()
                    .with_attribute("host", required("The SMTP server host"))
                    .with_attribute(
                        "port",
                        defaulted(Attribute::optional_int64(), "The SMTP server port", json!(587)),
                    )
                    .with_attribute("user", required("The SMTP server user"))
                    .with_attribute("password", required("The SMTP server password").sensitive())
                    .with_attribute(
                        "use_tls",
                        defaulted(
                            Attribute::optional_bool(),
                            "Use TLS for the SMTP server",
                            json!(true),
                        ),
                    ),
                "SMTP",
            ),
        )
        .with_block(
            "ses",
            single(
                Block::new()
                    .with_attribute("ses_region", required("AWS region for SES service"))
                    .with_attribute("ses_access_key", required("AWS Access Key for SES user"))
                    .with_attribute(
                        "ses_secret_access_key",
                        required("AWS Secret for SES user").sensitive(),
                    ),
                "AWS SES",
            ),
        )
}

const OPERATION_TYPES: [&str; 2] = ["consumer", "producer"];

/// The `streamdal_audience` resource.
pub fn audience() -> Schema {
    Schema::v0()
        .with_description("Audiences")
        .with_attribute("id", id("Audience ID"))
        .with_attribute(
            "service_name",
            required("The name of the service").with_force_new(),
        )
        .with_attribute(
            "component_name",
            required("The name of the component").with_force_new(),
        )
        .with_attribute(
            "operation_name",
            required("The name of the operation").with_force_new(),
        )
        .with_attribute(
            "operation_type",
            required("The type of the operation, either `consumer` or `producer`")
                .with_allowed_values(OPERATION_TYPES)
                .with_force_new(),
        )
        .with_attribute(
            "pipeline_ids",
            strings("IDs of the pipelines attached to this audience, in execution order"),
        )
}

fn filter_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_attribute("name", required("Field name to filter on"))
            .with_attribute(
                "values",
                Attribute::string_list(AttributeFlags::required())
                    .with_description("Value(s) to filter by. Wildcards '*' are supported."),
            )
            .with_description("Filter"),
    )
}

/// The `streamdal_pipeline` data source.
pub fn pipeline_data_source() -> Schema {
    Schema::v0()
        .with_attribute("id", id("Pipeline ID"))
        .with_attribute("name", id("Pipeline Name"))
        .with_attribute("paused", Attribute::computed_bool().with_description("Paused"))
        .with_block("filter", filter_block())
}

/// The `streamdal_notification` data source.
pub fn notification_data_source() -> Schema {
    Schema::v0()
        .with_attribute("id", id("Notification Config ID"))
        .with_attribute("name", id("Notification Config Name"))
        .with_attribute("type", id("Notification type"))
        .with_block("filter", filter_block())
}

/// The `streamdal_audience` data source.
pub fn audience_data_source() -> Schema {
    Schema::v0()
        .with_attribute("service_name", id("The name of the service"))
        .with_attribute("component_name", id("The name of the component"))
        .with_attribute("operation_name", id("The name of the operation"))
        .with_attribute(
            "operation_type",
            id("The type of the operation, either `consumer` or `producer`"),
        )
        .with_block("filter", filter_block())
}
