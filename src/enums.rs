//! Configuration names for protobuf enumerations.
//!
//! Every enum that appears in resource configuration is written by users as
//! its protobuf value name with the enum prefix stripped and lowercased, so
//! `DETECTIVE_TYPE_PII_EMAIL` is configured as `pii_email`. Parsing is
//! case-insensitive.
//!
//! # Example
//!
//! ```
//! use streamdal_provider::enums::ProtoEnum;
//! use streamdal_provider::proto::streamdal::TransformType;
//!
//! assert_eq!(TransformType::MaskValue.name(), "mask_value");
//! assert_eq!(TransformType::from_name("MASK_VALUE"), Some(TransformType::MaskValue));
//! ```

use crate::error::ProviderError;
use crate::proto::streamdal::{
    notification_email, notification_pager_duty, pipeline_step_notification, AbortCondition,
    DetectiveType, HttpRequestMethod, JsonSchemaDraft, KvAction, KvMode, NotificationType,
    OperationType, ResponseCode, SchemaValidationCondition, SchemaValidationType,
    TransformTruncateType, TransformType,
};

/// A protobuf enum exposed to configuration by name.
pub trait ProtoEnum: Copy + PartialEq + Sized + 'static {
    /// Human name used in error messages, e.g. "detective type".
    const KIND: &'static str;
    /// Prefix shared by every protobuf value name.
    const PREFIX: &'static str;
    /// Every value of the enum, in declaration order.
    const VARIANTS: &'static [Self];

    /// The full protobuf value name.
    fn proto_name(self) -> &'static str;

    /// Look up a value by its full protobuf value name.
    fn from_proto_name(name: &str) -> Option<Self>;

    /// Configuration name of this value.
    fn name(self) -> String {
        let full = self.proto_name();
        full.strip_prefix(Self::PREFIX)
            .unwrap_or(full)
            .to_lowercase()
    }

    /// Look up a value by configuration name.
    fn from_name(name: &str) -> Option<Self> {
        Self::from_proto_name(&format!("{}{}", Self::PREFIX, name.to_uppercase()))
    }

    /// Every configuration name, in declaration order.
    fn names() -> Vec<String> {
        Self::VARIANTS.iter().map(|v| v.name()).collect()
    }
}

/// Parse a configuration name, reporting the attribute path on failure.
pub fn parse_enum<E: ProtoEnum>(value: &str, attribute: &str) -> Result<E, ProviderError> {
    E::from_name(value).ok_or_else(|| ProviderError::InvalidEnum {
        kind: E::KIND,
        value: value.to_string(),
        attribute: attribute.to_string(),
        allowed: E::names(),
    })
}

macro_rules! proto_enum {
    ($ty:ty, $kind:literal, $prefix:literal, [$($variant:ident),+ $(,)?]) => {
        impl ProtoEnum for $ty {
            const KIND: &'static str = $kind;
            const PREFIX: &'static str = $prefix;
            const VARIANTS: &'static [Self] = &[$(<$ty>::$variant),+];

            fn proto_name(self) -> &'static str {
                self.as_str_name()
            }

            fn from_proto_name(name: &str) -> Option<Self> {
                Self::from_str_name(name)
            }
        }
    };
}

proto_enum!(OperationType, "operation type", "OPERATION_TYPE_", [Unset, Consumer, Producer]);

proto_enum!(
    AbortCondition,
    "abort condition",
    "ABORT_CONDITION_",
    [Unset, AbortCurrent, AbortAll]
);

proto_enum!(
    pipeline_step_notification::PayloadType,
    "notification payload type",
    "PAYLOAD_TYPE_",
    [Unset, Exclude, FullPayload, SelectPaths]
);

proto_enum!(
    DetectiveType,
    "detective type",
    "DETECTIVE_TYPE_",
    [
        Unknown,
        IsEmpty,
        HasField,
        IsType,
        StringContainsAny,
        StringContainsAll,
        StringEqual,
        Ipv4Address,
        Ipv6Address,
        MacAddress,
        Regex,
        TimestampRfc3339,
        TimestampUnixNano,
        TimestampUnix,
        BooleanTrue,
        BooleanFalse,
        Uuid,
        Url,
        Hostname,
        StringLengthMin,
        StringLengthMax,
        StringLengthRange,
        Semver,
        PiiAny,
        PiiCreditCard,
        PiiSsn,
        PiiEmail,
        PiiPhone,
        PiiDriversLicense,
        PiiPassportId,
        PiiVinNumber,
        PiiSerialNumber,
        PiiLogin,
        PiiTaxpayerId,
        PiiAddress,
        PiiSignature,
        PiiGeolocation,
        PiiEducation,
        PiiFinancial,
        PiiHealth,
        PiiKeyword,
        NumericEqualTo,
        NumericGreaterThan,
        NumericGreaterEqual,
        NumericLessThan,
        NumericLessEqual,
        NumericRange,
        NumericMin,
        NumericMax,
    ]
);

proto_enum!(
    TransformType,
    "transform type",
    "TRANSFORM_TYPE_",
    [
        Unknown,
        ReplaceValue,
        DeleteField,
        ObfuscateValue,
        MaskValue,
        TruncateValue,
        Extract,
    ]
);

proto_enum!(
    TransformTruncateType,
    "transform truncate type",
    "TRANSFORM_TRUNCATE_TYPE_",
    [Unknown, Length, Percentage]
);

proto_enum!(
    HttpRequestMethod,
    "http method",
    "HTTP_REQUEST_METHOD_",
    [Unset, Get, Post, Put, Delete, Patch, Head, Options]
);

proto_enum!(
    SchemaValidationType,
    "schema validation type",
    "SCHEMA_VALIDATION_TYPE_",
    [Unknown, Jsonschema]
);

proto_enum!(
    SchemaValidationCondition,
    "schema validation condition",
    "SCHEMA_VALIDATION_CONDITION_",
    [Unknown, Match, NotMatch]
);

proto_enum!(
    JsonSchemaDraft,
    "JSON schema draft",
    "JSONSCHEMA_",
    [JsonschemaDraft04, JsonschemaDraft06, JsonschemaDraft07]
);

proto_enum!(KvMode, "kv mode", "KV_MODE_", [Unset, Static, Dynamic]);

proto_enum!(
    KvAction,
    "kv action",
    "KV_ACTION_",
    [Unset, Get, Create, Update, Exists, Delete, DeleteAll]
);

proto_enum!(
    NotificationType,
    "notification type",
    "NOTIFICATION_TYPE_",
    [Unset, Slack, Email, Pagerduty]
);

proto_enum!(
    notification_email::Type,
    "email type",
    "TYPE_",
    [Unset, Smtp, Ses]
);

proto_enum!(
    notification_pager_duty::Urgency,
    "pagerduty urgency",
    "URGENCY_",
    [Unset, Low, High]
);

proto_enum!(
    ResponseCode,
    "response code",
    "RESPONSE_CODE_",
    [Unset, Ok, BadRequest, NotFound, InternalServerError, GenericError]
);
