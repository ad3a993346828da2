//! Error types for the Streamdal provider.

use thiserror::Error;

/// Errors that can occur while serving a host request.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested object was not found on the server.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration string does not name a value of the expected enum.
    #[error("invalid {kind} '{value}' (expected one of: {})", .allowed.join(", "))]
    InvalidEnum {
        /// Human name of the enum, e.g. "detective type".
        kind: &'static str,
        /// The rejected value.
        value: String,
        /// Attribute path of the offending value.
        attribute: String,
        /// Every accepted name.
        allowed: Vec<String>,
    },

    /// A variant was chosen but its configuration block is absent.
    #[error("'{block}' configuration is required for {context}")]
    MissingBlock {
        /// Name of the missing block.
        block: String,
        /// What required the block, e.g. "transform type 'mask_value'".
        context: String,
        /// Attribute path of the missing block.
        attribute: String,
    },

    /// An attribute is missing or has the wrong shape.
    #[error("{message} (at {attribute})")]
    InvalidAttribute {
        /// Attribute path of the offending value.
        attribute: String,
        /// What is wrong with it.
        message: String,
    },

    /// A filter names a field the records do not have.
    #[error("{0} is not a valid key")]
    UnknownKey(String),

    /// A filter matched more than one record.
    #[error("Filter returned more than one {0}")]
    AmbiguousFilter(String),

    /// A data source was read without any filter block.
    #[error("No filters defined: at least one filter must be defined")]
    NoFilters,

    /// A stored identifier could not be parsed.
    #[error("invalid {kind} id '{id}'")]
    InvalidId {
        /// What kind of identifier, e.g. "audience".
        kind: &'static str,
        /// The raw identifier.
        id: String,
    },

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Dialing the Streamdal server failed.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The Streamdal server answered a call with an error status.
    #[error("{}", .0.message())]
    Rpc(#[from] tonic::Status),

    /// The Streamdal server answered with a non-OK response code.
    #[error("Server error ({code}): {message}")]
    Server {
        /// Response code name.
        code: String,
        /// Message returned by the server.
        message: String,
    },

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),
}

impl ProviderError {
    /// Attribute path the error refers to, if it is tied to one field.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::InvalidEnum { attribute, .. }
            | Self::MissingBlock { attribute, .. }
            | Self::InvalidAttribute { attribute, .. } => Some(attribute.as_str()),
            Self::UnknownKey(_) | Self::AmbiguousFilter(_) | Self::NoFilters => Some("filter"),
            _ => None,
        }
    }

    /// Whether the error means the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Rpc(status) => status.code() == tonic::Code::NotFound,
            _ => false,
        }
    }
}
