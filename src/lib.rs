//! Streamdal provider
//!
//! A provider plugin that manages Streamdal pipelines, notification configs
//! and audiences from declarative configuration. The host runtime launches
//! the binary, reads the handshake from stdout and drives the provider over
//! gRPC in the style of
//! [terraform-plugin-go](https://github.com/hashicorp/terraform-plugin-go).
//! Every host call is translated into calls on the Streamdal external API.
//!
//! # Handshake
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Format: `HEMMER_PROVIDER|<protocol_version>|<address>`. Logs go to
//! stderr so stdout carries nothing but the handshake.
//!
//! # Layout
//!
//! - [`provider`]: resource and data source logic, and their schemas
//! - [`builder`]: configuration to and from Streamdal messages
//! - [`client`]: the [`client::StreamdalApi`] seam and its tonic implementation
//! - [`filter`]: wildcard record selection for data sources
//! - [`server`]: the plugin protocol server and handshake
//! - [`testing`]: a test harness and an in-memory Streamdal server
//!
//! # Resources
//!
//! ```text
//! resource "streamdal_pipeline" "pii" {
//!   name = "mask emails"
//!
//!   step {
//!     name = "find email"
//!     on_true { abort = "abort_current" }
//!
//!     detective {
//!       type = "pii_email"
//!       path = "user.email"
//!     }
//!   }
//! }
//!
//! resource "streamdal_audience" "orders" {
//!   service_name   = "billing"
//!   component_name = "kafka"
//!   operation_name = "orders"
//!   operation_type = "consumer"
//!   pipeline_ids   = [streamdal_pipeline.pii.id]
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audience;
pub mod builder;
pub mod client;
pub mod config;
pub mod enums;
pub mod error;
pub mod fields;
pub mod filter;
pub mod logging;
pub mod proto;
pub mod provider;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

pub use client::{GrpcStreamdal, StreamdalApi};
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::StreamdalProvider;
pub use schema::ProviderSchema;
pub use server::{serve, serve_on_listener, serve_with_options, ProviderService, ServeOptions};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION,
};
