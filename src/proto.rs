//! Generated protocol types.
//!
//! Compiled from `proto/` by the build script.

/// Host plugin protocol (`hemmer.provider.v1`).
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod provider {
    tonic::include_proto!("hemmer.provider.v1");
}

/// Streamdal external API (`protos`).
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod streamdal {
    tonic::include_proto!("protos");
}
