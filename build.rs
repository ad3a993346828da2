//! Build script for proto compilation.
//!
//! Two protocols are compiled into `OUT_DIR`:
//!
//! - `proto/provider.proto`: the plugin protocol spoken with the host runtime
//! - `proto/streamdal/*.proto`: the subset of the Streamdal external API the
//!   provider calls
//!
//! The provider protocol only needs server stubs. The Streamdal API gets
//! both: the client is what the provider calls, and the server stubs let the
//! integration tests stand up a fake server.
//!
//! `PROTOC` is honoured when set; otherwise the vendored `protoc` binary is
//! used, so no system protobuf compiler is needed.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }
    println!("cargo:rerun-if-env-changed=PROTOC");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&["proto/provider.proto"], &["proto"])?;

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &[
                "proto/streamdal/common.proto",
                "proto/streamdal/steps.proto",
                "proto/streamdal/pipeline.proto",
                "proto/streamdal/notify.proto",
                "proto/streamdal/external.proto",
            ],
            &["proto/streamdal"],
        )?;

    println!("cargo:rerun-if-changed=proto");

    Ok(())
}
