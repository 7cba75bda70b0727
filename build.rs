//! Generates the `rates` gRPC types from `proto/rates.proto`.
//!
//! `protoc` comes from `protoc-bin-vendored`, so no system install is needed.
//! Set `PROTOC` to use a different binary.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/rates.proto");

    let mut config = prost_build::Config::new();
    if std::env::var_os("PROTOC").is_none() {
        config.protoc_executable(protoc_bin_vendored::protoc_bin_path()?);
    }

    tonic_build::configure().compile_protos_with_config(
        config,
        &["proto/rates.proto"],
        &["proto"],
    )?;
    Ok(())
}
