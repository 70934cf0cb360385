fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configure tonic-build
    #[allow(unused_mut)]
    let mut config = tonic_build::configure()
        .build_server(true)
        .build_client(true);

    // Enable file descriptor set for reflection if the feature is enabled
    #[cfg(feature = "reflection")]
    {
        let out_dir = std::path::PathBuf::from(std::env::var("OUT_DIR")?);
        config = config.file_descriptor_set_path(out_dir.join("backend_descriptor.bin"));
    }

    config.compile_protos(&["proto/backend.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/backend.proto");

    Ok(())
}
