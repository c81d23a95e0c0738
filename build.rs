fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/agrivision.proto");
    compile_protos()
}

#[cfg(feature = "grpc")]
fn compile_protos() -> Result<(), Box<dyn std::error::Error>> {
    let proto_dir = std::path::Path::new("proto");
    let proto_file = proto_dir.join("agrivision.proto");
    tonic_build::compile_protos(proto_file).map_err(|e| {
        eprintln!("Failed to compile protos: {}", e);
        e
    })?;
    Ok(())
}

#[cfg(not(feature = "grpc"))]
fn compile_protos() -> Result<(), Box<dyn std::error::Error>> {
    Ok(())
}
