use std::error::Error;
use std::path::PathBuf;

use spirv_builder::{MetadataPrintout, SpirvBuilder};

const SHADERS: [(&str, &str); 2] = [
    ("fullscreen_vertex", "FULLSCREEN_VERTEX_SPV"),
    ("textured_fragment", "TEXTURED_FRAGMENT_SPV"),
];

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let shaders_dir = manifest_dir.join("..");
    println!("cargo:rerun-if-changed=./rust_shader_builder");
    println!("cargo:rerun-if-changed=../../crates/shader_objects");
    for (shader, env_name) in SHADERS {
        println!("cargo:rerun-if-changed=../shaders/{}", shader);
        let module_path = SpirvBuilder::new(
            shaders_dir.join("shaders").join(shader),
            "spirv-unknown-vulkan1.1",
        )
        .print_metadata(MetadataPrintout::None)
        .build()?
        .module
        .unwrap_single()
        .to_path_buf();

        let dest = shaders_dir.join(format!("{}.spv", shader));
        std::fs::copy(&module_path, &dest)?;
        println!("cargo:rustc-env={}={}", env_name, dest.display());
    }
    Ok(())
}
