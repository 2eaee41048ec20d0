//! Compiles `nimbus-shaders` into one SPIR-V module per entry point.
//!
//! Usage: `nimbus-shader-builder [output-dir]`; modules get written as
//! `<output-dir>/<id>.spv` (e.g. `temporal_upsample.spv`), which is the
//! layout `nimbus::Shaders::from_dir()` expects.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::{env, fs};

use spirv_builder::{Capability, MetadataPrintout, SpirvBuilder};

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let crate_path = manifest_dir
        .parent()
        .ok_or("couldn't find the workspace's root")?
        .join("nimbus-shaders");

    let out_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| manifest_dir.join("../target/shaders"));

    fs::create_dir_all(&out_dir)?;

    let result = SpirvBuilder::new(crate_path, "spirv-unknown-vulkan1.1")
        .multimodule(true)
        .print_metadata(MetadataPrintout::None)
        .capability(Capability::ImageQuery)
        .extra_arg("--spirt-passes=reduce,fuse_selects")
        .build()?;

    for (entry_point, module_path) in result.module.unwrap_multi() {
        let path = out_dir.join(format!("{}.spv", shader_id(entry_point)));

        println!("{entry_point} -> {}", path.display());

        fs::copy(module_path, path)?;
    }

    Ok(())
}

/// Keep in sync with `nimbus::shader_id()`.
fn shader_id(entry_point: &str) -> String {
    let id = entry_point.replace("::", "_");

    match id.strip_suffix("_main") {
        Some(id) => id.to_owned(),
        None => id,
    }
}
