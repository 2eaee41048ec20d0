use std::path::Path;
use std::{fs, io};

use log::debug;

macro_rules! shaders {
    ([ $( $name:ident => $entry_point:literal, )* ]) => {
        /// Compiled kernels, one SPIR-V module per entry point.
        ///
        /// Modules are loaded by their id (e.g. `temporal_upsample`), as
        /// produced by `nimbus-shader-builder`.
        #[derive(Debug)]
        pub struct Shaders {
            $( pub $name: (wgpu::ShaderModule, &'static str), )*
        }

        impl Shaders {
            /// Ids and entry points of all the modules, in the order they
            /// get loaded.
            pub const MODULES: &'static [(&'static str, &'static str)] = &[
                $( (stringify!($name), $entry_point), )*
            ];

            /// Creates shader modules from SPIR-V returned by `load`, which
            /// gets called once per module id.
            pub fn new(
                device: &wgpu::Device,
                mut load: impl FnMut(&str) -> io::Result<Vec<u8>>,
            ) -> io::Result<Self> {
                Ok(Self {
                    $(
                        $name: (
                            Self::create(
                                device,
                                stringify!($name),
                                &load(stringify!($name))?,
                            )?,
                            $entry_point,
                        ),
                    )*
                })
            }
        }
    };
}

shaders!([
    aerial_perspective => "aerial_perspective::main",
    blur => "blur::main",
    cloud_dome => "cloud_dome::main",
    cloudscape => "cloudscape::main",
    composite_clouds_fs => "composite::clouds_fs",
    composite_fullscreen_vs => "composite::fullscreen_vs",
    composite_sky_fs => "composite::sky_fs",
    motion_vectors => "motion_vectors::main",
    sky => "sky::main",
    sky_mips => "sky_mips::main",
    temporal_reproject => "temporal::reproject",
    temporal_upsample => "temporal::upsample",
    transmittance_lut => "transmittance_lut::main",
]);

impl Shaders {
    /// Loads modules from `<dir>/<id>.spv` files.
    pub fn from_dir(
        device: &wgpu::Device,
        dir: impl AsRef<Path>,
    ) -> io::Result<Self> {
        let dir = dir.as_ref();

        Self::new(device, |id| {
            let path = dir.join(format!("{id}.spv"));

            debug!("Loading shader: {}", path.display());

            fs::read(&path).map_err(|err| {
                io::Error::new(
                    err.kind(),
                    format!("couldn't read `{}`: {err}", path.display()),
                )
            })
        })
    }

    fn create(
        device: &wgpu::Device,
        id: &str,
        spirv: &[u8],
    ) -> io::Result<wgpu::ShaderModule> {
        if spirv.len() % 4 != 0 || spirv.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("shader `{id}` is not a valid SPIR-V module"),
            ));
        }

        let label = format!("nimbus_{id}");

        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::util::make_spirv(spirv),
        }))
    }
}

/// Converts a kernel's entry point (e.g. `temporal::upsample`) into the id of
/// the module it gets compiled into (e.g. `temporal_upsample`).
pub fn shader_id(entry_point: &str) -> String {
    let id = entry_point.replace("::", "_");

    match id.strip_suffix("_main") {
        Some(id) => id.to_owned(),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_ids_match_entry_points() {
        for (id, entry_point) in Shaders::MODULES {
            assert_eq!(*id, shader_id(entry_point));
        }
    }

    #[test]
    fn shader_ids() {
        assert_eq!("sky", shader_id("sky::main"));
        assert_eq!("composite_sky_fs", shader_id("composite::sky_fs"));
    }
}
