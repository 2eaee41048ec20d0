use std::sync::mpsc;

use glam::{uvec2, UVec2, Vec3, Vec4};
use log::debug;

use crate::{
    gpu, utils, ComputePass, MappedUniformBuffer, Shaders, Texture,
};

/// Host-side copy of a transmittance lookup table.
///
/// Used to tint the sun as seen from the camera; since it's refreshed only
/// when the atmosphere changes, sampling it never touches the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct TransmittanceLutData {
    size: UVec2,
    texels: Vec<Vec4>,
}

impl TransmittanceLutData {
    /// Evaluates the table on the CPU, running the same code the kernel runs.
    pub fn compute(params: &gpu::AtmosphereParams) -> Self {
        let size = gpu::TransmittanceLut::SIZE;

        let texels = (0..size.y)
            .flat_map(|y| (0..size.x).map(move |x| uvec2(x, y)))
            .map(|texel| {
                gpu::TransmittanceLut::eval(params, texel, size).extend(1.0)
            })
            .collect();

        Self { size, texels }
    }

    /// Decodes rows of `Rgba32Float` texels; `bytes_per_row` can be larger
    /// than the row itself (as is the case for padded GPU readbacks).
    pub fn from_bytes(size: UVec2, bytes: &[u8], bytes_per_row: usize) -> Self {
        let row_len = size.x as usize * 16;

        let texels = (0..size.y as usize)
            .flat_map(|y| {
                let row = &bytes[y * bytes_per_row..][..row_len];

                row.chunks_exact(16)
                    .map(bytemuck::pod_read_unaligned::<Vec4>)
            })
            .collect();

        Self { size, texels }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Returns given texel, clamping coordinates to the table's edges.
    pub fn fetch(&self, texel: UVec2) -> Vec4 {
        let texel = texel.min(self.size - UVec2::ONE);

        self.texels[(texel.y * self.size.x + texel.x) as usize]
    }

    /// Looks up the transmittance for given position and direction, both in
    /// the atmosphere's local space.
    pub fn sample(
        &self,
        params: &gpu::AtmosphereParams,
        pos: Vec3,
        dir: Vec3,
    ) -> Vec3 {
        gpu::TransmittanceLut::sample(params, self.size, pos, dir, |texel| {
            self.fetch(texel)
        })
    }
}

/// Transmittance lookup table, as stored on the GPU.
#[derive(Debug)]
pub struct TransmittanceLut {
    params: MappedUniformBuffer<gpu::AtmosphereParams>,
    texture: Texture,
    pass: ComputePass,
}

impl TransmittanceLut {
    pub fn new(device: &wgpu::Device, shaders: &Shaders, label: &str) -> Self {
        let params = MappedUniformBuffer::new_default(
            device,
            format!("{label}_transmittance_lut_params"),
        );

        let texture = Texture::builder(format!("{label}_transmittance_lut"))
            .with_size(gpu::TransmittanceLut::SIZE)
            .with_format(wgpu::TextureFormat::Rgba32Float)
            .with_usage(
                wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST,
            )
            .build(device);

        let pass = ComputePass::builder("transmittance_lut")
            .bind([&params, &texture.bind_writable()])
            .build(device, &shaders.transmittance_lut);

        Self {
            params,
            texture,
            pass,
        }
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        params: gpu::AtmosphereParams,
    ) {
        self.params.set(params);
        self.params.flush(queue);

        self.pass.run(
            encoder,
            crate::workgroups_2d(gpu::TransmittanceLut::SIZE),
            (),
        );
    }

    /// Downloads the table into host memory.
    ///
    /// This blocks until the GPU finishes all the work submitted so far, so
    /// it must be called only when the table changes, never per frame.
    pub fn read(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<TransmittanceLutData, wgpu::BufferAsyncError> {
        utils::measure("transmittance_lut_readback", || {
            self.read_blocking(device, queue)
        })
    }

    fn read_blocking(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<TransmittanceLutData, wgpu::BufferAsyncError> {
        let size = self.texture.size().truncate();
        let bytes_per_row = padded_bytes_per_row(size.x * 16);

        debug!("Reading transmittance LUT; size={size:?}");

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("nimbus_transmittance_lut_readback"),
            size: (bytes_per_row * size.y) as _,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nimbus_transmittance_lut_readback"),
            });

        encoder.copy_texture_to_buffer(
            self.texture.tex().as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(size.y),
                },
            },
            self.texture.extent(),
        );

        queue.submit([encoder.finish()]);

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();

        slice.map_async(wgpu::MapMode::Read, move |result| {
            _ = tx.send(result);
        });

        device.poll(wgpu::Maintain::Wait);

        rx.recv().unwrap_or(Err(wgpu::BufferAsyncError))?;

        let data = TransmittanceLutData::from_bytes(
            size,
            &slice.get_mapped_range(),
            bytes_per_row as usize,
        );

        buffer.unmap();

        Ok(data)
    }
}

/// Rounds given row size up to what texture-to-buffer copies require.
fn padded_bytes_per_row(bytes_per_row: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

    bytes_per_row.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{vec2, vec3, Vec4Swizzles};

    use super::*;
    use crate::AtmosphereParameters;

    fn params() -> gpu::AtmosphereParams {
        AtmosphereParameters {
            mie_coefficient: 0.5,
            ..Default::default()
        }
        .serialize(2.0, 2.5)
    }

    #[test]
    fn from_bytes() {
        let size = uvec2(2, 2);
        let mut bytes = vec![0u8; 2 * 256];

        for (texel, value) in [
            (uvec2(0, 0), 1.0f32),
            (uvec2(1, 0), 2.0),
            (uvec2(0, 1), 3.0),
            (uvec2(1, 1), 4.0),
        ] {
            let offset = texel.y as usize * 256 + texel.x as usize * 16;
            let value = Vec4::splat(value);

            bytes[offset..][..16].copy_from_slice(bytemuck::bytes_of(&value));
        }

        let target = TransmittanceLutData::from_bytes(size, &bytes, 256);

        assert_eq!(Vec4::splat(1.0), target.fetch(uvec2(0, 0)));
        assert_eq!(Vec4::splat(2.0), target.fetch(uvec2(1, 0)));
        assert_eq!(Vec4::splat(3.0), target.fetch(uvec2(0, 1)));
        assert_eq!(Vec4::splat(4.0), target.fetch(uvec2(1, 1)));
        assert_eq!(Vec4::splat(4.0), target.fetch(uvec2(5, 5)));
    }

    #[test]
    fn padded_bytes_per_row() {
        assert_eq!(256, super::padded_bytes_per_row(16));
        assert_eq!(1024, super::padded_bytes_per_row(1024));
        assert_eq!(1280, super::padded_bytes_per_row(1025));
    }

    #[test]
    fn sample_reproduces_texel_centers() {
        let params = params();
        let target = TransmittanceLutData::compute(&params);

        for texel in [uvec2(10, 5), uvec2(11, 5), uvec2(10, 6), uvec2(11, 6)] {
            let uv = gpu::TransmittanceLut::texel_uv(texel, target.size());
            let (pos, dir) = gpu::TransmittanceLut::decode(&params, uv);

            assert_relative_eq!(
                target.fetch(texel).xyz(),
                target.sample(&params, pos, dir),
                epsilon = 0.0001
            );
        }
    }

    #[test]
    fn transmittance_decreases_towards_horizon() {
        let params = params();
        let target = TransmittanceLutData::compute(&params);
        let pos = vec3(0.0, 2.1, 0.0);

        let up = target.sample(&params, pos, vec3(0.0, 1.0, 0.0));
        let tilted = target.sample(&params, pos, vec3(0.6, 0.8, 0.0));
        let horizon = target.sample(&params, pos, vec3(1.0, 0.0, 0.0));

        assert!(up.cmpge(tilted).all());
        assert!(tilted.cmpge(horizon).all());
        assert!(up.x > up.z, "red should get through more than blue");

        // Looking straight into the planet
        let down = target.sample(&params, pos, vec3(0.0, -1.0, 0.0));

        assert_relative_eq!(Vec3::ZERO, down, epsilon = 0.0001);
    }

    #[test]
    fn size() {
        let target = TransmittanceLutData::compute(&params());

        assert_eq!(gpu::TransmittanceLut::SIZE, target.size());
        assert_eq!(vec2(64.0, 64.0), target.size().as_vec2());
    }
}
