use log::debug;

use crate::{gpu, AtmosphereSettings, Camera, MappedUniformBuffer, Texture};

#[derive(Debug)]
pub struct CameraBuffers {
    pub atmosphere: MappedUniformBuffer<gpu::AtmosphereParams>,
    pub raymarch: MappedUniformBuffer<gpu::RaymarchParams>,
    pub sky_params: MappedUniformBuffer<gpu::SkyPassParams>,
    pub sky_composite: MappedUniformBuffer<gpu::SkyCompositePassParams>,

    /// Copy of the rendered atmosphere's transmittance lookup table; copied
    /// each frame, so that passes don't have to be rebuilt when another
    /// atmosphere becomes visible
    pub transmittance_lut: Texture,

    pub sky: Texture,
    pub aerial_perspective_luminance: Texture,
    pub aerial_perspective_transmittance: Texture,
}

impl CameraBuffers {
    pub fn new(
        device: &wgpu::Device,
        camera: &Camera,
        settings: &AtmosphereSettings,
    ) -> Self {
        debug!("Initializing camera buffers: {}", camera.describe());

        let atmosphere =
            MappedUniformBuffer::new_default(device, "camera_atmosphere");

        let raymarch =
            MappedUniformBuffer::new_default(device, "camera_sky_raymarch");

        let sky_params =
            MappedUniformBuffer::new_default(device, "camera_sky_params");

        let sky_composite =
            MappedUniformBuffer::new_default(device, "camera_sky_composite");

        let transmittance_lut = Texture::builder("camera_transmittance_lut")
            .with_size(gpu::TransmittanceLut::SIZE)
            .with_format(wgpu::TextureFormat::Rgba32Float)
            .with_usage(wgpu::TextureUsages::COPY_DST)
            .build(device);

        let sky = Texture::builder("camera_sky")
            .with_size(settings.sky_size)
            .with_mips()
            .build(device);

        let aerial_perspective_luminance =
            Texture::builder("camera_aerial_perspective_luminance")
                .with_size_3d(settings.aerial_perspective_size)
                .build(device);

        let aerial_perspective_transmittance =
            Texture::builder("camera_aerial_perspective_transmittance")
                .with_size_3d(settings.aerial_perspective_size)
                .build(device);

        Self {
            atmosphere,
            raymarch,
            sky_params,
            sky_composite,
            transmittance_lut,
            sky,
            aerial_perspective_luminance,
            aerial_perspective_transmittance,
        }
    }

    pub fn flush(&mut self, queue: &wgpu::Queue) {
        self.atmosphere.flush(queue);
        self.raymarch.flush(queue);
        self.sky_params.flush(queue);
        self.sky_composite.flush(queue);
    }
}
