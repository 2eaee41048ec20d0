use glam::{uvec4, UVec4};

use crate::{
    Camera, CameraBuffers, ComputePass, EngineContext, GaussianBlur,
};

/// Renders the sky into a small texture, blurs it and generates its mips.
#[derive(Debug)]
pub struct SkyPass {
    pass: ComputePass,
    blur: GaussianBlur,

    /// One pass per mip level, starting from the second one; each pass
    /// downsamples the previous level
    mip_passes: Vec<ComputePass<UVec4>>,
}

impl SkyPass {
    pub fn new(
        ctxt: &EngineContext,
        device: &wgpu::Device,
        _: &Camera,
        buffers: &CameraBuffers,
    ) -> Self {
        let pass = ComputePass::builder("sky")
            .bind([
                &buffers.atmosphere,
                &buffers.raymarch,
                &buffers.sky_params,
                &buffers.transmittance_lut.bind_readable(),
                &buffers.sky.bind_writable(),
            ])
            .build(device, &ctxt.shaders.sky);

        let blur = GaussianBlur::new(device, ctxt.shaders, "sky", &buffers.sky);

        let mip_passes = (1..buffers.sky.mip_level_count())
            .map(|mip| {
                ComputePass::builder(format!("sky_mip{mip}"))
                    .bind([
                        &buffers.sky.bind_mip_writable(mip - 1),
                        &buffers.sky.bind_mip_writable(mip),
                    ])
                    .build(device, &ctxt.shaders.sky_mips)
            })
            .collect();

        Self {
            pass,
            blur,
            mip_passes,
        }
    }

    pub fn run(
        &mut self,
        ctxt: &EngineContext,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        buffers: &CameraBuffers,
    ) {
        let settings = ctxt.atmosphere_settings;

        self.pass.run(
            encoder,
            crate::workgroups_2d(buffers.sky.mip_size(0)),
            (),
        );

        self.blur.run(
            queue,
            encoder,
            settings.sky_blur_half_size,
            settings.sky_blur_sigma,
            true,
        );

        for (mip, pass) in (1..).zip(&self.mip_passes) {
            let src = buffers.sky.mip_size(mip - 1);
            let dst = buffers.sky.mip_size(mip);

            pass.run(
                encoder,
                crate::workgroups_2d(dst),
                uvec4(dst.x, dst.y, src.x, src.y),
            );
        }
    }
}
