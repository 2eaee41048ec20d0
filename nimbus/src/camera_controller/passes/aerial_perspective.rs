use crate::{gpu, Camera, CameraBuffers, ComputePass, EngineContext};

#[derive(Debug)]
pub struct AerialPerspectivePass {
    pass: ComputePass<gpu::AerialPerspectiveParams>,
}

impl AerialPerspectivePass {
    pub fn new(
        ctxt: &EngineContext,
        device: &wgpu::Device,
        _: &Camera,
        buffers: &CameraBuffers,
    ) -> Self {
        let pass = ComputePass::builder("aerial_perspective")
            .bind([
                &buffers.atmosphere,
                &buffers.raymarch,
                &buffers.sky_params,
                &buffers.transmittance_lut.bind_readable(),
                &buffers.aerial_perspective_luminance.bind_writable(),
                &buffers.aerial_perspective_transmittance.bind_writable(),
            ])
            .build(device, &ctxt.shaders.aerial_perspective);

        Self { pass }
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        params: gpu::AerialPerspectiveParams,
    ) {
        self.pass
            .run(encoder, crate::workgroups_3d(params.size()), params);
    }
}
