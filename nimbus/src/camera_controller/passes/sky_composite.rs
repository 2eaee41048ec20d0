use crate::{Camera, CameraBuffers, EngineContext, FullscreenPass};

/// Composites the sky and aerial perspective over the scene; when there's
/// no atmosphere to composite, copies the scene as-is.
#[derive(Debug)]
pub struct SkyCompositePass {
    pass: FullscreenPass,
}

impl SkyCompositePass {
    pub fn new(
        ctxt: &EngineContext,
        device: &wgpu::Device,
        camera: &Camera,
        buffers: &CameraBuffers,
    ) -> Self {
        let pass = FullscreenPass::builder("sky_composite")
            .bind([
                &buffers.sky_composite,
                &buffers.sky.bind_sampled(),
                &buffers.aerial_perspective_luminance.bind_sampled(),
                &buffers.aerial_perspective_transmittance.bind_sampled(),
            ])
            .bind_external(ctxt.scene_inputs.layout())
            .build(
                device,
                &ctxt.shaders.composite_fullscreen_vs,
                &ctxt.shaders.composite_sky_fs,
                camera.format,
            );

        Self { pass }
    }

    pub fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        scene: &wgpu::BindGroup,
    ) {
        self.pass.run(
            encoder,
            output,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            (),
            &[scene],
        );
    }
}
