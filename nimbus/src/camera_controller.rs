mod buffers;
mod clouds;
mod passes;

use glam::{vec4, Vec4};
use log::{debug, info};

pub use self::buffers::*;
pub use self::clouds::*;
pub use self::passes::*;
use crate::{
    gpu, Camera, CameraFrame, CameraTarget, CloudDome, Cloudscape,
    EngineContext, RaymarchParamsBuilder, ViewRect,
};

#[derive(Debug)]
pub struct CameraController {
    camera: Camera,
    buffers: CameraBuffers,
    passes: CameraPasses,
    cloud_dome: CloudPipeline<CloudDome>,
    cloudscape: CloudPipeline<Cloudscape>,
}

impl CameraController {
    pub(crate) fn new(
        ctxt: &EngineContext,
        device: &wgpu::Device,
        camera: Camera,
    ) -> Self {
        info!("Creating camera: {}", camera.describe());

        let buffers =
            CameraBuffers::new(device, &camera, ctxt.atmosphere_settings);

        let passes = CameraPasses::new(ctxt, device, &camera, &buffers);

        debug!("Camera created");

        Self {
            camera,
            buffers,
            passes,
            cloud_dome: Default::default(),
            cloudscape: Default::default(),
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn cloud_dome(&self) -> &CloudPipeline<CloudDome> {
        &self.cloud_dome
    }

    pub fn cloudscape(&self) -> &CloudPipeline<Cloudscape> {
        &self.cloudscape
    }

    pub fn update(
        &mut self,
        ctxt: &EngineContext,
        device: &wgpu::Device,
        camera: Camera,
    ) {
        let needs_rebuilding = self.camera.is_invalidated_by(&camera);

        self.camera = camera;

        if needs_rebuilding {
            self.rebuild(ctxt, device);
        }
    }

    /// Recreates all the buffers and passes, e.g. after settings have
    /// changed.
    pub(crate) fn rebuild(
        &mut self,
        ctxt: &EngineContext,
        device: &wgpu::Device,
    ) {
        debug!("Rebuilding camera: {}", self.camera.describe());

        self.buffers = CameraBuffers::new(
            device,
            &self.camera,
            ctxt.atmosphere_settings,
        );

        self.passes =
            CameraPasses::new(ctxt, device, &self.camera, &self.buffers);

        self.invalidate_clouds();
    }

    /// Drops cloud buffers, e.g. after the blue noise has changed.
    pub(crate) fn invalidate_clouds(&mut self) {
        self.cloud_dome.invalidate();
        self.cloudscape.invalidate();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        ctxt: &EngineContext,
        frame: &CameraFrame,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &CameraTarget,
    ) {
        let scene = ctxt.scene_inputs.bind(
            device,
            target.scene_color,
            target.scene_depth,
        );

        let aerial_perspective = self.prepare_sky(ctxt, frame);

        self.buffers.flush(queue);

        if let (Some(atmosphere), Some(aerial_perspective)) =
            (&frame.atmosphere, aerial_perspective)
        {
            atmosphere
                .lut
                .copy_to(encoder, &self.buffers.transmittance_lut);

            self.passes.sky.run(ctxt, queue, encoder, &self.buffers);

            self.passes
                .aerial_perspective
                .run(encoder, aerial_perspective);
        }

        self.passes
            .sky_composite
            .run(encoder, target.output, &scene);

        if let Some((kernel, settings)) = frame.cloud_dome {
            self.cloud_dome.render(
                ctxt,
                device,
                queue,
                encoder,
                &self.camera,
                &self.buffers,
                CloudFrame {
                    kernel,
                    settings,
                    atmosphere: frame.atmosphere.as_ref(),
                    ambient_light: frame.ambient_light,
                    mode: frame.mode,
                },
                &scene,
                target.output,
            );
        }

        if let Some((kernel, settings)) = frame.cloudscape {
            self.cloudscape.render(
                ctxt,
                device,
                queue,
                encoder,
                &self.camera,
                &self.buffers,
                CloudFrame {
                    kernel,
                    settings,
                    atmosphere: frame.atmosphere.as_ref(),
                    ambient_light: frame.ambient_light,
                    mode: frame.mode,
                },
                &scene,
                target.output,
            );
        }
    }

    /// Fills the sky's uniforms; returns parameters of the aerial
    /// perspective pass, or `None` if there's no sky to render.
    fn prepare_sky(
        &mut self,
        ctxt: &EngineContext,
        frame: &CameraFrame,
    ) -> Option<gpu::AerialPerspectiveParams> {
        let camera = &self.camera;
        let settings = ctxt.atmosphere_settings;
        let viewport_size = camera.viewport_size.as_vec2();

        let view_bounds = gpu::SkyCompositePassParams::encode_view_bounds(
            ViewRect::FULL.min,
            ViewRect::FULL.max,
        );

        let passthrough = gpu::SkyCompositePassParams {
            inv_projection: camera.inv_projection(),
            camera_to_world: camera.camera_to_world(),
            view_bounds,
            planet: vec4(0.0, 0.0, 0.0, -1.0),
            d0: vec4(0.0, 0.0, viewport_size.x, viewport_size.y),
        };

        let Some(atmosphere) = &frame.atmosphere else {
            self.buffers.sky_composite.set(passthrough);
            return None;
        };

        let atmosphere = atmosphere.atmosphere;

        let Some(light) = atmosphere.scattering_light() else {
            self.buffers.sky_composite.set(passthrough);
            return None;
        };

        let pos = camera.position();
        let (near, far) = atmosphere.aerial_perspective_clip_planes(pos);

        self.buffers.atmosphere.set(atmosphere.serialize());

        self.buffers.raymarch.set(
            RaymarchParamsBuilder::new(camera)
                .with_world_to_local(atmosphere.world_to_local())
                .build(),
        );

        self.buffers.sky_params.set(gpu::SkyPassParams::new(
            light,
            atmosphere.overcast,
            settings.dither_strength,
            settings.sky_size,
            settings.sky_steps,
        ));

        self.buffers.sky_composite.set(gpu::SkyCompositePassParams {
            planet: (atmosphere.center - pos)
                .normalize_or_zero()
                .extend(atmosphere.angular_size(pos)),
            d0: Vec4::new(near, far, viewport_size.x, viewport_size.y),
            ..passthrough
        });

        Some(
            gpu::AerialPerspectiveParams::new(
                settings.aerial_perspective_size,
                settings.aerial_perspective_steps,
                near,
                far,
            )
            .with_strength(atmosphere.parameters.aerial_perspective_strength),
        )
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        info!("Deleting camera: {}", self.camera.describe());
    }
}
