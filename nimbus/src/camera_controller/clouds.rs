use std::marker::PhantomData;

use glam::{uvec2, Vec2, Vec3};
use log::{debug, trace};

use crate::{
    gpu, ActiveAtmosphere, BlueNoise, Camera, CameraBuffers, CloudKernel,
    ComputePass, DensityCurve, EngineContext, FullscreenPass, GaussianBlur,
    MappedUniformBuffer, RaymarchParamsBuilder, TemporalExtent, TemporalFrame,
    TemporalMode, TemporalSettings, TemporalState, TemporalStep,
    TemporalTarget, Texture,
};

/// Everything a cloud layer needs to be rendered for a single frame.
pub struct CloudFrame<'a, K> {
    pub kernel: &'a K,
    pub settings: &'a TemporalSettings,
    pub atmosphere: Option<&'a ActiveAtmosphere<'a>>,
    pub ambient_light: Vec3,
    pub mode: TemporalMode,
}

/// Per-camera renderer of a single cloud layer: raymarches clouds with given
/// kernel, upsamples them temporally and composites them over the camera's
/// output.
#[derive(Debug)]
pub struct CloudPipeline<K> {
    temporal: TemporalState,
    density_curve: Option<DensityCurve>,
    resources: Option<CloudResources>,
    _kernel: PhantomData<K>,
}

impl<K> CloudPipeline<K>
where
    K: CloudKernel,
{
    /// Drops all the buffers together with the temporal history; they'll get
    /// recreated on the next frame.
    pub fn invalidate(&mut self) {
        self.temporal = Default::default();
        self.density_curve = None;
        self.resources = None;
    }

    pub fn temporal(&self) -> &TemporalState {
        &self.temporal
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        ctxt: &EngineContext,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
        buffers: &CameraBuffers,
        frame: CloudFrame<'_, K>,
        scene: &wgpu::BindGroup,
        output: &wgpu::TextureView,
    ) {
        let Some(mut params) = Self::params(camera, &frame) else {
            trace!("Skipping {}: nothing to render", K::LABEL);
            return;
        };

        let Some(world_to_local) = frame
            .kernel
            .world_to_local(frame.atmosphere.map(|atm| atm.atmosphere))
        else {
            return;
        };

        let extent = TemporalExtent::new(
            camera.viewport_size,
            camera.stereo,
            frame.settings,
        );

        let temporal = self.temporal.begin_frame(
            extent,
            frame.mode,
            camera.rotation_view_projection(),
            frame.settings,
        );

        if temporal.resized || self.resources.is_none() {
            self.density_curve = None;
            self.resources = Some(CloudResources::new::<K>(
                ctxt, device, camera, buffers, extent,
            ));
        }

        let Some(resources) = &mut self.resources else {
            return;
        };

        let target_size = match temporal.target() {
            TemporalTarget::LowRes => extent.low,
            TemporalTarget::FullRes => extent.full,
        };

        let noise_jitter = match temporal.target() {
            TemporalTarget::LowRes => {
                BlueNoise::jitter(&mut rand::thread_rng(), target_size)
            }
            TemporalTarget::FullRes => Vec2::ZERO,
        };

        params.d6 = target_size
            .as_vec2()
            .extend(ctxt.blue_noise.size().x as f32)
            .extend(ctxt.blue_noise.size().y as f32);

        params.d7.x = noise_jitter.x;
        params.d7.y = noise_jitter.y;

        *resources.raymarch = RaymarchParamsBuilder::new(camera)
            .with_world_to_local(world_to_local)
            .with_jitter(temporal.jitter)
            .build();

        resources.params.set(params);

        let density_curve = &frame.kernel.layer().density_curve;

        if self.density_curve.as_ref() != Some(density_curve) {
            resources.density_lut.write(
                queue,
                bytemuck::cast_slice(&density_curve.bake()),
            );

            self.density_curve = Some(density_curve.clone());
        }

        resources.params.flush(queue);
        resources.raymarch.flush(queue);
        resources.run(encoder, camera, &temporal, scene);

        if frame.settings.post_blur > 0.0 {
            resources.post_blur.run(
                queue,
                encoder,
                frame.settings.post_blur.ceil() as u32,
                frame.settings.post_blur * 0.3,
                true,
            );
        }

        resources.composite_pass.run(
            encoder,
            output,
            wgpu::LoadOp::Load,
            gpu::CloudCompositePassParams::new(
                camera.viewport_size.as_vec2(),
                extent.full.as_vec2(),
            )
            .with_motion_vectors(temporal.debug_motion_vectors),
            &[],
        );
    }

    /// Prepares the kernel's parameters, except for sizes and jitter (which
    /// depend on the frame); `None` if there's no light to render clouds
    /// with.
    fn params(
        camera: &Camera,
        frame: &CloudFrame<'_, K>,
    ) -> Option<gpu::CloudPassParams> {
        let atmosphere = frame.atmosphere?;
        let sun = atmosphere.atmosphere.sun?;
        let lighting = atmosphere.lighting?;

        let world_to_local =
            frame.kernel.world_to_local(Some(atmosphere.atmosphere))?;

        let mut params = frame.kernel.serialize(Some(atmosphere.atmosphere))?;

        let light_dir = world_to_local
            .transform_vector3(sun.dir_to_sun())
            .normalize_or_zero();

        let light_color = lighting.cloud_light_color(
            atmosphere.atmosphere.overcast,
            atmosphere.atmosphere.overcast_sun_occlusion,
        );

        let (ap_near, ap_far) = atmosphere
            .atmosphere
            .aerial_perspective_clip_planes(camera.position());

        params.d3 = light_dir.extend(1.0);
        params.d4 = light_color.extend(params.d4.w);
        params.d5 = frame.ambient_light.extend(0.0);
        params.d7.z = ap_near;
        params.d7.w = ap_far;
        params.inv_projection = camera.inv_projection();
        params.d9.x = 1.0;
        params.d9.z = camera.viewport_size.x as f32;
        params.d9.w = camera.viewport_size.y as f32;

        Some(params)
    }
}

impl<K> Default for CloudPipeline<K> {
    fn default() -> Self {
        Self {
            temporal: Default::default(),
            density_curve: None,
            resources: None,
            _kernel: PhantomData,
        }
    }
}

#[derive(Debug)]
struct CloudResources {
    extent: TemporalExtent,
    params: MappedUniformBuffer<gpu::CloudPassParams>,
    raymarch: MappedUniformBuffer<gpu::RaymarchParams>,
    density_lut: Texture,
    _low_res: Texture,
    _motion_vectors: Texture,
    accumulation: Texture,
    scratch: Texture,
    low_res_pass: ComputePass,
    full_res_pass: ComputePass,
    motion_vectors_pass: ComputePass<gpu::MotionVectorsPassParams>,
    reproject_pass: ComputePass<gpu::ReprojectPassParams>,
    upsample_pass: ComputePass<gpu::UpsamplePassParams>,
    post_blur: GaussianBlur,
    composite_pass: FullscreenPass<gpu::CloudCompositePassParams>,
}

impl CloudResources {
    fn new<K>(
        ctxt: &EngineContext,
        device: &wgpu::Device,
        camera: &Camera,
        buffers: &CameraBuffers,
        extent: TemporalExtent,
    ) -> Self
    where
        K: CloudKernel,
    {
        let label = K::LABEL;

        debug!(
            "Initializing {label} buffers; low={:?}, full={:?}",
            extent.low, extent.full
        );

        let params = MappedUniformBuffer::new_default(
            device,
            format!("{label}_params"),
        );

        let raymarch = MappedUniformBuffer::new_default(
            device,
            format!("{label}_raymarch"),
        );

        let density_lut = Texture::builder(format!("{label}_density_lut"))
            .with_size(uvec2(gpu::CLOUD_DENSITY_LUT_SIZE, 1))
            .with_format(wgpu::TextureFormat::R32Float)
            .with_usage(wgpu::TextureUsages::COPY_DST)
            .build(device);

        let low_res = Texture::builder(format!("{label}_low_res"))
            .with_size(extent.low)
            .build(device);

        let motion_vectors = Texture::builder(format!("{label}_motion_vectors"))
            .with_size(extent.low)
            .build(device);

        let history_usage =
            wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::COPY_DST;

        let accumulation = Texture::builder(format!("{label}_accumulation"))
            .with_size(extent.full)
            .with_usage(history_usage)
            .build(device);

        let scratch = Texture::builder(format!("{label}_scratch"))
            .with_size(extent.full)
            .with_usage(history_usage)
            .build(device);

        let raymarch_pass = |name: &str, target: &Texture| {
            ComputePass::<()>::builder(format!("{label}_{name}"))
                .bind([
                    &params,
                    &raymarch,
                    &density_lut.bind_readable(),
                    &ctxt.blue_noise.texture().bind_readable(),
                    &buffers.aerial_perspective_luminance.bind_sampled(),
                    &buffers.aerial_perspective_transmittance.bind_sampled(),
                    &target.bind_writable(),
                ])
                .bind_external(ctxt.scene_inputs.layout())
                .build(device, K::shader(ctxt.shaders))
        };

        let low_res_pass = raymarch_pass("low_res", &low_res);
        let full_res_pass = raymarch_pass("full_res", &accumulation);

        let motion_vectors_pass =
            ComputePass::builder(format!("{label}_motion_vectors"))
                .bind([&motion_vectors.bind_writable()])
                .build(device, &ctxt.shaders.motion_vectors);

        let reproject_pass = ComputePass::builder(format!("{label}_reproject"))
            .bind([
                &accumulation.bind_sampled(),
                &motion_vectors.bind_sampled(),
                &low_res.bind_readable(),
                &scratch.bind_writable(),
            ])
            .build(device, &ctxt.shaders.temporal_reproject);

        let upsample_pass = ComputePass::builder(format!("{label}_upsample"))
            .bind([&low_res.bind_readable(), &accumulation.bind_writable()])
            .build(device, &ctxt.shaders.temporal_upsample);

        let post_blur = GaussianBlur::new(
            device,
            ctxt.shaders,
            &format!("{label}_post"),
            &accumulation,
        );

        let composite_pass =
            FullscreenPass::builder(format!("{label}_composite"))
                .bind([
                    &accumulation.bind_sampled(),
                    &motion_vectors.bind_sampled(),
                ])
                .with_blend(wgpu::BlendState {
                    color: wgpu::BlendComponent {
                        src_factor: wgpu::BlendFactor::One,
                        dst_factor: wgpu::BlendFactor::SrcAlpha,
                        operation: wgpu::BlendOperation::Add,
                    },
                    alpha: wgpu::BlendComponent::REPLACE,
                })
                .build(
                    device,
                    &ctxt.shaders.composite_fullscreen_vs,
                    &ctxt.shaders.composite_clouds_fs,
                    camera.format,
                );

        Self {
            extent,
            params,
            raymarch,
            density_lut,
            _low_res: low_res,
            _motion_vectors: motion_vectors,
            accumulation,
            scratch,
            low_res_pass,
            full_res_pass,
            motion_vectors_pass,
            reproject_pass,
            upsample_pass,
            post_blur,
            composite_pass,
        }
    }

    fn run(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        camera: &Camera,
        temporal: &TemporalFrame,
        scene: &wgpu::BindGroup,
    ) {
        let low = self.extent.low;
        let full = self.extent.full;

        for step in &temporal.steps {
            match step {
                TemporalStep::Sample(TemporalTarget::LowRes) => {
                    self.low_res_pass.run_with(
                        encoder,
                        crate::workgroups_2d(low),
                        (),
                        &[scene],
                    );
                }

                TemporalStep::Sample(TemporalTarget::FullRes) => {
                    self.full_res_pass.run_with(
                        encoder,
                        crate::workgroups_2d(full),
                        (),
                        &[scene],
                    );
                }

                TemporalStep::MotionVectors => {
                    let params = gpu::MotionVectorsPassParams {
                        curr_inv_view_proj: camera
                            .rotation_view_projection()
                            .inverse(),
                        prev_view_proj: temporal.prev_view_proj,
                    };

                    self.motion_vectors_pass.run(
                        encoder,
                        crate::workgroups_2d(low),
                        params,
                    );
                }

                TemporalStep::Reproject => {
                    let params = gpu::ReprojectPassParams::new(
                        full,
                        low,
                        temporal.has_history,
                    );

                    self.reproject_pass.run(
                        encoder,
                        crate::workgroups_2d(full),
                        params,
                    );

                    self.scratch.copy_to(encoder, &self.accumulation);
                }

                TemporalStep::UpsampleInsert => {
                    self.upsample_pass.run(
                        encoder,
                        crate::workgroups_2d(low),
                        gpu::UpsamplePassParams::new(temporal.phase, low),
                    );
                }
            }
        }
    }
}
