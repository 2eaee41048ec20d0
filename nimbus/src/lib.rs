//! Atmosphere and cloud renderer: sky radiance, aerial perspective and
//! temporally upsampled volumetric clouds, composited over a scene rendered
//! by the host.
//!
//! The host owns the device and the scene; per frame it calls
//! [`Engine::prepare()`] once and then [`Engine::render_camera()`] for each
//! camera.

mod atmosphere;
mod atmospheres;
mod blur;
mod buffers;
mod camera;
mod camera_controller;
mod camera_controllers;
mod clouds;
mod frustum;
mod noise;
mod passes;
mod raymarch;
mod settings;
mod shaders;
mod sun;
mod temporal;
mod transmittance_lut;
mod utils;

use fxhash::FxHashMap;
use glam::Vec3;
use log::{debug, info, trace, warn};
pub use nimbus_gpu as gpu;

pub use self::atmosphere::*;
pub use self::atmospheres::*;
pub use self::blur::*;
pub use self::buffers::*;
pub use self::camera::*;
pub use self::camera_controller::*;
pub use self::camera_controllers::*;
pub use self::clouds::*;
pub use self::frustum::*;
pub use self::noise::*;
pub use self::passes::*;
pub use self::raymarch::*;
pub use self::settings::*;
pub use self::shaders::*;
pub use self::sun::*;
pub use self::temporal::*;
pub use self::transmittance_lut::*;
pub use self::utils::*;

/// Engine-wide resources shared by all cameras.
#[derive(Clone, Copy, Debug)]
pub struct EngineContext<'a> {
    pub shaders: &'a Shaders,
    pub scene_inputs: &'a SceneInputs,
    pub blue_noise: &'a BlueNoise,
    pub atmosphere_settings: &'a AtmosphereSettings,
}

/// Atmosphere rendered by a camera in the current frame.
#[derive(Clone, Copy, Debug)]
pub struct ActiveAtmosphere<'a> {
    pub atmosphere: &'a Atmosphere,
    pub lut: &'a Texture,

    /// `None` until the atmosphere's lookup table gets read back
    pub lighting: Option<SunLighting>,
}

/// Everything a camera renders in the current frame.
#[derive(Clone, Copy, Debug)]
pub struct CameraFrame<'a> {
    pub atmosphere: Option<ActiveAtmosphere<'a>>,
    pub cloudscape: Option<(&'a Cloudscape, &'a TemporalSettings)>,
    pub cloud_dome: Option<(&'a CloudDome, &'a TemporalSettings)>,
    pub ambient_light: Vec3,
    pub mode: TemporalMode,
}

/// Textures a camera reads from and renders into.
///
/// `scene_color` must be a non-filterable float texture and `scene_depth`
/// a depth texture, both of the camera's viewport size; `output` must have
/// the camera's format.
#[derive(Clone, Copy, Debug)]
pub struct CameraTarget<'a> {
    pub scene_color: &'a wgpu::TextureView,
    pub scene_depth: &'a wgpu::TextureView,
    pub output: &'a wgpu::TextureView,
}

#[derive(Debug)]
pub struct Engine {
    shaders: Shaders,
    scene_inputs: SceneInputs,
    blue_noise: BlueNoise,
    atmosphere_settings: AtmosphereSettings,
    atmospheres: Atmospheres,
    luts: FxHashMap<AtmosphereHandle, TransmittanceLut>,
    cloudscape: Option<Cloudscape>,
    cloudscape_settings: TemporalSettings,
    cloud_dome: Option<CloudDome>,
    cloud_dome_settings: TemporalSettings,
    ambient_light: Vec3,
    cameras: CameraControllers,
}

impl Engine {
    /// Largest push constant block used by the kernels, in bytes.
    pub const PUSH_CONSTANT_SIZE: u32 = 128;

    /// Device features the engine relies on.
    pub fn required_features() -> wgpu::Features {
        wgpu::Features::PUSH_CONSTANTS
            | wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES
    }

    /// Extends given limits with the ones the engine relies on.
    pub fn required_limits(limits: wgpu::Limits) -> wgpu::Limits {
        wgpu::Limits {
            max_push_constant_size: limits
                .max_push_constant_size
                .max(Self::PUSH_CONSTANT_SIZE),
            ..limits
        }
    }

    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shaders: Shaders,
    ) -> Self {
        info!("Initializing");

        let scene_inputs = SceneInputs::new(device);

        let blue_noise =
            BlueNoise::new(device, queue, &BlueNoiseData::default());

        Self {
            shaders,
            scene_inputs,
            blue_noise,
            atmosphere_settings: Default::default(),
            atmospheres: Default::default(),
            luts: Default::default(),
            cloudscape: None,
            cloudscape_settings: Default::default(),
            cloud_dome: None,
            cloud_dome_settings: Default::default(),
            ambient_light: Vec3::ZERO,
            cameras: Default::default(),
        }
    }

    pub fn add_atmosphere(
        &mut self,
        atmosphere: Atmosphere,
    ) -> AtmosphereHandle {
        self.atmospheres.add(atmosphere)
    }

    pub fn update_atmosphere(
        &mut self,
        handle: AtmosphereHandle,
        atmosphere: Atmosphere,
    ) {
        self.atmospheres.update(handle, atmosphere);
    }

    pub fn remove_atmosphere(&mut self, handle: AtmosphereHandle) {
        self.atmospheres.remove(handle);
        self.luts.remove(&handle);
    }

    pub fn atmospheres(&self) -> &Atmospheres {
        &self.atmospheres
    }

    pub fn set_cloudscape(&mut self, cloudscape: Option<Cloudscape>) {
        self.cloudscape = cloudscape;
    }

    pub fn set_cloudscape_settings(&mut self, settings: TemporalSettings) {
        self.cloudscape_settings = settings.sanitized();
    }

    pub fn set_cloud_dome(&mut self, cloud_dome: Option<CloudDome>) {
        self.cloud_dome = cloud_dome;
    }

    pub fn set_cloud_dome_settings(&mut self, settings: TemporalSettings) {
        self.cloud_dome_settings = settings.sanitized();
    }

    pub fn set_ambient_light(&mut self, ambient_light: Vec3) {
        self.ambient_light = ambient_light;
    }

    pub fn set_blue_noise(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &BlueNoiseData,
    ) {
        self.blue_noise = BlueNoise::new(device, queue, data);

        for camera in self.cameras.iter_mut() {
            camera.invalidate_clouds();
        }
    }

    pub fn set_atmosphere_settings(
        &mut self,
        device: &wgpu::Device,
        settings: AtmosphereSettings,
    ) {
        let settings = settings.sanitized();

        if settings == self.atmosphere_settings {
            return;
        }

        debug!("Atmosphere settings changed; rebuilding cameras");

        self.atmosphere_settings = settings;

        let (ctxt, cameras) = self.split();

        for camera in cameras.iter_mut() {
            camera.rebuild(&ctxt, device);
        }
    }

    pub fn create_camera(
        &mut self,
        device: &wgpu::Device,
        camera: Camera,
    ) -> CameraHandle {
        let camera = CameraController::new(&self.context(), device, camera);

        self.cameras.add(camera)
    }

    pub fn update_camera(
        &mut self,
        device: &wgpu::Device,
        handle: CameraHandle,
        camera: Camera,
    ) {
        let (ctxt, cameras) = self.split();

        cameras[handle].update(&ctxt, device, camera);
    }

    pub fn delete_camera(&mut self, handle: CameraHandle) {
        if self.cameras.remove(handle).is_none() {
            warn!("Tried to delete unknown camera: {handle:?}");
        }
    }

    pub fn camera(&self, handle: CameraHandle) -> &CameraController {
        &self.cameras[handle]
    }

    /// Rebuilds lookup tables of atmospheres that have changed since the
    /// last call.
    ///
    /// Rebuilt tables get read back into host memory, which blocks until
    /// the GPU finishes; unchanged atmospheres cost nothing.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<(), wgpu::BufferAsyncError> {
        let dirty = self.atmospheres.dirty();

        if dirty.is_empty() {
            return Ok(());
        }

        debug!("Rebuilding transmittance LUTs: {dirty:?}");

        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("nimbus_transmittance_luts"),
            });

        for &handle in &dirty {
            let Some(atmosphere) = self.atmospheres.get(handle) else {
                continue;
            };

            let shaders = &self.shaders;

            self.luts
                .entry(handle)
                .or_insert_with(|| {
                    TransmittanceLut::new(device, shaders, "atmosphere")
                })
                .render(queue, &mut encoder, atmosphere.serialize());
        }

        queue.submit([encoder.finish()]);

        for handle in dirty {
            if let Some(lut) = self.luts.get(&handle) {
                self.atmospheres.set_lut(handle, lut.read(device, queue)?);
            }
        }

        Ok(())
    }

    /// Returns the sunlight reaching given position; see
    /// [`Atmospheres::sun_lighting()`].
    pub fn sun_lighting(
        &mut self,
        handle: AtmosphereHandle,
        pos: Vec3,
    ) -> Option<SunLighting> {
        self.atmospheres.sun_lighting(handle, pos)
    }

    pub fn evaluate_transmittance(
        &self,
        handle: AtmosphereHandle,
        pos: Vec3,
        dir: Vec3,
    ) -> Option<Vec3> {
        self.atmospheres.evaluate_transmittance(handle, pos, dir)
    }

    /// Renders sky, aerial perspective and clouds over the scene.
    ///
    /// `mode` selects between temporal upsampling and direct, full
    /// resolution rendering (e.g. for reflection probes).
    pub fn render_camera(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        handle: CameraHandle,
        encoder: &mut wgpu::CommandEncoder,
        target: &CameraTarget,
        mode: TemporalMode,
    ) {
        let camera = *self.cameras[handle].camera();

        let visible = self
            .atmospheres
            .find_visible(&camera)
            .map(|(handle, _)| handle);

        let lighting = visible.and_then(|atmosphere| {
            self.atmospheres
                .sun_lighting(atmosphere, camera.position())
        });

        let atmosphere = visible.and_then(|atmosphere| {
            let Some(lut) = self.luts.get(&atmosphere) else {
                trace!("Skipping atmosphere {atmosphere:?}: LUT not ready");
                return None;
            };

            Some(ActiveAtmosphere {
                atmosphere: self.atmospheres.get(atmosphere)?,
                lut: lut.texture(),
                lighting,
            })
        });

        let frame = CameraFrame {
            atmosphere,
            cloudscape: self
                .cloudscape
                .as_ref()
                .map(|cloudscape| (cloudscape, &self.cloudscape_settings)),
            cloud_dome: self
                .cloud_dome
                .as_ref()
                .map(|cloud_dome| (cloud_dome, &self.cloud_dome_settings)),
            ambient_light: self.ambient_light,
            mode,
        };

        let ctxt = EngineContext {
            shaders: &self.shaders,
            scene_inputs: &self.scene_inputs,
            blue_noise: &self.blue_noise,
            atmosphere_settings: &self.atmosphere_settings,
        };

        utils::measure("render_camera", || {
            self.cameras[handle]
                .render(&ctxt, &frame, device, queue, encoder, target);
        });
    }

    fn context(&self) -> EngineContext<'_> {
        EngineContext {
            shaders: &self.shaders,
            scene_inputs: &self.scene_inputs,
            blue_noise: &self.blue_noise,
            atmosphere_settings: &self.atmosphere_settings,
        }
    }

    fn split(&mut self) -> (EngineContext<'_>, &mut CameraControllers) {
        let ctxt = EngineContext {
            shaders: &self.shaders,
            scene_inputs: &self.scene_inputs,
            blue_noise: &self.blue_noise,
            atmosphere_settings: &self.atmosphere_settings,
        };

        (ctxt, &mut self.cameras)
    }
}
