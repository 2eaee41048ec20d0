use glam::{vec3, Vec3};

/// Directional light illuminating an atmosphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sun {
    /// Direction in which the light travels (i.e. pointing away from the
    /// sun)
    pub direction: Vec3,

    /// Linear color, before being dimmed by the atmosphere
    pub base_color: Vec3,

    pub base_intensity: f32,
}

impl Sun {
    /// Direction towards the sun.
    pub fn dir_to_sun(&self) -> Vec3 {
        (-self.direction).normalize_or_zero()
    }

    /// Color premultiplied by intensity, as seen from outside of the
    /// atmosphere.
    pub fn radiance(&self) -> Vec3 {
        self.base_color * self.base_intensity
    }
}

impl Default for Sun {
    fn default() -> Self {
        Self {
            direction: vec3(0.0, -1.0, 0.0),
            base_color: Vec3::ONE,
            base_intensity: 1.0,
        }
    }
}

/// Sunlight as it reaches the camera, after being dimmed by the atmosphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunLighting {
    /// Occluded color (not premultiplied by intensity)
    pub color: Vec3,

    pub intensity: f32,

    /// Whether enough light makes it through for the light to be worth
    /// enabling
    pub enabled: bool,

    /// Whether the sun has rotated enough since the last time ambient
    /// lighting was refreshed for it to be worth refreshing again
    pub ambient_dirty: bool,
}

impl SunLighting {
    /// Below this, the light is considered to be off.
    pub const ENABLED_THRESHOLD: f32 = 0.001;

    pub fn new(color: Vec3, intensity: f32, ambient_dirty: bool) -> Self {
        Self {
            color,
            intensity,
            enabled: color.max_element() * intensity
                > Self::ENABLED_THRESHOLD,
            ambient_dirty,
        }
    }

    /// Returns the light color for cloud kernels: occluded color premultiplied
    /// by intensity, with the overcast dimming undone, since clouds
    /// themselves are the overcast.
    pub fn cloud_light_color(
        &self,
        overcast: f32,
        overcast_sun_occlusion: f32,
    ) -> Vec3 {
        let dimming = 1.0 + (overcast_sun_occlusion - 1.0) * overcast;

        self.color * self.intensity / dimming.max(nimbus_gpu::NIMBUS_EPSILON)
    }
}

/// Remembers the sun's direction, reporting when it rotates by more than a
/// threshold.
#[derive(Clone, Copy, Debug, Default)]
pub struct SunTracker {
    last_dir: Option<Vec3>,
}

impl SunTracker {
    /// Rotation (in degrees) after which ambient lighting gets dirty.
    pub const ROTATION_THRESHOLD: f32 = 1.0;

    /// Observes the sun's current direction, returning whether it has
    /// rotated past the threshold since it was last reported.
    pub fn update(&mut self, dir: Vec3) -> bool {
        let dir = dir.normalize_or_zero();

        let rotated = match self.last_dir {
            Some(last_dir) => {
                let cos = last_dir.dot(dir).clamp(-1.0, 1.0);

                cos.acos().to_degrees() > Self::ROTATION_THRESHOLD
            }
            None => true,
        };

        if rotated {
            self.last_dir = Some(dir);
        }

        rotated
    }
}
