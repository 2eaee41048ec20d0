use glam::{uvec2, uvec3, UVec2, UVec3};
use log::warn;

/// Tunables of the sky and aerial perspective passes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmosphereSettings {
    /// Size of the aerial perspective volume, in voxels
    pub aerial_perspective_size: UVec3,

    /// Raymarching steps per aerial perspective voxel
    pub aerial_perspective_steps: u32,

    /// Size of the sky texture; taller than wide, since most of the detail
    /// lies near the horizon
    pub sky_size: UVec2,

    /// Raymarching steps per sky texel
    pub sky_steps: u32,

    /// How much sample positions get dithered, in `[0, 1]`
    pub dither_strength: f32,

    /// Half of the sky blur's kernel size
    pub sky_blur_half_size: u32,

    pub sky_blur_sigma: f32,
}

impl AtmosphereSettings {
    /// Returns settings with sizes clamped to at least one texel and steps
    /// to at least one sample.
    pub fn sanitized(mut self) -> Self {
        if self.aerial_perspective_size.cmpeq(UVec3::ZERO).any()
            || self.sky_size.cmpeq(UVec2::ZERO).any()
        {
            warn!("Atmosphere settings contain degenerate sizes; clamping");
        }

        self.aerial_perspective_size =
            self.aerial_perspective_size.max(UVec3::ONE);

        self.sky_size = self.sky_size.max(UVec2::ONE);
        self.aerial_perspective_steps = self.aerial_perspective_steps.max(1);
        self.sky_steps = self.sky_steps.max(1);
        self.dither_strength = self.dither_strength.clamp(0.0, 1.0);
        self
    }
}

impl Default for AtmosphereSettings {
    fn default() -> Self {
        Self {
            aerial_perspective_size: uvec3(32, 32, 32),
            aerial_perspective_steps: 8,
            sky_size: uvec2(128, 256),
            sky_steps: 8,
            dither_strength: 0.8,
            sky_blur_half_size: 3,
            sky_blur_sigma: 2.0,
        }
    }
}

/// Tunables of the temporal upsampling used by the cloud renderers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemporalSettings {
    /// Whether clouds get rendered at a quarter of the resolution and
    /// accumulated over multiple frames; when disabled, every frame is
    /// rendered in full
    pub temporal_sampling: bool,

    /// Resolution of the cloud buffers relative to the viewport
    pub resolution_scale: f32,

    /// Upper bound on the cloud buffers' resolution, per axis
    pub max_resolution: u32,

    /// Freezes the accumulation buffer (debugging)
    pub pause_temporal: bool,

    /// Displays motion vectors instead of clouds (debugging)
    pub debug_motion_vectors: bool,

    /// Strength of the blur applied over the final clouds; `0.0` disables it
    pub post_blur: f32,
}

impl TemporalSettings {
    /// Returns settings with the resolution scale clamped to `(0, 1]` and the
    /// blur made non-negative.
    pub fn sanitized(mut self) -> Self {
        let has_valid_scale = self.resolution_scale > 0.0;

        if !has_valid_scale || self.max_resolution == 0 {
            warn!("Temporal settings contain degenerate sizes; clamping");
        }

        self.resolution_scale = if has_valid_scale {
            self.resolution_scale.min(1.0)
        } else {
            Self::default().resolution_scale
        };

        self.max_resolution = self.max_resolution.max(1);
        self.post_blur = self.post_blur.max(0.0);
        self
    }
}

impl Default for TemporalSettings {
    fn default() -> Self {
        Self {
            temporal_sampling: true,
            resolution_scale: 0.5,
            max_resolution: 512,
            pause_temporal: false,
            debug_motion_vectors: false,
            post_blur: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized() {
        let target = AtmosphereSettings {
            aerial_perspective_size: uvec3(0, 16, 16),
            sky_size: uvec2(64, 0),
            sky_steps: 0,
            dither_strength: 2.0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(uvec3(1, 16, 16), target.aerial_perspective_size);
        assert_eq!(uvec2(64, 1), target.sky_size);
        assert_eq!(1, target.sky_steps);
        assert_eq!(1.0, target.dither_strength);

        assert_eq!(
            AtmosphereSettings::default(),
            AtmosphereSettings::default().sanitized()
        );
    }

    #[test]
    fn temporal_sanitized() {
        let target = TemporalSettings {
            resolution_scale: f32::NAN,
            max_resolution: 0,
            post_blur: -1.0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(0.5, target.resolution_scale);
        assert_eq!(1, target.max_resolution);
        assert_eq!(0.0, target.post_blur);

        let target = TemporalSettings {
            resolution_scale: 4.0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(1.0, target.resolution_scale);
    }
}
