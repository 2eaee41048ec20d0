use bytemuck::{Pod, Zeroable};
use glam::{uvec4, vec4, UVec3, UVec4, Vec3, Vec4, Vec4Swizzles};

use crate::{
    AtmosphereParams, F32Ext, RaymarchParams, Scattering, ScatteringLight,
};

/// Describes the aerial perspective volume: a grid of screen-space columns
/// split into linearly spaced depth slices between the near and the far
/// plane.
///
/// Depth here is the distance along the camera ray, not the view-space z.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct AerialPerspectiveParams {
    /// xyz - size of the volume, in voxels
    /// w - raymarching steps per voxel
    pub d0: UVec4,

    /// x - near plane
    /// y - far plane
    /// z - strength
    pub d1: Vec4,
}

impl AerialPerspectiveParams {
    pub fn new(size: UVec3, steps: u32, near: f32, far: f32) -> Self {
        Self {
            d0: uvec4(size.x, size.y, size.z, steps),
            d1: vec4(near, far, 1.0, 0.0),
        }
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.d1.z = strength;
        self
    }

    /// Computes the depth range covered by the volume for a camera placed
    /// `camera_dist` away from the planet's center.
    ///
    /// Returns `(near, far)`; the near plane is where the camera ray enters
    /// the atmosphere (zero when the camera is already inside it) and the far
    /// plane is where it leaves it on the other side, limited by
    /// `max_dist`.
    pub fn clip_planes(
        camera_dist: f32,
        atmosphere_radius: f32,
        max_dist: f32,
    ) -> (f32, f32) {
        let near = (camera_dist - atmosphere_radius).max(0.0);
        let far = max_dist.min(near.max(camera_dist + atmosphere_radius));

        (near, far)
    }

    pub fn size(&self) -> UVec3 {
        self.d0.xyz()
    }

    pub fn steps(&self) -> u32 {
        self.d0.w.max(1)
    }

    pub fn near(&self) -> f32 {
        self.d1.x
    }

    pub fn far(&self) -> f32 {
        self.d1.y
    }

    pub fn strength(&self) -> f32 {
        self.d1.z
    }

    /// Returns the depth represented by the center of given slice.
    pub fn slice_depth(&self, slice: u32) -> f32 {
        let depth = self.size().z.max(1) as f32;
        let w = ((slice as f32) + 0.5) / depth;

        self.near() + w * (self.far() - self.near())
    }

    /// Converts depth into the volume's w coordinate, clamped to `[0, 1]`;
    /// inverse of [`Self::slice_depth()`].
    pub fn depth_to_w(&self, depth: f32) -> f32 {
        depth.inverse_lerp(self.near(), self.far())
    }

    /// Raymarches given voxel: integrates the atmosphere from the camera up
    /// to the voxel's slice along the voxel's column.
    pub fn eval(
        &self,
        atmosphere: &AtmosphereParams,
        raymarch: &RaymarchParams,
        voxel: UVec3,
        light: ScatteringLight,
        overcast: f32,
        sun_transmittance: impl Fn(Vec3, Vec3) -> Vec3,
    ) -> Scattering {
        let ray = raymarch.ray(voxel.truncate(), self.size().truncate());
        let (start, end) = atmosphere.segment(ray);
        let t_end = end.min(self.slice_depth(voxel.z));

        if t_end <= start {
            return Scattering::EMPTY;
        }

        let scattering = Scattering::raymarch(
            atmosphere,
            ray,
            start,
            t_end,
            self.steps(),
            0.5,
            light,
            overcast,
            sun_transmittance,
        );

        self.apply_strength(scattering)
    }

    /// Scales the effect of given scattering by the configured strength.
    pub fn apply_strength(&self, scattering: Scattering) -> Scattering {
        let strength = self.strength().max(0.0);

        Scattering {
            luminance: scattering.luminance * strength,
            transmittance: Vec3::ONE.lerp(
                scattering.transmittance,
                strength.saturate(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec3, vec3};

    use super::*;

    #[test]
    fn clip_planes_outside_atmosphere() {
        let (near, far) =
            AerialPerspectiveParams::clip_planes(10.0, 2.5, 1000.0);

        assert_relative_eq!(7.5, near);
        assert_relative_eq!(12.5, far);
    }

    #[test]
    fn clip_planes_inside_atmosphere() {
        let (near, far) =
            AerialPerspectiveParams::clip_planes(2.1, 2.5, 1000.0);

        assert_eq!(0.0, near);
        assert_relative_eq!(4.6, far);
    }

    #[test]
    fn clip_planes_never_exceed_max_dist() {
        for dist in [0.0, 1.0, 2.5, 10.0, 500.0, 2000.0] {
            let (near, far) =
                AerialPerspectiveParams::clip_planes(dist, 2.5, 3.0);

            assert!(far <= 3.0, "dist={dist}, far={far}");
            assert_relative_eq!((dist - 2.5f32).max(0.0), near);
        }
    }

    #[test]
    fn slices() {
        let params = AerialPerspectiveParams::new(uvec3(4, 4, 4), 8, 2.0, 6.0);

        assert_relative_eq!(2.5, params.slice_depth(0));
        assert_relative_eq!(5.5, params.slice_depth(3));

        assert_relative_eq!(0.125, params.depth_to_w(2.5));
        assert_relative_eq!(0.875, params.depth_to_w(5.5));
        assert_eq!(0.0, params.depth_to_w(1.0));
        assert_eq!(1.0, params.depth_to_w(100.0));
    }

    #[test]
    fn haze_grows_with_depth() {
        let atmosphere = AtmosphereParams::new(
            2.0,
            2.5,
            vec3(0.3, 1.0, 1.8),
            0.1,
            0.1,
            0.05,
            0.01,
            0.25,
            4.0,
            Vec3::ZERO,
        );

        let raymarch = RaymarchParams {
            top_left: vec3(-0.1, 0.1, -1.0).extend(0.0),
            top_right: vec3(0.1, 0.1, -1.0).extend(0.0),
            bottom_left: vec3(-0.1, -0.1, -1.0).extend(0.0),
            bottom_right: vec3(0.1, -0.1, -1.0).extend(0.0),
            origin: vec3(0.0, 2.01, 0.0).extend(0.0),
        };

        let light = ScatteringLight {
            dir: Vec3::Y,
            color: Vec3::ONE,
        };

        let params =
            AerialPerspectiveParams::new(uvec3(2, 2, 4), 8, 0.0, 1.0);

        let mut prev = Scattering::EMPTY;

        for z in 0..4 {
            let curr = params.eval(
                &atmosphere,
                &raymarch,
                uvec3(0, 0, z),
                light,
                0.0,
                |_, _| Vec3::ONE,
            );

            assert!(curr.luminance.cmpge(prev.luminance).all());
            assert!(curr.transmittance.cmple(prev.transmittance).all());

            prev = curr;
        }

        assert!(prev.transmittance.x < 1.0);
    }

    #[test]
    fn zero_strength_disables_the_effect() {
        let params = AerialPerspectiveParams::new(uvec3(1, 1, 1), 1, 0.0, 1.0)
            .with_strength(0.0);

        let actual = params.apply_strength(Scattering {
            luminance: Vec3::ONE,
            transmittance: Vec3::splat(0.5),
        });

        assert_eq!(Vec3::ZERO, actual.luminance);
        assert_eq!(Vec3::ONE, actual.transmittance);
    }
}
