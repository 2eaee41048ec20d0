use bytemuck::{Pod, Zeroable};
use glam::{vec2, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::Ray;

/// Seeds raymarching kernels: view directions through the four corners of
/// the rendered rectangle plus the camera's position relative to the planet.
///
/// Kernels reconstruct per-texel directions by bilinearly interpolating the
/// corners, so the rectangle doesn't have to cover the entire viewport.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct RaymarchParams {
    /// xyz - direction through the top-left corner
    pub top_left: Vec4,

    /// xyz - direction through the top-right corner
    pub top_right: Vec4,

    /// xyz - direction through the bottom-left corner
    pub bottom_left: Vec4,

    /// xyz - direction through the bottom-right corner
    pub bottom_right: Vec4,

    /// xyz - camera's position, relative to the planet's center
    pub origin: Vec4,
}

impl RaymarchParams {
    pub fn origin(&self) -> Vec3 {
        self.origin.xyz()
    }

    /// Converts texel coordinates into viewport coordinates.
    ///
    /// Textures grow downwards while viewports grow upwards, so the first row
    /// of texels corresponds to the top of the viewport (`v = 1`).
    pub fn viewport_uv(texel: UVec2, size: UVec2) -> Vec2 {
        let uv = (texel.as_vec2() + vec2(0.5, 0.5))
            / size.max(UVec2::ONE).as_vec2();

        vec2(uv.x, 1.0 - uv.y)
    }

    /// Returns view direction through given point of the viewport.
    pub fn ray_dir(&self, uv: Vec2) -> Vec3 {
        let top = self.top_left.xyz().lerp(self.top_right.xyz(), uv.x);

        let bottom =
            self.bottom_left.xyz().lerp(self.bottom_right.xyz(), uv.x);

        bottom.lerp(top, uv.y).normalize_or_zero()
    }

    /// Returns the camera ray passing through given texel of a target of
    /// given size.
    pub fn ray(&self, texel: UVec2, size: UVec2) -> Ray {
        Ray::new(self.origin(), self.ray_dir(Self::viewport_uv(texel, size)))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec3};

    use super::*;

    fn params() -> RaymarchParams {
        RaymarchParams {
            top_left: vec3(-1.0, 1.0, -1.0).extend(0.0),
            top_right: vec3(1.0, 1.0, -1.0).extend(0.0),
            bottom_left: vec3(-1.0, -1.0, -1.0).extend(0.0),
            bottom_right: vec3(1.0, -1.0, -1.0).extend(0.0),
            origin: vec3(0.0, 3.0, 0.0).extend(0.0),
        }
    }

    #[test]
    fn viewport_uv_flips_y() {
        let size = uvec2(4, 2);

        assert_relative_eq!(
            vec2(0.125, 0.75),
            RaymarchParams::viewport_uv(uvec2(0, 0), size)
        );

        assert_relative_eq!(
            vec2(0.875, 0.25),
            RaymarchParams::viewport_uv(uvec2(3, 1), size)
        );
    }

    #[test]
    fn ray_dir_interpolates_corners() {
        let params = params();

        assert_relative_eq!(
            vec3(-1.0, 1.0, -1.0).normalize(),
            params.ray_dir(vec2(0.0, 1.0))
        );

        assert_relative_eq!(
            vec3(1.0, -1.0, -1.0).normalize(),
            params.ray_dir(vec2(1.0, 0.0))
        );

        assert_relative_eq!(-Vec3::Z, params.ray_dir(vec2(0.5, 0.5)));
    }

    #[test]
    fn ray() {
        let params = params();
        let ray = params.ray(uvec2(0, 0), uvec2(1, 1));

        assert_eq!(vec3(0.0, 3.0, 0.0), ray.origin());
        assert_relative_eq!(-Vec3::Z, ray.dir());
    }
}
