use bytemuck::{Pod, Zeroable};
use glam::{vec2, vec4, Mat4, UVec4, Vec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::Temporal;

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct SkyCompositePassParams {
    pub inv_projection: Mat4,
    pub camera_to_world: Mat4,

    /// View bounds: `(min.x, 1 - max.y, size.x, size.y)`, in viewport
    /// fractions
    pub view_bounds: Vec4,

    /// xyz - direction from the camera towards the planet's center
    /// w - angular size of the atmosphere, as seen from the camera; negative
    ///     when there's nothing to composite and the scene should be copied
    ///     as-is
    pub planet: Vec4,

    /// x - aerial perspective near plane
    /// y - aerial perspective far plane
    /// zw - size of the viewport, in pixels
    pub d0: Vec4,
}

impl SkyCompositePassParams {
    /// Converts viewport-space bounds (y pointing up) into the format stored
    /// in [`Self::view_bounds`].
    pub fn encode_view_bounds(min: Vec2, max: Vec2) -> Vec4 {
        let size = max - min;

        vec4(min.x, 1.0 - max.y, size.x, size.y)
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.d0.zw()
    }

    pub fn aerial_perspective_clip(&self) -> Vec2 {
        self.d0.xy()
    }

    /// Converts texture-space position (y pointing down, in `[0, 1]`) into
    /// coordinates relative to the view bounds; the flag says whether the
    /// position lays inside them.
    pub fn bounds_uv(&self, uv: Vec2) -> (bool, Vec2) {
        let min = self.view_bounds.xy();
        let size = self.view_bounds.zw();

        let inside = uv.x >= min.x
            && uv.y >= min.y
            && uv.x <= min.x + size.x
            && uv.y <= min.y + size.y;

        (inside, (uv - min) / size.max(Vec2::splat(0.0001)))
    }

    /// Returns the view-space position of a pixel, given its texture-space
    /// position and its value in the depth buffer.
    pub fn view_pos(&self, uv: Vec2, depth: f32) -> Vec3 {
        let ndc = Temporal::uv_to_ndc(uv);
        let pos = self.inv_projection * vec4(ndc.x, ndc.y, depth, 1.0);

        pos.xyz() / pos.w
    }

    /// Returns the world-space direction of a view-space position.
    pub fn world_dir(&self, view_pos: Vec3) -> Vec3 {
        self.camera_to_world
            .transform_vector3(view_pos)
            .normalize_or_zero()
    }

    pub fn has_atmosphere(&self) -> bool {
        self.planet.w >= 0.0
    }

    /// Returns whether a pixel with given depth shows the background (i.e.
    /// nothing has been rasterized there).
    pub fn is_background(depth: f32) -> bool {
        depth >= 1.0
    }

    /// Returns whether given world-space direction points at the
    /// atmosphere.
    ///
    /// Pixels outside of the atmosphere's disc don't have to be composited
    /// at all; cameras inside the atmosphere always see it.
    pub fn sees_atmosphere(&self, dir: Vec3) -> bool {
        let angular_size = self.planet.w;

        if angular_size >= core::f32::consts::PI {
            return true;
        }

        let cos = dir.dot(self.planet.xyz()).clamp(-1.0, 1.0);

        cos.acos() <= 0.5 * angular_size
    }

    /// Composites sky over the background (e.g. stars), where `sky.w` says
    /// how much of the background remains visible.
    pub fn blend_sky(background: Vec3, sky: Vec4) -> Vec3 {
        sky.xyz() + background * sky.w
    }

    /// Composites aerial perspective over the scene's geometry.
    pub fn blend_aerial_perspective(
        color: Vec3,
        luminance: Vec3,
        transmittance: Vec3,
    ) -> Vec3 {
        color * transmittance + luminance
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct CloudCompositePassParams {
    /// xy - size of the viewport, in pixels
    /// zw - size of the cloud texture, in texels
    pub d0: Vec4,

    /// x - whether to show motion vectors instead of clouds
    pub d1: UVec4,
}

impl CloudCompositePassParams {
    pub fn new(viewport_size: Vec2, cloud_size: Vec2) -> Self {
        Self {
            d0: vec4(
                viewport_size.x,
                viewport_size.y,
                cloud_size.x,
                cloud_size.y,
            ),
            d1: UVec4::ZERO,
        }
    }

    pub fn with_motion_vectors(mut self, show: bool) -> Self {
        self.d1.x = show as u32;
        self
    }

    pub fn shows_motion_vectors(&self) -> bool {
        self.d1.x != 0
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.d0.xy()
    }

    /// Converts pixel coordinates into cloud-texture coordinates.
    pub fn cloud_uv(&self, frag_pos: Vec2) -> Vec2 {
        frag_pos / self.viewport_size().max(vec2(1.0, 1.0))
    }

    /// Composites clouds (color + transmittance) over the scene.
    pub fn blend(scene: Vec3, clouds: Vec4) -> Vec3 {
        scene * clouds.w + clouds.xyz()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn view_bounds() {
        let bounds = SkyCompositePassParams::encode_view_bounds(
            vec2(0.25, 0.1),
            vec2(0.75, 0.6),
        );

        assert_relative_eq!(
            vec4(0.25, 0.4, 0.5, 0.5),
            bounds,
            epsilon = 0.0001
        );

        let params = SkyCompositePassParams {
            view_bounds: bounds,
            ..Default::default()
        };

        let (inside, uv) = params.bounds_uv(vec2(0.5, 0.65));

        assert!(inside);
        assert_relative_eq!(vec2(0.5, 0.5), uv, epsilon = 0.0001);

        let (inside, _) = params.bounds_uv(vec2(0.1, 0.5));

        assert!(!inside);
    }

    #[test]
    fn view_pos() {
        let projection = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);

        let params = SkyCompositePassParams {
            inv_projection: projection.inverse(),
            camera_to_world: Mat4::IDENTITY,
            ..Default::default()
        };

        let expected = vec3(0.0, 0.0, -10.0);
        let clip = projection * expected.extend(1.0);
        let depth = clip.z / clip.w;

        let actual = params.view_pos(vec2(0.5, 0.5), depth);

        assert_relative_eq!(expected, actual, epsilon = 0.001);
        assert_relative_eq!(
            -Vec3::Z,
            params.world_dir(actual),
            epsilon = 0.0001
        );
    }

    #[test]
    fn sees_atmosphere() {
        let params = SkyCompositePassParams {
            planet: vec4(0.0, 0.0, -1.0, 0.5),
            ..Default::default()
        };

        assert!(params.sees_atmosphere(-Vec3::Z));
        assert!(params.sees_atmosphere(vec3(0.2, 0.0, -1.0).normalize()));
        assert!(!params.sees_atmosphere(vec3(0.5, 0.0, -1.0).normalize()));
        assert!(!params.sees_atmosphere(Vec3::Z));

        let params = SkyCompositePassParams {
            planet: vec4(0.0, 0.0, -1.0, core::f32::consts::PI),
            ..Default::default()
        };

        assert!(params.sees_atmosphere(Vec3::Z));
        assert!(params.has_atmosphere());

        let params = SkyCompositePassParams {
            planet: vec4(0.0, 0.0, 0.0, -1.0),
            ..Default::default()
        };

        assert!(!params.has_atmosphere());
    }

    #[test]
    fn blending() {
        assert_eq!(
            vec3(0.5, 0.5, 1.5),
            SkyCompositePassParams::blend_sky(
                Vec3::ONE,
                vec4(0.0, 0.0, 1.0, 0.5)
            )
        );

        assert_eq!(
            vec3(1.0, 1.0, 1.0),
            SkyCompositePassParams::blend_aerial_perspective(
                Vec3::ONE,
                Vec3::splat(0.5),
                Vec3::splat(0.5),
            )
        );

        assert_eq!(
            vec3(0.75, 0.25, 0.25),
            CloudCompositePassParams::blend(
                Vec3::ONE,
                vec4(0.5, 0.0, 0.0, 0.25)
            )
        );
    }

    #[test]
    fn cloud_uv() {
        let params = CloudCompositePassParams::new(
            vec2(800.0, 600.0),
            vec2(256.0, 192.0),
        );

        assert_eq!(vec2(0.5, 0.5), params.cloud_uv(vec2(400.0, 300.0)));
        assert!(!params.shows_motion_vectors());
        assert!(params.with_motion_vectors(true).shows_motion_vectors());
    }
}
