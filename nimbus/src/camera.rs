use std::fmt;

use glam::{vec2, Affine3A, Mat4, UVec2, Vec2, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Camera-to-world transform
    pub transform: Affine3A,

    /// Projection with depth in `[0, 1]`, `1` being the far plane
    pub projection: Mat4,

    /// Size of the rendered image, in pixels; for stereo cameras that's the
    /// size of both eyes together
    pub viewport_size: UVec2,

    pub format: wgpu::TextureFormat,

    /// Whether the image contains both eyes side by side
    pub stereo: bool,
}

impl Camera {
    pub fn new(
        transform: Affine3A,
        projection: Mat4,
        viewport_size: UVec2,
    ) -> Self {
        Self {
            transform,
            projection,
            viewport_size,
            format: wgpu::TextureFormat::Rgba16Float,
            stereo: false,
        }
    }

    pub fn with_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_stereo(mut self, stereo: bool) -> Self {
        self.stereo = stereo;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation.into()
    }

    pub fn camera_to_world(&self) -> Mat4 {
        Mat4::from(self.transform)
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from(self.transform.inverse())
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view()
    }

    /// View-projection matrix without the camera's translation, i.e. as if
    /// everything was infinitely far away.
    pub fn rotation_view_projection(&self) -> Mat4 {
        self.projection * Mat4::from_mat3a(self.transform.matrix3.inverse())
    }

    pub fn inv_projection(&self) -> Mat4 {
        self.projection.inverse()
    }

    /// Unprojects given point from normalized device coordinates (y pointing
    /// up) into a normalized world-space direction.
    pub fn ndc_to_dir(&self, ndc: Vec2) -> Vec3 {
        let view_pos =
            self.inv_projection().project_point3(ndc.extend(0.5));

        self.transform.transform_vector3(view_pos).normalize_or_zero()
    }

    /// Returns whether switching to `other` requires reallocating
    /// per-camera textures.
    pub fn is_invalidated_by(&self, other: &Self) -> bool {
        self.viewport_size != other.viewport_size
            || self.format != other.format
            || self.stereo != other.stereo
    }

    pub fn describe(&self) -> impl fmt::Display + '_ {
        CameraDescription(self)
    }
}

struct CameraDescription<'a>(&'a Camera);

impl fmt::Display for CameraDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size={}x{}, format={:?}, stereo={}",
            self.0.viewport_size.x,
            self.0.viewport_size.y,
            self.0.format,
            self.0.stereo,
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CameraHandle(usize);

impl CameraHandle {
    pub(crate) fn new(id: usize) -> Self {
        Self(id)
    }
}

/// Part of the viewport, in viewport fractions (y pointing up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl ViewRect {
    pub const FULL: Self = Self {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };

    pub const LEFT_EYE: Self = Self {
        min: Vec2::ZERO,
        max: vec2(0.5, 1.0),
    };

    pub const RIGHT_EYE: Self = Self {
        min: vec2(0.5, 0.0),
        max: Vec2::ONE,
    };

    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Corners in normalized device coordinates, as `[top_left, top_right,
    /// bottom_left, bottom_right]`.
    pub fn ndc_corners(&self) -> [Vec2; 4] {
        let min = self.min * 2.0 - Vec2::ONE;
        let max = self.max * 2.0 - Vec2::ONE;

        [
            vec2(min.x, max.y),
            vec2(max.x, max.y),
            vec2(min.x, min.y),
            vec2(max.x, min.y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec3, Quat, Vec4Swizzles};

    use super::*;

    fn camera() -> Camera {
        Camera::new(
            Affine3A::from_rotation_translation(
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                vec3(1.0, 2.0, 3.0),
            ),
            Mat4::perspective_rh(90f32.to_radians(), 2.0, 0.1, 100.0),
            uvec2(1024, 512),
        )
    }

    #[test]
    fn ndc_to_dir() {
        let target = camera();

        // Rotated by 90 degrees, the camera looks towards -x
        assert_relative_eq!(
            vec3(-1.0, 0.0, 0.0),
            target.ndc_to_dir(Vec2::ZERO),
            epsilon = 0.0001
        );

        // Top edge of a 90-degree frustum
        assert_relative_eq!(
            vec3(-1.0, 1.0, 0.0).normalize(),
            target.ndc_to_dir(vec2(0.0, 1.0)),
            epsilon = 0.0001
        );
    }

    #[test]
    fn rotation_view_projection() {
        let target = camera();
        let dir = vec3(-1.0, 0.3, 0.2);

        let a =
            target.view_projection() * (target.position() + dir).extend(1.0);
        let b = target.rotation_view_projection() * dir.extend(1.0);

        assert_relative_eq!(a.xy() / a.w, b.xy() / b.w, epsilon = 0.0001);
    }

    #[test]
    fn is_invalidated_by() {
        let target = camera();

        let moved = Camera {
            transform: Affine3A::IDENTITY,
            ..target
        };

        assert!(!target.is_invalidated_by(&moved));
        assert!(target.is_invalidated_by(&target.with_stereo(true)));

        assert!(target.is_invalidated_by(&Camera {
            viewport_size: uvec2(1024, 513),
            ..target
        }));
    }

    #[test]
    fn view_rect() {
        assert_eq!(
            [
                vec2(-1.0, 1.0),
                vec2(0.0, 1.0),
                vec2(-1.0, -1.0),
                vec2(0.0, -1.0)
            ],
            ViewRect::LEFT_EYE.ndc_corners()
        );

        assert_eq!(vec2(0.5, 1.0), ViewRect::RIGHT_EYE.size());
    }
}
