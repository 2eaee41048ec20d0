use glam::{Affine3A, Vec2, Vec3};

use crate::{gpu, Camera, ViewRect};

/// Builds [`gpu::RaymarchParams`] - the four corner rays and the origin that
/// seed all the raymarching kernels.
#[derive(Clone, Copy, Debug)]
pub struct RaymarchParamsBuilder<'a> {
    camera: &'a Camera,
    rect: ViewRect,
    world_to_local: Affine3A,
    jitter: Vec2,
}

impl<'a> RaymarchParamsBuilder<'a> {
    pub fn new(camera: &'a Camera) -> Self {
        Self {
            camera,
            rect: ViewRect::FULL,
            world_to_local: Affine3A::IDENTITY,
            jitter: Vec2::ZERO,
        }
    }

    /// Restricts rays to given part of the viewport.
    pub fn with_rect(mut self, rect: ViewRect) -> Self {
        self.rect = rect;
        self
    }

    /// Expresses rays in the space of given transform (e.g. relative to the
    /// planet's center).
    pub fn with_world_to_local(mut self, world_to_local: Affine3A) -> Self {
        self.world_to_local = world_to_local;
        self
    }

    /// Shifts rays by given offset, in normalized device coordinates.
    pub fn with_jitter(mut self, jitter: Vec2) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn build(self) -> gpu::RaymarchParams {
        let [top_left, top_right, bottom_left, bottom_right] =
            self.rect.ndc_corners().map(|corner| self.corner_dir(corner));

        let origin = self
            .world_to_local
            .transform_point3(self.camera.position());

        gpu::RaymarchParams {
            top_left: top_left.extend(0.0),
            top_right: top_right.extend(0.0),
            bottom_left: bottom_left.extend(0.0),
            bottom_right: bottom_right.extend(0.0),
            origin: origin.extend(0.0),
        }
    }

    fn corner_dir(&self, ndc: Vec2) -> Vec3 {
        let dir = self.camera.ndc_to_dir(ndc + self.jitter);

        self.world_to_local.transform_vector3(dir).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec2, vec3, Mat4, Quat};

    use super::*;

    fn camera() -> Camera {
        Camera::new(
            Affine3A::from_translation(vec3(0.0, 5.0, 0.0)),
            Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 100.0),
            uvec2(256, 256),
        )
    }

    #[test]
    fn corners() {
        let camera = camera();
        let target = RaymarchParamsBuilder::new(&camera).build();

        assert_relative_eq!(
            vec3(-1.0, 1.0, -1.0).normalize(),
            target.top_left.truncate(),
            epsilon = 0.0001
        );

        assert_relative_eq!(
            vec3(1.0, -1.0, -1.0).normalize(),
            target.bottom_right.truncate(),
            epsilon = 0.0001
        );

        assert_relative_eq!(vec3(0.0, 5.0, 0.0), target.origin());
    }

    #[test]
    fn texel_rays_follow_the_camera() {
        let camera = camera();
        let target = RaymarchParamsBuilder::new(&camera).build();
        let size = uvec2(256, 256);

        // First row of texels is the top of the viewport
        let top = target.ray(uvec2(128, 0), size).dir();
        let bottom = target.ray(uvec2(128, 255), size).dir();

        assert!(top.y > 0.99 * (0.5f32).sqrt());
        assert!(bottom.y < -0.99 * (0.5f32).sqrt());

        // Central texels look (almost) straight ahead
        let center = target.ray(uvec2(128, 128), size).dir();

        assert_relative_eq!(vec3(0.0, 0.0, -1.0), center, epsilon = 0.01);
    }

    #[test]
    fn world_to_local() {
        let camera = camera();

        let world_to_local = Affine3A::from_rotation_translation(
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            vec3(0.0, 1.0, 0.0),
        )
        .inverse();

        let target = RaymarchParamsBuilder::new(&camera)
            .with_world_to_local(world_to_local)
            .build();

        assert_relative_eq!(
            vec3(0.0, 4.0, 0.0),
            target.origin(),
            epsilon = 0.0001
        );

        // Forward (-z) becomes +x after undoing the rotation
        let center = target.ray_dir(vec2(0.5, 0.5));

        assert_relative_eq!(vec3(1.0, 0.0, 0.0), center, epsilon = 0.0001);
    }

    #[test]
    fn jitter() {
        let camera = camera();
        let jitter = vec2(0.01, -0.02);

        let target = RaymarchParamsBuilder::new(&camera)
            .with_jitter(jitter)
            .build();

        assert_relative_eq!(
            camera.ndc_to_dir(vec2(-1.0, 1.0) + jitter),
            target.top_left.truncate(),
            epsilon = 0.0001
        );
    }

    #[test]
    fn rect() {
        let camera = camera();

        let target = RaymarchParamsBuilder::new(&camera)
            .with_rect(ViewRect::RIGHT_EYE)
            .build();

        assert_relative_eq!(
            vec3(0.0, 1.0, -1.0).normalize(),
            target.top_left.truncate(),
            epsilon = 0.0001
        );
    }
}
