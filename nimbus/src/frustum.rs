use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};

use crate::BoundingBox;

/// Planes enclosing the camera's view volume, with normals pointing inwards.
#[derive(Clone, Debug)]
pub struct Frustum {
    planes: Vec<Vec4>,
}

impl Frustum {
    /// Extracts planes from a view-projection matrix whose clip-space depth
    /// lies in `[0, 1]`.
    ///
    /// Planes that degenerate (e.g. the far plane of an infinite projection)
    /// are skipped.
    pub fn new(view_proj: Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2]
            .into_iter()
            .filter_map(|plane| {
                let len = plane.xyz().length();

                if len > 1e-6 {
                    Some(plane / len)
                } else {
                    None
                }
            })
            .collect();

        Self { planes }
    }

    /// Returns whether given box is at least partially inside the frustum.
    ///
    /// Conservative: boxes near the frustum's corners might be reported as
    /// visible even though they're not.
    pub fn intersects(&self, bb: &BoundingBox) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.xyz();

            // Corner of the box that's the furthest along the plane's normal
            let p = Vec3::select(normal.cmpge(Vec3::ZERO), bb.max(), bb.min());

            normal.dot(p) + plane.w >= 0.0
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{vec3, Affine3A};

    use super::*;

    fn frustum(proj: Mat4) -> Frustum {
        let view = Affine3A::from_translation(vec3(0.0, 0.0, 10.0)).inverse();

        Frustum::new(proj * Mat4::from(view))
    }

    #[test]
    fn intersects() {
        let target = frustum(Mat4::perspective_rh(
            90f32.to_radians(),
            1.0,
            0.1,
            100.0,
        ));

        let visible = [
            BoundingBox::around_sphere(Vec3::ZERO, 1.0),
            BoundingBox::around_sphere(vec3(0.0, 0.0, 10.0), 1.0),
            BoundingBox::around_sphere(vec3(30.0, 0.0, -30.0), 15.0),
        ];

        let invisible = [
            // Behind the camera
            BoundingBox::around_sphere(vec3(0.0, 0.0, 20.0), 1.0),
            // Too far to the side
            BoundingBox::around_sphere(vec3(30.0, 0.0, 0.0), 1.0),
            // Beyond the far plane
            BoundingBox::around_sphere(vec3(0.0, 0.0, -200.0), 10.0),
        ];

        for bb in visible {
            assert!(target.intersects(&bb), "{bb:?}");
        }

        for bb in invisible {
            assert!(!target.intersects(&bb), "{bb:?}");
        }
    }

    #[test]
    fn infinite_projection() {
        let target = frustum(Mat4::perspective_infinite_rh(
            90f32.to_radians(),
            1.0,
            0.1,
        ));

        assert!(target.intersects(&BoundingBox::around_sphere(
            vec3(0.0, 0.0, -100_000.0),
            10.0,
        )));

        assert!(!target.intersects(&BoundingBox::around_sphere(
            vec3(0.0, 0.0, 20.0),
            1.0,
        )));
    }
}
