use std::ops::AddAssign;

use glam::{vec3, Mat4, Vec2, Vec3, Vec3Swizzles, Vec4Swizzles};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a box enclosing a sphere.
    pub fn around_sphere(center: Vec3, radius: f32) -> Self {
        Self::new(center - Vec3::splat(radius), center + Vec3::splat(radius))
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    pub fn is_set(&self) -> bool {
        self.min.x != Self::default().min.x
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::ZERO; 8];

        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = vec3(
                if i & 1 > 0 { self.max.x } else { self.min.x },
                if i & 2 > 0 { self.max.y } else { self.min.y },
                if i & 4 > 0 { self.max.z } else { self.min.z },
            );
        }

        corners
    }

    /// Projects this box through given view-projection matrix and returns
    /// the rectangle it covers on screen, in viewport coordinates (y pointing
    /// up), clamped to `[0, 1]`.
    ///
    /// Returns `None` when the entire box is behind the camera; a box that's
    /// only partially behind the camera is assumed to cover the entire
    /// screen.
    pub fn screen_space_rect(&self, view_proj: Mat4) -> Option<(Vec2, Vec2)> {
        let mut rect = Self::default();
        let mut behind = 0;

        for corner in self.corners() {
            let clip = view_proj * corner.extend(1.0);

            if clip.w <= 0.0 {
                behind += 1;
                continue;
            }

            rect += (clip.xyz() / clip.w) * 0.5 + Vec3::splat(0.5);
        }

        match behind {
            0 => Some((
                rect.min.xy().clamp(Vec2::ZERO, Vec2::ONE),
                rect.max.xy().clamp(Vec2::ZERO, Vec2::ONE),
            )),
            8 => None,
            _ => Some((Vec2::ZERO, Vec2::ONE)),
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(Vec3::MAX, Vec3::MIN)
    }
}

impl AddAssign<Vec3> for BoundingBox {
    fn add_assign(&mut self, rhs: Vec3) {
        self.min = self.min.min(rhs);
        self.max = self.max.max(rhs);
    }
}

impl FromIterator<Vec3> for BoundingBox {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Vec3>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{vec3, Mat4, Vec2};

    use super::*;

    #[test]
    fn around_sphere() {
        let target = BoundingBox::around_sphere(vec3(1.0, 2.0, 3.0), 2.5);

        assert_eq!(vec3(-1.5, -0.5, 0.5), target.min());
        assert_eq!(vec3(3.5, 4.5, 5.5), target.max());
        assert_eq!(Vec3::splat(5.0), target.extent());
    }

    #[test]
    fn from_iter() {
        let target: BoundingBox = [
            vec3(1.0, -2.0, 0.0),
            vec3(-1.0, 3.0, 2.0),
            vec3(0.0, 0.0, -4.0),
        ]
        .into_iter()
        .collect();

        assert!(target.is_set());
        assert_eq!(vec3(-1.0, -2.0, -4.0), target.min());
        assert_eq!(vec3(1.0, 3.0, 2.0), target.max());
        assert!(!BoundingBox::default().is_set());
    }

    #[test]
    fn screen_space_rect() {
        let view_proj =
            Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 100.0);

        // Box straddling the view axis, 10 units in front of the camera
        let target =
            BoundingBox::new(vec3(-1.0, -1.0, -11.0), vec3(1.0, 1.0, -9.0));

        let (min, max) = target.screen_space_rect(view_proj).unwrap();

        assert_relative_eq!(0.5 - 0.5 / 9.0, min.x, epsilon = 0.0001);
        assert_relative_eq!(0.5 + 0.5 / 9.0, max.x, epsilon = 0.0001);
        assert_relative_eq!(min.x, min.y, epsilon = 0.0001);

        // Box behind the camera
        let target =
            BoundingBox::new(vec3(-1.0, -1.0, 9.0), vec3(1.0, 1.0, 11.0));

        assert!(target.screen_space_rect(view_proj).is_none());

        // Box surrounding the camera
        let target = BoundingBox::around_sphere(vec3(0.0, 0.0, -5.0), 100.0);
        let (min, max) = target.screen_space_rect(view_proj).unwrap();

        assert_eq!(Vec2::ZERO, min);
        assert_eq!(Vec2::ONE, max);

        // Box partially outside of the screen gets clamped
        let target =
            BoundingBox::new(vec3(5.0, -1.0, -11.0), vec3(20.0, 1.0, -9.0));

        let (min, max) = target.screen_space_rect(view_proj).unwrap();

        assert_relative_eq!(0.5 + 0.5 * 5.0 / 11.0, min.x, epsilon = 0.0001);
        assert_eq!(1.0, max.x);
    }
}
