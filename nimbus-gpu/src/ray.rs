use glam::Vec3;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Ray {
    origin: Vec3,
    dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn dir(&self) -> Vec3 {
        self.dir
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Intersects this ray with a sphere centered at `(0, 0, 0)`, returning
    /// distances to the entry and exit points.
    ///
    /// When the ray misses the sphere, both distances are negative; when the
    /// ray starts inside the sphere, the entry distance is negative.
    ///
    /// Assumes the direction is normalized.
    pub fn intersect_sphere(&self, radius: f32) -> (f32, f32) {
        let b = self.origin.dot(self.dir);
        let c = self.origin.length_squared() - radius * radius;
        let discr = b * b - c;

        if discr < 0.0 {
            return (-1.0, -1.0);
        }

        let discr = discr.sqrt();

        (-b - discr, -b + discr)
    }

    /// Returns whether this ray hits given sphere somewhere in front of its
    /// origin.
    pub fn hits_sphere(&self, radius: f32) -> bool {
        let (_, far) = self.intersect_sphere(radius);

        far >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn intersect_sphere_from_outside() {
        let ray = Ray::new(vec3(0.0, 0.0, -10.0), vec3(0.0, 0.0, 1.0));
        let (near, far) = ray.intersect_sphere(2.0);

        assert_relative_eq!(8.0, near);
        assert_relative_eq!(12.0, far);
    }

    #[test]
    fn intersect_sphere_from_inside() {
        let ray = Ray::new(vec3(0.0, 1.0, 0.0), vec3(0.0, 1.0, 0.0));
        let (near, far) = ray.intersect_sphere(2.0);

        assert_relative_eq!(-3.0, near);
        assert_relative_eq!(1.0, far);
    }

    #[test]
    fn intersect_sphere_miss() {
        let ray = Ray::new(vec3(0.0, 5.0, -10.0), vec3(0.0, 0.0, 1.0));

        assert!(!ray.hits_sphere(2.0));

        let ray = Ray::new(vec3(0.0, 0.0, -10.0), vec3(0.0, 0.0, -1.0));

        assert!(!ray.hits_sphere(2.0));
    }
}
