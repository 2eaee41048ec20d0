use glam::Vec3;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;
use spirv_std::Image;

pub type Tex<'a> = &'a Image!(2D, type = f32, sampled);
pub type Tex3d<'a> = &'a Image!(3D, type = f32, sampled);
pub type TexDepth<'a> = &'a Image!(2D, type = f32, sampled, depth);
pub type TexRgba16<'a> = &'a Image!(2D, format = rgba16f, sampled = false);
pub type TexRgba32<'a> = &'a Image!(2D, format = rgba32f, sampled = false);
pub type Tex3dRgba16<'a> = &'a Image!(3D, format = rgba16f, sampled = false);

pub trait F32Ext
where
    Self: Sized,
{
    fn sqr(self) -> Self;
    fn saturate(self) -> Self;
    fn inverse_lerp(self, a: Self, b: Self) -> Self;
}

impl F32Ext for f32 {
    fn sqr(self) -> Self {
        self * self
    }

    fn saturate(self) -> Self {
        self.clamp(0.0, 1.0)
    }

    /// Returns where `self` lies between `a` and `b`, clamped to `[0, 1]`.
    fn inverse_lerp(self, a: Self, b: Self) -> Self {
        if a == b {
            0.0
        } else {
            ((self - a) / (b - a)).saturate()
        }
    }
}

pub trait Vec3Ext
where
    Self: Sized,
{
    fn exp(self) -> Self;
}

impl Vec3Ext for Vec3 {
    fn exp(self) -> Self {
        Vec3::new(self.x.exp(), self.y.exp(), self.z.exp())
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_lerp() {
        assert_eq!(0.5, 5.0f32.inverse_lerp(0.0, 10.0));
        assert_eq!(1.0, 15.0f32.inverse_lerp(0.0, 10.0));
        assert_eq!(0.25, 7.5f32.inverse_lerp(10.0, 0.0));
        assert_eq!(0.0, 3.0f32.inverse_lerp(1.0, 1.0));
    }
}
