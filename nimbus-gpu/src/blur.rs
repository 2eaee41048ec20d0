use core::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{ivec2, uvec4, IVec2, UVec2, UVec4, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

/// Value of the (non-normalized) Gaussian function.
pub fn gaussian_weight(x: f32, sigma: f32) -> f32 {
    let sigma_sqr_2 = 2.0 * sigma * sigma;

    (-x * x / sigma_sqr_2).exp() / (sigma_sqr_2 * PI).sqrt()
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct BlurPassParams {
    /// xy - size of the blurred texture
    /// z - half of the kernel's size (the kernel spans `2 * z + 1` texels)
    /// w - whether the alpha channel gets blurred too
    pub d0: UVec4,

    /// xy - direction of this pass (either `(1, 0)` or `(0, 1)`)
    pub d1: UVec4,
}

impl BlurPassParams {
    pub fn horizontal(size: UVec2, half_size: u32, blur_alpha: bool) -> Self {
        Self::new(size, half_size, blur_alpha, UVec2::X)
    }

    pub fn vertical(size: UVec2, half_size: u32, blur_alpha: bool) -> Self {
        Self::new(size, half_size, blur_alpha, UVec2::Y)
    }

    fn new(size: UVec2, half_size: u32, blur_alpha: bool, dir: UVec2) -> Self {
        Self {
            d0: uvec4(size.x, size.y, half_size, blur_alpha as u32),
            d1: uvec4(dir.x, dir.y, 0, 0),
        }
    }

    pub fn size(&self) -> UVec2 {
        self.d0.xy()
    }

    pub fn half_size(&self) -> u32 {
        self.d0.z
    }

    pub fn kernel_size(&self) -> u32 {
        2 * self.half_size() + 1
    }

    pub fn blur_alpha(&self) -> bool {
        self.d0.w != 0
    }

    pub fn dir(&self) -> IVec2 {
        self.d1.xy().as_ivec2()
    }

    /// Returns the texel sampled for `i`-th kernel weight around given
    /// texel, clamped to the texture's edges.
    pub fn tap(&self, texel: UVec2, i: u32) -> UVec2 {
        let offset = (i as i32) - (self.half_size() as i32);
        let max = self.size().max(UVec2::ONE).as_ivec2() - ivec2(1, 1);

        (texel.as_ivec2() + self.dir() * offset)
            .clamp(IVec2::ZERO, max)
            .as_uvec2()
    }

    /// Convolves the texture around given texel with given kernel.
    pub fn eval(
        &self,
        texel: UVec2,
        weight: impl Fn(u32) -> f32,
        fetch: impl Fn(UVec2) -> Vec4,
    ) -> Vec4 {
        let mut sum = Vec4::ZERO;
        let mut i = 0;

        while i < self.kernel_size() {
            sum += fetch(self.tap(texel, i)) * weight(i);
            i += 1;
        }

        if !self.blur_alpha() {
            sum.w = fetch(texel).w;
        }

        sum
    }
}
