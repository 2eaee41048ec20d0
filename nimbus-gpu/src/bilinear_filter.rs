use glam::{uvec2, vec2, UVec2, Vec2, Vec4};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

/// Manual bilinear filter over a texture that can only be fetched texel by
/// texel (e.g. a non-filterable `Rgba32Float` texture, or its CPU mirror).
///
/// Texel `(x, y)` is considered to sit at uv `((x + 0.5) / w, (y + 0.5) / h)`,
/// so sampling at the exact center of a texel returns that texel's value.
#[derive(Clone, Copy)]
pub struct BilinearFilter {
    /// Sample at `f(x=0, y=0)`
    pub s00: Vec4,

    /// Sample at `f(x=1, y=0)`
    pub s10: Vec4,

    /// Sample at `f(x=0, y=1)`
    pub s01: Vec4,

    /// Sample at `f(x=1, y=1)`
    pub s11: Vec4,

    /// Fractional position between the samples
    pub frac: Vec2,
}

impl BilinearFilter {
    /// Gathers samples around given uv coordinates; uv is clamped to
    /// `[0, 1]` and texel coordinates never leave the texture.
    pub fn gather(
        size: UVec2,
        uv: Vec2,
        fetch: impl Fn(UVec2) -> Vec4,
    ) -> Self {
        let size = size.max(UVec2::ONE);
        let max = (size - UVec2::ONE).as_vec2();

        let pos = (uv.clamp(Vec2::ZERO, Vec2::ONE) * size.as_vec2()
            - vec2(0.5, 0.5))
        .clamp(Vec2::ZERO, max);

        let p0 = pos.floor();
        let frac = pos - p0;
        let p0 = p0.as_uvec2();
        let p1 = (p0 + uvec2(1, 1)).min(size - UVec2::ONE);

        Self {
            s00: fetch(p0),
            s10: fetch(uvec2(p1.x, p0.y)),
            s01: fetch(uvec2(p0.x, p1.y)),
            s11: fetch(p1),
            frac,
        }
    }

    pub fn eval(&self) -> Vec4 {
        let top = self.s00.lerp(self.s10, self.frac.x);
        let bottom = self.s01.lerp(self.s11, self.frac.x);

        top.lerp(bottom, self.frac.y)
    }

    pub fn sample(
        size: UVec2,
        uv: Vec2,
        fetch: impl Fn(UVec2) -> Vec4,
    ) -> Vec4 {
        Self::gather(size, uv, fetch).eval()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec4;

    use super::*;

    fn fetch(pos: UVec2) -> Vec4 {
        vec4(pos.x as f32, pos.y as f32, (pos.x * 10 + pos.y) as f32, 1.0)
    }

    #[test]
    fn texel_centers_are_exact() {
        let size = uvec2(5, 3);

        for y in 0..size.y {
            for x in 0..size.x {
                let uv = (uvec2(x, y).as_vec2() + 0.5) / size.as_vec2();
                let actual = BilinearFilter::sample(size, uv, fetch);

                assert_relative_eq!(
                    fetch(uvec2(x, y)),
                    actual,
                    epsilon = 0.0001
                );
            }
        }
    }

    #[test]
    fn halfway_between_texels() {
        let size = uvec2(4, 4);
        let actual = BilinearFilter::sample(size, vec2(0.25, 0.125), fetch);

        assert_relative_eq!(vec4(0.5, 0.0, 5.0, 1.0), actual);
    }

    #[test]
    fn out_of_range_uvs_are_clamped() {
        let size = uvec2(4, 4);

        assert_eq!(
            fetch(uvec2(0, 0)),
            BilinearFilter::sample(size, vec2(-3.0, -1.0), fetch),
        );

        assert_eq!(
            fetch(uvec2(3, 3)),
            BilinearFilter::sample(size, vec2(7.0, 1.0), fetch),
        );
    }
}
