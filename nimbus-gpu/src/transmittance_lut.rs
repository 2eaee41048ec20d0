use glam::{uvec2, vec2, vec3, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{AtmosphereParams, BilinearFilter, F32Ext, NIMBUS_EPSILON};

/// Lookup table answering "how much light survives travelling from the edge
/// of the atmosphere to this point, from this direction".
///
/// The table is indexed by:
///
/// - u: the cosine between the local up-vector and the direction (`u = 0`
///   means straight up, `u = 1` means straight down),
///
/// - v: the distance from the planet's center, split into two linear regions:
///   `[0.0, 0.8)` covers the atmosphere itself and `[0.8, 1.0]` covers space
///   up to twice the atmosphere's radius.
pub struct TransmittanceLut;

impl TransmittanceLut {
    /// Default resolution of the lookup texture.
    pub const SIZE: UVec2 = uvec2(64, 64);

    /// Number of integration steps per texel.
    pub const STEPS: u32 = 40;

    /// Where the "in space" region begins on the v axis.
    pub const SPACE_POS: f32 = 0.8;

    /// Size of the "in space" region on the v axis.
    pub const SPACE_SIZE: f32 = 0.2;

    /// Maps a position and a direction (both in the atmosphere's local space)
    /// into lookup-texture coordinates.
    pub fn encode(params: &AtmosphereParams, pos: Vec3, dir: Vec3) -> Vec2 {
        let dist = pos.length().max(NIMBUS_EPSILON);
        let altitude = params.altitude(pos);
        let mut u = (pos / dist).dot(dir) * 0.5 + 0.5;

        let v = if altitude < 1.0 {
            altitude.saturate() * Self::SPACE_POS
        } else {
            let dist = dist / params.atmosphere_radius().max(NIMBUS_EPSILON);
            let v = (dist - 1.0) * Self::SPACE_SIZE + Self::SPACE_POS;

            // Very distant samples get their azimuthal coordinate squashed to
            // avoid artifacts at grazing angles
            if v > 1.0 {
                u *= (dist / 2.0).sqr();
            }

            v
        };

        vec2((1.0 - u).saturate(), v.saturate())
    }

    /// Inverse of [`Self::encode()`] (for the non-squashed region): returns
    /// a position and a direction that represent given texture coordinates.
    pub fn decode(params: &AtmosphereParams, uv: Vec2) -> (Vec3, Vec3) {
        let cos_zenith = (1.0 - 2.0 * uv.x).clamp(-1.0, 1.0);
        let sin_zenith = (1.0 - cos_zenith * cos_zenith).max(0.0).sqrt();

        let dist = if uv.y < Self::SPACE_POS {
            params.planet_radius()
                + (uv.y / Self::SPACE_POS) * params.thickness()
        } else {
            params.atmosphere_radius()
                * (1.0 + (uv.y - Self::SPACE_POS) / Self::SPACE_SIZE)
        };

        (vec3(0.0, dist, 0.0), vec3(sin_zenith, cos_zenith, 0.0))
    }

    /// Returns the uv coordinates of given texel's center.
    pub fn texel_uv(texel: UVec2, size: UVec2) -> Vec2 {
        (texel.as_vec2() + vec2(0.5, 0.5)) / size.max(UVec2::ONE).as_vec2()
    }

    /// Computes the value of given texel - this is what the generating
    /// kernel writes into the texture.
    pub fn eval(params: &AtmosphereParams, texel: UVec2, size: UVec2) -> Vec3 {
        let (pos, dir) = Self::decode(params, Self::texel_uv(texel, size));

        params.transmittance(pos, dir, Self::STEPS)
    }

    /// Looks up the transmittance for given position and direction (both in
    /// the atmosphere's local space), bilinearly filtering texels returned by
    /// `fetch`.
    pub fn sample(
        params: &AtmosphereParams,
        size: UVec2,
        pos: Vec3,
        dir: Vec3,
        fetch: impl Fn(UVec2) -> Vec4,
    ) -> Vec3 {
        let uv = Self::encode(params, pos, dir);

        BilinearFilter::sample(size, uv, fetch).xyz()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn params() -> AtmosphereParams {
        let rayleigh = vec3(700.0, 530.0, 460.0).recip() * 300.0;
        let rayleigh = rayleigh * rayleigh * rayleigh * rayleigh;

        AtmosphereParams::new(
            2.0,
            2.5,
            rayleigh,
            0.1,
            0.1,
            0.2,
            0.02,
            0.25,
            4.0,
            vec3(0.005, 0.01, 0.001),
        )
    }

    #[test]
    fn encode_decode() {
        let params = params();

        for uv in [vec2(0.25, 0.1), vec2(0.5, 0.5), vec2(0.9, 0.85)] {
            let (pos, dir) = TransmittanceLut::decode(&params, uv);
            let actual = TransmittanceLut::encode(&params, pos, dir);

            assert_relative_eq!(uv, actual, epsilon = 0.0001);
        }
    }

    #[test]
    fn encode_regions() {
        let params = params();

        // On the ground, looking straight up
        let uv =
            TransmittanceLut::encode(&params, vec3(0.0, 2.0, 0.0), Vec3::Y);

        assert_relative_eq!(vec2(0.0, 0.0), uv);

        // At the edge of the atmosphere, looking straight down
        let uv =
            TransmittanceLut::encode(&params, vec3(0.0, 2.5, 0.0), -Vec3::Y);

        assert_relative_eq!(vec2(1.0, 0.8), uv);

        // Far away in space, looking sideways: squashed and clamped
        let uv =
            TransmittanceLut::encode(&params, vec3(0.0, 10.0, 0.0), Vec3::X);

        assert_relative_eq!(vec2(0.0, 1.0), uv);
    }

    #[test]
    fn transmittance_decreases_towards_the_horizon() {
        let params = params();
        let size = TransmittanceLut::SIZE;

        for y in [0, 10, 25, 40, 50] {
            let mut prev = Vec3::splat(f32::INFINITY);

            for x in 0..size.x {
                let curr = TransmittanceLut::eval(&params, uvec2(x, y), size);

                assert!(
                    curr.cmple(prev + 0.0001).all(),
                    "transmittance increased at x={x}, y={y}: {prev} -> {curr}"
                );

                prev = curr;
            }
        }
    }

    #[test]
    fn rayleigh_scattering_is_blue_dominant() {
        let params = params();
        let coeffs = params.rayleigh_coefficients();

        assert!(coeffs.x < coeffs.y);
        assert!(coeffs.y < coeffs.z);

        let t = TransmittanceLut::eval(
            &params,
            uvec2(20, 0),
            TransmittanceLut::SIZE,
        );

        assert!(t.z < t.x);
    }

    #[test]
    fn sampling_texel_centers_reproduces_texels() {
        let params = params();
        let size = uvec2(8, 8);

        let texels: Vec<Vec4> = (0..size.y)
            .flat_map(|y| (0..size.x).map(move |x| uvec2(x, y)))
            .map(|texel| {
                TransmittanceLut::eval(&params, texel, size).extend(1.0)
            })
            .collect();

        let fetch = |pos: UVec2| texels[(pos.y * size.x + pos.x) as usize];

        for texel in [uvec2(0, 0), uvec2(3, 2), uvec2(7, 5), uvec2(6, 7)] {
            let uv = TransmittanceLut::texel_uv(texel, size);
            let actual = BilinearFilter::sample(size, uv, fetch);

            assert_relative_eq!(fetch(texel), actual, epsilon = 0.00001);
        }
    }
}
