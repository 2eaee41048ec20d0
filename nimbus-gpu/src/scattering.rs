use core::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{uvec4, UVec2, UVec4, Vec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    lerp, AtmosphereParams, RaymarchParams, Ray, Vec3Ext, NIMBUS_EPSILON,
};

/// Asymmetry of the Mie phase function.
pub const MIE_ANISOTROPY: f32 = 0.8;

/// Phase function of an isotropic medium.
pub const ISOTROPIC_PHASE: f32 = 1.0 / (4.0 * PI);

pub fn rayleigh_phase(cos_theta: f32) -> f32 {
    3.0 * (1.0 + cos_theta * cos_theta) / (16.0 * PI)
}

/// Cornette-Shanks approximation of the Mie phase function.
pub fn mie_phase(cos_theta: f32, g: f32) -> f32 {
    let g2 = g * g;
    let num = (1.0 - g2) * (1.0 + cos_theta * cos_theta);
    let denom = (2.0 + g2) * (1.0 + g2 - 2.0 * g * cos_theta).powf(1.5);

    3.0 / (8.0 * PI) * num / denom.max(NIMBUS_EPSILON)
}

/// Light source scattered by the atmosphere.
#[derive(Clone, Copy)]
pub struct ScatteringLight {
    /// Direction towards the light, in the atmosphere's local space
    pub dir: Vec3,

    /// Linear color, premultiplied by intensity
    pub color: Vec3,
}

/// Result of raymarching a segment of the atmosphere.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Scattering {
    /// Light scattered towards the ray's origin
    pub luminance: Vec3,

    /// Fraction of background light that survives the segment
    pub transmittance: Vec3,
}

impl Scattering {
    pub const EMPTY: Self = Self {
        luminance: Vec3::ZERO,
        transmittance: Vec3::ONE,
    };

    /// Single-scattering integration of the atmosphere along given section of
    /// a ray.
    ///
    /// `sun_transmittance` answers how much sunlight reaches a point (usually
    /// backed by the transmittance lookup table), `offset` (in `[0, 1)`)
    /// dithers the sample positions.
    ///
    /// Overcast atmospheres scatter uniformly grey light isotropically.
    pub fn raymarch(
        params: &AtmosphereParams,
        ray: Ray,
        t_start: f32,
        t_end: f32,
        steps: u32,
        offset: f32,
        light: ScatteringLight,
        overcast: f32,
        sun_transmittance: impl Fn(Vec3, Vec3) -> Vec3,
    ) -> Self {
        if t_end <= t_start {
            return Self::EMPTY;
        }

        let steps = steps.max(1);
        let dt = (t_end - t_start) / (steps as f32);
        let cos_theta = ray.dir().dot(light.dir);

        let rayleigh_coefficients = {
            let coeffs = params.rayleigh_coefficients();
            let grey = (coeffs.x + coeffs.y + coeffs.z) / 3.0;

            coeffs.lerp(Vec3::splat(grey), overcast)
        };

        let rayleigh_phase =
            lerp(rayleigh_phase(cos_theta), ISOTROPIC_PHASE, overcast);

        let mie_phase = lerp(
            mie_phase(cos_theta, MIE_ANISOTROPY),
            ISOTROPIC_PHASE,
            overcast,
        );

        let mut luminance = Vec3::ZERO;
        let mut transmittance = Vec3::ONE;
        let mut i = 0;

        while i < steps {
            let t = t_start + ((i as f32) + offset) * dt;
            let pos = ray.at(t);

            let densities = params.densities(pos);
            let extinction =
                params.extinction(pos).max(Vec3::splat(NIMBUS_EPSILON));

            let sample_transmittance = (-extinction * dt).exp();

            let scattering = rayleigh_coefficients
                * densities.x
                * rayleigh_phase
                + Vec3::splat(
                    params.mie_coefficient() * densities.y * mie_phase,
                );

            let in_scattering =
                scattering * sun_transmittance(pos, light.dir) * light.color;

            // Energy-conserving integration over the step
            luminance += transmittance
                * (in_scattering - in_scattering * sample_transmittance)
                / extinction;

            transmittance *= sample_transmittance;
            i += 1;
        }

        Self {
            luminance,
            transmittance,
        }
    }

    /// Returns how visible the background (e.g. stars) remains behind this
    /// segment.
    pub fn visibility(&self, weight: f32) -> f32 {
        let t = self.transmittance;

        lerp(1.0, (t.x + t.y + t.z) / 3.0, weight)
    }
}

/// Parameters of the sky pass, shared with the aerial perspective pass.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct SkyPassParams {
    /// xyz - direction towards the sun, in the atmosphere's local space
    /// w - overcast
    pub d0: Vec4,

    /// xyz - sun color, premultiplied by intensity
    /// w - dither strength
    pub d1: Vec4,

    /// xy - size of the sky texture
    /// z - raymarching steps
    pub d2: UVec4,
}

impl SkyPassParams {
    pub fn new(
        light: ScatteringLight,
        overcast: f32,
        dither_strength: f32,
        size: UVec2,
        steps: u32,
    ) -> Self {
        Self {
            d0: light.dir.extend(overcast),
            d1: light.color.extend(dither_strength),
            d2: uvec4(size.x, size.y, steps, 0),
        }
    }

    pub fn light(&self) -> ScatteringLight {
        ScatteringLight {
            dir: self.d0.xyz(),
            color: self.d1.xyz(),
        }
    }

    pub fn overcast(&self) -> f32 {
        self.d0.w
    }

    pub fn dither_strength(&self) -> f32 {
        self.d1.w
    }

    pub fn size(&self) -> UVec2 {
        self.d2.xy()
    }

    pub fn steps(&self) -> u32 {
        self.d2.z.max(1)
    }

    /// Returns the sample offset used for given texel; dithering trades
    /// banding for noise, which later gets blurred away.
    pub fn sample_offset(&self, texel: UVec2) -> f32 {
        let noise = interleaved_gradient_noise(texel.as_vec2());

        0.5 + (noise - 0.5) * self.dither_strength()
    }

    /// Computes given texel of the sky texture: scattered light in rgb and
    /// background's visibility in alpha.
    pub fn eval(
        &self,
        atmosphere: &AtmosphereParams,
        raymarch: &RaymarchParams,
        texel: UVec2,
        sun_transmittance: impl Fn(Vec3, Vec3) -> Vec3,
    ) -> Vec4 {
        let ray = raymarch.ray(texel, self.size());
        let (start, end) = atmosphere.segment(ray);

        let scattering = Scattering::raymarch(
            atmosphere,
            ray,
            start,
            end,
            self.steps(),
            self.sample_offset(texel),
            self.light(),
            self.overcast(),
            sun_transmittance,
        );

        let visibility =
            scattering.visibility(atmosphere.sky_transmittance_weight());

        scattering.luminance.extend(visibility)
    }
}

/// Cheap screen-space noise in `[0, 1)`.
///
/// See: https://www.iryoku.com/next-generation-post-processing-in-call-of-duty-advanced-warfare
pub fn interleaved_gradient_noise(pos: Vec2) -> f32 {
    (52.982918 * (0.06711056 * pos.x + 0.00583715 * pos.y).fract()).fract()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    fn params() -> AtmosphereParams {
        AtmosphereParams::new(
            2.0,
            2.5,
            vec3(0.03, 0.1, 0.18),
            0.1,
            0.1,
            0.05,
            0.01,
            0.25,
            4.0,
            Vec3::ZERO,
        )
    }

    fn light() -> ScatteringLight {
        ScatteringLight {
            dir: Vec3::Y,
            color: Vec3::ONE,
        }
    }

    #[test]
    fn phase_functions_integrate_to_one() {
        let n = 2000;
        let mut rayleigh = 0.0;
        let mut mie = 0.0;

        for i in 0..n {
            let theta = (i as f32 + 0.5) / (n as f32) * PI;
            let weight = 2.0 * PI * theta.sin() * (PI / n as f32);

            rayleigh += rayleigh_phase(theta.cos()) * weight;
            mie += mie_phase(theta.cos(), 0.3) * weight;
        }

        assert_relative_eq!(1.0, rayleigh, epsilon = 0.001);
        assert_relative_eq!(1.0, mie, epsilon = 0.01);
    }

    #[test]
    fn empty_segment() {
        let actual = Scattering::raymarch(
            &params(),
            Ray::new(vec3(0.0, 2.1, 0.0), Vec3::X),
            1.0,
            1.0,
            8,
            0.5,
            light(),
            0.0,
            |_, _| Vec3::ONE,
        );

        assert_eq!(Vec3::ZERO, actual.luminance);
        assert_eq!(Vec3::ONE, actual.transmittance);
    }

    #[test]
    fn sky_is_blue() {
        let params = params();
        let ray = Ray::new(vec3(0.0, 2.0, 0.0), vec3(0.0, 0.6, 0.8));
        let (start, end) = params.segment(ray);

        let actual = Scattering::raymarch(
            &params,
            ray,
            start,
            end,
            16,
            0.5,
            light(),
            0.0,
            |pos, dir| params.transmittance(pos, dir, 16),
        );

        assert!(actual.luminance.z > actual.luminance.x);
        assert!(actual.transmittance.z < actual.transmittance.x);
        assert!(actual.transmittance.cmpgt(Vec3::ZERO).all());
    }

    #[test]
    fn overcast_sky_is_grey() {
        let params = params();
        let ray = Ray::new(vec3(0.0, 2.0, 0.0), vec3(0.0, 0.6, 0.8));
        let (start, end) = params.segment(ray);

        let actual = Scattering::raymarch(
            &params,
            ray,
            start,
            end,
            16,
            0.5,
            light(),
            1.0,
            |_, _| Vec3::ONE,
        );

        // Extinction stays coloured, so only check that scattering itself
        // became achromatic (within what the transmittance tints)
        let lum = actual.luminance;
        let spread = lum.max_element() - lum.min_element();

        assert!(spread < lum.max_element() * 0.5);
    }

    #[test]
    fn sky_pass() {
        let atmosphere = params();

        let raymarch = RaymarchParams {
            top_left: vec3(-1.0, 1.0, -1.0).extend(0.0),
            top_right: vec3(1.0, 1.0, -1.0).extend(0.0),
            bottom_left: vec3(-1.0, -1.0, -1.0).extend(0.0),
            bottom_right: vec3(1.0, -1.0, -1.0).extend(0.0),
            origin: vec3(0.0, 10.0, 0.0).extend(0.0),
        };

        let sky = SkyPassParams::new(light(), 0.0, 0.8, UVec2::splat(8), 8);

        // Looking into space, away from the planet
        let actual = sky.eval(&atmosphere, &raymarch, UVec2::ZERO, |_, _| {
            Vec3::ONE
        });

        assert_eq!(Vec4::new(0.0, 0.0, 0.0, 1.0), actual);

        // Looking at the planet
        let raymarch = RaymarchParams {
            origin: vec3(0.0, 0.0, 10.0).extend(0.0),
            ..raymarch
        };

        let actual = sky.eval(
            &atmosphere,
            &raymarch,
            UVec2::new(3, 3),
            |_, _| Vec3::ONE,
        );

        assert!(actual.x > 0.0);
        assert!(actual.w < 1.0);
    }

    #[test]
    fn sample_offsets() {
        let sky = SkyPassParams::new(light(), 0.0, 0.0, UVec2::splat(8), 8);

        assert_eq!(0.5, sky.sample_offset(UVec2::new(3, 5)));

        let sky = SkyPassParams::new(light(), 0.0, 0.8, UVec2::splat(8), 8);

        for x in 0..8 {
            let offset = sky.sample_offset(UVec2::new(x, 1));

            assert!(offset >= 0.1 && offset <= 0.9, "offset={offset}");
        }
    }

    #[test]
    fn visibility() {
        let scattering = Scattering {
            luminance: Vec3::ZERO,
            transmittance: vec3(0.2, 0.5, 0.8),
        };

        assert_relative_eq!(1.0, scattering.visibility(0.0));
        assert_relative_eq!(0.5, scattering.visibility(1.0));
        assert_relative_eq!(0.75, scattering.visibility(0.5));
    }
}
