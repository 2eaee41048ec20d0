use bytemuck::{Pod, Zeroable};
use glam::{vec3, vec4, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{F32Ext, Ray, Vec3Ext, NIMBUS_EPSILON};

/// Physical description of an atmosphere, as seen by the kernels.
///
/// All distances are expressed in the atmosphere's local space, where the
/// planet sits at `(0, 0, 0)`.
#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct AtmosphereParams {
    /// x - planet radius
    /// y - atmosphere radius
    /// z - aerial perspective strength
    /// w - sky transmittance weight
    pub d0: Vec4,

    /// xyz - rayleigh scattering coefficients
    /// w - altitude (0..1) at which the average rayleigh density is found
    pub d1: Vec4,

    /// x - altitude (0..1) at which the average mie density is found
    /// y - mie scattering coefficient
    /// z - mie absorption coefficient
    /// w - ozone peak density altitude (0..1)
    pub d2: Vec4,

    /// xyz - ozone absorption coefficients
    /// w - ozone density falloff
    pub d3: Vec4,
}

impl AtmosphereParams {
    pub fn new(
        planet_radius: f32,
        atmosphere_radius: f32,
        rayleigh_coefficients: Vec3,
        rayleigh_density_avg: f32,
        mie_density_avg: f32,
        mie_coefficient: f32,
        mie_absorption: f32,
        ozone_peak_density_altitude: f32,
        ozone_density_falloff: f32,
        ozone_absorption: Vec3,
    ) -> Self {
        Self {
            d0: vec4(planet_radius, atmosphere_radius, 1.0, 1.0),
            d1: rayleigh_coefficients.extend(rayleigh_density_avg),
            d2: vec4(
                mie_density_avg,
                mie_coefficient,
                mie_absorption,
                ozone_peak_density_altitude,
            ),
            d3: ozone_absorption.extend(ozone_density_falloff),
        }
    }

    pub fn with_aerial_perspective_strength(mut self, strength: f32) -> Self {
        self.d0.z = strength;
        self
    }

    pub fn with_sky_transmittance_weight(mut self, weight: f32) -> Self {
        self.d0.w = weight;
        self
    }

    pub fn planet_radius(&self) -> f32 {
        self.d0.x
    }

    pub fn atmosphere_radius(&self) -> f32 {
        self.d0.y
    }

    pub fn thickness(&self) -> f32 {
        (self.atmosphere_radius() - self.planet_radius()).max(NIMBUS_EPSILON)
    }

    pub fn aerial_perspective_strength(&self) -> f32 {
        self.d0.z
    }

    pub fn sky_transmittance_weight(&self) -> f32 {
        self.d0.w
    }

    pub fn rayleigh_coefficients(&self) -> Vec3 {
        self.d1.xyz()
    }

    pub fn mie_coefficient(&self) -> f32 {
        self.d2.y
    }

    pub fn mie_extinction(&self) -> f32 {
        self.d2.y + self.d2.z
    }

    pub fn ozone_absorption(&self) -> Vec3 {
        self.d3.xyz()
    }

    /// Returns normalized altitude of given point: `0.0` at the planet's
    /// surface, `1.0` at the edge of the atmosphere.
    pub fn altitude(&self, pos: Vec3) -> f32 {
        (pos.length() - self.planet_radius()) / self.thickness()
    }

    /// Returns densities of particles (rayleigh, mie, ozone) at given point.
    pub fn densities(&self, pos: Vec3) -> Vec3 {
        let altitude = self.altitude(pos).max(0.0);

        let rayleigh = (-altitude / self.d1.w.max(NIMBUS_EPSILON)).exp();
        let mie = (-altitude / self.d2.x.max(NIMBUS_EPSILON)).exp();

        let ozone =
            (1.0 - (altitude - self.d2.w).abs() * self.d3.w).saturate();

        vec3(rayleigh, mie, ozone)
    }

    /// Returns the total (scattering + absorption) extinction at given point.
    pub fn extinction(&self, pos: Vec3) -> Vec3 {
        let densities = self.densities(pos);

        self.rayleigh_coefficients() * densities.x
            + Vec3::splat(self.mie_extinction() * densities.y)
            + self.ozone_absorption() * densities.z
    }

    /// Returns the distance along given ray at which it stops travelling
    /// through the atmosphere, or a negative number if it hits the planet
    /// before that.
    ///
    /// Assumes the ray starts inside the atmosphere.
    fn exit_distance(&self, ray: Ray) -> f32 {
        let (ground_near, _) = ray.intersect_sphere(self.planet_radius());

        if ground_near >= 0.0 {
            return -1.0;
        }

        let (_, exit) = ray.intersect_sphere(self.atmosphere_radius());

        exit.max(0.0)
    }

    /// Returns the section of given ray that travels through the atmosphere,
    /// as `(start, end)` distances; both are zero when the ray misses the
    /// atmosphere.
    ///
    /// The section ends at the planet's surface if the ray hits it.
    pub fn segment(&self, ray: Ray) -> (f32, f32) {
        let (near, far) = ray.intersect_sphere(self.atmosphere_radius());

        if far < 0.0 {
            return (0.0, 0.0);
        }

        let start = near.max(0.0);
        let (ground_near, _) = ray.intersect_sphere(self.planet_radius());

        let end = if ground_near >= 0.0 {
            ground_near.min(far)
        } else {
            far
        };

        (start, end.max(start))
    }

    /// Integrates extinction along a straight path of given length.
    pub fn optical_depth(
        &self,
        origin: Vec3,
        dir: Vec3,
        length: f32,
        steps: u32,
    ) -> Vec3 {
        let steps = steps.max(1);
        let dt = length / (steps as f32);
        let mut depth = Vec3::ZERO;
        let mut i = 0;

        while i < steps {
            let t = ((i as f32) + 0.5) * dt;

            depth += self.extinction(origin + dir * t) * dt;
            i += 1;
        }

        depth
    }

    /// Returns the fraction of light that survives travelling from the edge
    /// of the atmosphere to `pos`, coming from direction `dir`.
    ///
    /// Rays blocked by the planet yield zero; rays that miss the atmosphere
    /// altogether yield one.
    pub fn transmittance(&self, pos: Vec3, dir: Vec3, steps: u32) -> Vec3 {
        let ray = Ray::new(pos, dir);

        if pos.length() > self.atmosphere_radius() {
            let (start, end) = self.segment(ray);

            if end <= 0.0 {
                return Vec3::ONE;
            }

            if ray.intersect_sphere(self.planet_radius()).0 >= 0.0 {
                return Vec3::ZERO;
            }

            let depth =
                self.optical_depth(ray.at(start), dir, end - start, steps);

            return (-depth).exp();
        }

        let length = self.exit_distance(ray);

        if length < 0.0 {
            return Vec3::ZERO;
        }

        (-self.optical_depth(pos, dir, length, steps)).exp()
    }
}
