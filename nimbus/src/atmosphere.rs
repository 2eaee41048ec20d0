use glam::{vec3, Affine3A, Quat, Vec3};
use log::warn;

use crate::{
    gpu, BoundingBox, Camera, Sun, SunLighting, TransmittanceLutData,
    ViewRect,
};

/// Physical parameters of an atmosphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmosphereParameters {
    /// How strongly the atmosphere affects the appearance of objects in the
    /// sky (e.g. stars), in `[0, 1]`
    pub sky_transmittance_weight: f32,

    /// Wavelengths of red, green and blue light, in nanometres
    pub wavelengths_rgb: Vec3,

    /// Adjusts all the wavelengths at once
    pub wavelength_scale: f32,

    /// Altitude (`[0, 1]`) at which the average density of particles causing
    /// Rayleigh scattering is found
    pub rayleigh_density_avg: f32,

    /// Altitude (`[0, 1]`) at which the average density of particles causing
    /// Mie scattering is found
    pub mie_density_avg: f32,

    pub mie_coefficient: f32,
    pub mie_absorption: f32,

    /// Altitude (`[0, 1]`) at which ozone is the densest
    pub ozone_peak_density_altitude: f32,

    pub ozone_density_falloff: f32,
    pub ozone_strength: f32,
    pub ozone_absorption: Vec3,

    pub aerial_perspective_strength: f32,

    /// Distance beyond which aerial perspective stops accumulating
    pub max_aerial_perspective_dist: f32,
}

impl AtmosphereParameters {
    /// Strength of Rayleigh scattering per channel, following the
    /// inverse-fourth-power law.
    pub fn rayleigh_coefficients(&self) -> Vec3 {
        (Vec3::splat(self.wavelength_scale) / self.wavelengths_rgb).powf(4.0)
    }

    pub fn ozone_coefficients(&self) -> Vec3 {
        self.ozone_absorption * self.ozone_strength * 0.1
    }

    /// Returns a copy of these parameters with degenerate values clamped to
    /// something that still renders.
    pub fn sanitized(&self) -> Self {
        let eps = gpu::NIMBUS_EPSILON;

        let this = Self {
            sky_transmittance_weight: self
                .sky_transmittance_weight
                .clamp(0.0, 1.0),
            wavelengths_rgb: self.wavelengths_rgb.max(Vec3::splat(eps)),
            wavelength_scale: self.wavelength_scale.max(0.0),
            rayleigh_density_avg: self.rayleigh_density_avg.clamp(eps, 1.0),
            mie_density_avg: self.mie_density_avg.clamp(eps, 1.0),
            mie_coefficient: self.mie_coefficient.max(0.0),
            mie_absorption: self.mie_absorption.max(0.0),
            ozone_peak_density_altitude: self
                .ozone_peak_density_altitude
                .clamp(0.0, 1.0),
            ozone_density_falloff: self.ozone_density_falloff.max(0.0),
            ozone_strength: self.ozone_strength.max(0.0),
            ozone_absorption: self.ozone_absorption.max(Vec3::ZERO),
            aerial_perspective_strength: self
                .aerial_perspective_strength
                .max(0.0),
            max_aerial_perspective_dist: self
                .max_aerial_perspective_dist
                .max(0.0),
        };

        if this != *self {
            warn!("Atmosphere parameters are out of range; clamping");
        }

        this
    }

    /// Converts these parameters into what the kernels understand, for an
    /// atmosphere of given (world-space) radii.
    pub fn serialize(
        &self,
        planet_radius: f32,
        atmosphere_radius: f32,
    ) -> gpu::AtmosphereParams {
        gpu::AtmosphereParams::new(
            planet_radius,
            atmosphere_radius,
            self.rayleigh_coefficients(),
            self.rayleigh_density_avg,
            self.mie_density_avg,
            self.mie_coefficient,
            self.mie_absorption,
            self.ozone_peak_density_altitude,
            self.ozone_density_falloff,
            self.ozone_coefficients(),
        )
        .with_aerial_perspective_strength(self.aerial_perspective_strength)
        .with_sky_transmittance_weight(self.sky_transmittance_weight)
    }
}

impl Default for AtmosphereParameters {
    fn default() -> Self {
        Self {
            sky_transmittance_weight: 1.0,
            wavelengths_rgb: vec3(700.0, 530.0, 460.0),
            wavelength_scale: 300.0,
            rayleigh_density_avg: 0.1,
            mie_density_avg: 0.1,
            mie_coefficient: 0.0,
            mie_absorption: 0.0,
            ozone_peak_density_altitude: 0.25,
            ozone_density_falloff: 4.0,
            ozone_strength: 1.0,
            ozone_absorption: Vec3::ZERO,
            aerial_perspective_strength: 1.0,
            max_aerial_perspective_dist: 1000.0,
        }
    }
}

/// Planet surrounded by an atmosphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Atmosphere {
    /// World-space position of the planet's center
    pub center: Vec3,

    pub rotation: Quat,

    /// Uniform scale applied to both radii
    pub scale: f32,

    pub planet_radius: f32,
    pub atmosphere_radius: f32,

    /// How overcast the sky is, in `[0, 1]`
    pub overcast: f32,

    /// How much of the sunlight gets through when fully overcast
    pub overcast_sun_occlusion: f32,

    /// Light scattered by this atmosphere; atmospheres without a sun don't
    /// get rendered
    pub sun: Option<Sun>,

    pub parameters: AtmosphereParameters,
}

impl Atmosphere {
    /// World-space radius of the planet.
    pub fn scaled_planet_radius(&self) -> f32 {
        (self.planet_radius * self.scale).max(gpu::NIMBUS_EPSILON)
    }

    /// World-space radius of the atmosphere; always larger than the
    /// planet's.
    pub fn scaled_atmosphere_radius(&self) -> f32 {
        let planet_radius = self.scaled_planet_radius();

        (self.atmosphere_radius * self.scale)
            .max(planet_radius + gpu::NIMBUS_EPSILON)
    }

    /// Returns a copy of this atmosphere with degenerate values clamped to
    /// something that still renders.
    pub fn sanitized(&self) -> Self {
        let planet_radius = self.planet_radius * self.scale;
        let atmosphere_radius = self.atmosphere_radius * self.scale;

        if planet_radius <= 0.0 || atmosphere_radius <= planet_radius {
            warn!(
                "Atmosphere has degenerate radii (planet={}, atmosphere={}); \
                 clamping",
                planet_radius, atmosphere_radius,
            );
        }

        Self {
            overcast: self.overcast.clamp(0.0, 1.0),
            overcast_sun_occlusion: self
                .overcast_sun_occlusion
                .clamp(0.0, 1.0),
            parameters: self.parameters.sanitized(),
            ..*self
        }
    }

    /// Transform from world space into the atmosphere's local space, where
    /// the planet sits at `(0, 0, 0)`.
    pub fn world_to_local(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.rotation, self.center)
            .inverse()
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::around_sphere(
            self.center,
            self.scaled_atmosphere_radius(),
        )
    }

    /// Returns the part of the screen covered by this atmosphere, or `None`
    /// if it's entirely behind the camera.
    pub fn screen_space_bounds(&self, camera: &Camera) -> Option<ViewRect> {
        self.bounds()
            .screen_space_rect(camera.view_projection())
            .map(|(min, max)| ViewRect::new(min, max))
    }

    /// Returns the depth range covered by aerial perspective, as seen from
    /// given world-space position.
    pub fn aerial_perspective_clip_planes(
        &self,
        camera_pos: Vec3,
    ) -> (f32, f32) {
        gpu::AerialPerspectiveParams::clip_planes(
            camera_pos.distance(self.center),
            self.scaled_atmosphere_radius(),
            self.parameters.max_aerial_perspective_dist,
        )
    }

    /// Returns the angle the atmosphere spans, as seen from given
    /// world-space position; cameras inside the atmosphere see it
    /// everywhere, which is represented by `PI`.
    pub fn angular_size(&self, camera_pos: Vec3) -> f32 {
        let dist = camera_pos.distance(self.center);
        let radius = self.scaled_atmosphere_radius();

        if dist <= radius {
            std::f32::consts::PI
        } else {
            2.0 * (radius / dist).asin()
        }
    }

    pub fn serialize(&self) -> gpu::AtmosphereParams {
        self.parameters.serialize(
            self.scaled_planet_radius(),
            self.scaled_atmosphere_radius(),
        )
    }

    /// Returns whether switching to `other` requires rebuilding the
    /// transmittance lookup table; moving or rotating the planet doesn't.
    pub fn is_invalidated_by(&self, other: &Self) -> bool {
        self.serialize() != other.serialize()
    }

    /// Returns the light scattered by this atmosphere, in its local space.
    pub fn scattering_light(&self) -> Option<gpu::ScatteringLight> {
        let sun = self.sun?;

        Some(gpu::ScatteringLight {
            dir: self.world_to_local().transform_vector3(sun.dir_to_sun()),
            color: sun.radiance(),
        })
    }

    /// Returns the sunlight reaching given world-space position: the sun's
    /// color dimmed by the atmosphere (looked up in `lut`) and by the
    /// overcast.
    pub fn sun_lighting(
        &self,
        lut: &TransmittanceLutData,
        camera_pos: Vec3,
        ambient_dirty: bool,
    ) -> Option<SunLighting> {
        let sun = self.sun?;
        let world_to_local = self.world_to_local();

        let transmittance = lut.sample(
            &self.serialize(),
            world_to_local.transform_point3(camera_pos),
            world_to_local.transform_vector3(sun.dir_to_sun()),
        );

        let color = sun.base_color * transmittance;
        let color =
            color.lerp(color * self.overcast_sun_occlusion, self.overcast);

        Some(SunLighting::new(color, sun.base_intensity, ambient_dirty))
    }
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,
            planet_radius: 2.0,
            atmosphere_radius: 2.5,
            overcast: 0.0,
            overcast_sun_occlusion: 0.3,
            sun: None,
            parameters: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec2};

    use super::*;

    #[test]
    fn rayleigh_coefficients() {
        let target = AtmosphereParameters::default().rayleigh_coefficients();

        assert!(target.x < target.y);
        assert!(target.y < target.z);
        assert_relative_eq!((300.0f32 / 700.0).powi(4), target.x);
        assert_relative_eq!((300.0f32 / 460.0).powi(4), target.z);
    }

    #[test]
    fn sanitized() {
        let target = AtmosphereParameters {
            rayleigh_density_avg: 0.0,
            mie_coefficient: -1.0,
            sky_transmittance_weight: 2.0,
            ..Default::default()
        }
        .sanitized();

        assert!(target.rayleigh_density_avg > 0.0);
        assert_eq!(0.0, target.mie_coefficient);
        assert_eq!(1.0, target.sky_transmittance_weight);

        let params = AtmosphereParameters::default();

        assert_eq!(params, params.sanitized());
    }

    #[test]
    fn degenerate_radii() {
        let target = Atmosphere {
            planet_radius: 0.0,
            atmosphere_radius: -1.0,
            ..Default::default()
        };

        assert!(target.scaled_planet_radius() > 0.0);
        assert!(
            target.scaled_atmosphere_radius() > target.scaled_planet_radius()
        );
    }

    #[test]
    fn scaled_radii() {
        let target = Atmosphere {
            scale: 100.0,
            ..Default::default()
        };

        assert_eq!(200.0, target.scaled_planet_radius());
        assert_eq!(250.0, target.scaled_atmosphere_radius());
        assert_eq!(200.0, target.serialize().planet_radius());
        assert_eq!(250.0, target.serialize().atmosphere_radius());
    }

    #[test]
    fn aerial_perspective_clip_planes() {
        let target = Atmosphere::default();

        let (near, far) =
            target.aerial_perspective_clip_planes(vec3(0.0, 0.0, 10.0));

        assert_relative_eq!(7.5, near);
        assert_relative_eq!(12.5, far);

        // Inside the atmosphere
        let (near, far) =
            target.aerial_perspective_clip_planes(vec3(0.0, 2.2, 0.0));

        assert_eq!(0.0, near);
        assert_relative_eq!(4.7, far);

        // Far plane gets limited
        let target = Atmosphere {
            scale: 1000.0,
            ..Default::default()
        };

        let (near, far) =
            target.aerial_perspective_clip_planes(vec3(0.0, 2200.0, 0.0));

        assert_eq!(0.0, near);
        assert_eq!(1000.0, far);
    }

    #[test]
    fn angular_size() {
        let target = Atmosphere::default();

        assert_relative_eq!(
            2.0 * (0.25f32).asin(),
            target.angular_size(vec3(10.0, 0.0, 0.0))
        );

        assert_eq!(
            std::f32::consts::PI,
            target.angular_size(vec3(0.0, 2.1, 0.0))
        );
    }

    #[test]
    fn world_to_local() {
        let target = Atmosphere {
            center: vec3(10.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..Default::default()
        };

        let pos = target
            .world_to_local()
            .transform_point3(vec3(10.0, 3.0, 0.0));

        assert_relative_eq!(vec3(0.0, 3.0, 0.0), pos, epsilon = 0.0001);

        let dir = target
            .world_to_local()
            .transform_vector3(vec3(0.0, 0.0, -1.0));

        assert_relative_eq!(vec3(1.0, 0.0, 0.0), dir, epsilon = 0.0001);
    }

    #[test]
    fn is_invalidated_by() {
        let target = Atmosphere::default();

        let moved = Atmosphere {
            center: vec3(1.0, 2.0, 3.0),
            overcast: 0.5,
            ..target
        };

        let resized = Atmosphere {
            atmosphere_radius: 3.0,
            ..target
        };

        assert!(!target.is_invalidated_by(&moved));
        assert!(target.is_invalidated_by(&resized));
    }

    #[test]
    fn screen_space_bounds() {
        let camera = Camera::new(
            Affine3A::from_translation(vec3(0.0, 0.0, 10.0)),
            glam::Mat4::perspective_rh(
                90f32.to_radians(),
                1.0,
                0.1,
                1000.0,
            ),
            uvec2(512, 512),
        );

        let target = Atmosphere::default();
        let bounds = target.screen_space_bounds(&camera).unwrap();

        // The box spans 2.5 units on each side, with its nearest face 7.5
        // units away from the camera
        let extent = 0.5 * 2.5 / 7.5;

        assert_relative_eq!(vec2(0.5 - extent, 0.5 - extent), bounds.min);
        assert_relative_eq!(vec2(0.5 + extent, 0.5 + extent), bounds.max);
    }

    #[test]
    fn sun_lighting() {
        let sun = Sun {
            direction: vec3(0.0, -1.0, 0.0),
            base_color: Vec3::ONE,
            base_intensity: 3.0,
        };

        let target = Atmosphere {
            sun: Some(sun),
            parameters: AtmosphereParameters {
                mie_coefficient: 0.5,
                ..Default::default()
            },
            ..Default::default()
        };

        let lut = TransmittanceLutData::compute(&target.serialize());
        let camera_pos = vec3(0.0, 2.1, 0.0);

        let lighting = target.sun_lighting(&lut, camera_pos, true).unwrap();

        assert!(lighting.enabled);
        assert!(lighting.ambient_dirty);
        assert_eq!(3.0, lighting.intensity);
        assert!(lighting.color.cmple(Vec3::ONE).all());
        assert!(lighting.color.x > lighting.color.z);

        // Overcast dims the sun down to the occlusion factor
        let overcast = Atmosphere {
            overcast: 1.0,
            ..target
        };

        let overcast_lighting =
            overcast.sun_lighting(&lut, camera_pos, false).unwrap();

        assert_relative_eq!(
            lighting.color * 0.3,
            overcast_lighting.color,
            epsilon = 0.0001
        );

        // Sun below the horizon, as seen from the planet's surface
        let night = Atmosphere {
            sun: Some(Sun {
                direction: vec3(0.0, 1.0, 0.0),
                ..sun
            }),
            ..target
        };

        let night_lighting =
            night.sun_lighting(&lut, camera_pos, false).unwrap();

        assert!(!night_lighting.enabled);

        let sunless = Atmosphere {
            sun: None,
            ..target
        };

        assert_eq!(None, sunless.sun_lighting(&lut, camera_pos, false));
    }
}
