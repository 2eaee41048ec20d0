use bytemuck::{Pod, Zeroable};
use glam::{vec3, vec4, Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{lerp, F32Ext, Ray, Temporal, NIMBUS_EPSILON};

/// Resolution of the lookup texture describing cloud density as a function of
/// the height within the cloud layer.
pub const CLOUD_DENSITY_LUT_SIZE: u32 = 32;

/// Upper bound on raymarching steps per texel.
pub const CLOUD_MAX_STEPS: u32 = 128;

/// Number of steps taken towards the light when computing self-shadowing.
pub const CLOUD_LIGHT_STEPS: u32 = 4;

/// Optical depth of the entire layer's thickness at density `1.0`.
pub const CLOUD_EXTINCTION: f32 = 4.0;

/// Shape of the volume occupied by clouds.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub enum CloudShape {
    /// Spherical shell surrounding the planet - used when clouds are seen
    /// from above or from within.
    Shell,

    /// Flat slab in the dome's local space (y pointing up) - used when clouds
    /// are seen from below.
    Slab,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct CloudPassParams {
    /// x - inner height (distance from the planet's center for shells,
    ///     altitude for slabs)
    /// y - outer height
    /// z - thickness
    /// w - max step length
    pub d0: Vec4,

    /// x - step length exponent
    /// y - density multiplier
    /// z - shape noise scale
    /// w - detail noise scale
    pub d1: Vec4,

    /// x - detail noise strength
    /// y - ambient occlusion
    /// z - planet radius
    /// w - shape (0 = shell, 1 = slab)
    pub d2: Vec4,

    /// xyz - direction towards the light
    /// w - whether aerial perspective should be applied
    pub d3: Vec4,

    /// xyz - light color, premultiplied by intensity
    /// w - max raymarching distance (slabs only)
    pub d4: Vec4,

    /// xyz - ambient light color
    pub d5: Vec4,

    /// xy - size of the target texture
    /// zw - size of the blue noise texture
    pub d6: Vec4,

    /// xy - blue noise jitter, in target-texture fractions
    /// z - aerial perspective near plane
    /// w - aerial perspective far plane
    pub d7: Vec4,

    /// xyz - offset applied to noise lookups
    pub d8: Vec4,

    /// Inverse of the camera's projection, used to turn the scene's depth
    /// into distances
    pub inv_projection: Mat4,

    /// x - whether the scene's depth limits raymarching
    /// y - scale converting raymarching-space distances into world-space
    ///     distances
    /// zw - size of the scene's depth buffer
    pub d9: Vec4,
}

impl CloudPassParams {
    pub fn inner_height(&self) -> f32 {
        self.d0.x
    }

    pub fn outer_height(&self) -> f32 {
        self.d0.y
    }

    pub fn thickness(&self) -> f32 {
        self.d0.z.max(NIMBUS_EPSILON)
    }

    pub fn max_step_length(&self) -> f32 {
        self.d0.w.max(NIMBUS_EPSILON)
    }

    pub fn step_length_exponent(&self) -> f32 {
        self.d1.x
    }

    pub fn density_multiplier(&self) -> f32 {
        self.d1.y
    }

    pub fn shape_scale(&self) -> f32 {
        self.d1.z.max(NIMBUS_EPSILON)
    }

    pub fn detail_scale(&self) -> f32 {
        self.d1.w.max(NIMBUS_EPSILON)
    }

    pub fn detail_strength(&self) -> f32 {
        self.d2.x
    }

    pub fn ambient_occlusion(&self) -> f32 {
        self.d2.y
    }

    pub fn planet_radius(&self) -> f32 {
        self.d2.z
    }

    pub fn shape(&self) -> CloudShape {
        if self.d2.w > 0.5 {
            CloudShape::Slab
        } else {
            CloudShape::Shell
        }
    }

    pub fn light_dir(&self) -> Vec3 {
        self.d3.xyz()
    }

    pub fn has_aerial_perspective(&self) -> bool {
        self.d3.w > 0.5
    }

    pub fn light_color(&self) -> Vec3 {
        self.d4.xyz()
    }

    pub fn max_distance(&self) -> f32 {
        self.d4.w
    }

    pub fn ambient_light(&self) -> Vec3 {
        self.d5.xyz()
    }

    pub fn target_size(&self) -> Vec2 {
        self.d6.xy()
    }

    pub fn blue_noise_size(&self) -> Vec2 {
        self.d6.zw()
    }

    pub fn blue_noise_jitter(&self) -> Vec2 {
        self.d7.xy()
    }

    pub fn aerial_perspective_clip(&self) -> Vec2 {
        self.d7.zw()
    }

    pub fn noise_offset(&self) -> Vec3 {
        self.d8.xyz()
    }

    pub fn clips_by_scene_depth(&self) -> bool {
        self.d9.x > 0.5
    }

    pub fn distance_scale(&self) -> f32 {
        self.d9.y.max(NIMBUS_EPSILON)
    }

    pub fn scene_depth_size(&self) -> Vec2 {
        self.d9.zw()
    }

    /// Converts a value read from the scene's depth buffer into the maximum
    /// raymarching distance (in raymarching space) for the texel at `uv`.
    pub fn max_distance_for_depth(&self, uv: Vec2, depth: f32) -> f32 {
        if !self.clips_by_scene_depth() || depth >= 1.0 {
            return f32::MAX;
        }

        let ndc = Temporal::uv_to_ndc(uv);
        let pos = self.inv_projection * vec4(ndc.x, ndc.y, depth, 1.0);

        if pos.w == 0.0 {
            return f32::MAX;
        }

        (pos.xyz() / pos.w).length() / self.distance_scale()
    }

    /// Converts raymarching-space distance into the aerial perspective
    /// volume's w coordinate.
    pub fn aerial_perspective_w(&self, depth: f32) -> f32 {
        let clip = self.aerial_perspective_clip();

        (depth * self.distance_scale()).inverse_lerp(clip.x, clip.y)
    }

    /// Returns texel of the blue noise texture used to dither given
    /// texture-space position.
    pub fn blue_noise_uv(&self, uv: Vec2) -> Vec2 {
        let scale = self.target_size() / self.blue_noise_size().max(Vec2::ONE);

        (uv + self.blue_noise_jitter()) * scale
    }

    /// Returns the normalized (`0.0` at the bottom, `1.0` at the top) height
    /// of given point within the cloud layer.
    pub fn height_fraction(&self, pos: Vec3) -> f32 {
        let height = match self.shape() {
            CloudShape::Shell => pos.length(),
            CloudShape::Slab => pos.y,
        };

        ((height - self.inner_height()) / self.thickness()).saturate()
    }

    /// Returns the section of given ray that travels through the cloud
    /// layer, as `(start, end)` distances; `start >= end` means the ray
    /// misses the layer.
    pub fn segment(&self, ray: Ray) -> (f32, f32) {
        match self.shape() {
            CloudShape::Shell => self.shell_segment(ray),
            CloudShape::Slab => self.slab_segment(ray),
        }
    }

    fn shell_segment(&self, ray: Ray) -> (f32, f32) {
        let r = ray.origin().length();
        let (inner_near, inner_far) =
            ray.intersect_sphere(self.inner_height());

        let (outer_near, outer_far) =
            ray.intersect_sphere(self.outer_height());

        if r < self.inner_height() {
            // Below the clouds; the ground blocks everything below horizon
            let (ground_near, _) = ray.intersect_sphere(self.planet_radius());

            if ground_near >= 0.0 && r >= self.planet_radius() {
                return (0.0, 0.0);
            }

            return (inner_far, outer_far);
        }

        let (start, exit) = if r <= self.outer_height() {
            (0.0, outer_far)
        } else {
            (outer_near, outer_far)
        };

        if exit < 0.0 {
            return (0.0, 0.0);
        }

        let end = if inner_near >= 0.0 && inner_far >= 0.0 {
            inner_near.min(exit)
        } else {
            exit
        };

        (start.max(0.0), end)
    }

    fn slab_segment(&self, ray: Ray) -> (f32, f32) {
        let origin = ray.origin().y;
        let dir = ray.dir().y;

        let (start, end) = if dir.abs() < NIMBUS_EPSILON {
            if origin >= self.inner_height() && origin <= self.outer_height() {
                (0.0, self.max_distance())
            } else {
                (0.0, 0.0)
            }
        } else {
            let t0 = (self.inner_height() - origin) / dir;
            let t1 = (self.outer_height() - origin) / dir;

            (t0.min(t1).max(0.0), t0.max(t1))
        };

        (start, end.min(start + self.max_distance()))
    }

    /// Returns length of the raymarching step taken `t` units away from the
    /// camera; steps grow with distance, so that far-away clouds are cheaper.
    pub fn step_length(&self, t: f32) -> f32 {
        let max = self.max_step_length();
        let min = max * 0.02;

        t.max(0.0).powf(self.step_length_exponent()).clamp(min, max)
    }

    /// Returns cloud density at given point.
    ///
    /// `density_curve` maps the height fraction into base density (that's
    /// the density lookup texture); shape and detail come from procedural
    /// noise.
    pub fn density(
        &self,
        pos: Vec3,
        density_curve: impl Fn(f32) -> f32,
    ) -> f32 {
        let height = self.height_fraction(pos);
        let pos = pos + self.noise_offset();

        let shape = fbm(pos / self.shape_scale(), 3);
        let detail = fbm(pos / self.detail_scale(), 2);

        let density =
            shape * density_curve(height) - detail * self.detail_strength();

        density.max(0.0) * self.density_multiplier()
    }

    /// Raymarches clouds along given ray, stopping at `max_dist` (e.g. the
    /// distance to the scene's geometry).
    ///
    /// `offset` (in `[0, 1)`) dithers the first step.
    pub fn raymarch(
        &self,
        ray: Ray,
        max_dist: f32,
        offset: f32,
        density_curve: impl Fn(f32) -> f32 + Copy,
    ) -> CloudSample {
        let (start, end) = self.segment(ray);
        let end = end.min(max_dist);

        if end <= start {
            return CloudSample::EMPTY;
        }

        let sigma_scale = CLOUD_EXTINCTION / self.thickness();
        let light_step = self.thickness() / (2 * CLOUD_LIGHT_STEPS) as f32;
        let phase = dual_lobe_phase(ray.dir().dot(self.light_dir()));

        let mut luminance = Vec3::ZERO;
        let mut transmittance = 1.0;
        let mut depth_sum = 0.0;
        let mut weight_sum = 0.0;

        let mut t = start + self.step_length(start) * offset;
        let mut i = 0;

        while i < CLOUD_MAX_STEPS && t < end && transmittance > 0.01 {
            let dt = self.step_length(t).min(end - t);
            let pos = ray.at(t);
            let density = self.density(pos, density_curve);

            if density > 0.0 {
                let sigma = density * sigma_scale;
                let sample_transmittance = (-sigma * dt).exp();

                let sun = {
                    let mut depth = 0.0;
                    let mut j = 0;

                    while j < CLOUD_LIGHT_STEPS {
                        let t = ((j as f32) + 0.5) * light_step;
                        let pos = pos + self.light_dir() * t;

                        depth += self.density(pos, density_curve) * light_step;
                        j += 1;
                    }

                    self.light_color() * (-depth * sigma_scale).exp() * phase
                };

                let ambient = {
                    let height = self.height_fraction(pos);
                    let occlusion =
                        (-self.ambient_occlusion() * density).exp();

                    self.ambient_light() * lerp(occlusion, 1.0, height)
                };

                let absorbed = transmittance * (1.0 - sample_transmittance);

                luminance += (sun + ambient) * absorbed;
                depth_sum += t * absorbed;
                weight_sum += absorbed;
                transmittance *= sample_transmittance;
            }

            t += dt;
            i += 1;
        }

        let depth = if weight_sum > 0.0 {
            depth_sum / weight_sum
        } else {
            end
        };

        CloudSample {
            luminance,
            transmittance,
            depth,
        }
    }
}

/// Clouds seen through a single texel.
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct CloudSample {
    pub luminance: Vec3,
    pub transmittance: f32,

    /// Opacity-weighted distance to the clouds
    pub depth: f32,
}

impl CloudSample {
    pub const EMPTY: Self = Self {
        luminance: Vec3::ZERO,
        transmittance: 1.0,
        depth: 0.0,
    };

    /// Tints these clouds by the atmosphere between them and the camera.
    pub fn with_aerial_perspective(
        self,
        ap_luminance: Vec3,
        ap_transmittance: Vec3,
    ) -> Self {
        let coverage = 1.0 - self.transmittance;

        Self {
            luminance: self.luminance * ap_transmittance
                + ap_luminance * coverage,
            ..self
        }
    }

    pub fn serialize(&self) -> Vec4 {
        self.luminance.extend(self.transmittance)
    }
}

/// Henyey-Greenstein phase function.
pub fn henyey_greenstein(cos_theta: f32, g: f32) -> f32 {
    let g2 = g * g;
    let denom = (1.0 + g2 - 2.0 * g * cos_theta).max(NIMBUS_EPSILON);

    (1.0 - g2) / (4.0 * core::f32::consts::PI * denom * denom.sqrt())
}

/// Mix of a strong forward-scattering lobe and a weak back-scattering one,
/// approximating the silver lining of clouds.
pub fn dual_lobe_phase(cos_theta: f32) -> f32 {
    lerp(
        henyey_greenstein(cos_theta, -0.2),
        henyey_greenstein(cos_theta, 0.6),
        0.7,
    )
}

fn hash(p: Vec3) -> f32 {
    let p = (p * 0.3183099 + vec3(0.1, 0.1, 0.1)).fract() * 17.0;

    (p.x * p.y * p.z * (p.x + p.y + p.z)).fract()
}

/// Trilinearly interpolated value noise, in `[0, 1]`.
pub fn value_noise(p: Vec3) -> f32 {
    let i = p.floor();
    let f = p - i;
    let f = f * f * (Vec3::splat(3.0) - 2.0 * f);

    let n = |x: f32, y: f32, z: f32| hash(i + vec3(x, y, z));

    let x00 = lerp(n(0.0, 0.0, 0.0), n(1.0, 0.0, 0.0), f.x);
    let x10 = lerp(n(0.0, 1.0, 0.0), n(1.0, 1.0, 0.0), f.x);
    let x01 = lerp(n(0.0, 0.0, 1.0), n(1.0, 0.0, 1.0), f.x);
    let x11 = lerp(n(0.0, 1.0, 1.0), n(1.0, 1.0, 1.0), f.x);

    lerp(lerp(x00, x10, f.y), lerp(x01, x11, f.y), f.z)
}

/// Fractal sum of value noise, normalized into `[0, 1]`.
pub fn fbm(p: Vec3, octaves: u32) -> f32 {
    let mut sum = 0.0;
    let mut norm = 0.0;
    let mut amplitude = 1.0;
    let mut p = p;
    let mut i = 0;

    while i < octaves {
        sum += value_noise(p) * amplitude;
        norm += amplitude;
        amplitude *= 0.5;
        p *= 2.03;
        i += 1;
    }

    if norm > 0.0 {
        sum / norm
    } else {
        0.0
    }
}

/// Evaluates the piecewise-linear density curve stored in the density lookup
/// texture, given its texels; `x` is clamped to `[0, 1]`.
pub fn sample_density_lut(x: f32, fetch: impl Fn(u32) -> f32) -> f32 {
    let size = CLOUD_DENSITY_LUT_SIZE as f32;
    let pos = (x.saturate() * size - 0.5).clamp(0.0, size - 1.0);
    let i = pos.floor();
    let j = (i + 1.0).min(size - 1.0);

    lerp(fetch(i as u32), fetch(j as u32), pos - i)
}
