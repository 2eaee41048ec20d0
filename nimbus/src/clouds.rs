use glam::{vec2, vec3, vec4, Affine3A, Vec2, Vec3, Vec4};
use nimbus_gpu::F32Ext;

use crate::{gpu, Atmosphere, Shaders};

/// Piecewise-linear curve describing cloud density as a function of the
/// height within the cloud layer.
#[derive(Clone, Debug, PartialEq)]
pub struct DensityCurve {
    /// `(height, density)` pairs, sorted by height
    keyframes: Vec<Vec2>,
}

impl DensityCurve {
    pub fn new(keyframes: impl IntoIterator<Item = Vec2>) -> Self {
        let mut keyframes: Vec<_> = keyframes.into_iter().collect();

        keyframes.sort_by(|a, b| a.x.total_cmp(&b.x));

        Self { keyframes }
    }

    pub fn keyframes(&self) -> &[Vec2] {
        &self.keyframes
    }

    /// Evaluates the curve; heights outside of the keyframes extend the first
    /// or the last keyframe.
    pub fn eval(&self, height: f32) -> f32 {
        let (Some(first), Some(last)) =
            (self.keyframes.first(), self.keyframes.last())
        else {
            return 0.0;
        };

        if height <= first.x {
            return first.y;
        }

        if height >= last.x {
            return last.y;
        }

        self.keyframes
            .windows(2)
            .find(|pair| height <= pair[1].x)
            .map(|pair| {
                let t = height.inverse_lerp(pair[0].x, pair[1].x);

                gpu::lerp(pair[0].y, pair[1].y, t)
            })
            .unwrap_or(last.y)
    }

    /// Samples the curve into the cloud density lookup texture.
    pub fn bake(&self) -> [f32; gpu::CLOUD_DENSITY_LUT_SIZE as usize] {
        let size = gpu::CLOUD_DENSITY_LUT_SIZE as f32;

        std::array::from_fn(|i| self.eval((i as f32) / size))
    }
}

impl Default for DensityCurve {
    fn default() -> Self {
        Self::new([
            vec2(0.0, 1.0),
            vec2(0.3, 0.5),
            vec2(0.7, 0.25),
            vec2(1.0, 0.0),
        ])
    }
}

/// Appearance of a cloud layer, shared by the cloudscape and the cloud dome.
#[derive(Clone, Debug, PartialEq)]
pub struct CloudLayer {
    /// Height of the layer's bottom, above the planet's surface (for the
    /// cloudscape) or above the dome's origin (for the dome)
    pub altitude: f32,

    pub thickness: f32,

    pub density_multiplier: f32,

    /// Longest raymarching step, as a fraction of the layer's thickness
    pub max_step_length: f32,

    /// How quickly steps grow with the distance from the camera
    pub step_length_exponent: f32,

    pub density_curve: DensityCurve,

    pub shape_scale: f32,
    pub detail_scale: f32,
    pub detail_strength: f32,

    pub ambient_occlusion: f32,
}

impl CloudLayer {
    /// Returns `(inner, outer, thickness)` for a layer starting `base` units
    /// away from the origin of the raymarching space.
    pub fn heights(&self, base: f32) -> Vec3 {
        let thickness = self.thickness.max(gpu::NIMBUS_EPSILON);
        let inner = base + self.altitude;

        vec3(inner, inner + thickness, thickness)
    }

    fn serialize(
        &self,
        base: f32,
        planet_radius: f32,
        shape: gpu::CloudShape,
    ) -> gpu::CloudPassParams {
        let heights = self.heights(base);

        let shape = match shape {
            gpu::CloudShape::Shell => 0.0,
            gpu::CloudShape::Slab => 1.0,
        };

        gpu::CloudPassParams {
            d0: heights.extend(self.max_step_length * heights.z),
            d1: vec4(
                self.step_length_exponent,
                self.density_multiplier,
                self.shape_scale,
                self.detail_scale,
            ),
            d2: vec4(
                self.detail_strength,
                self.ambient_occlusion,
                planet_radius,
                shape,
            ),
            d9: vec4(0.0, 1.0, 0.0, 0.0),
            ..Default::default()
        }
    }
}

impl Default for CloudLayer {
    fn default() -> Self {
        Self {
            altitude: 1000.0,
            thickness: 500.0,
            density_multiplier: 1.0,
            max_step_length: 0.5,
            step_length_exponent: 0.5,
            density_curve: Default::default(),
            shape_scale: 1000.0,
            detail_scale: 200.0,
            detail_strength: 0.1,
            ambient_occlusion: 5.0,
        }
    }
}

/// Raymarching strategy of a cloud renderer: the kernel and the space in
/// which it operates.
pub trait CloudKernel {
    const LABEL: &'static str;

    fn shader(shaders: &Shaders) -> &(wgpu::ShaderModule, &'static str);

    fn layer(&self) -> &CloudLayer;

    /// Transform from world space into the raymarching space; `None` if the
    /// clouds can't be rendered (e.g. there's no planet to wrap them
    /// around).
    fn world_to_local(&self, atmosphere: Option<&Atmosphere>)
        -> Option<Affine3A>;

    /// Serializes the layer's shape; lighting, sizes and jitter are filled
    /// by the renderer.
    fn serialize(
        &self,
        atmosphere: Option<&Atmosphere>,
    ) -> Option<gpu::CloudPassParams>;
}

/// Clouds wrapped around the planet, seen from above or from within.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cloudscape {
    pub layer: CloudLayer,
}

impl CloudKernel for Cloudscape {
    const LABEL: &'static str = "cloudscape";

    fn shader(shaders: &Shaders) -> &(wgpu::ShaderModule, &'static str) {
        &shaders.cloudscape
    }

    fn layer(&self) -> &CloudLayer {
        &self.layer
    }

    fn world_to_local(
        &self,
        atmosphere: Option<&Atmosphere>,
    ) -> Option<Affine3A> {
        Some(atmosphere?.world_to_local())
    }

    fn serialize(
        &self,
        atmosphere: Option<&Atmosphere>,
    ) -> Option<gpu::CloudPassParams> {
        let planet_radius = atmosphere?.scaled_planet_radius();

        Some(self.layer.serialize(
            planet_radius,
            planet_radius,
            gpu::CloudShape::Shell,
        ))
    }
}

/// Flat layer of clouds seen from below, e.g. an overcast sky as seen from
/// the ground.
#[derive(Clone, Debug, PartialEq)]
pub struct CloudDome {
    pub layer: CloudLayer,

    /// Dome-to-world transform; the layer spreads over the dome's xz plane
    pub transform: Affine3A,

    /// Maximum distance (in the dome's space) up to which clouds get
    /// raymarched
    pub max_distance: f32,
}

impl CloudDome {
    /// Offset applied to noise lookups so that clouds stay in place as the
    /// dome moves horizontally (e.g. following the camera).
    pub fn noise_offset(&self) -> Vec3 {
        let origin = self.transform.inverse().transform_point3(Vec3::ZERO);

        vec3(-origin.x, 0.0, -origin.z)
    }

    /// Length of the dome's unit vector in world space.
    pub fn distance_scale(&self) -> f32 {
        self.transform
            .matrix3
            .x_axis
            .length()
            .max(gpu::NIMBUS_EPSILON)
    }
}

impl Default for CloudDome {
    fn default() -> Self {
        Self {
            layer: CloudLayer {
                altitude: 900.0,
                ..Default::default()
            },
            transform: Affine3A::IDENTITY,
            max_distance: 20_000.0,
        }
    }
}

impl CloudKernel for CloudDome {
    const LABEL: &'static str = "cloud_dome";

    fn shader(shaders: &Shaders) -> &(wgpu::ShaderModule, &'static str) {
        &shaders.cloud_dome
    }

    fn layer(&self) -> &CloudLayer {
        &self.layer
    }

    fn world_to_local(&self, _: Option<&Atmosphere>) -> Option<Affine3A> {
        Some(self.transform.inverse())
    }

    fn serialize(
        &self,
        _: Option<&Atmosphere>,
    ) -> Option<gpu::CloudPassParams> {
        let mut params =
            self.layer.serialize(0.0, 0.0, gpu::CloudShape::Slab);

        params.d4.w = self.max_distance.max(0.0);
        params.d8 = self.noise_offset().extend(0.0);
        params.d9.y = self.distance_scale();

        Some(params)
    }
}

/// Decides which cloud layer to render depending on the camera's altitude:
/// below the clouds the sky is overcast and clouds are rendered as a dome,
/// above them they're rendered as a cloudscape.
///
/// This is a host-side helper that the engine never calls on its own: the
/// host evaluates it once per frame, forwards the selection through
/// [`crate::Engine::set_cloud_dome()`], [`crate::Engine::set_cloudscape()`]
/// and [`crate::Atmosphere::overcast`], and draws the veil itself (e.g. as an
/// overlay in its UI pass) using [`Self::veil_color()`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloudLayerSelector {
    pub cloud_height: f32,

    /// Span around the cloud height where the camera is entirely inside the
    /// clouds
    pub transition_solid_length: f32,

    /// Span (on each side of the solid part) over which the veil fades out
    pub transition_fade_length: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloudLayerSelection {
    /// Overcast to apply to the atmosphere
    pub overcast: f32,

    pub dome: bool,
    pub cloudscape: bool,

    /// Opacity of the veil drawn over the camera while it passes through the
    /// clouds; `0.0` when no veil should be drawn
    pub veil_opacity: f32,
}

impl CloudLayerSelector {
    pub fn select(&self, camera_altitude: f32) -> CloudLayerSelection {
        let h = camera_altitude;
        let half_solid = self.transition_solid_length * 0.5;

        let overcast = h.inverse_lerp(
            self.cloud_height + half_solid,
            self.cloud_height - half_solid,
        );

        let veil_opacity = (1.0
            - ((h - self.cloud_height).abs() - half_solid)
                / self.transition_fade_length.max(gpu::NIMBUS_EPSILON))
        .saturate();

        CloudLayerSelection {
            overcast,
            dome: h < self.cloud_height,
            cloudscape: h > self.cloud_height,
            veil_opacity,
        }
    }

    /// Color of the veil the host draws over the camera's output, tinted by
    /// the sun's color; alpha is the veil's opacity.
    ///
    /// The renderer draws no veil by itself.
    pub fn veil_color(
        selection: &CloudLayerSelection,
        base_color: Vec3,
        sun_color: Vec3,
        sun_intensity: f32,
    ) -> Vec4 {
        (base_color * sun_color * sun_intensity)
            .extend(selection.veil_opacity)
    }
}

impl Default for CloudLayerSelector {
    fn default() -> Self {
        Self {
            cloud_height: 900.0,
            transition_solid_length: 20.0,
            transition_fade_length: 50.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn density_curve() {
        let target = DensityCurve::default();

        assert_relative_eq!(1.0, target.eval(0.0));
        assert_relative_eq!(0.75, target.eval(0.15));
        assert_relative_eq!(0.5, target.eval(0.3));
        assert_relative_eq!(0.375, target.eval(0.5));
        assert_relative_eq!(0.0, target.eval(1.0));

        // Clamped
        assert_relative_eq!(1.0, target.eval(-1.0));
        assert_relative_eq!(0.0, target.eval(2.0));

        // Unsorted keyframes get sorted
        let unsorted = DensityCurve::new([vec2(1.0, 0.0), vec2(0.0, 1.0)]);

        assert_relative_eq!(0.25, unsorted.eval(0.75));
        assert_eq!(0.0, DensityCurve::new([]).eval(0.5));
    }

    #[test]
    fn bake() {
        let target = DensityCurve::default().bake();

        assert_eq!(32, target.len());
        assert_relative_eq!(1.0, target[0]);

        // i = 16 sits at height 0.5
        assert_relative_eq!(0.375, target[16]);

        assert!(target.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn cloudscape() {
        let target = Cloudscape::default();
        let atmosphere = Atmosphere::default();

        assert_eq!(None, target.serialize(None));

        let params = target.serialize(Some(&atmosphere)).unwrap();

        assert_eq!(1002.0, params.inner_height());
        assert_eq!(1502.0, params.outer_height());
        assert_eq!(500.0, params.thickness());
        assert_eq!(250.0, params.max_step_length());
        assert_eq!(2.0, params.planet_radius());
        assert_eq!(gpu::CloudShape::Shell, params.shape());
        assert_eq!(1.0, params.distance_scale());
    }

    #[test]
    fn cloud_dome() {
        let target = CloudDome {
            transform: Affine3A::from_scale_rotation_translation(
                Vec3::splat(2.0),
                glam::Quat::IDENTITY,
                vec3(100.0, 5.0, -50.0),
            ),
            ..Default::default()
        };

        let params = target.serialize(None).unwrap();

        assert_eq!(900.0, params.inner_height());
        assert_eq!(1400.0, params.outer_height());
        assert_eq!(gpu::CloudShape::Slab, params.shape());
        assert_eq!(20_000.0, params.max_distance());
        assert_eq!(2.0, params.distance_scale());

        // World's origin, expressed in the dome's space, is (-50, _, 25)
        assert_relative_eq!(vec3(50.0, 0.0, -25.0), params.noise_offset());
    }

    #[test]
    fn layer_selection() {
        let target = CloudLayerSelector::default();

        let below = target.select(500.0);

        assert_eq!(1.0, below.overcast);
        assert!(below.dome);
        assert!(!below.cloudscape);
        assert_eq!(0.0, below.veil_opacity);

        let above = target.select(2000.0);

        assert_eq!(0.0, above.overcast);
        assert!(!above.dome);
        assert!(above.cloudscape);
        assert_eq!(0.0, above.veil_opacity);

        // Inside the solid part of the transition
        let inside = target.select(905.0);

        assert_relative_eq!(0.25, inside.overcast);
        assert_eq!(1.0, inside.veil_opacity);

        // Halfway through the fade
        let fading = target.select(935.0);

        assert_eq!(0.0, fading.overcast);
        assert_relative_eq!(0.5, fading.veil_opacity);
    }

    #[test]
    fn veil_color() {
        let selection = CloudLayerSelector::default().select(935.0);

        let color = CloudLayerSelector::veil_color(
            &selection,
            Vec3::splat(0.5),
            vec3(1.0, 0.5, 0.25),
            2.0,
        );

        assert_relative_eq!(vec4(1.0, 0.5, 0.25, 0.5), color);
    }
}
