use bytemuck::{Pod, Zeroable};
use glam::{
    uvec2, uvec4, vec2, vec4, Mat4, UVec2, UVec4, Vec2, Vec3, Vec4,
    Vec4Swizzles,
};

/// How many times (per axis) the temporally upsampled buffers are larger than
/// the buffers rendered each frame.
pub const TEMPORAL_UPSCALE_FACTOR: u32 = 4;

/// Number of frames it takes to fill every texel of the upsampled buffer.
pub const TEMPORAL_PHASES: u32 =
    TEMPORAL_UPSCALE_FACTOR * TEMPORAL_UPSCALE_FACTOR;

/// Order in which sub-pixels of each 4x4 block get refreshed, as `(x, y)`
/// pairs; consecutive phases land far apart from each other so that the
/// partially-refreshed image stays evenly dithered.
pub const TEMPORAL_CROSS_PATTERN: [u32; 2 * TEMPORAL_PHASES as usize] = [
    0, 0, 2, 2, 2, 0, 0, 2, //
    1, 1, 3, 3, 3, 1, 1, 3, //
    1, 0, 3, 2, 3, 0, 1, 2, //
    0, 1, 2, 3, 2, 1, 0, 3, //
];

pub struct Temporal;

impl Temporal {
    /// Returns which sub-pixel of each 4x4 block gets refreshed during given
    /// phase.
    pub fn subpixel(phase: u32) -> UVec2 {
        let idx = 2 * (phase % TEMPORAL_PHASES) as usize;

        uvec2(TEMPORAL_CROSS_PATTERN[idx], TEMPORAL_CROSS_PATTERN[idx + 1])
    }

    /// Returns the offset (in normalized device coordinates, y pointing up)
    /// applied to the camera so that each low-resolution texel gets
    /// raymarched through the center of the sub-pixel refreshed during given
    /// phase.
    pub fn jitter(phase: u32, low_res_size: UVec2) -> Vec2 {
        let factor = TEMPORAL_UPSCALE_FACTOR as f32;
        let low_res_size = low_res_size.max(UVec2::ONE).as_vec2();

        let offset =
            (Self::subpixel(phase).as_vec2() + vec2(0.5, 0.5)) / factor;

        let offset = (offset * 2.0 - Vec2::ONE) / low_res_size;

        vec2(offset.x, -offset.y)
    }

    /// Returns the full-resolution texel into which given low-resolution
    /// texel gets written during given phase.
    pub fn upsampled_texel(low_res_texel: UVec2, phase: u32) -> UVec2 {
        low_res_texel * TEMPORAL_UPSCALE_FACTOR + Self::subpixel(phase)
    }

    /// Converts texture coordinates (y pointing down) into normalized device
    /// coordinates (y pointing up).
    pub fn uv_to_ndc(uv: Vec2) -> Vec2 {
        vec2(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0)
    }

    /// Inverse of [`Self::uv_to_ndc()`].
    pub fn ndc_to_uv(ndc: Vec2) -> Vec2 {
        vec2(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5)
    }
}

/// Screen-space displacement of a texel since the previous frame.
///
/// Everything rendered through the temporal buffers (sky, clouds) is treated
/// as infinitely far away, so only the camera's rotation and projection
/// contribute to the motion - that's why view-projection matrices used here
/// must not contain the camera's translation.
#[derive(Clone, Copy, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct MotionVector {
    /// Current position minus previous position, in texture coordinates
    pub delta: Vec2,

    /// Whether the previous position was visible on the previous frame
    pub valid: bool,
}

impl MotionVector {
    pub fn eval(
        curr_inv_view_proj: Mat4,
        prev_view_proj: Mat4,
        uv: Vec2,
    ) -> Self {
        let ndc = Temporal::uv_to_ndc(uv);
        let dir = curr_inv_view_proj * vec4(ndc.x, ndc.y, 1.0, 1.0);

        let dir = if dir.w.abs() > 0.0 {
            dir.xyz() / dir.w
        } else {
            dir.xyz()
        };

        let prev = prev_view_proj * dir.extend(0.0);

        if prev.w <= 0.0 {
            return Self::default();
        }

        let prev_uv = Temporal::ndc_to_uv(prev.xy() / prev.w);

        let valid = prev_uv.x >= 0.0
            && prev_uv.y >= 0.0
            && prev_uv.x <= 1.0
            && prev_uv.y <= 1.0;

        Self {
            delta: uv - prev_uv,
            valid,
        }
    }

    pub fn serialize(&self) -> Vec4 {
        let valid = if self.valid { 1.0 } else { 0.0 };

        vec4(self.delta.x, self.delta.y, valid, 1.0)
    }

    pub fn deserialize(d0: Vec4) -> Self {
        Self {
            delta: d0.xy(),
            valid: d0.z > 0.5,
        }
    }

    /// Returns where the texel at `uv` was located on the previous frame.
    pub fn prev_uv(&self, uv: Vec2) -> Vec2 {
        uv - self.delta
    }

    /// Returns the color used for visualizing this motion vector.
    pub fn debug_color(&self) -> Vec3 {
        if self.valid {
            (self.delta * 10.0).abs().extend(0.0)
        } else {
            Vec3::new(1.0, 0.0, 1.0)
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct MotionVectorsPassParams {
    /// Inverse of this frame's (non-jittered, translation-less)
    /// view-projection matrix
    pub curr_inv_view_proj: Mat4,

    /// Previous frame's (translation-less) view-projection matrix
    pub prev_view_proj: Mat4,
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct ReprojectPassParams {
    /// xy - size of the full-resolution buffers
    /// zw - size of the low-resolution buffer
    pub d0: UVec4,

    /// x - whether the accumulation buffer contains anything worth
    ///     reprojecting (zero right after the buffers have been recreated)
    pub d1: UVec4,
}

impl ReprojectPassParams {
    pub fn new(
        full_res_size: UVec2,
        low_res_size: UVec2,
        has_history: bool,
    ) -> Self {
        Self {
            d0: uvec4(
                full_res_size.x,
                full_res_size.y,
                low_res_size.x,
                low_res_size.y,
            ),
            d1: uvec4(has_history as u32, 0, 0, 0),
        }
    }

    pub fn full_res_size(&self) -> UVec2 {
        self.d0.xy()
    }

    pub fn low_res_size(&self) -> UVec2 {
        self.d0.zw()
    }

    pub fn has_history(&self) -> bool {
        self.d1.x != 0
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct UpsamplePassParams {
    /// xy - sub-pixel refreshed during this frame
    /// zw - size of the low-resolution buffer
    pub d0: UVec4,
}

impl UpsamplePassParams {
    pub fn new(phase: u32, low_res_size: UVec2) -> Self {
        let subpixel = Temporal::subpixel(phase);

        Self {
            d0: uvec4(subpixel.x, subpixel.y, low_res_size.x, low_res_size.y),
        }
    }

    pub fn subpixel(&self) -> UVec2 {
        self.d0.xy()
    }

    pub fn low_res_size(&self) -> UVec2 {
        self.d0.zw()
    }

    pub fn target(&self, low_res_texel: UVec2) -> UVec2 {
        low_res_texel * TEMPORAL_UPSCALE_FACTOR + self.subpixel()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{vec3, Quat};

    use super::*;

    #[test]
    fn cross_pattern_visits_every_subpixel_once() {
        let mut visited = [[0; 4]; 4];

        for phase in 0..TEMPORAL_PHASES {
            let subpixel = Temporal::subpixel(phase);

            visited[subpixel.y as usize][subpixel.x as usize] += 1;
        }

        assert_eq!([[1; 4]; 4], visited);
        assert_eq!(Temporal::subpixel(0), Temporal::subpixel(TEMPORAL_PHASES));
    }

    #[test]
    fn jitter() {
        let low_res_size = uvec2(100, 50);

        // Sub-pixel (0, 0) is the top-left corner of the block
        let actual = Temporal::jitter(0, low_res_size);

        assert_relative_eq!(vec2(-0.0075, 0.015), actual);

        // Sub-pixel (2, 2) is just past the block's center
        let actual = Temporal::jitter(1, low_res_size);

        assert_relative_eq!(vec2(0.0025, -0.005), actual);

        // Over a full cycle, jitter averages out
        let sum: Vec2 = (0..TEMPORAL_PHASES)
            .map(|phase| Temporal::jitter(phase, low_res_size))
            .sum();

        assert_relative_eq!(Vec2::ZERO, sum, epsilon = 0.00001);
    }

    #[test]
    fn upsampled_texel() {
        assert_eq!(uvec2(0, 0), Temporal::upsampled_texel(uvec2(0, 0), 0));
        assert_eq!(uvec2(14, 22), Temporal::upsampled_texel(uvec2(3, 5), 1));

        let params = UpsamplePassParams::new(2, uvec2(8, 8));

        assert_eq!(uvec2(14, 20), params.target(uvec2(3, 5)));
        assert_eq!(uvec2(8, 8), params.low_res_size());
    }

    #[test]
    fn ndc() {
        assert_eq!(vec2(-1.0, 1.0), Temporal::uv_to_ndc(vec2(0.0, 0.0)));
        assert_eq!(vec2(1.0, -1.0), Temporal::uv_to_ndc(vec2(1.0, 1.0)));

        assert_eq!(
            vec2(0.25, 0.75),
            Temporal::ndc_to_uv(Temporal::uv_to_ndc(vec2(0.25, 0.75)))
        );
    }

    fn view_proj(rotation: Quat) -> Mat4 {
        let proj = Mat4::perspective_infinite_reverse_rh(1.0, 1.5, 0.1);
        let view = Mat4::from_quat(rotation).inverse();

        proj * view
    }

    #[test]
    fn static_camera_has_no_motion() {
        let vp = view_proj(Quat::IDENTITY);

        for uv in [vec2(0.5, 0.5), vec2(0.1, 0.9), vec2(0.75, 0.2)] {
            let motion = MotionVector::eval(vp.inverse(), vp, uv);

            assert!(motion.valid);
            assert_relative_eq!(Vec2::ZERO, motion.delta, epsilon = 0.0001);
        }
    }

    #[test]
    fn rotating_camera_moves_the_sky() {
        let prev = view_proj(Quat::IDENTITY);
        let curr = view_proj(Quat::from_rotation_y(0.1));

        let motion =
            MotionVector::eval(curr.inverse(), prev, vec2(0.5, 0.5));

        // Turning left means the sky slides to the right
        assert!(motion.valid);
        assert!(motion.delta.x > 0.0);
        assert_relative_eq!(0.0, motion.delta.y, epsilon = 0.0001);

        // Turning around means nothing was visible previously
        let curr = view_proj(Quat::from_rotation_y(3.0));

        let motion =
            MotionVector::eval(curr.inverse(), prev, vec2(0.5, 0.5));

        assert!(!motion.valid);
    }

    #[test]
    fn motion_vector_serialization() {
        let target = MotionVector {
            delta: vec2(0.25, -0.5),
            valid: true,
        };

        assert_eq!(target, MotionVector::deserialize(target.serialize()));
        assert_eq!(vec2(0.5, 1.0), target.prev_uv(vec2(0.75, 0.5)));
        assert_eq!(vec3(2.5, 5.0, 0.0), target.debug_color());
    }

    #[test]
    fn reproject_params() {
        let params = ReprojectPassParams::new(
            uvec2(400, 200),
            uvec2(100, 50),
            true,
        );

        assert_eq!(uvec2(400, 200), params.full_res_size());
        assert_eq!(uvec2(100, 50), params.low_res_size());
        assert!(params.has_history());
    }
}
