mod compute_pass;
mod fullscreen_pass;
mod pass_layout;
mod scene_inputs;

use glam::{uvec3, UVec2, UVec3};

pub use self::compute_pass::*;
pub use self::fullscreen_pass::*;
pub use self::pass_layout::*;
pub use self::scene_inputs::*;

/// Number of workgroups needed to cover given 2D texture with kernels running
/// `8x8` threads per workgroup.
pub fn workgroups_2d(size: UVec2) -> UVec3 {
    uvec3((size.x + 7) / 8, (size.y + 7) / 8, 1)
}

/// Number of workgroups needed to cover given 3D texture with kernels running
/// `4x4x4` threads per workgroup.
pub fn workgroups_3d(size: UVec3) -> UVec3 {
    (size + UVec3::splat(3)) / 4
}

#[cfg(test)]
mod tests {
    use glam::{uvec2, uvec3};

    use super::*;

    #[test]
    fn workgroups() {
        assert_eq!(uvec3(16, 32, 1), workgroups_2d(uvec2(128, 256)));
        assert_eq!(uvec3(17, 1, 1), workgroups_2d(uvec2(129, 1)));
        assert_eq!(uvec3(8, 8, 8), workgroups_3d(uvec3(32, 32, 32)));
        assert_eq!(uvec3(1, 1, 1), workgroups_3d(uvec3(1, 1, 1)));
    }
}
