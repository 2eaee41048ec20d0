#![cfg_attr(target_arch = "spirv", no_std)]

pub mod aerial_perspective;
pub mod blur;
pub mod cloud_dome;
pub mod cloudscape;
pub mod composite;
pub mod motion_vectors;
pub mod sky;
pub mod sky_mips;
pub mod temporal;
pub mod transmittance_lut;

mod clouds;
