//! Common structs, algorithms etc. used by Nimbus' kernels and renderer.
//!
//! Everything in here compiles both for the host and for SPIR-V, so the
//! renderer can evaluate on the CPU exactly what the GPU evaluates (e.g. the
//! transmittance lookup table used to tint the sun).

#![cfg_attr(target_arch = "spirv", no_std)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_range_contains)]

mod aerial_perspective;
mod atmosphere;
mod bilinear_filter;
mod blur;
mod clouds;
mod composite;
mod ray;
mod raymarch;
mod scattering;
mod temporal;
mod transmittance_lut;
mod utils;

pub use self::aerial_perspective::*;
pub use self::atmosphere::*;
pub use self::bilinear_filter::*;
pub use self::blur::*;
pub use self::clouds::*;
pub use self::composite::*;
pub use self::ray::*;
pub use self::raymarch::*;
pub use self::scattering::*;
pub use self::temporal::*;
pub use self::transmittance_lut::*;
pub use self::utils::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use spirv_std::glam::*;
    #[cfg(target_arch = "spirv")]
    pub use spirv_std::num_traits::Float;
    pub use spirv_std::{spirv, Image, Sampler};

    pub use crate::*;
}

/// Smallest positive value used to keep divisions and radii sane.
pub const NIMBUS_EPSILON: f32 = 0.0001;
