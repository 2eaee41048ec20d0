use nimbus_gpu::prelude::*;

/// Flat layer of clouds seen from below.
#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)] params: &CloudPassParams,
    #[spirv(descriptor_set = 0, binding = 1, uniform)]
    raymarch: &RaymarchParams,
    #[spirv(descriptor_set = 0, binding = 2)] density_lut_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 4)] blue_noise_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 6)] ap_luminance_tex: Tex3d,
    #[spirv(descriptor_set = 0, binding = 7)] ap_luminance_sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 8)] ap_transmittance_tex: Tex3d,
    #[spirv(descriptor_set = 0, binding = 9)]
    ap_transmittance_sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 10)] out: TexRgba16,
    #[spirv(descriptor_set = 1, binding = 1)] scene_depth_tex: TexDepth,
) {
    crate::clouds::main(
        global_id,
        params,
        raymarch,
        density_lut_tex,
        blue_noise_tex,
        ap_luminance_tex,
        ap_luminance_sampler,
        ap_transmittance_tex,
        ap_transmittance_sampler,
        scene_depth_tex,
        out,
    );
}
