use nimbus_gpu::prelude::*;

/// Moves the accumulation buffer to where its texels land this frame,
/// writing the result into a scratch buffer.
///
/// Texels that can't be reprojected (no history, or coming from outside of
/// the previous frame) fall back to the nearest low-resolution sample.
#[spirv(compute(threads(8, 8)))]
pub fn reproject(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &ReprojectPassParams,
    #[spirv(descriptor_set = 0, binding = 0)] accumulation_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 1)] accumulation_sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 2)] motion_vectors_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 3)]
    motion_vectors_sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 4)] low_res_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 6)] out: TexRgba16,
) {
    let texel = global_id.xy();
    let size = params.full_res_size();

    if texel.x >= size.x || texel.y >= size.y {
        return;
    }

    let uv = (texel.as_vec2() + vec2(0.5, 0.5)) / size.as_vec2();

    let motion_vector = MotionVector::deserialize(
        motion_vectors_tex.sample_by_lod(*motion_vectors_sampler, uv, 0.0),
    );

    let color: Vec4 = if params.has_history() && motion_vector.valid {
        accumulation_tex.sample_by_lod(
            *accumulation_sampler,
            motion_vector.prev_uv(uv),
            0.0,
        )
    } else {
        let max = params.low_res_size().max(UVec2::ONE) - UVec2::ONE;

        low_res_tex.fetch((texel / TEMPORAL_UPSCALE_FACTOR).min(max))
    };

    unsafe {
        out.write(texel, color);
    }
}

/// Inserts this frame's low-resolution samples into the accumulation buffer,
/// at the sub-pixel refreshed during the current phase.
#[spirv(compute(threads(8, 8)))]
pub fn upsample(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &UpsamplePassParams,
    #[spirv(descriptor_set = 0, binding = 0)] low_res_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 2)] out: TexRgba16,
) {
    let texel = global_id.xy();
    let size = params.low_res_size();

    if texel.x >= size.x || texel.y >= size.y {
        return;
    }

    let color: Vec4 = low_res_tex.fetch(texel);

    unsafe {
        out.write(params.target(texel), color);
    }
}
