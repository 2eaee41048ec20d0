use nimbus_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &MotionVectorsPassParams,
    #[spirv(descriptor_set = 0, binding = 0)] out: TexRgba16,
) {
    let texel = global_id.xy();

    // Both matrices fill the entire push constant block, so the size comes
    // from the texture itself
    let size: UVec2 = out.query_size();

    if texel.x >= size.x || texel.y >= size.y {
        return;
    }

    let uv = (texel.as_vec2() + vec2(0.5, 0.5)) / size.as_vec2();

    let motion_vector = MotionVector::eval(
        params.curr_inv_view_proj,
        params.prev_view_proj,
        uv,
    );

    unsafe {
        out.write(texel, motion_vector.serialize());
    }
}
