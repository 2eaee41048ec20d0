use nimbus_gpu::prelude::*;
use spirv_std::arch::IndexUnchecked;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &BlurPassParams,
    #[spirv(descriptor_set = 0, binding = 0, storage_buffer)] weights: &[f32],
    #[spirv(descriptor_set = 0, binding = 1)] input_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 3)] out: TexRgba16,
) {
    let texel = global_id.xy();
    let size = params.size();

    if texel.x >= size.x || texel.y >= size.y {
        return;
    }

    // Safety: the host allocates weights for the largest supported kernel
    let weight = |i: u32| unsafe { *weights.index_unchecked(i as usize) };

    let color = params.eval(texel, weight, |texel| input_tex.fetch(texel));

    unsafe {
        out.write(texel, color);
    }
}
