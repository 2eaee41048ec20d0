use nimbus_gpu::prelude::*;

/// Downsamples one mip level into the next one with a 2x2 box filter.
///
/// Push constants: `xy` is the size of the destination level and `zw` is the
/// size of the source level.
#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &UVec4,
    #[spirv(descriptor_set = 0, binding = 0)] src: TexRgba16,
    #[spirv(descriptor_set = 0, binding = 1)] dst: TexRgba16,
) {
    let texel = global_id.xy();
    let dst_size = params.xy();
    let src_max = params.zw().max(UVec2::ONE) - UVec2::ONE;

    if texel.x >= dst_size.x || texel.y >= dst_size.y {
        return;
    }

    let base = texel * 2;
    let mut color = Vec4::ZERO;
    let mut i = 0;

    while i < 4 {
        let offset = uvec2(i % 2, i / 2);
        let sample: Vec4 = src.read((base + offset).min(src_max));

        color += sample;
        i += 1;
    }

    unsafe {
        dst.write(texel, color * 0.25);
    }
}
