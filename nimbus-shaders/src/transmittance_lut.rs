use nimbus_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)]
    atmosphere: &AtmosphereParams,
    #[spirv(descriptor_set = 0, binding = 1)] out: TexRgba32,
) {
    let texel = global_id.xy();
    let size = TransmittanceLut::SIZE;

    if texel.x >= size.x || texel.y >= size.y {
        return;
    }

    let transmittance = TransmittanceLut::eval(atmosphere, texel, size);

    unsafe {
        out.write(texel, transmittance.extend(1.0));
    }
}
