use nimbus_gpu::prelude::*;

#[spirv(compute(threads(8, 8)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(descriptor_set = 0, binding = 0, uniform)]
    atmosphere: &AtmosphereParams,
    #[spirv(descriptor_set = 0, binding = 1, uniform)]
    raymarch: &RaymarchParams,
    #[spirv(descriptor_set = 0, binding = 2, uniform)] params: &SkyPassParams,
    #[spirv(descriptor_set = 0, binding = 3)] transmittance_lut_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 5)] out: TexRgba16,
) {
    let texel = global_id.xy();
    let size = params.size();

    if texel.x >= size.x || texel.y >= size.y {
        return;
    }

    let sun_transmittance = |pos, dir| {
        TransmittanceLut::sample(
            atmosphere,
            TransmittanceLut::SIZE,
            pos,
            dir,
            |texel| transmittance_lut_tex.fetch(texel),
        )
    };

    let color = params.eval(atmosphere, raymarch, texel, sun_transmittance);

    unsafe {
        out.write(texel, color);
    }
}
