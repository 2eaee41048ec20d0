use nimbus_gpu::prelude::*;

#[spirv(compute(threads(4, 4, 4)))]
pub fn main(
    #[spirv(global_invocation_id)] global_id: UVec3,
    #[spirv(push_constant)] params: &AerialPerspectiveParams,
    #[spirv(descriptor_set = 0, binding = 0, uniform)]
    atmosphere: &AtmosphereParams,
    #[spirv(descriptor_set = 0, binding = 1, uniform)]
    raymarch: &RaymarchParams,
    #[spirv(descriptor_set = 0, binding = 2, uniform)] sky: &SkyPassParams,
    #[spirv(descriptor_set = 0, binding = 3)] transmittance_lut_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 5)] out_luminance: Tex3dRgba16,
    #[spirv(descriptor_set = 0, binding = 6)]
    out_transmittance: Tex3dRgba16,
) {
    let size = params.size();

    if global_id.x >= size.x || global_id.y >= size.y || global_id.z >= size.z
    {
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

    let scattering = params.eval(
        atmosphere,
        raymarch,
        global_id,
        sky.light(),
        sky.overcast(),
        sun_transmittance,
    );

    unsafe {
        out_luminance.write(global_id, scattering.luminance.extend(1.0));

        out_transmittance
            .write(global_id, scattering.transmittance.extend(1.0));
    }
}
