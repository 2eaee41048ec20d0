use nimbus_gpu::prelude::*;

/// Raymarches clouds through given texel of the target texture; shared by
/// the cloudscape and the cloud dome, which differ only in parameters.
pub fn main(
    global_id: UVec3,
    params: &CloudPassParams,
    raymarch: &RaymarchParams,
    density_lut_tex: Tex,
    blue_noise_tex: Tex,
    ap_luminance_tex: Tex3d,
    ap_luminance_sampler: &Sampler,
    ap_transmittance_tex: Tex3d,
    ap_transmittance_sampler: &Sampler,
    scene_depth_tex: TexDepth,
    out: TexRgba16,
) {
    let texel = global_id.xy();
    let size = params.target_size().as_uvec2();

    if texel.x >= size.x || texel.y >= size.y {
        return;
    }

    let uv = (texel.as_vec2() + vec2(0.5, 0.5)) / size.as_vec2();
    let ray = raymarch.ray(texel, size);

    let max_dist = {
        let depth_size = params.scene_depth_size().max(Vec2::ONE);

        let depth_texel = (uv * depth_size)
            .as_uvec2()
            .min(depth_size.as_uvec2() - UVec2::ONE);

        let depth: Vec4 = scene_depth_tex.fetch(depth_texel);

        params.max_distance_for_depth(uv, depth.x)
    };

    let offset = {
        let noise_size = params.blue_noise_size().max(Vec2::ONE);

        let noise_texel = (params.blue_noise_uv(uv).fract() * noise_size)
            .as_uvec2()
            .min(noise_size.as_uvec2() - UVec2::ONE);

        let noise: Vec4 = blue_noise_tex.fetch(noise_texel);

        noise.x
    };

    let density_curve = |x: f32| {
        sample_density_lut(x, |i| {
            let texel: Vec4 = density_lut_tex.fetch(uvec2(i, 0));

            texel.x
        })
    };

    let mut sample = params.raymarch(ray, max_dist, offset, density_curve);

    if params.has_aerial_perspective() && sample.transmittance < 1.0 {
        let uvw = uv.extend(params.aerial_perspective_w(sample.depth));

        let luminance: Vec4 =
            ap_luminance_tex.sample_by_lod(*ap_luminance_sampler, uvw, 0.0);

        let transmittance: Vec4 = ap_transmittance_tex.sample_by_lod(
            *ap_transmittance_sampler,
            uvw,
            0.0,
        );

        sample = sample
            .with_aerial_perspective(luminance.xyz(), transmittance.xyz());
    }

    unsafe {
        out.write(texel, sample.serialize());
    }
}
