use nimbus_gpu::prelude::*;

#[spirv(vertex)]
pub fn fullscreen_vs(
    #[spirv(vertex_index)] vert_idx: i32,
    #[spirv(position)] output: &mut Vec4,
) {
    fn full_screen_triangle(vert_idx: i32) -> Vec4 {
        let uv = vec2(((vert_idx << 1) & 2) as f32, (vert_idx & 2) as f32);
        let pos = 2.0 * uv - Vec2::ONE;

        pos.extend(0.0).extend(1.0)
    }

    *output = full_screen_triangle(vert_idx);
}

/// Composites sky over the scene's background and aerial perspective over
/// the scene's geometry.
#[spirv(fragment)]
pub fn sky_fs(
    #[spirv(frag_coord)] pos: Vec4,
    #[spirv(descriptor_set = 0, binding = 0, uniform)]
    params: &SkyCompositePassParams,
    #[spirv(descriptor_set = 0, binding = 1)] sky_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 2)] sky_sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 3)] ap_luminance_tex: Tex3d,
    #[spirv(descriptor_set = 0, binding = 4)] ap_luminance_sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 5)] ap_transmittance_tex: Tex3d,
    #[spirv(descriptor_set = 0, binding = 6)]
    ap_transmittance_sampler: &Sampler,
    #[spirv(descriptor_set = 1, binding = 0)] scene_color_tex: Tex,
    #[spirv(descriptor_set = 1, binding = 1)] scene_depth_tex: TexDepth,
    frag_color: &mut Vec4,
) {
    let screen_pos = pos.xy().as_uvec2();
    let scene_color: Vec4 = scene_color_tex.fetch(screen_pos);
    let scene_depth: Vec4 = scene_depth_tex.fetch(screen_pos);
    let scene_depth = scene_depth.x;

    *frag_color = scene_color;

    if !params.has_atmosphere() {
        return;
    }

    let uv = pos.xy() / params.viewport_size().max(Vec2::ONE);
    let (inside, bounds_uv) = params.bounds_uv(uv);

    if !inside {
        return;
    }

    let view_pos = params.view_pos(uv, scene_depth);

    if !params.sees_atmosphere(params.world_dir(view_pos)) {
        return;
    }

    let color = if SkyCompositePassParams::is_background(scene_depth) {
        let sky = sky_tex.sample_by_lod(*sky_sampler, bounds_uv, 0.0);

        SkyCompositePassParams::blend_sky(scene_color.xyz(), sky)
    } else {
        let clip = params.aerial_perspective_clip();
        let w = view_pos.length().inverse_lerp(clip.x, clip.y);
        let uvw = bounds_uv.extend(w);

        let luminance: Vec4 =
            ap_luminance_tex.sample_by_lod(*ap_luminance_sampler, uvw, 0.0);

        let transmittance: Vec4 = ap_transmittance_tex.sample_by_lod(
            *ap_transmittance_sampler,
            uvw,
            0.0,
        );

        SkyCompositePassParams::blend_aerial_perspective(
            scene_color.xyz(),
            luminance.xyz(),
            transmittance.xyz(),
        )
    };

    *frag_color = color.extend(scene_color.w);
}

/// Outputs clouds (luminance + transmittance) to be blended over the scene
/// with `src + dst * src_alpha`.
///
/// When debugging, outputs opaque motion vectors instead.
#[spirv(fragment)]
pub fn clouds_fs(
    #[spirv(frag_coord)] pos: Vec4,
    #[spirv(push_constant)] params: &CloudCompositePassParams,
    #[spirv(descriptor_set = 0, binding = 0)] clouds_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 1)] clouds_sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 2)] motion_vectors_tex: Tex,
    #[spirv(descriptor_set = 0, binding = 3)]
    motion_vectors_sampler: &Sampler,
    frag_color: &mut Vec4,
) {
    let uv = params.cloud_uv(pos.xy());

    *frag_color = if params.shows_motion_vectors() {
        let motion_vector = MotionVector::deserialize(
            motion_vectors_tex.sample_by_lod(*motion_vectors_sampler, uv, 0.0),
        );

        motion_vector.debug_color().extend(0.0)
    } else {
        clouds_tex.sample_by_lod(*clouds_sampler, uv, 0.0)
    };
}
