#![cfg_attr(target_arch = "spirv", no_std)]
// HACK(eddyb) can't easily see warnings otherwise from `spirv-builder` builds.
#![deny(warnings)]

use spirv_std::glam::{Vec2, Vec4};
use spirv_std::spirv;

#[spirv(vertex)]
pub fn vertex_main(
    #[spirv(vertex_index)] vertex_index: i32,
    o_uv: &mut Vec2,
    #[spirv(position)] o_pos: &mut Vec4,
) {
    let (pos, uv) = shader_objects::fullscreen_triangle(vertex_index as u32);
    *o_uv = uv;
    *o_pos = pos;
}
