#![cfg_attr(target_arch = "spirv", no_std)]
// HACK(eddyb) can't easily see warnings otherwise from `spirv-builder` builds.
#![deny(warnings)]

use spirv_std::glam::{Vec2, Vec4};
use spirv_std::{spirv, Image, Sampler};

// Bindings and locations must match `shader_objects`; `texshade inspect`
// checks the built module against them.
#[spirv(fragment)]
pub fn fragment_main(
    #[spirv(descriptor_set = 0, binding = 1)] sampler: &Sampler,
    #[spirv(descriptor_set = 0, binding = 2)] texture: &Image!(2D, type=f32, sampled, depth=false),
    uv: Vec2,
    out_frag_color: &mut Vec4,
) {
    *out_frag_color = texture.sample(*sampler, uv);
}
