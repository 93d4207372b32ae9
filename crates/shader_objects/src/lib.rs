#![no_std]

//! Values shared between the shader crates and the host.
//!
//! `#[spirv(...)]` attributes only take literals, so the shader crates spell
//! these numbers out by hand. The host reflects the built modules and checks
//! them against the constants here.

#[cfg(feature = "spirv-std")]
use spirv_std::glam::{vec2, vec4, Vec2, Vec4};

#[cfg(not(feature = "spirv-std"))]
use glam::{vec2, vec4, Vec2, Vec4};

pub const DESCRIPTOR_SET: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;
pub const TEXTURE_BINDING: u32 = 2;

pub const UV_LOCATION: u32 = 0;
pub const COLOR_LOCATION: u32 = 0;

pub const FRAGMENT_ENTRY_POINT: &str = "fragment_main";
pub const VERTEX_ENTRY_POINT: &str = "vertex_main";

/// Vertex `vertex_index % 3` of a triangle covering the whole viewport.
///
/// Returns the clip-space position and the uv for that vertex. The uv spans
/// `[0, 2]` on the triangle so it spans `[0, 1]` over the visible viewport.
pub fn fullscreen_triangle(vertex_index: u32) -> (Vec4, Vec2) {
    let index = vertex_index % 3;
    let uv = vec2(((index << 1) & 2) as f32, (index & 2) as f32);
    let position = vec4(uv.x * 2.0 - 1.0, uv.y * 2.0 - 1.0, 0.0, 1.0);
    (position, uv)
}
