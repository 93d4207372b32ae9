//! Paths of the SPIR-V modules produced by this crate's build script.

pub const FULLSCREEN_VERTEX_SPV: &str = env!("FULLSCREEN_VERTEX_SPV");
pub const TEXTURED_FRAGMENT_SPV: &str = env!("TEXTURED_FRAGMENT_SPV");
