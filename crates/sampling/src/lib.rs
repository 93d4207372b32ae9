//! CPU reference for the sampled-image contract of the textured fragment stage.
//!
//! Texel lookups, filtering, addressing and level-of-detail selection follow
//! the Vulkan texel filtering rules, so results here are what a conformant
//! driver produces for the same sampler and texture.

mod sample;
mod sampler;
mod texture;

pub use sample::SampledImage;
pub use sampler::{AddressMode, BorderColor, Filter, MipmapMode, SamplerDesc, LOD_CLAMP_NONE};
pub use texture::{linear_to_srgb, srgb_to_linear, MipLevel, Texture2d, TextureFormat};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SamplingError {
    #[error("texture extent must be non-zero, got {width}x{height}")]
    ZeroExtent { width: u32, height: u32 },

    #[error("expected {expected} texels for the texture extent, got {actual}")]
    TexelCountMismatch { expected: usize, actual: usize },

    #[error("a texture needs at least one mip level")]
    NoLevels,

    #[error("mip level {level} should be {expected:?}, got {actual:?}")]
    LevelExtentMismatch {
        level: u32,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("texture format {0:?} can't be built from 8 bit texels")]
    NotAn8BitFormat(TextureFormat),

    #[error("sampler field {field} must be finite, got {value}")]
    NonFiniteSamplerField { field: &'static str, value: f32 },

    #[error("sampler min_lod {min_lod} is greater than max_lod {max_lod}")]
    LodRangeInverted { min_lod: f32, max_lod: f32 },

    #[error("sampler min_lod must not be negative, got {0}")]
    NegativeMinLod(f32),
}
