use std::fmt::Debug;

use glam::{UVec2, Vec4};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::SamplingError;

/// Storage format of the texture as the host uploads it.
///
/// Texels are kept decoded to linear floats; the format only decides how
/// incoming bytes are decoded and which Vulkan format the host asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8Srgb,
    Rgba32Float,
}

impl Default for TextureFormat {
    fn default() -> Self {
        TextureFormat::Rgba8Srgb
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

impl TextureFormat {
    pub fn is_srgb(self) -> bool {
        self == TextureFormat::Rgba8Srgb
    }

    fn decode(self, rgba: [u8; 4]) -> Vec4 {
        let unorm = |b: u8| f32::from(b) / 255.0;
        match self {
            TextureFormat::Rgba8Srgb => Vec4::new(
                srgb_to_linear(unorm(rgba[0])),
                srgb_to_linear(unorm(rgba[1])),
                srgb_to_linear(unorm(rgba[2])),
                unorm(rgba[3]),
            ),
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba32Float => Vec4::new(
                unorm(rgba[0]),
                unorm(rgba[1]),
                unorm(rgba[2]),
                unorm(rgba[3]),
            ),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    /// Row-major, linear color.
    pub texels: Vec<Vec4>,
}

impl Debug for MipLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MipLevel")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("texels", &"[<texel data>]")
            .finish()
    }
}

impl MipLevel {
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.texels[(y * self.width + x) as usize]
    }

    fn downsample(&self) -> MipLevel {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let x0 = (2 * x).min(self.width - 1);
                let x1 = (2 * x + 1).min(self.width - 1);
                let y0 = (2 * y).min(self.height - 1);
                let y1 = (2 * y + 1).min(self.height - 1);
                let sum = self.texel(x0, y0)
                    + self.texel(x1, y0)
                    + self.texel(x0, y1)
                    + self.texel(x1, y1);
                texels.push(sum * 0.25);
            }
        }
        MipLevel {
            width,
            height,
            texels,
        }
    }
}

/// A 2D texture with its mip chain, level 0 first.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture2d {
    pub format: TextureFormat,
    levels: Vec<MipLevel>,
}

impl Texture2d {
    pub fn from_texels(
        width: u32,
        height: u32,
        texels: Vec<Vec4>,
        format: TextureFormat,
    ) -> Result<Self, SamplingError> {
        if width == 0 || height == 0 {
            return Err(SamplingError::ZeroExtent { width, height });
        }
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(SamplingError::TexelCountMismatch {
                expected,
                actual: texels.len(),
            });
        }
        Ok(Self {
            format,
            levels: vec![MipLevel {
                width,
                height,
                texels,
            }],
        })
    }

    /// Builds a texture from a complete, caller-supplied mip chain.
    ///
    /// Every level must be half the previous one (rounded down, at least 1)
    /// and hold exactly `width * height` texels.
    pub fn from_levels(levels: Vec<MipLevel>, format: TextureFormat) -> Result<Self, SamplingError> {
        let base = levels.first().ok_or(SamplingError::NoLevels)?;
        if base.width == 0 || base.height == 0 {
            return Err(SamplingError::ZeroExtent {
                width: base.width,
                height: base.height,
            });
        }
        let mut expected = (base.width, base.height);
        for (index, level) in levels.iter().enumerate() {
            if (level.width, level.height) != expected {
                return Err(SamplingError::LevelExtentMismatch {
                    level: index as u32,
                    expected,
                    actual: (level.width, level.height),
                });
            }
            let count = level.width as usize * level.height as usize;
            if level.texels.len() != count {
                return Err(SamplingError::TexelCountMismatch {
                    expected: count,
                    actual: level.texels.len(),
                });
            }
            expected = ((expected.0 / 2).max(1), (expected.1 / 2).max(1));
        }
        Ok(Self { format, levels })
    }

    pub fn from_rgba8(
        width: u32,
        height: u32,
        bytes: &[u8],
        format: TextureFormat,
    ) -> Result<Self, SamplingError> {
        if format == TextureFormat::Rgba32Float {
            return Err(SamplingError::NotAn8BitFormat(format));
        }
        let expected = width as usize * height as usize;
        if bytes.len() != expected * 4 {
            return Err(SamplingError::TexelCountMismatch {
                expected,
                actual: bytes.len() / 4,
            });
        }
        let texels = bytes
            .chunks_exact(4)
            .map(|c| format.decode([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::from_texels(width, height, texels, format)
    }

    pub fn from_image(image: &DynamicImage, format: TextureFormat) -> Result<Self, SamplingError> {
        match format {
            TextureFormat::Rgba32Float => {
                let rgba = image.to_rgba32f();
                let (width, height) = rgba.dimensions();
                let texels = rgba
                    .pixels()
                    .map(|p| Vec4::new(p.0[0], p.0[1], p.0[2], p.0[3]))
                    .collect();
                Self::from_texels(width, height, texels, format)
            }
            _ => {
                let rgba = image.to_rgba8();
                let (width, height) = rgba.dimensions();
                Self::from_rgba8(width, height, rgba.as_raw(), format)
            }
        }
    }

    /// Number of levels in a full chain for this texture's base extent.
    pub fn full_chain_len(&self) -> u32 {
        let base = &self.levels[0];
        32 - base.width.max(base.height).leading_zeros()
    }

    /// Rebuilds the mip chain from level 0 with a 2x2 box filter, stopping at
    /// `max_levels` levels or at 1x1, whichever comes first.
    pub fn generate_mips(&mut self, max_levels: Option<u32>) {
        let count = max_levels
            .unwrap_or(u32::MAX)
            .clamp(1, self.full_chain_len());
        self.levels.truncate(1);
        while (self.levels.len() as u32) < count {
            let next = self.levels[self.levels.len() - 1].downsample();
            self.levels.push(next);
        }
    }

    pub fn with_mips(mut self) -> Self {
        self.generate_mips(None);
        self
    }

    pub fn level_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn level(&self, level: u32) -> &MipLevel {
        &self.levels[level as usize]
    }

    pub fn extent(&self, level: u32) -> UVec2 {
        let level = self.level(level);
        UVec2::new(level.width, level.height)
    }

    pub fn texel(&self, level: u32, x: u32, y: u32) -> Vec4 {
        self.level(level).texel(x, y)
    }
}
