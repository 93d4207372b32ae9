use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::SamplingError;

/// `max_lod` value meaning "no upper clamp", same as `VK_LOD_CLAMP_NONE`.
pub const LOD_CLAMP_NONE: f32 = 1000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MipmapMode {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderColor {
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

impl BorderColor {
    pub fn color(self) -> Vec4 {
        match self {
            BorderColor::TransparentBlack => Vec4::ZERO,
            BorderColor::OpaqueBlack => Vec4::new(0.0, 0.0, 0.0, 1.0),
            BorderColor::OpaqueWhite => Vec4::ONE,
        }
    }
}

fn mirror(a: i64) -> i64 {
    if a >= 0 {
        a
    } else {
        -(1 + a)
    }
}

impl AddressMode {
    /// Wraps integer texel coordinate `i` into `[0, size)`.
    ///
    /// `None` means the lookup falls outside the image and reads the border
    /// color, which only happens for [`AddressMode::ClampToBorder`].
    pub fn wrap(self, i: i64, size: u32) -> Option<u32> {
        let size = i64::from(size.max(1));
        let wrapped = match self {
            AddressMode::Repeat => i.rem_euclid(size),
            AddressMode::MirroredRepeat => (size - 1) - mirror(i.rem_euclid(2 * size) - size),
            AddressMode::ClampToEdge => i.clamp(0, size - 1),
            AddressMode::ClampToBorder => {
                if i < 0 || i >= size {
                    return None;
                }
                i
            }
            AddressMode::MirrorClampToEdge => mirror(i).clamp(0, size - 1),
        };
        Some(wrapped as u32)
    }
}

/// Filtering and addressing state of a sampler object.
///
/// There is no `w` address mode, the stage only ever samples 2D images.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub border_color: BorderColor,
    pub mip_lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_mode: MipmapMode::Linear,
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            border_color: BorderColor::OpaqueBlack,
            mip_lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: LOD_CLAMP_NONE,
        }
    }
}

impl SamplerDesc {
    pub fn nearest() -> Self {
        Self {
            mag_filter: Filter::Nearest,
            min_filter: Filter::Nearest,
            mipmap_mode: MipmapMode::Nearest,
            ..Default::default()
        }
    }

    pub fn linear() -> Self {
        Self::default()
    }

    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode_u = mode;
        self.address_mode_v = mode;
        self
    }

    pub fn with_border_color(mut self, border_color: BorderColor) -> Self {
        self.border_color = border_color;
        self
    }

    pub fn with_lod_range(mut self, min_lod: f32, max_lod: f32) -> Self {
        self.min_lod = min_lod;
        self.max_lod = max_lod;
        self
    }

    pub fn validate(&self) -> Result<(), SamplingError> {
        for (field, value) in [
            ("mip_lod_bias", self.mip_lod_bias),
            ("min_lod", self.min_lod),
            ("max_lod", self.max_lod),
        ] {
            if !value.is_finite() {
                return Err(SamplingError::NonFiniteSamplerField { field, value });
            }
        }
        if self.min_lod < 0.0 {
            return Err(SamplingError::NegativeMinLod(self.min_lod));
        }
        if self.min_lod > self.max_lod {
            return Err(SamplingError::LodRangeInverted {
                min_lod: self.min_lod,
                max_lod: self.max_lod,
            });
        }
        Ok(())
    }
}
