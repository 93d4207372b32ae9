//! Translation of the stage's resources into Vulkan create-info data.
//!
//! Nothing here talks to a device; the structs are plain data a renderer
//! hands to `create_sampler`, `create_descriptor_set_layout` and friends.

use ash::vk;
use sampling::{AddressMode, BorderColor, Filter, MipmapMode, SamplerDesc, TextureFormat};

use crate::interface::{BindingKind, InterfaceContract, ShaderStage};
use crate::types::DescBinding;

pub fn filter(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        AddressMode::MirrorClampToEdge => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

pub fn border_color(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
    }
}

pub fn texture_format(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::Rgba32Float => vk::Format::R32G32B32A32_SFLOAT,
    }
}

/// Sampler create info equivalent to `desc`.
///
/// `address_mode_w` is fixed to clamp-to-edge since the stage never samples a
/// third axis. Anisotropy and depth compare stay off.
pub fn sampler_create_info(desc: &SamplerDesc) -> vk::SamplerCreateInfo {
    vk::SamplerCreateInfo::builder()
        .mag_filter(filter(desc.mag_filter))
        .min_filter(filter(desc.min_filter))
        .mipmap_mode(mipmap_mode(desc.mipmap_mode))
        .address_mode_u(address_mode(desc.address_mode_u))
        .address_mode_v(address_mode(desc.address_mode_v))
        .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
        .mip_lod_bias(desc.mip_lod_bias)
        .anisotropy_enable(false)
        .max_anisotropy(1.0)
        .compare_enable(false)
        .compare_op(vk::CompareOp::NEVER)
        .min_lod(desc.min_lod)
        .max_lod(desc.max_lod)
        .border_color(border_color(desc.border_color))
        .unnormalized_coordinates(false)
        .build()
}

impl ShaderStage {
    pub fn stage_flags(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
            ShaderStage::Other => vk::ShaderStageFlags::ALL,
        }
    }
}

impl BindingKind {
    pub fn descriptor_type(&self) -> Option<vk::DescriptorType> {
        match self {
            BindingKind::Sampler => Some(vk::DescriptorType::SAMPLER),
            BindingKind::SampledImage2d => Some(vk::DescriptorType::SAMPLED_IMAGE),
            BindingKind::CombinedImageSampler2d => {
                Some(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            }
            BindingKind::UniformBuffer => Some(vk::DescriptorType::UNIFORM_BUFFER),
            BindingKind::StorageBuffer => Some(vk::DescriptorType::STORAGE_BUFFER),
            BindingKind::Other(_) => None,
        }
    }
}

impl InterfaceContract {
    /// Descriptor bindings of the contract's set, one descriptor each.
    pub fn desc_bindings(&self) -> Vec<DescBinding> {
        self.bindings
            .iter()
            .filter_map(|slot| {
                Some(DescBinding {
                    binding: slot.binding,
                    descriptor_type: slot.kind.descriptor_type()?,
                    descriptor_count: 1,
                    stage_flags: self.stage.stage_flags(),
                })
            })
            .collect()
    }

    pub fn descriptor_set_layout_bindings(&self) -> Vec<vk::DescriptorSetLayoutBinding> {
        self.desc_bindings()
            .into_iter()
            .map(DescBinding::into_layout_binding)
            .collect()
    }

    /// Pool sizes for `max_sets` descriptor sets of this layout.
    pub fn descriptor_pool_sizes(&self, max_sets: u32) -> Vec<vk::DescriptorPoolSize> {
        let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
        for binding in self.desc_bindings() {
            match sizes
                .iter_mut()
                .find(|size| size.ty == binding.descriptor_type)
            {
                Some(size) => size.descriptor_count += max_sets,
                None => sizes.push(vk::DescriptorPoolSize {
                    ty: binding.descriptor_type,
                    descriptor_count: max_sets,
                }),
            }
        }
        sizes
    }
}
