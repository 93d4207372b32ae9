use std::{collections::BTreeMap, sync::Arc};

use glam::{Vec2, Vec4};
use sampling::{SampledImage, SamplerDesc, Texture2d};

use crate::interface::{BindingKind, InterfaceContract};
use crate::types::RenderError;

#[derive(Clone, Debug)]
pub enum Resource {
    Sampler(SamplerDesc),
    Texture(Arc<Texture2d>),
}

impl Resource {
    fn kind(&self) -> BindingKind {
        match self {
            Resource::Sampler(_) => BindingKind::Sampler,
            Resource::Texture(_) => BindingKind::SampledImage2d,
        }
    }
}

/// Host side of the stage's descriptor set.
///
/// Writes are checked against the contract the way validation layers check
/// descriptor updates, so a resource can only land in a slot declared for
/// its kind.
#[derive(Clone, Debug)]
pub struct DescriptorBindings {
    contract: InterfaceContract,
    resources: BTreeMap<u32, Resource>,
}

impl DescriptorBindings {
    pub fn new(contract: InterfaceContract) -> Self {
        Self {
            contract,
            resources: BTreeMap::new(),
        }
    }

    pub fn for_textured_fragment() -> Self {
        Self::new(InterfaceContract::textured_fragment())
    }

    pub fn contract(&self) -> &InterfaceContract {
        &self.contract
    }

    pub fn bind(&mut self, binding: u32, resource: Resource) -> Result<(), RenderError> {
        let expected = self
            .contract
            .binding_kind(binding)
            .ok_or(RenderError::UnexpectedBinding(binding))?;
        if *expected != resource.kind() {
            return Err(RenderError::WrongResourceKind {
                binding,
                expected: expected.clone(),
            });
        }
        if let Resource::Sampler(ref desc) = resource {
            desc.validate().map_err(RenderError::Sampling)?;
        }
        log::debug!("binding {:?} at {}", resource.kind(), binding);
        self.resources.insert(binding, resource);
        Ok(())
    }

    pub fn bind_sampler(&mut self, binding: u32, sampler: SamplerDesc) -> Result<(), RenderError> {
        self.bind(binding, Resource::Sampler(sampler))
    }

    pub fn bind_texture(
        &mut self,
        binding: u32,
        texture: Arc<Texture2d>,
    ) -> Result<(), RenderError> {
        self.bind(binding, Resource::Texture(texture))
    }

    pub fn get(&self, binding: u32) -> Option<&Resource> {
        self.resources.get(&binding)
    }

    /// First binding the contract declares for `kind`.
    pub fn slot_for(&self, kind: &BindingKind) -> Result<u32, RenderError> {
        self.contract
            .bindings
            .iter()
            .find(|slot| slot.kind == *kind)
            .map(|slot| slot.binding)
            .ok_or_else(|| RenderError::NoSlotFor(kind.clone()))
    }

    fn sampler_at(&self, binding: u32) -> Result<SamplerDesc, RenderError> {
        match self.get(binding) {
            Some(Resource::Sampler(desc)) => Ok(*desc),
            _ => Err(RenderError::MissingBinding(binding)),
        }
    }

    fn texture_at(&self, binding: u32) -> Result<Arc<Texture2d>, RenderError> {
        match self.get(binding) {
            Some(Resource::Texture(texture)) => Ok(Arc::clone(texture)),
            _ => Err(RenderError::MissingBinding(binding)),
        }
    }
}

/// Per-invocation inputs: the interpolated uv and its screen-space
/// derivatives, which decide the level of detail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FragmentInput {
    pub uv: Vec2,
    pub ddx: Vec2,
    pub ddy: Vec2,
}

impl FragmentInput {
    /// Input with no derivatives. The lod is negative infinity, so the
    /// lookup reads the sampler's `min_lod` level whatever its bias.
    pub fn at(uv: Vec2) -> Self {
        Self {
            uv,
            ddx: Vec2::ZERO,
            ddy: Vec2::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FragmentOutput {
    pub color: Vec4,
}

/// Reference implementation of `textured_fragment::fragment_main`.
#[derive(Clone, Debug)]
pub struct FragmentStage {
    sampler: SamplerDesc,
    texture: Arc<Texture2d>,
}

impl FragmentStage {
    pub fn new(sampler: SamplerDesc, texture: Arc<Texture2d>) -> Result<Self, RenderError> {
        sampler.validate().map_err(RenderError::Sampling)?;
        Ok(Self { sampler, texture })
    }

    /// Reads the sampler and texture from the slots the bindings' contract
    /// declares for them.
    pub fn from_bindings(bindings: &DescriptorBindings) -> Result<Self, RenderError> {
        let sampler = bindings.slot_for(&BindingKind::Sampler)?;
        let texture = bindings.slot_for(&BindingKind::SampledImage2d)?;
        Ok(Self {
            sampler: bindings.sampler_at(sampler)?,
            texture: bindings.texture_at(texture)?,
        })
    }

    pub fn sampler(&self) -> &SamplerDesc {
        &self.sampler
    }

    pub fn texture(&self) -> &Texture2d {
        &self.texture
    }

    pub fn invoke(&self, input: &FragmentInput) -> FragmentOutput {
        let image = SampledImage::new(&self.sampler, &self.texture);
        FragmentOutput {
            color: image.sample_by_gradient(input.uv, input.ddx, input.ddy),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::vec2;
    use sampling::{AddressMode, MipLevel, TextureFormat};

    use super::*;
    use crate::interface::BindingSlot;

    fn texture() -> Arc<Texture2d> {
        let texels = (0..16).map(|i| Vec4::splat(i as f32 / 15.0)).collect();
        Arc::new(Texture2d::from_texels(4, 4, texels, TextureFormat::Rgba32Float).unwrap())
    }

    #[test]
    fn binds_to_declared_slots_only() {
        let mut bindings = DescriptorBindings::for_textured_fragment();
        bindings
            .bind_sampler(shader_objects::SAMPLER_BINDING, SamplerDesc::nearest())
            .unwrap();
        bindings
            .bind_texture(shader_objects::TEXTURE_BINDING, texture())
            .unwrap();

        assert!(matches!(
            bindings.bind_sampler(0, SamplerDesc::nearest()),
            Err(RenderError::UnexpectedBinding(0))
        ));
        assert!(matches!(
            bindings.bind_texture(shader_objects::SAMPLER_BINDING, texture()),
            Err(RenderError::WrongResourceKind {
                binding: 1,
                expected: BindingKind::Sampler
            })
        ));
        assert!(matches!(
            bindings.bind_sampler(shader_objects::TEXTURE_BINDING, SamplerDesc::nearest()),
            Err(RenderError::WrongResourceKind {
                binding: 2,
                expected: BindingKind::SampledImage2d
            })
        ));
    }

    #[test]
    fn rejects_invalid_sampler_at_bind() {
        let mut bindings = DescriptorBindings::for_textured_fragment();
        let bad = SamplerDesc::default().with_lod_range(3.0, 1.0);
        assert!(matches!(
            bindings.bind_sampler(shader_objects::SAMPLER_BINDING, bad),
            Err(RenderError::Sampling(_))
        ));
        assert!(bindings.get(shader_objects::SAMPLER_BINDING).is_none());
    }

    #[test]
    fn stage_needs_both_resources() {
        let mut bindings = DescriptorBindings::for_textured_fragment();
        assert!(matches!(
            FragmentStage::from_bindings(&bindings),
            Err(RenderError::MissingBinding(1))
        ));
        bindings
            .bind_sampler(shader_objects::SAMPLER_BINDING, SamplerDesc::nearest())
            .unwrap();
        assert!(matches!(
            FragmentStage::from_bindings(&bindings),
            Err(RenderError::MissingBinding(2))
        ));
        bindings
            .bind_texture(shader_objects::TEXTURE_BINDING, texture())
            .unwrap();
        assert!(FragmentStage::from_bindings(&bindings).is_ok());
    }

    #[test]
    fn output_is_the_filtered_lookup() {
        let texture = texture();
        let sampler = SamplerDesc::linear().with_address_mode(AddressMode::ClampToEdge);
        let stage = FragmentStage::new(sampler, Arc::clone(&texture)).unwrap();
        let reference = SampledImage::new(&sampler, &texture);

        for uv in [vec2(0.0, 0.0), vec2(0.3, 0.7), vec2(1.2, -0.4), vec2(0.5, 0.5)] {
            let input = FragmentInput::at(uv);
            assert_eq!(stage.invoke(&input).color, reference.sample(uv));
        }
    }

    fn level_coded() -> Arc<Texture2d> {
        let levels = (0..4u32)
            .map(|level| {
                let size = 8 >> level;
                MipLevel {
                    width: size,
                    height: size,
                    texels: vec![Vec4::splat(level as f32); (size * size) as usize],
                }
            })
            .collect();
        Arc::new(Texture2d::from_levels(levels, TextureFormat::Rgba32Float).unwrap())
    }

    #[test]
    fn biased_sampler_agrees_with_the_reference() {
        let texture = level_coded();
        let uv = vec2(0.4, 0.6);
        for (bias, min_lod, level) in [(1.0, 0.0, 0.0), (1.0, 2.0, 2.0)] {
            let sampler = SamplerDesc {
                mip_lod_bias: bias,
                ..SamplerDesc::default()
            }
            .with_lod_range(min_lod, 1000.0);
            let stage = FragmentStage::new(sampler, Arc::clone(&texture)).unwrap();
            let reference = SampledImage::new(&sampler, &texture);

            let color = stage.invoke(&FragmentInput::at(uv)).color;
            assert_eq!(color, reference.sample(uv), "min_lod {min_lod}");
            assert_eq!(color, Vec4::splat(level), "min_lod {min_lod}");
        }
    }

    #[test]
    fn stage_reads_the_slots_its_contract_declares() {
        let mut contract = InterfaceContract::textured_fragment();
        contract.bindings = vec![
            BindingSlot {
                set: 0,
                binding: 4,
                kind: BindingKind::SampledImage2d,
            },
            BindingSlot {
                set: 0,
                binding: 5,
                kind: BindingKind::Sampler,
            },
        ];
        let mut bindings = DescriptorBindings::new(contract);
        bindings.bind_texture(4, texture()).unwrap();
        assert!(matches!(
            FragmentStage::from_bindings(&bindings),
            Err(RenderError::MissingBinding(5))
        ));
        bindings.bind_sampler(5, SamplerDesc::linear()).unwrap();

        let stage = FragmentStage::from_bindings(&bindings).unwrap();
        assert_eq!(*stage.sampler(), SamplerDesc::linear());
        assert_eq!(*stage.texture(), *texture());
    }

    #[test]
    fn contract_without_a_sampler_cannot_build_a_stage() {
        let mut contract = InterfaceContract::textured_fragment();
        contract.bindings.retain(|slot| slot.kind != BindingKind::Sampler);
        let bindings = DescriptorBindings::new(contract);
        assert!(matches!(
            FragmentStage::from_bindings(&bindings),
            Err(RenderError::NoSlotFor(BindingKind::Sampler))
        ));
    }

    #[test]
    fn uv_is_not_clamped_by_the_stage() {
        let stage = FragmentStage::new(
            SamplerDesc::nearest().with_address_mode(AddressMode::Repeat),
            texture(),
        )
        .unwrap();
        let inside = stage.invoke(&FragmentInput::at(vec2(0.1, 0.1))).color;
        let wrapped = stage.invoke(&FragmentInput::at(vec2(1.1, 2.1))).color;
        assert_eq!(inside, wrapped);
    }

    #[test]
    fn rebinding_replaces_the_resource() {
        let mut bindings = DescriptorBindings::for_textured_fragment();
        bindings
            .bind_sampler(shader_objects::SAMPLER_BINDING, SamplerDesc::nearest())
            .unwrap();
        bindings
            .bind_sampler(shader_objects::SAMPLER_BINDING, SamplerDesc::linear())
            .unwrap();
        bindings
            .bind_texture(shader_objects::TEXTURE_BINDING, texture())
            .unwrap();
        let stage = FragmentStage::from_bindings(&bindings).unwrap();
        assert_eq!(*stage.sampler(), SamplerDesc::linear());
    }
}
