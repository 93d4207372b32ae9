//! Reflection of SPIR-V stage interfaces and the contract the host holds the
//! textured fragment stage to.

use std::{fs::File, io, path::Path};

use spirv_reflect::types::{
    ReflectDecorationFlags, ReflectDescriptorBinding, ReflectDescriptorType, ReflectDimension,
    ReflectFormat, ReflectInterfaceVariable, ReflectShaderStageFlags,
};

use crate::types::{Mismatch, RenderError};

pub fn read_spv<R>(reader: &mut R) -> Result<Vec<u32>, RenderError>
where
    R: io::Read + io::Seek,
{
    ash::util::read_spv(reader).map_err(RenderError::ShaderRead)
}

pub fn read_spv_file(path: &Path) -> Result<Vec<u32>, RenderError> {
    let mut file = File::open(path).map_err(|err| RenderError::ShaderOpen {
        path: path.to_path_buf(),
        err,
    })?;
    read_spv(&mut file)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Other,
}

impl From<ReflectShaderStageFlags> for ShaderStage {
    fn from(flags: ReflectShaderStageFlags) -> Self {
        if flags.contains(ReflectShaderStageFlags::FRAGMENT) {
            ShaderStage::Fragment
        } else if flags.contains(ReflectShaderStageFlags::VERTEX) {
            ShaderStage::Vertex
        } else if flags.contains(ReflectShaderStageFlags::COMPUTE) {
            ShaderStage::Compute
        } else {
            ShaderStage::Other
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Sampler,
    SampledImage2d,
    CombinedImageSampler2d,
    UniformBuffer,
    StorageBuffer,
    Other(String),
}

impl From<&ReflectDescriptorBinding> for BindingKind {
    fn from(binding: &ReflectDescriptorBinding) -> Self {
        let is_2d = matches!(binding.image.dim, ReflectDimension::Type2d);
        match binding.descriptor_type {
            ReflectDescriptorType::Sampler => BindingKind::Sampler,
            ReflectDescriptorType::SampledImage if is_2d => BindingKind::SampledImage2d,
            ReflectDescriptorType::CombinedImageSampler if is_2d => {
                BindingKind::CombinedImageSampler2d
            }
            ReflectDescriptorType::UniformBuffer => BindingKind::UniformBuffer,
            ReflectDescriptorType::StorageBuffer => BindingKind::StorageBuffer,
            ref other => BindingKind::Other(format!("{:?} {:?}", other, binding.image.dim)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IoFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Other(String),
}

impl From<ReflectFormat> for IoFormat {
    fn from(format: ReflectFormat) -> Self {
        match format {
            ReflectFormat::R32_SFLOAT => IoFormat::Float32,
            ReflectFormat::R32G32_SFLOAT => IoFormat::Float32x2,
            ReflectFormat::R32G32B32_SFLOAT => IoFormat::Float32x3,
            ReflectFormat::R32G32B32A32_SFLOAT => IoFormat::Float32x4,
            other => IoFormat::Other(format!("{:?}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingDesc {
    pub set: u32,
    pub binding: u32,
    pub kind: BindingKind,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoVariable {
    pub location: u32,
    pub format: IoFormat,
    pub name: String,
}

/// Everything a pipeline needs to know to wire a shader stage up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageInterface {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub bindings: Vec<BindingDesc>,
    /// User-defined inputs, built-ins excluded, sorted by location.
    pub inputs: Vec<IoVariable>,
    /// User-defined outputs, built-ins excluded, sorted by location.
    pub outputs: Vec<IoVariable>,
}

fn user_variables(variables: Vec<ReflectInterfaceVariable>) -> Vec<IoVariable> {
    let mut user: Vec<IoVariable> = variables
        .into_iter()
        .filter(|v| !v.decoration_flags.contains(ReflectDecorationFlags::BUILT_IN))
        .map(|v| IoVariable {
            location: v.location,
            format: v.format.into(),
            name: v.name,
        })
        .collect();
    user.sort_by_key(|v| v.location);
    user
}

impl StageInterface {
    pub fn reflect(words: &[u32]) -> Result<Self, RenderError> {
        let module =
            spirv_reflect::ShaderModule::load_u32_data(words).map_err(RenderError::Reflect)?;

        let mut bindings: Vec<BindingDesc> = module
            .enumerate_descriptor_bindings(None)
            .map_err(RenderError::Reflect)?
            .iter()
            .map(|b| BindingDesc {
                set: b.set,
                binding: b.binding,
                kind: b.into(),
                name: b.name.clone(),
            })
            .collect();
        bindings.sort_by_key(|b| (b.set, b.binding));

        let inputs = user_variables(
            module
                .enumerate_input_variables(None)
                .map_err(RenderError::Reflect)?,
        );
        let outputs = user_variables(
            module
                .enumerate_output_variables(None)
                .map_err(RenderError::Reflect)?,
        );

        let interface = Self {
            stage: module.get_shader_stage().into(),
            entry_point: module.get_entry_point_name(),
            bindings,
            inputs,
            outputs,
        };
        log::debug!(
            "reflected {:?} stage {:?}: {} bindings, {} inputs, {} outputs",
            interface.stage,
            interface.entry_point,
            interface.bindings.len(),
            interface.inputs.len(),
            interface.outputs.len()
        );
        Ok(interface)
    }

    pub fn read_file(path: &Path) -> Result<Self, RenderError> {
        Self::reflect(&read_spv_file(path)?)
    }

    pub fn binding(&self, set: u32, binding: u32) -> Option<&BindingDesc> {
        self.bindings
            .iter()
            .find(|b| b.set == set && b.binding == binding)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BindingSlot {
    pub set: u32,
    pub binding: u32,
    pub kind: BindingKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IoSlot {
    pub location: u32,
    pub format: IoFormat,
}

/// The interface a stage must present, exactly: missing and extra
/// bindings, inputs and outputs are all mismatches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceContract {
    pub stage: ShaderStage,
    pub entry_point: String,
    pub bindings: Vec<BindingSlot>,
    pub inputs: Vec<IoSlot>,
    pub outputs: Vec<IoSlot>,
}

impl InterfaceContract {
    pub fn textured_fragment() -> Self {
        use shader_objects::*;
        Self {
            stage: ShaderStage::Fragment,
            entry_point: FRAGMENT_ENTRY_POINT.to_string(),
            bindings: vec![
                BindingSlot {
                    set: DESCRIPTOR_SET,
                    binding: SAMPLER_BINDING,
                    kind: BindingKind::Sampler,
                },
                BindingSlot {
                    set: DESCRIPTOR_SET,
                    binding: TEXTURE_BINDING,
                    kind: BindingKind::SampledImage2d,
                },
            ],
            inputs: vec![IoSlot {
                location: UV_LOCATION,
                format: IoFormat::Float32x2,
            }],
            outputs: vec![IoSlot {
                location: COLOR_LOCATION,
                format: IoFormat::Float32x4,
            }],
        }
    }

    pub fn fullscreen_vertex() -> Self {
        use shader_objects::*;
        Self {
            stage: ShaderStage::Vertex,
            entry_point: VERTEX_ENTRY_POINT.to_string(),
            bindings: vec![],
            inputs: vec![],
            outputs: vec![IoSlot {
                location: UV_LOCATION,
                format: IoFormat::Float32x2,
            }],
        }
    }

    pub fn binding_kind(&self, binding: u32) -> Option<&BindingKind> {
        self.bindings
            .iter()
            .find(|slot| slot.binding == binding)
            .map(|slot| &slot.kind)
    }

    pub fn check(&self, interface: &StageInterface) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();
        if interface.stage != self.stage {
            mismatches.push(Mismatch::Stage {
                expected: self.stage,
                actual: interface.stage,
            });
        }
        if interface.entry_point != self.entry_point {
            mismatches.push(Mismatch::EntryPoint {
                expected: self.entry_point.clone(),
                actual: interface.entry_point.clone(),
            });
        }

        for slot in &self.bindings {
            match interface.binding(slot.set, slot.binding) {
                None => mismatches.push(Mismatch::MissingBinding {
                    set: slot.set,
                    binding: slot.binding,
                    expected: slot.kind.clone(),
                }),
                Some(actual) if actual.kind != slot.kind => {
                    mismatches.push(Mismatch::BindingKind {
                        set: slot.set,
                        binding: slot.binding,
                        expected: slot.kind.clone(),
                        actual: actual.kind.clone(),
                    })
                }
                Some(_) => (),
            }
        }
        for actual in &interface.bindings {
            let declared = self
                .bindings
                .iter()
                .any(|slot| slot.set == actual.set && slot.binding == actual.binding);
            if !declared {
                mismatches.push(Mismatch::UnexpectedBinding {
                    set: actual.set,
                    binding: actual.binding,
                    kind: actual.kind.clone(),
                });
            }
        }

        check_io(
            &self.inputs,
            &interface.inputs,
            &mut mismatches,
            |location, expected| Mismatch::MissingInput { location, expected },
            |location, expected, actual| Mismatch::InputFormat {
                location,
                expected,
                actual,
            },
            |location, format| Mismatch::UnexpectedInput { location, format },
        );
        check_io(
            &self.outputs,
            &interface.outputs,
            &mut mismatches,
            |location, expected| Mismatch::MissingOutput { location, expected },
            |location, expected, actual| Mismatch::OutputFormat {
                location,
                expected,
                actual,
            },
            |location, format| Mismatch::UnexpectedOutput { location, format },
        );
        mismatches
    }

    pub fn validate(&self, interface: &StageInterface) -> Result<(), RenderError> {
        let mismatches = self.check(interface);
        if mismatches.is_empty() {
            Ok(())
        } else {
            Err(RenderError::InterfaceMismatch(mismatches))
        }
    }
}

fn check_io(
    expected: &[IoSlot],
    actual: &[IoVariable],
    mismatches: &mut Vec<Mismatch>,
    missing: impl Fn(u32, IoFormat) -> Mismatch,
    wrong_format: impl Fn(u32, IoFormat, IoFormat) -> Mismatch,
    unexpected: impl Fn(u32, IoFormat) -> Mismatch,
) {
    for slot in expected {
        match actual.iter().find(|v| v.location == slot.location) {
            None => mismatches.push(missing(slot.location, slot.format.clone())),
            Some(var) if var.format != slot.format => mismatches.push(wrong_format(
                slot.location,
                slot.format.clone(),
                var.format.clone(),
            )),
            Some(_) => (),
        }
    }
    for var in actual {
        if !expected.iter().any(|slot| slot.location == var.location) {
            mismatches.push(unexpected(var.location, var.format.clone()));
        }
    }
}

/// Checks that every input `consumer` reads is written by `producer` with
/// the same format. Outputs nobody reads are allowed.
pub fn check_linkage(producer: &StageInterface, consumer: &StageInterface) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    for input in &consumer.inputs {
        match producer.outputs.iter().find(|o| o.location == input.location) {
            None => mismatches.push(Mismatch::MissingOutput {
                location: input.location,
                expected: input.format.clone(),
            }),
            Some(output) if output.format != input.format => {
                mismatches.push(Mismatch::OutputFormat {
                    location: input.location,
                    expected: input.format.clone(),
                    actual: output.format.clone(),
                })
            }
            Some(_) => (),
        }
    }
    mismatches
}

pub fn validate_linkage(
    producer: &StageInterface,
    consumer: &StageInterface,
) -> Result<(), RenderError> {
    let mismatches = check_linkage(producer, consumer);
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(RenderError::LinkageMismatch(mismatches))
    }
}
