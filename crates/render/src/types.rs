use std::{fmt, io, path::PathBuf};

use ash::vk;
use sampling::SamplingError;

use crate::interface::{BindingKind, IoFormat, ShaderStage};

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("error reading shader ({0:?})")]
    ShaderRead(io::Error),

    #[error("error opening shader at {path:?} ({err:?})")]
    ShaderOpen { path: PathBuf, err: io::Error },

    #[error("spirv reflection failed: {0}")]
    Reflect(&'static str),

    #[error("shader interface mismatch: {}", Mismatch::join(.0))]
    InterfaceMismatch(Vec<Mismatch>),

    #[error("stage linkage mismatch: {}", Mismatch::join(.0))]
    LinkageMismatch(Vec<Mismatch>),

    #[error("the stage declares nothing at descriptor binding {0}")]
    UnexpectedBinding(u32),

    #[error("descriptor binding {binding} expects a {expected:?}")]
    WrongResourceKind { binding: u32, expected: BindingKind },

    #[error("no resource bound at descriptor binding {0}")]
    MissingBinding(u32),

    #[error("the contract declares no {0:?} binding")]
    NoSlotFor(BindingKind),

    #[error("sampling error {0}")]
    Sampling(SamplingError),

    #[error("render target extent must be non-zero, got {width}x{height}")]
    ZeroSizeTarget { width: u32, height: u32 },
}

/// One difference between a reflected shader interface and what the host
/// expects of it.
#[derive(Clone, Debug, PartialEq)]
pub enum Mismatch {
    Stage {
        expected: ShaderStage,
        actual: ShaderStage,
    },
    EntryPoint {
        expected: String,
        actual: String,
    },
    MissingBinding {
        set: u32,
        binding: u32,
        expected: BindingKind,
    },
    BindingKind {
        set: u32,
        binding: u32,
        expected: BindingKind,
        actual: BindingKind,
    },
    UnexpectedBinding {
        set: u32,
        binding: u32,
        kind: BindingKind,
    },
    MissingInput {
        location: u32,
        expected: IoFormat,
    },
    InputFormat {
        location: u32,
        expected: IoFormat,
        actual: IoFormat,
    },
    UnexpectedInput {
        location: u32,
        format: IoFormat,
    },
    MissingOutput {
        location: u32,
        expected: IoFormat,
    },
    OutputFormat {
        location: u32,
        expected: IoFormat,
        actual: IoFormat,
    },
    UnexpectedOutput {
        location: u32,
        format: IoFormat,
    },
}

impl Mismatch {
    fn join(mismatches: &[Mismatch]) -> String {
        mismatches
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Stage { expected, actual } => {
                write!(f, "stage is {:?}, expected {:?}", actual, expected)
            }
            Mismatch::EntryPoint { expected, actual } => {
                write!(f, "entry point is {:?}, expected {:?}", actual, expected)
            }
            Mismatch::MissingBinding {
                set,
                binding,
                expected,
            } => write!(f, "missing {:?} at set {} binding {}", expected, set, binding),
            Mismatch::BindingKind {
                set,
                binding,
                expected,
                actual,
            } => write!(
                f,
                "set {} binding {} is {:?}, expected {:?}",
                set, binding, actual, expected
            ),
            Mismatch::UnexpectedBinding { set, binding, kind } => {
                write!(f, "unexpected {:?} at set {} binding {}", kind, set, binding)
            }
            Mismatch::MissingInput { location, expected } => {
                write!(f, "missing {:?} input at location {}", expected, location)
            }
            Mismatch::InputFormat {
                location,
                expected,
                actual,
            } => write!(
                f,
                "input at location {} is {:?}, expected {:?}",
                location, actual, expected
            ),
            Mismatch::UnexpectedInput { location, format } => {
                write!(f, "unexpected {:?} input at location {}", format, location)
            }
            Mismatch::MissingOutput { location, expected } => {
                write!(f, "missing {:?} output at location {}", expected, location)
            }
            Mismatch::OutputFormat {
                location,
                expected,
                actual,
            } => write!(
                f,
                "output at location {} is {:?}, expected {:?}",
                location, actual, expected
            ),
            Mismatch::UnexpectedOutput { location, format } => {
                write!(f, "unexpected {:?} output at location {}", format, location)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DescBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub descriptor_count: u32,
    pub stage_flags: vk::ShaderStageFlags,
}

impl DescBinding {
    pub fn into_layout_binding(self) -> vk::DescriptorSetLayoutBinding {
        let Self {
            binding,
            descriptor_type,
            descriptor_count,
            stage_flags,
        } = self;
        vk::DescriptorSetLayoutBinding {
            binding,
            descriptor_type,
            descriptor_count,
            stage_flags,
            ..Default::default()
        }
    }
}
