//! Host side of the textured fragment stage.
//!
//! [`interface`] reflects compiled SPIR-V and checks it against the layout
//! the host binds, [`create_info`] turns that layout and a sampler into
//! Vulkan create-info data, and [`stage`] with [`raster`] run a CPU reference
//! of the whole draw for comparison against the GPU path.

pub mod create_info;
pub mod interface;
pub mod raster;
pub mod stage;
pub mod types;

pub use interface::{
    check_linkage, read_spv, read_spv_file, validate_linkage, BindingDesc, BindingKind,
    InterfaceContract, IoFormat, IoVariable, ShaderStage, StageInterface,
};
pub use raster::{
    draw, draw_fragments, draw_sequential, rasterize, ClipVertex, Fragment, RenderTarget, Varyings,
};
pub use stage::{DescriptorBindings, FragmentInput, FragmentOutput, FragmentStage, Resource};
pub use types::{DescBinding, Mismatch, RenderError};
