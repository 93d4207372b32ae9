//! Reflection of hand-assembled SPIR-V modules shaped like the ones
//! rust-gpu emits for the textured fragment and fullscreen vertex stages.

use std::io::Cursor;

use render::{
    check_linkage, read_spv, BindingKind, InterfaceContract, IoFormat, Mismatch, ShaderStage,
    StageInterface,
};

const MAGIC: u32 = 0x0723_0203;
const VERSION_1_0: u32 = 0x0001_0000;

// opcodes
const OP_NAME: u16 = 5;
const OP_MEMORY_MODEL: u16 = 14;
const OP_ENTRY_POINT: u16 = 15;
const OP_EXECUTION_MODE: u16 = 16;
const OP_CAPABILITY: u16 = 17;
const OP_TYPE_VOID: u16 = 19;
const OP_TYPE_INT: u16 = 21;
const OP_TYPE_FLOAT: u16 = 22;
const OP_TYPE_VECTOR: u16 = 23;
const OP_TYPE_IMAGE: u16 = 25;
const OP_TYPE_SAMPLER: u16 = 26;
const OP_TYPE_SAMPLED_IMAGE: u16 = 27;
const OP_TYPE_POINTER: u16 = 32;
const OP_TYPE_FUNCTION: u16 = 33;
const OP_FUNCTION: u16 = 54;
const OP_FUNCTION_END: u16 = 56;
const OP_VARIABLE: u16 = 59;
const OP_LOAD: u16 = 61;
const OP_STORE: u16 = 62;
const OP_DECORATE: u16 = 71;
const OP_SAMPLED_IMAGE: u16 = 86;
const OP_IMAGE_SAMPLE_IMPLICIT_LOD: u16 = 87;
const OP_LABEL: u16 = 248;
const OP_RETURN: u16 = 253;

// operand enums
const CAPABILITY_SHADER: u32 = 1;
const ADDRESSING_LOGICAL: u32 = 0;
const MEMORY_GLSL450: u32 = 1;
const MODEL_VERTEX: u32 = 0;
const MODEL_FRAGMENT: u32 = 4;
const MODE_ORIGIN_UPPER_LEFT: u32 = 7;
const DECORATION_BUILT_IN: u32 = 11;
const DECORATION_LOCATION: u32 = 30;
const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;
const BUILT_IN_POSITION: u32 = 0;
const BUILT_IN_FRAG_COORD: u32 = 15;
const BUILT_IN_VERTEX_INDEX: u32 = 42;
const STORAGE_UNIFORM_CONSTANT: u32 = 0;
const STORAGE_INPUT: u32 = 1;
const STORAGE_OUTPUT: u32 = 3;
const DIM_2D: u32 = 1;

/// Minimal SPIR-V assembler: instructions are appended in module order and
/// the id bound is taken from the caller.
struct Module {
    words: Vec<u32>,
}

impl Module {
    fn new(bound: u32) -> Self {
        Self {
            words: vec![MAGIC, VERSION_1_0, 0, bound, 0],
        }
    }

    fn op(&mut self, opcode: u16, operands: &[u32]) -> &mut Self {
        let count = (operands.len() + 1) as u32;
        self.words.push(count << 16 | u32::from(opcode));
        self.words.extend_from_slice(operands);
        self
    }

    fn name(&mut self, id: u32, name: &str) -> &mut Self {
        let mut operands = vec![id];
        operands.extend(string_words(name));
        self.op(OP_NAME, &operands)
    }

    fn entry_point(&mut self, model: u32, id: u32, name: &str, interface: &[u32]) -> &mut Self {
        let mut operands = vec![model, id];
        operands.extend(string_words(name));
        operands.extend_from_slice(interface);
        self.op(OP_ENTRY_POINT, &operands)
    }

    fn decorate(&mut self, id: u32, decoration: u32, value: u32) -> &mut Self {
        self.op(OP_DECORATE, &[id, decoration, value])
    }

    fn finish(&mut self) -> Vec<u32> {
        std::mem::take(&mut self.words)
    }
}

/// Nul-terminated, zero-padded little-endian string literal.
fn string_words(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// `fragment_main` sampling `texture` (binding 2) through `sampler`
/// (binding 1) at `uv`, plus an unused `FragCoord` built-in input.
fn textured_fragment_module() -> Vec<u32> {
    let (main, uv, color, frag_coord, sampler, texture) = (1, 2, 3, 4, 5, 6);
    let (void, func, float, vec2, vec4, image, sampler_ty) = (7, 8, 9, 10, 11, 12, 13);
    let (ptr_image, ptr_sampler, ptr_in_vec2, ptr_in_vec4, ptr_out_vec4) = (14, 15, 16, 17, 18);
    let (sampled_image, label, loaded_image, loaded_sampler, combined, loaded_uv, sampled) =
        (19, 20, 21, 22, 23, 24, 25);

    Module::new(26)
        .op(OP_CAPABILITY, &[CAPABILITY_SHADER])
        .op(OP_MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450])
        .entry_point(MODEL_FRAGMENT, main, "fragment_main", &[uv, color, frag_coord])
        .op(OP_EXECUTION_MODE, &[main, MODE_ORIGIN_UPPER_LEFT])
        .name(uv, "uv")
        .name(color, "out_frag_color")
        .name(frag_coord, "frag_coord")
        .name(sampler, "sampler")
        .name(texture, "texture")
        .decorate(uv, DECORATION_LOCATION, 0)
        .decorate(color, DECORATION_LOCATION, 0)
        .decorate(frag_coord, DECORATION_BUILT_IN, BUILT_IN_FRAG_COORD)
        // texture declared first so sorting by binding is observable
        .decorate(texture, DECORATION_DESCRIPTOR_SET, 0)
        .decorate(texture, DECORATION_BINDING, 2)
        .decorate(sampler, DECORATION_DESCRIPTOR_SET, 0)
        .decorate(sampler, DECORATION_BINDING, 1)
        .op(OP_TYPE_VOID, &[void])
        .op(OP_TYPE_FUNCTION, &[func, void])
        .op(OP_TYPE_FLOAT, &[float, 32])
        .op(OP_TYPE_VECTOR, &[vec2, float, 2])
        .op(OP_TYPE_VECTOR, &[vec4, float, 4])
        .op(OP_TYPE_IMAGE, &[image, float, DIM_2D, 0, 0, 0, 1, 0])
        .op(OP_TYPE_SAMPLER, &[sampler_ty])
        .op(OP_TYPE_SAMPLED_IMAGE, &[sampled_image, image])
        .op(OP_TYPE_POINTER, &[ptr_image, STORAGE_UNIFORM_CONSTANT, image])
        .op(OP_TYPE_POINTER, &[ptr_sampler, STORAGE_UNIFORM_CONSTANT, sampler_ty])
        .op(OP_TYPE_POINTER, &[ptr_in_vec2, STORAGE_INPUT, vec2])
        .op(OP_TYPE_POINTER, &[ptr_in_vec4, STORAGE_INPUT, vec4])
        .op(OP_TYPE_POINTER, &[ptr_out_vec4, STORAGE_OUTPUT, vec4])
        .op(OP_VARIABLE, &[ptr_image, texture, STORAGE_UNIFORM_CONSTANT])
        .op(OP_VARIABLE, &[ptr_sampler, sampler, STORAGE_UNIFORM_CONSTANT])
        .op(OP_VARIABLE, &[ptr_in_vec2, uv, STORAGE_INPUT])
        .op(OP_VARIABLE, &[ptr_in_vec4, frag_coord, STORAGE_INPUT])
        .op(OP_VARIABLE, &[ptr_out_vec4, color, STORAGE_OUTPUT])
        .op(OP_FUNCTION, &[void, main, 0, func])
        .op(OP_LABEL, &[label])
        .op(OP_LOAD, &[image, loaded_image, texture])
        .op(OP_LOAD, &[sampler_ty, loaded_sampler, sampler])
        .op(OP_SAMPLED_IMAGE, &[sampled_image, combined, loaded_image, loaded_sampler])
        .op(OP_LOAD, &[vec2, loaded_uv, uv])
        .op(OP_IMAGE_SAMPLE_IMPLICIT_LOD, &[vec4, sampled, combined, loaded_uv])
        .op(OP_STORE, &[color, sampled])
        .op(OP_RETURN, &[])
        .op(OP_FUNCTION_END, &[])
        .finish()
}

/// `vertex_main` writing `o_uv` at `uv_location` next to the `Position` and
/// `VertexIndex` built-ins.
fn fullscreen_vertex_module(uv_location: u32) -> Vec<u32> {
    let (main, o_uv, o_pos, vertex_index) = (1, 2, 3, 4);
    let (void, func, float, vec2, vec4, int) = (5, 6, 7, 8, 9, 10);
    let (ptr_out_vec2, ptr_out_vec4, ptr_in_int, label) = (11, 12, 13, 14);

    Module::new(15)
        .op(OP_CAPABILITY, &[CAPABILITY_SHADER])
        .op(OP_MEMORY_MODEL, &[ADDRESSING_LOGICAL, MEMORY_GLSL450])
        .entry_point(MODEL_VERTEX, main, "vertex_main", &[vertex_index, o_uv, o_pos])
        .name(o_uv, "o_uv")
        .name(o_pos, "o_pos")
        .name(vertex_index, "vertex_index")
        .decorate(o_uv, DECORATION_LOCATION, uv_location)
        .decorate(o_pos, DECORATION_BUILT_IN, BUILT_IN_POSITION)
        .decorate(vertex_index, DECORATION_BUILT_IN, BUILT_IN_VERTEX_INDEX)
        .op(OP_TYPE_VOID, &[void])
        .op(OP_TYPE_FUNCTION, &[func, void])
        .op(OP_TYPE_FLOAT, &[float, 32])
        .op(OP_TYPE_VECTOR, &[vec2, float, 2])
        .op(OP_TYPE_VECTOR, &[vec4, float, 4])
        .op(OP_TYPE_INT, &[int, 32, 1])
        .op(OP_TYPE_POINTER, &[ptr_out_vec2, STORAGE_OUTPUT, vec2])
        .op(OP_TYPE_POINTER, &[ptr_out_vec4, STORAGE_OUTPUT, vec4])
        .op(OP_TYPE_POINTER, &[ptr_in_int, STORAGE_INPUT, int])
        .op(OP_VARIABLE, &[ptr_out_vec2, o_uv, STORAGE_OUTPUT])
        .op(OP_VARIABLE, &[ptr_out_vec4, o_pos, STORAGE_OUTPUT])
        .op(OP_VARIABLE, &[ptr_in_int, vertex_index, STORAGE_INPUT])
        .op(OP_FUNCTION, &[void, main, 0, func])
        .op(OP_LABEL, &[label])
        .op(OP_RETURN, &[])
        .op(OP_FUNCTION_END, &[])
        .finish()
}

fn as_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn string_literals_are_padded() {
    assert_eq!(string_words("uv"), vec![0x0000_7675]);
    assert_eq!(string_words("abcd").len(), 2);
}

#[test]
fn fragment_module_reflects_field_by_field() {
    let interface = StageInterface::reflect(&textured_fragment_module()).unwrap();

    assert_eq!(interface.stage, ShaderStage::Fragment);
    assert_eq!(interface.entry_point, "fragment_main");

    assert_eq!(interface.bindings.len(), 2);
    let sampler = &interface.bindings[0];
    assert_eq!((sampler.set, sampler.binding), (0, 1));
    assert_eq!(sampler.kind, BindingKind::Sampler);
    assert_eq!(sampler.name, "sampler");
    let texture = &interface.bindings[1];
    assert_eq!((texture.set, texture.binding), (0, 2));
    assert_eq!(texture.kind, BindingKind::SampledImage2d);
    assert_eq!(texture.name, "texture");

    // frag_coord is a built-in and stays out of the user inputs
    assert_eq!(interface.inputs.len(), 1);
    assert_eq!(interface.inputs[0].location, 0);
    assert_eq!(interface.inputs[0].format, IoFormat::Float32x2);
    assert_eq!(interface.inputs[0].name, "uv");

    assert_eq!(interface.outputs.len(), 1);
    assert_eq!(interface.outputs[0].location, 0);
    assert_eq!(interface.outputs[0].format, IoFormat::Float32x4);

    InterfaceContract::textured_fragment()
        .validate(&interface)
        .unwrap();
}

#[test]
fn vertex_module_has_only_the_uv_varying() {
    let interface = StageInterface::reflect(&fullscreen_vertex_module(0)).unwrap();

    assert_eq!(interface.stage, ShaderStage::Vertex);
    assert_eq!(interface.entry_point, "vertex_main");
    assert!(interface.bindings.is_empty());
    assert!(interface.inputs.is_empty());
    assert_eq!(interface.outputs.len(), 1);
    assert_eq!(interface.outputs[0].format, IoFormat::Float32x2);

    InterfaceContract::fullscreen_vertex()
        .validate(&interface)
        .unwrap();
}

#[test]
fn reflected_stages_link() {
    let fragment = StageInterface::reflect(&textured_fragment_module()).unwrap();
    let vertex = StageInterface::reflect(&fullscreen_vertex_module(0)).unwrap();
    assert!(check_linkage(&vertex, &fragment).is_empty());

    let moved = StageInterface::reflect(&fullscreen_vertex_module(3)).unwrap();
    assert_eq!(
        check_linkage(&moved, &fragment),
        vec![Mismatch::MissingOutput {
            location: 0,
            expected: IoFormat::Float32x2,
        }]
    );
}

#[test]
fn fragment_is_not_a_vertex_stage() {
    let fragment = StageInterface::reflect(&textured_fragment_module()).unwrap();
    let mismatches = InterfaceContract::fullscreen_vertex().check(&fragment);
    assert!(mismatches.contains(&Mismatch::Stage {
        expected: ShaderStage::Vertex,
        actual: ShaderStage::Fragment,
    }));
}

#[test]
fn bytes_round_trip_through_read_spv() {
    let words = textured_fragment_module();
    let read = read_spv(&mut Cursor::new(as_bytes(&words))).unwrap();
    assert_eq!(read, words);
    assert!(StageInterface::reflect(&read).is_ok());
}
