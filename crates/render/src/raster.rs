//! CPU stand-in for the fixed-function steps around the fragment stage:
//! rasterizing triangle lists, interpolating their uv varying, and writing
//! the stage's output to a color attachment.

use glam::{Vec2, Vec4};
use image::{Rgba, Rgba32FImage, RgbaImage};
use rayon::prelude::*;
use sampling::linear_to_srgb;

use crate::stage::{FragmentInput, FragmentStage};
use crate::types::RenderError;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipVertex {
    pub position: Vec4,
    pub uv: Vec2,
}

impl ClipVertex {
    /// Vertex on the `z = 0`, `w = 1` plane.
    pub fn flat(x: f32, y: f32, uv: Vec2) -> Self {
        Self {
            position: Vec4::new(x, y, 0.0, 1.0),
            uv,
        }
    }
}

/// The output of the vertex stage: a triangle list in clip space, drawn in
/// order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Varyings {
    pub triangles: Vec<[ClipVertex; 3]>,
}

impl Varyings {
    pub fn new(triangles: Vec<[ClipVertex; 3]>) -> Self {
        Self { triangles }
    }

    /// Groups a non-indexed vertex buffer into triangles. Trailing vertices
    /// that don't make up a whole triangle are dropped, as a draw call does.
    pub fn from_vertices(vertices: &[ClipVertex]) -> Self {
        let chunks = vertices.chunks_exact(3);
        if !chunks.remainder().is_empty() {
            log::warn!(
                "ignoring {} trailing vertices of a triangle list",
                chunks.remainder().len()
            );
        }
        Self {
            triangles: chunks.map(|c| [c[0], c[1], c[2]]).collect(),
        }
    }

    /// The single triangle `fullscreen_vertex` emits.
    pub fn fullscreen() -> Self {
        let vertex = |index| {
            let (position, uv) = shader_objects::fullscreen_triangle(index);
            ClipVertex { position, uv }
        };
        Self::new(vec![[vertex(0), vertex(1), vertex(2)]])
    }

    /// Axis-aligned rectangle between clip-space corners `min` and `max`
    /// with `uv_min` at `min`. Clip-space `y = -1` is the top row.
    pub fn textured_quad(min: Vec2, max: Vec2, uv_min: Vec2, uv_max: Vec2) -> Self {
        let mut varyings = Self::default();
        varyings.push_quad(min, max, uv_min, uv_max);
        varyings
    }

    /// Appends a rectangle as two triangles sharing the `min` to `max`
    /// diagonal.
    pub fn push_quad(&mut self, min: Vec2, max: Vec2, uv_min: Vec2, uv_max: Vec2) {
        let a = ClipVertex::flat(min.x, min.y, uv_min);
        let b = ClipVertex::flat(max.x, min.y, Vec2::new(uv_max.x, uv_min.y));
        let c = ClipVertex::flat(max.x, max.y, uv_max);
        let d = ClipVertex::flat(min.x, max.y, Vec2::new(uv_min.x, uv_max.y));
        self.triangles.push([a, b, c]);
        self.triangles.push([a, c, d]);
    }

    pub fn push_triangle(&mut self, triangle: [ClipVertex; 3]) {
        self.triangles.push(triangle);
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    pub input: FragmentInput,
}

/// A triangle in framebuffer coordinates, wound so its area is positive.
struct ScreenTriangle {
    points: [Vec2; 3],
    inv_w: [f32; 3],
    uvs: [Vec2; 3],
    area: f32,
    /// Per edge, opposite vertex i: whether the edge is a top or left edge.
    top_left: [bool; 3],
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

// With y pointing down and positive area, a top edge runs in +x and a left
// edge runs in -y.
fn is_top_left(from: Vec2, to: Vec2) -> bool {
    let d = to - from;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

impl ScreenTriangle {
    fn new(vertices: &[ClipVertex; 3], width: u32, height: u32) -> Self {
        let size = Vec2::new(width as f32, height as f32);
        let mut points = [Vec2::ZERO; 3];
        let mut inv_w = [0.0; 3];
        let mut uvs = [Vec2::ZERO; 3];
        for (i, vertex) in vertices.iter().enumerate() {
            let w = vertex.position.w;
            let ndc = Vec2::new(vertex.position.x, vertex.position.y) / w;
            // viewport transform, y grows downward as in Vulkan
            points[i] = (ndc + Vec2::ONE) * 0.5 * size;
            inv_w[i] = 1.0 / w;
            uvs[i] = vertex.uv;
        }
        let mut area = edge(points[0], points[1], points[2]);
        // no culling, both windings are drawn
        if area < 0.0 {
            points.swap(1, 2);
            inv_w.swap(1, 2);
            uvs.swap(1, 2);
            area = -area;
        }
        let [a, b, c] = points;
        Self {
            points,
            inv_w,
            uvs,
            area,
            top_left: [is_top_left(b, c), is_top_left(c, a), is_top_left(a, b)],
        }
    }

    fn edges(&self, p: Vec2) -> [f32; 3] {
        let [a, b, c] = self.points;
        [edge(b, c, p), edge(c, a, p), edge(a, b, p)]
    }

    fn barycentric(&self, p: Vec2) -> [f32; 3] {
        self.edges(p).map(|e| e / self.area)
    }

    /// Perspective-correct uv at `p`; also valid outside the triangle, which
    /// derivative estimation relies on.
    fn uv_at(&self, p: Vec2) -> Vec2 {
        let b = self.barycentric(p);
        let mut weight = 0.0;
        let mut uv = Vec2::ZERO;
        for i in 0..3 {
            let w = b[i] * self.inv_w[i];
            weight += w;
            uv += self.uvs[i] * w;
        }
        uv / weight
    }

    /// Top-left fill rule: a center exactly on an edge belongs to the
    /// triangle only if that edge is a top or left edge, so triangles
    /// sharing an edge never both cover a pixel.
    fn covers(&self, p: Vec2) -> bool {
        self.edges(p)
            .iter()
            .zip(self.top_left)
            .all(|(e, top_left)| *e > 0.0 || (*e == 0.0 && top_left))
    }

    fn bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let min = self.points[0].min(self.points[1]).min(self.points[2]);
        let max = self.points[0].max(self.points[1]).max(self.points[2]);
        let clamp_x = |v: f32| v.max(0.0).min(width as f32) as u32;
        let clamp_y = |v: f32| v.max(0.0).min(height as f32) as u32;
        (
            clamp_x(min.x.floor()),
            clamp_y(min.y.floor()),
            clamp_x(max.x.ceil()),
            clamp_y(max.y.ceil()),
        )
    }
}

fn rasterize_triangle(
    vertices: &[ClipVertex; 3],
    width: u32,
    height: u32,
    fragments: &mut Vec<Fragment>,
) {
    let triangle = ScreenTriangle::new(vertices, width, height);
    if triangle.area == 0.0 || !triangle.area.is_finite() {
        log::warn!("skipping degenerate triangle");
        return;
    }

    let (x0, y0, x1, y1) = triangle.bounds(width, height);
    for y in y0..y1 {
        for x in x0..x1 {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if !triangle.covers(center) {
                continue;
            }
            let uv = triangle.uv_at(center);
            fragments.push(Fragment {
                x,
                y,
                input: FragmentInput {
                    uv,
                    ddx: triangle.uv_at(center + Vec2::X) - uv,
                    ddy: triangle.uv_at(center + Vec2::Y) - uv,
                },
            });
        }
    }
}

/// Fragments covered by each triangle, sampled at pixel centers. Triangles
/// are emitted in list order, each in row-major order, so where triangles
/// overlap the later fragment comes later.
///
/// Derivatives are forward differences to the neighbouring pixel centers.
/// Degenerate triangles produce no fragments.
pub fn rasterize(varyings: &Varyings, width: u32, height: u32) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for triangle in &varyings.triangles {
        rasterize_triangle(triangle, width, height, &mut fragments);
    }
    fragments
}

/// Single color attachment the stage writes to.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pixels: Vec<Vec4>,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        Self::with_clear(width, height, Vec4::ZERO)
    }

    pub fn with_clear(width: u32, height: u32, clear: Vec4) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::ZeroSizeTarget { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels: vec![clear; width as usize * height as usize],
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    fn write(&mut self, x: u32, y: u32, color: Vec4) {
        let index = (y * self.width + x) as usize;
        self.pixels[index] = color;
    }

    /// Quantizes to 8 bits per channel, optionally applying the sRGB
    /// transfer function to the color channels first.
    pub fn to_rgba8(&self, encode_srgb: bool) -> RgbaImage {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let encode = |c: f32| {
            if encode_srgb {
                quantize(linear_to_srgb(c.clamp(0.0, 1.0)))
            } else {
                quantize(c)
            }
        };
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let p = self.pixel(x, y);
            Rgba([encode(p.x), encode(p.y), encode(p.z), quantize(p.w)])
        })
    }

    /// Unquantized linear copy of the target.
    pub fn to_rgba32f(&self) -> Rgba32FImage {
        let raw: &[f32] = bytemuck::cast_slice(&self.pixels);
        Rgba32FImage::from_raw(self.width, self.height, raw.to_vec())
            .expect("pixel buffer matches the target extent")
    }
}

/// Invokes the stage for every fragment in the given order and writes the
/// results.
pub fn draw_fragments(stage: &FragmentStage, fragments: &[Fragment], target: &mut RenderTarget) {
    for fragment in fragments {
        let output = stage.invoke(&fragment.input);
        target.write(fragment.x, fragment.y, output.color);
    }
}

pub fn draw_sequential(stage: &FragmentStage, varyings: &Varyings, target: &mut RenderTarget) {
    let fragments = rasterize(varyings, target.width, target.height);
    draw_fragments(stage, &fragments, target);
}

/// Rasterizes `varyings` into `target`, running invocations in parallel.
/// Results land in fragment order, so later triangles overwrite earlier
/// ones. Pixels no triangle covers keep their previous value, which is how
/// several draws with different bindings share one target.
pub fn draw(stage: &FragmentStage, varyings: &Varyings, target: &mut RenderTarget) {
    let fragments = rasterize(varyings, target.width, target.height);
    log::debug!(
        "shading {} fragments on a {}x{} target",
        fragments.len(),
        target.width,
        target.height
    );
    let colors: Vec<Vec4> = fragments
        .par_iter()
        .map(|fragment| stage.invoke(&fragment.input).color)
        .collect();
    for (fragment, color) in fragments.iter().zip(colors) {
        target.write(fragment.x, fragment.y, color);
    }
}
