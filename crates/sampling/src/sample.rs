use glam::{Vec2, Vec4};

use crate::{Filter, MipmapMode, SamplerDesc, Texture2d};

/// A sampler and a texture combined at the point of use.
///
/// Mirrors the sampling calls the fragment shader makes on the GPU.
#[derive(Clone, Copy, Debug)]
pub struct SampledImage<'a> {
    pub sampler: &'a SamplerDesc,
    pub texture: &'a Texture2d,
}

// Non-finite coordinates have no defined result on the GPU; pin them to 0.0
// so the reference stays deterministic.
fn sanitize(uv: Vec2) -> Vec2 {
    let fix = |c: f32| if c.is_finite() { c } else { 0.0 };
    Vec2::new(fix(uv.x), fix(uv.y))
}

impl<'a> SampledImage<'a> {
    pub fn new(sampler: &'a SamplerDesc, texture: &'a Texture2d) -> Self {
        Self { sampler, texture }
    }

    /// Samples with no derivative information. This matches
    /// `sample_by_gradient` with zero derivatives: the lod is negative
    /// infinity, so no bias lifts it off `min_lod`.
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        self.sample_at(uv, self.clamp_lod(f32::NEG_INFINITY))
    }

    pub fn sample_by_lod(&self, uv: Vec2, lod: f32) -> Vec4 {
        self.sample_at(uv, self.clamp_lod(lod))
    }

    /// Samples with explicit screen-space derivatives of `uv`, the way an
    /// implicit-lod sample in a fragment shader picks its level.
    pub fn sample_by_gradient(&self, uv: Vec2, ddx: Vec2, ddy: Vec2) -> Vec4 {
        self.sample_at(uv, self.clamp_lod(self.lod_from_gradient(ddx, ddy)))
    }

    /// Unbiased, unclamped level of detail for the given derivatives.
    pub fn lod_from_gradient(&self, ddx: Vec2, ddy: Vec2) -> f32 {
        let size = self.texture.extent(0).as_vec2();
        let rho = (ddx * size).length().max((ddy * size).length());
        rho.log2()
    }

    /// Applies the sampler bias and `[min_lod, max_lod]` clamp.
    pub fn clamp_lod(&self, lod: f32) -> f32 {
        let lambda = lod + self.sampler.mip_lod_bias;
        if lambda.is_nan() {
            return self.sampler.min_lod;
        }
        lambda.min(self.sampler.max_lod).max(self.sampler.min_lod)
    }

    fn sample_at(&self, uv: Vec2, lambda: f32) -> Vec4 {
        let uv = sanitize(uv);
        if lambda <= 0.0 {
            return self.filter_level(0, uv, self.sampler.mag_filter);
        }

        let q = (self.texture.level_count() - 1) as f32;
        let d = lambda.min(q);
        let min_filter = self.sampler.min_filter;
        match self.sampler.mipmap_mode {
            MipmapMode::Nearest => {
                let level = ((d + 0.5).ceil() - 1.0).clamp(0.0, q) as u32;
                self.filter_level(level, uv, min_filter)
            }
            MipmapMode::Linear => {
                let fine = d.floor();
                let coarse = (fine + 1.0).min(q);
                let delta = d - fine;
                let a = self.filter_level(fine as u32, uv, min_filter);
                if delta == 0.0 {
                    return a;
                }
                let b = self.filter_level(coarse as u32, uv, min_filter);
                a.lerp(b, delta)
            }
        }
    }

    fn fetch(&self, level: u32, i: i64, j: i64) -> Vec4 {
        let extent = self.texture.extent(level);
        match (
            self.sampler.address_mode_u.wrap(i, extent.x),
            self.sampler.address_mode_v.wrap(j, extent.y),
        ) {
            (Some(x), Some(y)) => self.texture.texel(level, x, y),
            _ => self.sampler.border_color.color(),
        }
    }

    fn filter_level(&self, level: u32, uv: Vec2, filter: Filter) -> Vec4 {
        let st = uv * self.texture.extent(level).as_vec2();
        match filter {
            Filter::Nearest => self.fetch(level, st.x.floor() as i64, st.y.floor() as i64),
            Filter::Linear => {
                let base = st - Vec2::splat(0.5);
                let i0 = base.x.floor();
                let j0 = base.y.floor();
                let alpha = base.x - i0;
                let beta = base.y - j0;
                let (i0, j0) = (i0 as i64, j0 as i64);
                let (i1, j1) = (i0.saturating_add(1), j0.saturating_add(1));

                let top = self.fetch(level, i0, j0).lerp(self.fetch(level, i1, j0), alpha);
                let bottom = self.fetch(level, i0, j1).lerp(self.fetch(level, i1, j1), alpha);
                top.lerp(bottom, beta)
            }
        }
    }
}
