//! Gamut-boundary tables in (J, s, h) space.
//!
//! A [`GamutTable`] describes the boundary of one output color space as
//! seen through one perceptual model, as three surfaces over regular grids
//! with every axis normalized to `[0, 1]` (grid points inclusive at both
//! ends):
//!
//! - `s_jh[h][J]`: highest in-gamut saturation at lightness `J`
//! - `j_sh[h][i]`: highest in-gamut lightness at saturation
//!   `i / (size_s - 1) · s_edge(h)`
//! - `js_h[h]`: the brightest edge point `(J, s)` of each hue
//!
//! Tables are built by [`generate`], persisted by [`cache`] and served by
//! [`GamutStore`].

pub mod cache;
pub mod generate;
pub mod locus;
pub mod mapper;
pub mod store;

use crate::appearance::PerceptualModel;
use crate::error::{ColorError, ColorResult};

pub use generate::generate_table;
pub use locus::LocusDataset;
pub use mapper::GamutMapper;
pub use store::GamutStore;

/// Cache key for a (model, color space) pair.
pub fn table_key(model: PerceptualModel, space: &str) -> String {
    format!("{}_{}", model.name(), space)
}

/// Gamut boundary surfaces for one (model, color space) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct GamutTable {
    model: PerceptualModel,
    space: String,
    size_j: usize,
    size_s: usize,
    size_h: usize,
    s_jh: Vec<f32>,
    j_sh: Vec<f32>,
    js_h: Vec<f32>,
}

impl GamutTable {
    /// A table with no data. Every query returns its "no compression"
    /// default.
    pub fn empty(model: PerceptualModel, space: impl Into<String>) -> Self {
        Self {
            model,
            space: space.into(),
            size_j: 0,
            size_s: 0,
            size_h: 0,
            s_jh: Vec::new(),
            j_sh: Vec::new(),
            js_h: Vec::new(),
        }
    }

    /// Assemble a table, checking each grid against its declared size.
    pub fn from_parts(
        model: PerceptualModel,
        space: impl Into<String>,
        (size_j, size_s, size_h): (usize, usize, usize),
        s_jh: Vec<f32>,
        j_sh: Vec<f32>,
        js_h: Vec<f32>,
    ) -> ColorResult<Self> {
        if size_j < 2 || size_s < 2 || size_h < 2 {
            return Err(ColorError::CacheFormat(format!(
                "resolution {size_j}x{size_s}x{size_h} is too small"
            )));
        }
        check_len("s_jh", s_jh.len(), size_j * size_h)?;
        check_len("j_sh", j_sh.len(), size_s * size_h)?;
        check_len("js_h", js_h.len(), size_h * 2)?;

        Ok(Self {
            model,
            space: space.into(),
            size_j,
            size_s,
            size_h,
            s_jh,
            j_sh,
            js_h,
        })
    }

    pub fn model(&self) -> PerceptualModel {
        self.model
    }

    /// Color space key.
    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn key(&self) -> String {
        table_key(self.model, &self.space)
    }

    /// Grid sizes `(J, s, h)`.
    pub fn resolution(&self) -> (usize, usize, usize) {
        (self.size_j, self.size_s, self.size_h)
    }

    pub fn is_empty(&self) -> bool {
        self.size_h == 0
    }

    pub(crate) fn s_jh(&self) -> &[f32] {
        &self.s_jh
    }

    pub(crate) fn j_sh(&self) -> &[f32] {
        &self.j_sh
    }

    pub(crate) fn js_h(&self) -> &[f32] {
        &self.js_h
    }

    /// Highest in-gamut saturation at lightness `j` and hue `h`.
    ///
    /// Interpolates the grid across J then h, and across h then J, and
    /// returns the smaller of the two. Empty table: `0`.
    pub fn saturation_limit(&self, j: f32, h: f32) -> f32 {
        if self.is_empty() {
            return 0.0;
        }

        let (j0, tj) = grid_position(j, self.size_j);
        let (h0, th) = grid_position(h, self.size_h);
        let at = |hi: usize, ji: usize| self.s_jh[hi * self.size_j + ji];

        let v00 = at(h0, j0);
        let v01 = at(h0, j0 + 1);
        let v10 = at(h0 + 1, j0);
        let v11 = at(h0 + 1, j0 + 1);

        let j_first = lerp(lerp(v00, v01, tj), lerp(v10, v11, tj), th);
        let h_first = lerp(lerp(v00, v10, th), lerp(v01, v11, th), tj);
        j_first.min(h_first).max(0.0)
    }

    /// Highest in-gamut lightness at saturation `s` and hue `h`.
    ///
    /// At or beyond a hue's edge saturation that hue contributes its edge
    /// lightness. Empty table: `1`.
    pub fn lightness_limit(&self, s: f32, h: f32) -> f32 {
        if self.is_empty() {
            return 1.0;
        }

        let s = if s.is_nan() { 0.0 } else { s.max(0.0) };
        let (h0, th) = grid_position(h, self.size_h);
        lerp(self.lightness_row(h0, s), self.lightness_row(h0 + 1, s), th)
    }

    fn lightness_row(&self, hi: usize, s: f32) -> f32 {
        let j_edge = self.js_h[hi * 2];
        let s_edge = self.js_h[hi * 2 + 1];
        if s >= s_edge {
            return j_edge;
        }

        let (i0, t) = grid_position(s / s_edge, self.size_s);
        let row = &self.j_sh[hi * self.size_s..(hi + 1) * self.size_s];
        lerp(row[i0], row[i0 + 1], t)
    }

    /// The brightest boundary point `(J, s)` at hue `h`. Empty table: `(1, 0)`.
    pub fn lightness_edge_js(&self, h: f32) -> (f32, f32) {
        if self.is_empty() {
            return (1.0, 0.0);
        }

        let (h0, th) = grid_position(h, self.size_h);
        let j = lerp(self.js_h[h0 * 2], self.js_h[h0 * 2 + 2], th);
        let s = lerp(self.js_h[h0 * 2 + 1], self.js_h[h0 * 2 + 3], th);
        (j, s)
    }
}

fn check_len(name: &str, got: usize, expected: usize) -> ColorResult<()> {
    if got == expected {
        Ok(())
    } else {
        Err(ColorError::CacheFormat(format!(
            "{name} holds {got} values, expected {expected}"
        )))
    }
}

/// Lower grid index and fraction for a normalized coordinate on an
/// inclusive grid of `size >= 2` points. NaN maps to 0.
#[inline]
pub(crate) fn grid_position(x: f32, size: usize) -> (usize, f32) {
    let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
    let pos = x * (size - 1) as f32;
    let i = (pos as usize).min(size - 2);
    (i, pos - i as f32)
}

#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
