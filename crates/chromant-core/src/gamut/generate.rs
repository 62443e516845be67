//! Gamut table generation by fixed-step boundary search.
//!
//! 1. Walk the six maximally saturated edges of the RGB unit cube
//!    (red → yellow → green → cyan → blue → magenta → red), convert each
//!    sample to Jsh and stitch the result into one closed hue curve.
//! 2. Convert the locus dataset the same way into a per-hue saturation cap.
//! 3. Resample the edge curve onto the hue grid, capped, giving `js_h`.
//! 4. Per hue, trace `s(J)` outward from the edge lightness in both
//!    directions, giving `s_jh`.
//! 5. Per hue, trace `J(s)` from the edge down to zero saturation, giving
//!    `j_sh`.
//!
//! Generation is single threaded and always runs to completion.

use glam::{Mat3, Vec3};
use tracing::debug;

use crate::appearance::{Converter, Jsh, PerceptualModel};
use crate::color_management::{ColorRegistry, EQUAL_ENERGY};
use crate::config::GamutConfig;
use crate::error::{ColorError, ColorResult};
use crate::gamut::{GamutTable, LocusDataset, lerp};

/// Slack on the RGB unit range when testing a trial color.
const GAMUT_TOLERANCE: f32 = 1e-4;

/// Cube corners in hue order, closing back on red.
const CUBE_CORNERS: [Vec3; 7] = [
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, 1.0, 1.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 0.0),
];

/// Build the gamut table of color space `space` under `model`.
pub fn generate_table(
    registry: &ColorRegistry,
    model: PerceptualModel,
    space: &str,
    config: &GamutConfig,
    locus: &LocusDataset,
) -> ColorResult<GamutTable> {
    let config = config.sanitized();
    let (size_j, size_s, size_h) = (
        config.resolution_j,
        config.resolution_s,
        config.resolution_h,
    );

    let tracer = BoundaryTracer::new(registry, model, space, config.search_step)?;
    let edge = tracer.cube_edge(config.edge_samples).ok_or_else(|| {
        ColorError::Generation(format!("{model}_{space}: RGB cube edge has no hue span"))
    })?;
    let cap = saturation_cap(registry, model, locus)?;
    debug!(
        key = %format!("{model}_{space}"),
        capped = cap.is_some(),
        "tracing gamut boundary"
    );

    let mut s_jh = vec![0.0f32; size_j * size_h];
    let mut j_sh = vec![1.0f32; size_s * size_h];
    let mut js_h = vec![0.0f32; size_h * 2];

    for hi in 0..size_h {
        let h = grid_value(hi, size_h);

        let (j_edge, s_edge) = edge.at(h);
        let j_edge = j_edge.clamp(0.0, 1.0);
        let mut s_edge = s_edge.max(0.0);
        if let Some(cap) = &cap {
            s_edge = s_edge.min(cap.at(h).1.max(0.0));
        }
        js_h[hi * 2] = j_edge;
        js_h[hi * 2 + 1] = s_edge;

        let row = &mut s_jh[hi * size_j..(hi + 1) * size_j];
        tracer.trace_saturation_row(row, h, j_edge, s_edge);

        let row = &mut j_sh[hi * size_s..(hi + 1) * size_s];
        tracer.trace_lightness_row(row, h, j_edge, s_edge);
    }

    GamutTable::from_parts(model, space, (size_j, size_s, size_h), s_jh, j_sh, js_h)
}

/// Value of grid point `i` on an inclusive `[0, 1]` grid.
#[inline]
fn grid_value(i: usize, size: usize) -> f32 {
    i as f32 / (size - 1) as f32
}

/// Per-hue saturation cap from the locus dataset. `None` when the dataset
/// is empty or covers no hue span.
fn saturation_cap(
    registry: &ColorRegistry,
    model: PerceptualModel,
    locus: &LocusDataset,
) -> ColorResult<Option<HueCurve>> {
    if locus.is_empty() {
        return Ok(None);
    }
    let converter = Converter::new(model, registry, EQUAL_ENERGY, EQUAL_ENERGY)?;
    let samples = locus
        .usable_points()
        .map(|xyz| HueSample::from(converter.to_jsh(xyz)))
        .collect();
    Ok(HueCurve::from_unordered(samples))
}

// ---------------------------------------------------------------------------
// Hue curves
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct HueSample {
    pub h: f32,
    pub j: f32,
    pub s: f32,
}

impl From<Jsh> for HueSample {
    fn from(c: Jsh) -> Self {
        Self {
            h: c.h,
            j: c.j,
            s: c.s,
        }
    }
}

/// A closed curve over the hue circle.
///
/// Hues are unwrapped and strictly increasing. One wrapped copy sits at each
/// end so any hue falls between two samples.
#[derive(Debug, Clone)]
pub(crate) struct HueCurve {
    samples: Vec<HueSample>,
}

impl HueCurve {
    /// Stitch samples given in traversal order around the hue circle.
    ///
    /// The curve is rotated to start at the lowest hue; a drop of more than
    /// half a turn counts as crossing `1 → 0`. Samples that do not advance
    /// the hue are dropped.
    pub(crate) fn from_traversal(samples: Vec<HueSample>) -> Option<Self> {
        let mut samples: Vec<HueSample> = samples
            .into_iter()
            .filter(|p| p.h.is_finite() && p.j.is_finite() && p.s.is_finite())
            .collect();
        let start = samples
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.h.total_cmp(&b.1.h))
            .map(|(i, _)| i)?;
        samples.rotate_left(start);

        let first = samples[0].h;
        let mut stitched: Vec<HueSample> = Vec::with_capacity(samples.len() + 2);
        let mut offset = 0.0;
        let mut prev = first;
        for p in samples {
            let mut h = p.h + offset;
            if h < prev - 0.5 {
                offset += 1.0;
                h += 1.0;
            }
            prev = h;

            let advances = stitched.last().is_none_or(|q| h > q.h);
            if advances && h < first + 1.0 {
                stitched.push(HueSample { h, ..p });
            }
        }
        if stitched.len() < 2 {
            return None;
        }

        let head = stitched[0];
        let tail = stitched[stitched.len() - 1];
        stitched.insert(
            0,
            HueSample {
                h: tail.h - 1.0,
                ..tail
            },
        );
        stitched.push(HueSample {
            h: head.h + 1.0,
            ..head
        });
        Some(Self { samples: stitched })
    }

    /// Stitch samples given in no particular order.
    pub(crate) fn from_unordered(mut samples: Vec<HueSample>) -> Option<Self> {
        samples.retain(|p| p.h.is_finite());
        samples.sort_by(|a, b| a.h.total_cmp(&b.h));
        Self::from_traversal(samples)
    }

    /// `(J, s)` at hue `h`, linearly interpolated.
    pub(crate) fn at(&self, h: f32) -> (f32, f32) {
        let n = self.samples.len();
        let base = self.samples[1].h;
        let h = if h.is_finite() { h } else { 0.0 };
        let h = base + (h - base).rem_euclid(1.0);

        let k = self.samples.partition_point(|p| p.h <= h).clamp(1, n - 1);
        let a = self.samples[k - 1];
        let b = self.samples[k];
        let t = ((h - a.h) / (b.h - a.h)).clamp(0.0, 1.0);
        (lerp(a.j, b.j, t), lerp(a.s, b.s, t))
    }
}

// ---------------------------------------------------------------------------
// Boundary search
// ---------------------------------------------------------------------------

/// Fixed-step scan for the edge of a one-dimensional inside region.
///
/// Starting at `start`, steps toward `hi` while inside, or toward `lo` while
/// outside, and returns the midpoint of the last inside / first outside
/// pair. Returns `hi` (or `lo`) if the scan reaches the bound first.
pub(crate) fn boundary_search(
    start: f32,
    step: f32,
    lo: f32,
    hi: f32,
    inside: impl Fn(f32) -> bool,
) -> f32 {
    let hi = hi.max(lo);
    let mut x = start.clamp(lo, hi);

    if inside(x) {
        while x < hi {
            let next = (x + step).min(hi);
            if !inside(next) {
                return 0.5 * (x + next);
            }
            x = next;
        }
        hi
    } else {
        while x > lo {
            let next = (x - step).max(lo);
            if inside(next) {
                return 0.5 * (x + next);
            }
            x = next;
        }
        lo
    }
}

/// Tests trial Jsh colors against the RGB unit cube of one color space.
pub(crate) struct BoundaryTracer {
    converter: Converter,
    cs_to_xyz: Mat3,
    xyz_to_cs: Mat3,
    step: f32,
}

impl BoundaryTracer {
    pub(crate) fn new(
        registry: &ColorRegistry,
        model: PerceptualModel,
        space: &str,
        step: f32,
    ) -> ColorResult<Self> {
        let cs = registry.color_space(space)?;
        let converter = Converter::new(model, registry, &cs.illuminant, &cs.illuminant)?;
        Ok(Self {
            converter,
            cs_to_xyz: registry.matrix_cs_to_xyz(space)?.to_mat3(),
            xyz_to_cs: registry.matrix_xyz_to_cs(space)?.to_mat3(),
            step,
        })
    }

    /// Whether `jsh` maps to linear RGB inside the unit cube.
    #[inline]
    pub(crate) fn inside(&self, jsh: Jsh) -> bool {
        let rgb = self.xyz_to_cs * self.converter.to_xyz(jsh);
        rgb.cmpge(Vec3::splat(-GAMUT_TOLERANCE)).all()
            && rgb.cmple(Vec3::splat(1.0 + GAMUT_TOLERANCE)).all()
    }

    pub(crate) fn to_jsh(&self, rgb: Vec3) -> Jsh {
        self.converter.to_jsh(self.cs_to_xyz * rgb)
    }

    /// The cube's saturated edge as a hue curve.
    fn cube_edge(&self, per_edge: usize) -> Option<HueCurve> {
        let samples = CUBE_CORNERS
            .windows(2)
            .flat_map(|w| {
                let (from, to) = (w[0], w[1]);
                (0..per_edge).map(move |i| from.lerp(to, i as f32 / per_edge as f32))
            })
            .map(|rgb| HueSample::from(self.to_jsh(rgb)))
            .collect();
        HueCurve::from_traversal(samples)
    }

    /// Fill `row[k]` with the highest in-gamut saturation at `J_k`, walking
    /// away from the edge lightness in both directions.
    ///
    /// Row 0 is pinned to zero. Every trial at `J = 0` is black and would
    /// report the full edge saturation, inflating the first lightness cell.
    fn trace_saturation_row(&self, row: &mut [f32], h: f32, j_edge: f32, s_edge: f32) {
        let size = row.len();
        let k_edge = ((j_edge * (size - 1) as f32).round() as usize).clamp(1, size - 1);
        let trace = |k: usize, start: f32| {
            let j = grid_value(k, size);
            boundary_search(start, self.step, 0.0, s_edge, |s| {
                self.inside(Jsh::new(j, s, h))
            })
        };

        row[k_edge] = trace(k_edge, s_edge);
        let mut s = row[k_edge];
        for k in (1..k_edge).rev() {
            s = trace(k, s);
            row[k] = s;
        }
        row[0] = 0.0;
        s = row[k_edge];
        for k in k_edge + 1..size {
            s = trace(k, s);
            row[k] = s;
        }
    }

    /// Fill `row[i]` with the highest in-gamut lightness at saturation
    /// `i / (size - 1) · s_edge`, walking from the edge toward zero.
    fn trace_lightness_row(&self, row: &mut [f32], h: f32, j_edge: f32, s_edge: f32) {
        let size = row.len();
        if s_edge <= 0.0 {
            row.fill(1.0);
            return;
        }

        row[size - 1] = j_edge;
        let mut j = j_edge;
        for i in (1..size - 1).rev() {
            let s = grid_value(i, size) * s_edge;
            j = boundary_search(j, self.step, 0.0, 1.0, |j| self.inside(Jsh::new(j, s, h)));
            row[i] = j;
        }
        row[0] = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn small_config() -> GamutConfig {
        GamutConfig {
            cache_dir: None,
            resolution_j: 16,
            resolution_s: 8,
            resolution_h: 25,
            edge_samples: 32,
            search_step: 0.005,
        }
    }

    fn sample(h: f32, s: f32) -> HueSample {
        HueSample { h, j: 0.5, s }
    }

    #[test]
    fn test_boundary_search_from_inside() {
        let x = boundary_search(0.0, 0.1, 0.0, 1.0, |x| x < 0.33);
        assert!((x - 0.35).abs() < EPSILON);
    }

    #[test]
    fn test_boundary_search_from_outside() {
        let x = boundary_search(0.9, 0.1, 0.0, 1.0, |x| x < 0.33);
        assert!((x - 0.33).abs() <= 0.05 + EPSILON);
        assert!(x > 0.25);
    }

    #[test]
    fn test_boundary_search_hits_bounds() {
        assert_eq!(boundary_search(0.5, 0.1, 0.0, 0.8, |_| true), 0.8);
        assert_eq!(boundary_search(0.5, 0.1, 0.2, 0.8, |_| false), 0.2);
        // Inverted bounds collapse to `lo`.
        assert_eq!(boundary_search(0.5, 0.1, 0.3, 0.1, |_| true), 0.3);
    }

    #[test]
    fn test_hue_curve_rotates_to_lowest_hue() {
        let curve = HueCurve::from_traversal(vec![
            sample(0.5, 5.0),
            sample(0.8, 8.0),
            sample(0.95, 9.5),
            sample(0.1, 1.0),
            sample(0.3, 3.0),
        ])
        .unwrap();
        assert!((curve.at(0.3).1 - 3.0).abs() < EPSILON);
        assert!((curve.at(0.4).1 - 4.0).abs() < EPSILON);
        // Across the wrap: 0.95 → 1.1 (hue 0.1 + 1).
        let (_, s) = curve.at(0.0);
        assert!((s - (9.5 + (1.0 - 9.5) / 3.0)).abs() < 1e-4);
        assert!((curve.at(1.0).1 - s).abs() < 1e-4);
    }

    #[test]
    fn test_hue_curve_drops_backtracking_samples() {
        let curve = HueCurve::from_traversal(vec![
            sample(0.1, 1.0),
            sample(0.4, 4.0),
            sample(0.35, 100.0),
            sample(0.6, 6.0),
        ])
        .unwrap();
        assert!((curve.at(0.5).1 - 5.0).abs() < EPSILON);
    }

    #[test]
    fn test_hue_curve_from_unordered() {
        let curve =
            HueCurve::from_unordered(vec![sample(0.7, 7.0), sample(0.2, 2.0), sample(0.45, 4.5)])
                .unwrap();
        assert!((curve.at(0.3).1 - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_hue_curve_needs_two_samples() {
        assert!(HueCurve::from_traversal(vec![sample(0.2, 1.0)]).is_none());
        assert!(HueCurve::from_traversal(vec![sample(f32::NAN, 1.0), sample(0.3, 1.0)]).is_none());
        assert!(HueCurve::from_unordered(Vec::new()).is_none());
    }

    #[test]
    fn test_generated_table_is_well_formed() {
        let registry = ColorRegistry::builtin();
        let config = small_config();
        for model in PerceptualModel::ALL {
            let table =
                generate_table(&registry, model, "sRGB", &config, &LocusDataset::empty()).unwrap();
            assert_eq!(table.resolution(), (16, 8, 25));
            assert!(table.s_jh().iter().all(|s| s.is_finite() && *s >= 0.0));
            assert!(table.j_sh().iter().all(|j| (0.0..=1.0).contains(j)));
            for hi in 0..25 {
                assert_eq!(table.j_sh()[hi * 8], 1.0);
                let (j, s) = (table.js_h()[hi * 2], table.js_h()[hi * 2 + 1]);
                assert!((0.0..=1.0).contains(&j) && s > 0.0, "{model} hue row {hi}");
            }
        }
    }

    #[test]
    fn test_traced_saturation_is_inside_gamut() {
        let registry = ColorRegistry::builtin();
        let config = small_config();
        let model = PerceptualModel::LightnessChroma;
        let table =
            generate_table(&registry, model, "sRGB", &config, &LocusDataset::empty()).unwrap();
        let tracer = BoundaryTracer::new(&registry, model, "sRGB", config.search_step).unwrap();

        for hi in 0..25 {
            let h = grid_value(hi, 25);
            for k in 0..16 {
                let j = grid_value(k, 16);
                let s = table.s_jh()[hi * 16 + k];
                let trial = (s - config.search_step).max(0.0);
                assert!(tracer.inside(Jsh::new(j, trial, h)), "J={j} h={h} s={s}");
            }
        }
    }

    #[test]
    fn test_darkest_cell_does_not_overstate_saturation() {
        let registry = ColorRegistry::builtin();
        let config = small_config();
        let j = 0.5 * grid_value(1, 16);

        for model in PerceptualModel::ALL {
            let table =
                generate_table(&registry, model, "sRGB", &config, &LocusDataset::empty()).unwrap();
            let tracer =
                BoundaryTracer::new(&registry, model, "sRGB", config.search_step).unwrap();

            for hi in 0..25 {
                assert_eq!(table.s_jh()[hi * 16], 0.0);
                let h = grid_value(hi, 25);
                let s = 0.98 * table.saturation_limit(j, h);
                assert!(tracer.inside(Jsh::new(j, s, h)), "{model}: J={j} h={h} s={s}");
            }
        }
    }

    #[test]
    fn test_edge_matches_primary() {
        let registry = ColorRegistry::builtin();
        let model = PerceptualModel::LightnessChroma;
        let table = generate_table(
            &registry,
            model,
            "sRGB",
            &small_config(),
            &LocusDataset::empty(),
        )
        .unwrap();
        let tracer = BoundaryTracer::new(&registry, model, "sRGB", 0.005).unwrap();

        let red = tracer.to_jsh(Vec3::X);
        let (j, s) = table.lightness_edge_js(red.h);
        assert!((j - red.j).abs() < 0.03, "edge J {j} vs red {}", red.j);
        assert!((s - red.s).abs() < 0.1 * red.s, "edge s {s} vs red {}", red.s);
    }

    #[test]
    fn test_locus_caps_saturation() {
        let registry = ColorRegistry::builtin();
        let config = small_config();
        let model = PerceptualModel::LightnessChroma;

        // A ring of weakly saturated samples around the equal-energy white.
        let conv = Converter::new(model, &registry, EQUAL_ENERGY, EQUAL_ENERGY).unwrap();
        let points = (0..36)
            .map(|i| conv.to_xyz(Jsh::new(0.6, 0.8, i as f32 / 36.0)).to_array())
            .collect();
        let locus = LocusDataset::new(points, Vec::new());

        let table = generate_table(&registry, model, "sRGB", &config, &locus).unwrap();
        for hi in 0..25 {
            assert!(table.js_h()[hi * 2 + 1] <= 0.8 + 1e-3);
        }
        assert!(table.s_jh().iter().all(|s| *s <= 0.8 + 1e-3));
    }

    #[test]
    fn test_unknown_space_fails() {
        let registry = ColorRegistry::builtin();
        let err = generate_table(
            &registry,
            PerceptualModel::Appearance,
            "NoSuchSpace",
            &small_config(),
            &LocusDataset::empty(),
        );
        assert!(matches!(err, Err(ColorError::UnknownColorSpace(_))));
    }
}
