//! Saturation compression and lightness clipping against a gamut table.

use std::sync::Arc;

use crate::appearance::Jsh;
use crate::curves::{EndCondition, SplineCurve};
use crate::error::ColorResult;
use crate::gamut::GamutTable;

/// Maps Jsh colors into the gamut described by one table.
///
/// Saturation relative to the limit, `x = s / s_limit(J, h)`, passes
/// through unchanged up to the knee and rolls off smoothly to reach `1` at
/// `x = range`. Lightness is then clipped to `J_limit(s', h)`.
#[derive(Debug, Clone)]
pub struct GamutMapper {
    table: Arc<GamutTable>,
    knee: f32,
    rolloff: SplineCurve,
}

impl GamutMapper {
    pub const DEFAULT_KNEE: f32 = 0.8;
    pub const DEFAULT_RANGE: f32 = 1.2;

    pub fn new(table: Arc<GamutTable>) -> ColorResult<Self> {
        Self::with_knee(table, Self::DEFAULT_KNEE, Self::DEFAULT_RANGE)
    }

    /// `knee` in `[0, 1)`; `range > 1` is the relative saturation mapped to
    /// the boundary. Keep `range <= knee + 3 (1 - knee)` for a curve that
    /// never flattens early.
    pub fn with_knee(table: Arc<GamutTable>, knee: f32, range: f32) -> ColorResult<Self> {
        let knee = knee.clamp(0.0, 0.99);
        let range = range.max(1.0 + f32::EPSILON);
        let rolloff = SplineCurve::new(
            &[[knee, knee], [range, 1.0]],
            EndCondition::Slope(1.0),
            EndCondition::Slope(0.0),
            false,
        )?;
        Ok(Self {
            table,
            knee,
            rolloff,
        })
    }

    pub fn table(&self) -> &GamutTable {
        &self.table
    }

    /// Relative saturation after compression.
    pub fn compress_ratio(&self, x: f32) -> f32 {
        if x <= self.knee {
            x.max(0.0)
        } else {
            self.rolloff.evaluate(x)
        }
    }

    pub fn map(&self, jsh: Jsh) -> Jsh {
        if self.table.is_empty() {
            return jsh;
        }

        let limit = self.table.saturation_limit(jsh.j, jsh.h);
        let s = if limit > 0.0 {
            self.compress_ratio(jsh.s / limit) * limit
        } else {
            0.0
        };
        let j = jsh.j.min(self.table.lightness_limit(s, jsh.h));
        Jsh::new(j, s, jsh.h)
    }
}
