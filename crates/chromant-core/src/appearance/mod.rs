//! Perceptual converters: XYZ ↔ Jsh (lightness, saturation, hue).
//!
//! Two models share one contract. `J` is lightness in `[0, 1]`, `s` a
//! non-negative model-dependent saturation, `h` hue in `[0, 1)` with
//! wraparound. Both work internally relative to the equal-energy white
//! `E`; a converter bakes in the adaptation from its input illuminant to
//! `E` and from `E` to its output illuminant.
//!
//! Converters are immutable after construction and safe to share across
//! worker threads.

pub mod cam16;
pub mod lab;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color_management::ColorRegistry;
use crate::error::{ColorError, ColorResult};

pub use cam16::{Cam16Converter, Surround, ViewingConditions};
pub use lab::LabConverter;

/// A color in perceptual coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Jsh {
    pub j: f32,
    pub s: f32,
    pub h: f32,
}

impl Jsh {
    pub const fn new(j: f32, s: f32, h: f32) -> Self {
        Self { j, s, h }
    }
}

impl From<Jsh> for Vec3 {
    fn from(c: Jsh) -> Self {
        Vec3::new(c.j, c.s, c.h)
    }
}

impl From<Vec3> for Jsh {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Which perceptual model a converter or gamut table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerceptualModel {
    /// CIELAB-derived lightness/chroma model.
    LightnessChroma,
    /// CAM16 color appearance model.
    Appearance,
}

impl PerceptualModel {
    pub const ALL: [Self; 2] = [Self::LightnessChroma, Self::Appearance];

    /// Stable name, used in cache keys and file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::LightnessChroma => "Lab",
            Self::Appearance => "CAM16",
        }
    }

    /// Parse a model name (case-insensitive).
    pub fn from_name(name: &str) -> ColorResult<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| ColorError::UnknownModel(name.to_string()))
    }
}

impl fmt::Display for PerceptualModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// XYZ ↔ Jsh transform for one (model, input white, output white) triple.
#[derive(Debug, Clone)]
pub enum Converter {
    Lab(LabConverter),
    Cam16(Cam16Converter),
}

impl Converter {
    /// Build a converter reading XYZ relative to `illum_in` and writing XYZ
    /// relative to `illum_out`. The appearance model uses default
    /// [`ViewingConditions`].
    pub fn new(
        model: PerceptualModel,
        registry: &ColorRegistry,
        illum_in: &str,
        illum_out: &str,
    ) -> ColorResult<Self> {
        Ok(match model {
            PerceptualModel::LightnessChroma => {
                Self::Lab(LabConverter::new(registry, illum_in, illum_out)?)
            }
            PerceptualModel::Appearance => Self::Cam16(Cam16Converter::new(
                registry,
                illum_in,
                illum_out,
                ViewingConditions::default(),
            )?),
        })
    }

    pub fn model(&self) -> PerceptualModel {
        match self {
            Self::Lab(_) => PerceptualModel::LightnessChroma,
            Self::Cam16(_) => PerceptualModel::Appearance,
        }
    }

    #[inline]
    pub fn to_jsh(&self, xyz: Vec3) -> Jsh {
        match self {
            Self::Lab(c) => c.to_jsh(xyz),
            Self::Cam16(c) => c.to_jsh(xyz),
        }
    }

    #[inline]
    pub fn to_xyz(&self, jsh: Jsh) -> Vec3 {
        match self {
            Self::Lab(c) => c.to_xyz(jsh),
            Self::Cam16(c) => c.to_xyz(jsh),
        }
    }
}

/// Normalize an angle in turns to `[0, 1)`.
#[inline]
pub(crate) fn wrap_hue(h: f64) -> f64 {
    let h = h.rem_euclid(1.0);
    if h >= 1.0 { 0.0 } else { h }
}
