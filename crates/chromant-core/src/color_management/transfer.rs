//! Gamma laws: the transfer functions of device RGB color spaces.
//!
//! Every built-in space encodes linear light with the same parametric
//! family, a linear toe joined to an offset power segment:
//!
//! ```text
//! encode: x <  transition → slope × x
//!         x >= transition → (1 + offset) × x^exponent − offset
//!
//! decode: y <  slope × transition → y / slope
//!         y >= slope × transition → ((y + offset) / (1 + offset))^(1 / exponent)
//! ```
//!
//! The "simple" variant drops the toe and the offset: `encode(x) = x^exponent`.
//! Negative inputs are mirrored through the origin.

use serde::{Deserialize, Serialize};

/// A transfer function that converts between linear and non-linear encodings.
pub trait TransferFunction: Send + Sync {
    /// Convert from non-linear (encoded) to linear light.
    fn to_linear(&self, encoded: f32) -> f32;

    /// Convert from linear light to non-linear (encoded).
    fn to_encoded(&self, linear: f32) -> f32;
}

/// Parameters of a gamma law.
///
/// Stored in f64 so that table endpoints come out exact, e.g. `encode(1) == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaLaw {
    /// Offset of the power segment.
    pub offset: f64,
    /// Exponent of the power segment in the encoding direction (`1/2.4` for sRGB).
    pub exponent: f64,
    /// Linear-light threshold below which the linear toe applies.
    pub transition: f64,
    /// Slope of the linear toe.
    pub slope: f64,
    /// Pure power law: no toe, no offset.
    pub simple: bool,
}

/// Hashable identity of a [`GammaLaw`], used to share tables between spaces.
pub(crate) type GammaKey = (u64, u64, u64, u64, bool);

impl GammaLaw {
    /// sRGB (IEC 61966-2-1).
    pub const SRGB: Self = Self {
        offset: 0.055,
        exponent: 1.0 / 2.4,
        transition: 0.003_130_8,
        slope: 12.92,
        simple: false,
    };

    /// ITU-R BT.709 / BT.2020 camera curve.
    pub const REC709: Self = Self {
        offset: 0.099,
        exponent: 0.45,
        transition: 0.018,
        slope: 4.5,
        simple: false,
    };

    /// ROMM / ProPhoto RGB.
    pub const PROPHOTO: Self = Self {
        offset: 0.0,
        exponent: 1.0 / 1.8,
        transition: 1.0 / 512.0,
        slope: 16.0,
        simple: false,
    };

    /// Identity.
    pub const LINEAR: Self = Self::power(1.0);

    /// A pure power law `x^exponent`.
    pub const fn power(exponent: f64) -> Self {
        Self {
            offset: 0.0,
            exponent,
            transition: 0.0,
            slope: 0.0,
            simple: true,
        }
    }

    /// Linear light to encoded value.
    pub fn encode(&self, x: f64) -> f64 {
        if x < 0.0 {
            return -self.encode(-x);
        }
        if self.simple {
            x.powf(self.exponent)
        } else if x < self.transition {
            self.slope * x
        } else {
            (1.0 + self.offset) * x.powf(self.exponent) - self.offset
        }
    }

    /// Encoded value to linear light.
    pub fn decode(&self, y: f64) -> f64 {
        if y < 0.0 {
            return -self.decode(-y);
        }
        if self.simple {
            y.powf(1.0 / self.exponent)
        } else if self.slope > 0.0 && y < self.slope * self.transition {
            y / self.slope
        } else {
            ((y + self.offset) / (1.0 + self.offset)).powf(1.0 / self.exponent)
        }
    }

    pub(crate) fn cache_key(&self) -> GammaKey {
        (
            self.offset.to_bits(),
            self.exponent.to_bits(),
            self.transition.to_bits(),
            self.slope.to_bits(),
            self.simple,
        )
    }
}

impl TransferFunction for GammaLaw {
    fn to_linear(&self, encoded: f32) -> f32 {
        self.decode(encoded as f64) as f32
    }

    fn to_encoded(&self, linear: f32) -> f32 {
        self.encode(linear as f64) as f32
    }
}
