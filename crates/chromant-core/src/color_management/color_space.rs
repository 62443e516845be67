//! Color space descriptors and 3x3 matrix transforms.

use std::ops::Mul;

use glam::{DMat3, DVec3, Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::color_management::transfer::GammaLaw;

/// A 3x3 color matrix for linear color space conversions.
///
/// Held in f64; converters take an f32 copy via [`ColorMatrix::to_mat3`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub DMat3);

impl ColorMatrix {
    /// Returns the identity matrix (no-op transform).
    pub fn identity() -> Self {
        Self(DMat3::IDENTITY)
    }

    /// Build from row-major coefficients, the way matrices are published.
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self(DMat3::from_cols_array_2d(&rows).transpose())
    }

    /// Row-major coefficients.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        self.0.transpose().to_cols_array_2d()
    }

    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    /// Closed-form inverse. `None` when the determinant is exactly zero.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some(Self(self.0.inverse()))
    }

    /// Apply this matrix to a color triplet.
    pub fn apply(&self, v: DVec3) -> DVec3 {
        self.0 * v
    }

    /// f32 copy for per-pixel use.
    pub fn to_mat3(&self) -> Mat3 {
        Mat3::from_cols_array(&self.0.to_cols_array().map(|v| v as f32))
    }

    /// Apply in f32.
    pub fn apply_f32(&self, v: Vec3) -> Vec3 {
        self.apply(v.as_dvec3()).as_vec3()
    }
}

impl Mul for ColorMatrix {
    type Output = Self;

    /// `self × rhs`: applies `rhs` first.
    fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }
}

/// An RGB color space: primaries as an RGB→XYZ matrix, its white, its gamma.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorSpaceDescriptor {
    /// Stable identifier, used in cache keys and file names.
    pub key: String,
    /// Human-readable label for UI menus.
    pub name: String,
    /// Row-major linear RGB→XYZ matrix, XYZ relative to `illuminant`.
    pub rgb_to_xyz: [[f64; 3]; 3],
    /// Key of the reference illuminant.
    pub illuminant: String,
    pub gamma: GammaLaw,
    /// Excluded from user-facing listings.
    #[serde(default)]
    pub hidden: bool,
}

impl ColorSpaceDescriptor {
    pub fn new(
        key: &str,
        name: &str,
        rgb_to_xyz: [[f64; 3]; 3],
        illuminant: &str,
        gamma: GammaLaw,
    ) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            rgb_to_xyz,
            illuminant: illuminant.to_string(),
            gamma,
            hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn matrix(&self) -> ColorMatrix {
        ColorMatrix::from_rows(self.rgb_to_xyz)
    }
}

const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412_456_4, 0.357_576_1, 0.180_437_5],
    [0.212_672_9, 0.715_152_2, 0.072_175_0],
    [0.019_333_9, 0.119_192_0, 0.950_304_1],
];

/// Adobe RGB (1998) gamma, 563/256.
const ADOBE_GAMMA: GammaLaw = GammaLaw::power(256.0 / 563.0);

/// Built-in color spaces, in menu order.
pub fn builtin_color_spaces() -> Vec<ColorSpaceDescriptor> {
    vec![
        ColorSpaceDescriptor::new("sRGB", "sRGB", SRGB_TO_XYZ, "D65", GammaLaw::SRGB),
        ColorSpaceDescriptor::new(
            "AdobeRGB",
            "Adobe RGB (1998)",
            [
                [0.576_730_9, 0.185_554_0, 0.188_185_2],
                [0.297_376_9, 0.627_349_1, 0.075_274_1],
                [0.027_034_3, 0.070_687_2, 0.991_108_5],
            ],
            "D65",
            ADOBE_GAMMA,
        ),
        ColorSpaceDescriptor::new(
            "ProPhoto",
            "ProPhoto RGB",
            [
                [0.797_674_9, 0.135_191_7, 0.031_353_4],
                [0.288_040_2, 0.711_874_1, 0.000_085_7],
                [0.0, 0.0, 0.825_210_0],
            ],
            "D50",
            GammaLaw::PROPHOTO,
        ),
        ColorSpaceDescriptor::new(
            "WideGamut",
            "Wide Gamut RGB",
            [
                [0.716_104_6, 0.100_929_6, 0.147_185_8],
                [0.258_187_4, 0.724_937_8, 0.016_874_8],
                [0.0, 0.051_781_3, 0.773_428_7],
            ],
            "D50",
            ADOBE_GAMMA,
        ),
        ColorSpaceDescriptor::new(
            "Rec2020",
            "Rec. 2020",
            [
                [0.636_958_0, 0.144_616_9, 0.168_881_0],
                [0.262_700_2, 0.677_998_1, 0.059_301_7],
                [0.0, 0.028_072_7, 1.060_985_1],
            ],
            "D65",
            GammaLaw::REC709,
        ),
        ColorSpaceDescriptor::new(
            "DisplayP3",
            "Display P3",
            [
                [0.486_570_9, 0.265_667_7, 0.198_217_3],
                [0.228_974_6, 0.691_738_5, 0.079_286_9],
                [0.0, 0.045_113_4, 1.043_944_4],
            ],
            "D65",
            GammaLaw::SRGB,
        ),
        ColorSpaceDescriptor::new(
            "ACEScg",
            "ACEScg",
            [
                [0.662_454_181_1, 0.134_004_206_5, 0.156_187_687_0],
                [0.272_228_716_8, 0.674_081_765_8, 0.053_689_517_4],
                [-0.005_574_649_5, 0.004_060_733_5, 1.010_339_100_3],
            ],
            "D60",
            GammaLaw::LINEAR,
        ),
        ColorSpaceDescriptor::new(
            "ACES2065-1",
            "ACES2065-1",
            [
                [0.952_552_395_9, 0.0, 0.000_093_678_6],
                [0.343_966_449_8, 0.728_166_096_6, -0.072_132_546_4],
                [0.0, 0.0, 1.008_825_184_4],
            ],
            "D60",
            GammaLaw::LINEAR,
        ),
        ColorSpaceDescriptor::new("LinearSRGB", "Linear sRGB", SRGB_TO_XYZ, "D65", GammaLaw::LINEAR),
        ColorSpaceDescriptor::new(
            "XYZ",
            "XYZ",
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            "E",
            GammaLaw::LINEAR,
        )
        .hidden(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_from_rows_keeps_row_major_layout() {
        let m = ColorMatrix::from_rows([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 10.0]]);
        let out = m.apply(DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(out, DVec3::new(1.0, 4.0, 7.0));
        assert_eq!(m.to_rows()[2], [7.0, 8.0, 10.0]);
    }

    #[test]
    fn test_inverse_of_singular_matrix_fails() {
        let m = ColorMatrix::from_rows([[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]]);
        assert!(m.inverse().is_none());
    }

    #[test]
    fn test_inverse_times_matrix_is_identity() {
        for cs in builtin_color_spaces() {
            let m = cs.matrix();
            let inv = m.inverse().expect("built-in matrices are invertible");
            let id = inv * m;
            assert!(
                id.0.abs_diff_eq(DMat3::IDENTITY, EPSILON),
                "{}: {:?}",
                cs.key,
                id
            );
        }
    }

    #[test]
    fn test_white_maps_to_luminance_one() {
        for cs in builtin_color_spaces() {
            let white = cs.matrix().apply(DVec3::ONE);
            assert!((white.y - 1.0).abs() < 1e-4, "{}: Y={}", cs.key, white.y);
        }
    }
}
