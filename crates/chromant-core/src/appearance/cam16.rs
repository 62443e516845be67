//! CAM16 color appearance model behind the Jsh interface.
//!
//! The model runs in f64 on XYZ scaled to `Y = 100`, with the equal-energy
//! white as its adopted white. Output is `J/100`, `s/100`, `h/360`.
//!
//! Reference: Li et al., "Comprehensive color solutions: CAM16, CAT16, and
//! CAM16-UCS", Color Research & Application 42 (2017).

use std::f64::consts::PI;

use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::appearance::{Jsh, wrap_hue};
use crate::color_management::{ColorMatrix, ColorRegistry, EQUAL_ENERGY};
use crate::error::{ColorError, ColorResult};

/// CAT16 cone-response matrix (row-major).
const M16: [[f64; 3]; 3] = [
    [0.401288, 0.650173, -0.051461],
    [-0.250268, 1.204414, 0.045854],
    [-0.002079, 0.048952, 0.953127],
];

/// Brightness below which saturation is reported as zero.
const BRIGHTNESS_FLOOR: f64 = 1e-6;

/// Surround of the viewing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Surround {
    #[default]
    Average,
    Dim,
    Dark,
}

impl Surround {
    /// `(F, c, Nc)`.
    fn factors(self) -> (f64, f64, f64) {
        match self {
            Self::Average => (1.0, 0.69, 1.0),
            Self::Dim => (0.9, 0.59, 0.9),
            Self::Dark => (0.8, 0.525, 0.8),
        }
    }
}

/// Viewing conditions for the appearance model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewingConditions {
    /// Adapting field luminance `L_A` in cd/m².
    pub adapting_luminance: f64,
    /// Background relative luminance `Y_b` (white = 100).
    pub background_luminance: f64,
    pub surround: Surround,
    /// Full adaptation (`D = 1`) when set.
    pub discounting: bool,
}

impl Default for ViewingConditions {
    fn default() -> Self {
        Self {
            adapting_luminance: 64.0 / PI * 0.2,
            background_luminance: 20.0,
            surround: Surround::Average,
            discounting: true,
        }
    }
}

/// XYZ ↔ Jsh through CAM16.
#[derive(Debug, Clone)]
pub struct Cam16Converter {
    /// Input white → `E`, then the CAT16 cone space.
    to_cone: ColorMatrix,
    /// CAT16 cone space → XYZ, then `E` → output white.
    from_cone: ColorMatrix,
    /// Per-channel degree-of-adaptation gains.
    d_rgb: DVec3,
    f_l: f64,
    f_l_4: f64,
    n: f64,
    z: f64,
    n_bb: f64,
    n_cb: f64,
    nc: f64,
    c: f64,
    a_w: f64,
}

impl Cam16Converter {
    pub fn new(
        registry: &ColorRegistry,
        illum_in: &str,
        illum_out: &str,
        viewing: ViewingConditions,
    ) -> ColorResult<Self> {
        let m16 = ColorMatrix::from_rows(M16);
        let m16_inv = m16
            .inverse()
            .ok_or_else(|| ColorError::SingularMatrix("CAT16".to_string()))?;
        let to_cone = m16 * registry.cat(illum_in, EQUAL_ENERGY)?;
        let from_cone = registry.cat(EQUAL_ENERGY, illum_out)? * m16_inv;

        let (f, c, nc) = viewing.surround.factors();
        let la = viewing.adapting_luminance.max(1e-6);

        let white = registry.illuminant_xyz(EQUAL_ENERGY)? * 100.0;
        let rgb_w = m16.apply(white);

        let d = if viewing.discounting {
            1.0
        } else {
            (f * (1.0 - (1.0 / 3.6) * ((-la - 42.0) / 92.0).exp())).clamp(0.0, 1.0)
        };
        let d_rgb = DVec3::splat(d * white.y) / rgb_w + DVec3::splat(1.0 - d);

        let k = 1.0 / (5.0 * la + 1.0);
        let k4 = k.powi(4);
        let f_l = 0.2 * k4 * (5.0 * la) + 0.1 * (1.0 - k4).powi(2) * (5.0 * la).cbrt();

        let n = viewing.background_luminance.max(1e-6) / white.y;
        let z = 1.48 + n.sqrt();
        let n_bb = 0.725 * (1.0 / n).powf(0.2);

        let adapted_w = (rgb_w * d_rgb).to_array().map(|x| adapt(x, f_l));
        let a_w = achromatic(adapted_w, n_bb);

        Ok(Self {
            to_cone,
            from_cone,
            d_rgb,
            f_l,
            f_l_4: f_l.powf(0.25),
            n,
            z,
            n_bb,
            n_cb: n_bb,
            nc,
            c,
            a_w,
        })
    }

    pub fn to_jsh(&self, xyz: Vec3) -> Jsh {
        let rgb = self.to_cone.apply(xyz.as_dvec3() * 100.0) * self.d_rgb;
        let [ra, ga, ba] = rgb.to_array().map(|x| adapt(x, self.f_l));

        let a = ra - 12.0 * ga / 11.0 + ba / 11.0;
        let b = (ra + ga - 2.0 * ba) / 9.0;
        let hue_rad = b.atan2(a);
        let h = wrap_hue(hue_rad / (2.0 * PI));

        let big_a = achromatic([ra, ga, ba], self.n_bb);
        let j = 100.0 * (big_a / self.a_w).powf(self.c * self.z);

        let e_t = 0.25 * ((hue_rad + 2.0).cos() + 3.8);
        let denom = ra + ga + 21.0 / 20.0 * ba;
        let t = if denom.abs() > f64::EPSILON {
            (50000.0 / 13.0 * self.nc * self.n_cb * e_t * a.hypot(b)) / denom
        } else {
            0.0
        };
        let chroma = t.max(0.0).powf(0.9) * (j / 100.0).sqrt() * self.chroma_base();
        let colorfulness = chroma * self.f_l_4;
        let brightness = self.brightness(j);

        // Black: both M and Q vanish.
        let s = if brightness > BRIGHTNESS_FLOOR {
            100.0 * (colorfulness / brightness).sqrt()
        } else {
            0.0
        };

        Jsh::new((j / 100.0) as f32, (s / 100.0) as f32, h as f32)
    }

    pub fn to_xyz(&self, jsh: Jsh) -> Vec3 {
        let j = (jsh.j as f64 * 100.0).max(0.0);
        let s = (jsh.s as f64 * 100.0).max(0.0);
        let hue_rad = jsh.h as f64 * 2.0 * PI;

        let colorfulness = (s / 100.0).powi(2) * self.brightness(j);
        let chroma = colorfulness / self.f_l_4;
        let scale = (j / 100.0).sqrt() * self.chroma_base();
        let t = if scale > f64::EPSILON {
            (chroma / scale).powf(1.0 / 0.9)
        } else {
            0.0
        };

        let big_a = self.a_w * (j / 100.0).powf(1.0 / (self.c * self.z));
        let e_t = 0.25 * ((hue_rad + 2.0).cos() + 3.8);
        let p1 = e_t * 50000.0 / 13.0 * self.nc * self.n_cb;
        let p2 = big_a / self.n_bb + 0.305;

        let (sin, cos) = hue_rad.sin_cos();
        let gamma = 23.0 * t * p2 / (23.0 * p1 + 11.0 * t * cos + 108.0 * t * sin);
        let a = gamma * cos;
        let b = gamma * sin;

        let ra = (460.0 * p2 + 451.0 * a + 288.0 * b) / 1403.0;
        let ga = (460.0 * p2 - 891.0 * a - 261.0 * b) / 1403.0;
        let ba = (460.0 * p2 - 220.0 * a - 6300.0 * b) / 1403.0;

        let rgb_c = DVec3::new(
            unadapt(ra, self.f_l),
            unadapt(ga, self.f_l),
            unadapt(ba, self.f_l),
        );
        let xyz = self.from_cone.apply(rgb_c / self.d_rgb) / 100.0;
        xyz.as_vec3()
    }

    /// `(1.64 − 0.29^n)^0.73`
    #[inline]
    fn chroma_base(&self) -> f64 {
        (1.64 - 0.29f64.powf(self.n)).powf(0.73)
    }

    /// Brightness `Q` for lightness `J` on the 0..100 scale.
    #[inline]
    fn brightness(&self, j: f64) -> f64 {
        4.0 / self.c * (j / 100.0).sqrt() * (self.a_w + 4.0) * self.f_l_4
    }
}

/// Post-adaptation nonlinear compression.
#[inline]
fn adapt(x: f64, f_l: f64) -> f64 {
    let p = (f_l * x.abs() / 100.0).powf(0.42);
    400.0 * x.signum() * p / (p + 27.13) + 0.1
}

#[inline]
fn unadapt(x: f64, f_l: f64) -> f64 {
    let v = x - 0.1;
    let mag = v.abs().min(399.999);
    v.signum() * 100.0 / f_l * (27.13 * mag / (400.0 - mag)).powf(1.0 / 0.42)
}

/// Achromatic response `A`, clamped at zero.
#[inline]
fn achromatic([ra, ga, ba]: [f64; 3], n_bb: f64) -> f64 {
    ((2.0 * ra + ga + ba / 20.0 - 0.305) * n_bb).max(0.0)
}
