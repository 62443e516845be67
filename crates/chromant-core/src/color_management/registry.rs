//! The color-space registry: the explicit context object every converter and
//! the gamut engine are built from.
//!
//! Illuminants and color spaces are fixed at construction, so every cache of
//! derived data (gamma tables, adaptation matrices, the Lab compression table)
//! is a fixed set of `OnceLock` slots sized up front. The first caller of a
//! slot builds it; later reads take no lock.

use std::sync::{Arc, OnceLock};

use glam::DVec3;

use crate::appearance::lab::compression_table;
use crate::color_management::adaptation::adaptation_matrix;
use crate::color_management::color_space::{
    ColorMatrix, ColorSpaceDescriptor, builtin_color_spaces,
};
use crate::color_management::illuminant::{Illuminant, builtin_illuminants};
use crate::color_management::transfer::GammaLaw;
use crate::error::{ColorError, ColorResult};
use crate::transform::SampledFunction;

/// Samples per gamma table.
const GAMMA_TABLE_SIZE: usize = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GammaDirection {
    Encode,
    Decode,
}

/// Both gamma tables of one distinct law, shared by every space using it.
#[derive(Debug)]
struct GammaSlot {
    law: GammaLaw,
    encode: OnceLock<Arc<SampledFunction>>,
    decode: OnceLock<Arc<SampledFunction>>,
}

impl GammaSlot {
    fn new(law: GammaLaw) -> Self {
        Self {
            law,
            encode: OnceLock::new(),
            decode: OnceLock::new(),
        }
    }

    fn table(&self, direction: GammaDirection) -> Arc<SampledFunction> {
        let slot = match direction {
            GammaDirection::Encode => &self.encode,
            GammaDirection::Decode => &self.decode,
        };
        let law = self.law;
        slot.get_or_init(|| {
            tracing::debug!(?law, ?direction, "building gamma table");
            let table = match direction {
                GammaDirection::Encode => {
                    SampledFunction::new(0.0, 1.0, GAMMA_TABLE_SIZE, move |x| law.encode(x))
                }
                GammaDirection::Decode => {
                    SampledFunction::new(0.0, 1.0, GAMMA_TABLE_SIZE, move |x| law.decode(x))
                }
            };
            Arc::new(table)
        })
        .clone()
    }
}

/// Immutable table of color spaces and illuminants plus derived-data caches.
///
/// Build one at startup and share it by `Arc`.
#[derive(Debug)]
pub struct ColorRegistry {
    illuminants: Vec<Illuminant>,
    spaces: Vec<ColorSpaceDescriptor>,
    /// Entry `i` is the index into `gamma_slots` of `spaces[i]`.
    gamma_index: Vec<usize>,
    gamma_slots: Vec<GammaSlot>,
    /// Row-major `(from, to)` grid over `illuminants`. `None` marks a
    /// degenerate pair.
    cats: Vec<OnceLock<Option<ColorMatrix>>>,
    lab_compression: OnceLock<Arc<SampledFunction>>,
}

impl Default for ColorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ColorRegistry {
    /// Registry with the built-in illuminants and color spaces.
    pub fn builtin() -> Self {
        Self::new(builtin_illuminants(), builtin_color_spaces())
    }

    pub fn new(illuminants: Vec<Illuminant>, spaces: Vec<ColorSpaceDescriptor>) -> Self {
        let mut gamma_slots: Vec<GammaSlot> = Vec::new();
        let gamma_index = spaces
            .iter()
            .map(|cs| {
                let key = cs.gamma.cache_key();
                match gamma_slots.iter().position(|slot| slot.law.cache_key() == key) {
                    Some(i) => i,
                    None => {
                        gamma_slots.push(GammaSlot::new(cs.gamma));
                        gamma_slots.len() - 1
                    }
                }
            })
            .collect();
        let cats = (0..illuminants.len() * illuminants.len())
            .map(|_| OnceLock::new())
            .collect();

        Self {
            illuminants,
            spaces,
            gamma_index,
            gamma_slots,
            cats,
            lab_compression: OnceLock::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Illuminants
    // -----------------------------------------------------------------------

    fn illuminant_index(&self, name: &str) -> ColorResult<usize> {
        self.illuminants
            .iter()
            .position(|ill| ill.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ColorError::UnknownIlluminant(name.to_string()))
    }

    /// XYZ of a named white point, `Y = 1`.
    pub fn illuminant_xyz(&self, name: &str) -> ColorResult<DVec3> {
        let i = self.illuminant_index(name)?;
        Ok(DVec3::from_array(self.illuminants[i].xyz))
    }

    pub fn illuminant_names(&self) -> Vec<&str> {
        self.illuminants.iter().map(|ill| ill.name.as_str()).collect()
    }

    /// Adaptation matrix taking XYZ relative to `white_in` to XYZ relative to
    /// `white_out`.
    pub fn cat(&self, white_in: &str, white_out: &str) -> ColorResult<ColorMatrix> {
        let from = self.illuminant_index(white_in)?;
        let to = self.illuminant_index(white_out)?;
        let slot = &self.cats[from * self.illuminants.len() + to];
        let m = *slot.get_or_init(|| {
            adaptation_matrix(self.illuminants[from].xyz, self.illuminants[to].xyz)
                .map(ColorMatrix::from_rows)
        });
        m.ok_or_else(|| ColorError::DegenerateWhitePoint {
            from: white_in.to_string(),
            to: white_out.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // Color spaces
    // -----------------------------------------------------------------------

    fn space_index(&self, key: &str) -> ColorResult<usize> {
        self.spaces
            .iter()
            .position(|cs| cs.key == key)
            .ok_or_else(|| ColorError::UnknownColorSpace(key.to_string()))
    }

    pub fn color_space(&self, key: &str) -> ColorResult<&ColorSpaceDescriptor> {
        Ok(&self.spaces[self.space_index(key)?])
    }

    /// All descriptors, hidden ones included, in registry order.
    pub fn color_spaces(&self) -> &[ColorSpaceDescriptor] {
        &self.spaces
    }

    /// Display names for user-facing lists. Hidden spaces are excluded.
    pub fn color_space_names(&self) -> Vec<&str> {
        self.spaces
            .iter()
            .filter(|cs| !cs.hidden)
            .map(|cs| cs.name.as_str())
            .collect()
    }

    pub fn key_for_name(&self, name: &str) -> Option<&str> {
        self.spaces
            .iter()
            .find(|cs| cs.name == name)
            .map(|cs| cs.key.as_str())
    }

    pub fn name_for_key(&self, key: &str) -> Option<&str> {
        self.spaces
            .iter()
            .find(|cs| cs.key == key)
            .map(|cs| cs.name.as_str())
    }

    /// Linear RGB → XYZ (relative to the space's illuminant).
    pub fn matrix_cs_to_xyz(&self, key: &str) -> ColorResult<ColorMatrix> {
        Ok(self.color_space(key)?.matrix())
    }

    /// XYZ → linear RGB, derived by inverting the descriptor's matrix.
    pub fn matrix_xyz_to_cs(&self, key: &str) -> ColorResult<ColorMatrix> {
        self.matrix_cs_to_xyz(key)?
            .inverse()
            .ok_or_else(|| ColorError::SingularMatrix(key.to_string()))
    }

    /// Encoding gamma table (linear → encoded) for a color space.
    pub fn gamma(&self, key: &str) -> ColorResult<Arc<SampledFunction>> {
        Ok(self.gamma_slot(key)?.table(GammaDirection::Encode))
    }

    /// Decoding gamma table (encoded → linear) for a color space.
    pub fn inverse_gamma(&self, key: &str) -> ColorResult<Arc<SampledFunction>> {
        Ok(self.gamma_slot(key)?.table(GammaDirection::Decode))
    }

    fn gamma_slot(&self, key: &str) -> ColorResult<&GammaSlot> {
        let i = self.space_index(key)?;
        Ok(&self.gamma_slots[self.gamma_index[i]])
    }

    /// CIELAB cube-root compression table, shared by every Lab-style
    /// converter built from this registry.
    pub fn lab_compression(&self) -> Arc<SampledFunction> {
        self.lab_compression
            .get_or_init(|| {
                tracing::debug!("building Lab compression table");
                Arc::new(compression_table())
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    #[test]
    fn test_d65_and_e_resolve_to_known_xyz() {
        let reg = ColorRegistry::builtin();
        let d65 = reg.illuminant_xyz("D65").unwrap();
        assert!((d65 - DVec3::new(0.95047, 1.0, 1.08883)).abs().max_element() < EPSILON);
        assert_eq!(reg.illuminant_xyz("E").unwrap(), DVec3::ONE);
    }

    #[test]
    fn test_unknown_keys_are_not_found() {
        let reg = ColorRegistry::builtin();
        assert!(matches!(
            reg.illuminant_xyz("F11"),
            Err(ColorError::UnknownIlluminant(_))
        ));
        assert!(matches!(
            reg.matrix_xyz_to_cs("NoSuchSpace"),
            Err(ColorError::UnknownColorSpace(_))
        ));
        assert!(reg.gamma("NoSuchSpace").is_err());
    }

    #[test]
    fn test_cat_roundtrip_is_identity_for_all_pairs() {
        let reg = ColorRegistry::builtin();
        let names: Vec<String> = reg.illuminant_names().iter().map(|s| s.to_string()).collect();
        for a in &names {
            for b in &names {
                let ab = reg.cat(a, b).unwrap();
                let ba = reg.cat(b, a).unwrap();
                let id = ba * ab;
                assert!(
                    id.0.abs_diff_eq(glam::DMat3::IDENTITY, EPSILON),
                    "{a} -> {b} -> {a}: {:?}",
                    id
                );
            }
        }
    }

    #[test]
    fn test_degenerate_white_point_is_an_error() {
        let mut illuminants = builtin_illuminants();
        illuminants.push(Illuminant::new("Black", [0.0, 0.0, 0.0]));
        let reg = ColorRegistry::new(illuminants, builtin_color_spaces());
        assert!(matches!(
            reg.cat("Black", "D65"),
            Err(ColorError::DegenerateWhitePoint { .. })
        ));
    }

    #[test]
    fn test_singular_color_space_matrix_is_reported() {
        let singular = ColorSpaceDescriptor::new(
            "Flat",
            "Flat",
            [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [0.0, 0.0, 1.0]],
            "D65",
            GammaLaw::LINEAR,
        );
        let reg = ColorRegistry::new(builtin_illuminants(), vec![singular]);
        assert!(reg.matrix_cs_to_xyz("Flat").is_ok());
        assert!(matches!(
            reg.matrix_xyz_to_cs("Flat"),
            Err(ColorError::SingularMatrix(_))
        ));
    }

    #[test]
    fn test_hidden_spaces_are_not_listed() {
        let reg = ColorRegistry::builtin();
        let names = reg.color_space_names();
        assert!(names.contains(&"sRGB"));
        assert!(names.contains(&"ProPhoto RGB"));
        assert!(!names.contains(&"XYZ"));
        assert!(reg.color_space("XYZ").is_ok());
    }

    #[test]
    fn test_name_key_roundtrip() {
        let reg = ColorRegistry::builtin();
        for name in reg.color_space_names() {
            let key = reg.key_for_name(name).unwrap();
            assert_eq!(reg.name_for_key(key), Some(name));
        }
        assert_eq!(reg.key_for_name("Adobe RGB (1998)"), Some("AdobeRGB"));
    }

    #[test]
    fn test_gamma_roundtrip_for_every_space() {
        let reg = ColorRegistry::builtin();
        for cs in reg.color_spaces() {
            let gamma = reg.gamma(&cs.key).unwrap();
            let inverse = reg.inverse_gamma(&cs.key).unwrap();
            for i in 0..=64 {
                let x = i as f32 / 64.0;
                let back = inverse.eval(gamma.eval(x));
                assert!((back - x).abs() < 1e-4, "{}: {x} -> {back}", cs.key);
            }
        }
    }

    #[test]
    fn test_spaces_sharing_a_law_share_one_table() {
        let reg = ColorRegistry::builtin();
        let srgb = reg.gamma("sRGB").unwrap();
        let p3 = reg.gamma("DisplayP3").unwrap();
        assert!(Arc::ptr_eq(&srgb, &p3));
        let adobe = reg.inverse_gamma("AdobeRGB").unwrap();
        let wide = reg.inverse_gamma("WideGamut").unwrap();
        assert!(Arc::ptr_eq(&adobe, &wide));
        assert!(!Arc::ptr_eq(&srgb, &reg.gamma("Rec2020").unwrap()));
    }

    #[test]
    fn test_srgb_style_law_endpoints_and_continuity() {
        let law = GammaLaw {
            offset: 0.055,
            exponent: 0.42,
            transition: 0.003_130_8,
            slope: 12.92,
            simple: false,
        };
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let space = ColorSpaceDescriptor::new("Test", "Test", identity, "D65", law);
        let reg = ColorRegistry::new(builtin_illuminants(), vec![space]);
        let gamma = reg.gamma("Test").unwrap();
        assert_eq!(gamma.eval(0.0), 0.0);
        assert_eq!(gamma.eval(1.0), 1.0);

        let t = 0.003_130_8_f64;
        let below = law.slope * t;
        let above = (1.0 + law.offset) * t.powf(law.exponent) - law.offset;
        assert!((below - above).abs() < 2e-3, "jump at transition: {below} vs {above}");
    }

    #[test]
    fn test_cat_is_stable_across_calls() {
        let reg = ColorRegistry::builtin();
        let first = reg.cat("d65", "D50").unwrap();
        assert_eq!(reg.cat("D65", "d50").unwrap(), first);
        let same = reg.cat("D65", "D65").unwrap();
        assert!(same.0.abs_diff_eq(ColorMatrix::identity().0, EPSILON));
    }

    #[test]
    fn test_concurrent_first_use_builds_one_table() {
        let reg = ColorRegistry::builtin();
        let tables: Vec<Arc<SampledFunction>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let reg = &reg;
                    let key = if i % 2 == 0 { "sRGB" } else { "DisplayP3" };
                    scope.spawn(move || reg.gamma(key).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for table in &tables {
            assert!(Arc::ptr_eq(table, &tables[0]));
        }
    }
}
