//! Reference white points.

/// Name of the equal-energy white used as the converters' working reference.
pub const EQUAL_ENERGY: &str = "E";

/// A named white point as XYZ tristimulus values with `Y = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Illuminant {
    pub name: String,
    pub xyz: [f64; 3],
}

impl Illuminant {
    pub fn new(name: impl Into<String>, xyz: [f64; 3]) -> Self {
        Self {
            name: name.into(),
            xyz,
        }
    }
}

/// CIE standard illuminants (2° observer), plus the ACES white.
pub fn builtin_illuminants() -> Vec<Illuminant> {
    vec![
        Illuminant::new("A", [1.098_50, 1.0, 0.355_85]),
        Illuminant::new("B", [0.990_72, 1.0, 0.852_23]),
        Illuminant::new("C", [0.980_74, 1.0, 1.182_32]),
        Illuminant::new("D50", [0.964_22, 1.0, 0.825_21]),
        Illuminant::new("D55", [0.956_82, 1.0, 0.921_49]),
        Illuminant::new("D60", [0.952_65, 1.0, 1.008_83]),
        Illuminant::new("D65", [0.950_47, 1.0, 1.088_83]),
        Illuminant::new("D75", [0.949_72, 1.0, 1.226_38]),
        Illuminant::new(EQUAL_ENERGY, [1.0, 1.0, 1.0]),
    ]
}
