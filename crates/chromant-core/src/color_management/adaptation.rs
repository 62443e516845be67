//! Von Kries-style chromatic adaptation in the Bradford cone space.
//!
//! Both white points are taken into cone-response space, a diagonal scale
//! is built from the per-channel ratio destination/source, and the scale is
//! sandwiched between the cone matrix and its inverse:
//!
//! ```text
//! CAT = M_INV × diag(M × white_out / M × white_in) × M
//! ```
//!
//! # Reference
//! - Lindbloom, Bruce J., Bradford chromatic adaptation

/// Bradford cone response matrix.
const M: [[f64; 3]; 3] = [
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
];

const M_INV: [[f64; 3]; 3] = [
    [0.9869929055, -0.1470542564, 0.1599626517],
    [0.4323052697, 0.5183602715, 0.0492912282],
    [-0.0085286646, 0.0400428217, 0.9684866958],
];

/// Row-major adaptation matrix taking XYZ relative to `white_in` to XYZ
/// relative to `white_out`.
///
/// Returns `None` when a source cone response is zero (or the ratio is not
/// finite), which would otherwise divide by zero.
pub fn adaptation_matrix(white_in: [f64; 3], white_out: [f64; 3]) -> Option<[[f64; 3]; 3]> {
    let src_cone = mat3_vec3(M, white_in);
    let dst_cone = mat3_vec3(M, white_out);

    let mut scale = [0.0; 3];
    for c in 0..3 {
        if src_cone[c] == 0.0 {
            return None;
        }
        scale[c] = dst_cone[c] / src_cone[c];
        if !scale[c].is_finite() {
            return None;
        }
    }

    Some(compose_bradford(M_INV, scale, M))
}

fn mat3_vec3(m: [[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Compute M_INV * diag(s) * M in a single pass.
fn compose_bradford(m_inv: [[f64; 3]; 3], s: [f64; 3], m: [[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let sm = [
        [s[0] * m[0][0], s[0] * m[0][1], s[0] * m[0][2]],
        [s[1] * m[1][0], s[1] * m[1][1], s[1] * m[1][2]],
        [s[2] * m[2][0], s[2] * m[2][1], s[2] * m[2][2]],
    ];
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = m_inv[i][0] * sm[0][j] + m_inv[i][1] * sm[1][j] + m_inv[i][2] * sm[2][j];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;
    const D65: [f64; 3] = [0.95047, 1.0, 1.08883];
    const D50: [f64; 3] = [0.96422, 1.0, 0.82521];

    #[test]
    fn test_same_white_is_identity() {
        let m = adaptation_matrix(D65, D65).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((m[i][j] - expected).abs() < EPSILON, "[{i}][{j}] = {}", m[i][j]);
            }
        }
    }

    #[test]
    fn test_source_white_maps_to_destination_white() {
        let m = adaptation_matrix(D65, D50).unwrap();
        let out = mat3_vec3(m, D65);
        for c in 0..3 {
            assert!((out[c] - D50[c]).abs() < EPSILON, "channel {c}: {} vs {}", out[c], D50[c]);
        }
    }

    #[test]
    fn test_known_d65_to_d50_coefficients() {
        // Lindbloom's published Bradford D65→D50 matrix.
        let m = adaptation_matrix(D65, D50).unwrap();
        assert!((m[0][0] - 1.0478112).abs() < 1e-4);
        assert!((m[1][1] - 0.9904844).abs() < 1e-4);
        assert!((m[2][2] - 0.7521316).abs() < 1e-4);
    }

    #[test]
    fn test_black_source_white_is_rejected() {
        assert!(adaptation_matrix([0.0, 0.0, 0.0], D50).is_none());
    }
}
