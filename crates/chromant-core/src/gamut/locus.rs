//! Chromaticity-locus dataset: the reachable-color boundary of the
//! reference space, used to cap table saturation per hue.

use std::collections::HashSet;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ColorResult;

/// Boundary samples in equal-energy-white XYZ, plus indices to ignore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocusDataset {
    pub points: Vec<[f32; 3]>,
    /// Indices into `points` of degenerate or duplicate samples.
    #[serde(default)]
    pub blacklist: Vec<usize>,
}

impl LocusDataset {
    pub fn new(points: Vec<[f32; 3]>, blacklist: Vec<usize>) -> Self {
        Self { points, blacklist }
    }

    /// No data: tables are built without an auxiliary cap.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from `(x, y)` chromaticities at luminance `y_lum`.
    pub fn from_chromaticities(xy: &[[f32; 2]], y_lum: f32) -> Self {
        let points = xy
            .iter()
            .map(|&[x, y]| {
                if y <= 0.0 {
                    [0.0, 0.0, 0.0]
                } else {
                    [x * y_lum / y, y_lum, (1.0 - x - y) * y_lum / y]
                }
            })
            .collect();
        Self::new(points, Vec::new())
    }

    pub fn from_json_file(path: &Path) -> ColorResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn is_empty(&self) -> bool {
        self.usable_points().next().is_none()
    }

    /// Finite points not on the blacklist, in dataset order.
    pub fn usable_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        let skip: HashSet<usize> = self.blacklist.iter().copied().collect();
        self.points
            .iter()
            .enumerate()
            .filter(move |(i, _)| !skip.contains(i))
            .map(|(_, p)| Vec3::from_array(*p))
            .filter(|p| p.is_finite() && *p != Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blacklist_and_degenerate_points_are_skipped() {
        let locus = LocusDataset::new(
            vec![
                [0.5, 0.4, 0.1],
                [0.1, 0.2, 0.7],
                [f32::NAN, 0.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.3, 0.6, 0.1],
            ],
            vec![1],
        );
        let points: Vec<Vec3> = locus.usable_points().collect();
        assert_eq!(points, vec![Vec3::new(0.5, 0.4, 0.1), Vec3::new(0.3, 0.6, 0.1)]);
    }

    #[test]
    fn test_empty_dataset() {
        assert!(LocusDataset::empty().is_empty());
        assert!(LocusDataset::new(vec![[1.0, 1.0, 1.0]], vec![0]).is_empty());
    }

    #[test]
    fn test_from_chromaticities() {
        let locus = LocusDataset::from_chromaticities(&[[0.25, 0.5]], 0.5);
        let p = locus.points[0];
        assert!((p[0] - 0.25).abs() < 1e-6);
        assert!((p[1] - 0.5).abs() < 1e-6);
        assert!((p[2] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_blacklist_defaults_when_missing_from_json() {
        let locus: LocusDataset = serde_json::from_str(r#"{"points": [[0.2, 0.3, 0.4]]}"#).unwrap();
        assert_eq!(locus.points.len(), 1);
        assert!(locus.blacklist.is_empty());
    }
}
