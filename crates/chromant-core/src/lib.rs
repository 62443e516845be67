//! Chromant Core: perceptual color conversion and gamut-boundary tables.
//!
//! This crate contains the color-space registry, the Jsh converters, the
//! spline and sampled-function primitives, and the gamut-boundary engine.
//! No GPU or framework dependencies.

pub mod appearance;
pub mod color_management;
pub mod config;
pub mod curves;
pub mod error;
pub mod gamut;
pub mod transform;

// Re-exports for convenience.
pub use appearance::{Converter, Jsh, PerceptualModel, Surround, ViewingConditions};
pub use color_management::{ColorRegistry, ColorSpaceDescriptor, GammaLaw, TransferFunction};
pub use config::GamutConfig;
pub use curves::{EndCondition, SplineCurve, bake_curve_to_1d_lut};
pub use error::{ColorError, ColorResult};
pub use gamut::{GamutMapper, GamutStore, GamutTable, LocusDataset};
pub use transform::SampledFunction;
