//! Color management: illuminants, color spaces, chromatic adaptation and gamma laws.

pub mod adaptation;
pub mod color_space;
pub mod illuminant;
pub mod registry;
pub mod transfer;

pub use color_space::{ColorMatrix, ColorSpaceDescriptor};
pub use illuminant::{EQUAL_ENERGY, Illuminant};
pub use registry::ColorRegistry;
pub use transfer::{GammaLaw, TransferFunction};
