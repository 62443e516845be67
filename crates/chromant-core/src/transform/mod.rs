//! Precomputed function tables.

pub mod sampled;

pub use sampled::SampledFunction;
