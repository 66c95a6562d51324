//! Analysis modules.
//!
//! Sampling of tabular input into bounded prompt digests.

pub mod sampler;

pub use sampler::{sample, PRIMARY_ROW_CAP, REVIEW_ROW_CAP};
