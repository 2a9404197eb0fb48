//! Entropy-driven regex pattern synthesis.
//!
//! Given a handful of example strings, [`AutoPattern`] infers a compact
//! pattern that matches all of them: literal segments common to every
//! example become alternations, free-varying segments become character-class
//! wildcards with length bounds chosen by the entropy of the observed
//! lengths.
//!
//! ## Submodules
//!
//! - [`entropy`] — Shannon entropy over an empirical value distribution
//! - [`auto`] — the synthesis algorithm and its segment node types

pub mod auto;
pub mod entropy;

pub use auto::{AutoPattern, FullPattern, HalfPattern, PatternNode};
pub use entropy::shannon_entropy;
