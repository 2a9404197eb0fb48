//! # simatch
//!
//! An intent-matching pipeline engine with pluggable processing components.
//!
//! This library wires heterogeneous processing components into trainable
//! pipelines with explicit state propagation, and ships two pattern
//! algorithms that plug into them: an entropy-driven regex synthesizer and
//! a greedy rule-based slot filler.
//!
//! ## Features
//!
//! - **Explicit pipelines**: declaration order is execution order, state
//!   flows through a visible message bag and shared context
//! - **Trainable**: train, persist and reload pipelines as model directories
//! - **Pattern synthesis**: derive regex patterns from example strings
//! - **Knowledge bases**: a facade for training and querying named models

pub mod batch;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod extractors;
pub mod pattern;
pub mod persistor;
pub mod pipeline;
pub mod training;

// Re-export commonly used types
pub use errors::{Error, Result};
pub use training::{TrainingData, TrainingExample};

// Re-export main functionality
pub use engine::{validate_kb_name, KnowledgeBaseEngine};
pub use extractors::{RegexEntityExtractor, RegexRule, RegexRuleEntityExtractor};
pub use pattern::AutoPattern;
pub use persistor::{FileArchivePersistor, Persistor};
pub use pipeline::{
    Component, ComponentBuilder, ComponentClass, ComponentConfig, ComponentMeta,
    ComponentRegistry, Context, Message, Metadata, ModelSource, Runner, Trainer,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
