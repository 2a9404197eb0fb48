//! The pipeline component contract and its configuration helpers.
//!
//! A [`Component`] is one pluggable unit of the pipeline: a featurizer, a
//! classifier, an entity extractor, a refiner. Components declare advisory
//! `provides`/`requires` key lists — stage order in configuration is the
//! only ordering guarantee, no scheduler reorders anything — and implement
//! some subset of the lifecycle: construct/load, train, process, persist.
//!
//! Shared state between components travels through an explicit [`Context`]
//! map rather than ambient globals, so the propagation is visible at every
//! call site.

use std::path::Path;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::errors::Result;
use crate::pipeline::message::Message;
use crate::training::TrainingData;

/// Growable key/value context accumulated across components during pipeline
/// creation and training. Later components see everything earlier ones
/// contributed.
pub type Context = FxHashMap<String, Value>;

/// One pluggable unit of the processing pipeline.
///
/// Every method except [`Component::name`] has a no-op default, so a
/// component only implements the lifecycle hooks it participates in.
pub trait Component: Send + Sync {
    /// Short registry name of this component (e.g. `"RegexRuleEntityExtractor"`).
    fn name(&self) -> &str;

    /// Fully-qualified constructor path recorded in persisted metadata so a
    /// pipeline can be reconstructed when the short name is not registered.
    fn class_path(&self) -> &str {
        self.name()
    }

    /// Message keys this component writes. Advisory, not enforced.
    fn provides(&self) -> &'static [&'static str] {
        &[]
    }

    /// Message keys this component reads. Advisory, not enforced.
    fn requires(&self) -> &'static [&'static str] {
        &[]
    }

    /// Values to seed or extend the shared context visible to later
    /// components.
    fn provide_context(&self) -> Option<Context> {
        None
    }

    /// Mutate internal state from training data. `previous` is the
    /// immutable slice of already-trained components, letting a component
    /// replay earlier stages on synthetic examples when it needs to.
    /// Returns optional context updates merged for later components.
    fn train(
        &mut self,
        _data: &mut TrainingData,
        _previous: &[Box<dyn Component>],
        _context: &Context,
    ) -> Result<Option<Context>> {
        Ok(None)
    }

    /// Mutate the message in place during inference.
    fn process(&self, _message: &mut Message, _context: &Context) -> Result<()> {
        Ok(())
    }

    /// Write any artifact to `model_dir`, returning a fragment (such as an
    /// artifact filename) merged into this component's metadata entry.
    fn persist(&self, _model_dir: &Path) -> Result<Option<Map<String, Value>>> {
        Ok(None)
    }
}

// ============================================================================
// ComponentConfig — defaults merged with per-instance settings
// ============================================================================

/// Flat key/value configuration for one component: class-level defaults
/// overridden by per-instance settings. Custom keys always win; unspecified
/// keys fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct ComponentConfig(Map<String, Value>);

impl ComponentConfig {
    /// Merge class defaults with per-instance settings (custom wins).
    pub fn merged(defaults: Map<String, Value>, custom: &Map<String, Value>) -> Self {
        let mut cfg = defaults;
        for (key, value) in custom {
            cfg.insert(key.clone(), value.clone());
        }
        Self(cfg)
    }

    /// Wrap per-instance settings with no class defaults.
    pub fn new(settings: Map<String, Value>) -> Self {
        Self(settings)
    }

    /// Look up a raw configuration value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Look up a boolean, falling back to `default` when absent or not a
    /// boolean.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Look up a list of strings, skipping non-string members.
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// View the merged configuration as a JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}
