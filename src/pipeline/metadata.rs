//! Persisted pipeline description.
//!
//! [`Metadata`] records the ordered component list plus per-component
//! configuration and the model format version. The `pipeline` order is
//! authoritative execution order for both training and inference. A model
//! directory holds one `metadata.json` written once at persist time; a new
//! directory is created for retraining.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::error;

use crate::constants::{METADATA_FILE, MODEL_FORMAT_VERSION};
use crate::errors::{Error, Result};
use crate::pipeline::component::ComponentConfig;

/// One entry of the persisted pipeline: the component's registry name, its
/// fully-qualified constructor path, and every other persisted field
/// (configuration plus persist-time fragments such as artifact filenames).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMeta {
    pub name: String,

    /// Constructor path used to reconstruct the component when the short
    /// name is not found in the static registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    #[serde(flatten)]
    pub config: Map<String, Value>,
}

impl ComponentMeta {
    /// A bare entry with no class path or extra configuration.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: None,
            config: Map::new(),
        }
    }
}

/// Persisted description of an ordered component list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default)]
    pub pipeline: Vec<ComponentMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Directory this metadata was loaded from; unset for inline configs.
    #[serde(skip)]
    pub model_dir: Option<PathBuf>,
}

impl Metadata {
    /// Load `metadata.json` from a model directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let path = model_dir.join(METADATA_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            error!(path = %path.display(), "failed to load model metadata");
            Error::Io(e)
        })?;
        let mut metadata: Metadata = serde_json::from_str(&content)?;
        metadata.model_dir = Some(model_dir.to_path_buf());
        Ok(metadata)
    }

    /// Write `metadata.json` into a model directory, stamping a fresh
    /// `trained_at` timestamp and the running format version.
    pub fn persist(&self, model_dir: &Path) -> Result<()> {
        let mut stamped = self.clone();
        stamped.trained_at = Some(Utc::now().format("%Y%m%d-%H%M%S").to_string());
        stamped.version = Some(MODEL_FORMAT_VERSION.to_string());

        let path = model_dir.join(METADATA_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&stamped)?)?;
        Ok(())
    }

    /// Ordered component names, execution order for training and inference.
    pub fn component_names(&self) -> Vec<&str> {
        self.pipeline.iter().map(|c| c.name.as_str()).collect()
    }

    /// The persisted entry for a component by name, or `None`.
    pub fn entry(&self, name: &str) -> Option<&ComponentMeta> {
        self.pipeline.iter().find(|c| c.name == name)
    }

    /// Configuration for one component: class `defaults` overridden by the
    /// persisted per-component fields. Missing entries yield the defaults.
    pub fn for_component(&self, name: &str, defaults: Map<String, Value>) -> ComponentConfig {
        match self.entry(name) {
            Some(entry) => ComponentConfig::merged(defaults, &entry.config),
            None => ComponentConfig::new(defaults),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Metadata {
        serde_json::from_value(json!({
            "language": "en",
            "pipeline": [
                {
                    "name": "RegexRuleEntityExtractor",
                    "class": "simatch::extractors::RegexRuleEntityExtractor",
                    "case_sensitive": true
                },
                { "name": "StubClassifier" }
            ],
            "version": "1.0.0"
        }))
        .unwrap()
    }

    #[test]
    fn test_component_names_keep_declared_order() {
        let meta = sample();
        assert_eq!(
            meta.component_names(),
            vec!["RegexRuleEntityExtractor", "StubClassifier"]
        );
    }

    #[test]
    fn test_for_component_merges_defaults() {
        let meta = sample();
        let mut defaults = Map::new();
        defaults.insert("case_sensitive".into(), json!(false));
        defaults.insert("top_k".into(), json!(4));

        let cfg = meta.for_component("RegexRuleEntityExtractor", defaults);
        assert!(cfg.get_bool("case_sensitive", false)); // persisted wins
        assert_eq!(cfg.get("top_k"), Some(&json!(4))); // default survives
    }

    #[test]
    fn test_for_component_missing_yields_defaults() {
        let meta = sample();
        let mut defaults = Map::new();
        defaults.insert("x".into(), json!(1));
        let cfg = meta.for_component("NoSuchComponent", defaults);
        assert_eq!(cfg.get("x"), Some(&json!(1)));
    }

    #[test]
    fn test_unknown_fields_flattened_into_config() {
        let meta = sample();
        let entry = meta.entry("RegexRuleEntityExtractor").unwrap();
        assert_eq!(entry.config.get("case_sensitive"), Some(&json!(true)));
        assert_eq!(
            entry.class.as_deref(),
            Some("simatch::extractors::RegexRuleEntityExtractor")
        );
    }

    #[test]
    fn test_persist_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let meta = sample();
        meta.persist(dir.path()).unwrap();

        let loaded = Metadata::load(dir.path()).unwrap();
        assert_eq!(loaded.component_names(), meta.component_names());
        assert_eq!(loaded.version.as_deref(), Some(MODEL_FORMAT_VERSION));
        assert!(loaded.trained_at.is_some());
        assert_eq!(loaded.model_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_load_missing_directory_is_io_error() {
        let err = Metadata::load(Path::new("/nonexistent/model")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
