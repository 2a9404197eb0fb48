//! Pipeline inference.
//!
//! A [`Runner`] holds a loaded component pipeline and pushes a
//! [`Message`] through every component in declared order. Pipelines come
//! from a persisted model directory or from an inline configuration; a
//! persisted model is only accepted when its format version matches the
//! running version exactly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use semver::Version;
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::MODEL_FORMAT_VERSION;
use crate::errors::{Error, Result};
use crate::pipeline::component::{Component, Context};
use crate::pipeline::message::Message;
use crate::pipeline::metadata::Metadata;
use crate::pipeline::registry::ComponentBuilder;

/// Where a pipeline comes from: a persisted model directory or an inline
/// configuration (no directory, no persisted artifacts).
pub enum ModelSource {
    Dir(PathBuf),
    Inline(Metadata),
}

impl From<&Path> for ModelSource {
    fn from(path: &Path) -> Self {
        Self::Dir(path.to_path_buf())
    }
}

impl From<PathBuf> for ModelSource {
    fn from(path: PathBuf) -> Self {
        Self::Dir(path)
    }
}

impl From<Metadata> for ModelSource {
    fn from(metadata: Metadata) -> Self {
        Self::Inline(metadata)
    }
}

/// Executes inference over an ordered component pipeline.
pub struct Runner {
    pipeline: Vec<Arc<dyn Component>>,
    context: Context,
    metadata: Metadata,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field(
                "pipeline",
                &self.pipeline.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Assemble a runner from already-constructed parts.
    pub(crate) fn from_parts(
        pipeline: Vec<Arc<dyn Component>>,
        context: Context,
        metadata: Metadata,
    ) -> Self {
        Self {
            pipeline,
            context,
            metadata,
        }
    }

    /// Load a pipeline from a model directory or inline configuration.
    pub fn load(source: impl Into<ModelSource>, builder: &ComponentBuilder) -> Result<Self> {
        let metadata = match source.into() {
            ModelSource::Dir(dir) => Metadata::load(&dir)?,
            ModelSource::Inline(metadata) => metadata,
        };
        Self::ensure_model_compatibility(&metadata)?;
        Self::create(metadata, builder)
    }

    /// Compare the persisted format version against the running format
    /// version with exact semantic-version equality. Any mismatch is fatal;
    /// no forward or backward compatibility is attempted. Inline
    /// configurations without a version are accepted as current.
    pub fn ensure_model_compatibility(metadata: &Metadata) -> Result<()> {
        let Some(found) = metadata.version.as_deref() else {
            return Ok(());
        };
        let running =
            Version::parse(MODEL_FORMAT_VERSION).expect("running format version is valid semver");
        match Version::parse(found) {
            Ok(version) if version == running => Ok(()),
            _ => Err(Error::UnsupportedModel {
                found: found.to_string(),
                running: MODEL_FORMAT_VERSION.to_string(),
            }),
        }
    }

    /// Build the pipeline from metadata: load each declared component via
    /// the builder, merge its context contribution, append in order. Any
    /// failure aborts; no partially-built pipeline is returned.
    pub fn create(metadata: Metadata, builder: &ComponentBuilder) -> Result<Self> {
        let model_dir = metadata.model_dir.clone();
        let names: Vec<String> = metadata
            .component_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut pipeline: Vec<Arc<dyn Component>> = Vec::with_capacity(names.len());
        let mut context = Context::default();
        for name in &names {
            let component =
                builder.load_component(name, model_dir.as_deref(), &metadata, &context)?;
            if let Some(updates) = component.provide_context() {
                context.extend(updates);
            }
            pipeline.push(component);
        }

        check_requirements(&pipeline);
        Ok(Self::from_parts(pipeline, context, metadata))
    }

    /// Run inference: push a message through every component sequentially.
    pub fn parse(&self, text: &str) -> Result<Message> {
        self.parse_with(text, &[], Map::new())
    }

    /// Run inference with requested output keys and caller-supplied seed
    /// values (a candidate pool, extra rules).
    pub fn parse_with(
        &self,
        text: &str,
        output_properties: &[String],
        seeds: Map<String, Value>,
    ) -> Result<Message> {
        let mut message = Message::new(text)
            .with_output_properties(output_properties.iter().cloned())
            .with_seeds(seeds)
            .with_time(Utc::now());

        for component in &self.pipeline {
            component.process(&mut message, &self.context)?;
        }
        Ok(message)
    }

    /// Metadata this runner was created from.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Number of components in the pipeline.
    pub fn len(&self) -> usize {
        self.pipeline.len()
    }

    /// Whether the pipeline has no components.
    pub fn is_empty(&self) -> bool {
        self.pipeline.is_empty()
    }
}

/// Advisory check of each component's `requires` against what earlier
/// components provide. Stage order in configuration is the only ordering
/// guarantee, and callers may seed arbitrary keys, so unmet requirements are
/// logged rather than enforced.
fn check_requirements(pipeline: &[Arc<dyn Component>]) {
    let mut provided: Vec<&str> = vec![crate::constants::TEXT];
    for component in pipeline {
        for required in component.requires() {
            if !provided.contains(required) {
                debug!(
                    component = component.name(),
                    key = required,
                    "required key not provided by an earlier component"
                );
            }
        }
        provided.extend(component.provides());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::metadata::ComponentMeta;
    use crate::pipeline::registry::{ComponentClass, ComponentRegistry};
    use serde_json::json;

    struct AppendStage(&'static str);

    impl Component for AppendStage {
        fn name(&self) -> &str {
            self.0
        }
        fn process(&self, message: &mut Message, _context: &Context) -> Result<()> {
            let mut trace = message
                .get("trace")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            trace.push(json!(self.0));
            message.set("trace", Value::Array(trace), true);
            Ok(())
        }
    }

    fn builder_with_stages() -> ComponentBuilder {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentClass {
            name: "First",
            class_path: "simatch::tests::First",
            create: |_| Ok(Box::new(AppendStage("First"))),
            load: |_, _, _| Ok(Box::new(AppendStage("First"))),
            cache_key: |_| None,
        });
        registry.register(ComponentClass {
            name: "Second",
            class_path: "simatch::tests::Second",
            create: |_| Ok(Box::new(AppendStage("Second"))),
            load: |_, _, _| Ok(Box::new(AppendStage("Second"))),
            cache_key: |_| None,
        });
        ComponentBuilder::new(registry)
    }

    fn inline_config() -> Metadata {
        Metadata {
            pipeline: vec![
                ComponentMeta::named("First"),
                ComponentMeta::named("Second"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_compatibility_exact_match_passes() {
        let metadata = Metadata {
            version: Some(MODEL_FORMAT_VERSION.into()),
            ..Default::default()
        };
        assert!(Runner::ensure_model_compatibility(&metadata).is_ok());
    }

    #[test]
    fn test_compatibility_mismatch_fails() {
        let metadata = Metadata {
            version: Some("0.0.1".into()),
            ..Default::default()
        };
        let err = Runner::ensure_model_compatibility(&metadata).unwrap_err();
        assert!(err.is_unsupported_model());
    }

    #[test]
    fn test_compatibility_unparseable_version_fails() {
        let metadata = Metadata {
            version: Some("not-a-version".into()),
            ..Default::default()
        };
        assert!(Runner::ensure_model_compatibility(&metadata).is_err());
    }

    #[test]
    fn test_compatibility_missing_version_accepted_for_inline() {
        assert!(Runner::ensure_model_compatibility(&Metadata::default()).is_ok());
    }

    #[test]
    fn test_parse_runs_components_in_declared_order() {
        let builder = builder_with_stages();
        let runner = Runner::load(inline_config(), &builder).unwrap();

        let message = runner.parse("hello").unwrap();
        assert_eq!(message.get("trace").unwrap(), &json!(["First", "Second"]));
    }

    #[test]
    fn test_debug_lists_component_names() {
        let builder = builder_with_stages();
        let runner = Runner::load(inline_config(), &builder).unwrap();
        let rendered = format!("{runner:?}");
        assert!(rendered.contains("First"));
        assert!(rendered.contains("Second"));
    }

    #[test]
    fn test_unknown_component_aborts_creation() {
        let builder = builder_with_stages();
        let config = Metadata {
            pipeline: vec![ComponentMeta::named("First"), ComponentMeta::named("Ghost")],
            ..Default::default()
        };
        assert!(Runner::load(config, &builder).is_err());
    }

    #[test]
    fn test_parse_with_seeds_visible_to_components() {
        struct PoolReader;
        impl Component for PoolReader {
            fn name(&self) -> &str {
                "PoolReader"
            }
            fn process(&self, message: &mut Message, _context: &Context) -> Result<()> {
                let size = message
                    .get("pool")
                    .and_then(Value::as_array)
                    .map(Vec::len)
                    .unwrap_or(0);
                message.set("pool_size", json!(size), true);
                Ok(())
            }
        }

        let mut registry = ComponentRegistry::new();
        registry.register(ComponentClass {
            name: "PoolReader",
            class_path: "simatch::tests::PoolReader",
            create: |_| Ok(Box::new(PoolReader)),
            load: |_, _, _| Ok(Box::new(PoolReader)),
            cache_key: |_| None,
        });
        let builder = ComponentBuilder::new(registry);
        let config = Metadata {
            pipeline: vec![ComponentMeta::named("PoolReader")],
            ..Default::default()
        };
        let runner = Runner::load(config, &builder).unwrap();

        let mut seeds = Map::new();
        seeds.insert("pool".into(), json!(["a", "b", "c"]));
        let message = runner.parse_with("q", &[], seeds).unwrap();
        assert_eq!(message.get("pool_size").unwrap(), &json!(3));
    }
}
