//! Knowledge-base facade: train and query named pipelines under a shared
//! archive root.
//!
//! A knowledge base is one archived model directory per base id. Base ids
//! come from callers and end up in filesystem paths, so they are checked for
//! path traversal before any disk access.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::info;

use crate::constants::TRAINING_DATA_FILE;
use crate::errors::{Error, Result};
use crate::persistor::Persistor;
use crate::pipeline::{ComponentBuilder, Metadata, Runner, Trainer};
use crate::training::TrainingData;

/// Fixed model name inside each knowledge-base directory; retraining
/// replaces the model in place rather than accumulating versions.
const MODEL_NAME: &str = "model";

/// Reject base ids that could escape the archive root. Every path
/// component must be a plain name: absolute paths, `..`, `.` and Windows
/// separators are all refused.
pub fn validate_kb_name(knowledge_base_id: &str) -> Result<()> {
    let safe = !knowledge_base_id.is_empty()
        && !knowledge_base_id.contains('\\')
        && Path::new(knowledge_base_id)
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)));
    if !safe {
        return Err(Error::PathSafety(knowledge_base_id.to_string()));
    }
    Ok(())
}

/// Trains and queries named knowledge bases.
pub struct KnowledgeBaseEngine {
    pipeline_config: Metadata,
    archive_root: PathBuf,
    builder: ComponentBuilder,
}

impl KnowledgeBaseEngine {
    pub fn new(pipeline_config: Metadata, archive_root: impl Into<PathBuf>) -> Self {
        Self {
            pipeline_config,
            archive_root: archive_root.into(),
            builder: ComponentBuilder::with_defaults(),
        }
    }

    /// Use a custom builder (extra registered components, cache disabled).
    pub fn with_builder(mut self, builder: ComponentBuilder) -> Self {
        self.builder = builder;
        self
    }

    fn model_dir(&self, knowledge_base_id: &str) -> PathBuf {
        self.archive_root.join(knowledge_base_id).join(MODEL_NAME)
    }

    /// Train (or retrain) the knowledge base.
    ///
    /// The payload is validated before any trainer exists, so a malformed
    /// payload has no side effects. Retraining folds the previously archived
    /// snapshot into the fresh payload, then writes a new model directory in
    /// place. Returns the model directory.
    pub fn train(
        &self,
        mut training_data: TrainingData,
        knowledge_base_id: &str,
        persistor: Option<&dyn Persistor>,
    ) -> Result<PathBuf> {
        training_data.validate()?;
        validate_kb_name(knowledge_base_id)?;

        let snapshot = self.model_dir(knowledge_base_id).join(TRAINING_DATA_FILE);
        if snapshot.is_file() {
            let archived: TrainingData =
                serde_json::from_str(&std::fs::read_to_string(&snapshot)?)?;
            training_data.merge(archived);
        }

        let mut trainer = Trainer::new(self.pipeline_config.clone(), &self.builder)?;
        trainer.train(&training_data)?;
        let model_dir = trainer.persist(
            &self.archive_root,
            persistor,
            Some(knowledge_base_id),
            Some(MODEL_NAME),
        )?;
        info!(knowledge_base = knowledge_base_id, model_dir = %model_dir.display(), "trained knowledge base");
        Ok(model_dir)
    }

    /// Query a trained knowledge base and return the filtered projection of
    /// the pipeline result.
    pub fn predict(&self, question: &str, knowledge_base_id: &str) -> Result<Map<String, Value>> {
        validate_kb_name(knowledge_base_id)?;
        let runner = Runner::load(self.model_dir(knowledge_base_id), &self.builder)?;
        let message = runner.parse(question)?;
        Ok(message.as_dict(true))
    }
}
