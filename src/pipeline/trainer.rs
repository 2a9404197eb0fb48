//! Pipeline training and model persistence.
//!
//! A [`Trainer`] builds a component list from an inline pipeline
//! configuration, runs training across every component in declared order
//! with an accumulating shared context, and persists the result as a model
//! directory that [`Runner`](crate::pipeline::runner::Runner) can load back.

use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use crate::constants::TRAINING_DATA_FILE;
use crate::errors::Result;
use crate::persistor::Persistor;
use crate::pipeline::component::{Component, Context};
use crate::pipeline::metadata::Metadata;
use crate::pipeline::registry::ComponentBuilder;
use crate::pipeline::runner::Runner;
use crate::training::TrainingData;

/// Trains an ordered component pipeline and persists the resulting model.
pub struct Trainer {
    config: Metadata,
    pipeline: Vec<Box<dyn Component>>,
    context: Context,
    training_data: Option<TrainingData>,
}

impl Trainer {
    /// Build the component list from an inline pipeline configuration.
    ///
    /// Components are constructed fresh (no persisted artifacts) in declared
    /// order; each component's [`provide_context`](Component::provide_context)
    /// seeds the shared context before training starts. Any construction
    /// failure aborts with no partial pipeline.
    pub fn new(config: Metadata, builder: &ComponentBuilder) -> Result<Self> {
        let mut pipeline = Vec::with_capacity(config.pipeline.len());
        let mut context = Context::default();

        let names: Vec<String> = config
            .component_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for name in &names {
            let component = builder.create_component(name, &config)?;
            if let Some(updates) = component.provide_context() {
                context.extend(updates);
            }
            pipeline.push(component);
        }

        Ok(Self {
            config,
            pipeline,
            context,
            training_data: None,
        })
    }

    /// Train every component in declared order.
    ///
    /// The payload is deep-copied first so component mutations never corrupt
    /// the caller's original. Each component sees the immutable slice of
    /// already-trained components plus the current context snapshot, and may
    /// return context updates for later components. No component is skipped;
    /// `train` is a no-op by default.
    pub fn train(&mut self, data: &TrainingData) -> Result<()> {
        let mut working = data.clone();

        for i in 0..self.pipeline.len() {
            let (trained, rest) = self.pipeline.split_at_mut(i);
            let component = &mut rest[0];
            if let Some(updates) = component.train(&mut working, trained, &self.context)? {
                self.context.extend(updates);
            }
        }

        self.training_data = Some(working);
        Ok(())
    }

    /// Persist the trained pipeline under `path/project/model`.
    ///
    /// A random model name is allocated unless `fixed_model_name` is given.
    /// Each component's [`persist`](Component::persist) fragment is merged
    /// into its metadata entry together with its constructor path; metadata
    /// is written last, so a failing component aborts the whole operation
    /// with no metadata on disk. The directory is optionally handed to an
    /// external [`Persistor`] afterwards. Returns the absolute model
    /// directory.
    pub fn persist(
        &self,
        path: &Path,
        persistor: Option<&dyn Persistor>,
        project_name: Option<&str>,
        fixed_model_name: Option<&str>,
    ) -> Result<PathBuf> {
        let project = project_name.unwrap_or("default");
        let model_name = match fixed_model_name {
            Some(name) => name.to_string(),
            None => format!("model_{}", random_suffix(8)),
        };

        let model_dir = path.join(project).join(&model_name);
        std::fs::create_dir_all(&model_dir)?;

        if let Some(data) = &self.training_data {
            std::fs::write(
                model_dir.join(TRAINING_DATA_FILE),
                serde_json::to_string_pretty(data)?,
            )?;
        }

        let mut metadata = self.config.clone();
        for (component, entry) in self.pipeline.iter().zip(metadata.pipeline.iter_mut()) {
            entry.class = Some(component.class_path().to_string());
            if let Some(fragment) = component.persist(&model_dir)? {
                entry.config.extend(fragment);
            }
        }
        metadata.persist(&model_dir)?;

        if let Some(persistor) = persistor {
            persistor.persist(&model_dir, &model_name, project)?;
        }

        let absolute = if model_dir.is_absolute() {
            model_dir
        } else {
            std::env::current_dir()?.join(model_dir)
        };
        info!(model_dir = %absolute.display(), "persisted trained pipeline");
        Ok(absolute)
    }

    /// Turn the trained pipeline into a [`Runner`] without a persistence
    /// round trip.
    pub fn into_runner(self) -> Runner {
        let pipeline = self.pipeline.into_iter().map(Into::into).collect();
        Runner::from_parts(pipeline, self.context, self.config)
    }

    /// The accumulated shared context.
    pub fn context(&self) -> &Context {
        &self.context
    }
}

fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}
