//! Model archival.
//!
//! A [`Persistor`] receives a freshly persisted model directory and stores
//! it somewhere durable; [`Persistor::retrieve`] brings a stored model back
//! for loading. The trait keeps remote storage behind a seam: the pipeline
//! only ever hands over a finished directory, it never streams artifacts
//! through the persistor.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::{Error, Result};

/// Stores finished model directories and fetches them back on demand.
pub trait Persistor: Send + Sync {
    /// Archive a persisted model directory under `project/model_name`.
    fn persist(&self, model_dir: &Path, model_name: &str, project: &str) -> Result<()>;

    /// Fetch an archived model into `target_dir`.
    fn retrieve(&self, model_name: &str, project: &str, target_dir: &Path) -> Result<()>;
}

/// Archives models as plain directory copies under a local root.
pub struct FileArchivePersistor {
    root: PathBuf,
}

impl FileArchivePersistor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn archive_dir(&self, model_name: &str, project: &str) -> PathBuf {
        self.root.join(project).join(model_name)
    }
}

impl Persistor for FileArchivePersistor {
    fn persist(&self, model_dir: &Path, model_name: &str, project: &str) -> Result<()> {
        if !model_dir.is_dir() {
            return Err(Error::configuration(format!(
                "model directory {:?} not found",
                model_dir
            )));
        }
        let target = self.archive_dir(model_name, project);
        copy_dir(model_dir, &target)?;
        info!(archive = %target.display(), "archived model");
        Ok(())
    }

    fn retrieve(&self, model_name: &str, project: &str, target_dir: &Path) -> Result<()> {
        let source = self.archive_dir(model_name, project);
        if !source.is_dir() {
            return Err(Error::upstream(
                404,
                format!("archived model {project}/{model_name} not found"),
            ));
        }
        copy_dir(&source, target_dir)
    }
}

fn copy_dir(source: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_and_retrieve_roundtrip() {
        let model = tempfile::tempdir().unwrap();
        std::fs::write(model.path().join("metadata.json"), "{}").unwrap();
        std::fs::create_dir(model.path().join("nested")).unwrap();
        std::fs::write(model.path().join("nested/artifact.json"), "[]").unwrap();

        let archive = tempfile::tempdir().unwrap();
        let persistor = FileArchivePersistor::new(archive.path());
        persistor.persist(model.path(), "model", "demo").unwrap();
        assert!(archive.path().join("demo/model/metadata.json").exists());

        let restored = tempfile::tempdir().unwrap();
        persistor
            .retrieve("model", "demo", restored.path())
            .unwrap();
        assert!(restored.path().join("nested/artifact.json").exists());
    }

    #[test]
    fn test_persist_missing_directory_fails() {
        let archive = tempfile::tempdir().unwrap();
        let persistor = FileArchivePersistor::new(archive.path());
        assert!(persistor
            .persist(Path::new("/nonexistent/model"), "model", "demo")
            .is_err());
    }

    #[test]
    fn test_retrieve_unknown_model_is_upstream_error() {
        let archive = tempfile::tempdir().unwrap();
        let persistor = FileArchivePersistor::new(archive.path());
        let target = tempfile::tempdir().unwrap();
        let err = persistor
            .retrieve("ghost", "demo", target.path())
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 404, .. }));
    }
}
