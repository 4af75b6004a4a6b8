//! Artifact persistence
//!
//! Fitted state is stored as pretty-printed JSON. Loading checks that the
//! file exists first, so a missing artifact names the step that produces it.

use crate::error::{ChurnError, PipelineStep, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// A persisted pipeline output
pub trait Artifact: Serialize + DeserializeOwned + Sized {
    /// Step that writes this artifact
    const PRODUCER: PipelineStep;

    /// Check invariants after deserializing
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Reads and writes artifacts on the local filesystem
pub struct ArtifactStore;

impl ArtifactStore {
    /// Fail with [`ChurnError::MissingArtifact`] unless `path` is a file
    pub fn require(path: &Path, producer: PipelineStep) -> Result<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(ChurnError::MissingArtifact {
                path: path.to_path_buf(),
                producer,
            })
        }
    }

    /// Serialize `value` as JSON at `path`, creating parent directories
    pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        ensure_parent(path)?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        debug!(path = %path.display(), "Wrote artifact");
        Ok(())
    }

    /// Deserialize JSON from `path`; a missing file names `producer`
    pub fn load_json<T: DeserializeOwned>(path: &Path, producer: PipelineStep) -> Result<T> {
        Self::require(path, producer)?;
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| {
            ChurnError::SerializationError(format!("{}: {}", path.display(), e))
        })
    }

    /// Persist an artifact
    pub fn save<A: Artifact>(path: &Path, artifact: &A) -> Result<()> {
        Self::save_json(path, artifact)?;
        info!(path = %path.display(), producer = %A::PRODUCER, "Persisted artifact");
        Ok(())
    }

    /// Load and validate an artifact
    pub fn load<A: Artifact>(path: &Path) -> Result<A> {
        let artifact: A = Self::load_json(path, A::PRODUCER)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Raw bytes of a file artifact, such as the attribution chart
    pub fn read_bytes(path: &Path, producer: PipelineStep) -> Result<Vec<u8>> {
        Self::require(path, producer)?;
        Ok(std::fs::read(path)?)
    }

    /// Write raw bytes, creating parent directories
    pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        ensure_parent(path)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Bounds {
        lo: f64,
        hi: f64,
    }

    impl Artifact for Bounds {
        const PRODUCER: PipelineStep = PipelineStep::Preprocess;

        fn validate(&self) -> Result<()> {
            if self.lo <= self.hi {
                Ok(())
            } else {
                Err(ChurnError::ValidationError("lo > hi".to_string()))
            }
        }
    }

    #[test]
    fn test_save_creates_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("bounds.json");
        ArtifactStore::save(&path, &Bounds { lo: 0.0, hi: 1.0 }).unwrap();
        let loaded: Bounds = ArtifactStore::load(&path).unwrap();
        assert_eq!(loaded, Bounds { lo: 0.0, hi: 1.0 });
    }

    #[test]
    fn test_missing_artifact_names_producer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        match ArtifactStore::load::<Bounds>(&path) {
            Err(ChurnError::MissingArtifact { path: p, producer }) => {
                assert_eq!(p, path);
                assert_eq!(producer, PipelineStep::Preprocess);
            }
            other => panic!("expected MissingArtifact, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_runs_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bounds.json");
        ArtifactStore::save_json(&path, &Bounds { lo: 2.0, hi: 1.0 }).unwrap();
        assert!(matches!(
            ArtifactStore::load::<Bounds>(&path),
            Err(ChurnError::ValidationError(_))
        ));
    }
}
