//! Artifact export and loading

mod artifact_store;

pub use artifact_store::{Artifact, ArtifactStore};
