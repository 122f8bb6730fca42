//! Rendered barcode artifacts on disk.
//!
//! Each issued code is written once as `<code>.png` under the configured
//! directory. Artifact ids come from request paths, so every id is checked
//! against the artifact pattern before it touches the filesystem.

use std::path::PathBuf;

use shared::validation::is_valid_artifact_id;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("invalid artifact id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, artifact_id: &str) -> Result<PathBuf, ArtifactError> {
        if !is_valid_artifact_id(artifact_id) {
            return Err(ArtifactError::InvalidId(artifact_id.to_string()));
        }
        Ok(self.dir.join(artifact_id))
    }

    /// Writes the artifact, replacing any previous copy.
    pub async fn save(&self, artifact_id: &str, png: &[u8]) -> Result<PathBuf, ArtifactError> {
        let path = self.path_for(artifact_id)?;
        fs::create_dir_all(&self.dir).await?;

        let temp_path = path.with_extension("png.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(png).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &path).await?;

        debug!(artifact_id = %artifact_id, bytes = png.len(), "Artifact written");
        Ok(path)
    }

    /// Reads an artifact. Missing files yield `None`.
    pub async fn load(&self, artifact_id: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        let path = self.path_for(artifact_id)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
