use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

/// A locally staged upload, owned by the request that created it.
///
/// The backing file is removed when the guard drops, so every exit path
/// (success, validation failure, upstream failure) releases it.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    pub async fn create(
        staging_dir: &Path,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Self> {
        tokio::fs::create_dir_all(staging_dir)
            .await
            .with_context(|| format!("Failed to create staging dir {}", staging_dir.display()))?;

        let extension = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");

        let path = staging_dir.join(format!("{}.{extension}", Uuid::new_v4()));

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to stage upload at {}", path.display()))?;

        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!("Failed to remove staged file {}: {e}", self.path.display());
        }
    }
}
