use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task;
use uuid::Uuid;

use super::{MediaAsset, MediaHost, ResourceType};

/// Filesystem-backed media host. Assets land under
/// `<library>/upload/v1/<uuid>.<ext>` and are served by the router's
/// `/media` static mount, so stored URLs carry the same
/// `/upload/v<version>/` shape a remote host would produce.
pub struct LocalMediaHost {
    library_path: PathBuf,
    public_base_url: String,
    upload_timeout: Duration,
}

impl LocalMediaHost {
    #[must_use]
    pub fn new(library_path: PathBuf, public_base_url: String, upload_timeout: Duration) -> Self {
        Self {
            library_path,
            public_base_url,
            upload_timeout,
        }
    }

    fn asset_dir(&self) -> PathBuf {
        self.library_path.join("upload").join("v1")
    }

    async fn store(&self, local_path: &Path) -> Option<MediaAsset> {
        let extension = local_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin")
            .to_string();

        let asset_dir = self.asset_dir();
        tokio::fs::create_dir_all(&asset_dir).await.ok()?;

        let file_name = format!("{}.{extension}", Uuid::new_v4());
        let destination = asset_dir.join(&file_name);

        if tokio::fs::copy(local_path, &destination).await.is_err() {
            tokio::fs::remove_file(&destination).await.ok();
            return None;
        }

        let duration_seconds = probe_duration(destination.clone()).await;

        let url = format!("{}/media/upload/v1/{file_name}", self.public_base_url);
        Some(MediaAsset {
            secure_url: url.clone(),
            url,
            duration_seconds,
        })
    }
}

#[async_trait]
impl MediaHost for LocalMediaHost {
    async fn upload(&self, local_path: &Path) -> Option<MediaAsset> {
        match tokio::time::timeout(self.upload_timeout, self.store(local_path)).await {
            Ok(asset) => asset,
            Err(_) => {
                tracing::warn!("Media upload timed out for {}", local_path.display());
                None
            }
        }
    }

    async fn delete(&self, asset_id: &str, resource_type: ResourceType) -> bool {
        let asset_dir = self.asset_dir();

        let Ok(mut entries) = tokio::fs::read_dir(&asset_dir).await else {
            return false;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let matches = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem == asset_id);

            if matches {
                let removed = tokio::fs::remove_file(&path).await.is_ok();
                if removed {
                    tracing::debug!(
                        "Deleted {} asset {asset_id} from media library",
                        resource_type.as_str()
                    );
                }
                return removed;
            }
        }

        false
    }
}

/// Duration via ffprobe; the binary call is blocking, and any failure
/// (missing binary, unparseable container) degrades to no duration rather
/// than failing the upload.
async fn probe_duration(path: PathBuf) -> Option<f64> {
    task::spawn_blocking(move || {
        ffprobe::ffprobe(&path)
            .ok()
            .and_then(|info| info.format.duration)
            .and_then(|d| d.parse::<f64>().ok())
    })
    .await
    .ok()
    .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(dir: &Path) -> LocalMediaHost {
        LocalMediaHost::new(
            dir.to_path_buf(),
            String::new(),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn upload_produces_versioned_url_and_keeps_extension() {
        let dir = std::env::temp_dir().join(format!("streamtube-media-{}", Uuid::new_v4()));
        let staged = dir.join("in.mp4");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(&staged, b"not a real video").await.unwrap();

        let asset = host(&dir).upload(&staged).await.expect("upload confirmed");

        assert!(asset.url.contains("/media/upload/v1/"));
        assert!(asset.url.ends_with(".mp4"));
        assert_eq!(asset.url, asset.secure_url);
        // Garbage bytes are unprobeable; that must not fail the upload.
        assert!(asset.duration_seconds.is_none() || asset.duration_seconds == Some(0.0));

        let id = super::super::extract_asset_id(&asset.url).unwrap();
        assert!(host(&dir).delete(&id, ResourceType::Video).await);
        assert!(!host(&dir).delete(&id, ResourceType::Video).await);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn missing_source_file_fails_as_none() {
        let dir = std::env::temp_dir().join(format!("streamtube-media-{}", Uuid::new_v4()));
        let asset = host(&dir).upload(Path::new("/nonexistent/file.mp4")).await;
        assert!(asset.is_none());
        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
