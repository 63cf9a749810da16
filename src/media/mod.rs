//! Media-hosting collaborator boundary.
//!
//! The core only ever sees this trait: uploads either confirm with an
//! asset or come back as `None`, and deletes are best-effort booleans.
//! Nothing on this boundary is allowed to propagate an error into a
//! request handler.

use std::path::Path;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

mod local;
mod staging;

pub use local::LocalMediaHost;
pub use staging::StagedFile;

/// Result of a confirmed upload.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub url: String,
    pub secure_url: String,
    /// Probed media duration; absent for images or unprobeable files.
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Image,
    Video,
}

impl ResourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload a locally staged file. `None` means the upload failed; this
    /// boundary never surfaces an error value.
    async fn upload(&self, local_path: &Path) -> Option<MediaAsset>;

    /// Best-effort removal of a previously uploaded asset.
    async fn delete(&self, asset_id: &str, resource_type: ResourceType) -> bool;
}

static ASSET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/upload/v\d+/(.+)\.\w+$").expect("asset id pattern"));

/// Pull the asset id out of a stored media URL: the path segment after
/// `/upload/v<version>/` and before the extension. URLs that do not match
/// produce `None`, which callers treat as a silent skip.
#[must_use]
pub fn extract_asset_id(url: &str) -> Option<String> {
    ASSET_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_versioned_upload_urls() {
        assert_eq!(
            extract_asset_id("https://cdn.example.com/media/upload/v1/abc123.mp4"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_asset_id("/media/upload/v42/folder/asset-9.png"),
            Some("folder/asset-9".to_string())
        );
    }

    #[test]
    fn non_matching_urls_are_a_silent_skip() {
        assert_eq!(extract_asset_id(""), None);
        assert_eq!(extract_asset_id("https://example.com/plain.mp4"), None);
        assert_eq!(extract_asset_id("/upload/abc.mp4"), None);
        assert_eq!(extract_asset_id("/upload/v1/no-extension"), None);
    }
}
