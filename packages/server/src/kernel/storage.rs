//! Filesystem-backed image bucket.
//!
//! Objects live under `<root>/news-images/<path>` and are served by the
//! router's `/storage` static route.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::BaseImageStorage;

pub const IMAGE_BUCKET: &str = "news-images";

pub struct LocalImageStorage {
    bucket_dir: PathBuf,
    public_base_url: String,
}

impl LocalImageStorage {
    pub fn new(storage_root: impl AsRef<Path>, public_base_url: &str) -> Self {
        Self {
            bucket_dir: storage_root.as_ref().join(IMAGE_BUCKET),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !safe {
            bail!("invalid object path: {}", path);
        }
        Ok(self.bucket_dir.join(relative))
    }
}

#[async_trait]
impl BaseImageStorage for LocalImageStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("writing {}", target.display()))?;
        tracing::debug!(path, content_type, "stored image");
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .with_context(|| format!("removing {}", target.display()))?;
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/{}/{}", self.public_base_url, IMAGE_BUCKET, path)
    }
}
