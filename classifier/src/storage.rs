use crate::config::StorageConfig;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to fetch {url}: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("Object store returned {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Object {0} is empty")]
    EmptyObject(String),
    #[error("Failed to read cached object {path}: {source}")]
    Cache {
        path: String,
        source: std::io::Error,
    },
}

/// Where a fetched artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Remote,
}

/// Read-only client for objects addressed as `{endpoint}/{bucket}/{key}`.
pub struct ObjectStore {
    client: reqwest::Client,
    config: StorageConfig,
}

impl ObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Returns the object bytes, preferring the local cache when one is configured.
    /// An empty cached file is treated as stale and downloaded again.
    pub async fn fetch(&self) -> Result<(Bytes, Origin), StorageError> {
        if let Some(path) = self.config.cache_path() {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                tracing::info!("Loading model artifact from cache {:?}", path);
                let data = tokio::fs::read(&path)
                    .await
                    .map_err(|source| StorageError::Cache {
                        path: path.display().to_string(),
                        source,
                    })?;
                if !data.is_empty() {
                    return Ok((Bytes::from(data), Origin::Cache));
                }
                tracing::warn!("Cached model artifact {:?} is empty, downloading it again", path);
            }
        }

        Ok((self.refresh().await?, Origin::Remote))
    }

    /// Downloads the object and replaces the cached copy, ignoring what the cache holds.
    pub async fn refresh(&self) -> Result<Bytes, StorageError> {
        let data = self.download().await?;

        if let Some(path) = self.config.cache_path() {
            if let Err(e) = write_cache(&path, &data).await {
                tracing::warn!("Failed to cache model artifact at {:?}: {}", path, e);
            }
        }

        Ok(data)
    }

    async fn download(&self) -> Result<Bytes, StorageError> {
        let url = self.config.object_url();
        tracing::info!(
            bucket = %self.config.bucket,
            key = %self.config.key,
            "Downloading model artifact from {}",
            url
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| StorageError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::Status { url, status });
        }

        let data = response
            .bytes()
            .await
            .map_err(|source| StorageError::Request {
                url: url.clone(),
                source,
            })?;
        if data.is_empty() {
            return Err(StorageError::EmptyObject(url));
        }

        tracing::info!("Downloaded {} bytes", data.len());
        Ok(data)
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    PathBuf::from(partial)
}

/// Writes next to the target and renames into place, so the cache path only
/// ever holds a complete download.
async fn write_cache(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let partial = partial_path(path);
    if let Err(e) = tokio::fs::write(&partial, data).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    tokio::fs::rename(&partial, path).await
}
