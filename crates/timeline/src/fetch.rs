//! Fetch remote assets to local files.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

use versereel_common::{GenerationError, GenerationResult, ProviderConfig};

use crate::provider::USER_AGENT;

/// Downloads a URL to a local path.
///
/// Failures of any kind (transport, status, disk) are reported the same
/// way: `false`, with the cause logged. Callers decide what a failed fetch
/// means for them.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, url: &str, dest: &Path) -> bool;
}

/// [`AssetFetcher`] over HTTP, streaming the body to disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &ProviderConfig) -> GenerationResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.download_timeout_secs))
            .build()
            .map_err(|e| GenerationError::worker(format!("HTTP client setup failed: {e}")))?;
        Ok(Self { client })
    }

    fn try_fetch(&self, url: &str, dest: &Path) -> Result<u64, String> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let mut response = self.client.get(url).send().map_err(|e| e.to_string())?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("status {status}"));
        }

        // Write beside the destination and rename, so a failed transfer
        // never leaves a truncated file under the final name.
        let partial = partial_path(dest);
        let result = (|| {
            let mut writer = BufWriter::new(File::create(&partial).map_err(|e| e.to_string())?);
            let bytes = response.copy_to(&mut writer).map_err(|e| e.to_string())?;
            writer
                .into_inner()
                .map_err(|e| e.to_string())?
                .sync_all()
                .map_err(|e| e.to_string())?;
            std::fs::rename(&partial, dest).map_err(|e| e.to_string())?;
            Ok(bytes)
        })();

        if result.is_err() {
            let _ = std::fs::remove_file(&partial);
        }
        result
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

impl AssetFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> bool {
        match self.try_fetch(url, dest) {
            Ok(bytes) => {
                tracing::debug!(url, path = %dest.display(), bytes, "Downloaded asset");
                true
            }
            Err(reason) => {
                tracing::warn!(url, path = %dest.display(), reason = %reason, "Download failed");
                false
            }
        }
    }
}

/// [`AssetFetcher`] that copies local files, for `file://` URLs and plain paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl AssetFetcher for LocalFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> bool {
        let source = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if let Some(parent) = dest.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return false;
            }
        }
        match std::fs::copy(source, dest) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "Local copy failed");
                false
            }
        }
    }
}

/// Routes `http(s)://` URLs to HTTP and everything else to the local copier.
#[derive(Debug, Clone)]
pub struct RoutingFetcher {
    http: HttpFetcher,
    local: LocalFetcher,
}

impl RoutingFetcher {
    pub fn new(config: &ProviderConfig) -> GenerationResult<Self> {
        Ok(Self {
            http: HttpFetcher::new(config)?,
            local: LocalFetcher,
        })
    }
}

impl AssetFetcher for RoutingFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> bool {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.http.fetch(url, dest)
        } else {
            self.local.fetch(url, dest)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/x/audio_001_001.mp3")),
            PathBuf::from("/tmp/x/audio_001_001.mp3.part")
        );
    }

    #[test]
    fn test_local_fetcher_copies_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bg.mp4");
        std::fs::write(&src, b"video").unwrap();
        let dest = dir.path().join("work").join("background.mp4");

        assert!(LocalFetcher.fetch(&format!("file://{}", src.display()), &dest));
        assert_eq!(std::fs::read(&dest).unwrap(), b"video");
    }

    #[test]
    fn test_local_fetcher_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!LocalFetcher.fetch("/definitely/not/here.mp4", &dir.path().join("x")));
    }

    #[test]
    fn test_http_fetcher_unreachable_host_returns_false() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpFetcher::new(&ProviderConfig {
            download_timeout_secs: 2,
            ..ProviderConfig::default()
        })
        .unwrap();
        let dest = dir.path().join("a.mp3");
        assert!(!fetcher.fetch("http://127.0.0.1:9/nothing.mp3", &dest));
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
