//! File downloader for HTTP/HTTPS archives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::ProgressManager;
use crate::error::Result;
use crate::http::HttpClient;

use super::archive::ArchiveExtractor;

/// Downloads archives over HTTP and unpacks them
pub struct FileDownloader {
    http_client: Arc<HttpClient>,
    progress: Option<Arc<ProgressManager>>,
}

impl FileDownloader {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self {
            http_client,
            progress: None,
        }
    }

    /// Show a download bar for every transfer
    pub fn with_progress(mut self, progress: Arc<ProgressManager>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Download a file to the specified path
    pub async fn download(&self, url: &str, dest: &Path, label: &str) -> Result<u64> {
        let bar = self
            .progress
            .as_ref()
            .map(|p| p.create_download_bar(label, 0));

        let result = self
            .http_client
            .download(
                url,
                dest,
                bar.as_ref().map(|pb| {
                    move |downloaded: u64, total: u64| {
                        if total > 0 {
                            pb.set_length(total);
                        }
                        pb.set_position(downloaded);
                    }
                }),
            )
            .await;

        if let Some(pb) = bar {
            pb.finish_and_clear();
        }

        Ok(result?)
    }

    /// Download an archive into a temp file inside `staging_dir`, unpack it
    /// there and return the directory the archive expanded into.
    ///
    /// The downloaded archive is removed on every path out of this function.
    pub async fn download_and_extract(&self, url: &str, staging_dir: &Path, label: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(staging_dir).await?;

        let archive = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(staging_dir)?;
        let archive_path = archive.path().to_path_buf();

        let size = self.download(url, &archive_path, label).await?;
        log::debug!("Downloaded {} bytes from {}", size, url);

        let extract_dir = staging_dir.join("extracted");
        let extract_target = extract_dir.clone();
        tokio::task::spawn_blocking(move || ArchiveExtractor::extract(&archive_path, &extract_target))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;

        drop(archive);

        ArchiveExtractor::single_top_level_dir(&extract_dir)
    }
}
