use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{export::renderer::ExportedImage, foundation::error::TextBehindResult};

/// Receives finished exports (the "download" step).
pub trait DownloadSink {
    fn deliver(&mut self, image: &ExportedImage) -> TextBehindResult<()>;
}

/// Writes exports into a directory, creating it on first use.
#[derive(Clone, Debug)]
pub struct DirectoryDownloads {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, oldest first.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl DownloadSink for DirectoryDownloads {
    fn deliver(&mut self, image: &ExportedImage) -> TextBehindResult<()> {
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create download directory '{}'", self.dir.display())
        })?;
        let path = self.dir.join(&image.file_name);
        std::fs::write(&path, &image.bytes)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "export saved");
        self.written.push(path);
        Ok(())
    }
}

/// Keeps exports in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryDownloads {
    pub images: Vec<ExportedImage>,
}

impl MemoryDownloads {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DownloadSink for MemoryDownloads {
    fn deliver(&mut self, image: &ExportedImage) -> TextBehindResult<()> {
        self.images.push(image.clone());
        Ok(())
    }
}
