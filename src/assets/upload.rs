use std::{path::Path, sync::Arc};

use anyhow::Context;

use crate::foundation::error::TextBehindResult;

/// A user-selected (or dropped) file, as handed to the studio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name, used to derive the export name.
    pub name: String,
    /// Declared MIME type, e.g. `image/png`.
    pub mime: String,
    pub bytes: Arc<Vec<u8>>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: Arc::new(bytes),
        }
    }

    /// Read a file from disk, guessing the MIME type from its extension.
    pub fn from_path(path: &Path) -> TextBehindResult<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read upload '{}'", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let mime = image::ImageFormat::from_path(path)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        Ok(Self::new(name, mime, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.mime
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name without its last extension; the whole name when there is none.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

pub(crate) fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}
