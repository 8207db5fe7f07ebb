use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{TextBehindError, TextBehindResult};

/// Uploads above this size are accepted but logged as exceeding the advisory limit.
pub const ADVISORY_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Top-level configuration of the editor studio.
///
/// Every field has a default, so `{}` is a valid configuration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudioConfig {
    pub viewport: ViewportConfig,
    pub removal: RemovalSettings,
    pub export: ExportSettings,
    pub fonts: FontConfig,
    /// Advisory upload size limit in bytes; not enforced.
    pub max_upload_bytes: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            removal: RemovalSettings::default(),
            export: ExportSettings::default(),
            fonts: FontConfig::default(),
            max_upload_bytes: ADVISORY_UPLOAD_BYTES,
        }
    }
}

/// On-screen constraints used to derive the display canvas size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewportConfig {
    /// Width of the element hosting the canvas, if known.
    pub container_width: Option<u32>,
    /// Horizontal padding subtracted from `container_width`.
    pub padding: u32,
    /// Width cap used when the container width is unknown.
    pub fallback_canvas_width: u32,
    /// Height cap applied after the width fit.
    pub max_canvas_height: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            container_width: None,
            padding: 40,
            fallback_canvas_width: 600,
            max_canvas_height: 500,
        }
    }
}

/// Background-removal settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemovalSettings {
    /// Model-selection key forwarded to the remover.
    pub model: String,
    /// External segmentation program and arguments, with `{input}`, `{output}` and `{model}`
    /// placeholders.
    pub command: Option<Vec<String>>,
}

impl Default for RemovalSettings {
    fn default() -> Self {
        Self {
            model: "isnet_fp16".to_string(),
            command: None,
        }
    }
}

/// Raster format used for exports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Jpeg,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Export encoding settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// JPEG quality, 1..=100.
    pub quality: u8,
    /// Straight RGB color that transparent pixels are flattened onto.
    pub background: [u8; 3],
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jpeg,
            quality: 100,
            background: [0, 0, 0],
        }
    }
}

/// Where fonts are loaded from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontConfig {
    pub dirs: Vec<PathBuf>,
    pub load_system: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            load_system: true,
        }
    }
}

impl StudioConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(s: &str) -> TextBehindResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| TextBehindError::validation(format!("invalid config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: &Path) -> TextBehindResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    /// Apply `TEXTBEHIND_FONT_DIR` and `TEXTBEHIND_REMOVER_MODEL` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os("TEXTBEHIND_FONT_DIR") {
            self.fonts.dirs.push(PathBuf::from(dir));
        }
        if let Ok(model) = std::env::var("TEXTBEHIND_REMOVER_MODEL")
            && !model.trim().is_empty()
        {
            self.removal.model = model;
        }
        self
    }

    pub fn validate(&self) -> TextBehindResult<()> {
        if self.export.quality == 0 || self.export.quality > 100 {
            return Err(TextBehindError::validation(
                "export quality must be in 1..=100",
            ));
        }
        if self.viewport.fallback_canvas_width == 0 || self.viewport.max_canvas_height == 0 {
            return Err(TextBehindError::validation(
                "viewport canvas limits must be > 0",
            ));
        }
        if let Some(cmd) = &self.removal.command
            && cmd.is_empty()
        {
            return Err(TextBehindError::validation(
                "removal command must name a program",
            ));
        }
        Ok(())
    }
}
