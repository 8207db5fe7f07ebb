use std::{
    borrow::Cow,
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    config::FontConfig,
    foundation::error::{TextBehindError, TextBehindResult},
};

/// One entry of the font picker offered to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontChoice {
    /// Label shown in the picker.
    pub name: &'static str,
    /// Family name stored on text layers and used for face lookup.
    pub family: &'static str,
}

/// Families offered by the editor's font picker, in display order.
pub const AVAILABLE_FONTS: &[FontChoice] = &[
    FontChoice { name: "Geist Sans", family: "Geist Sans" },
    FontChoice { name: "Arial", family: "Arial" },
    FontChoice { name: "Roboto", family: "Roboto" },
    FontChoice { name: "Open Sans", family: "Open Sans" },
    FontChoice { name: "Montserrat", family: "Montserrat" },
    FontChoice { name: "Merriweather", family: "Merriweather" },
    FontChoice { name: "Lobster", family: "Lobster" },
    FontChoice { name: "Pacifico", family: "Pacifico" },
    FontChoice { name: "Source Code Pro", family: "Source Code Pro" },
    FontChoice { name: "Barlow Condensed", family: "Barlow Condensed" },
    FontChoice { name: "Bebas Neue", family: "Bebas Neue" },
    FontChoice { name: "Bitter", family: "Bitter" },
    FontChoice { name: "Bungee", family: "Bungee" },
];

/// Glyph widths are approximated as half the font size when no face can shape the text.
pub const APPROX_GLYPH_WIDTH_EM: f64 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Index of a registered face inside a [`FontBook`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(pub(crate) usize);

/// Font file bytes shared between the layout and render sides.
pub type FontBytes = Arc<dyn AsRef<[u8]> + Send + Sync>;

#[derive(Clone, Debug)]
/// A registered font face.
pub struct FontFace {
    /// Family name reported by the font.
    pub family: String,
    /// Weight >= 600.
    pub bold: bool,
    /// Italic or oblique.
    pub italic: bool,
    /// Face index inside its font file.
    pub index: u32,
    db_id: fontdb::ID,
    source: usize,
}

/// One font file or in-memory font. File bytes are loaded when a face is first shaped.
struct FontSource {
    path: Option<PathBuf>,
    data: Option<FontBytes>,
    registered: bool,
}

/// Request for shaping one run of text.
#[derive(Clone, Copy, Debug)]
pub struct TextRequest<'a> {
    pub text: &'a str,
    pub family: &'a str,
    pub bold: bool,
    pub italic: bool,
    pub size_px: f32,
    pub brush: TextBrushRgba8,
}

/// Result of shaping: a Parley layout and the face its glyph ids refer to.
pub struct ShapedText {
    pub layout: parley::Layout<TextBrushRgba8>,
    pub face: FaceId,
    /// Bytes of the font file holding `face`.
    pub font: FontBytes,
    /// Face index inside `font`.
    pub index: u32,
    /// Number of laid-out lines.
    pub line_count: usize,
}

/// Registry of installed font faces plus the Parley contexts used to shape text.
///
/// Stands in for the web-font loader: families are looked up by name, and a missing family
/// falls back to the closest installed face. Discovery goes through `fontdb`, which only
/// reads face metadata; a font file is read (or mapped) when one of its faces is first
/// shaped, and those bytes are shared with the renderer.
pub struct FontBook {
    db: fontdb::Database,
    faces: Vec<FontFace>,
    sources: Vec<FontSource>,
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.faces.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl FontBook {
    /// An empty book; text can be measured approximately but not rasterized.
    pub fn new() -> Self {
        Self {
            db: fontdb::Database::new(),
            faces: Vec::new(),
            sources: Vec::new(),
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Index every face from the configured directories and, if enabled, the system fonts.
    ///
    /// Configured directories come first so their faces win style ties.
    #[tracing::instrument(skip(cfg))]
    pub fn load(cfg: &FontConfig) -> Self {
        let mut book = Self::new();
        for dir in &cfg.dirs {
            book.db.load_fonts_dir(dir);
        }
        if cfg.load_system {
            book.db.load_system_fonts();
        }
        book.index_new_faces();
        tracing::info!(
            faces = book.faces.len(),
            files = book.sources.len(),
            "font book loaded"
        );
        book
    }

    /// Index font files found under `dir` (recursively). Returns the number of faces added.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        self.db.load_fonts_dir(dir);
        self.index_new_faces().len()
    }

    /// Register raw font bytes, returning one [`FaceId`] per face found.
    pub fn register_bytes(&mut self, bytes: Vec<u8>) -> TextBehindResult<Vec<FaceId>> {
        let ids = self
            .db
            .load_font_source(fontdb::Source::Binary(Arc::new(bytes)));
        if ids.is_empty() {
            return Err(TextBehindError::validation(
                "no font faces found in font bytes",
            ));
        }
        Ok(self.index_new_faces())
    }

    fn index_new_faces(&mut self) -> Vec<FaceId> {
        let known: HashSet<fontdb::ID> = self.faces.iter().map(|f| f.db_id).collect();
        let mut added = Vec::new();
        for info in self.db.faces() {
            if known.contains(&info.id) {
                continue;
            }
            let Some((family, _)) = info.families.first() else {
                continue;
            };
            let source = match &info.source {
                fontdb::Source::File(path) | fontdb::Source::SharedFile(path, _) => {
                    source_index(&mut self.sources, |s| s.path.as_ref() == Some(path), || {
                        FontSource {
                            path: Some(path.clone()),
                            data: None,
                            registered: false,
                        }
                    })
                }
                fontdb::Source::Binary(data) => source_index(
                    &mut self.sources,
                    |s| s.data.as_ref().is_some_and(|d| Arc::ptr_eq(d, data)),
                    || FontSource {
                        path: None,
                        data: Some(data.clone()),
                        registered: false,
                    },
                ),
            };
            added.push(FaceId(self.faces.len()));
            self.faces.push(FontFace {
                family: family.clone(),
                bold: info.weight.0 >= 600,
                italic: info.style != fontdb::Style::Normal,
                index: info.index,
                db_id: info.id,
                source,
            });
        }
        added
    }

    /// Bytes of the file holding `id`, loaded on first use and registered with Parley once.
    fn face_bytes(&mut self, id: FaceId) -> TextBehindResult<FontBytes> {
        let face = self.face(id)?;
        let (db_id, source) = (face.db_id, face.source);
        let src = &self.sources[source];
        if src.registered
            && let Some(data) = &src.data
        {
            return Ok(data.clone());
        }

        let data: FontBytes = match &src.data {
            Some(data) => data.clone(),
            None => {
                let bytes = self
                    .db
                    .with_face_data(db_id, |data, _| data.to_vec())
                    .ok_or_else(|| {
                        TextBehindError::validation(format!(
                            "font file for {} is no longer readable",
                            self.faces[id.0].family
                        ))
                    })?;
                Arc::new(bytes)
            }
        };
        self.font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::new(data.clone()), None);
        tracing::debug!(
            family = %self.faces[id.0].family,
            bytes = (*data).as_ref().len(),
            "font file loaded"
        );
        let src = &mut self.sources[source];
        src.data = Some(data.clone());
        src.registered = true;
        Ok(data)
    }

    /// True when no face is registered.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Number of registered faces.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Registered face by id.
    pub fn face(&self, id: FaceId) -> TextBehindResult<&FontFace> {
        self.faces
            .get(id.0)
            .ok_or_else(|| TextBehindError::validation(format!("unknown font face {}", id.0)))
    }

    /// Sorted, de-duplicated family names.
    pub fn families(&self) -> Vec<String> {
        let mut out: Vec<String> = self.faces.iter().map(|f| f.family.clone()).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Whether any face of `family` (case-insensitive) is registered.
    pub fn has_family(&self, family: &str) -> bool {
        self.faces
            .iter()
            .any(|f| f.family.eq_ignore_ascii_case(family))
    }

    /// Closest installed face for the requested family and style.
    ///
    /// Exact family+style first, then any face of the family (preferring matching weight),
    /// then the first face that matches the style, then the first registered face.
    pub fn resolve(&self, family: &str, bold: bool, italic: bool) -> Option<FaceId> {
        let in_family = |f: &FontFace| f.family.eq_ignore_ascii_case(family);
        let score = |f: &FontFace| -> u8 {
            let mut s = 0;
            if in_family(f) {
                s += 4;
            }
            if f.bold == bold {
                s += 2;
            }
            if f.italic == italic {
                s += 1;
            }
            s
        };

        let best = self
            .faces
            .iter()
            .enumerate()
            // max_by_key keeps the last max; reverse so earlier registrations win ties.
            .rev()
            .max_by_key(|(_, f)| score(f))
            .map(|(i, _)| FaceId(i))?;

        if !in_family(&self.faces[best.0]) {
            tracing::debug!(
                requested = family,
                using = %self.faces[best.0].family,
                "font family not installed, using fallback"
            );
        }
        Some(best)
    }

    /// Shape `req.text` with the closest installed face.
    pub fn shape(&mut self, req: TextRequest<'_>) -> TextBehindResult<ShapedText> {
        if !req.size_px.is_finite() || req.size_px <= 0.0 {
            return Err(TextBehindError::validation(
                "text size must be finite and > 0",
            ));
        }
        let face_id = self
            .resolve(req.family, req.bold, req.italic)
            .ok_or_else(|| TextBehindError::validation("no fonts installed to render text"))?;
        let font = self.face_bytes(face_id)?;
        let face = &self.faces[face_id.0];
        let index = face.index;

        let weight = if face.bold {
            parley::style::FontWeight::BOLD
        } else {
            parley::style::FontWeight::NORMAL
        };
        let style = if face.italic {
            parley::style::FontStyle::Italic
        } else {
            parley::style::FontStyle::Normal
        };

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, req.text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(face.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(req.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(weight));
        builder.push_default(parley::style::StyleProperty::FontStyle(style));
        builder.push_default(parley::style::StyleProperty::Brush(req.brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(req.text);
        layout.break_all_lines(None);
        let line_count = layout.lines().count().max(1);

        Ok(ShapedText {
            layout,
            face: face_id,
            font,
            index,
            line_count,
        })
    }

    /// Unscaled text box `(width, height)` in pixels.
    ///
    /// Height follows a line height of one font size per line. Falls back to
    /// [`approx_text_box`] when the text cannot be shaped.
    pub fn measure(&mut self, req: TextRequest<'_>) -> (f64, f64) {
        if self.is_empty() {
            return approx_text_box(req.text, f64::from(req.size_px));
        }
        match self.shape(req) {
            Ok(shaped) => (
                f64::from(shaped.layout.width()),
                f64::from(req.size_px) * shaped.line_count as f64,
            ),
            Err(e) => {
                tracing::debug!("measure falls back to approximation: {e}");
                approx_text_box(req.text, f64::from(req.size_px))
            }
        }
    }
}

/// Approximate text box: half an em per character of the longest line, one em per line.
pub fn approx_text_box(text: &str, font_size: f64) -> (f64, f64) {
    let lines: Vec<&str> = text.split('\n').collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    (
        longest as f64 * font_size * APPROX_GLYPH_WIDTH_EM,
        lines.len().max(1) as f64 * font_size,
    )
}

fn source_index(
    sources: &mut Vec<FontSource>,
    matches: impl Fn(&FontSource) -> bool,
    create: impl FnOnce() -> FontSource,
) -> usize {
    match sources.iter().position(matches) {
        Some(idx) => idx,
        None => {
            sources.push(create());
            sources.len() - 1
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/fonts.rs"]
mod tests;
