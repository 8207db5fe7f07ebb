use crate::{
    assets::{decode::decode_bitmap, fonts::FontBook, upload::UploadFile},
    compose::interaction::{PointerDown, TransformUpdate},
    config::StudioConfig,
    export::{
        download::DownloadSink,
        renderer::{DATA_MISSING, EMPTY_EXPORT, ExportedImage, export_composition},
    },
    foundation::{
        core::Point,
        error::{TextBehindError, TextBehindResult},
    },
    layers::model::{LayerId, NewTextLayer, TextLayer, TextLayerPatch},
    render::{
        backend::{Compositor, Frame, RenderBackend, RenderSettings},
        cpu::CpuRenderer,
    },
    segment::remover::{BackgroundRemover, ProgressEvent, RemovalConfig},
    session::editor::EditingSession,
};

pub const PROCESSING_IMAGE: &str = "Processing image... This may take a moment.";
pub const REMOVING_BACKGROUND: &str = "Removing background...";
pub const PREPARING_EXPORT: &str = "Preparing high-quality export...";
pub const EXPORT_SUCCEEDED: &str = "Image exported successfully!";
pub const CANVAS_NOT_READY: &str = "Canvas is not ready yet.";

/// Which screen the studio shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Uploader,
    Editor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

/// Inline message shown under the uploader or the editor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub message: String,
}

impl StatusMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            message: message.into(),
        }
    }
}

/// Upload-to-export orchestration: the uploader, the editor session and the status line.
///
/// Every operation runs to completion on the caller's thread; `is_loading` is set for the
/// duration of an upload or export and re-entrant calls are rejected while it is set.
pub struct Studio {
    config: StudioConfig,
    fonts: FontBook,
    compositor: Compositor,
    view: ViewMode,
    loading: bool,
    status: Option<StatusMessage>,
    session: Option<EditingSession>,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("view", &self.view)
            .field("loading", &self.loading)
            .field("status", &self.status)
            .field("compositor", &self.compositor)
            .field("has_session", &self.session.is_some())
            .finish()
    }
}

impl Studio {
    pub fn new(config: StudioConfig, fonts: FontBook) -> Self {
        Self {
            config,
            fonts,
            compositor: Compositor::Uninitialized,
            view: ViewMode::Uploader,
            loading: false,
            status: None,
            session: None,
        }
    }

    /// Resolve the drawing capability; frames are placeholders until this is called.
    pub fn initialize_compositor(&mut self, settings: RenderSettings) {
        self.compositor.initialize(settings);
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn session(&self) -> Option<&EditingSession> {
        self.session.as_ref()
    }

    /// Decode the upload, remove its background and open the editor.
    ///
    /// On failure the error is shown as the status, the studio returns to the uploader and
    /// the error is also returned.
    #[tracing::instrument(skip_all, fields(file = %file.name, bytes = file.len()))]
    pub fn submit_upload(
        &mut self,
        file: UploadFile,
        remover: &dyn BackgroundRemover,
    ) -> TextBehindResult<()> {
        if self.loading {
            return Err(TextBehindError::validation(
                "an image is already being processed",
            ));
        }
        if file.len() as u64 > self.config.max_upload_bytes {
            tracing::warn!(
                limit = self.config.max_upload_bytes,
                "upload exceeds the advisory size limit"
            );
        }

        self.loading = true;
        self.status = Some(StatusMessage::success(PROCESSING_IMAGE));

        let removal = RemovalConfig {
            model: self.config.removal.model.clone(),
        };
        let result = open_session(file, remover, &removal, &self.config, &mut self.status);

        let outcome = match result {
            Ok(session) => {
                self.session = Some(session);
                self.view = ViewMode::Editor;
                self.status = None;
                tracing::info!("editor ready");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("image processing failed: {e}");
                self.status = Some(StatusMessage::error(e.user_message()));
                self.session = None;
                self.view = ViewMode::Uploader;
                Err(e)
            }
        };
        self.loading = false;
        outcome
    }

    /// Export the composition at native resolution and hand it to `sink`.
    ///
    /// The selection is detached while rendering and restored afterwards.
    #[tracing::instrument(skip_all)]
    pub fn export(&mut self, sink: &mut dyn DownloadSink) -> TextBehindResult<ExportedImage> {
        if self.loading {
            return Err(TextBehindError::validation(
                "another operation is in progress",
            ));
        }
        let Some(session) = self.session.as_mut().filter(|s| !s.layers().is_empty()) else {
            self.status = Some(StatusMessage::error(DATA_MISSING));
            return Err(TextBehindError::export(DATA_MISSING));
        };

        self.loading = true;
        self.status = Some(StatusMessage::success(PREPARING_EXPORT));

        let selected = session.selected();
        session.select(None);

        let mut scratch;
        let renderer: &mut dyn RenderBackend = match self.compositor.renderer() {
            Some(renderer) => renderer,
            None => {
                scratch = CpuRenderer::new(RenderSettings::default());
                &mut scratch
            }
        };
        let result = export_composition(
            &session.export_request(&self.config.export),
            &mut self.fonts,
            renderer,
        )
        .and_then(|image| {
            sink.deliver(&image)?;
            Ok(image)
        });

        session.select(selected);

        self.status = Some(match &result {
            Ok(_) => StatusMessage::success(EXPORT_SUCCEEDED),
            Err(TextBehindError::Export(m)) if m == EMPTY_EXPORT => StatusMessage::error(m),
            Err(e) => StatusMessage::error(format!("Export error: {}", e.user_message())),
        });
        self.loading = false;
        result
    }

    /// Current canvas frame, or a placeholder while the compositor or the images are missing.
    pub fn render_frame(&mut self) -> TextBehindResult<Frame> {
        let scene = self.session.as_ref().map(|s| s.scene(&mut self.fonts));
        let input = scene
            .as_ref()
            .zip(self.session.as_ref().map(EditingSession::images));
        self.compositor.render(input, &mut self.fonts)
    }

    /// Drop the session and go back to the uploader.
    pub fn reset(&mut self) {
        self.session = None;
        self.view = ViewMode::Uploader;
        self.status = None;
        self.loading = false;
    }

    fn editing(&mut self) -> TextBehindResult<&mut EditingSession> {
        self.session
            .as_mut()
            .ok_or_else(|| TextBehindError::validation("no image is open"))
    }

    pub fn add_layer(&mut self, initial: NewTextLayer) -> TextBehindResult<LayerId> {
        Ok(self.editing()?.add_layer(initial))
    }

    /// Text-panel edit: applies to the selected layer only.
    pub fn update_selected(&mut self, patch: &TextLayerPatch) -> bool {
        self.session
            .as_mut()
            .is_some_and(|s| s.update_selected(patch))
    }

    pub fn update_layer(&mut self, id: LayerId, patch: &TextLayerPatch) -> bool {
        self.session
            .as_mut()
            .is_some_and(|s| s.update_layer(id, patch))
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Option<TextLayer> {
        self.session.as_mut()?.remove_layer(id)
    }

    pub fn select(&mut self, id: Option<LayerId>) -> Option<LayerId> {
        self.session.as_mut()?.select(id)
    }

    /// Fails until the compositor is initialized. The other canvas events are no-ops until
    /// then.
    pub fn pointer_down(&mut self, p: Point) -> TextBehindResult<PointerDown> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| TextBehindError::validation("no image is open"))?;
        if !self.compositor.is_ready() {
            return Err(TextBehindError::validation(CANVAS_NOT_READY));
        }
        Ok(session.pointer_down(&mut self.fonts, p))
    }

    pub fn pointer_move(&mut self, p: Point) -> bool {
        self.compositor.is_ready() && self.session.as_mut().is_some_and(|s| s.pointer_move(p))
    }

    pub fn pointer_up(&mut self, p: Point) -> Option<LayerId> {
        if !self.compositor.is_ready() {
            return None;
        }
        self.session.as_mut()?.pointer_up(p)
    }

    pub fn drag_end(&mut self, id: LayerId, x: f64, y: f64) -> bool {
        self.compositor.is_ready() && self.session.as_mut().is_some_and(|s| s.drag_end(id, x, y))
    }

    pub fn transform_end(&mut self, id: LayerId, update: TransformUpdate) -> bool {
        self.compositor.is_ready()
            && self
                .session
                .as_mut()
                .is_some_and(|s| s.transform_end(id, update))
    }
}

fn open_session(
    file: UploadFile,
    remover: &dyn BackgroundRemover,
    removal: &RemovalConfig,
    config: &StudioConfig,
    status: &mut Option<StatusMessage>,
) -> TextBehindResult<EditingSession> {
    if !file.is_image() {
        return Err(TextBehindError::decode(format!(
            "Unsupported file type \"{}\". Please upload an image.",
            file.mime
        )));
    }
    let original = decode_bitmap(file.bytes.as_slice())?;
    tracing::debug!(
        width = original.width(),
        height = original.height(),
        "original decoded"
    );

    *status = Some(StatusMessage::success(REMOVING_BACKGROUND));
    let mut on_progress = |event: &ProgressEvent| {
        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = event.total,
            percent = event.percent(),
            "removal progress"
        );
        if event.is_model_download() {
            *status = Some(StatusMessage::success(format!(
                "Preparing AI Model: {}%",
                event.percent()
            )));
        }
    };
    let cutout_bytes = remover.remove_background(&file, removal, &mut on_progress)?;
    let cutout = decode_bitmap(&cutout_bytes)?;

    EditingSession::open(file, original, cutout, &config.viewport)
}

#[cfg(test)]
#[path = "../../tests/unit/session/studio.rs"]
mod tests;
