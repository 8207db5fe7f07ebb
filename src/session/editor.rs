use crate::{
    assets::{decode::Bitmap, fonts::FontBook, upload::UploadFile},
    compose::{
        interaction::{self, Interaction, PointerDown, TransformUpdate},
        layout::{center_layer, fit_canvas},
        scene::{Scene, build_scene},
    },
    config::{ExportSettings, ViewportConfig},
    export::renderer::ExportRequest,
    foundation::{
        core::{CanvasSize, Point},
        error::TextBehindResult,
    },
    layers::{
        model::{LayerId, NewTextLayer, TextLayer, TextLayerPatch},
        store::TextLayerStore,
    },
    render::backend::SceneImages,
};

/// One opened image: both bitmaps, the display canvas, the text layers and the pointer state.
#[derive(Debug)]
pub struct EditingSession {
    upload: UploadFile,
    original: Bitmap,
    cutout: Bitmap,
    canvas: CanvasSize,
    store: TextLayerStore,
    interaction: Interaction,
}

impl EditingSession {
    /// Fit the canvas to the viewport and add the default layer, centered and selected.
    pub fn open(
        upload: UploadFile,
        original: Bitmap,
        cutout: Bitmap,
        viewport: &ViewportConfig,
    ) -> TextBehindResult<Self> {
        let native = original.size();
        let canvas = fit_canvas(native, viewport)?;

        let mut store = TextLayerStore::new();
        let id = store.add_layer(NewTextLayer::default_for_image(original.height()));
        if let Some(layer) = store.get(id) {
            let p = center_layer(layer, canvas);
            store.update_layer(id, &TextLayerPatch::position(p.x, p.y));
        }

        tracing::info!(
            native_w = native.width,
            native_h = native.height,
            canvas_w = canvas.width,
            canvas_h = canvas.height,
            "editing session opened"
        );
        Ok(Self {
            upload,
            original,
            cutout,
            canvas,
            store,
            interaction: Interaction::new(),
        })
    }

    pub fn upload(&self) -> &UploadFile {
        &self.upload
    }

    pub fn original(&self) -> &Bitmap {
        &self.original
    }

    pub fn cutout(&self) -> &Bitmap {
        &self.cutout
    }

    /// Display canvas size.
    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn store(&self) -> &TextLayerStore {
        &self.store
    }

    pub fn layers(&self) -> &[TextLayer] {
        self.store.layers()
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.store.selected()
    }

    pub fn current_layer(&self) -> Option<&TextLayer> {
        self.store.current_layer()
    }

    pub fn add_layer(&mut self, initial: NewTextLayer) -> LayerId {
        self.store.add_layer(initial)
    }

    pub fn update_layer(&mut self, id: LayerId, patch: &TextLayerPatch) -> bool {
        self.store.update_layer(id, patch)
    }

    /// Apply `patch` to the selected layer; false when nothing is selected.
    pub fn update_selected(&mut self, patch: &TextLayerPatch) -> bool {
        match self.store.selected() {
            Some(id) => self.store.update_layer(id, patch),
            None => false,
        }
    }

    /// Change the selection, abandoning any gesture in flight.
    pub fn select(&mut self, id: Option<LayerId>) -> Option<LayerId> {
        self.interaction.cancel();
        self.store.select_layer(id)
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Option<TextLayer> {
        if self.interaction.gesture().is_some_and(|g| g.layer == id) {
            self.interaction.cancel();
        }
        self.store.remove_layer(id)
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn pointer_down(&mut self, fonts: &mut FontBook, p: Point) -> PointerDown {
        self.interaction.pointer_down(&mut self.store, fonts, p)
    }

    pub fn pointer_move(&mut self, p: Point) -> bool {
        self.interaction.pointer_move(p)
    }

    pub fn pointer_up(&mut self, p: Point) -> Option<LayerId> {
        self.interaction.pointer_up(&mut self.store, p)
    }

    pub fn drag_end(&mut self, id: LayerId, x: f64, y: f64) -> bool {
        interaction::drag_end(&mut self.store, id, x, y)
    }

    pub fn transform_end(&mut self, id: LayerId, update: TransformUpdate) -> bool {
        interaction::transform_end(&mut self.store, id, update)
    }

    /// On-screen scene, including the selection frame.
    pub fn scene(&self, fonts: &mut FontBook) -> Scene {
        build_scene(self.canvas, &self.store, &self.interaction, fonts)
    }

    pub fn images(&self) -> SceneImages<'_> {
        SceneImages {
            original: &self.original,
            cutout: &self.cutout,
        }
    }

    pub fn export_request<'a>(&'a self, settings: &'a ExportSettings) -> ExportRequest<'a> {
        ExportRequest {
            original: Some(&self.original),
            cutout: Some(&self.cutout),
            display: Some(self.canvas),
            layers: self.store.layers(),
            upload_name: &self.upload.name,
            settings,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/editor.rs"]
mod tests;
