use crate::{
    assets::fonts::FontBook,
    compose::{
        interaction::{FrameGeometry, Interaction, TransformUpdate},
        layout::TextBox,
    },
    foundation::core::CanvasSize,
    layers::{
        model::{LayerId, TextLayer},
        store::TextLayerStore,
    },
};

/// Which of the two session bitmaps an image draw refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageRole {
    Original,
    Cutout,
}

/// Selection frame drawn around the selected layer.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionFrame {
    pub layer: LayerId,
    pub geometry: FrameGeometry,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// Bitmap stretched over the whole canvas. Never hit-tested.
    Image(ImageRole),
    /// Text layer with its effective geometry.
    Text(TextLayer),
    Selection(SelectionFrame),
}

/// Ordered draw list for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub size: CanvasSize,
    pub ops: Vec<DrawOp>,
}

impl Scene {
    /// Original, then every text layer in order, then the cutout on top.
    pub fn composition<I>(size: CanvasSize, layers: I) -> Self
    where
        I: IntoIterator<Item = TextLayer>,
    {
        let mut ops = vec![DrawOp::Image(ImageRole::Original)];
        ops.extend(layers.into_iter().map(DrawOp::Text));
        ops.push(DrawOp::Image(ImageRole::Cutout));
        Self { size, ops }
    }

    pub fn text_layers(&self) -> impl Iterator<Item = &TextLayer> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text(layer) => Some(layer),
            _ => None,
        })
    }

    pub fn selection(&self) -> Option<&SelectionFrame> {
        self.ops.iter().find_map(|op| match op {
            DrawOp::Selection(frame) => Some(frame),
            _ => None,
        })
    }
}

/// Build the on-screen scene from the current editing state.
///
/// In-flight gestures are shown through their preview geometry. The selection frame is
/// drawn last so it stays visible above the cutout.
pub fn build_scene(
    canvas: CanvasSize,
    store: &TextLayerStore,
    interaction: &Interaction,
    fonts: &mut FontBook,
) -> Scene {
    let effective = |layer: &TextLayer| -> TextLayer {
        let mut layer = layer.clone();
        if let Some(preview) = interaction.preview_for(layer.id) {
            preview.apply_to(&mut layer);
        }
        layer
    };

    let mut scene = Scene::composition(canvas, store.layers().iter().map(effective));

    if let Some(selected) = store.current_layer() {
        let layer = effective(selected);
        let text = TextBox::measure(&layer, fonts);
        scene.ops.push(DrawOp::Selection(SelectionFrame {
            layer: layer.id,
            geometry: FrameGeometry::new(&TransformUpdate::of(&layer), text),
        }));
    }

    tracing::trace!(ops = scene.ops.len(), "scene built");
    scene
}

#[cfg(test)]
#[path = "../../tests/unit/compose/scene.rs"]
mod tests;
