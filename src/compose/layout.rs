use crate::{
    assets::fonts::{FontBook, TextBrushRgba8, TextRequest, approx_text_box},
    config::ViewportConfig,
    foundation::{
        core::{CanvasSize, Point},
        error::{TextBehindError, TextBehindResult},
    },
    layers::model::TextLayer,
};

/// Unscaled size of a layer's text box in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBox {
    pub width: f64,
    pub height: f64,
}

impl TextBox {
    /// Approximate box: half an em per character, one em per line.
    pub fn approximate(layer: &TextLayer) -> Self {
        let (width, height) = approx_text_box(&layer.text, layer.font_size);
        Self { width, height }
    }

    /// Box measured with the closest installed face, or [`TextBox::approximate`] when no
    /// face can shape the text.
    pub fn measure(layer: &TextLayer, fonts: &mut FontBook) -> Self {
        if layer.text.is_empty() || !layer.font_size.is_finite() || layer.font_size <= 0.0 {
            return Self::approximate(layer);
        }
        let (width, height) = fonts.measure(TextRequest {
            text: &layer.text,
            family: &layer.font_family,
            bold: layer.is_bold(),
            italic: layer.is_italic(),
            size_px: layer.font_size as f32,
            brush: TextBrushRgba8::default(),
        });
        Self { width, height }
    }
}

/// Display size for an image of `native` size inside the configured viewport.
///
/// The width is capped by the container (minus padding) or, when the container is unknown,
/// by the fallback width; the height is then capped and the width follows the aspect ratio.
pub fn fit_canvas(native: CanvasSize, viewport: &ViewportConfig) -> TextBehindResult<CanvasSize> {
    if native.is_empty() {
        return Err(TextBehindError::validation(
            "canvas not ready: image has no dimensions",
        ));
    }
    let aspect = native.aspect();
    let native_w = f64::from(native.width);

    let available = viewport
        .container_width
        .map(|w| i64::from(w) - i64::from(viewport.padding))
        .filter(|w| *w > 0);
    let mut w = match available {
        Some(avail) => native_w.min(avail as f64),
        None => native_w.min(f64::from(viewport.fallback_canvas_width)),
    };
    let mut h = w / aspect;

    let max_h = f64::from(viewport.max_canvas_height);
    if h > max_h {
        h = max_h;
        w = h * aspect;
    }

    CanvasSize::new((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Top-left position that centers the layer's approximate text box on the canvas.
pub fn center_layer(layer: &TextLayer, canvas: CanvasSize) -> Point {
    let text_width = layer.text.chars().count() as f64 * layer.font_size * 0.5;
    Point::new(
        ((f64::from(canvas.width) - text_width) / 2.0).round(),
        ((f64::from(canvas.height) - layer.font_size) / 2.0).round(),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/compose/layout.rs"]
mod tests;
