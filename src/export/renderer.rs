use crate::{
    assets::{decode::Bitmap, fonts::FontBook, upload},
    compose::scene::Scene,
    config::{ExportFormat, ExportSettings},
    foundation::{
        core::CanvasSize,
        error::{TextBehindError, TextBehindResult},
        math::flatten_premul_over,
    },
    layers::model::TextLayer,
    render::backend::{FrameRGBA, RenderBackend, SceneImages},
};

/// Appended to the upload's base name.
pub const EXPORT_SUFFIX: &str = "-textBehind";
/// Encoded results must be longer than this to count as an image.
pub const MIN_EXPORT_BYTES: usize = 100;

pub const DATA_MISSING: &str = "Cannot export. Data missing.";
pub const EMPTY_EXPORT: &str = "Failed to generate image (empty data).";

/// Everything an export needs, borrowed from the editing session.
#[derive(Clone, Copy, Debug)]
pub struct ExportRequest<'a> {
    pub original: Option<&'a Bitmap>,
    pub cutout: Option<&'a Bitmap>,
    /// Size of the on-screen canvas the layer coordinates refer to.
    pub display: Option<CanvasSize>,
    pub layers: &'a [TextLayer],
    pub upload_name: &'a str,
    pub settings: &'a ExportSettings,
}

/// Encoded export ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportedImage {
    pub file_name: String,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// `<base>-textBehind.<ext>`, where `<base>` drops the last extension of `upload_name`.
pub fn export_file_name(upload_name: &str, format: ExportFormat) -> String {
    format!(
        "{}{EXPORT_SUFFIX}.{}",
        upload::base_name(upload_name),
        format.extension()
    )
}

/// Factor from display-canvas pixels to native image pixels.
pub fn scale_factor(native_width: u32, display_width: u32) -> f64 {
    f64::from(native_width) / f64::from(display_width)
}

/// Render the composition at the original image's native resolution and encode it.
///
/// Positions and font sizes are scaled from display to native pixels; rotation and scale
/// factors carry over unchanged. No selection frame is drawn.
#[tracing::instrument(skip_all, fields(layers = req.layers.len()))]
pub fn export_composition(
    req: &ExportRequest<'_>,
    fonts: &mut FontBook,
    renderer: &mut dyn RenderBackend,
) -> TextBehindResult<ExportedImage> {
    let (Some(original), Some(cutout), Some(display)) = (req.original, req.cutout, req.display)
    else {
        return Err(TextBehindError::export(DATA_MISSING));
    };
    if display.is_empty() || req.layers.is_empty() {
        return Err(TextBehindError::export(DATA_MISSING));
    }

    let native = original.size();
    let scale = scale_factor(native.width, display.width);
    let display_w = display.width;
    tracing::debug!(
        native_w = native.width,
        native_h = native.height,
        display_w,
        scale,
        "export scale"
    );

    let scene = Scene::composition(native, req.layers.iter().map(|l| l.scaled(scale)));
    let frame = renderer.render_scene(&scene, SceneImages { original, cutout }, fonts)?;
    if frame.width == 0 || frame.height == 0 || frame.data.is_empty() {
        return Err(TextBehindError::export(EMPTY_EXPORT));
    }

    let bytes = encode_frame(&frame, req.settings)?;
    if bytes.len() <= MIN_EXPORT_BYTES {
        return Err(TextBehindError::export(EMPTY_EXPORT));
    }

    let file_name = export_file_name(req.upload_name, req.settings.format);
    tracing::info!(file = %file_name, bytes = bytes.len(), "export encoded");
    Ok(ExportedImage {
        file_name,
        mime: req.settings.format.mime(),
        width: frame.width,
        height: frame.height,
        bytes,
    })
}

/// Encode a rendered frame. JPEG output is flattened over the configured background.
pub fn encode_frame(frame: &FrameRGBA, settings: &ExportSettings) -> TextBehindResult<Vec<u8>> {
    let mut buf = Vec::new();
    match settings.format {
        ExportFormat::Jpeg => {
            let mut rgb = Vec::with_capacity(frame.width as usize * frame.height as usize * 3);
            for px in frame.data.chunks_exact(4) {
                let px = [px[0], px[1], px[2], px[3]];
                let px = if frame.premultiplied {
                    px
                } else {
                    premultiply(px)
                };
                rgb.extend_from_slice(&flatten_premul_over(px, settings.background));
            }
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, settings.quality)
                .encode(&rgb, frame.width, frame.height, image::ExtendedColorType::Rgb8)
                .map_err(|e| TextBehindError::export(format!("encode jpeg: {e}")))?;
        }
        ExportFormat::Png => {
            frame
                .to_rgba_image()?
                .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
                .map_err(|e| TextBehindError::export(format!("encode png: {e}")))?;
        }
    }
    Ok(buf)
}

fn premultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    let m = |c: u8| crate::foundation::math::mul_div255_u8(u16::from(c), u16::from(a));
    [m(r), m(g), m(b), a]
}

#[cfg(test)]
#[path = "../../tests/unit/export/renderer.rs"]
mod tests;
