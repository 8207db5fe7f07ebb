use std::sync::Arc;

use crate::{
    assets::{
        decode::Bitmap,
        fonts::{FontBook, FontBytes, TextBrushRgba8, TextRequest},
    },
    compose::{
        interaction::{ANCHOR_SIZE, FrameGeometry},
        scene::{DrawOp, Scene, SelectionFrame},
    },
    foundation::{
        color::FillColor,
        core::{Affine, BezPath, Point},
        error::{TextBehindError, TextBehindResult},
    },
    layers::model::TextLayer,
    render::backend::{FrameRGBA, RenderBackend, RenderSettings, SceneImages},
};

/// Selection frame stroke color, `rgb(0, 161, 255)`.
const SELECTION_RGB: [u8; 3] = [0, 161, 255];
const SELECTION_DASH: [f64; 2] = [6.0, 2.0];
const IMAGE_CACHE_CAPACITY: usize = 4;

/// Software rasterizer built on `vello_cpu`.
///
/// Bitmap paints and font data are cached across frames; both caches hold the shared
/// buffers they were built from, so a cache hit always refers to the same pixels.
pub struct CpuRenderer {
    settings: RenderSettings,
    image_cache: Vec<(Arc<Vec<u8>>, vello_cpu::Image)>,
    font_cache: Vec<(FontBytes, u32, vello_cpu::peniko::FontData)>,
}

impl CpuRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            image_cache: Vec::new(),
            font_cache: Vec::new(),
        }
    }
}

impl RenderBackend for CpuRenderer {
    fn render_scene(
        &mut self,
        scene: &Scene,
        images: SceneImages<'_>,
        fonts: &mut FontBook,
    ) -> TextBehindResult<FrameRGBA> {
        let width: u16 = scene
            .size
            .width
            .try_into()
            .map_err(|_| TextBehindError::validation("surface width exceeds u16"))?;
        let height: u16 = scene
            .size
            .height
            .try_into()
            .map_err(|_| TextBehindError::validation("surface height exceeds u16"))?;

        let mut pixmap = vello_cpu::Pixmap::new(width, height);
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        let (w, h) = (f64::from(width), f64::from(height));

        if let Some([r, g, b, a]) = self.settings.clear_rgba {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
        }

        for op in &scene.ops {
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            match op {
                DrawOp::Image(role) => {
                    let bitmap = images.get(*role);
                    let paint = self.image_paint_for(bitmap)?;
                    let (iw, ih) = (f64::from(bitmap.width()), f64::from(bitmap.height()));
                    ctx.set_transform(affine_to_cpu(Affine::scale_non_uniform(
                        w / iw,
                        h / ih,
                    )));
                    ctx.set_paint(paint);
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, iw, ih));
                }
                DrawOp::Text(layer) => self.draw_text(&mut ctx, layer, fonts)?,
                DrawOp::Selection(frame) => draw_selection(&mut ctx, frame),
            }
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRGBA {
            width: scene.size.width,
            height: scene.size.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

impl CpuRenderer {
    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        layer: &TextLayer,
        fonts: &mut FontBook,
    ) -> TextBehindResult<()> {
        if layer.text.is_empty() {
            return Ok(());
        }
        let fill = layer.fill_color().unwrap_or_else(|e| {
            tracing::warn!(id = %layer.id, "unusable fill, drawing black: {e}");
            FillColor::rgba(0, 0, 0, 255)
        });

        let shaped = fonts.shape(TextRequest {
            text: &layer.text,
            family: &layer.font_family,
            bold: layer.is_bold(),
            italic: layer.is_italic(),
            size_px: layer.font_size as f32,
            brush: TextBrushRgba8 {
                r: fill.r,
                g: fill.g,
                b: fill.b,
                a: fill.a,
            },
        })?;
        let font = self.font_data_for(&shaped.font, shaped.index);

        ctx.set_transform(affine_to_cpu(layer.transform().to_affine()));
        for line in shaped.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }

    fn image_paint_for(&mut self, bitmap: &Bitmap) -> TextBehindResult<vello_cpu::Image> {
        if let Some((_, paint)) = self
            .image_cache
            .iter()
            .find(|(data, _)| Arc::ptr_eq(data, bitmap.rgba8_premul()))
        {
            return Ok(paint.clone());
        }

        let pixmap = premul_bytes_to_pixmap(
            bitmap.rgba8_premul().as_slice(),
            bitmap.width(),
            bitmap.height(),
        )?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        if self.image_cache.len() >= IMAGE_CACHE_CAPACITY {
            self.image_cache.remove(0);
        }
        self.image_cache
            .push((bitmap.rgba8_premul().clone(), paint.clone()));
        Ok(paint)
    }

    fn font_data_for(&mut self, data: &FontBytes, index: u32) -> vello_cpu::peniko::FontData {
        if let Some((_, _, font)) = self
            .font_cache
            .iter()
            .find(|(cached, i, _)| Arc::ptr_eq(cached, data) && *i == index)
        {
            return font.clone();
        }

        let font =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::new(data.clone()), index);
        self.font_cache.push((data.clone(), index, font.clone()));
        font
    }
}

fn draw_selection(ctx: &mut vello_cpu::RenderContext, frame: &SelectionFrame) {
    let [r, g, b] = SELECTION_RGB;
    let blue = vello_cpu::peniko::Color::from_rgba8(r, g, b, 255);
    let white = vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255);

    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(1.0));
    ctx.set_paint(blue);
    ctx.stroke_path(&bezpath_to_cpu(&dashed_outline(&frame.geometry)));

    let half = ANCHOR_SIZE / 2.0;
    let square = vello_cpu::kurbo::Rect::new(-half, -half, half, half);
    let square_path = vello_cpu::kurbo::Shape::to_path(&square, 0.1);
    let rotation = frame.geometry.rotation.to_radians();
    let handles = frame
        .geometry
        .anchors
        .iter()
        .map(|(_, p)| *p)
        .chain(std::iter::once(frame.geometry.rotater));
    for p in handles {
        ctx.set_transform(affine_to_cpu(
            Affine::translate(p.to_vec2()) * Affine::rotate(rotation),
        ));
        ctx.set_paint(white);
        ctx.fill_rect(&square);
        ctx.set_paint(blue);
        ctx.stroke_path(&square_path);
    }
}

/// Closed box outline split into `[6, 2]` dashes.
pub(crate) fn dashed_outline(geometry: &FrameGeometry) -> BezPath {
    let mut outline = BezPath::new();
    let [first, rest @ ..] = geometry.corners;
    outline.move_to(first);
    for p in rest {
        outline.line_to(p);
    }
    outline.close_path();
    kurbo::dash(outline.elements().iter().copied(), 0.0, &SELECTION_DASH).collect()
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> TextBehindResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| TextBehindError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| TextBehindError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(TextBehindError::validation("bitmap byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let pixels: Vec<_> = rgba8_premul
        .chunks_exact(4)
        .map(|px| {
            may_have_opacities |= px[3] != 255;
            vello_cpu::peniko::color::PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            }
        })
        .collect();

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
