use crate::{
    assets::{decode::Bitmap, fonts::FontBook},
    compose::scene::{ImageRole, Scene},
    foundation::error::{TextBehindError, TextBehindResult},
    render::cpu::CpuRenderer,
};

/// Shown while no renderer has been initialized.
pub const PREPARING_CANVAS: &str = "Preparing canvas...";
/// Shown while the session bitmaps are not available yet.
pub const LOADING_IMAGE_DATA: &str = "Loading image data...";

#[derive(Clone, Debug, PartialEq, Eq)]
/// Rendered RGBA8 frame.
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)` as stored.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let d = self.data.get(i..i + 4)?;
        Some([d[0], d[1], d[2], d[3]])
    }

    /// Straight-alpha copy suitable for encoders.
    pub fn to_rgba_image(&self) -> TextBehindResult<image::RgbaImage> {
        let mut data = self.data.clone();
        if self.premultiplied {
            for px in data.chunks_exact_mut(4) {
                let a = u16::from(px[3]);
                if a == 0 || a == 255 {
                    continue;
                }
                for c in &mut px[..3] {
                    *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
        image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| TextBehindError::validation("frame byte length mismatch"))
    }
}

#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Straight RGBA the surface is cleared to before drawing; transparent when unset.
    pub clear_rgba: Option<[u8; 4]>,
}

/// The two bitmaps a scene's image draws refer to.
#[derive(Clone, Copy, Debug)]
pub struct SceneImages<'a> {
    pub original: &'a Bitmap,
    pub cutout: &'a Bitmap,
}

impl<'a> SceneImages<'a> {
    pub fn get(&self, role: ImageRole) -> &'a Bitmap {
        match role {
            ImageRole::Original => self.original,
            ImageRole::Cutout => self.cutout,
        }
    }
}

/// Rasterizes scenes into frames.
pub trait RenderBackend {
    fn render_scene(
        &mut self,
        scene: &Scene,
        images: SceneImages<'_>,
        fonts: &mut FontBook,
    ) -> TextBehindResult<FrameRGBA>;
}

/// What the canvas area shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Status text in place of the canvas.
    Placeholder(String),
    Canvas(FrameRGBA),
}

/// Drawing capability, resolved once.
///
/// Nothing is drawn until [`Compositor::initialize`] has produced a renderer.
#[derive(Default)]
pub enum Compositor {
    #[default]
    Uninitialized,
    Ready(CpuRenderer),
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("Compositor::Uninitialized"),
            Self::Ready(_) => f.write_str("Compositor::Ready"),
        }
    }
}

impl Compositor {
    /// Resolve the renderer. Later calls keep the existing one.
    pub fn initialize(&mut self, settings: RenderSettings) {
        if let Self::Uninitialized = self {
            tracing::debug!("compositor initialized");
            *self = Self::Ready(CpuRenderer::new(settings));
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn renderer(&mut self) -> Option<&mut CpuRenderer> {
        match self {
            Self::Ready(renderer) => Some(renderer),
            Self::Uninitialized => None,
        }
    }

    /// Render `scene`, or a placeholder while the renderer or the scene's images are missing.
    pub fn render(
        &mut self,
        input: Option<(&Scene, SceneImages<'_>)>,
        fonts: &mut FontBook,
    ) -> TextBehindResult<Frame> {
        let Self::Ready(renderer) = self else {
            return Ok(Frame::Placeholder(PREPARING_CANVAS.to_string()));
        };
        let Some((scene, images)) = input else {
            return Ok(Frame::Placeholder(LOADING_IMAGE_DATA.to_string()));
        };
        renderer
            .render_scene(scene, images, fonts)
            .map(Frame::Canvas)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
