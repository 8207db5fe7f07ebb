use std::{path::Path, sync::Arc};

use crate::foundation::{
    core::CanvasSize,
    error::{TextBehindError, TextBehindResult},
};

#[derive(Clone, Debug)]
/// Decoded raster image in premultiplied RGBA8 form.
///
/// Immutable once decoded; clones share the pixel buffer. Width and height are never zero.
pub struct Bitmap {
    width: u32,
    height: u32,
    rgba8_premul: Arc<Vec<u8>>,
}

impl Bitmap {
    /// Build a bitmap from premultiplied RGBA8 bytes, checking the buffer length.
    pub fn from_premul_rgba8(width: u32, height: u32, data: Vec<u8>) -> TextBehindResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextBehindError::decode("image has zero width or height"));
        }
        if data.len() != width as usize * height as usize * 4 {
            return Err(TextBehindError::decode("bitmap byte length mismatch"));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(data),
        })
    }

    /// Intrinsic width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Intrinsic height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize {
            width: self.width,
            height: self.height,
        }
    }

    /// Pixel bytes in row-major premultiplied RGBA8, shared between clones.
    pub fn rgba8_premul(&self) -> &Arc<Vec<u8>> {
        &self.rgba8_premul
    }

    /// Pixel at `(x, y)`, premultiplied. Out-of-range coordinates are clamped.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1)) as usize;
        let y = y.min(self.height.saturating_sub(1)) as usize;
        let i = (y * self.width as usize + x) * 4;
        let d = &self.rgba8_premul;
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
///
/// Resolves only once the intrinsic dimensions are known; anything the `image` crate cannot
/// read, or that decodes to an empty raster, is a [`TextBehindError::Decode`].
pub fn decode_bitmap(bytes: &[u8]) -> TextBehindResult<Bitmap> {
    if bytes.is_empty() {
        return Err(TextBehindError::decode("file is empty"));
    }
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| TextBehindError::decode(format!("cannot decode image: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Bitmap::from_premul_rgba8(width, height, rgba8_premul)
}

/// Read a file from disk and decode it with [`decode_bitmap`].
pub fn load_bitmap(path: &Path) -> TextBehindResult<Bitmap> {
    let bytes = std::fs::read(path).map_err(|e| {
        TextBehindError::decode(format!("cannot read image '{}': {e}", path.display()))
    })?;
    decode_bitmap(&bytes)
}

/// Use the luma of `matte` as the alpha channel of `original`.
///
/// The matte is resampled (nearest) when its size differs from the original.
pub fn apply_alpha_matte(original: &Bitmap, matte: &Bitmap) -> TextBehindResult<Bitmap> {
    let (w, h) = (original.width, original.height);
    let mut out = Vec::with_capacity(w as usize * h as usize * 4);
    let src = original.rgba8_premul.as_slice();

    for y in 0..h {
        let my = (u64::from(y) * u64::from(matte.height) / u64::from(h)) as u32;
        for x in 0..w {
            let mx = (u64::from(x) * u64::from(matte.width) / u64::from(w)) as u32;
            let m = matte.pixel(mx, my);
            // Matte is premultiplied too; luma over its own alpha.
            let luma = (u32::from(m[0]) * 54 + u32::from(m[1]) * 183 + u32::from(m[2]) * 19) >> 8;
            let keep = luma.min(255) as u16;

            let i = (y as usize * w as usize + x as usize) * 4;
            for c in 0..4 {
                out.push(crate::foundation::math::mul_div255_u8(u16::from(src[i + c]), keep));
            }
        }
    }

    Bitmap::from_premul_rgba8(w, h, out)
}

/// Encode a bitmap as PNG with straight (un-premultiplied) alpha.
pub fn encode_png(bitmap: &Bitmap) -> TextBehindResult<Vec<u8>> {
    let mut straight = bitmap.rgba8_premul.as_ref().clone();
    unpremultiply_rgba8_in_place(&mut straight);
    let img = image::RgbaImage::from_raw(bitmap.width, bitmap.height, straight)
        .ok_or_else(|| TextBehindError::decode("bitmap byte length mismatch"))?;

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| TextBehindError::decode(format!("encode png: {e}")))?;
    Ok(buf)
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * a + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
