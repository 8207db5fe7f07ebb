use crate::foundation::error::{TextBehindError, TextBehindResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Pixel dimensions of a drawing surface (display canvas or native export).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> TextBehindResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextBehindError::validation(
                "canvas width and height must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Placement of a text node: origin, rotation about the origin, then non-uniform scale.
///
/// Matches the scene-graph convention where a node's `(x, y)` is its top-left corner and
/// rotation/scale pivot around that corner.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeTransform {
    pub origin: Vec2,
    pub rotation_deg: f64,
    pub scale: Vec2,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            origin: Vec2::ZERO,
            rotation_deg: 0.0,
            scale: Vec2::new(1.0, 1.0),
        }
    }
}

impl NodeTransform {
    pub fn to_affine(self) -> Affine {
        // T(origin) * R(rotation) * S(scale)
        Affine::translate(self.origin)
            * Affine::rotate(self.rotation_deg.to_radians())
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
    }

    /// Translation and rotation only; local units are unscaled screen pixels.
    pub fn frame_affine(self) -> Affine {
        Affine::translate(self.origin) * Affine::rotate(self.rotation_deg.to_radians())
    }
}
