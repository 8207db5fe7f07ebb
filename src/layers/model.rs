use serde::{Deserialize, Serialize};

use crate::foundation::color::FillColor;
use crate::foundation::core::{NodeTransform, Vec2};
use crate::foundation::error::TextBehindResult;

/// Text of the layer every session starts with.
pub const DEFAULT_LAYER_TEXT: &str = "Your Text Here";
/// Family of the layer every session starts with.
pub const DEFAULT_FONT_FAMILY: &str = "Arial";
/// Fill of the layer every session starts with.
pub const DEFAULT_FILL: &str = "#333333";

/// Identifier of a text layer, unique within its store and stable for the layer's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub(crate) u64);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "text-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "italic")]
    Italic,
    #[serde(rename = "bold")]
    Bold,
    #[serde(rename = "bold italic", alias = "bold-italic", alias = "italic bold")]
    BoldItalic,
}

impl FontStyle {
    pub fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, Self::Italic | Self::BoldItalic)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// One editable text object.
///
/// `(x, y)` is the top-left corner of the text box in canvas pixels; rotation (degrees,
/// clockwise) and scale pivot around that corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLayer {
    pub id: LayerId,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub font_family: String,
    pub fill: String,
    pub font_style: FontStyle,
    pub font_weight: FontWeight,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub draggable: bool,
}

impl TextLayer {
    /// Bold when either the style or the weight asks for it.
    pub fn is_bold(&self) -> bool {
        self.font_style.is_bold() || self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style.is_italic()
    }

    pub fn transform(&self) -> NodeTransform {
        NodeTransform {
            origin: Vec2::new(self.x, self.y),
            rotation_deg: self.rotation,
            scale: Vec2::new(self.scale_x, self.scale_y),
        }
    }

    pub fn fill_color(&self) -> TextBehindResult<FillColor> {
        FillColor::parse(&self.fill)
    }

    /// Copy with position and font size multiplied by `factor`.
    ///
    /// Rotation and scale factors are resolution-independent and carried through unchanged.
    pub fn scaled(&self, factor: f64) -> TextLayer {
        TextLayer {
            x: self.x * factor,
            y: self.y * factor,
            font_size: self.font_size * factor,
            ..self.clone()
        }
    }
}

/// Initial fields of a layer about to be added to a store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewTextLayer {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub font_family: String,
    pub fill: String,
    pub font_style: FontStyle,
    pub font_weight: FontWeight,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub draggable: bool,
}

impl Default for NewTextLayer {
    fn default() -> Self {
        Self {
            text: DEFAULT_LAYER_TEXT.to_string(),
            x: 50.0,
            y: 50.0,
            font_size: 48.0,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            fill: DEFAULT_FILL.to_string(),
            font_style: FontStyle::Normal,
            font_weight: FontWeight::Bold,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            draggable: true,
        }
    }
}

impl NewTextLayer {
    /// Default layer for an image of the given native height: font size is a twelfth of the
    /// height, clamped to 24..=48.
    pub fn default_for_image(native_height: u32) -> Self {
        let font_size = (f64::from(native_height) / 12.0).round().clamp(24.0, 48.0);
        Self {
            font_size,
            ..Self::default()
        }
    }

    pub(crate) fn into_layer(self, id: LayerId) -> TextLayer {
        TextLayer {
            id,
            text: self.text,
            x: self.x,
            y: self.y,
            font_size: self.font_size,
            font_family: self.font_family,
            fill: self.fill,
            font_style: self.font_style,
            font_weight: self.font_weight,
            rotation: self.rotation,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            draggable: self.draggable,
        }
    }
}

/// Field-level update; `None` leaves the field untouched. The id is never patchable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct TextLayerPatch {
    pub text: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub fill: Option<String>,
    pub font_style: Option<FontStyle>,
    pub font_weight: Option<FontWeight>,
    pub rotation: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub draggable: Option<bool>,
}

impl TextLayerPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub(crate) fn apply_to(&self, layer: &mut TextLayer) {
        fn set<T: Clone>(dst: &mut T, src: &Option<T>) {
            if let Some(v) = src {
                *dst = v.clone();
            }
        }

        set(&mut layer.text, &self.text);
        set(&mut layer.x, &self.x);
        set(&mut layer.y, &self.y);
        set(&mut layer.font_size, &self.font_size);
        set(&mut layer.font_family, &self.font_family);
        set(&mut layer.fill, &self.fill);
        set(&mut layer.font_style, &self.font_style);
        set(&mut layer.font_weight, &self.font_weight);
        set(&mut layer.rotation, &self.rotation);
        set(&mut layer.scale_x, &self.scale_x);
        set(&mut layer.scale_y, &self.scale_y);
        set(&mut layer.draggable, &self.draggable);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/model.rs"]
mod tests;
