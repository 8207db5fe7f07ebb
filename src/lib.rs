//! textbehind places editable text *behind* the subject of a photo.
//!
//! An upload is decoded, its background is removed by a pluggable [`BackgroundRemover`], and
//! the editor composites three layers: the original photo, the text layers, and the cutout of
//! the subject on top. Text layers can be selected, dragged, resized and rotated on a fitted
//! display canvas, then exported at the photo's native resolution as
//! `<name>-textBehind.jpeg`.
//!
//! - Configure a [`Studio`] from a [`StudioConfig`]
//! - Submit an [`UploadFile`] with [`Studio::submit_upload`]
//! - Edit layers, then deliver the result to a [`DownloadSink`] with [`Studio::export`]
#![forbid(unsafe_code)]

mod assets;
mod compose;
mod config;
mod export;
mod foundation;
mod layers;
mod render;
mod segment;
mod session;

pub use crate::foundation::color::FillColor;
pub use crate::foundation::core::{Affine, BezPath, CanvasSize, NodeTransform, Point, Rect, Vec2};
pub use crate::foundation::error::{TextBehindError, TextBehindResult};

pub use crate::assets::decode::{Bitmap, apply_alpha_matte, decode_bitmap, encode_png, load_bitmap};
pub use crate::assets::fonts::{AVAILABLE_FONTS, FaceId, FontBook, FontChoice, approx_text_box};
pub use crate::assets::upload::UploadFile;

pub use crate::config::{
    ExportFormat, ExportSettings, FontConfig, RemovalSettings, StudioConfig, ViewportConfig,
};

pub use crate::layers::model::{
    FontStyle, FontWeight, LayerId, NewTextLayer, TextLayer, TextLayerPatch,
};
pub use crate::layers::store::TextLayerStore;

pub use crate::segment::remover::{
    BackgroundRemover, CommandRemover, CutoutFileRemover, DEFAULT_MODEL, MaskRemover,
    NoProgress, ProgressEvent, ProgressReporter, RemovalConfig,
};

pub use crate::compose::interaction::{
    Anchor, FrameGeometry, GestureKind, Interaction, PointerDown, TransformUpdate,
};
pub use crate::compose::layout::{TextBox, center_layer, fit_canvas};
pub use crate::compose::scene::{DrawOp, ImageRole, Scene, SelectionFrame, build_scene};

pub use crate::render::backend::{
    Compositor, Frame, FrameRGBA, RenderBackend, RenderSettings, SceneImages,
};
pub use crate::render::cpu::CpuRenderer;

pub use crate::export::download::{DirectoryDownloads, DownloadSink, MemoryDownloads};
pub use crate::export::renderer::{
    DATA_MISSING, EMPTY_EXPORT, EXPORT_SUFFIX, ExportRequest, ExportedImage, encode_frame,
    export_composition, export_file_name, scale_factor,
};

pub use crate::session::editor::EditingSession;
pub use crate::session::studio::{StatusKind, StatusMessage, Studio, ViewMode};
