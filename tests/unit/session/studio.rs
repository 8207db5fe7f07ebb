use std::io::Cursor;

use super::*;
use crate::{
    export::download::MemoryDownloads, layers::model::TextLayerPatch,
    segment::remover::ProgressReporter,
};

fn png_bytes(width: u32, height: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn upload(width: u32, height: u32) -> UploadFile {
    UploadFile::new(
        "photo.png",
        "image/png",
        png_bytes(width, height, [30, 60, 90, 255]),
    )
}

/// Returns a transparent cutout of the same size after reporting one download event.
struct StubRemover;

impl BackgroundRemover for StubRemover {
    fn remove_background(
        &self,
        file: &UploadFile,
        _config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>> {
        progress.report(&ProgressEvent::new("fetch:model", 5, 10));
        let original = decode_bitmap(&file.bytes)?;
        Ok(png_bytes(original.width(), original.height(), [0, 0, 0, 0]))
    }
}

struct FailingRemover;

impl BackgroundRemover for FailingRemover {
    fn remove_background(
        &self,
        _file: &UploadFile,
        _config: &RemovalConfig,
        progress: &mut dyn ProgressReporter,
    ) -> TextBehindResult<Vec<u8>> {
        progress.report(&ProgressEvent::new("fetch:model", 1, 4));
        progress.report(&ProgressEvent::new("compute:inference", 0, 1));
        Err(TextBehindError::segmentation("model unavailable"))
    }
}

struct FailingSink;

impl DownloadSink for FailingSink {
    fn deliver(&mut self, _image: &ExportedImage) -> TextBehindResult<()> {
        Err(TextBehindError::validation("disk full"))
    }
}

fn studio() -> Studio {
    Studio::new(StudioConfig::default(), FontBook::new())
}

fn opened(width: u32, height: u32) -> Studio {
    let mut s = studio();
    s.submit_upload(upload(width, height), &StubRemover).unwrap();
    // Empty text renders without any installed font.
    let blank = TextLayerPatch {
        text: Some(String::new()),
        ..TextLayerPatch::default()
    };
    assert!(s.update_selected(&blank));
    s
}

#[test]
fn upload_opens_the_editor() {
    let mut s = studio();
    assert_eq!(s.view_mode(), ViewMode::Uploader);

    s.submit_upload(upload(1920, 1080), &StubRemover).unwrap();
    assert_eq!(s.view_mode(), ViewMode::Editor);
    assert!(!s.is_loading());
    assert_eq!(s.status(), None);

    let session = s.session().unwrap();
    assert_eq!((session.canvas().width, session.canvas().height), (600, 338));
    assert_eq!(session.layers().len(), 1);
    assert!(session.selected().is_some());
}

#[test]
fn model_download_progress_is_surfaced() {
    let mut status = None;
    let err = open_session(
        upload(8, 8),
        &FailingRemover,
        &RemovalConfig::default(),
        &StudioConfig::default(),
        &mut status,
    )
    .unwrap_err();
    assert!(matches!(err, TextBehindError::Segmentation(_)));
    // The compute event after the download must not replace the download message.
    assert_eq!(
        status,
        Some(StatusMessage::success("Preparing AI Model: 25%"))
    );
}

#[test]
fn non_image_upload_returns_to_uploader() {
    let mut s = studio();
    let file = UploadFile::new("notes.txt", "text/plain", b"hello".to_vec());
    let err = s.submit_upload(file, &StubRemover).unwrap_err();

    assert!(matches!(err, TextBehindError::Decode(_)));
    assert_eq!(s.view_mode(), ViewMode::Uploader);
    assert!(!s.is_loading());
    assert!(s.session().is_none());
    let status = s.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.contains("text/plain"));
}

#[test]
fn removal_failure_clears_the_session() {
    let mut s = opened(40, 30);
    let err = s.submit_upload(upload(40, 30), &FailingRemover).unwrap_err();

    assert!(matches!(err, TextBehindError::Segmentation(_)));
    assert!(s.session().is_none());
    assert_eq!(s.view_mode(), ViewMode::Uploader);
    assert!(!s.is_loading());
    assert_eq!(s.status(), Some(&StatusMessage::error("model unavailable")));
}

#[test]
fn busy_studio_rejects_new_work() {
    let mut s = opened(40, 30);
    s.loading = true;
    assert!(matches!(
        s.submit_upload(upload(40, 30), &StubRemover),
        Err(TextBehindError::Validation(_))
    ));
    let mut sink = MemoryDownloads::new();
    assert!(matches!(
        s.export(&mut sink),
        Err(TextBehindError::Validation(_))
    ));
    assert!(sink.images.is_empty());
}

#[test]
fn export_without_layers_reports_missing_data() {
    let mut s = studio();
    let mut sink = MemoryDownloads::new();
    let err = s.export(&mut sink).unwrap_err();
    assert!(matches!(err, TextBehindError::Export(ref m) if m == DATA_MISSING));
    assert_eq!(s.status(), Some(&StatusMessage::error(DATA_MISSING)));

    let mut s = opened(40, 30);
    let id = s.session().unwrap().selected().unwrap();
    assert!(s.remove_layer(id).is_some());
    assert!(s.export(&mut sink).is_err());
    assert_eq!(s.status(), Some(&StatusMessage::error(DATA_MISSING)));
    assert!(!s.is_loading());
    assert!(sink.images.is_empty());
}

#[test]
fn export_delivers_native_jpeg_and_restores_selection() {
    let mut s = opened(64, 48);
    let selected = s.session().unwrap().selected();

    let mut sink = MemoryDownloads::new();
    let image = s.export(&mut sink).unwrap();

    assert_eq!(image.file_name, "photo-textBehind.jpeg");
    assert_eq!(image.mime, "image/jpeg");
    assert_eq!((image.width, image.height), (64, 48));
    assert_eq!(sink.images.len(), 1);
    assert_eq!(s.status(), Some(&StatusMessage::success(EXPORT_SUCCEEDED)));
    assert_eq!(s.session().unwrap().selected(), selected);
    assert_eq!(s.view_mode(), ViewMode::Editor);
    assert!(!s.is_loading());
}

#[test]
fn delivery_failure_is_prefixed() {
    let mut s = opened(64, 48);
    let selected = s.session().unwrap().selected();
    assert!(selected.is_some());
    assert!(s.export(&mut FailingSink).is_err());
    assert_eq!(s.session().unwrap().selected(), selected);
    assert_eq!(
        s.status(),
        Some(&StatusMessage::error("Export error: disk full"))
    );
    assert_eq!(s.view_mode(), ViewMode::Editor);
    assert!(!s.is_loading());
}

#[test]
fn frames_are_placeholders_until_ready() {
    let mut s = studio();
    assert_eq!(
        s.render_frame().unwrap(),
        Frame::Placeholder("Preparing canvas...".to_string())
    );
    s.initialize_compositor(RenderSettings::default());
    assert_eq!(
        s.render_frame().unwrap(),
        Frame::Placeholder("Loading image data...".to_string())
    );

    let mut s = opened(64, 48);
    s.select(None);
    s.initialize_compositor(RenderSettings::default());
    let Frame::Canvas(frame) = s.render_frame().unwrap() else {
        panic!("expected a canvas frame");
    };
    assert_eq!((frame.width, frame.height), (64, 48));
    // Original shows through the transparent cutout.
    assert_eq!(frame.pixel(2, 2), Some([30, 60, 90, 255]));
}

#[test]
fn editing_requires_an_open_image() {
    let mut s = studio();
    assert!(s.pointer_down(Point::new(1.0, 1.0)).is_err());
    assert!(s.add_layer(NewTextLayer::default()).is_err());
    assert!(!s.pointer_move(Point::new(2.0, 2.0)));
    assert_eq!(s.pointer_up(Point::new(2.0, 2.0)), None);
}

#[test]
fn canvas_events_wait_for_the_compositor() {
    let mut s = opened(400, 300);
    let id = s.session().unwrap().selected().unwrap();
    let before = s.session().unwrap().current_layer().unwrap().clone();

    let err = s.pointer_down(Point::new(1.0, 1.0)).unwrap_err();
    assert_eq!(err.to_string(), TextBehindError::validation(CANVAS_NOT_READY).to_string());
    assert_eq!(s.session().unwrap().selected(), Some(id));
    assert!(!s.pointer_move(Point::new(5.0, 5.0)));
    assert_eq!(s.pointer_up(Point::new(5.0, 5.0)), None);
    assert!(!s.drag_end(id, 10.0, 10.0));
    let after = s.session().unwrap().current_layer().unwrap();
    assert_eq!((after.x, after.y), (before.x, before.y));

    s.initialize_compositor(RenderSettings::default());
    assert_eq!(s.pointer_down(Point::new(1.0, 1.0)).unwrap(), PointerDown::Empty);
    assert_eq!(s.session().unwrap().selected(), None);
    assert!(s.drag_end(id, 10.0, 10.0));
}

#[test]
fn reset_returns_to_uploader() {
    let mut s = opened(40, 30);
    s.reset();
    assert_eq!(s.view_mode(), ViewMode::Uploader);
    assert!(s.session().is_none());
    assert_eq!(s.status(), None);
}
