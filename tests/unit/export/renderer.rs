use super::*;
use crate::{
    layers::{model::NewTextLayer, store::TextLayerStore},
    render::{backend::RenderSettings, cpu::CpuRenderer},
};

fn solid(w: u32, h: u32, px: [u8; 4]) -> Bitmap {
    Bitmap::from_premul_rgba8(w, h, px.repeat((w * h) as usize)).unwrap()
}

fn layer_at(x: f64, y: f64, text: &str) -> TextLayer {
    let mut store = TextLayerStore::new();
    let id = store.add_layer(NewTextLayer {
        text: text.to_string(),
        x,
        y,
        font_size: 30.0,
        rotation: 15.0,
        scale_x: 1.5,
        ..NewTextLayer::default()
    });
    store.get(id).unwrap().clone()
}

/// Records the scene it was asked to draw and returns a solid frame.
#[derive(Default)]
struct RecordingBackend {
    scene: Option<Scene>,
    empty: bool,
}

impl RenderBackend for RecordingBackend {
    fn render_scene(
        &mut self,
        scene: &Scene,
        _images: SceneImages<'_>,
        _fonts: &mut FontBook,
    ) -> TextBehindResult<FrameRGBA> {
        self.scene = Some(scene.clone());
        if self.empty {
            return Ok(FrameRGBA {
                width: 0,
                height: 0,
                data: Vec::new(),
                premultiplied: true,
            });
        }
        let (w, h) = (scene.size.width, scene.size.height);
        Ok(FrameRGBA {
            width: w,
            height: h,
            data: [90u8, 40, 200, 255].repeat((w * h) as usize),
            premultiplied: true,
        })
    }
}

#[test]
fn file_name_replaces_last_extension() {
    assert_eq!(
        export_file_name("cat.png", ExportFormat::Jpeg),
        "cat-textBehind.jpeg"
    );
    assert_eq!(
        export_file_name("my.holiday.photo.webp", ExportFormat::Jpeg),
        "my.holiday.photo-textBehind.jpeg"
    );
    assert_eq!(
        export_file_name("noext", ExportFormat::Png),
        "noext-textBehind.png"
    );
    assert_eq!(
        export_file_name(".hidden", ExportFormat::Jpeg),
        ".hidden-textBehind.jpeg"
    );
}

#[test]
fn file_name_agrees_with_upload_base_name() {
    for name in ["street.jpg", "a.b.c.png", "noext", ".hidden", "trailing."] {
        let upload = crate::assets::upload::UploadFile::new(name, "image/png", Vec::new());
        assert_eq!(
            export_file_name(name, ExportFormat::Png),
            format!("{}-textBehind.png", upload.base_name())
        );
    }
}

#[test]
fn layers_are_scaled_linearly_to_native_resolution() {
    let original = solid(1920, 1080, [10, 10, 10, 255]);
    let cutout = solid(4, 4, [0, 0, 0, 0]);
    let layers = vec![layer_at(100.0, 100.0, "")];
    let settings = ExportSettings::default();
    let req = ExportRequest {
        original: Some(&original),
        cutout: Some(&cutout),
        display: Some(CanvasSize::new(600, 338).unwrap()),
        layers: &layers,
        upload_name: "street.jpg",
        settings: &settings,
    };

    let mut backend = RecordingBackend::default();
    let out = export_composition(&req, &mut FontBook::new(), &mut backend).unwrap();
    assert_eq!(out.file_name, "street-textBehind.jpeg");
    assert_eq!(out.mime, "image/jpeg");
    assert_eq!((out.width, out.height), (1920, 1080));
    assert!(out.bytes.len() > MIN_EXPORT_BYTES);

    let scene = backend.scene.unwrap();
    assert_eq!(scene.size, CanvasSize::new(1920, 1080).unwrap());
    assert!(scene.selection().is_none());
    let drawn = scene.text_layers().next().unwrap();
    assert!((drawn.x - 320.0).abs() < 1e-9);
    assert!((drawn.y - 320.0).abs() < 1e-9);
    assert!((drawn.font_size - 96.0).abs() < 1e-9);
    assert_eq!(drawn.rotation, 15.0);
    assert_eq!(drawn.scale_x, 1.5);
}

#[test]
fn missing_inputs_are_rejected() {
    let bitmap = solid(4, 4, [0, 0, 0, 255]);
    let layers = vec![layer_at(0.0, 0.0, "")];
    let settings = ExportSettings::default();
    let full = ExportRequest {
        original: Some(&bitmap),
        cutout: Some(&bitmap),
        display: Some(CanvasSize::new(4, 4).unwrap()),
        layers: &layers,
        upload_name: "a.png",
        settings: &settings,
    };

    let cases = [
        ExportRequest {
            original: None,
            ..full
        },
        ExportRequest {
            cutout: None,
            ..full
        },
        ExportRequest {
            display: None,
            ..full
        },
        ExportRequest {
            display: Some(CanvasSize {
                width: 0,
                height: 4,
            }),
            ..full
        },
        ExportRequest {
            layers: &[],
            ..full
        },
    ];
    for req in cases {
        let mut backend = RecordingBackend::default();
        let err = export_composition(&req, &mut FontBook::new(), &mut backend).unwrap_err();
        assert_eq!(err.user_message(), DATA_MISSING);
        assert!(matches!(err, TextBehindError::Export(_)));
        assert!(backend.scene.is_none());
    }
}

#[test]
fn empty_render_is_an_export_error() {
    let bitmap = solid(4, 4, [0, 0, 0, 255]);
    let layers = vec![layer_at(0.0, 0.0, "")];
    let settings = ExportSettings::default();
    let req = ExportRequest {
        original: Some(&bitmap),
        cutout: Some(&bitmap),
        display: Some(CanvasSize::new(4, 4).unwrap()),
        layers: &layers,
        upload_name: "a.png",
        settings: &settings,
    };
    let mut backend = RecordingBackend {
        empty: true,
        ..RecordingBackend::default()
    };
    let err = export_composition(&req, &mut FontBook::new(), &mut backend).unwrap_err();
    assert_eq!(err.user_message(), EMPTY_EXPORT);
}

#[test]
fn cpu_export_decodes_at_native_size() {
    let original = solid(64, 32, [200, 30, 30, 255]);
    let cutout = solid(64, 32, [0, 0, 0, 0]);
    let layers = vec![layer_at(4.0, 4.0, "")];
    let settings = ExportSettings::default();
    let req = ExportRequest {
        original: Some(&original),
        cutout: Some(&cutout),
        display: Some(CanvasSize::new(32, 16).unwrap()),
        layers: &layers,
        upload_name: "red.png",
        settings: &settings,
    };

    let mut renderer = CpuRenderer::new(RenderSettings::default());
    let out = export_composition(&req, &mut FontBook::new(), &mut renderer).unwrap();
    let decoded = image::load_from_memory(&out.bytes).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (64, 32));
    let p = decoded.get_pixel(32, 16).0;
    assert!(p[0] > 180 && p[1] < 60 && p[2] < 60, "got {p:?}");
}

#[test]
fn jpeg_flattens_transparency_over_background() {
    let frame = FrameRGBA {
        width: 8,
        height: 8,
        data: vec![0; 8 * 8 * 4],
        premultiplied: true,
    };
    let settings = ExportSettings {
        background: [255, 255, 255],
        ..ExportSettings::default()
    };
    let bytes = encode_frame(&frame, &settings).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert!(decoded.pixels().all(|p| p.0.iter().all(|c| *c > 245)));
}

#[test]
fn png_export_keeps_alpha() {
    let frame = FrameRGBA {
        width: 2,
        height: 2,
        data: vec![0; 2 * 2 * 4],
        premultiplied: true,
    };
    let settings = ExportSettings {
        format: ExportFormat::Png,
        ..ExportSettings::default()
    };
    let bytes = encode_frame(&frame, &settings).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(decoded.get_pixel(1, 1).0[3], 0);
}
