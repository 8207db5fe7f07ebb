use super::*;
use crate::foundation::core::CanvasSize;

fn solid(w: u32, h: u32, px: [u8; 4]) -> Bitmap {
    Bitmap::from_premul_rgba8(w, h, px.repeat((w * h) as usize)).unwrap()
}

fn scene(w: u32, h: u32) -> Scene {
    Scene::composition(CanvasSize::new(w, h).unwrap(), Vec::new())
}

#[test]
fn uninitialized_compositor_shows_placeholder() {
    let mut compositor = Compositor::default();
    assert!(!compositor.is_ready());
    let original = solid(2, 2, [255, 0, 0, 255]);
    let images = SceneImages {
        original: &original,
        cutout: &original,
    };
    let frame = compositor
        .render(Some((&scene(2, 2), images)), &mut FontBook::new())
        .unwrap();
    assert_eq!(frame, Frame::Placeholder(PREPARING_CANVAS.to_string()));
}

#[test]
fn missing_images_show_loading_placeholder() {
    let mut compositor = Compositor::default();
    compositor.initialize(RenderSettings::default());
    assert!(compositor.is_ready());
    let frame = compositor
        .render(None, &mut FontBook::new())
        .unwrap();
    assert_eq!(frame, Frame::Placeholder(LOADING_IMAGE_DATA.to_string()));
}

#[test]
fn ready_compositor_renders_canvas() {
    let mut compositor = Compositor::default();
    compositor.initialize(RenderSettings::default());
    // A second initialize keeps the existing renderer.
    compositor.initialize(RenderSettings {
        clear_rgba: Some([1, 2, 3, 255]),
    });

    // Transparent inputs leave the clear color visible, so the first settings must win.
    let original = solid(4, 4, [0, 0, 0, 0]);
    let cutout = solid(4, 4, [0, 0, 0, 0]);
    let frame = compositor
        .render(
            Some((
                &scene(4, 4),
                SceneImages {
                    original: &original,
                    cutout: &cutout,
                },
            )),
            &mut FontBook::new(),
        )
        .unwrap();
    let Frame::Canvas(frame) = frame else {
        panic!("expected a canvas frame");
    };
    assert_eq!((frame.width, frame.height), (4, 4));
    assert_eq!(frame.data.len(), 4 * 4 * 4);
    assert_eq!(frame.pixel(1, 1), Some([0, 0, 0, 0]));
}

#[test]
fn frame_pixel_and_unpremultiply() {
    let frame = FrameRGBA {
        width: 2,
        height: 1,
        data: vec![255, 0, 0, 255, 64, 0, 0, 128],
        premultiplied: true,
    };
    assert_eq!(frame.pixel(0, 0), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(2, 0), None);

    let img = frame.to_rgba_image().unwrap();
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    let p = img.get_pixel(1, 0).0;
    assert_eq!(p[3], 128);
    assert!((i16::from(p[0]) - 128).abs() <= 1);
}
