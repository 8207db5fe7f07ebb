use std::io::Cursor;

use super::*;

fn png_bytes(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_dimensions_and_premul() {
    let img = image::RgbaImage::from_raw(1, 1, vec![100u8, 50u8, 200u8, 128u8]).unwrap();

    let bitmap = decode_bitmap(&png_bytes(img)).unwrap();
    assert_eq!(bitmap.width, 1);
    assert_eq!(bitmap.height, 1);
    assert_eq!(
        bitmap.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_jpeg_has_positive_dimensions() {
    let img = image::RgbImage::from_pixel(32, 18, image::Rgb([200, 10, 10]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();

    let bitmap = decode_bitmap(&buf).unwrap();
    assert_eq!((bitmap.width, bitmap.height), (32, 18));
    assert_eq!(bitmap.pixel(5, 5)[3], 255);
}

#[test]
fn corrupt_and_empty_files_are_decode_errors() {
    let err = decode_bitmap(b"definitely not an image").unwrap_err();
    assert!(matches!(err, TextBehindError::Decode(_)));

    let err = decode_bitmap(&[]).unwrap_err();
    assert!(matches!(err, TextBehindError::Decode(_)));
}

#[test]
fn missing_file_is_decode_error() {
    let err = load_bitmap(Path::new("target/does/not/exist.png")).unwrap_err();
    assert!(matches!(err, TextBehindError::Decode(_)));
}

#[test]
fn matte_luma_becomes_alpha() {
    let original = Bitmap::from_premul_rgba8(2, 1, vec![200, 100, 50, 255, 200, 100, 50, 255])
        .unwrap();
    let matte =
        Bitmap::from_premul_rgba8(2, 1, vec![255, 255, 255, 255, 0, 0, 0, 255]).unwrap();

    let cutout = apply_alpha_matte(&original, &matte).unwrap();
    assert_eq!(cutout.pixel(0, 0), [200, 100, 50, 255]);
    assert_eq!(cutout.pixel(1, 0), [0, 0, 0, 0]);
}

#[test]
fn matte_is_resampled_to_original_size() {
    let original = Bitmap::from_premul_rgba8(4, 4, vec![255; 64]).unwrap();
    let matte = Bitmap::from_premul_rgba8(2, 2, vec![
        255, 255, 255, 255, 0, 0, 0, 255, //
        0, 0, 0, 255, 255, 255, 255, 255,
    ])
    .unwrap();

    let cutout = apply_alpha_matte(&original, &matte).unwrap();
    assert_eq!((cutout.width, cutout.height), (4, 4));
    assert_eq!(cutout.pixel(0, 0)[3], 255);
    assert_eq!(cutout.pixel(3, 0)[3], 0);
    assert_eq!(cutout.pixel(0, 3)[3], 0);
    assert_eq!(cutout.pixel(3, 3)[3], 255);
}

#[test]
fn encode_png_round_trips_through_decode() {
    let original = Bitmap::from_premul_rgba8(2, 1, vec![200, 100, 50, 255, 64, 32, 0, 128])
        .unwrap();
    let png = encode_png(&original).unwrap();
    let back = decode_bitmap(&png).unwrap();
    assert_eq!(back.pixel(0, 0), [200, 100, 50, 255]);
    let p = back.pixel(1, 0);
    assert_eq!(p[3], 128);
    assert!((i16::from(p[0]) - 64).abs() <= 1);
}

#[test]
fn bitmaps_are_never_empty_and_pixels_clamp() {
    assert!(matches!(
        Bitmap::from_premul_rgba8(0, 3, Vec::new()),
        Err(TextBehindError::Decode(_))
    ));
    assert!(Bitmap::from_premul_rgba8(2, 2, vec![0; 12]).is_err());

    let bitmap = Bitmap::from_premul_rgba8(2, 1, vec![1, 2, 3, 255, 4, 5, 6, 255]).unwrap();
    assert_eq!(bitmap.size(), CanvasSize::new(2, 1).unwrap());
    assert_eq!(bitmap.pixel(0, 0), [1, 2, 3, 255]);
    assert_eq!(bitmap.pixel(u32::MAX, u32::MAX), [4, 5, 6, 255]);
}

#[test]
fn premultiply_clears_color_of_transparent_pixels() {
    let mut px = vec![200, 100, 50, 0, 255, 255, 255, 255, 255, 0, 0, 51];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(px, [0, 0, 0, 0, 255, 255, 255, 255, 51, 0, 0, 51]);
}
