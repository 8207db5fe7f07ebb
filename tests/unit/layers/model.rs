use super::*;

fn layer() -> TextLayer {
    NewTextLayer::default().into_layer(LayerId(7))
}

#[test]
fn default_layer_matches_editor_defaults() {
    let l = layer();
    assert_eq!(l.text, "Your Text Here");
    assert_eq!(l.font_family, "Arial");
    assert_eq!(l.fill, "#333333");
    assert!(l.is_bold());
    assert!(!l.is_italic());
    assert!(l.draggable);
    assert_eq!((l.rotation, l.scale_x, l.scale_y), (0.0, 1.0, 1.0));
    assert_eq!(l.id.to_string(), "text-7");
}

#[test]
fn default_font_size_tracks_image_height() {
    assert_eq!(NewTextLayer::default_for_image(1080).font_size, 48.0);
    assert_eq!(NewTextLayer::default_for_image(480).font_size, 40.0);
    assert_eq!(NewTextLayer::default_for_image(100).font_size, 24.0);
}

#[test]
fn scaled_multiplies_geometry_only() {
    let mut l = layer();
    l.x = 100.0;
    l.y = 100.0;
    l.rotation = 15.0;
    l.scale_x = 1.5;
    l.scale_y = 0.5;

    let s = l.scaled(3.2);
    assert!((s.x - 320.0).abs() < 1e-9);
    assert!((s.y - 320.0).abs() < 1e-9);
    assert!((s.font_size - 48.0 * 3.2).abs() < 1e-9);
    assert_eq!(s.rotation, 15.0);
    assert_eq!((s.scale_x, s.scale_y), (1.5, 0.5));
    assert_eq!(s.id, l.id);
}

#[test]
fn patch_applies_only_present_fields() {
    let mut l = layer();
    let before = l.clone();
    TextLayerPatch {
        fill: Some("#ff0000".to_string()),
        ..TextLayerPatch::default()
    }
    .apply_to(&mut l);

    assert_eq!(l.fill, "#ff0000");
    assert_eq!(
        TextLayer {
            fill: before.fill.clone(),
            ..l.clone()
        },
        before
    );
}

#[test]
fn font_style_serde_names() {
    let l: NewTextLayer =
        serde_json::from_str(r#"{ "text": "hi", "fontStyle": "bold italic", "fontSize": 30 }"#)
            .unwrap();
    assert_eq!(l.font_style, FontStyle::BoldItalic);
    assert_eq!(l.font_size, 30.0);
    assert_eq!(l.font_family, "Arial");

    let l: NewTextLayer = serde_json::from_str(r#"{ "fontStyle": "bold-italic" }"#).unwrap();
    assert!(l.font_style.is_bold() && l.font_style.is_italic());

    let json = serde_json::to_value(layer()).unwrap();
    assert_eq!(json["fontWeight"], "bold");
    assert_eq!(json["scaleX"], 1.0);
}

#[test]
fn patch_rejects_id_field() {
    assert!(serde_json::from_str::<TextLayerPatch>(r#"{ "id": 3 }"#).is_err());
    let p: TextLayerPatch = serde_json::from_str(r#"{ "text": "new" }"#).unwrap();
    assert_eq!(p.text.as_deref(), Some("new"));
    assert!(!p.is_empty());
    assert!(TextLayerPatch::default().is_empty());
}
