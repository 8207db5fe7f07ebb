use super::*;
use crate::layers::model::FontStyle;

#[test]
fn add_generates_unique_ids_and_selects() {
    let mut store = TextLayerStore::new();
    let a = store.add_layer(NewTextLayer::default());
    assert_eq!(store.selected(), Some(a));
    let b = store.add_layer(NewTextLayer::default());
    assert_ne!(a, b);
    assert_eq!(store.selected(), Some(b));
    assert_eq!(store.ids(), vec![a, b]);
    assert_eq!(store.current_layer().map(|l| l.id), Some(b));
}

#[test]
fn ids_are_not_reused_after_removal() {
    let mut store = TextLayerStore::new();
    let a = store.add_layer(NewTextLayer::default());
    store.remove_layer(a).unwrap();
    let b = store.add_layer(NewTextLayer::default());
    assert_ne!(a, b);
}

#[test]
fn update_touches_only_targeted_fields() {
    let mut store = TextLayerStore::new();
    let a = store.add_layer(NewTextLayer::default());
    let b = store.add_layer(NewTextLayer::default());
    let before_a = store.get(a).unwrap().clone();
    let before_b = store.get(b).unwrap().clone();

    let patch = TextLayerPatch {
        font_style: Some(FontStyle::Italic),
        ..TextLayerPatch::default()
    };
    assert!(store.update_layer(a, &patch));

    let after_a = store.get(a).unwrap();
    assert_eq!(after_a.id, a);
    assert_eq!(after_a.font_style, FontStyle::Italic);
    assert_eq!(
        TextLayer {
            font_style: before_a.font_style,
            ..after_a.clone()
        },
        before_a
    );
    assert_eq!(store.get(b).unwrap(), &before_b);
}

#[test]
fn update_of_absent_id_is_noop() {
    let mut store = TextLayerStore::new();
    let a = store.add_layer(NewTextLayer::default());
    let snapshot = store.layers().to_vec();

    assert!(!store.update_layer(LayerId(999), &TextLayerPatch::position(1.0, 2.0)));
    assert_eq!(store.layers(), snapshot.as_slice());
    assert_eq!(store.selected(), Some(a));
}

#[test]
fn selecting_absent_id_selects_none() {
    let mut store = TextLayerStore::new();
    store.add_layer(NewTextLayer::default());
    assert_eq!(store.select_layer(Some(LayerId(42))), None);
    assert!(store.current_layer().is_none());

    // Idempotent.
    assert_eq!(store.select_layer(Some(LayerId(42))), None);
    assert_eq!(store.selected(), None);
}

#[test]
fn removing_selected_layer_clears_selection() {
    let mut store = TextLayerStore::new();
    let a = store.add_layer(NewTextLayer::default());
    let b = store.add_layer(NewTextLayer::default());
    store.select_layer(Some(a));

    store.remove_layer(b).unwrap();
    assert_eq!(store.selected(), Some(a));

    store.remove_layer(a).unwrap();
    assert_eq!(store.selected(), None);
    assert!(store.is_empty());
    assert!(store.remove_layer(a).is_none());
}
