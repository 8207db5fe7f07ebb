use crate::{
    assets::fonts::FontBook,
    compose::layout::TextBox,
    foundation::core::{Affine, NodeTransform, Point, Vec2},
    layers::{
        model::{LayerId, TextLayer, TextLayerPatch},
        store::TextLayerStore,
    },
};

/// Side length of a transform anchor square.
pub const ANCHOR_SIZE: f64 = 10.0;
/// Distance of the rotation anchor above the top edge of the box.
pub const ROTATE_ANCHOR_OFFSET: f64 = 50.0;
/// Smallest scale factor a resize may produce.
pub const MIN_SCALE: f64 = 0.01;

/// Resize handle on the selection frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleRight,
    BottomRight,
    BottomCenter,
    BottomLeft,
    MiddleLeft,
}

impl Anchor {
    pub const ALL: [Anchor; 8] = [
        Anchor::TopLeft,
        Anchor::TopCenter,
        Anchor::TopRight,
        Anchor::MiddleRight,
        Anchor::BottomRight,
        Anchor::BottomCenter,
        Anchor::BottomLeft,
        Anchor::MiddleLeft,
    ];

    /// Horizontal and vertical side the anchor moves: -1 left/top, 1 right/bottom, 0 none.
    fn sides(self) -> (i8, i8) {
        match self {
            Anchor::TopLeft => (-1, -1),
            Anchor::TopCenter => (0, -1),
            Anchor::TopRight => (1, -1),
            Anchor::MiddleRight => (1, 0),
            Anchor::BottomRight => (1, 1),
            Anchor::BottomCenter => (0, 1),
            Anchor::BottomLeft => (-1, 1),
            Anchor::MiddleLeft => (-1, 0),
        }
    }

    pub fn is_corner(self) -> bool {
        let (sx, sy) = self.sides();
        sx != 0 && sy != 0
    }

    /// Anchor position inside a `width` x `height` frame.
    pub fn local_point(self, width: f64, height: f64) -> Point {
        let (sx, sy) = self.sides();
        let at = |side: i8, len: f64| match side {
            -1 => 0.0,
            0 => len / 2.0,
            _ => len,
        };
        Point::new(at(sx, width), at(sy, height))
    }
}

/// What a pointer press grabbed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureKind {
    Drag,
    Resize(Anchor),
    Rotate,
}

/// Geometry written back when a gesture ends.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformUpdate {
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl TransformUpdate {
    pub fn of(layer: &TextLayer) -> Self {
        Self {
            x: layer.x,
            y: layer.y,
            rotation: layer.rotation,
            scale_x: layer.scale_x,
            scale_y: layer.scale_y,
        }
    }

    pub fn apply_to(&self, layer: &mut TextLayer) {
        layer.x = self.x;
        layer.y = self.y;
        layer.rotation = self.rotation;
        layer.scale_x = self.scale_x;
        layer.scale_y = self.scale_y;
    }

    fn transform(&self) -> NodeTransform {
        NodeTransform {
            origin: Vec2::new(self.x, self.y),
            rotation_deg: self.rotation,
            scale: Vec2::new(self.scale_x, self.scale_y),
        }
    }

    fn into_patch(self) -> TextLayerPatch {
        TextLayerPatch {
            x: Some(self.x),
            y: Some(self.y),
            rotation: Some(self.rotation),
            scale_x: Some(self.scale_x),
            scale_y: Some(self.scale_y),
            ..TextLayerPatch::default()
        }
    }
}

/// Selection frame geometry in canvas pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameGeometry {
    /// Box corners clockwise from the top-left.
    pub corners: [Point; 4],
    pub anchors: [(Anchor, Point); 8],
    pub rotater: Point,
    /// Rotation of the frame in degrees.
    pub rotation: f64,
}

impl FrameGeometry {
    pub fn new(geometry: &TransformUpdate, text: TextBox) -> Self {
        let frame = geometry.transform().frame_affine();
        let (w, h) = (text.width * geometry.scale_x, text.height * geometry.scale_y);
        let corners = [
            frame * Point::new(0.0, 0.0),
            frame * Point::new(w, 0.0),
            frame * Point::new(w, h),
            frame * Point::new(0.0, h),
        ];
        let anchors = Anchor::ALL.map(|a| (a, frame * a.local_point(w, h)));
        Self {
            corners,
            anchors,
            rotater: frame * Point::new(w / 2.0, -ROTATE_ANCHOR_OFFSET),
            rotation: geometry.rotation,
        }
    }
}

/// Gesture in flight; the store is only written when it ends.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveGesture {
    pub layer: LayerId,
    pub kind: GestureKind,
    start_pointer: Point,
    start: TransformUpdate,
    text: TextBox,
    preview: TransformUpdate,
}

impl ActiveGesture {
    /// Geometry the layer would have if the gesture ended now.
    pub fn preview(&self) -> TransformUpdate {
        self.preview
    }

    fn update(&mut self, p: Point) {
        self.preview = match self.kind {
            GestureKind::Drag => {
                let d = p - self.start_pointer;
                TransformUpdate {
                    x: self.start.x + d.x,
                    y: self.start.y + d.y,
                    ..self.start
                }
            }
            GestureKind::Resize(anchor) => {
                resize(&self.start, self.text, anchor, self.start_pointer, p)
            }
            GestureKind::Rotate => rotate(&self.start, self.text, p),
        };
    }
}

/// Result of a pointer press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerDown {
    /// A handle of the selected layer was grabbed.
    Handle(LayerId, GestureKind),
    /// A text layer was hit, selected and is being dragged.
    Layer(LayerId),
    /// Nothing interactive was hit; the selection was cleared.
    Empty,
}

/// Pointer-driven selection and transform state for one editing session.
#[derive(Clone, Debug, Default)]
pub struct Interaction {
    gesture: Option<ActiveGesture>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> Option<&ActiveGesture> {
        self.gesture.as_ref()
    }

    /// Live geometry for `id` while a gesture on it is in flight.
    pub fn preview_for(&self, id: LayerId) -> Option<TransformUpdate> {
        self.gesture
            .as_ref()
            .filter(|g| g.layer == id)
            .map(ActiveGesture::preview)
    }

    /// Drop an in-flight gesture without writing anything back.
    pub fn cancel(&mut self) {
        self.gesture = None;
    }

    /// Handles of the selected layer first, then text layers top-most first.
    ///
    /// Any text layer under the pointer is selected; only a draggable one starts a drag.
    pub fn pointer_down(
        &mut self,
        store: &mut TextLayerStore,
        fonts: &mut FontBook,
        p: Point,
    ) -> PointerDown {
        self.gesture = None;

        if let Some(layer) = store.current_layer() {
            let text = TextBox::measure(layer, fonts);
            let geometry = TransformUpdate::of(layer);
            if let Some(kind) = hit_handle(&geometry, text, p) {
                let id = layer.id;
                tracing::debug!(%id, ?kind, "transform started");
                self.gesture = Some(ActiveGesture {
                    layer: id,
                    kind,
                    start_pointer: p,
                    start: geometry,
                    text,
                    preview: geometry,
                });
                return PointerDown::Handle(id, kind);
            }
        }

        let hit = store
            .layers()
            .iter()
            .rev()
            .find_map(|l| {
                let text = TextBox::measure(l, fonts);
                contains_point(l, text, p)
                    .then_some((l.id, l.draggable, TransformUpdate::of(l), text))
            });

        match hit {
            Some((id, draggable, geometry, text)) => {
                store.select_layer(Some(id));
                if draggable {
                    self.gesture = Some(ActiveGesture {
                        layer: id,
                        kind: GestureKind::Drag,
                        start_pointer: p,
                        start: geometry,
                        text,
                        preview: geometry,
                    });
                }
                PointerDown::Layer(id)
            }
            None => {
                store.select_layer(None);
                PointerDown::Empty
            }
        }
    }

    /// Move the in-flight gesture's preview. Returns whether a gesture is active.
    pub fn pointer_move(&mut self, p: Point) -> bool {
        match self.gesture.as_mut() {
            Some(g) => {
                g.update(p);
                true
            }
            None => false,
        }
    }

    /// Finish the in-flight gesture and write its geometry into the store.
    pub fn pointer_up(&mut self, store: &mut TextLayerStore, p: Point) -> Option<LayerId> {
        let mut g = self.gesture.take()?;
        g.update(p);
        let end = g.preview;
        let written = match g.kind {
            GestureKind::Drag => drag_end(store, g.layer, end.x, end.y),
            GestureKind::Resize(_) | GestureKind::Rotate => transform_end(store, g.layer, end),
        };
        written.then_some(g.layer)
    }
}

/// Write back a finished drag: only the position changes.
pub fn drag_end(store: &mut TextLayerStore, id: LayerId, x: f64, y: f64) -> bool {
    tracing::debug!(%id, x, y, "drag end");
    store.update_layer(id, &TextLayerPatch::position(x, y))
}

/// Write back a finished transform: position, rotation and scale change.
pub fn transform_end(store: &mut TextLayerStore, id: LayerId, update: TransformUpdate) -> bool {
    tracing::debug!(%id, ?update, "transform end");
    store.update_layer(id, &update.into_patch())
}

/// Whether `p` falls inside the layer's text box under its full transform.
pub fn contains_point(layer: &TextLayer, text: TextBox, p: Point) -> bool {
    let affine = layer.transform().to_affine();
    if affine.determinant().abs() < f64::EPSILON {
        return false;
    }
    let local = affine.inverse() * p;
    local.x >= 0.0 && local.x <= text.width && local.y >= 0.0 && local.y <= text.height
}

/// Handle of the selection frame under `p`, the rotation anchor winning over resize anchors.
pub fn hit_handle(geometry: &TransformUpdate, text: TextBox, p: Point) -> Option<GestureKind> {
    let frame = geometry.transform().frame_affine();
    let local = frame.inverse() * p;
    let (w, h) = (text.width * geometry.scale_x, text.height * geometry.scale_y);
    let half = ANCHOR_SIZE / 2.0;
    let near = |q: Point| (local.x - q.x).abs() <= half && (local.y - q.y).abs() <= half;

    if near(Point::new(w / 2.0, -ROTATE_ANCHOR_OFFSET)) {
        return Some(GestureKind::Rotate);
    }
    Anchor::ALL
        .into_iter()
        .find(|a| near(a.local_point(w, h)))
        .map(GestureKind::Resize)
}

fn resize(
    start: &TransformUpdate,
    text: TextBox,
    anchor: Anchor,
    start_pointer: Point,
    p: Point,
) -> TransformUpdate {
    if text.width <= 0.0 || text.height <= 0.0 {
        return *start;
    }
    let frame = start.transform().frame_affine();
    let inv = frame.inverse();
    let d = (inv * p) - (inv * start_pointer);

    let (w0, h0) = (text.width * start.scale_x, text.height * start.scale_y);
    let (sx, sy) = anchor.sides();
    let min_w = text.width * MIN_SCALE;
    let min_h = text.height * MIN_SCALE;

    let (w, h) = if anchor.is_corner() {
        // Project the dragged corner onto the box diagonal through the fixed corner.
        let diag = Vec2::new(f64::from(sx) * w0, f64::from(sy) * h0);
        let moved = diag + d;
        let k_min = (min_w / w0).max(min_h / h0);
        let k = (moved.dot(diag) / diag.hypot2()).max(k_min);
        (w0 * k, h0 * k)
    } else {
        let w = match sx {
            0 => w0,
            _ => (w0 + f64::from(sx) * d.x).max(min_w),
        };
        let h = match sy {
            0 => h0,
            _ => (h0 + f64::from(sy) * d.y).max(min_h),
        };
        (w, h)
    };

    // Left/top anchors move the origin so the opposite side stays put.
    let left = if sx < 0 { w0 - w } else { 0.0 };
    let top = if sy < 0 { h0 - h } else { 0.0 };
    let origin = frame * Point::new(left, top);

    TransformUpdate {
        x: origin.x,
        y: origin.y,
        rotation: start.rotation,
        scale_x: w / text.width,
        scale_y: h / text.height,
    }
}

fn rotate(start: &TransformUpdate, text: TextBox, p: Point) -> TransformUpdate {
    let half = Vec2::new(
        text.width * start.scale_x / 2.0,
        text.height * start.scale_y / 2.0,
    );
    let center = start.transform().frame_affine() * half.to_point();
    let v = p - center;
    if v.hypot2() < f64::EPSILON {
        return *start;
    }
    // The rotater sits above the box, so pointing straight up means no rotation.
    let rotation = normalize_degrees(v.y.atan2(v.x).to_degrees() + 90.0);
    let origin = center - (Affine::rotate(rotation.to_radians()) * half.to_point()).to_vec2();

    TransformUpdate {
        x: origin.x,
        y: origin.y,
        rotation,
        ..*start
    }
}

fn normalize_degrees(deg: f64) -> f64 {
    let r = deg.rem_euclid(360.0);
    if r > 180.0 { r - 360.0 } else { r }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/interaction.rs"]
mod tests;
