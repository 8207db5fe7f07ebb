use crate::layers::model::{LayerId, NewTextLayer, TextLayer, TextLayerPatch};

/// Ordered collection of text layers plus the current selection.
///
/// Insertion order is stacking order among text layers. The selection always refers to a
/// layer in the store, or to nothing.
#[derive(Clone, Debug, Default)]
pub struct TextLayerStore {
    layers: Vec<TextLayer>,
    selected: Option<LayerId>,
    next_id: u64,
}

impl TextLayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer with a freshly generated id and select it.
    pub fn add_layer(&mut self, initial: NewTextLayer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.push(initial.into_layer(id));
        self.selected = Some(id);
        tracing::debug!(%id, "text layer added");
        id
    }

    /// Merge `patch` into the layer with `id`. Absent ids are a no-op.
    ///
    /// Returns whether a layer was found.
    pub fn update_layer(&mut self, id: LayerId, patch: &TextLayerPatch) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                patch.apply_to(layer);
                true
            }
            None => false,
        }
    }

    /// Set the selection. Selecting an absent id selects nothing.
    pub fn select_layer(&mut self, id: Option<LayerId>) -> Option<LayerId> {
        self.selected = id.filter(|id| self.contains(*id));
        self.selected
    }

    pub fn selected(&self) -> Option<LayerId> {
        self.selected
    }

    /// The selected layer, if any.
    pub fn current_layer(&self) -> Option<&TextLayer> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Remove a layer; clears the selection if it pointed at it.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<TextLayer> {
        let pos = self.layers.iter().position(|l| l.id == id)?;
        let removed = self.layers.remove(pos);
        if self.selected == Some(id) {
            self.selected = None;
        }
        tracing::debug!(%id, "text layer removed");
        Some(removed)
    }

    pub fn get(&self, id: LayerId) -> Option<&TextLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    /// Layers in stacking order (first is drawn first).
    pub fn layers(&self) -> &[TextLayer] {
        &self.layers
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|l| l.id).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layers/store.rs"]
mod tests;
