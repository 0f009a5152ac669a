use serde::{Deserialize, Serialize};
use std::ops::{Deref, Index};

/// Ordered, never-empty list of parameter presets (noise layers, splat
/// layers, species). Order is meaningful: it is the accumulation order for
/// noise and the channel index for splat layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetList<T> {
    items: Vec<T>,
}

impl<T: Default> Default for PresetList<T> {
    fn default() -> Self {
        Self {
            items: vec![T::default()],
        }
    }
}

impl<T> PresetList<T> {
    /// Starts from one preset.
    pub fn new(first: T) -> Self {
        Self { items: vec![first] }
    }

    /// `None` when `items` is empty.
    pub fn from_vec(items: Vec<T>) -> Option<Self> {
        (!items.is_empty()).then_some(Self { items })
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Removes the preset at `index`. The last remaining preset is kept.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if self.items.len() <= 1 || index >= self.items.len() {
            return None;
        }
        Some(self.items.remove(index))
    }

    /// Drops every preset matching `marked`, keeping the first one if all
    /// would go. Returns how many were removed.
    pub fn remove_marked(&mut self, mut marked: impl FnMut(&T) -> bool) -> usize {
        let before = self.items.len();
        let mut first_kept = None;
        let mut kept = Vec::with_capacity(before);
        for (i, item) in self.items.drain(..).enumerate() {
            if !marked(&item) {
                kept.push(item);
            } else if i == 0 {
                first_kept = Some(item);
            }
        }
        if kept.is_empty() {
            kept.extend(first_kept);
        }
        self.items = kept;
        before - self.items.len()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Deref for PresetList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> Index<usize> for PresetList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}
