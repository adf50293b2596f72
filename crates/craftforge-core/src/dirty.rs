use crate::id::ProductId;
use std::collections::BTreeSet;

/// Tracks which products of a recipe revision changed since the last save.
///
/// The host's save scheduler reads [`dirty_products`](DirtyTracker::dirty_products)
/// and calls [`mark_clean`](DirtyTracker::mark_clean) once they are written.
/// Removed products are tracked separately so their records can be deleted.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_products: BTreeSet<ProductId>,
    removed_products: BTreeSet<ProductId>,
    validity_dirty: bool,
}

impl DirtyTracker {
    /// Create a new tracker with nothing dirty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a product as changed. Its revision's validity must be recomputed.
    pub fn mark_product(&mut self, product: ProductId) {
        self.removed_products.remove(&product);
        self.dirty_products.insert(product);
        self.validity_dirty = true;
    }

    /// Mark a product as removed from its revision.
    pub fn mark_removed(&mut self, product: ProductId) {
        self.dirty_products.remove(&product);
        self.removed_products.insert(product);
        self.validity_dirty = true;
    }

    /// Returns `true` if anything needs saving.
    pub fn is_dirty(&self) -> bool {
        !self.dirty_products.is_empty() || !self.removed_products.is_empty()
    }

    pub fn is_product_dirty(&self, product: ProductId) -> bool {
        self.dirty_products.contains(&product)
    }

    pub fn dirty_products(&self) -> &BTreeSet<ProductId> {
        &self.dirty_products
    }

    pub fn removed_products(&self) -> &BTreeSet<ProductId> {
        &self.removed_products
    }

    /// Returns `true` when an edit happened since validity was last recomputed.
    pub fn is_validity_dirty(&self) -> bool {
        self.validity_dirty
    }

    pub fn clear_validity(&mut self) {
        self.validity_dirty = false;
    }

    /// Reset save flags after the host has persisted everything.
    pub fn mark_clean(&mut self) {
        self.dirty_products.clear();
        self.removed_products.clear();
    }
}
