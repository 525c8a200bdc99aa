//! Saved products.

use serde::{Deserialize, Serialize};
use vernont_core::ProductId;

/// Ordered, de-duplicated product ids, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist(Vec<ProductId>);

impl Wishlist {
    /// Maximum number of saved products. Adding beyond this drops the oldest.
    pub const MAX_ITEMS: usize = 100;

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.0.contains(id)
    }

    #[must_use]
    pub fn ids(&self) -> &[ProductId] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Add a product. Returns `false` if it was already saved.
    pub fn add(&mut self, id: ProductId) -> bool {
        if self.contains(&id) {
            return false;
        }
        if self.0.len() >= Self::MAX_ITEMS {
            self.0.remove(0);
        }
        self.0.push(id);
        true
    }

    /// Remove a product. Returns `false` if it was not saved.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.0.len();
        self.0.retain(|saved| saved != id);
        self.0.len() != before
    }

    /// Add or remove. Returns whether the product is saved afterwards.
    pub fn toggle(&mut self, id: ProductId) -> bool {
        if self.remove(&id) {
            false
        } else {
            self.add(id)
        }
    }

    /// Drop ids the backend no longer knows. Returns how many were dropped.
    pub fn retain_known(&mut self, known: &[ProductId]) -> usize {
        let before = self.0.len();
        self.0.retain(|id| known.contains(id));
        before - self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: usize) -> ProductId {
        ProductId::new(format!("prod_{n}"))
    }

    #[test]
    fn test_toggle() {
        let mut wishlist = Wishlist::default();
        assert!(wishlist.toggle(id(1)));
        assert!(wishlist.contains(&id(1)));
        assert!(!wishlist.toggle(id(1)));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_add_is_deduplicated() {
        let mut wishlist = Wishlist::default();
        assert!(wishlist.add(id(1)));
        assert!(!wishlist.add(id(1)));
        assert_eq!(wishlist.len(), 1);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut wishlist = Wishlist::default();
        for n in 0..=Wishlist::MAX_ITEMS {
            wishlist.add(id(n));
        }
        assert_eq!(wishlist.len(), Wishlist::MAX_ITEMS);
        assert!(!wishlist.contains(&id(0)));
        assert!(wishlist.contains(&id(Wishlist::MAX_ITEMS)));
    }

    #[test]
    fn test_retain_known() {
        let mut wishlist = Wishlist::default();
        wishlist.add(id(1));
        wishlist.add(id(2));
        wishlist.add(id(3));
        assert_eq!(wishlist.retain_known(&[id(3), id(1)]), 1);
        assert_eq!(wishlist.ids(), &[id(1), id(3)]);
    }
}
