//! Named off-chassis storage boxes.
//!
//! A [`StorageBox`] is a flat resource map with one capacity number; it has no
//! slots and never holds equipment. The [`StorageRegistry`] creates boxes on
//! first use with a default capacity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ids::ResourceId;
use crate::inventory::{StoreResult, WithdrawResult};

/// A flat, capacity-bounded resource container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBox {
    /// Box id.
    pub id: String,
    /// Maximum units held.
    pub capacity: u32,
    contents: BTreeMap<ResourceId, u32>,
}

impl StorageBox {
    /// Creates an empty box.
    #[must_use]
    pub fn new(id: &str, capacity: u32) -> Self {
        Self {
            id: id.to_string(),
            capacity,
            contents: BTreeMap::new(),
        }
    }

    /// Units of `resource` held.
    #[must_use]
    pub fn quantity(&self, resource: &ResourceId) -> u32 {
        self.contents.get(resource).copied().unwrap_or(0)
    }

    /// Units held across all resources.
    #[must_use]
    pub fn used(&self) -> u32 {
        self.contents.values().sum()
    }

    /// Units that still fit.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.used())
    }

    /// Per-resource contents, ordered by resource id.
    #[must_use]
    pub fn contents(&self) -> &BTreeMap<ResourceId, u32> {
        &self.contents
    }

    /// Stores up to `amount` units, bounded by available capacity.
    pub fn store(&mut self, resource: &ResourceId, amount: u32) -> StoreResult {
        let stored = amount.min(self.available());
        if stored > 0 {
            *self.contents.entry(resource.clone()).or_default() += stored;
        }
        StoreResult {
            stored,
            overflow: amount - stored,
            total: self.quantity(resource),
        }
    }

    /// Withdraws up to `amount` units.
    pub fn withdraw(&mut self, resource: &ResourceId, amount: u32) -> WithdrawResult {
        let held = self.quantity(resource);
        let withdrawn = amount.min(held);
        if withdrawn == held {
            self.contents.remove(resource);
        } else if let Some(quantity) = self.contents.get_mut(resource) {
            *quantity -= withdrawn;
        }
        WithdrawResult {
            withdrawn,
            remaining: amount - withdrawn,
            total: held - withdrawn,
        }
    }

    /// Empties the box.
    pub fn clear(&mut self) {
        self.contents.clear();
    }
}

/// Collection of boxes keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRegistry {
    default_capacity: u32,
    boxes: BTreeMap<String, StorageBox>,
}

impl StorageRegistry {
    /// Creates an empty registry whose lazily created boxes get
    /// `default_capacity`.
    #[must_use]
    pub fn new(default_capacity: u32) -> Self {
        Self {
            default_capacity,
            boxes: BTreeMap::new(),
        }
    }

    /// Looks up a box without creating it.
    #[must_use]
    pub fn get_box(&self, id: &str) -> Option<&StorageBox> {
        self.boxes.get(id)
    }

    /// Returns the box, creating it with the default capacity if needed.
    pub fn box_mut(&mut self, id: &str) -> &mut StorageBox {
        let capacity = self.default_capacity;
        self.boxes.entry(id.to_string()).or_insert_with(|| {
            debug!(box_id = id, capacity, "created storage box");
            StorageBox::new(id, capacity)
        })
    }

    /// Inserts or replaces a box with an explicit capacity.
    pub fn register_box(&mut self, id: &str, capacity: u32) -> &mut StorageBox {
        self.boxes.insert(id.to_string(), StorageBox::new(id, capacity));
        self.box_mut(id)
    }

    /// Boxes in id order.
    pub fn boxes(&self) -> impl Iterator<Item = &StorageBox> {
        self.boxes.values()
    }

    /// Stores into a box.
    pub fn store(&mut self, box_id: &str, resource: &ResourceId, amount: u32) -> StoreResult {
        self.box_mut(box_id).store(resource, amount)
    }

    /// Withdraws from a box. Unknown boxes yield nothing and are not created.
    pub fn withdraw(&mut self, box_id: &str, resource: &ResourceId, amount: u32) -> WithdrawResult {
        match self.boxes.get_mut(box_id) {
            Some(storage) => storage.withdraw(resource, amount),
            None => WithdrawResult {
                withdrawn: 0,
                remaining: amount,
                total: 0,
            },
        }
    }

    /// Empties a box. Returns false if it does not exist.
    pub fn clear(&mut self, box_id: &str) -> bool {
        match self.boxes.get_mut(box_id) {
            Some(storage) => {
                storage.clear();
                true
            }
            None => false,
        }
    }
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ore() -> ResourceId {
        ResourceId::new("ore")
    }

    mod box_tests {
        use super::*;

        #[test]
        fn store_respects_capacity() {
            let mut storage = StorageBox::new("depot", 5);
            assert_eq!(
                storage.store(&ore(), 3),
                StoreResult {
                    stored: 3,
                    overflow: 0,
                    total: 3
                }
            );
            assert_eq!(
                storage.store(&ResourceId::new("ice"), 4),
                StoreResult {
                    stored: 2,
                    overflow: 2,
                    total: 2
                }
            );
            assert_eq!(storage.available(), 0);
        }

        #[test]
        fn withdraw_reports_remaining() {
            let mut storage = StorageBox::new("depot", 10);
            storage.store(&ore(), 4);
            assert_eq!(
                storage.withdraw(&ore(), 6),
                WithdrawResult {
                    withdrawn: 4,
                    remaining: 2,
                    total: 0
                }
            );
            assert!(storage.contents().is_empty());
        }

        #[test]
        fn clear_empties() {
            let mut storage = StorageBox::new("depot", 10);
            storage.store(&ore(), 4);
            storage.clear();
            assert_eq!(storage.used(), 0);
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn store_creates_box_with_default_capacity() {
            let mut registry = StorageRegistry::new(8);
            assert!(registry.get_box("a").is_none());
            let result = registry.store("a", &ore(), 10);
            assert_eq!(result.stored, 8);
            assert_eq!(registry.get_box("a").map(|b| b.capacity), Some(8));
        }

        #[test]
        fn withdraw_from_unknown_box_is_empty() {
            let mut registry = StorageRegistry::default();
            let result = registry.withdraw("missing", &ore(), 3);
            assert_eq!(result.withdrawn, 0);
            assert_eq!(result.remaining, 3);
            assert!(registry.get_box("missing").is_none());
        }

        #[test]
        fn register_box_overrides_capacity() {
            let mut registry = StorageRegistry::new(8);
            registry.register_box("big", 100);
            assert_eq!(registry.store("big", &ore(), 60).stored, 60);
        }

        #[test]
        fn clear_reports_unknown_boxes() {
            let mut registry = StorageRegistry::default();
            registry.store("a", &ore(), 1);
            assert!(registry.clear("a"));
            assert!(!registry.clear("b"));
            assert_eq!(registry.get_box("a").map(StorageBox::used), Some(0));
        }
    }
}
