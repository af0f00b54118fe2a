//! Slot-based inventory shared by resources and equipment.
//!
//! The [`InventoryStore`] is a fixed array of [`Slot`]s. Stackable slots hold
//! a count of one resource and take part in [`InventoryStore::store`] and
//! [`InventoryStore::withdraw`]; equipment slots hold one item each and are
//! addressed by slot id. Both kinds draw on a single capacity budget, which
//! is the sum of named capacity sources (one per contributing module) and is
//! independent of the number of slots.
//!
//! # Accounting
//!
//! - `capacity` = sum of capacity sources
//! - `used` = units in stackable slots + 1 per occupied equipment slot
//! - `available` = `capacity - used`, floored at 0
//!
//! Store, withdraw and transfer report partial success through their return
//! values; none of them fail.
//!
//! # Example
//!
//! ```
//! use mechkit_core::inventory::InventoryStore;
//! use mechkit_core::ids::{ModuleId, ResourceId};
//!
//! let mut inventory = InventoryStore::new(1);
//! inventory.set_capacity_source(&ModuleId::new("cargo"), 5);
//!
//! let ore = ResourceId::new("ore");
//! let first = inventory.store(&ore, 3);
//! assert_eq!((first.stored, first.overflow, first.total), (3, 0, 3));
//!
//! let second = inventory.store(&ore, 4);
//! assert_eq!((second.stored, second.overflow, second.total), (2, 2, 5));
//! ```

mod slot;
mod transfer;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use slot::{Slot, SlotFlags, SlotMetadata};
pub use transfer::{TransferOutcome, TransferStatus};

use crate::ids::{ModuleId, ResourceId, SlotId};

// =============================================================================
// Results and Snapshots
// =============================================================================

/// Outcome of a store call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResult {
    /// Units accepted.
    pub stored: u32,
    /// Units turned away.
    pub overflow: u32,
    /// Quantity of the resource held afterwards.
    pub total: u32,
}

/// Outcome of a withdraw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawResult {
    /// Units removed.
    pub withdrawn: u32,
    /// Units requested but not available.
    pub remaining: u32,
    /// Quantity of the resource held afterwards.
    pub total: u32,
}

/// Total quantity of one resource across stackable slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Resource kind.
    pub resource: ResourceId,
    /// Units held.
    pub quantity: u32,
}

/// An item sitting in an equipment slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentEntry {
    /// Slot holding the item.
    pub slot: SlotId,
    /// Item id.
    pub item: ResourceId,
    /// Slot subtype, if configured.
    pub module_subtype: Option<String>,
}

/// Aggregate view of the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Sum of capacity sources.
    pub capacity: u32,
    /// Units held.
    pub used: u32,
    /// Units that can still be stored.
    pub available: u32,
    /// Per-resource totals, ordered by resource id.
    pub entries: Vec<InventoryEntry>,
    /// Every slot in index order.
    pub slots: Vec<Slot>,
    /// Occupied equipment slots in index order.
    pub equipment: Vec<EquipmentEntry>,
}

/// Handle returned by the subscribe calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

enum Listener {
    Snapshot(Box<dyn FnMut(&InventorySnapshot)>),
    Slots(Box<dyn FnMut(&[Slot])>),
}

// =============================================================================
// Inventory Store
// =============================================================================

/// Fixed slot array with an aggregated capacity budget.
pub struct InventoryStore {
    slots: Vec<Slot>,
    sources: BTreeMap<ModuleId, u32>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl fmt::Debug for InventoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryStore")
            .field("slots", &self.slots)
            .field("sources", &self.sources)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new(0)
    }
}

impl InventoryStore {
    /// Creates an inventory with `slot_count` empty stackable slots and no
    /// capacity.
    #[must_use]
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: (0..slot_count).map(Slot::new).collect(),
            sources: BTreeMap::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Resizes the slot array.
    ///
    /// Growing appends empty stackable slots. Shrinking only happens when every
    /// slot that would be removed is empty; otherwise nothing changes and
    /// `false` is returned.
    pub fn configure_slot_capacity(&mut self, count: usize) -> bool {
        match count.cmp(&self.slots.len()) {
            std::cmp::Ordering::Equal => return true,
            std::cmp::Ordering::Greater => {
                let start = self.slots.len();
                self.slots.extend((start..count).map(Slot::new));
            }
            std::cmp::Ordering::Less => {
                if self.slots[count..].iter().any(|s| !s.is_empty()) {
                    return false;
                }
                self.slots.truncate(count);
            }
        }
        self.notify();
        true
    }

    /// Replaces a slot's metadata.
    ///
    /// Refused when the slot is unknown or when it holds more than one unit
    /// and the new metadata is not stackable.
    pub fn set_slot_metadata(&mut self, slot: &SlotId, metadata: SlotMetadata) -> bool {
        let Some(target) = self.slot_mut(slot) else {
            return false;
        };
        if !metadata.is_stackable() && target.units() > 1 {
            return false;
        }
        target.metadata = metadata;
        self.notify();
        true
    }

    /// Locks a slot. Returns false if the slot is unknown.
    pub fn lock_slot(&mut self, slot: &SlotId) -> bool {
        self.set_lock(slot, true)
    }

    /// Unlocks a slot. Returns false if the slot is unknown.
    pub fn unlock_slot(&mut self, slot: &SlotId) -> bool {
        self.set_lock(slot, false)
    }

    fn set_lock(&mut self, slot: &SlotId, locked: bool) -> bool {
        let Some(target) = self.slot_mut(slot) else {
            return false;
        };
        target.metadata.flags.set(SlotFlags::LOCKED, locked);
        self.notify();
        true
    }

    /// Sets the capacity a module contributes, replacing any previous value.
    pub fn set_capacity_source(&mut self, source: &ModuleId, capacity: u32) {
        self.sources.insert(source.clone(), capacity);
        self.notify();
    }

    /// Removes a module's capacity contribution. Unknown ids are ignored.
    pub fn remove_capacity_source(&mut self, source: &ModuleId) {
        if self.sources.remove(source).is_some() {
            self.notify();
        }
    }

    // -------------------------------------------------------------------------
    // Accounting
    // -------------------------------------------------------------------------

    /// Sum of capacity sources.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.sources.values().fold(0u32, |acc, c| acc.saturating_add(*c))
    }

    /// Units held by stackable slots plus one per occupied equipment slot.
    #[must_use]
    pub fn used(&self) -> u32 {
        self.slots.iter().map(Slot::units).sum()
    }

    /// Remaining capacity, floored at 0.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.capacity().saturating_sub(self.used())
    }

    /// Units of `resource` across stackable slots.
    #[must_use]
    pub fn get_quantity(&self, resource: &ResourceId) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.metadata.is_stackable() && s.occupant.as_ref() == Some(resource))
            .map(|s| s.stack_count)
            .sum()
    }

    /// Units of `resource` a withdraw call could take right now. Locked slots
    /// are not counted.
    #[must_use]
    pub fn withdrawable(&self, resource: &ResourceId) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.holds_stack_of(resource))
            .map(|s| s.stack_count)
            .sum()
    }

    /// Units of `resource` a store call would accept right now: the available
    /// capacity if some unlocked stackable slot can take the resource, else 0.
    #[must_use]
    pub fn storable(&self, resource: &ResourceId) -> u32 {
        let has_room = self
            .slots
            .iter()
            .any(|s| s.holds_stack_of(resource) || s.accepts_new_stack());
        if has_room {
            self.available()
        } else {
            0
        }
    }

    /// Slot by id.
    #[must_use]
    pub fn slot(&self, slot: &SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| &s.id == slot)
    }

    fn slot_mut(&mut self, slot: &SlotId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|s| &s.id == slot)
    }

    fn slot_position(&self, slot: &SlotId) -> Option<usize> {
        self.slots.iter().position(|s| &s.id == slot)
    }

    /// All slots in index order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    // -------------------------------------------------------------------------
    // Store / Withdraw
    // -------------------------------------------------------------------------

    /// Stores up to `amount` units of `resource`, bounded by available capacity.
    ///
    /// Units go to the first unlocked stackable slot already holding the
    /// resource, or else to the first empty unlocked stackable slot, so a
    /// resource never spreads over more slots than needed.
    pub fn store(&mut self, resource: &ResourceId, amount: u32) -> StoreResult {
        let accepted = amount.min(self.storable(resource));
        let mut stored = 0;

        if accepted > 0 {
            let target = self
                .slots
                .iter()
                .position(|s| s.holds_stack_of(resource))
                .or_else(|| self.slots.iter().position(Slot::accepts_new_stack));
            if let Some(position) = target {
                let slot = &mut self.slots[position];
                slot.fill(resource.clone(), slot.units() + accepted);
                stored = accepted;
            }
        }

        if stored > 0 {
            self.notify();
        }
        StoreResult {
            stored,
            overflow: amount - stored,
            total: self.get_quantity(resource),
        }
    }

    /// Withdraws up to `amount` units of `resource` from unlocked stackable
    /// slots, in slot order.
    pub fn withdraw(&mut self, resource: &ResourceId, amount: u32) -> WithdrawResult {
        let mut withdrawn = 0;
        for slot in self.slots.iter_mut().filter(|s| s.holds_stack_of(resource)) {
            if withdrawn == amount {
                break;
            }
            withdrawn += slot.take(amount - withdrawn);
        }

        if withdrawn > 0 {
            self.notify();
        }
        WithdrawResult {
            withdrawn,
            remaining: amount - withdrawn,
            total: self.get_quantity(resource),
        }
    }

    // -------------------------------------------------------------------------
    // Equipment
    // -------------------------------------------------------------------------

    /// Puts one item into an empty, unlocked equipment slot.
    ///
    /// Refused when the slot is unknown, stackable, occupied, locked, or when
    /// no capacity is left.
    pub fn place_equipment(&mut self, slot: &SlotId, item: &ResourceId) -> bool {
        let available = self.available();
        let Some(target) = self.slot_mut(slot) else {
            return false;
        };
        if target.metadata.is_stackable() || target.metadata.is_locked() || !target.is_empty() || available == 0 {
            return false;
        }
        target.fill(item.clone(), 1);
        self.notify();
        true
    }

    /// Removes the item from an unlocked equipment slot.
    pub fn take_equipment(&mut self, slot: &SlotId) -> Option<ResourceId> {
        let target = self.slot_mut(slot)?;
        if target.metadata.is_stackable() || target.metadata.is_locked() {
            return None;
        }
        let item = target.occupant.take()?;
        target.clear();
        self.notify();
        Some(item)
    }

    // -------------------------------------------------------------------------
    // Snapshots and Subscriptions
    // -------------------------------------------------------------------------

    /// Aggregate view of capacity, totals, slots and equipment.
    #[must_use]
    pub fn get_snapshot(&self) -> InventorySnapshot {
        let mut totals: BTreeMap<&ResourceId, u32> = BTreeMap::new();
        let mut equipment = Vec::new();
        for slot in &self.slots {
            let Some(occupant) = &slot.occupant else {
                continue;
            };
            if slot.metadata.is_stackable() {
                *totals.entry(occupant).or_default() += slot.stack_count;
            } else {
                equipment.push(EquipmentEntry {
                    slot: slot.id.clone(),
                    item: occupant.clone(),
                    module_subtype: slot.metadata.module_subtype.clone(),
                });
            }
        }

        InventorySnapshot {
            capacity: self.capacity(),
            used: self.used(),
            available: self.available(),
            entries: totals
                .into_iter()
                .map(|(resource, quantity)| InventoryEntry {
                    resource: resource.clone(),
                    quantity,
                })
                .collect(),
            slots: self.slots.clone(),
            equipment,
        }
    }

    /// Registers a snapshot listener. It is called once right away and again
    /// after every change.
    pub fn subscribe(&mut self, mut listener: impl FnMut(&InventorySnapshot) + 'static) -> SubscriptionId {
        listener(&self.get_snapshot());
        self.add_listener(Listener::Snapshot(Box::new(listener)))
    }

    /// Registers a slot-list listener. It is called once right away and again
    /// after every change.
    pub fn subscribe_slots(&mut self, mut listener: impl FnMut(&[Slot]) + 'static) -> SubscriptionId {
        listener(self.slots.as_slice());
        self.add_listener(Listener::Slots(Box::new(listener)))
    }

    /// Removes a listener. Returns false if the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(other, _)| *other != id);
        self.listeners.len() != before
    }

    fn add_listener(&mut self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    fn notify(&mut self) {
        if self.listeners.is_empty() {
            return;
        }
        let snapshot = self.get_snapshot();
        for (_, listener) in &mut self.listeners {
            match listener {
                Listener::Snapshot(callback) => callback(&snapshot),
                Listener::Slots(callback) => callback(&snapshot.slots),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ore() -> ResourceId {
        ResourceId::new("ore")
    }

    fn inventory(slots: usize, capacity: u32) -> InventoryStore {
        let mut inventory = InventoryStore::new(slots);
        inventory.set_capacity_source(&ModuleId::new("cargo"), capacity);
        inventory
    }

    mod capacity_tests {
        use super::*;

        #[test]
        fn capacity_sums_sources() {
            let mut inv = InventoryStore::new(2);
            inv.set_capacity_source(&ModuleId::new("a"), 5);
            inv.set_capacity_source(&ModuleId::new("b"), 7);
            assert_eq!(inv.capacity(), 12);
            inv.set_capacity_source(&ModuleId::new("a"), 1);
            assert_eq!(inv.capacity(), 8);
            inv.remove_capacity_source(&ModuleId::new("b"));
            assert_eq!(inv.capacity(), 1);
        }

        #[test]
        fn available_floors_at_zero() {
            let mut inv = inventory(2, 5);
            inv.store(&ore(), 5);
            inv.remove_capacity_source(&ModuleId::new("cargo"));
            assert_eq!(inv.used(), 5);
            assert_eq!(inv.available(), 0);
        }

        #[test]
        fn grow_slot_array() {
            let mut inv = InventoryStore::new(1);
            assert!(inv.configure_slot_capacity(3));
            assert_eq!(inv.slots().len(), 3);
            assert_eq!(inv.slots()[2].id.as_str(), "slot-2");
        }

        #[test]
        fn shrink_over_occupied_slot_is_noop() {
            let mut inv = inventory(3, 10);
            inv.store(&ore(), 1);
            // move the stack to the last slot
            inv.transfer_slot_item(&SlotId::for_index(0), &SlotId::for_index(2), None);

            assert!(!inv.configure_slot_capacity(1));
            assert_eq!(inv.slots().len(), 3);
            assert!(inv.configure_slot_capacity(3));
        }

        #[test]
        fn shrink_over_empty_slots_truncates() {
            let mut inv = inventory(4, 10);
            inv.store(&ore(), 2);
            assert!(inv.configure_slot_capacity(1));
            assert_eq!(inv.slots().len(), 1);
            assert_eq!(inv.get_quantity(&ore()), 2);
        }
    }

    mod store_tests {
        use super::*;

        #[test]
        fn store_then_overflow() {
            let mut inv = inventory(1, 5);
            assert_eq!(
                inv.store(&ore(), 3),
                StoreResult {
                    stored: 3,
                    overflow: 0,
                    total: 3
                }
            );
            assert_eq!(
                inv.store(&ore(), 4),
                StoreResult {
                    stored: 2,
                    overflow: 2,
                    total: 5
                }
            );
        }

        #[test]
        fn store_prefers_existing_stack() {
            let mut inv = inventory(3, 20);
            inv.store(&ResourceId::new("ice"), 1);
            inv.store(&ore(), 2);
            inv.store(&ore(), 3);

            let slots = inv.slots();
            assert_eq!(slots[1].occupant, Some(ore()));
            assert_eq!(slots[1].stack_count, 5);
            assert!(slots[2].is_empty());
        }

        #[test]
        fn store_without_free_slot_overflows() {
            let mut inv = inventory(1, 20);
            inv.store(&ResourceId::new("ice"), 1);
            let result = inv.store(&ore(), 4);
            assert_eq!(result.stored, 0);
            assert_eq!(result.overflow, 4);
            assert_eq!(result.total, 0);
        }

        #[test]
        fn storable_needs_a_slot() {
            let mut inv = inventory(1, 20);
            assert_eq!(inv.storable(&ore()), 20);
            inv.store(&ResourceId::new("ice"), 1);
            assert_eq!(inv.storable(&ore()), 0);
            assert_eq!(inv.storable(&ResourceId::new("ice")), 19);
        }

        #[test]
        fn store_skips_locked_slots() {
            let mut inv = inventory(2, 20);
            inv.lock_slot(&SlotId::for_index(0));
            inv.store(&ore(), 2);
            assert!(inv.slots()[0].is_empty());
            assert_eq!(inv.slots()[1].stack_count, 2);
        }

        #[test]
        fn store_skips_equipment_slots() {
            let mut inv = inventory(2, 20);
            inv.set_slot_metadata(&SlotId::for_index(0), SlotMetadata::equipment("tool"));
            inv.store(&ore(), 2);
            assert!(inv.slots()[0].is_empty());
        }

        #[test]
        fn zero_amount_is_harmless() {
            let mut inv = inventory(1, 5);
            assert_eq!(
                inv.store(&ore(), 0),
                StoreResult {
                    stored: 0,
                    overflow: 0,
                    total: 0
                }
            );
        }
    }

    mod withdraw_tests {
        use super::*;

        #[test]
        fn store_then_withdraw_all() {
            let mut inv = inventory(2, 10);
            inv.store(&ore(), 7);
            let result = inv.withdraw(&ore(), 7);
            assert_eq!(
                result,
                WithdrawResult {
                    withdrawn: 7,
                    remaining: 0,
                    total: 0
                }
            );
            assert_eq!(inv.get_quantity(&ore()), 0);
            assert!(inv.slots()[0].is_empty());
        }

        #[test]
        fn locked_stack_is_not_withdrawable() {
            let mut inv = inventory(2, 10);
            inv.store(&ore(), 4);
            inv.lock_slot(&SlotId::for_index(0));
            assert_eq!(inv.get_quantity(&ore()), 4);
            assert_eq!(inv.withdrawable(&ore()), 0);
            assert_eq!(inv.withdraw(&ore(), 4).withdrawn, 0);
        }

        #[test]
        fn withdraw_more_than_held() {
            let mut inv = inventory(2, 10);
            inv.store(&ore(), 2);
            let result = inv.withdraw(&ore(), 5);
            assert_eq!(result.withdrawn, 2);
            assert_eq!(result.remaining, 3);
        }

        #[test]
        fn withdraw_spans_slots_in_order() {
            let mut inv = inventory(3, 10);
            inv.store(&ore(), 4);
            // split the stack over two slots
            inv.transfer_slot_item(&SlotId::for_index(0), &SlotId::for_index(2), Some(1));
            let result = inv.withdraw(&ore(), 4);
            assert_eq!(result.withdrawn, 4);
            assert!(inv.slots()[0].is_empty());
            assert!(inv.slots()[2].is_empty());
        }
    }

    mod equipment_tests {
        use super::*;

        #[test]
        fn place_and_take_equipment() {
            let mut inv = inventory(2, 10);
            let slot = SlotId::for_index(1);
            inv.set_slot_metadata(&slot, SlotMetadata::equipment("tool"));
            assert!(inv.place_equipment(&slot, &ResourceId::new("drill")));
            assert!(!inv.place_equipment(&slot, &ResourceId::new("saw")));

            let snapshot = inv.get_snapshot();
            assert_eq!(snapshot.used, 1);
            assert_eq!(snapshot.equipment.len(), 1);
            assert_eq!(snapshot.equipment[0].item, ResourceId::new("drill"));
            assert!(snapshot.entries.is_empty());

            assert_eq!(inv.take_equipment(&slot), Some(ResourceId::new("drill")));
            assert_eq!(inv.used(), 0);
        }

        #[test]
        fn equipment_needs_capacity() {
            let mut inv = inventory(2, 1);
            inv.store(&ore(), 1);
            let slot = SlotId::for_index(1);
            inv.set_slot_metadata(&slot, SlotMetadata::equipment("tool"));
            assert!(!inv.place_equipment(&slot, &ResourceId::new("drill")));
        }

        #[test]
        fn stacked_slot_cannot_become_equipment() {
            let mut inv = inventory(1, 10);
            inv.store(&ore(), 3);
            assert!(!inv.set_slot_metadata(&SlotId::for_index(0), SlotMetadata::equipment("tool")));
        }
    }

    mod subscription_tests {
        use super::*;

        #[test]
        fn listener_called_immediately_and_on_change() {
            let mut inv = inventory(2, 10);
            let seen = Rc::new(RefCell::new(Vec::new()));
            let sink = Rc::clone(&seen);
            inv.subscribe(move |snapshot| sink.borrow_mut().push(snapshot.used));

            inv.store(&ore(), 3);
            inv.withdraw(&ore(), 1);
            assert_eq!(*seen.borrow(), vec![0, 3, 2]);
        }

        #[test]
        fn slot_listener_sees_slots() {
            let mut inv = inventory(2, 10);
            let seen = Rc::new(RefCell::new(0usize));
            let sink = Rc::clone(&seen);
            inv.subscribe_slots(move |slots| *sink.borrow_mut() += slots.len());
            inv.store(&ore(), 1);
            assert_eq!(*seen.borrow(), 4);
        }

        #[test]
        fn unsubscribe_stops_notifications() {
            let mut inv = inventory(2, 10);
            let calls = Rc::new(RefCell::new(0));
            let sink = Rc::clone(&calls);
            let id = inv.subscribe(move |_| *sink.borrow_mut() += 1);
            assert!(inv.unsubscribe(id));
            inv.store(&ore(), 1);
            assert_eq!(*calls.borrow(), 1);
            assert!(!inv.unsubscribe(id));
        }

        #[test]
        fn snapshot_entries_are_sorted() {
            let mut inv = inventory(3, 10);
            inv.store(&ResourceId::new("silicon"), 1);
            inv.store(&ResourceId::new("ice"), 2);
            let names: Vec<_> = inv
                .get_snapshot()
                .entries
                .iter()
                .map(|e| e.resource.as_str().to_string())
                .collect();
            assert_eq!(names, vec!["ice", "silicon"]);
        }
    }
}
