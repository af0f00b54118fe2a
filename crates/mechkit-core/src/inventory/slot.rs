//! Inventory slots and their metadata.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ids::{ResourceId, SlotId};

bitflags! {
    /// Behaviour flags of a slot.
    ///
    /// - `STACKABLE`: holds any count of one resource; otherwise one item
    /// - `LOCKED`: refuses store, withdraw and transfers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SlotFlags: u8 {
        /// Slot holds a stack of one resource.
        const STACKABLE = 1 << 0;
        /// Slot contents are pinned in place.
        const LOCKED = 1 << 1;
    }
}

/// Per-slot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotMetadata {
    /// Behaviour flags.
    pub flags: SlotFlags,
    /// Kind of equipment the slot is meant for (e.g. `tool`), informational.
    pub module_subtype: Option<String>,
}

impl Default for SlotMetadata {
    fn default() -> Self {
        Self::stackable()
    }
}

impl SlotMetadata {
    /// An unlocked stackable slot.
    #[must_use]
    pub fn stackable() -> Self {
        Self {
            flags: SlotFlags::STACKABLE,
            module_subtype: None,
        }
    }

    /// An unlocked equipment slot for the given subtype.
    #[must_use]
    pub fn equipment(subtype: &str) -> Self {
        Self {
            flags: SlotFlags::empty(),
            module_subtype: Some(subtype.to_string()),
        }
    }

    /// Returns true if the slot stacks.
    #[must_use]
    pub fn is_stackable(&self) -> bool {
        self.flags.contains(SlotFlags::STACKABLE)
    }

    /// Returns true if the slot is locked.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.flags.contains(SlotFlags::LOCKED)
    }
}

/// One indexed inventory position.
///
/// An equipment (non-stackable) slot holds at most one unit, so its
/// `stack_count` is 1 whenever it is occupied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot id, `slot-<index>`.
    pub id: SlotId,
    /// Position in the slot array.
    pub index: usize,
    /// Configuration.
    pub metadata: SlotMetadata,
    /// What the slot holds.
    pub occupant: Option<ResourceId>,
    /// How many units it holds.
    pub stack_count: u32,
}

impl Slot {
    /// An empty stackable slot at `index`.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            id: SlotId::for_index(index),
            index,
            metadata: SlotMetadata::default(),
            occupant: None,
            stack_count: 0,
        }
    }

    /// Returns true if nothing is in the slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }

    /// Units held: 0 when empty.
    #[must_use]
    pub fn units(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            self.stack_count
        }
    }

    /// Returns true if this stackable, unlocked slot holds `resource`.
    #[must_use]
    pub fn holds_stack_of(&self, resource: &ResourceId) -> bool {
        self.metadata.is_stackable() && !self.metadata.is_locked() && self.occupant.as_ref() == Some(resource)
    }

    /// Returns true if this is an empty, stackable, unlocked slot.
    #[must_use]
    pub fn accepts_new_stack(&self) -> bool {
        self.metadata.is_stackable() && !self.metadata.is_locked() && self.is_empty()
    }

    /// Fills the slot.
    pub fn fill(&mut self, resource: ResourceId, count: u32) {
        if count == 0 {
            self.clear();
        } else {
            self.occupant = Some(resource);
            self.stack_count = count;
        }
    }

    /// Removes up to `amount` units and returns how many were taken.
    pub fn take(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.units());
        self.stack_count -= taken;
        if self.stack_count == 0 {
            self.clear();
        }
        taken
    }

    /// Empties the slot.
    pub fn clear(&mut self) {
        self.occupant = None;
        self.stack_count = 0;
    }
}
