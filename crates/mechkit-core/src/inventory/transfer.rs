//! Slot-to-slot transfers.
//!
//! [`InventoryStore::transfer_slot_item`] moves units between two slots and
//! reports exactly one [`TransferStatus`]. Checks run in this order:
//!
//! 1. same slot → `Noop`
//! 2. unknown source / target → `InvalidSource` / `InvalidTarget`
//! 3. zero or oversized amount → `InvalidAmount`
//! 4. empty source → `EmptySource`
//! 5. either slot locked → `SlotLocked`
//! 6. empty target → `Moved` (whole stack) or `Split` (part of it)
//! 7. same resource, both stackable → `Merged`
//! 8. different resource, whole stack → `Swapped`
//! 9. anything else → `Rejected`
//!
//! An equipment slot never ends up holding more than one unit; a move, split
//! or swap that would break that is `Rejected`. Transfers never change
//! `used`, so capacity is not consulted.

use serde::{Deserialize, Serialize};

use super::{InventoryStore, Slot};
use crate::ids::SlotId;

/// Result category of a slot transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferStatus {
    /// Source and target are the same slot.
    Noop,
    /// Source slot does not exist.
    InvalidSource,
    /// Target slot does not exist.
    InvalidTarget,
    /// Amount is zero or larger than the source stack.
    InvalidAmount,
    /// Source slot is empty.
    EmptySource,
    /// Source or target slot is locked.
    SlotLocked,
    /// The slots cannot exchange these contents.
    Rejected,
    /// Whole source stack moved into an empty target.
    Moved,
    /// Part of the source stack moved into an empty target.
    Split,
    /// Units added onto a matching target stack.
    Merged,
    /// Source and target contents exchanged.
    Swapped,
}

impl TransferStatus {
    /// Returns true if the inventory changed.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Moved | Self::Split | Self::Merged | Self::Swapped)
    }
}

/// Status plus the number of units that left the source slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// What happened.
    pub status: TransferStatus,
    /// Units moved out of the source slot (0 unless successful).
    pub moved: u32,
}

impl TransferOutcome {
    const fn failed(status: TransferStatus) -> Self {
        Self { status, moved: 0 }
    }
}

impl InventoryStore {
    /// Moves `amount` units (default: the whole stack) from `source` to `target`.
    pub fn transfer_slot_item(&mut self, source: &SlotId, target: &SlotId, amount: Option<u32>) -> TransferOutcome {
        if source == target {
            return TransferOutcome::failed(TransferStatus::Noop);
        }
        let Some(si) = self.slot_position(source) else {
            return TransferOutcome::failed(TransferStatus::InvalidSource);
        };
        let Some(ti) = self.slot_position(target) else {
            return TransferOutcome::failed(TransferStatus::InvalidTarget);
        };

        let outcome = plan_and_apply(&mut self.slots, si, ti, amount);
        if outcome.status.is_success() {
            self.notify();
        }
        outcome
    }
}

fn plan_and_apply(slots: &mut [Slot], si: usize, ti: usize, amount: Option<u32>) -> TransferOutcome {
    let (src, dst) = pair_mut(slots, si, ti);

    let held = src.units();
    if amount == Some(0) || amount.is_some_and(|a| held > 0 && a > held) {
        return TransferOutcome::failed(TransferStatus::InvalidAmount);
    }
    let Some(resource) = src.occupant.clone() else {
        return TransferOutcome::failed(TransferStatus::EmptySource);
    };
    if src.metadata.is_locked() || dst.metadata.is_locked() {
        return TransferOutcome::failed(TransferStatus::SlotLocked);
    }

    let amount = amount.unwrap_or(held);
    let whole = amount == held;

    if dst.is_empty() {
        if !dst.metadata.is_stackable() && amount > 1 {
            return TransferOutcome::failed(TransferStatus::Rejected);
        }
        src.take(amount);
        dst.fill(resource, amount);
        let status = if whole { TransferStatus::Moved } else { TransferStatus::Split };
        return TransferOutcome { status, moved: amount };
    }

    let same = dst.occupant.as_ref() == Some(&resource);
    if same && src.metadata.is_stackable() && dst.metadata.is_stackable() {
        src.take(amount);
        dst.fill(resource, dst.units() + amount);
        return TransferOutcome {
            status: TransferStatus::Merged,
            moved: amount,
        };
    }

    if !same && whole {
        let other = dst.units();
        let fits_target = dst.metadata.is_stackable() || held <= 1;
        let fits_source = src.metadata.is_stackable() || other <= 1;
        if fits_target && fits_source {
            let other_resource = dst.occupant.take();
            dst.fill(resource, held);
            match other_resource {
                Some(r) => src.fill(r, other),
                None => src.clear(),
            }
            return TransferOutcome {
                status: TransferStatus::Swapped,
                moved: held,
            };
        }
    }

    TransferOutcome::failed(TransferStatus::Rejected)
}

/// Mutable references to two distinct slots.
fn pair_mut(slots: &mut [Slot], a: usize, b: usize) -> (&mut Slot, &mut Slot) {
    debug_assert_ne!(a, b);
    if a < b {
        let (left, right) = slots.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = slots.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

#[cfg(test)]
mod tests {
    use crate::ids::{ModuleId, ResourceId, SlotId};
    use crate::inventory::{InventoryStore, SlotMetadata, TransferStatus};

    fn slot(i: usize) -> SlotId {
        SlotId::for_index(i)
    }

    fn stocked() -> InventoryStore {
        let mut inv = InventoryStore::new(4);
        inv.set_capacity_source(&ModuleId::new("cargo"), 50);
        inv.store(&ResourceId::new("ore"), 5);
        inv
    }

    mod guard_tests {
        use super::*;

        #[test]
        fn same_slot_is_noop() {
            let mut inv = stocked();
            assert_eq!(inv.transfer_slot_item(&slot(0), &slot(0), None).status, TransferStatus::Noop);
        }

        #[test]
        fn unknown_slots_are_invalid() {
            let mut inv = stocked();
            assert_eq!(
                inv.transfer_slot_item(&SlotId::new("nope"), &slot(1), None).status,
                TransferStatus::InvalidSource
            );
            assert_eq!(
                inv.transfer_slot_item(&slot(0), &SlotId::new("nope"), None).status,
                TransferStatus::InvalidTarget
            );
        }

        #[test]
        fn bad_amounts_are_invalid() {
            let mut inv = stocked();
            assert_eq!(
                inv.transfer_slot_item(&slot(0), &slot(1), Some(0)).status,
                TransferStatus::InvalidAmount
            );
            assert_eq!(
                inv.transfer_slot_item(&slot(0), &slot(1), Some(6)).status,
                TransferStatus::InvalidAmount
            );
        }

        #[test]
        fn empty_source() {
            let mut inv = stocked();
            assert_eq!(
                inv.transfer_slot_item(&slot(2), &slot(1), None).status,
                TransferStatus::EmptySource
            );
        }

        #[test]
        fn locked_target_fails() {
            let mut inv = stocked();
            inv.lock_slot(&slot(1));
            let outcome = inv.transfer_slot_item(&slot(0), &slot(1), None);
            assert_eq!(outcome.status, TransferStatus::SlotLocked);
            assert_eq!(outcome.moved, 0);
            assert_eq!(inv.slots()[0].stack_count, 5);
        }
    }

    mod move_tests {
        use super::*;

        #[test]
        fn whole_stack_moves() {
            let mut inv = stocked();
            let outcome = inv.transfer_slot_item(&slot(0), &slot(3), None);
            assert_eq!(outcome.status, TransferStatus::Moved);
            assert_eq!(outcome.moved, 5);
            assert!(inv.slots()[0].is_empty());
            assert_eq!(inv.slots()[3].stack_count, 5);
        }

        #[test]
        fn partial_amount_splits() {
            let mut inv = stocked();
            let outcome = inv.transfer_slot_item(&slot(0), &slot(1), Some(2));
            assert_eq!(outcome.status, TransferStatus::Split);
            assert_eq!(inv.slots()[0].stack_count, 3);
            assert_eq!(inv.slots()[1].stack_count, 2);
            assert_eq!(inv.get_quantity(&ResourceId::new("ore")), 5);
        }

        #[test]
        fn matching_stacks_merge() {
            let mut inv = stocked();
            inv.transfer_slot_item(&slot(0), &slot(1), Some(2));
            let outcome = inv.transfer_slot_item(&slot(1), &slot(0), None);
            assert_eq!(outcome.status, TransferStatus::Merged);
            assert_eq!(inv.slots()[0].stack_count, 5);
            assert!(inv.slots()[1].is_empty());
        }

        #[test]
        fn different_stacks_swap() {
            let mut inv = stocked();
            inv.store(&ResourceId::new("ice"), 2);
            let outcome = inv.transfer_slot_item(&slot(0), &slot(1), None);
            assert_eq!(outcome.status, TransferStatus::Swapped);
            assert_eq!(inv.slots()[0].occupant, Some(ResourceId::new("ice")));
            assert_eq!(inv.slots()[0].stack_count, 2);
            assert_eq!(inv.slots()[1].occupant, Some(ResourceId::new("ore")));
            assert_eq!(inv.slots()[1].stack_count, 5);
        }

        #[test]
        fn partial_onto_different_stack_is_rejected() {
            let mut inv = stocked();
            inv.store(&ResourceId::new("ice"), 2);
            let outcome = inv.transfer_slot_item(&slot(0), &slot(1), Some(1));
            assert_eq!(outcome.status, TransferStatus::Rejected);
        }

        #[test]
        fn stack_into_equipment_slot_is_rejected() {
            let mut inv = stocked();
            inv.set_slot_metadata(&slot(2), SlotMetadata::equipment("tool"));
            assert_eq!(
                inv.transfer_slot_item(&slot(0), &slot(2), None).status,
                TransferStatus::Rejected
            );
            assert_eq!(
                inv.transfer_slot_item(&slot(0), &slot(2), Some(1)).status,
                TransferStatus::Split
            );
        }

        #[test]
        fn equipment_swaps_between_tool_slots() {
            let mut inv = stocked();
            inv.set_slot_metadata(&slot(2), SlotMetadata::equipment("tool"));
            inv.set_slot_metadata(&slot(3), SlotMetadata::equipment("tool"));
            inv.place_equipment(&slot(2), &ResourceId::new("drill"));
            inv.place_equipment(&slot(3), &ResourceId::new("saw"));

            let outcome = inv.transfer_slot_item(&slot(2), &slot(3), None);
            assert_eq!(outcome.status, TransferStatus::Swapped);
            assert_eq!(inv.slots()[2].occupant, Some(ResourceId::new("saw")));
            assert_eq!(inv.slots()[3].occupant, Some(ResourceId::new("drill")));
        }

        #[test]
        fn round_trip_restores_occupancy() {
            let mut inv = stocked();
            let before = inv.slots().to_vec();
            inv.transfer_slot_item(&slot(0), &slot(1), None);
            inv.transfer_slot_item(&slot(1), &slot(0), None);
            assert_eq!(inv.slots(), before.as_slice());
        }
    }
}
