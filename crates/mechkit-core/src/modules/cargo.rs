//! Cargo bay: contributes inventory capacity and moves resources.

use crate::bus::{ActionMetadata, TelemetryMetadata};
use crate::error::ChassisError;
use crate::ids::ResourceId;
use crate::inventory::{StoreResult, WithdrawResult};
use crate::module::{Module, ModuleContext, ModuleDefinition};
use crate::payload::{ActionPayload, ActionResult};

use super::{invalid_payload, unknown_action, POWER_CORE, STORAGE_CARGO};

/// Adds a capacity source to the chassis inventory while attached.
#[derive(Debug, Clone)]
pub struct CargoModule {
    definition: ModuleDefinition,
    capacity: u32,
}

impl CargoModule {
    /// A cargo bay contributing `capacity` units.
    #[must_use]
    pub fn new(id: &str, capacity: u32) -> Self {
        Self {
            definition: ModuleDefinition::new(id, "Cargo Bay")
                .providing(STORAGE_CARGO)
                .requiring(POWER_CORE)
                .in_slot("bay"),
            capacity,
        }
    }

    /// Contributed capacity.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn refresh(ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        let used = ctx.inventory.used();
        let available = ctx.inventory.available();
        ctx.port.update_value("used", used)?;
        ctx.port.update_value("available", available)?;
        Ok(())
    }
}

/// Inventory to box. Only what the box can take leaves the inventory.
fn deposit(ctx: &mut ModuleContext<'_>, box_id: &str, resource: &ResourceId, amount: u32) -> StoreResult {
    let room = ctx.storage.box_mut(box_id).available();
    let taken = ctx.inventory.withdraw(resource, amount.min(room)).withdrawn;
    let placed = ctx.storage.store(box_id, resource, taken);
    StoreResult {
        stored: placed.stored,
        overflow: amount - placed.stored,
        total: placed.total,
    }
}

/// Box to inventory. Units the inventory turns away go back into the box.
fn retrieve(ctx: &mut ModuleContext<'_>, box_id: &str, resource: &ResourceId, amount: u32) -> WithdrawResult {
    let room = ctx.inventory.storable(resource);
    let taken = ctx.storage.withdraw(box_id, resource, amount.min(room));
    let landed = ctx.inventory.store(resource, taken.withdrawn);
    let total = if landed.overflow > 0 {
        ctx.storage.store(box_id, resource, landed.overflow).total
    } else {
        taken.total
    };
    WithdrawResult {
        withdrawn: landed.stored,
        remaining: amount - landed.stored,
        total,
    }
}

impl Module for CargoModule {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn on_attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.inventory.set_capacity_source(ctx.port.module_id(), self.capacity);
        ctx.port
            .publish_value("used", ctx.inventory.used(), TelemetryMetadata::labelled("Used", None))?;
        ctx.port.publish_value(
            "available",
            ctx.inventory.available(),
            TelemetryMetadata::labelled("Available", None),
        )?;
        for (name, label) in [
            ("store", "Store"),
            ("withdraw", "Withdraw"),
            ("transferSlot", "Move between slots"),
            ("deposit", "Deposit to box"),
            ("retrieve", "Retrieve from box"),
        ] {
            ctx.port.register_action(name, ActionMetadata::labelled(label))?;
        }
        Ok(())
    }

    fn on_detach(&mut self, ctx: &mut ModuleContext<'_>) {
        ctx.inventory.remove_capacity_source(ctx.port.module_id());
    }

    fn update(&mut self, _step_seconds: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        Self::refresh(ctx)
    }

    fn handle_action(
        &mut self,
        action: &str,
        payload: ActionPayload,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<ActionResult, ChassisError> {
        let result = match (action, payload) {
            ("store", ActionPayload::Resource { resource, amount }) => {
                ActionResult::Stored(ctx.inventory.store(&resource, amount))
            }
            ("withdraw", ActionPayload::Resource { resource, amount }) => {
                ActionResult::Withdrawn(ctx.inventory.withdraw(&resource, amount))
            }
            ("transferSlot", ActionPayload::SlotTransfer { source, target, amount }) => {
                ActionResult::Transfer(ctx.inventory.transfer_slot_item(&source, &target, amount))
            }
            (
                "deposit",
                ActionPayload::Depot {
                    box_id,
                    resource,
                    amount,
                },
            ) => ActionResult::Stored(deposit(ctx, &box_id, &resource, amount)),
            (
                "retrieve",
                ActionPayload::Depot {
                    box_id,
                    resource,
                    amount,
                },
            ) => ActionResult::Withdrawn(retrieve(ctx, &box_id, &resource, amount)),
            ("store" | "withdraw" | "transferSlot" | "deposit" | "retrieve", _) => {
                return Err(invalid_payload(ctx, action))
            }
            _ => return Err(unknown_action(ctx, action)),
        };
        Self::refresh(ctx)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SlotId;
    use crate::inventory::TransferStatus;
    use crate::modules::test_support::Rig;

    fn ore() -> ResourceId {
        ResourceId::new("ore")
    }

    fn attached(capacity: u32) -> (Rig, CargoModule) {
        let mut rig = Rig::new("bay");
        let mut cargo = CargoModule::new("bay", capacity);
        cargo.on_attach(&mut rig.ctx()).unwrap();
        (rig, cargo)
    }

    fn resource(amount: u32) -> ActionPayload {
        ActionPayload::Resource {
            resource: ore(),
            amount,
        }
    }

    fn depot(amount: u32) -> ActionPayload {
        ActionPayload::Depot {
            box_id: "depot".to_string(),
            resource: ore(),
            amount,
        }
    }

    mod capacity_tests {
        use super::*;

        #[test]
        fn attach_and_detach_manage_capacity_source() {
            let (mut rig, mut cargo) = attached(10);
            assert_eq!(rig.inventory.capacity(), 10);
            assert_eq!(rig.number("available"), Some(10.0));
            cargo.on_detach(&mut rig.ctx());
            assert_eq!(rig.inventory.capacity(), 0);
        }

        #[test]
        fn store_updates_telemetry() {
            let (mut rig, mut cargo) = attached(5);
            let result = cargo.handle_action("store", resource(7), &mut rig.ctx()).unwrap();
            assert_eq!(
                result,
                ActionResult::Stored(StoreResult {
                    stored: 5,
                    overflow: 2,
                    total: 5
                })
            );
            assert_eq!(rig.number("used"), Some(5.0));
            assert_eq!(rig.number("available"), Some(0.0));
        }

        #[test]
        fn withdraw_and_transfer() {
            let (mut rig, mut cargo) = attached(10);
            cargo.handle_action("store", resource(4), &mut rig.ctx()).unwrap();
            let moved = cargo
                .handle_action(
                    "transferSlot",
                    ActionPayload::SlotTransfer {
                        source: SlotId::for_index(0),
                        target: SlotId::for_index(3),
                        amount: Some(1),
                    },
                    &mut rig.ctx(),
                )
                .unwrap();
            assert!(matches!(moved, ActionResult::Transfer(o) if o.status == TransferStatus::Split));

            let out = cargo.handle_action("withdraw", resource(4), &mut rig.ctx()).unwrap();
            assert!(matches!(out, ActionResult::Withdrawn(w) if w.withdrawn == 4 && w.total == 0));
        }
    }

    mod depot_tests {
        use super::*;

        #[test]
        fn deposit_moves_only_what_fits() {
            let (mut rig, mut cargo) = attached(30);
            rig.storage.register_box("depot", 4);
            cargo.handle_action("store", resource(6), &mut rig.ctx()).unwrap();

            let result = cargo.handle_action("deposit", depot(6), &mut rig.ctx()).unwrap();
            assert_eq!(
                result,
                ActionResult::Stored(StoreResult {
                    stored: 4,
                    overflow: 2,
                    total: 4
                })
            );
            assert_eq!(rig.inventory.get_quantity(&ore()), 2);
        }

        #[test]
        fn retrieve_is_bounded_by_inventory() {
            let (mut rig, mut cargo) = attached(3);
            rig.storage.store("depot", &ore(), 10);

            let result = cargo.handle_action("retrieve", depot(5), &mut rig.ctx()).unwrap();
            assert_eq!(
                result,
                ActionResult::Withdrawn(WithdrawResult {
                    withdrawn: 3,
                    remaining: 2,
                    total: 7
                })
            );
            assert_eq!(rig.inventory.get_quantity(&ore()), 3);
        }

        #[test]
        fn wrong_payload() {
            let (mut rig, mut cargo) = attached(3);
            let err = cargo
                .handle_action("deposit", resource(1), &mut rig.ctx())
                .unwrap_err();
            assert!(matches!(err, ChassisError::InvalidPayload { .. }));
        }
    }
}
