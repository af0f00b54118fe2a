//! Manipulator arm: harvests field nodes into the inventory.

use crate::actuator::POWER_DRAW;
use crate::bus::{ActionMetadata, TelemetryMetadata};
use crate::error::ChassisError;
use crate::ids::ResourceId;
use crate::module::{Module, ModuleContext, ModuleDefinition};
use crate::payload::{ActionPayload, ActionResult, ActuatorPayload};

use super::{invalid_payload, unknown_action, MANIPULATION_ARM, POWER_CORE};

/// Pulls resources from the nearest node within reach.
///
/// A harvest never takes more from the field than the inventory can hold, and
/// each unit costs `energy_per_unit` through a `power.draw` request.
#[derive(Debug, Clone)]
pub struct ManipulatorModule {
    definition: ModuleDefinition,
    reach: f32,
    energy_per_unit: f32,
    heat_per_unit: f32,
}

impl ManipulatorModule {
    /// An arm with reach 5, costing 0.5 energy and 0.25 heat per unit.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            definition: ModuleDefinition::new(id, "Manipulator Arm")
                .providing(MANIPULATION_ARM)
                .requiring(POWER_CORE)
                .in_slot("arm"),
            reach: 5.0,
            energy_per_unit: 0.5,
            heat_per_unit: 0.25,
        }
    }

    /// Sets the reach.
    #[must_use]
    pub fn with_reach(mut self, reach: f32) -> Self {
        self.reach = reach;
        self
    }

    fn harvest(&self, ctx: &mut ModuleContext<'_>, resource: &ResourceId, amount: u32) -> Result<u32, ChassisError> {
        let Some(node) = ctx.field.nearest(ctx.state.position, resource, self.reach).map(|n| n.id) else {
            return Ok(0);
        };
        let wanted = amount.min(ctx.inventory.storable(resource));
        let taken = ctx.field.harvest(node, wanted);
        let stored = ctx.inventory.store(resource, taken).stored;

        if stored > 0 {
            #[allow(clippy::cast_precision_loss)]
            let units = stored as f32;
            ctx.port.request_actuator(
                POWER_DRAW,
                ActuatorPayload::PowerDraw {
                    energy: units * self.energy_per_unit,
                    heat: units * self.heat_per_unit,
                },
                0,
            )?;
        }
        Ok(stored)
    }
}

impl Module for ManipulatorModule {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn on_attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port
            .publish_value("lastHarvest", 0_u32, TelemetryMetadata::labelled("Last harvest", None))?;
        ctx.port.register_action("harvest", ActionMetadata::labelled("Harvest"))?;
        Ok(())
    }

    fn handle_action(
        &mut self,
        action: &str,
        payload: ActionPayload,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<ActionResult, ChassisError> {
        match (action, payload) {
            ("harvest", ActionPayload::Resource { resource, amount }) => {
                let amount = self.harvest(ctx, &resource, amount)?;
                ctx.port.update_value("lastHarvest", amount)?;
                Ok(ActionResult::Harvested { resource, amount })
            }
            ("harvest", _) => Err(invalid_payload(ctx, action)),
            _ => Err(unknown_action(ctx, action)),
        }
    }
}
