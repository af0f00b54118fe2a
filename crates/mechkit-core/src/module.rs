//! Module trait and supporting types.
//!
//! A module is an attachable unit of behaviour. It declares what it provides
//! and requires through a [`ModuleDefinition`], and the chassis calls its
//! lifecycle hooks:
//!
//! - [`Module::on_attach`]: publish telemetry and register actions
//! - [`Module::update`]: once per tick, in stack order
//! - [`Module::handle_action`]: when a caller invokes one of its actions
//! - [`Module::on_detach`]: release anything held outside the bus
//!
//! Every hook receives a [`ModuleContext`]. The context exposes a read-only
//! snapshot of the physical state; modules change the chassis only by
//! queueing actuator requests through their [`ModulePort`].
//!
//! # Example
//!
//! ```
//! use mechkit_core::module::{Module, ModuleContext, ModuleDefinition};
//! use mechkit_core::error::ChassisError;
//! use mechkit_core::payload::ActuatorPayload;
//!
//! struct Spinner {
//!     definition: ModuleDefinition,
//! }
//!
//! impl Module for Spinner {
//!     fn definition(&self) -> &ModuleDefinition {
//!         &self.definition
//!     }
//!
//!     fn update(&mut self, _step: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
//!         ctx.port
//!             .request_actuator("movement.angular", ActuatorPayload::Angular { rate: 1.0 }, 0)
//!     }
//! }
//!
//! let spinner = Spinner {
//!     definition: ModuleDefinition::new("spinner", "Spinner").in_slot("core"),
//! };
//! assert_eq!(spinner.definition().id.as_str(), "spinner");
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bus::ModulePort;
use crate::error::ChassisError;
use crate::field::ResourceField;
use crate::ids::{Capability, ModuleId};
use crate::inventory::InventoryStore;
use crate::payload::{ActionPayload, ActionResult};
use crate::state::PhysicalState;
use crate::storage::StorageRegistry;

// =============================================================================
// Module Definition
// =============================================================================

/// Requested attachment point of a module.
///
/// `slot` is a free-form bucket (`core`, `extension`, `sensor`, ...). When
/// `index` is `None` the stack allocates the next free index in the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRequest {
    /// Slot bucket name.
    pub slot: String,
    /// Explicit position within the slot.
    pub index: Option<u32>,
}

/// Immutable description of a module, supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Stable id, unique within a chassis.
    pub id: ModuleId,
    /// Human-readable title.
    pub title: String,
    /// Capabilities this module adds to the stack.
    pub provides: BTreeSet<Capability>,
    /// Capabilities that must be present while this module is attached.
    pub requires: BTreeSet<Capability>,
    /// Requested attachment point.
    pub attachment: AttachmentRequest,
    /// Share of the stack capacity this module consumes.
    pub capacity_cost: u32,
}

impl ModuleDefinition {
    /// Creates a definition in the `extension` slot with cost 1 and no
    /// capabilities.
    #[must_use]
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: ModuleId::new(id),
            title: title.to_string(),
            provides: BTreeSet::new(),
            requires: BTreeSet::new(),
            attachment: AttachmentRequest {
                slot: "extension".to_string(),
                index: None,
            },
            capacity_cost: 1,
        }
    }

    /// Adds a provided capability.
    #[must_use]
    pub fn providing(mut self, capability: &str) -> Self {
        self.provides.insert(Capability::new(capability));
        self
    }

    /// Adds a required capability.
    #[must_use]
    pub fn requiring(mut self, capability: &str) -> Self {
        self.requires.insert(Capability::new(capability));
        self
    }

    /// Sets the attachment slot, leaving the index to auto-allocation.
    #[must_use]
    pub fn in_slot(mut self, slot: &str) -> Self {
        self.attachment.slot = slot.to_string();
        self
    }

    /// Pins the module to an explicit index within its slot.
    #[must_use]
    pub fn at_index(mut self, index: u32) -> Self {
        self.attachment.index = Some(index);
        self
    }

    /// Sets the capacity cost.
    #[must_use]
    pub fn with_cost(mut self, capacity_cost: u32) -> Self {
        self.capacity_cost = capacity_cost;
        self
    }
}

// =============================================================================
// Module Context
// =============================================================================

/// Everything a module hook may touch.
///
/// `state` is a snapshot taken before the hook runs, so reading it never
/// observes a half-applied tick.
pub struct ModuleContext<'a> {
    /// Physical state snapshot.
    pub state: &'a PhysicalState,
    /// The module's own port onto the bus and actuator queue.
    pub port: ModulePort<'a>,
    /// Chassis inventory.
    pub inventory: &'a mut InventoryStore,
    /// Off-chassis storage boxes.
    pub storage: &'a mut StorageRegistry,
    /// Harvestable resource field.
    pub field: &'a mut ResourceField,
}

impl ModuleContext<'_> {
    /// Id of the module this context is bound to.
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        self.port.module_id()
    }
}

// =============================================================================
// Module Trait
// =============================================================================

/// An attachable unit of behaviour.
///
/// All hooks except [`Module::definition`] have no-op defaults, so a module
/// implements only what it needs. Hooks run synchronously on the caller's
/// thread.
pub trait Module {
    /// Returns the module's definition.
    fn definition(&self) -> &ModuleDefinition;

    /// Called once after the stack accepted the module.
    ///
    /// # Errors
    ///
    /// Any error aborts the attach; the chassis rolls the module back out.
    fn on_attach(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        Ok(())
    }

    /// Called once after the stack released the module.
    ///
    /// The module's bus entries are dropped right after this returns.
    fn on_detach(&mut self, _ctx: &mut ModuleContext<'_>) {}

    /// Called once per tick, in stack order.
    ///
    /// # Errors
    ///
    /// Errors are logged by the chassis; the tick continues with the next module.
    fn update(&mut self, _step_seconds: f32, _ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        Ok(())
    }

    /// Runs one of the actions this module registered on the bus.
    ///
    /// # Errors
    ///
    /// The default implementation reports every action as unknown.
    fn handle_action(
        &mut self,
        action: &str,
        _payload: ActionPayload,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<ActionResult, ChassisError> {
        Err(ChassisError::ActionNotFound {
            module: ctx.module_id().clone(),
            action: action.to_string(),
        })
    }
}
