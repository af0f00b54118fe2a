//! Composition root running the per-step tick.
//!
//! The [`Chassis`] owns the module stack, the bus, the inventory, the storage
//! registry, the resource field, the physical state and the pending actuator
//! queue. One call to [`Chassis::tick`] runs four phases:
//!
//! 1. **UPDATE**: every module's `update`, in stack order, against a state
//!    snapshot taken at the start of the tick
//! 2. **ARBITRATE**: per channel, rank the queued requests and hand the
//!    winner to the channel handler; channels without a handler are dropped
//! 3. **INTEGRATE**: advance position and orientation
//! 4. **COOL**: passive heat dissipation at `cooling_rate`
//!
//! Requests queued by [`Chassis::invoke_action`] between ticks take part in
//! the next arbitration.
//!
//! # Determinism
//!
//! Modules run in `(slot, index, id)` order, channels are arbitrated in name
//! order and the ranking is total, so the same inputs always produce the
//! same state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::actuator::{
    ActuatorQueue, AngularDrive, ChannelHandler, ChannelInvocation, LinearDrive, PowerDraw, MOVEMENT_ANGULAR,
    MOVEMENT_LINEAR, POWER_DRAW,
};
use crate::bus::{ModuleBus, ModulePort, TelemetrySnapshot};
use crate::error::ChassisError;
use crate::field::{FieldConfig, ResourceField};
use crate::ids::ModuleId;
use crate::inventory::InventoryStore;
use crate::module::{Module, ModuleContext};
use crate::payload::{ActionPayload, ActionResult};
use crate::stack::{AttachmentMetadata, ModuleStack, StackSnapshot};
use crate::state::PhysicalState;
use crate::storage::StorageRegistry;

// =============================================================================
// Configuration
// =============================================================================

/// Chassis construction parameters. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisConfig {
    /// Module stack capacity.
    pub module_capacity: u32,
    /// Number of inventory slots.
    pub inventory_slots: usize,
    /// Energy ceiling for recharging.
    pub max_energy: f32,
    /// Energy at construction, clamped to `max_energy`.
    pub initial_energy: f32,
    /// Heat removed per second.
    pub cooling_rate: f32,
    /// Capacity of storage boxes created on first use.
    pub storage_box_capacity: u32,
    /// Resource field generation.
    pub field: FieldConfig,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            module_capacity: 6,
            inventory_slots: 12,
            max_energy: 100.0,
            initial_energy: 100.0,
            cooling_rate: 5.0,
            storage_box_capacity: 50,
            field: FieldConfig::default(),
        }
    }
}

impl ChassisConfig {
    /// Default config with a different module capacity.
    #[must_use]
    pub fn with_module_capacity(module_capacity: u32) -> Self {
        Self {
            module_capacity,
            ..Default::default()
        }
    }
}

// =============================================================================
// Chassis
// =============================================================================

/// Everything a module hook can reach, split from the stack so a module and
/// its context can be borrowed at the same time.
struct Shared {
    bus: ModuleBus,
    pending: ActuatorQueue,
    inventory: InventoryStore,
    storage: StorageRegistry,
    field: ResourceField,
}

impl Shared {
    fn context<'a>(&'a mut self, id: &'a ModuleId, order: usize, state: &'a PhysicalState) -> ModuleContext<'a> {
        ModuleContext {
            state,
            port: ModulePort::new(id, order, &mut self.bus, &mut self.pending),
            inventory: &mut self.inventory,
            storage: &mut self.storage,
            field: &mut self.field,
        }
    }

    fn forget(&mut self, id: &ModuleId) {
        self.bus.remove_module(id);
        self.inventory.remove_capacity_source(id);
        self.pending.remove_module(id);
    }
}

/// A composable mechanism: modules plus the state they act on.
pub struct Chassis {
    config: ChassisConfig,
    stack: ModuleStack,
    shared: Shared,
    state: PhysicalState,
    channels: BTreeMap<String, Box<dyn ChannelHandler>>,
    tick: u64,
}

impl fmt::Debug for Chassis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chassis")
            .field("tick", &self.tick)
            .field("state", &self.state)
            .field("stack", &self.stack)
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for Chassis {
    fn default() -> Self {
        Self::new(ChassisConfig::default())
    }
}

impl Chassis {
    /// Builds a chassis with the built-in `movement.linear`,
    /// `movement.angular` and `power.draw` handlers.
    ///
    /// ```
    /// use mechkit_core::chassis::{Chassis, ChassisConfig};
    ///
    /// let chassis = Chassis::new(ChassisConfig::default());
    /// assert_eq!(chassis.tick_count(), 0);
    /// assert_eq!(chassis.state().energy, 100.0);
    /// assert_eq!(chassis.inventory().slots().len(), 12);
    /// ```
    #[must_use]
    pub fn new(config: ChassisConfig) -> Self {
        let mut channels: BTreeMap<String, Box<dyn ChannelHandler>> = BTreeMap::new();
        channels.insert(MOVEMENT_LINEAR.to_string(), Box::new(LinearDrive));
        channels.insert(MOVEMENT_ANGULAR.to_string(), Box::new(AngularDrive));
        channels.insert(POWER_DRAW.to_string(), Box::new(PowerDraw));

        let shared = Shared {
            bus: ModuleBus::new(),
            pending: ActuatorQueue::new(),
            inventory: InventoryStore::new(config.inventory_slots),
            storage: StorageRegistry::new(config.storage_box_capacity),
            field: ResourceField::generate(&config.field),
        };

        Self {
            stack: ModuleStack::new(config.module_capacity),
            state: PhysicalState::with_energy(config.initial_energy.min(config.max_energy).max(0.0)),
            shared,
            channels,
            tick: 0,
            config,
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Attaches a module and runs its `on_attach` hook.
    ///
    /// If the hook fails, the module is taken back out of the stack and
    /// everything it registered is dropped before the error is returned.
    ///
    /// # Errors
    ///
    /// Any [`crate::error::StackError`] from the stack, or the hook's error.
    pub fn attach_module(&mut self, module: Box<dyn Module>) -> Result<AttachmentMetadata, ChassisError> {
        let id = module.definition().id.clone();
        let metadata = self.stack.attach(module)?;
        let order = self
            .stack
            .order_index(&id)
            .ok_or_else(|| ChassisError::ModuleNotAttached(id.clone()))?;

        let snapshot = self.state.clone();
        let hook = match self.stack.get_module_mut(&id) {
            Some(module) => module.on_attach(&mut self.shared.context(&id, order, &snapshot)),
            None => Err(ChassisError::ModuleNotAttached(id.clone())),
        };

        if let Err(error) = hook {
            warn!(module = %id, %error, "on_attach failed, rolling back");
            if let Err(rollback) = self.stack.detach(&id) {
                warn!(module = %id, error = %rollback, "rollback detach failed");
            }
            self.shared.forget(&id);
            return Err(error);
        }

        debug!(module = %id, slot = %metadata.slot, index = metadata.index, "module attached");
        Ok(metadata)
    }

    /// Detaches a module and runs its `on_detach` hook.
    ///
    /// Afterwards the module's bus entries, capacity source and pending
    /// actuator requests are gone. Unknown ids return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`crate::error::StackError::DependencyWouldBreak`]; nothing changes in
    /// that case.
    pub fn detach_module(&mut self, id: &ModuleId) -> Result<Option<Box<dyn Module>>, ChassisError> {
        let Some(order) = self.stack.order_index(id) else {
            return Ok(None);
        };
        let Some(mut module) = self.stack.detach(id)? else {
            return Ok(None);
        };

        let snapshot = self.state.clone();
        module.on_detach(&mut self.shared.context(id, order, &snapshot));
        self.shared.forget(id);

        debug!(module = %id, "module detached");
        Ok(Some(module))
    }

    /// Registers a handler for a new actuator channel.
    ///
    /// # Errors
    ///
    /// [`ChassisError::ChannelAlreadyRegistered`] if the channel has one.
    pub fn register_channel(
        &mut self,
        channel: &str,
        handler: impl ChannelHandler + 'static,
    ) -> Result<(), ChassisError> {
        if self.channels.contains_key(channel) {
            return Err(ChassisError::ChannelAlreadyRegistered(channel.to_string()));
        }
        self.channels.insert(channel.to_string(), Box::new(handler));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Advances the simulation by `step_seconds`.
    ///
    /// A negative or non-finite step is treated as zero: modules still run
    /// and requests are still arbitrated, but nothing moves or cools.
    pub fn tick(&mut self, step_seconds: f32) {
        let step = if step_seconds.is_finite() && step_seconds >= 0.0 {
            step_seconds
        } else {
            warn!(step_seconds, "invalid step, using 0");
            0.0
        };

        // UPDATE
        let snapshot = self.state.clone();
        let ids = self.stack.ids().to_vec();
        for (order, id) in ids.iter().enumerate() {
            let Some(module) = self.stack.get_module_mut(id) else {
                continue;
            };
            let mut ctx = self.shared.context(id, order, &snapshot);
            if let Err(error) = module.update(step, &mut ctx) {
                warn!(module = %id, %error, "module update failed");
            }
        }

        // ARBITRATE
        self.arbitrate();

        // INTEGRATE + COOL
        self.state.integrate(step);
        self.state.dissipate_heat(step, self.config.cooling_rate);
        self.tick += 1;
    }

    fn arbitrate(&mut self) {
        for (channel, requests) in self.shared.pending.take_ranked() {
            let Some(handler) = self.channels.get(&channel) else {
                trace!(channel = %channel, dropped = requests.len(), "no handler for channel");
                continue;
            };
            let Some(winner) = requests.first() else {
                continue;
            };
            trace!(
                channel = %channel,
                winner = %winner.module_id,
                candidates = requests.len(),
                "channel arbitrated"
            );
            let invocation = ChannelInvocation {
                channel: &channel,
                request: winner,
                all_requests: &requests,
            };
            handler.apply(&invocation, &mut self.state);
        }
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Runs a registered module action synchronously and returns its result.
    ///
    /// # Errors
    ///
    /// [`ChassisError::ActionNotFound`] if the module has no such action,
    /// [`ChassisError::ModuleNotAttached`] if the module is not in the stack,
    /// or whatever the action itself reports.
    pub fn invoke_action(
        &mut self,
        module_id: &ModuleId,
        action: &str,
        payload: ActionPayload,
    ) -> Result<ActionResult, ChassisError> {
        if self.shared.bus.action(module_id, action).is_none() {
            return Err(ChassisError::ActionNotFound {
                module: module_id.clone(),
                action: action.to_string(),
            });
        }
        let order = self
            .stack
            .order_index(module_id)
            .ok_or_else(|| ChassisError::ModuleNotAttached(module_id.clone()))?;
        let module = self
            .stack
            .get_module_mut(module_id)
            .ok_or_else(|| ChassisError::ModuleNotAttached(module_id.clone()))?;

        let snapshot = self.state.clone();
        let mut ctx = self.shared.context(module_id, order, &snapshot);
        trace!(module = %module_id, action, "invoking action");
        module.handle_action(action, payload, &mut ctx)
    }

    /// A port bound to an attached module, for callers that publish on its
    /// behalf or queue requests outside a tick.
    ///
    /// # Errors
    ///
    /// [`ChassisError::ModuleNotAttached`].
    pub fn port(&mut self, module_id: &ModuleId) -> Result<ModulePort<'_>, ChassisError> {
        let order = self
            .stack
            .order_index(module_id)
            .ok_or_else(|| ChassisError::ModuleNotAttached(module_id.clone()))?;
        let bound = &self.stack.ids()[order];
        Ok(ModulePort::new(bound, order, &mut self.shared.bus, &mut self.shared.pending))
    }

    /// Adds energy up to `max_energy` and returns the new level.
    pub fn recharge(&mut self, energy: f32) -> f32 {
        if energy.is_finite() && energy > 0.0 {
            self.state.energy = (self.state.energy + energy).min(self.config.max_energy);
        }
        self.state.energy
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Construction parameters.
    #[must_use]
    pub fn config(&self) -> &ChassisConfig {
        &self.config
    }

    /// Current physical state.
    #[must_use]
    pub fn state(&self) -> &PhysicalState {
        &self.state
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// The module stack.
    #[must_use]
    pub fn stack(&self) -> &ModuleStack {
        &self.stack
    }

    /// Comparable view of the stack.
    #[must_use]
    pub fn stack_snapshot(&self) -> StackSnapshot {
        self.stack.snapshot()
    }

    /// The telemetry and action bus.
    #[must_use]
    pub fn bus(&self) -> &ModuleBus {
        &self.shared.bus
    }

    /// Values and actions of every module, with the bus revision.
    #[must_use]
    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.shared.bus.snapshot()
    }

    /// Requests queued for the next arbitration.
    #[must_use]
    pub fn pending(&self) -> &ActuatorQueue {
        &self.shared.pending
    }

    /// Chassis inventory.
    #[must_use]
    pub fn inventory(&self) -> &InventoryStore {
        &self.shared.inventory
    }

    /// Chassis inventory, mutably.
    pub fn inventory_mut(&mut self) -> &mut InventoryStore {
        &mut self.shared.inventory
    }

    /// Storage boxes.
    #[must_use]
    pub fn storage(&self) -> &StorageRegistry {
        &self.shared.storage
    }

    /// Storage boxes, mutably.
    pub fn storage_mut(&mut self) -> &mut StorageRegistry {
        &mut self.shared.storage
    }

    /// Resource field.
    #[must_use]
    pub fn field(&self) -> &ResourceField {
        &self.shared.field
    }

    /// Resource field, mutably.
    pub fn field_mut(&mut self) -> &mut ResourceField {
        &mut self.shared.field
    }
}
