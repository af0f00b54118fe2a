//! Telemetry and action bus.
//!
//! The [`ModuleBus`] keeps, per module, a registry of published telemetry
//! values and a registry of invocable actions. Every mutating call bumps one
//! revision counter shared by the whole bus, so an observer can tell that
//! "something changed" by comparing a single number.
//!
//! Modules do not talk to the bus directly. The chassis hands each hook a
//! [`ModulePort`], a handle bound to the module's id and stack order that
//! also forwards actuator requests to the pending queue.
//!
//! # Invariants
//!
//! - A value key is published exactly once before it can be updated
//! - An action name is registered at most once per module
//! - Revisions are strictly increasing across all entries
//!
//! # Example
//!
//! ```
//! use mechkit_core::bus::{ModuleBus, TelemetryMetadata};
//! use mechkit_core::ids::ModuleId;
//!
//! let mut bus = ModuleBus::new();
//! let core = ModuleId::new("core");
//!
//! let first = bus.publish_value(&core, "energy", 100.0_f64.into(), TelemetryMetadata::default()).unwrap();
//! let second = bus.update_value(&core, "energy", 90.0_f64.into()).unwrap();
//! assert!(second > first);
//! assert_eq!(bus.revision(), second);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::actuator::{ActuatorQueue, ActuatorRequest};
use crate::error::{BusError, ChassisError};
use crate::ids::ModuleId;
use crate::payload::{ActuatorPayload, TelemetryValue};

// =============================================================================
// Entries
// =============================================================================

/// Presentation hints for a telemetry value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMetadata {
    /// Display label.
    pub label: Option<String>,
    /// Unit of measure.
    pub unit: Option<String>,
}

impl TelemetryMetadata {
    /// Metadata with a label and a unit.
    #[must_use]
    pub fn labelled(label: &str, unit: Option<&str>) -> Self {
        Self {
            label: Some(label.to_string()),
            unit: unit.map(str::to_string),
        }
    }
}

/// A published telemetry value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueEntry {
    /// Current value.
    pub value: TelemetryValue,
    /// Presentation hints.
    pub metadata: TelemetryMetadata,
    /// Bus revision of the last publish or update.
    pub revision: u64,
}

/// Description of an invocable action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// Display label.
    pub label: String,
    /// One-line description for block palettes.
    pub summary: Option<String>,
}

impl ActionMetadata {
    /// Metadata with a label only.
    #[must_use]
    pub fn labelled(label: &str) -> Self {
        Self {
            label: label.to_string(),
            summary: None,
        }
    }
}

/// A registered action.
///
/// The handler is the owning module's
/// [`Module::handle_action`](crate::module::Module::handle_action); the entry
/// records that the action exists, how to present it, and when it appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEntry {
    /// Presentation hints.
    pub metadata: ActionMetadata,
    /// Bus revision at registration.
    pub revision: u64,
}

/// Per-module telemetry values, keyed by module then value key.
pub type ValuesSnapshot = BTreeMap<ModuleId, BTreeMap<String, ValueEntry>>;

/// Per-module actions, keyed by module then action name.
pub type ActionsSnapshot = BTreeMap<ModuleId, BTreeMap<String, ActionEntry>>;

/// Everything on the bus at one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Bus revision when the snapshot was taken.
    pub revision: u64,
    /// Published values.
    pub values: ValuesSnapshot,
    /// Registered actions.
    pub actions: ActionsSnapshot,
}

// =============================================================================
// Module Bus
// =============================================================================

/// Per-module telemetry and action registries with a shared revision counter.
#[derive(Debug, Clone, Default)]
pub struct ModuleBus {
    values: ValuesSnapshot,
    actions: ActionsSnapshot,
    revision: u64,
}

impl ModuleBus {
    /// Creates an empty bus at revision 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Publishes a new value key and returns its revision.
    ///
    /// # Errors
    ///
    /// [`BusError::DuplicateValue`] if the module already published `key`.
    pub fn publish_value(
        &mut self,
        module: &ModuleId,
        key: &str,
        value: TelemetryValue,
        metadata: TelemetryMetadata,
    ) -> Result<u64, BusError> {
        if self.value(module, key).is_some() {
            return Err(BusError::DuplicateValue {
                module: module.clone(),
                key: key.to_string(),
            });
        }
        let revision = self.bump();
        self.values.entry(module.clone()).or_default().insert(
            key.to_string(),
            ValueEntry {
                value,
                metadata,
                revision,
            },
        );
        Ok(revision)
    }

    /// Replaces a published value and returns the new revision.
    ///
    /// The revision is bumped even when the value is unchanged.
    ///
    /// # Errors
    ///
    /// [`BusError::UnknownValue`] if `key` was never published by the module.
    pub fn update_value(&mut self, module: &ModuleId, key: &str, value: TelemetryValue) -> Result<u64, BusError> {
        let revision = self.revision + 1;
        let entry = self
            .values
            .get_mut(module)
            .and_then(|values| values.get_mut(key))
            .ok_or_else(|| BusError::UnknownValue {
                module: module.clone(),
                key: key.to_string(),
            })?;
        entry.value = value;
        entry.revision = revision;
        self.revision = revision;
        Ok(revision)
    }

    /// Returns a published value entry.
    #[must_use]
    pub fn value(&self, module: &ModuleId, key: &str) -> Option<&ValueEntry> {
        self.values.get(module).and_then(|values| values.get(key))
    }

    /// Registers an action and returns its revision.
    ///
    /// # Errors
    ///
    /// [`BusError::DuplicateAction`] if the module already registered `name`.
    pub fn register_action(&mut self, module: &ModuleId, name: &str, metadata: ActionMetadata) -> Result<u64, BusError> {
        if self.action(module, name).is_some() {
            return Err(BusError::DuplicateAction {
                module: module.clone(),
                action: name.to_string(),
            });
        }
        let revision = self.bump();
        self.actions
            .entry(module.clone())
            .or_default()
            .insert(name.to_string(), ActionEntry { metadata, revision });
        Ok(revision)
    }

    /// Removes an action. Unknown names are ignored.
    pub fn unregister_action(&mut self, module: &ModuleId, name: &str) {
        let removed = self
            .actions
            .get_mut(module)
            .and_then(|actions| actions.remove(name))
            .is_some();
        if removed {
            self.actions.retain(|_, actions| !actions.is_empty());
            self.bump();
        }
    }

    /// Returns a registered action entry.
    #[must_use]
    pub fn action(&self, module: &ModuleId, name: &str) -> Option<&ActionEntry> {
        self.actions.get(module).and_then(|actions| actions.get(name))
    }

    /// Drops every value and action owned by a module.
    pub fn remove_module(&mut self, module: &ModuleId) {
        let had_values = self.values.remove(module).is_some();
        let had_actions = self.actions.remove(module).is_some();
        if had_values || had_actions {
            self.bump();
        }
    }

    /// Copy of all published values.
    #[must_use]
    pub fn values_snapshot(&self) -> ValuesSnapshot {
        self.values.clone()
    }

    /// Copy of all registered actions.
    #[must_use]
    pub fn actions_snapshot(&self) -> ActionsSnapshot {
        self.actions.clone()
    }

    /// Values, actions and revision in one snapshot.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            revision: self.revision,
            values: self.values_snapshot(),
            actions: self.actions_snapshot(),
        }
    }
}

// =============================================================================
// Module Port
// =============================================================================

/// A module's handle onto the bus and the actuator queue.
///
/// Every call is scoped to the bound module id, so a module can only publish,
/// update and register under its own name.
#[derive(Debug)]
pub struct ModulePort<'a> {
    module_id: &'a ModuleId,
    order: usize,
    bus: &'a mut ModuleBus,
    queue: &'a mut ActuatorQueue,
}

impl<'a> ModulePort<'a> {
    /// Binds a port to a module.
    #[must_use]
    pub fn new(module_id: &'a ModuleId, order: usize, bus: &'a mut ModuleBus, queue: &'a mut ActuatorQueue) -> Self {
        Self {
            module_id,
            order,
            bus,
            queue,
        }
    }

    /// Bound module id.
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        self.module_id
    }

    /// Stack position of the bound module.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// See [`ModuleBus::publish_value`].
    ///
    /// # Errors
    ///
    /// [`BusError::DuplicateValue`].
    pub fn publish_value(
        &mut self,
        key: &str,
        initial: impl Into<TelemetryValue>,
        metadata: TelemetryMetadata,
    ) -> Result<u64, BusError> {
        self.bus.publish_value(self.module_id, key, initial.into(), metadata)
    }

    /// See [`ModuleBus::update_value`].
    ///
    /// # Errors
    ///
    /// [`BusError::UnknownValue`].
    pub fn update_value(&mut self, key: &str, next: impl Into<TelemetryValue>) -> Result<u64, BusError> {
        self.bus.update_value(self.module_id, key, next.into())
    }

    /// Current value of one of this module's keys.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&TelemetryValue> {
        self.bus.value(self.module_id, key).map(|entry| &entry.value)
    }

    /// See [`ModuleBus::register_action`].
    ///
    /// # Errors
    ///
    /// [`BusError::DuplicateAction`].
    pub fn register_action(&mut self, name: &str, metadata: ActionMetadata) -> Result<u64, BusError> {
        self.bus.register_action(self.module_id, name, metadata)
    }

    /// See [`ModuleBus::unregister_action`].
    pub fn unregister_action(&mut self, name: &str) {
        self.bus.unregister_action(self.module_id, name);
    }

    /// Queues an actuator request tagged with this module's id and order.
    ///
    /// The payload is moved into the queue, so the module keeps no handle to
    /// the queued value.
    ///
    /// # Errors
    ///
    /// [`ChassisError::InvalidActuatorPayload`] if the payload holds
    /// non-finite numbers.
    pub fn request_actuator(&mut self, channel: &str, payload: ActuatorPayload, priority: i32) -> Result<(), ChassisError> {
        if !payload.is_finite() {
            return Err(ChassisError::InvalidActuatorPayload {
                channel: channel.to_string(),
            });
        }
        self.queue.push(
            channel,
            ActuatorRequest {
                module_id: self.module_id.clone(),
                payload,
                priority,
                order: self.order,
            },
        );
        Ok(())
    }
}
