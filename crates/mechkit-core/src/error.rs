//! Error types for invariant violations and caller misuse.
//!
//! Store, withdraw, transfer and harvest outcomes are ordinary return values
//! and never show up here. An error always means the triggering call made no
//! state change.

use thiserror::Error;

use crate::ids::{Capability, ModuleId, ResourceId};

/// Violations of the module stack invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    /// A module with this id is already attached.
    #[error("module `{0}` is already attached")]
    AlreadyAttached(ModuleId),

    /// Attaching would push the summed capacity cost over the stack capacity.
    #[error("module `{module}` needs {required} capacity but only {available} is free")]
    CapacityExceeded {
        /// Module being attached.
        module: ModuleId,
        /// Capacity cost of the module.
        required: u32,
        /// Capacity still free on the stack.
        available: u32,
    },

    /// A required capability is not provided by the stack or the module itself.
    #[error("module `{module}` requires missing capability `{capability}`")]
    MissingCapability {
        /// Module being attached.
        module: ModuleId,
        /// The unsatisfied capability.
        capability: Capability,
    },

    /// The slot's highest index is `u32::MAX`, so no index can be allocated.
    #[error("no free index left in slot `{slot}` for module `{module}`")]
    SlotExhausted {
        /// Module being attached.
        module: ModuleId,
        /// Attachment slot bucket.
        slot: String,
    },

    /// Another module already holds this attachment point.
    #[error("attachment {slot}#{index} is already occupied")]
    AttachmentOccupied {
        /// Attachment slot bucket.
        slot: String,
        /// Index within the slot.
        index: u32,
    },

    /// Detaching would leave an attached module without a required capability.
    #[error("detaching `{module}` would remove `{capability}` required by `{dependent}`")]
    DependencyWouldBreak {
        /// Module being detached.
        module: ModuleId,
        /// Capability that would disappear.
        capability: Capability,
        /// Remaining module that requires it.
        dependent: ModuleId,
    },
}

/// Violations of the telemetry/action bus invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The telemetry key was already published by this module.
    #[error("value `{key}` already published by `{module}`")]
    DuplicateValue {
        /// Publishing module.
        module: ModuleId,
        /// Telemetry key.
        key: String,
    },

    /// The telemetry key was never published by this module.
    #[error("value `{key}` was never published by `{module}`")]
    UnknownValue {
        /// Updating module.
        module: ModuleId,
        /// Telemetry key.
        key: String,
    },

    /// The action name is already registered for this module.
    #[error("action `{action}` already registered by `{module}`")]
    DuplicateAction {
        /// Registering module.
        module: ModuleId,
        /// Action name.
        action: String,
    },
}

/// Errors surfaced by the chassis and by module hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChassisError {
    /// Module stack invariant violation.
    #[error(transparent)]
    Stack(#[from] StackError),

    /// Bus invariant violation.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// The module has no action registered under this name.
    #[error("module `{module}` has no action `{action}`")]
    ActionNotFound {
        /// Target module.
        module: ModuleId,
        /// Requested action.
        action: String,
    },

    /// The module is not attached to this chassis.
    #[error("module `{0}` is not attached")]
    ModuleNotAttached(ModuleId),

    /// The payload variant does not fit the action.
    #[error("invalid payload for `{module}.{action}`")]
    InvalidPayload {
        /// Target module.
        module: ModuleId,
        /// Requested action.
        action: String,
    },

    /// An actuator payload contained non-finite numbers.
    #[error("invalid actuator payload on channel `{channel}`")]
    InvalidActuatorPayload {
        /// Target channel.
        channel: String,
    },

    /// A handler is already registered for this channel.
    #[error("channel `{0}` already has a handler")]
    ChannelAlreadyRegistered(String),

    /// The crafting module does not know this recipe.
    #[error("unknown recipe `{0}`")]
    UnknownRecipe(String),

    /// The inventory lacks the inputs of a recipe.
    #[error("not enough `{resource}` for recipe `{recipe}`")]
    InsufficientResources {
        /// Recipe id.
        recipe: String,
        /// First missing input.
        resource: ResourceId,
    },

    /// The module refused the action because of its own state (cooldown, job in progress).
    #[error("module `{module}` is busy")]
    Busy {
        /// Refusing module.
        module: ModuleId,
    },
}
