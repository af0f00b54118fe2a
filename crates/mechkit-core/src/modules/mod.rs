//! Standard module set.
//!
//! | Module | Provides | Requires | Actions |
//! |--------|----------|----------|---------|
//! | [`PowerCoreModule`] | `power.core` | | |
//! | [`MovementModule`] | `mobility.drive` | `power.core` | `setLinearVelocity`, `setAngularVelocity`, `stop` |
//! | [`CargoModule`] | `storage.cargo` | `power.core` | `store`, `withdraw`, `transferSlot`, `deposit`, `retrieve` |
//! | [`ManipulatorModule`] | `manipulation.arm` | `power.core` | `harvest` |
//! | [`ScannerModule`] | `sensor.scan` | | `scan` |
//! | [`CraftingModule`] | `fabrication` | `storage.cargo` | `craft`, `cancel` |
//! | [`StatusModule`] | `status.signal` | | `setSignal` |

mod cargo;
mod crafting;
mod manipulator;
mod movement;
mod power;
mod scanner;
mod status;

pub use cargo::CargoModule;
pub use crafting::{CraftingModule, Recipe};
pub use manipulator::ManipulatorModule;
pub use movement::MovementModule;
pub use power::PowerCoreModule;
pub use scanner::ScannerModule;
pub use status::StatusModule;

use crate::error::ChassisError;
use crate::module::ModuleContext;

/// Capability provided by [`PowerCoreModule`].
pub const POWER_CORE: &str = "power.core";
/// Capability provided by [`MovementModule`].
pub const MOBILITY_DRIVE: &str = "mobility.drive";
/// Capability provided by [`CargoModule`].
pub const STORAGE_CARGO: &str = "storage.cargo";
/// Capability provided by [`ManipulatorModule`].
pub const MANIPULATION_ARM: &str = "manipulation.arm";
/// Capability provided by [`ScannerModule`].
pub const SENSOR_SCAN: &str = "sensor.scan";
/// Capability provided by [`CraftingModule`].
pub const FABRICATION: &str = "fabrication";
/// Capability provided by [`StatusModule`].
pub const STATUS_SIGNAL: &str = "status.signal";

fn invalid_payload(ctx: &ModuleContext<'_>, action: &str) -> ChassisError {
    ChassisError::InvalidPayload {
        module: ctx.module_id().clone(),
        action: action.to_string(),
    }
}

fn unknown_action(ctx: &ModuleContext<'_>, action: &str) -> ChassisError {
    ChassisError::ActionNotFound {
        module: ctx.module_id().clone(),
        action: action.to_string(),
    }
}

fn busy(ctx: &ModuleContext<'_>) -> ChassisError {
    ChassisError::Busy {
        module: ctx.module_id().clone(),
    }
}
