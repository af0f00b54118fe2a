//! # Mechkit Core
//!
//! Module runtime for a composable, robot-like mechanism.
//!
//! A [`Chassis`](chassis::Chassis) owns a stack of attachable modules
//! (movement, manipulation, cargo, scanning, crafting, status signalling).
//! Modules publish telemetry and expose actions over a shared bus, and they
//! change the physical state only by queueing actuator requests that the
//! chassis arbitrates once per tick.
//!
//! ## Architecture
//!
//! - **Stack**: attachment metadata, capacity and capability invariants
//! - **Bus**: per-module telemetry values and actions with a global revision
//! - **Actuators**: per-channel request queues and deterministic arbitration
//! - **Inventory**: slot-based storage shared by resources and equipment
//! - **Storage**: named off-chassis boxes keyed purely by resource id
//! - **Chassis**: composition root running `update -> arbitrate -> integrate -> cool`
//!
//! ## Usage
//!
//! ```
//! use mechkit_core::chassis::{Chassis, ChassisConfig};
//! use mechkit_core::modules::{MovementModule, PowerCoreModule};
//! use mechkit_core::payload::ActionPayload;
//! use glam::Vec2;
//!
//! let mut chassis = Chassis::new(ChassisConfig::default());
//! chassis.attach_module(Box::new(PowerCoreModule::new("core"))).unwrap();
//! chassis.attach_module(Box::new(MovementModule::new("drive"))).unwrap();
//!
//! chassis
//!     .invoke_action(
//!         &"drive".into(),
//!         "setLinearVelocity",
//!         ActionPayload::Linear { velocity: Vec2::new(2.0, 0.0) },
//!     )
//!     .unwrap();
//! chassis.tick(0.5);
//!
//! assert_eq!(chassis.state().position, Vec2::new(1.0, 0.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod actuator;
pub mod bus;
pub mod chassis;
pub mod error;
pub mod field;
pub mod ids;
pub mod inventory;
pub mod module;
pub mod modules;
pub mod payload;
pub mod stack;
pub mod state;
pub mod storage;

pub use chassis::{Chassis, ChassisConfig};
pub use error::{BusError, ChassisError, StackError};
pub use ids::{Capability, ModuleId, ResourceId, SlotId};
pub use module::{Module, ModuleContext, ModuleDefinition};

#[cfg(test)]
mod tests;
