//! Factories and accessors shared by the crate-level tests.

use glam::Vec2;

use crate::actuator::MOVEMENT_LINEAR;
use crate::chassis::{Chassis, ChassisConfig};
use crate::error::ChassisError;
use crate::field::FieldConfig;
use crate::ids::{ModuleId, ResourceId};
use crate::module::{Module, ModuleContext, ModuleDefinition};
use crate::modules::{CargoModule, ManipulatorModule, MovementModule, PowerCoreModule};
use crate::payload::{ActionPayload, ActionResult, ActuatorPayload};

// =============================================================================
// Chassis Setup
// =============================================================================

/// Default config without generated field nodes, so tests place their own.
pub fn bare_config() -> ChassisConfig {
    ChassisConfig {
        field: FieldConfig {
            node_count: 0,
            ..FieldConfig::default()
        },
        ..ChassisConfig::default()
    }
}

/// An empty chassis with the given module capacity and no field nodes.
pub fn bare_chassis(module_capacity: u32) -> Chassis {
    Chassis::new(ChassisConfig {
        module_capacity,
        ..bare_config()
    })
}

/// A chassis with a power core, one drive and a 20-unit cargo bay.
pub fn rover() -> Chassis {
    let mut chassis = bare_chassis(6);
    chassis.attach_module(Box::new(PowerCoreModule::new("core"))).unwrap();
    chassis.attach_module(Box::new(MovementModule::new("drive"))).unwrap();
    chassis.attach_module(Box::new(CargoModule::new("bay", 20))).unwrap();
    chassis
}

/// A rover with a manipulator and an ore node two units ahead.
pub fn harvester() -> Chassis {
    let mut chassis = rover();
    chassis.attach_module(Box::new(ManipulatorModule::new("arm"))).unwrap();
    chassis.field_mut().add_node(ore(), Vec2::new(2.0, 0.0), 12);
    chassis
}

// =============================================================================
// Shorthands
// =============================================================================

pub fn id(s: &str) -> ModuleId {
    ModuleId::new(s)
}

pub fn ore() -> ResourceId {
    ResourceId::new("ore")
}

pub fn resource(name: &str, amount: u32) -> ActionPayload {
    ActionPayload::Resource {
        resource: ResourceId::new(name),
        amount,
    }
}

/// Invokes an action and panics on error.
pub fn act(chassis: &mut Chassis, module: &str, action: &str, payload: ActionPayload) -> ActionResult {
    chassis
        .invoke_action(&id(module), action, payload)
        .unwrap_or_else(|e| panic!("{module}.{action} failed: {e}"))
}

/// Numeric telemetry value of a module.
pub fn telemetry(chassis: &Chassis, module: &str, key: &str) -> Option<f64> {
    chassis
        .bus()
        .value(&id(module), key)
        .and_then(|entry| entry.value.as_number())
}

// =============================================================================
// Bare Modules
// =============================================================================

/// A module with only a definition, for stack-level scenarios.
pub struct Plain {
    definition: ModuleDefinition,
}

impl Plain {
    pub fn boxed(definition: ModuleDefinition) -> Box<dyn Module> {
        Box::new(Self { definition })
    }
}

impl Module for Plain {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }
}

/// A module that requests a fixed linear velocity every tick.
pub struct Pusher {
    definition: ModuleDefinition,
    velocity: Vec2,
    priority: i32,
}

impl Pusher {
    pub fn boxed(id: &str, index: u32, velocity: Vec2, priority: i32) -> Box<dyn Module> {
        Box::new(Self {
            definition: ModuleDefinition::new(id, "Pusher").in_slot("drive").at_index(index),
            velocity,
            priority,
        })
    }
}

impl Module for Pusher {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn update(&mut self, _step: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port.request_actuator(
            MOVEMENT_LINEAR,
            ActuatorPayload::Linear {
                velocity: self.velocity,
            },
            self.priority,
        )
    }
}
