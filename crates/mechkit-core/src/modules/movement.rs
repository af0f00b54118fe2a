//! Drive module: holds target velocities and re-requests them every tick.

use glam::Vec2;

use crate::actuator::{MOVEMENT_ANGULAR, MOVEMENT_LINEAR};
use crate::bus::{ActionMetadata, TelemetryMetadata};
use crate::error::ChassisError;
use crate::module::{Module, ModuleContext, ModuleDefinition};
use crate::payload::{ActionPayload, ActionResult, ActuatorPayload};

use super::{invalid_payload, unknown_action, MOBILITY_DRIVE, POWER_CORE};

/// Drives the chassis through `movement.linear` and `movement.angular`.
///
/// Targets persist across ticks until changed; `stop` zeroes them and also
/// queues zero velocities right away.
#[derive(Debug, Clone)]
pub struct MovementModule {
    definition: ModuleDefinition,
    priority: i32,
    linear: Vec2,
    angular: f32,
}

impl MovementModule {
    /// A drive in the `drive` slot with priority 0.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            definition: ModuleDefinition::new(id, "Drive")
                .providing(MOBILITY_DRIVE)
                .requiring(POWER_CORE)
                .in_slot("drive"),
            priority: 0,
            linear: Vec2::ZERO,
            angular: 0.0,
        }
    }

    /// Sets the arbitration priority of this drive's requests.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Current targets.
    #[must_use]
    pub fn targets(&self) -> (Vec2, f32) {
        (self.linear, self.angular)
    }

    fn request(&self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port.request_actuator(
            MOVEMENT_LINEAR,
            ActuatorPayload::Linear { velocity: self.linear },
            self.priority,
        )?;
        ctx.port
            .request_actuator(MOVEMENT_ANGULAR, ActuatorPayload::Angular { rate: self.angular }, self.priority)
    }

    fn publish_targets(&self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port.update_value("targetLinear", self.linear)?;
        ctx.port.update_value("targetAngular", self.angular)?;
        Ok(())
    }
}

impl Module for MovementModule {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn on_attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port.publish_value(
            "targetLinear",
            self.linear,
            TelemetryMetadata::labelled("Target velocity", Some("m/s")),
        )?;
        ctx.port.publish_value(
            "targetAngular",
            self.angular,
            TelemetryMetadata::labelled("Target turn rate", Some("rad/s")),
        )?;
        ctx.port
            .register_action("setLinearVelocity", ActionMetadata::labelled("Set linear velocity"))?;
        ctx.port
            .register_action("setAngularVelocity", ActionMetadata::labelled("Set angular velocity"))?;
        ctx.port.register_action("stop", ActionMetadata::labelled("Stop"))?;
        Ok(())
    }

    fn update(&mut self, _step_seconds: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        self.request(ctx)
    }

    fn handle_action(
        &mut self,
        action: &str,
        payload: ActionPayload,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<ActionResult, ChassisError> {
        match (action, payload) {
            ("setLinearVelocity", ActionPayload::Linear { velocity }) if velocity.is_finite() => {
                self.linear = velocity;
            }
            ("setAngularVelocity", ActionPayload::Angular { rate }) if rate.is_finite() => {
                self.angular = rate;
            }
            ("stop", _) => {
                self.linear = Vec2::ZERO;
                self.angular = 0.0;
                self.request(ctx)?;
            }
            ("setLinearVelocity" | "setAngularVelocity", _) => return Err(invalid_payload(ctx, action)),
            _ => return Err(unknown_action(ctx, action)),
        }
        self.publish_targets(ctx)?;
        Ok(ActionResult::Done)
    }
}
