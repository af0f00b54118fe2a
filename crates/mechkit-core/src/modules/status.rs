//! Status light: shows a signal and mirrors energy and heat.

use crate::bus::{ActionMetadata, TelemetryMetadata};
use crate::error::ChassisError;
use crate::module::{Module, ModuleContext, ModuleDefinition};
use crate::payload::{ActionPayload, ActionResult, Signal};

use super::{invalid_payload, unknown_action, STATUS_SIGNAL};

/// Publishes `signal`, `message`, `energy`, `heat` and `overheated`.
#[derive(Debug, Clone)]
pub struct StatusModule {
    definition: ModuleDefinition,
    signal: Signal,
    heat_threshold: f32,
}

impl StatusModule {
    /// A status light in the `status` slot that flags heat above 80.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            definition: ModuleDefinition::new(id, "Status Light")
                .providing(STATUS_SIGNAL)
                .in_slot("status")
                .with_cost(0),
            signal: Signal::Idle,
            heat_threshold: 80.0,
        }
    }

    /// Sets the overheat threshold.
    #[must_use]
    pub fn with_heat_threshold(mut self, threshold: f32) -> Self {
        self.heat_threshold = threshold;
        self
    }

    /// Signal currently shown.
    #[must_use]
    pub fn signal(&self) -> Signal {
        self.signal
    }
}

impl Module for StatusModule {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn on_attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        let overheated = ctx.state.heat > self.heat_threshold;
        ctx.port
            .publish_value("signal", self.signal.as_str(), TelemetryMetadata::labelled("Signal", None))?;
        ctx.port
            .publish_value("message", "", TelemetryMetadata::labelled("Message", None))?;
        ctx.port
            .publish_value("energy", ctx.state.energy, TelemetryMetadata::labelled("Energy", Some("J")))?;
        ctx.port
            .publish_value("heat", ctx.state.heat, TelemetryMetadata::labelled("Heat", None))?;
        ctx.port
            .publish_value("overheated", overheated, TelemetryMetadata::labelled("Overheated", None))?;
        ctx.port
            .register_action("setSignal", ActionMetadata::labelled("Set signal"))?;
        Ok(())
    }

    fn update(&mut self, _step_seconds: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port.update_value("energy", ctx.state.energy)?;
        ctx.port.update_value("heat", ctx.state.heat)?;
        ctx.port
            .update_value("overheated", ctx.state.heat > self.heat_threshold)?;
        Ok(())
    }

    fn handle_action(
        &mut self,
        action: &str,
        payload: ActionPayload,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<ActionResult, ChassisError> {
        match (action, payload) {
            ("setSignal", ActionPayload::Signal { signal, message }) => {
                self.signal = signal;
                ctx.port.update_value("signal", signal.as_str())?;
                ctx.port
                    .update_value("message", message.as_deref().unwrap_or(""))?;
                Ok(ActionResult::Signal(signal))
            }
            ("setSignal", _) => Err(invalid_payload(ctx, action)),
            _ => Err(unknown_action(ctx, action)),
        }
    }
}
