//! Scanner: finds field nodes around the chassis, with a cooldown.

use crate::bus::{ActionMetadata, TelemetryMetadata};
use crate::error::ChassisError;
use crate::module::{Module, ModuleContext, ModuleDefinition};
use crate::payload::{ActionPayload, ActionResult};

use super::{busy, invalid_payload, unknown_action, SENSOR_SCAN};

/// Scans the resource field. A scan starts a cooldown that counts down in
/// `update`; scanning again before it reaches zero fails with `Busy`.
#[derive(Debug, Clone)]
pub struct ScannerModule {
    definition: ModuleDefinition,
    cooldown_seconds: f32,
    max_radius: f32,
    remaining: f32,
}

impl ScannerModule {
    /// A scanner in the `sensor` slot with a 1 s cooldown and radius cap 25.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            definition: ModuleDefinition::new(id, "Scanner")
                .providing(SENSOR_SCAN)
                .in_slot("sensor"),
            cooldown_seconds: 1.0,
            max_radius: 25.0,
            remaining: 0.0,
        }
    }

    /// Sets the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown_seconds = seconds.max(0.0);
        self
    }

    /// Seconds until the next scan is allowed.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.remaining
    }
}

impl Module for ScannerModule {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn on_attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port
            .publish_value("contacts", 0_u32, TelemetryMetadata::labelled("Contacts", None))?;
        ctx.port
            .publish_value("cooldown", self.remaining, TelemetryMetadata::labelled("Cooldown", Some("s")))?;
        ctx.port.register_action("scan", ActionMetadata::labelled("Scan"))?;
        Ok(())
    }

    fn update(&mut self, step_seconds: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        if self.remaining > 0.0 {
            self.remaining = (self.remaining - step_seconds).max(0.0);
            ctx.port.update_value("cooldown", self.remaining)?;
        }
        Ok(())
    }

    fn handle_action(
        &mut self,
        action: &str,
        payload: ActionPayload,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<ActionResult, ChassisError> {
        let radius = match (action, payload) {
            ("scan", ActionPayload::Scan { radius }) if radius.is_finite() && radius >= 0.0 => radius,
            ("scan", _) => return Err(invalid_payload(ctx, action)),
            _ => return Err(unknown_action(ctx, action)),
        };
        if self.remaining > 0.0 {
            return Err(busy(ctx));
        }

        let hits = ctx.field.scan(ctx.state.position, radius.min(self.max_radius));
        self.remaining = self.cooldown_seconds;
        ctx.port
            .update_value("contacts", u32::try_from(hits.len()).unwrap_or(u32::MAX))?;
        ctx.port.update_value("cooldown", self.remaining)?;
        Ok(ActionResult::Scan(hits))
    }
}
