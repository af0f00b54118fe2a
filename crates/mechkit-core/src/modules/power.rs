//! Power core: the root capability most modules depend on.

use crate::bus::TelemetryMetadata;
use crate::error::ChassisError;
use crate::module::{Module, ModuleContext, ModuleDefinition};

use super::POWER_CORE;

/// Provides `power.core` and reports energy and heat.
#[derive(Debug, Clone)]
pub struct PowerCoreModule {
    definition: ModuleDefinition,
}

impl PowerCoreModule {
    /// A power core in the `core` slot.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            definition: ModuleDefinition::new(id, "Power Core")
                .providing(POWER_CORE)
                .in_slot("core"),
        }
    }
}

impl Module for PowerCoreModule {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn on_attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port
            .publish_value("energy", ctx.state.energy, TelemetryMetadata::labelled("Energy", Some("J")))?;
        ctx.port
            .publish_value("heat", ctx.state.heat, TelemetryMetadata::labelled("Heat", None))?;
        Ok(())
    }

    fn update(&mut self, _step_seconds: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port.update_value("energy", ctx.state.energy)?;
        ctx.port.update_value("heat", ctx.state.heat)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_support::Rig;

    #[test]
    fn mirrors_state() {
        let mut rig = Rig::new("core");
        let mut core = PowerCoreModule::new("core");
        core.on_attach(&mut rig.ctx()).unwrap();
        assert_eq!(rig.number("energy"), Some(100.0));

        rig.state.energy = 40.0;
        rig.state.heat = 2.5;
        core.update(0.1, &mut rig.ctx()).unwrap();
        assert_eq!(rig.number("energy"), Some(40.0));
        assert_eq!(rig.number("heat"), Some(2.5));
    }

    #[test]
    fn provides_power_core() {
        let core = PowerCoreModule::new("core");
        assert!(core.definition().provides.iter().any(|c| c.as_str() == POWER_CORE));
        assert!(core.definition().requires.is_empty());
    }
}
