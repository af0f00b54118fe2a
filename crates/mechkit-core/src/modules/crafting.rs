//! Fabricator: turns inventory resources into products over several ticks.
//!
//! `craft` takes every input out of the inventory up front, so a job that
//! starts can always finish. The job then advances in `update`, drawing power
//! each tick, and stores its output once the time is up and the output fits.
//! `cancel` puts the inputs back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::actuator::POWER_DRAW;
use crate::bus::{ActionMetadata, TelemetryMetadata};
use crate::error::ChassisError;
use crate::ids::ResourceId;
use crate::module::{Module, ModuleContext, ModuleDefinition};
use crate::payload::{ActionPayload, ActionResult, ActuatorPayload};

use super::{busy, invalid_payload, unknown_action, FABRICATION, STORAGE_CARGO};

/// A crafting recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe id.
    pub id: String,
    /// Inputs consumed when the job starts.
    pub inputs: BTreeMap<ResourceId, u32>,
    /// Product.
    pub output: ResourceId,
    /// Units of product.
    pub output_amount: u32,
    /// Seconds of work.
    pub duration: f32,
    /// Energy drawn per second of work.
    pub energy_per_second: f32,
}

impl Recipe {
    /// A recipe producing one `output` after `duration` seconds, with no
    /// inputs and no power cost.
    #[must_use]
    pub fn new(id: &str, output: &str, duration: f32) -> Self {
        Self {
            id: id.to_string(),
            inputs: BTreeMap::new(),
            output: ResourceId::new(output),
            output_amount: 1,
            duration: duration.max(0.0),
            energy_per_second: 0.0,
        }
    }

    /// Adds an input.
    #[must_use]
    pub fn input(mut self, resource: &str, amount: u32) -> Self {
        *self.inputs.entry(ResourceId::new(resource)).or_default() += amount;
        self
    }

    /// Sets the number of units produced.
    #[must_use]
    pub fn yielding(mut self, amount: u32) -> Self {
        self.output_amount = amount;
        self
    }

    /// Sets the power cost.
    #[must_use]
    pub fn drawing(mut self, energy_per_second: f32) -> Self {
        self.energy_per_second = energy_per_second.max(0.0);
        self
    }
}

#[derive(Debug, Clone)]
struct Job {
    recipe: Recipe,
    elapsed: f32,
}

impl Job {
    fn progress(&self) -> f32 {
        if self.recipe.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.recipe.duration).min(1.0)
        }
    }
}

/// Runs one recipe at a time.
#[derive(Debug, Clone)]
pub struct CraftingModule {
    definition: ModuleDefinition,
    recipes: BTreeMap<String, Recipe>,
    job: Option<Job>,
}

impl CraftingModule {
    /// A fabricator with the built-in recipes: `plate` (2 ore, 2 s) and
    /// `lens` (1 ice + 1 silicon, 3 s).
    #[must_use]
    pub fn new(id: &str) -> Self {
        let module = Self {
            definition: ModuleDefinition::new(id, "Fabricator")
                .providing(FABRICATION)
                .requiring(STORAGE_CARGO)
                .in_slot("fabricator"),
            recipes: BTreeMap::new(),
            job: None,
        };
        module
            .with_recipe(Recipe::new("plate", "plate", 2.0).input("ore", 2).drawing(3.0))
            .with_recipe(
                Recipe::new("lens", "lens", 3.0)
                    .input("ice", 1)
                    .input("silicon", 1)
                    .drawing(2.0),
            )
    }

    /// Adds or replaces a recipe.
    #[must_use]
    pub fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.recipes.insert(recipe.id.clone(), recipe);
        self
    }

    /// Known recipes by id.
    #[must_use]
    pub fn recipes(&self) -> &BTreeMap<String, Recipe> {
        &self.recipes
    }

    /// Id of the running recipe, if any.
    #[must_use]
    pub fn active_recipe(&self) -> Option<&str> {
        self.job.as_ref().map(|job| job.recipe.id.as_str())
    }

    fn start(&mut self, ctx: &mut ModuleContext<'_>, id: &str) -> Result<ActionResult, ChassisError> {
        if self.job.is_some() {
            return Err(busy(ctx));
        }
        let recipe = self
            .recipes
            .get(id)
            .cloned()
            .ok_or_else(|| ChassisError::UnknownRecipe(id.to_string()))?;

        if let Some((missing, _)) = recipe
            .inputs
            .iter()
            .find(|(resource, amount)| ctx.inventory.withdrawable(resource) < **amount)
        {
            return Err(ChassisError::InsufficientResources {
                recipe: recipe.id.clone(),
                resource: missing.clone(),
            });
        }
        let mut taken: Vec<(&ResourceId, u32)> = Vec::with_capacity(recipe.inputs.len());
        for (resource, amount) in &recipe.inputs {
            let withdrawn = ctx.inventory.withdraw(resource, *amount).withdrawn;
            taken.push((resource, withdrawn));
            if withdrawn < *amount {
                for (resource, units) in taken {
                    ctx.inventory.store(resource, units);
                }
                return Err(ChassisError::InsufficientResources {
                    recipe: recipe.id.clone(),
                    resource: resource.clone(),
                });
            }
        }

        debug!(module = %ctx.module_id(), recipe = %recipe.id, "crafting started");
        let result = ActionResult::Crafting {
            recipe: recipe.id.clone(),
            duration: recipe.duration,
        };
        ctx.port.update_value("recipe", recipe.id.as_str())?;
        ctx.port.update_value("progress", 0.0_f32)?;
        self.job = Some(Job { recipe, elapsed: 0.0 });
        Ok(result)
    }

    fn cancel(&mut self, ctx: &mut ModuleContext<'_>) -> Result<ActionResult, ChassisError> {
        if let Some(job) = self.job.take() {
            for (resource, amount) in &job.recipe.inputs {
                let refund = ctx.inventory.store(resource, *amount);
                if refund.overflow > 0 {
                    warn!(module = %ctx.module_id(), resource = %resource, lost = refund.overflow, "refund did not fit");
                }
            }
            ctx.port.update_value("recipe", "")?;
            ctx.port.update_value("progress", 0.0_f32)?;
        }
        Ok(ActionResult::Done)
    }
}

impl Module for CraftingModule {
    fn definition(&self) -> &ModuleDefinition {
        &self.definition
    }

    fn on_attach(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        ctx.port
            .publish_value("progress", 0.0_f32, TelemetryMetadata::labelled("Progress", None))?;
        ctx.port
            .publish_value("recipe", "", TelemetryMetadata::labelled("Recipe", None))?;
        ctx.port.register_action("craft", ActionMetadata::labelled("Craft"))?;
        ctx.port.register_action("cancel", ActionMetadata::labelled("Cancel"))?;
        Ok(())
    }

    fn on_detach(&mut self, ctx: &mut ModuleContext<'_>) {
        if let Err(error) = self.cancel(ctx) {
            warn!(module = %ctx.module_id(), %error, "cancel on detach failed");
        }
    }

    fn update(&mut self, step_seconds: f32, ctx: &mut ModuleContext<'_>) -> Result<(), ChassisError> {
        let Some(job) = self.job.as_mut() else {
            return Ok(());
        };

        if job.progress() < 1.0 {
            let work = step_seconds.min(job.recipe.duration - job.elapsed).max(0.0);
            job.elapsed += step_seconds;
            let energy = work * job.recipe.energy_per_second;
            if energy > 0.0 {
                ctx.port.request_actuator(
                    POWER_DRAW,
                    ActuatorPayload::PowerDraw {
                        energy,
                        heat: energy * 0.2,
                    },
                    0,
                )?;
            }
            ctx.port.update_value("progress", job.progress())?;
        }

        if job.progress() >= 1.0 {
            let output = job.recipe.output.clone();
            let amount = job.recipe.output_amount;
            // wait until the whole product fits
            if ctx.inventory.storable(&output) >= amount {
                ctx.inventory.store(&output, amount);
                debug!(module = %ctx.module_id(), recipe = %job.recipe.id, "crafting finished");
                self.job = None;
                ctx.port.update_value("recipe", "")?;
                ctx.port.update_value("progress", 0.0_f32)?;
            }
        }
        Ok(())
    }

    fn handle_action(
        &mut self,
        action: &str,
        payload: ActionPayload,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<ActionResult, ChassisError> {
        match (action, payload) {
            ("craft", ActionPayload::Recipe { recipe }) => self.start(ctx, &recipe),
            ("craft", _) => Err(invalid_payload(ctx, action)),
            ("cancel", _) => self.cancel(ctx),
            _ => Err(unknown_action(ctx, action)),
        }
    }
}
