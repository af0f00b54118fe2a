//! `mechkit-sim` runs a scripted chassis mission and prints the final
//! snapshots as JSON on stdout.
//!
//! ```text
//! mechkit-sim [config.json] [ticks]
//! ```
//!
//! The config is a partial `ChassisConfig`; missing fields take defaults.
//! Logging goes to stderr and follows `RUST_LOG` (default `info`).

use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec2;
use serde::Serialize;
use tracing::{debug, info, warn};

use mechkit_core::bus::TelemetrySnapshot;
use mechkit_core::chassis::{Chassis, ChassisConfig};
use mechkit_core::error::ChassisError;
use mechkit_core::field::ScanHit;
use mechkit_core::ids::{ModuleId, ResourceId};
use mechkit_core::inventory::InventorySnapshot;
use mechkit_core::modules::{
    CargoModule, CraftingModule, ManipulatorModule, MovementModule, PowerCoreModule, ScannerModule, StatusModule,
};
use mechkit_core::payload::{ActionPayload, ActionResult, Signal};
use mechkit_core::stack::StackSnapshot;
use mechkit_core::state::PhysicalState;
use mechkit_core::storage::StorageRegistry;

const STEP_SECONDS: f32 = 0.1;
const DEFAULT_TICKS: u64 = 300;
const CRUISE_SPEED: f32 = 3.0;
const DEPOT: &str = "depot";

#[derive(Serialize)]
struct Report<'a> {
    ticks: u64,
    state: &'a PhysicalState,
    stack: StackSnapshot,
    telemetry: TelemetrySnapshot,
    inventory: InventorySnapshot,
    storage: &'a StorageRegistry,
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => ChassisConfig::default(),
    };
    let ticks = match args.next() {
        Some(raw) => raw.parse().with_context(|| format!("invalid tick count `{raw}`"))?,
        None => DEFAULT_TICKS,
    };

    let mut chassis = Chassis::new(config);
    equip(&mut chassis)?;
    run_mission(&mut chassis, ticks)?;

    let report = Report {
        ticks: chassis.tick_count(),
        state: chassis.state(),
        stack: chassis.stack_snapshot(),
        telemetry: chassis.telemetry_snapshot(),
        inventory: chassis.inventory().get_snapshot(),
        storage: chassis.storage(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn load_config(path: &Path) -> Result<ChassisConfig> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let config = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    info!(path = %path.display(), "loaded chassis config");
    Ok(config)
}

fn equip(chassis: &mut Chassis) -> Result<()> {
    chassis.attach_module(Box::new(PowerCoreModule::new("core")))?;
    chassis.attach_module(Box::new(MovementModule::new("drive")))?;
    chassis.attach_module(Box::new(CargoModule::new("bay", 40)))?;
    chassis.attach_module(Box::new(ManipulatorModule::new("arm")))?;
    chassis.attach_module(Box::new(ScannerModule::new("eye")))?;
    chassis.attach_module(Box::new(StatusModule::new("light")))?;
    // the fabricator is optional on small stacks
    if let Err(error) = chassis.attach_module(Box::new(CraftingModule::new("fab"))) {
        warn!(%error, "fabricator not attached");
    }
    let stack = chassis.stack();
    info!(modules = stack.len(), used = stack.used_capacity(), capacity = stack.capacity(), "chassis equipped");
    Ok(())
}

fn invoke(chassis: &mut Chassis, module: &str, action: &str, payload: ActionPayload) -> Result<ActionResult> {
    chassis
        .invoke_action(&ModuleId::new(module), action, payload)
        .with_context(|| format!("{module}.{action}"))
}

fn set_signal(chassis: &mut Chassis, signal: Signal, message: &str) -> Result<()> {
    invoke(
        chassis,
        "light",
        "setSignal",
        ActionPayload::Signal {
            signal,
            message: Some(message.to_string()),
        },
    )?;
    Ok(())
}

/// Scan, drive to each contact in turn, harvest it, bank half in the depot
/// and craft plates from whatever ore is left.
fn run_mission(chassis: &mut Chassis, ticks: u64) -> Result<()> {
    set_signal(chassis, Signal::Active, "surveying")?;
    let mut contacts: Vec<ScanHit> = Vec::new();
    let mut target: Option<ScanHit> = None;

    while chassis.tick_count() < ticks {
        if target.is_none() {
            if contacts.is_empty() {
                contacts = scan(chassis)?;
                contacts.reverse();
            }
            target = contacts.pop();
            if let Some(hit) = &target {
                steer_towards(chassis, hit.position)?;
            }
        }

        if let Some(hit) = &target {
            if chassis.state().position.distance(hit.position) < 3.0 {
                invoke(chassis, "drive", "stop", ActionPayload::Empty)?;
                harvest(chassis, &hit.resource)?;
                target = None;
            }
        }

        chassis.tick(STEP_SECONDS);
        if chassis.tick_count() % 50 == 0 {
            let state = chassis.state();
            info!(
                tick = chassis.tick_count(),
                x = state.position.x,
                y = state.position.y,
                energy = state.energy,
                heat = state.heat,
                "progress"
            );
        }
    }

    invoke(chassis, "drive", "stop", ActionPayload::Empty)?;
    set_signal(chassis, Signal::Idle, "mission complete")?;
    Ok(())
}

fn scan(chassis: &mut Chassis) -> Result<Vec<ScanHit>> {
    let result = chassis.invoke_action(&ModuleId::new("eye"), "scan", ActionPayload::Scan { radius: 25.0 });
    scan_contacts(result)
}

/// Hits from a scan call. A scanner still cooling down yields no contacts;
/// any other failure is an error.
fn scan_contacts(result: Result<ActionResult, ChassisError>) -> Result<Vec<ScanHit>> {
    match result {
        Ok(ActionResult::Scan(hits)) => {
            debug!(contacts = hits.len(), "scan complete");
            Ok(hits)
        }
        Ok(other) => anyhow::bail!("unexpected scan result {other:?}"),
        Err(ChassisError::Busy { .. }) => {
            debug!("scanner cooling down");
            Ok(Vec::new())
        }
        Err(error) => Err(error).context("eye.scan"),
    }
}

fn steer_towards(chassis: &mut Chassis, position: Vec2) -> Result<()> {
    let heading = (position - chassis.state().position).normalize_or_zero();
    invoke(
        chassis,
        "drive",
        "setLinearVelocity",
        ActionPayload::Linear {
            velocity: heading * CRUISE_SPEED,
        },
    )?;
    Ok(())
}

fn harvest(chassis: &mut Chassis, resource: &ResourceId) -> Result<()> {
    let result = invoke(
        chassis,
        "arm",
        "harvest",
        ActionPayload::Resource {
            resource: resource.clone(),
            amount: 10,
        },
    )?;
    let amount = match result {
        ActionResult::Harvested { amount, .. } => amount,
        other => anyhow::bail!("unexpected harvest result {other:?}"),
    };
    info!(resource = %resource, amount, "harvested");
    if amount == 0 {
        set_signal(chassis, Signal::Warning, "nothing harvested")?;
        return Ok(());
    }

    invoke(
        chassis,
        "bay",
        "deposit",
        ActionPayload::Depot {
            box_id: DEPOT.to_string(),
            resource: resource.clone(),
            amount: amount / 2,
        },
    )?;

    let ore = ResourceId::new("ore");
    if chassis.stack().get_module(&ModuleId::new("fab")).is_some() && chassis.inventory().get_quantity(&ore) >= 2 {
        let crafted = chassis.invoke_action(
            &ModuleId::new("fab"),
            "craft",
            ActionPayload::Recipe {
                recipe: "plate".to_string(),
            },
        );
        match crafted {
            Ok(_) => info!("plate queued"),
            Err(error) => debug!(%error, "craft skipped"),
        }
    }
    Ok(())
}
