use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use mechkit_core::chassis::{Chassis, ChassisConfig};
use mechkit_core::ids::{ModuleId, ResourceId};
use mechkit_core::modules::{
    CargoModule, CraftingModule, ManipulatorModule, MovementModule, PowerCoreModule, ScannerModule, StatusModule,
};
use mechkit_core::payload::ActionPayload;

fn loaded_chassis() -> Chassis {
    let mut chassis = Chassis::new(ChassisConfig::with_module_capacity(8));
    chassis.attach_module(Box::new(PowerCoreModule::new("core"))).unwrap();
    chassis.attach_module(Box::new(MovementModule::new("drive"))).unwrap();
    chassis.attach_module(Box::new(CargoModule::new("bay", 200))).unwrap();
    chassis.attach_module(Box::new(ManipulatorModule::new("arm"))).unwrap();
    chassis.attach_module(Box::new(ScannerModule::new("eye"))).unwrap();
    chassis.attach_module(Box::new(CraftingModule::new("fab"))).unwrap();
    chassis.attach_module(Box::new(StatusModule::new("light"))).unwrap();
    chassis
        .invoke_action(
            &ModuleId::new("drive"),
            "setLinearVelocity",
            ActionPayload::Linear {
                velocity: Vec2::new(1.0, 0.5),
            },
        )
        .unwrap();
    chassis
}

fn bench_tick(c: &mut Criterion) {
    let mut chassis = loaded_chassis();

    c.bench_function("tick_full_loadout", |b| {
        b.iter(|| {
            chassis.tick(black_box(0.016));
        })
    });
}

fn bench_telemetry_snapshot(c: &mut Criterion) {
    let mut chassis = loaded_chassis();
    for _ in 0..10 {
        chassis.tick(0.1);
    }

    c.bench_function("telemetry_snapshot", |b| b.iter(|| black_box(chassis.telemetry_snapshot())));
}

fn bench_store_withdraw(c: &mut Criterion) {
    let mut chassis = loaded_chassis();
    let ore = ResourceId::new("ore");

    c.bench_function("inventory_store_withdraw", |b| {
        b.iter(|| {
            let inventory = chassis.inventory_mut();
            inventory.store(&ore, black_box(25));
            inventory.withdraw(&ore, black_box(25));
        })
    });
}

criterion_group!(benches, bench_tick, bench_telemetry_snapshot, bench_store_withdraw);
criterion_main!(benches);
