//! Тесты детерминизма
//!
//! Одинаковый seed → идентичные controller'ы и notifications
//! (spread расходует DeterministicRng).

use bevy::prelude::*;
use weaponry_simulation::*;

#[derive(Resource, Default)]
struct FiredEndPoints(Vec<Vec3>);

fn record_end_points(
    mut notifications: EventReader<WeaponNotification>,
    mut recorded: ResMut<FiredEndPoints>,
) {
    for notification in notifications.read() {
        if let WeaponEventKind::ProjectileFired { end_points } = &notification.event.kind {
            recorded.0.extend(end_points.iter().copied());
        }
    }
}

/// Запускает симуляцию: 3 holder'а стреляют очередями, один переключается
fn run_simulation(seed: u64, tick_count: usize) -> (Vec<u8>, Vec<Vec3>) {
    let mut app = create_headless_app(seed);
    app.add_plugins(WeaponryPlugin)
    .init_resource::<FiredEndPoints>()
    .add_systems(
        FixedUpdate,
        record_end_points.after(controller::systems::tick_weapon_controllers),
    );

    let holders: Vec<Entity> = (0..3)
        .map(|_| {
            app.world_mut()
                .spawn((WeaponController::default(), WeaponAim::default()))
                .id()
        })
        .collect();

    for holder in &holders {
        for weapon in ["assault_rifle", "shotgun"] {
            app.world_mut().send_event(AddWeaponIntent {
                holder: *holder,
                weapon: WeaponId::from(weapon),
            });
        }
    }

    for tick in 0..tick_count {
        for (i, holder) in holders.iter().enumerate() {
            let signal = match (tick + i * 7) % 90 {
                50 => Some(WeaponSignal::Fire(true)),
                80 => Some(WeaponSignal::Fire(false)),
                _ => None,
            };
            if let Some(signal) = signal {
                app.world_mut().send_event(WeaponSignalEvent {
                    holder: *holder,
                    signal,
                });
            }
        }
        if tick == 300 {
            app.world_mut().send_event(SwitchWeaponIntent {
                holder: holders[0],
                target: SwitchTarget::Next,
            });
        }

        app.update();
    }

    let snapshot = controller_snapshot(app.world_mut());
    let end_points = std::mem::take(&mut app.world_mut().resource_mut::<FiredEndPoints>().0);
    (snapshot, end_points)
}

#[test]
fn test_determinism_same_seed() {
    const SEED: u64 = 12345;
    const TICK_COUNT: usize = 600;

    let (snapshot1, points1) = run_simulation(SEED, TICK_COUNT);
    let (snapshot2, points2) = run_simulation(SEED, TICK_COUNT);

    assert!(!points1.is_empty(), "holders должны были стрелять");
    assert_eq!(
        snapshot1, snapshot2,
        "Симуляция с одинаковым seed ({}) дала разные controller'ы",
        SEED
    );
    assert_eq!(points1, points2, "Spread с одинаковым seed разошёлся");
}

#[test]
fn test_determinism_multiple_runs() {
    const SEED: u64 = 42;
    const TICK_COUNT: usize = 400;

    let runs: Vec<_> = (0..3).map(|_| run_simulation(SEED, TICK_COUNT)).collect();

    for (i, run) in runs.iter().enumerate().skip(1) {
        assert_eq!(runs[0], *run, "Прогон {} отличается от прогона 0", i);
    }
}

#[test]
fn test_different_seed_changes_spread() {
    let (_, points_a) = run_simulation(1, 400);
    let (_, points_b) = run_simulation(2, 400);

    assert_eq!(points_a.len(), points_b.len());
    assert_ne!(points_a, points_b);
}
