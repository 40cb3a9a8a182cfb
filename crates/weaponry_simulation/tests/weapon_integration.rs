//! Weaponry integration test (ECS host)
//!
//! Headless App + WeaponryPlugin, один fixed tick (60Hz) на update.
//!
//! Проверяем:
//! - AddWeaponIntent → первое оружие достаётся само
//! - Fire signal → выстрелы и hits по HitTestService
//! - SwitchWeaponIntent → смена слота
//! - Ошибочные intents не ломают симуляцию

use bevy::prelude::*;
use weaponry_simulation::controller::systems::tick_weapon_controllers;
use weaponry_simulation::*;

/// Все notifications за прогон
#[derive(Resource, Default)]
struct Collected(Vec<WeaponNotification>);

fn collect_notifications(
    mut notifications: EventReader<WeaponNotification>,
    mut collected: ResMut<Collected>,
) {
    collected.0.extend(notifications.read().cloned());
}

/// Helper: App с weaponry plugin и детерминированным шагом
fn create_weaponry_app(seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.add_plugins(WeaponryPlugin)
    .init_resource::<Collected>()
    .add_systems(
        FixedUpdate,
        collect_notifications.after(tick_weapon_controllers),
    );
    app
}

fn spawn_holder(app: &mut App, weapons: &[&str]) -> Entity {
    let holder = app
        .world_mut()
        .spawn((WeaponController::default(), WeaponAim::default()))
        .id();
    for weapon in weapons {
        app.world_mut().send_event(AddWeaponIntent {
            holder,
            weapon: WeaponId::from(*weapon),
        });
    }
    holder
}

fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.update();
    }
}

fn signal(app: &mut App, holder: Entity, signal: WeaponSignal) {
    app.world_mut().send_event(WeaponSignalEvent { holder, signal });
}

fn controller(app: &App, holder: Entity) -> &WeaponController {
    app.world()
        .get::<WeaponController>(holder)
        .expect("holder has WeaponController")
}

fn count(app: &App, predicate: impl Fn(&WeaponEventKind) -> bool) -> usize {
    app.world()
        .resource::<Collected>()
        .0
        .iter()
        .filter(|notification| predicate(&notification.event.kind))
        .count()
}

#[test]
fn test_first_weapon_is_drawn() {
    let mut app = create_weaponry_app(42);
    let holder = spawn_holder(&mut app, &["assault_rifle", "pistol"]);

    // equip_time автомата 0.6s = 36 тиков, с запасом
    run_ticks(&mut app, 90);

    let controller = controller(&app, holder);
    assert_eq!(controller.weapon_count(), 2);
    assert_eq!(controller.current_index(), 0);

    let current = controller.current_weapon().expect("slot 0");
    assert!(current.is_equipped());
    assert_eq!(current.primary_state(), PrimaryState::Idle);
    assert!(!controller.weapon(1).expect("slot 1").is_active());

    assert_eq!(count(&app, |kind| matches!(kind, WeaponEventKind::Equipped)), 1);
}

#[test]
fn test_fire_signal_hits_target() {
    let mut app = create_weaponry_app(7);
    let target = app.world_mut().spawn_empty().id();
    // Host подменяет hit test после plugin'а
    app.insert_resource(HitTestService::new(StaticTargets::new(vec![(target, 20.0)])));

    let holder = spawn_holder(&mut app, &["assault_rifle"]);
    run_ticks(&mut app, 90);

    signal(&mut app, holder, WeaponSignal::Fire(true));
    run_ticks(&mut app, 30);
    signal(&mut app, holder, WeaponSignal::Fire(false));
    run_ticks(&mut app, 30);

    let shots = count(&app, |kind| matches!(kind, WeaponEventKind::Shot));
    assert!(shots >= 2, "expected several shots, got {}", shots);

    let hits = count(&app, |kind| {
        matches!(kind, WeaponEventKind::Hit { target: hit, .. } if *hit == target)
    });
    assert_eq!(hits, shots);

    let current = controller(&app, holder).current_weapon().expect("slot 0");
    assert_eq!(current.ledger().magazine, 30 - shots as u32);
    assert_eq!(current.primary_state(), PrimaryState::Idle);
}

#[test]
fn test_switch_intent_changes_slot() {
    let mut app = create_weaponry_app(42);
    let holder = spawn_holder(&mut app, &["assault_rifle", "pistol"]);
    run_ticks(&mut app, 90);

    app.world_mut().send_event(SwitchWeaponIntent {
        holder,
        target: SwitchTarget::Slot(1),
    });
    run_ticks(&mut app, 120);

    let controller = controller(&app, holder);
    assert_eq!(controller.current_index(), 1);
    assert!(!controller.is_switching());
    assert!(controller.weapon(1).expect("slot 1").is_equipped());
    assert!(!controller.weapon(0).expect("slot 0").is_active());
    assert_eq!(count(&app, |kind| matches!(kind, WeaponEventKind::Deequipped)), 1);
}

#[test]
fn test_put_away_and_bring_out_intents() {
    let mut app = create_weaponry_app(42);
    let holder = spawn_holder(&mut app, &["pistol"]);
    run_ticks(&mut app, 90);

    app.world_mut().send_event(SwitchWeaponIntent {
        holder,
        target: SwitchTarget::PutAway,
    });
    run_ticks(&mut app, 90);
    assert!(controller(&app, holder).weapon_is_put_away());
    assert!(!controller(&app, holder).current_weapon().expect("slot 0").is_active());

    app.world_mut().send_event(SwitchWeaponIntent {
        holder,
        target: SwitchTarget::BringOut,
    });
    run_ticks(&mut app, 90);
    let current = controller(&app, holder).current_weapon().expect("slot 0");
    assert!(current.is_equipped());
    assert_eq!(current.primary_state(), PrimaryState::Idle);
}

#[test]
fn test_invalid_intents_are_ignored() {
    let mut app = create_weaponry_app(42);
    let holder = spawn_holder(&mut app, &["railgun"]);
    let stranger = app.world_mut().spawn_empty().id();

    signal(&mut app, stranger, WeaponSignal::Fire(true));
    app.world_mut().send_event(SwitchWeaponIntent {
        holder,
        target: SwitchTarget::Slot(4),
    });
    app.world_mut().send_event(AddWeaponIntent {
        holder: stranger,
        weapon: WeaponId::from("pistol"),
    });
    run_ticks(&mut app, 30);

    assert_eq!(controller(&app, holder).weapon_count(), 0);
    assert!(app.world().resource::<Collected>().0.is_empty());
}
