//! Headless weaponry simulation
//!
//! Holder с автоматом и пистолетом: стрельба, switch, reload.
//! Notifications печатаются в stdout.

use bevy::prelude::*;
use weaponry_simulation::{
    create_headless_app, log_error, AddWeaponIntent, HitTestService, StaticTargets, SwitchTarget,
    SwitchWeaponIntent, WeaponAim, WeaponController, WeaponDefinitions, WeaponEventKind,
    WeaponNotification, WeaponSignal, WeaponSignalEvent, WeaponryPlugin,
};

/// Что делает "игрок" на каком тике
fn script(tick: u32, holder: Entity) -> Vec<WeaponSignalEvent> {
    let signal = match tick {
        60 => WeaponSignal::Fire(true),
        150 => WeaponSignal::Fire(false),
        400 => WeaponSignal::Fire(true),
        401 => WeaponSignal::Fire(false),
        500 => WeaponSignal::Reload,
        _ => return Vec::new(),
    };
    vec![WeaponSignalEvent { holder, signal }]
}

fn print_notifications(mut notifications: EventReader<WeaponNotification>) {
    for notification in notifications.read() {
        let event = &notification.event;
        match &event.kind {
            // Шумные события пропускаем
            WeaponEventKind::Crosshair(_)
            | WeaponEventKind::Animation(_)
            | WeaponEventKind::ZoomProgress(_)
            | WeaponEventKind::ProjectileFired { .. } => {}
            kind => println!("[slot {}] {:?}", event.slot, kind),
        }
    }
}

fn main() {
    let seed = 42;
    println!("Starting weaponry headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);

    match WeaponDefinitions::bundled() {
        Ok(definitions) => {
            app.insert_resource(definitions);
        }
        Err(err) => log_error(&format!("assets/weapons.ron: {}, using presets", err)),
    }

    let target = app.world_mut().spawn_empty().id();
    app.insert_resource(HitTestService::new(StaticTargets::new(vec![(target, 25.0)])))
        .add_plugins(WeaponryPlugin)
        .add_systems(FixedUpdate, print_notifications);

    let holder = app
        .world_mut()
        .spawn((WeaponController::default(), WeaponAim::default()))
        .id();

    app.world_mut().send_event(AddWeaponIntent {
        holder,
        weapon: "assault_rifle".into(),
    });
    app.world_mut().send_event(AddWeaponIntent {
        holder,
        weapon: "pistol".into(),
    });

    for tick in 0..700u32 {
        app.update();

        for event in script(tick, holder) {
            app.world_mut().send_event(event);
        }
        if tick == 250 {
            app.world_mut().send_event(SwitchWeaponIntent {
                holder,
                target: SwitchTarget::Next,
            });
        }

        if tick % 100 == 0 {
            if let Some(controller) = app.world().get::<WeaponController>(holder) {
                if let Some(weapon) = controller.current_weapon() {
                    println!(
                        "Tick {}: {} [{}] {}/{}",
                        tick,
                        weapon.display_name(),
                        weapon.primary_state().as_str(),
                        weapon.ledger().magazine,
                        weapon.ledger().reserve
                    );
                }
            }
        }
    }

    println!("Simulation complete!");
}
