//! Controller systems (FixedUpdate, chained)
//!
//! Порядок: add intents → switch intents → signals → tick.
//! Все `WeaponEvent` за шаг уходят наружу как `WeaponNotification`.

use bevy::prelude::*;

use super::events::{
    AddWeaponIntent, SwitchTarget, SwitchWeaponIntent, WeaponNotification, WeaponSignalEvent,
};
use super::switching::{AddWeaponOutcome, WeaponController};
use crate::logger;
use crate::projectile::{HitTestService, WeaponAim};
use crate::weapon::{TickContext, WeaponDefinitions, WeaponEvent};
use crate::DeterministicRng;

/// System: pickups → add_weapon (первое оружие сразу достаётся)
pub fn process_add_weapon_intents(
    mut intents: EventReader<AddWeaponIntent>,
    definitions: Res<WeaponDefinitions>,
    mut holders: Query<&mut WeaponController>,
    mut notifications: EventWriter<WeaponNotification>,
) {
    let mut events = Vec::new();

    for intent in intents.read() {
        let Ok(mut controller) = holders.get_mut(intent.holder) else {
            logger::log_warning(&format!(
                "AddWeaponIntent: {:?} has no WeaponController",
                intent.holder
            ));
            continue;
        };

        match controller.add_weapon(&definitions, &intent.weapon, &mut events) {
            Ok(AddWeaponOutcome::Added { slot: 0 }) => {
                if let Err(err) = controller.switch_to(0, &mut events) {
                    logger::log_error(&format!("{:?}: {}", intent.holder, err));
                }
            }
            Ok(outcome) => {
                logger::log(&format!(
                    "{:?}: add '{}' → {:?}",
                    intent.holder, intent.weapon, outcome
                ));
            }
            // Причина уже залогирована controller'ом
            Err(_) => {}
        }

        flush(intent.holder, &mut events, &mut notifications);
    }
}

/// System: switch-weapon intents
pub fn process_switch_intents(
    mut intents: EventReader<SwitchWeaponIntent>,
    mut holders: Query<&mut WeaponController>,
    mut notifications: EventWriter<WeaponNotification>,
) {
    let mut events = Vec::new();

    for intent in intents.read() {
        let Ok(mut controller) = holders.get_mut(intent.holder) else {
            continue;
        };

        let result = match intent.target {
            SwitchTarget::Slot(index) => controller.switch_to(index, &mut events).map(Some),
            SwitchTarget::Next => controller.switch_next(true, &mut events).map(Some),
            SwitchTarget::Previous => controller.switch_next(false, &mut events).map(Some),
            SwitchTarget::PutAway => {
                controller.put_away(&mut events);
                Ok(None)
            }
            SwitchTarget::BringOut => {
                controller.bring_out(&mut events);
                Ok(None)
            }
        };

        match result {
            Ok(Some(request)) => logger::log(&format!(
                "{:?}: switch {:?} → {:?}",
                intent.holder, intent.target, request
            )),
            Ok(None) => {}
            Err(err) => logger::log_warning(&format!("{:?}: {}", intent.holder, err)),
        }

        flush(intent.holder, &mut events, &mut notifications);
    }
}

/// System: input signals → текущее оружие
pub fn apply_weapon_signals(
    mut signals: EventReader<WeaponSignalEvent>,
    mut holders: Query<&mut WeaponController>,
    mut notifications: EventWriter<WeaponNotification>,
) {
    let mut events = Vec::new();

    for signal in signals.read() {
        if let Ok(mut controller) = holders.get_mut(signal.holder) {
            controller.handle_signal(signal.signal, &mut events);
            flush(signal.holder, &mut events, &mut notifications);
        }
    }
}

/// System: tick всех controller'ов (fixed dt)
///
/// Holders обходятся по Entity — порядок расхода RNG детерминирован.
pub fn tick_weapon_controllers(
    time: Res<Time>,
    hit_test: Res<HitTestService>,
    mut rng: ResMut<DeterministicRng>,
    mut holders: Query<(Entity, &mut WeaponController, Option<&WeaponAim>)>,
    mut notifications: EventWriter<WeaponNotification>,
) {
    let dt = time.delta_secs();
    let fallback_aim = WeaponAim::default();
    let mut events = Vec::new();

    let mut ordered: Vec<_> = holders.iter_mut().collect();
    ordered.sort_by_key(|(entity, _, _)| *entity);

    for (entity, mut controller, aim) in ordered {
        let mut ctx = TickContext {
            aim: aim.unwrap_or(&fallback_aim),
            hit_test: hit_test.0.as_ref(),
            rng: &mut rng.rng,
        };
        controller.tick(dt, &mut ctx, &mut events);
        flush(entity, &mut events, &mut notifications);
    }
}

fn flush(
    holder: Entity,
    events: &mut Vec<WeaponEvent>,
    notifications: &mut EventWriter<WeaponNotification>,
) {
    for event in events.drain(..) {
        notifications.write(WeaponNotification { holder, event });
    }
}
