//! Controller module — оружие holder'а (слоты, switch, replace) + ECS host
//!
//! ECS ответственность:
//! - `WeaponController` component на holder entity
//! - Intents/signals in, `WeaponNotification` out
//!
//! Host ответственность:
//! - Raycast (`HitTestService`), camera/muzzle frame (`WeaponAim`)
//! - Анимации, VFX, HUD по notifications

use bevy::prelude::*;

pub mod events;
pub mod switching;
pub mod systems;


pub use events::{
    AddWeaponIntent, SwitchTarget, SwitchWeaponIntent, WeaponNotification, WeaponSignalEvent,
};
pub use switching::{
    AddWeaponOutcome, ControllerConfig, SwitchRequest, WeaponController, SWITCH_COOLDOWN,
};

/// Controller Plugin
///
/// Порядок выполнения (FixedUpdate):
/// 1. process_add_weapon_intents — pickups
/// 2. process_switch_intents — switch / put away / bring out
/// 3. apply_weapon_signals — input → текущее оружие
/// 4. tick_weapon_controllers — таймеры, стрельба, switch tasks
pub struct WeaponControllerPlugin;

impl Plugin for WeaponControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<WeaponSignalEvent>()
            .add_event::<SwitchWeaponIntent>()
            .add_event::<AddWeaponIntent>()
            .add_event::<WeaponNotification>();

        app.add_systems(
            FixedUpdate,
            (
                systems::process_add_weapon_intents,
                systems::process_switch_intents,
                systems::apply_weapon_signals,
                systems::tick_weapon_controllers,
            )
                .chain(),
        );
    }
}
