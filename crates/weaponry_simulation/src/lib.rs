//! Weaponry Simulation Core
//!
//! First-person weapon simulation: weapon FSM (primary state + substates),
//! fire control, ammo ledger, recoil и switch/replace orchestration.
//!
//! Слои:
//! - `weapon`, `ammo`, `recoil`, `timing` — plain Rust, время = явный `tick(dt)`
//! - `controller` — слоты holder'а + ECS host (Bevy 0.16, FixedUpdate 60Hz)
//!
//! Host (движок) владеет raycast'ами, анимациями, VFX и HUD: core только
//! запрашивает hit test и эмитит события.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use std::time::Duration;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ammo;
pub mod controller;
pub mod error;
pub mod logger;
pub mod projectile;
pub mod recoil;
pub mod timing;
pub mod weapon;

// Re-export основных типов
pub use ammo::{AmmoLedger, TriggerGate};
pub use controller::{
    AddWeaponIntent, AddWeaponOutcome, ControllerConfig, SwitchRequest, SwitchTarget,
    SwitchWeaponIntent, WeaponController, WeaponControllerPlugin, WeaponNotification,
    WeaponSignalEvent,
};
pub use error::{WeaponryError, WeaponryResult};
pub use logger::{init_logger, log, log_error, log_info, log_warning, LogLevel, LogPrinter};
pub use projectile::{
    HitScanSpec, HitTest, HitTestRequest, HitTestService, LayerMask, NullHitTest, ProjectileKind,
    ProjectileSpec, RayHit, StaticTargets, WeaponAim,
};
pub use recoil::{RecoilEntry, RecoilPattern, RecoilRepeatMode, RecoilSequencer};
pub use weapon::{
    FireMode, PrimaryState, Substates, Weapon, WeaponConfig, WeaponDefinitions, WeaponEvent,
    WeaponEventKind, WeaponId, WeaponSignal,
};

/// Главный plugin (resources + controller systems)
///
/// Resources, уже вставленные host'ом (свой `HitTestService`, definitions
/// из RON, seed), не перезаписываются.
pub struct WeaponryPlugin;

impl Plugin for WeaponryPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .init_resource::<HitTestService>()
            .init_resource::<WeaponDefinitions>()
            .add_plugins(WeaponControllerPlugin);
    }
}

/// Seeded RNG для spread. Один на мир: holder'ы тикают в порядке Entity,
/// поэтому последовательность выстрелов воспроизводима.
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Headless App: MinimalPlugins + seed + ровно один FixedUpdate (60Hz) на `update()`
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )));

    app
}

/// Состояние всех `WeaponController` мира в байтах (для сравнения прогонов)
///
/// Holder'ы по Entity; на слот: state, ammo, equip progress, recoil, выстрелы.
pub fn controller_snapshot(world: &mut World) -> Vec<u8> {
    let mut query = world.query::<(Entity, &WeaponController)>();
    let mut holders: Vec<_> = query.iter(world).collect();
    holders.sort_by_key(|(entity, _)| entity.to_bits());

    let mut snapshot = Vec::new();
    for (entity, controller) in holders {
        snapshot.extend_from_slice(&entity.to_bits().to_le_bytes());
        snapshot.extend_from_slice(&(controller.current_index() as u32).to_le_bytes());
        snapshot.push(controller.is_switching() as u8);
        snapshot.push(controller.weapon_is_put_away() as u8);

        for weapon in controller.weapons() {
            snapshot.extend_from_slice(weapon.primary_state().as_str().as_bytes());
            snapshot.extend_from_slice(&weapon.substates().bits().to_le_bytes());
            snapshot.extend_from_slice(&weapon.ledger().magazine.to_le_bytes());
            snapshot.extend_from_slice(&weapon.ledger().reserve.to_le_bytes());
            snapshot.extend_from_slice(&weapon.equip_progress().to_bits().to_le_bytes());
            snapshot.extend_from_slice(&(weapon.recoil_index() as u32).to_le_bytes());
            snapshot.extend_from_slice(&weapon.shots_fired().to_le_bytes());
        }
    }

    snapshot
}
