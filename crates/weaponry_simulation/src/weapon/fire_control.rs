//! FireControl — данные активации Shooting + разрешение одного выстрела
//!
//! Активация = один вход в Shooting. Между активациями сохраняется только
//! recoil index (сбрасывается по завершении recovery).

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::config::FireMode;
use super::events::{EventSink, WeaponEventKind};
use crate::projectile::{HitScanSpec, HitTest, HitTestRequest, PrefabSpec, RayHit, WeaponAim};

/// Collaborators одного tick'а
pub struct TickContext<'a> {
    pub aim: &'a WeaponAim,
    pub hit_test: &'a dyn HitTest,
    pub rng: &'a mut ChaCha8Rng,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FireControl {
    pub completed_fire_mode: bool,
    pub shots_fired: u32,
    /// Выстрелов в секунду
    pub fire_speed: f32,
    pub fire_animation_timer: f32,
}

impl FireControl {
    /// Entry в Shooting
    pub fn begin(&mut self, fire_speed: f32) {
        self.completed_fire_mode = false;
        self.shots_fired = 0;
        self.fire_speed = fire_speed;
    }

    /// Время до разрешения выхода после выстрела
    pub fn shot_interval(&self) -> f32 {
        if self.fire_speed > 0.0 {
            1.0 / self.fire_speed
        } else {
            0.0
        }
    }

    /// Учёт выстрела + проверка завершения fire mode.
    ///
    /// Возвращает true, если нужно отпустить спуск перед следующей активацией.
    pub fn register_shot(
        &mut self,
        fire_mode: FireMode,
        burst_fire_amount: u32,
        magazine_after: u32,
        fire_held: bool,
    ) -> bool {
        self.shots_fired += 1;

        let needs_release = match fire_mode {
            FireMode::Burst => {
                // Пустой магазин тоже завершает burst, иначе state не выйдет
                if self.shots_fired >= burst_fire_amount || magazine_after == 0 {
                    self.completed_fire_mode = true;
                    true
                } else {
                    false
                }
            }
            FireMode::FullyAutomatic => {
                self.completed_fire_mode = !fire_held;
                false
            }
            FireMode::SemiAutomatic => {
                self.completed_fire_mode = true;
                true
            }
        };

        self.fire_animation_timer = self.shot_interval();
        needs_release
    }
}

/// Один hit-scan луч (точка stamp'а `stamp_offset`).
///
/// Возвращает конечную точку луча: последнее обработанное попадание
/// или точку на max range.
pub fn resolve_hit_scan(
    spec: &HitScanSpec,
    stamp_offset: Vec3,
    zoomed_in: bool,
    ctx: &mut TickContext,
    sink: &mut EventSink,
) -> Vec3 {
    let forward = ctx.aim.forward();
    let mut direction = forward;

    if !zoomed_in || spec.spread_while_zoomed {
        let spread = Vec3::new(
            ctx.rng.gen_range(-spec.spread.x..=spec.spread.x),
            ctx.rng.gen_range(-spec.spread.y..=spec.spread.y),
            0.0,
        );
        direction += ctx.aim.transform_direction(spread);
    }
    direction += ctx.aim.transform_direction(stamp_offset);

    let request = HitTestRequest {
        origin: ctx.aim.origin,
        direction: direction.try_normalize().unwrap_or(forward),
        max_range: spec.max_range,
        layer_mask: spec.layer_mask,
    };

    let mut hits = ctx.hit_test.cast(&request);
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let mut end_point = None;
    let mut pierced = 0;
    for hit in &hits {
        on_ray_hit(spec, hit, sink);
        end_point = Some(hit.point);

        if pierced >= spec.max_piercing {
            break;
        }
        pierced += 1;
    }

    end_point.unwrap_or_else(|| request.point_at(spec.max_range))
}

fn on_ray_hit(spec: &HitScanSpec, hit: &RayHit, sink: &mut EventSink) {
    if let Some(prefab) = &spec.impact_effect {
        sink.emit(WeaponEventKind::ImpactEffect {
            prefab: prefab.clone(),
            point: hit.point,
            normal: hit.normal,
        });
    }
    sink.emit(WeaponEventKind::Hit {
        target: hit.target,
        point: hit.point,
        normal: hit.normal,
        distance: hit.distance,
    });
}

/// Prefab projectile: spawn делает host
pub fn spawn_prefab(spec: &PrefabSpec, stamp_offset: Vec3, aim: &WeaponAim, sink: &mut EventSink) {
    sink.emit(WeaponEventKind::ProjectileSpawned {
        prefab: spec.prefab.clone(),
        position: aim.muzzle_position + aim.muzzle_rotation * stamp_offset,
        rotation: aim.muzzle_rotation,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projectile::{LayerMask, NullHitTest, StaticTargets};
    use crate::weapon::events::WeaponEvent;
    use rand::SeedableRng;

    fn spec(max_piercing: u32) -> HitScanSpec {
        HitScanSpec {
            spread: Vec2::ZERO,
            spread_while_zoomed: false,
            max_range: 100.0,
            max_piercing,
            layer_mask: LayerMask::ALL,
            impact_effect: Some("vfx/impact".to_string()),
        }
    }

    fn hit_targets(events: &[WeaponEvent]) -> Vec<Entity> {
        events
            .iter()
            .filter_map(|event| match event.kind {
                WeaponEventKind::Hit { target, .. } => Some(target),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_burst_completes_on_count() {
        let mut fire = FireControl::default();
        fire.begin(10.0);
        assert!(!fire.register_shot(FireMode::Burst, 3, 9, true));
        assert!(!fire.register_shot(FireMode::Burst, 3, 8, true));
        assert!(!fire.completed_fire_mode);
        assert!(fire.register_shot(FireMode::Burst, 3, 7, true));
        assert!(fire.completed_fire_mode);
        assert!((fire.fire_animation_timer - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_burst_completes_when_magazine_runs_dry() {
        let mut fire = FireControl::default();
        fire.begin(10.0);
        assert!(fire.register_shot(FireMode::Burst, 3, 0, true));
        assert!(fire.completed_fire_mode);
    }

    #[test]
    fn test_full_auto_follows_trigger() {
        let mut fire = FireControl::default();
        fire.begin(10.0);
        assert!(!fire.register_shot(FireMode::FullyAutomatic, 3, 20, true));
        assert!(!fire.completed_fire_mode);
        assert!(!fire.register_shot(FireMode::FullyAutomatic, 3, 19, false));
        assert!(fire.completed_fire_mode);
    }

    #[test]
    fn test_piercing_limits_processed_hits() {
        let targets: Vec<_> = (1..=4).map(|i| (Entity::from_raw(i), i as f32 * 5.0)).collect();
        // Намеренно не по порядку — core сортирует сам
        let mut shuffled = targets.clone();
        shuffled.reverse();
        let world = StaticTargets::new(shuffled);

        let aim = WeaponAim::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ctx = TickContext { aim: &aim, hit_test: &world, rng: &mut rng };
        let mut events = Vec::new();
        let mut sink = EventSink::new(0, &mut events);

        let end = resolve_hit_scan(&spec(1), Vec3::ZERO, false, &mut ctx, &mut sink);

        assert_eq!(hit_targets(&events), vec![targets[0].0, targets[1].0]);
        assert_eq!(end, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn test_miss_ends_at_max_range() {
        let aim = WeaponAim::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ctx = TickContext { aim: &aim, hit_test: &NullHitTest, rng: &mut rng };
        let mut events = Vec::new();
        let mut sink = EventSink::new(0, &mut events);

        let end = resolve_hit_scan(&spec(0), Vec3::ZERO, false, &mut ctx, &mut sink);

        assert!(events.is_empty());
        assert_eq!(end, Vec3::new(0.0, 0.0, -100.0));
    }

    #[test]
    fn test_spread_skipped_when_zoomed_in() {
        let mut wide = spec(0);
        wide.spread = Vec2::new(0.5, 0.5);

        let aim = WeaponAim::default();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut ctx = TickContext { aim: &aim, hit_test: &NullHitTest, rng: &mut rng };
        let mut events = Vec::new();
        let mut sink = EventSink::new(0, &mut events);

        let zoomed = resolve_hit_scan(&wide, Vec3::ZERO, true, &mut ctx, &mut sink);
        assert_eq!(zoomed, Vec3::new(0.0, 0.0, -100.0));

        let hip = resolve_hit_scan(&wide, Vec3::ZERO, false, &mut ctx, &mut sink);
        assert!((hip.length() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_prefab_spawn_at_muzzle() {
        let aim = WeaponAim {
            muzzle_position: Vec3::new(0.0, 1.5, 0.0),
            ..Default::default()
        };
        let mut events = Vec::new();
        let mut sink = EventSink::new(2, &mut events);

        spawn_prefab(&PrefabSpec { prefab: "rocket".to_string() }, Vec3::X, &aim, &mut sink);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].slot, 2);
        assert!(matches!(
            &events[0].kind,
            WeaponEventKind::ProjectileSpawned { position, .. } if *position == Vec3::new(1.0, 1.5, 0.0)
        ));
    }
}
