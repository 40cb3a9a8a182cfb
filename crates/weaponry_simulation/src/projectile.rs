//! Projectile definitions + hit-test contract
//!
//! Core не реализует physics: hit-scan запрашивает у collaborator'а
//! (`HitTest`) все пересечения луча, prefab-projectiles только заявляются
//! событием — spawn и полёт делает host.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Фильтр слоёв для hit-test (bitmask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: Self = Self(u32::MAX);
    pub const NONE: Self = Self(0);

    pub fn contains(self, layer: u32) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Hit-scan (луч)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitScanSpec {
    /// Макс. отклонение (x, y) в локальных осях камеры
    #[serde(default)]
    pub spread: Vec2,
    /// Добавлять spread в ADS (true для дробовика)
    #[serde(default)]
    pub spread_while_zoomed: bool,
    /// Дальность (метры)
    pub max_range: f32,
    /// Сколько пересечений обрабатывать ПОСЛЕ первого
    #[serde(default)]
    pub max_piercing: u32,
    #[serde(default)]
    pub layer_mask: LayerMask,
    /// VFX в точке попадания (spawn делает host)
    #[serde(default)]
    pub impact_effect: Option<String>,
}

/// Spawnable projectile (ракета, граната)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabSpec {
    pub prefab: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectileKind {
    HitScan(HitScanSpec),
    Prefab(PrefabSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpec {
    pub kind: ProjectileKind,
    /// Одновременные точки выстрела (дробь). Пусто = одна точка в нуле.
    #[serde(default)]
    pub stamp: Vec<Vec3>,
}

impl ProjectileSpec {
    pub fn hit_scan(spec: HitScanSpec) -> Self {
        Self {
            kind: ProjectileKind::HitScan(spec),
            stamp: Vec::new(),
        }
    }

    pub fn prefab(prefab: impl Into<String>) -> Self {
        Self {
            kind: ProjectileKind::Prefab(PrefabSpec { prefab: prefab.into() }),
            stamp: Vec::new(),
        }
    }

    pub fn with_stamp(mut self, stamp: Vec<Vec3>) -> Self {
        self.stamp = stamp;
        self
    }

    /// Сколько снарядов за один выстрел (≥ 1)
    pub fn projectile_count(&self) -> usize {
        self.stamp.len().max(1)
    }

    /// Локальное смещение i-й точки
    pub fn stamp_offset(&self, index: usize) -> Vec3 {
        self.stamp.get(index).copied().unwrap_or(Vec3::ZERO)
    }
}

/// Кадр прицеливания (камера + muzzle), его предоставляет host каждый tick
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct WeaponAim {
    /// Откуда идёт hit-scan луч
    pub origin: Vec3,
    /// Ориентация камеры (forward = -Z)
    pub rotation: Quat,
    /// Точка spawn'а prefab-projectiles
    pub muzzle_position: Vec3,
    pub muzzle_rotation: Quat,
}

impl Default for WeaponAim {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            muzzle_position: Vec3::ZERO,
            muzzle_rotation: Quat::IDENTITY,
        }
    }
}

impl WeaponAim {
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Локальное направление → world (аналог TransformDirection)
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }
}

/// Запрос к hit-test collaborator'у
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTestRequest {
    pub origin: Vec3,
    /// Нормализованное направление
    pub direction: Vec3,
    pub max_range: f32,
    pub layer_mask: LayerMask,
}

impl HitTestRequest {
    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Одно пересечение луча
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub target: Entity,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Hit-test collaborator (physics raycast живёт снаружи)
///
/// Контракт: все пересечения в пределах `max_range`, по возрастанию distance.
pub trait HitTest: Send + Sync {
    fn cast(&self, request: &HitTestRequest) -> Vec<RayHit>;
}

/// Пустой мир — ни одного попадания
pub struct NullHitTest;

impl HitTest for NullHitTest {
    fn cast(&self, _request: &HitTestRequest) -> Vec<RayHit> {
        Vec::new()
    }
}

/// Набор плоских "мишеней" поперёк луча: всё, что ближе max_range, — попадание.
///
/// Для headless демо и тестов (дистанция вдоль луча, без геометрии).
#[derive(Debug, Clone, Default)]
pub struct StaticTargets {
    pub targets: Vec<(Entity, f32)>,
}

impl StaticTargets {
    pub fn new(targets: Vec<(Entity, f32)>) -> Self {
        Self { targets }
    }
}

impl HitTest for StaticTargets {
    fn cast(&self, request: &HitTestRequest) -> Vec<RayHit> {
        self.targets
            .iter()
            .filter(|(_, distance)| *distance <= request.max_range)
            .map(|(target, distance)| RayHit {
                target: *target,
                point: request.point_at(*distance),
                normal: -request.direction,
                distance: *distance,
            })
            .collect()
    }
}

/// Hit-test resource для ECS host'а
#[derive(Resource)]
pub struct HitTestService(pub Box<dyn HitTest>);

impl Default for HitTestService {
    fn default() -> Self {
        Self(Box::new(NullHitTest))
    }
}

impl HitTestService {
    pub fn new(hit_test: impl HitTest + 'static) -> Self {
        Self(Box::new(hit_test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projectile_count_defaults_to_one() {
        let spec = ProjectileSpec::prefab("rocket");
        assert_eq!(spec.projectile_count(), 1);
        assert_eq!(spec.stamp_offset(0), Vec3::ZERO);

        let pellets = spec.with_stamp(vec![Vec3::X, Vec3::Y, Vec3::Z]);
        assert_eq!(pellets.projectile_count(), 3);
        assert_eq!(pellets.stamp_offset(2), Vec3::Z);
    }

    #[test]
    fn test_aim_forward_is_negative_z() {
        let aim = WeaponAim::default();
        assert_eq!(aim.forward(), Vec3::NEG_Z);
    }

    #[test]
    fn test_static_targets_respect_range() {
        let near = Entity::from_raw(1);
        let far = Entity::from_raw(2);
        let world = StaticTargets::new(vec![(near, 5.0), (far, 150.0)]);

        let request = HitTestRequest {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            max_range: 100.0,
            layer_mask: LayerMask::ALL,
        };

        let hits = world.cast(&request);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target, near);
        assert_eq!(hits[0].point, Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask(0b101);
        assert!(mask.contains(0));
        assert!(!mask.contains(1));
        assert!(mask.contains(2));
        assert!(!LayerMask::NONE.contains(0));
        assert!(!LayerMask::ALL.contains(40));
    }
}
