//! Weapon config — immutable данные оружия (stats + projectile + recoil)
//!
//! Presets hardcoded ниже, те же структуры читаются из RON
//! (`WeaponDefinitions::from_ron_str`). Unknown fire mode отсекается
//! ещё на парсинге, остальное ловит `validate()`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{WeaponryError, WeaponryResult};
use crate::projectile::{HitScanSpec, LayerMask, ProjectileKind, ProjectileSpec};
use crate::recoil::{RecoilEntry, RecoilPattern, RecoilRepeatMode};

/// Сколько выстрелов на одно нажатие
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Reflect)]
pub enum FireMode {
    /// Один выстрел, потом нужно отпустить спуск
    #[default]
    SemiAutomatic,
    /// Ровно `burst_fire_amount` выстрелов, не прерывается
    Burst,
    /// Пока спуск зажат и есть патроны
    FullyAutomatic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponConfig {
    /// Display name — по нему же ищутся дубликаты
    pub display_name: String,
    #[serde(default)]
    pub fire_mode: FireMode,
    /// Длина burst'а (только для FireMode::Burst)
    #[serde(default = "default_burst_fire_amount")]
    pub burst_fire_amount: u32,
    pub magazine_capacity: u32,
    /// Reserve после refill
    pub max_ammo: u32,
    pub rounds_per_minute: u32,
    /// Полный equip/deequip (секунды)
    #[serde(default = "default_one_second")]
    pub equip_time: f32,
    #[serde(default = "default_one_second")]
    pub reload_time: f32,
    /// Hip → ADS (секунды)
    #[serde(default = "default_zoom_time")]
    pub zoom_time: f32,
    /// Влияние на скорость игрока (-1 быстрее / +1 медленнее), читает movement host
    #[serde(default)]
    pub movement_weight_penalty: f32,
    pub projectile: ProjectileSpec,
    #[serde(default)]
    pub recoil: Option<RecoilPattern>,
}

fn default_burst_fire_amount() -> u32 {
    3
}

fn default_one_second() -> f32 {
    1.0
}

fn default_zoom_time() -> f32 {
    0.25
}

impl WeaponConfig {
    /// Выстрелов в секунду
    pub fn fire_speed(&self) -> f32 {
        self.rounds_per_minute as f32 / 60.0
    }

    pub fn validate(&self) -> WeaponryResult<()> {
        let name = self.display_name.as_str();

        if self.magazine_capacity == 0 {
            return Err(WeaponryError::invalid_config(name, "magazine_capacity must be > 0"));
        }
        if self.rounds_per_minute == 0 {
            return Err(WeaponryError::invalid_config(name, "rounds_per_minute must be > 0"));
        }
        if self.fire_mode == FireMode::Burst && self.burst_fire_amount == 0 {
            return Err(WeaponryError::invalid_config(name, "burst_fire_amount must be > 0 in burst mode"));
        }
        for (label, value) in [
            ("equip_time", self.equip_time),
            ("reload_time", self.reload_time),
            ("zoom_time", self.zoom_time),
        ] {
            if !(value >= 0.0) {
                return Err(WeaponryError::invalid_config(name, format!("{} must be >= 0", label)));
            }
        }

        if let ProjectileKind::HitScan(hit_scan) = &self.projectile.kind {
            let spread = hit_scan.spread;
            if !(spread.x >= 0.0 && spread.y >= 0.0) || !spread.is_finite() {
                return Err(WeaponryError::invalid_config(name, "spread must be finite and >= 0"));
            }
            if !(hit_scan.max_range > 0.0) {
                return Err(WeaponryError::invalid_config(name, "max_range must be > 0"));
            }
        }

        if let Some(recoil) = &self.recoil {
            recoil.validate().map_err(|reason| WeaponryError::invalid_config(name, reason))?;
        }

        Ok(())
    }

    /// Один config из RON (+ validate)
    pub fn from_ron(source: &str) -> WeaponryResult<Self> {
        let config: WeaponConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    // ========================================================================
    // Presets
    // ========================================================================

    /// Автомат: 600 RPM, 30/90
    pub fn assault_rifle() -> Self {
        Self {
            display_name: "Assault Rifle".to_string(),
            fire_mode: FireMode::FullyAutomatic,
            burst_fire_amount: 3,
            magazine_capacity: 30,
            max_ammo: 90,
            rounds_per_minute: 600,
            equip_time: 0.6,
            reload_time: 2.0,
            zoom_time: 0.25,
            movement_weight_penalty: 0.1,
            projectile: ProjectileSpec::hit_scan(HitScanSpec {
                spread: Vec2::new(0.02, 0.02),
                spread_while_zoomed: false,
                max_range: 150.0,
                max_piercing: 1,
                layer_mask: LayerMask::ALL,
                impact_effect: Some("vfx/impact_bullet".to_string()),
            }),
            recoil: Some(RecoilPattern {
                entries: vec![
                    RecoilEntry::new(0.0, 1.2, 0.0),
                    RecoilEntry::new(0.1, 1.4, 0.0),
                    RecoilEntry::new(-0.2, 1.5, 0.0),
                    RecoilEntry::new(0.3, 1.1, 0.0),
                    RecoilEntry::new(-0.3, 1.0, 0.0),
                    RecoilEntry::new(0.2, 0.9, 0.0),
                ],
                repeat_mode: RecoilRepeatMode::LoopFrom(3),
                recovery_time: 0.35,
            }),
        }
    }

    /// Пистолет: semi-auto
    pub fn pistol() -> Self {
        Self {
            display_name: "Pistol".to_string(),
            fire_mode: FireMode::SemiAutomatic,
            burst_fire_amount: 1,
            magazine_capacity: 12,
            max_ammo: 48,
            rounds_per_minute: 400,
            equip_time: 0.4,
            reload_time: 1.2,
            zoom_time: 0.2,
            movement_weight_penalty: 0.0,
            projectile: ProjectileSpec::hit_scan(HitScanSpec {
                spread: Vec2::new(0.015, 0.015),
                spread_while_zoomed: false,
                max_range: 60.0,
                max_piercing: 0,
                layer_mask: LayerMask::ALL,
                impact_effect: Some("vfx/impact_bullet".to_string()),
            }),
            recoil: Some(RecoilPattern::new(
                vec![RecoilEntry::new(0.0, 2.0, 0.08)],
                RecoilRepeatMode::Loop,
            )),
        }
    }

    /// Burst rifle: 3 выстрела на нажатие
    pub fn burst_rifle() -> Self {
        Self {
            display_name: "Burst Rifle".to_string(),
            fire_mode: FireMode::Burst,
            burst_fire_amount: 3,
            magazine_capacity: 24,
            max_ammo: 96,
            rounds_per_minute: 720,
            equip_time: 0.7,
            reload_time: 2.2,
            zoom_time: 0.3,
            movement_weight_penalty: 0.15,
            projectile: ProjectileSpec::hit_scan(HitScanSpec {
                spread: Vec2::new(0.01, 0.01),
                spread_while_zoomed: false,
                max_range: 200.0,
                max_piercing: 1,
                layer_mask: LayerMask::ALL,
                impact_effect: Some("vfx/impact_bullet".to_string()),
            }),
            recoil: Some(RecoilPattern::new(
                vec![
                    RecoilEntry::new(0.0, 1.0, 0.0),
                    RecoilEntry::new(0.1, 1.2, 0.0),
                    RecoilEntry::new(-0.1, 1.3, 0.0),
                ],
                RecoilRepeatMode::Loop,
            )),
        }
    }

    /// Дробовик: 8 точек stamp, spread и в ADS
    pub fn shotgun() -> Self {
        let stamp = (0..8)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 8.0;
                Vec3::new(angle.cos() * 0.04, angle.sin() * 0.04, 0.0)
            })
            .collect();

        Self {
            display_name: "Shotgun".to_string(),
            fire_mode: FireMode::SemiAutomatic,
            burst_fire_amount: 1,
            magazine_capacity: 6,
            max_ammo: 30,
            rounds_per_minute: 70,
            equip_time: 0.8,
            reload_time: 2.8,
            zoom_time: 0.3,
            movement_weight_penalty: 0.2,
            projectile: ProjectileSpec::hit_scan(HitScanSpec {
                spread: Vec2::new(0.03, 0.03),
                spread_while_zoomed: true,
                max_range: 35.0,
                max_piercing: 0,
                layer_mask: LayerMask::ALL,
                impact_effect: Some("vfx/impact_pellet".to_string()),
            })
            .with_stamp(stamp),
            recoil: Some(RecoilPattern::new(
                vec![RecoilEntry::new(0.0, 4.0, 0.15)],
                RecoilRepeatMode::Loop,
            )),
        }
    }

    /// Ракетница: prefab projectile
    pub fn rocket_launcher() -> Self {
        Self {
            display_name: "Rocket Launcher".to_string(),
            fire_mode: FireMode::SemiAutomatic,
            burst_fire_amount: 1,
            magazine_capacity: 1,
            max_ammo: 4,
            rounds_per_minute: 40,
            equip_time: 1.2,
            reload_time: 3.0,
            zoom_time: 0.4,
            movement_weight_penalty: 0.4,
            projectile: ProjectileSpec::prefab("projectiles/rocket"),
            recoil: None,
        }
    }
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self::assault_rifle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for config in [
            WeaponConfig::assault_rifle(),
            WeaponConfig::pistol(),
            WeaponConfig::burst_rifle(),
            WeaponConfig::shotgun(),
            WeaponConfig::rocket_launcher(),
        ] {
            assert!(config.validate().is_ok(), "{} invalid", config.display_name);
        }
    }

    #[test]
    fn test_fire_speed() {
        assert_eq!(WeaponConfig::assault_rifle().fire_speed(), 10.0);
    }

    #[test]
    fn test_validate_rejects_empty_burst() {
        let config = WeaponConfig {
            fire_mode: FireMode::Burst,
            burst_fire_amount: 0,
            ..WeaponConfig::burst_rifle()
        };
        assert!(matches!(
            config.validate(),
            Err(WeaponryError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_capacity_and_rpm() {
        let no_magazine = WeaponConfig { magazine_capacity: 0, ..WeaponConfig::pistol() };
        assert!(no_magazine.validate().is_err());

        let no_rpm = WeaponConfig { rounds_per_minute: 0, ..WeaponConfig::pistol() };
        assert!(no_rpm.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_spread() {
        for spread in [
            Vec2::new(f32::NAN, 0.0),
            Vec2::new(0.0, f32::INFINITY),
            Vec2::new(-0.01, 0.0),
        ] {
            let mut config = WeaponConfig::assault_rifle();
            if let ProjectileKind::HitScan(hit_scan) = &mut config.projectile.kind {
                hit_scan.spread = spread;
            }
            assert!(
                matches!(config.validate(), Err(WeaponryError::InvalidConfig { .. })),
                "spread {:?} accepted",
                spread
            );
        }
    }

    #[test]
    fn test_from_ron() {
        let source = r#"(
            display_name: "Marksman",
            fire_mode: SemiAutomatic,
            magazine_capacity: 10,
            max_ammo: 40,
            rounds_per_minute: 200,
            reload_time: 1.8,
            projectile: (
                kind: HitScan((
                    max_range: 300.0,
                    max_piercing: 2,
                )),
            ),
            recoil: Some((
                entries: [(horizontal: 0.0, vertical: 2.5)],
                repeat_mode: Loop,
            )),
        )"#;

        let config = WeaponConfig::from_ron(source).expect("valid RON");
        assert_eq!(config.display_name, "Marksman");
        assert_eq!(config.fire_mode, FireMode::SemiAutomatic);
        assert_eq!(config.burst_fire_amount, 3); // serde default
        assert_eq!(config.equip_time, 1.0);
        assert_eq!(config.projectile.projectile_count(), 1);
        assert_eq!(config.recoil.as_ref().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_unknown_fire_mode_is_rejected() {
        let source = r#"(
            display_name: "Laser",
            fire_mode: Continuous,
            magazine_capacity: 10,
            max_ammo: 40,
            rounds_per_minute: 200,
            projectile: (kind: Prefab((prefab: "beam"))),
        )"#;

        assert!(matches!(WeaponConfig::from_ron(source), Err(WeaponryError::Parse(_))));
    }
}
