//! WeaponDefinitions — registry конфигов оружия (resource)
//!
//! `WeaponId` → `WeaponConfig`. Controller инстанцирует `Weapon` по id
//! (add/replace), сам конфиг после загрузки не меняется.
//!
//! Источники:
//! - `WeaponDefinitions::default()` — hardcoded presets
//! - `from_ron_str` — RON map `{ "id": (config...), }`
//! - `bundled()` — `assets/weapons.ron`, вшитый в бинарник

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::config::WeaponConfig;
use crate::error::{WeaponryError, WeaponryResult};

const BUNDLED_WEAPONS: &str = include_str!("../../assets/weapons.ron");

/// Weapon identifier (unique string ID)
///
/// # Examples
/// - "assault_rifle"
/// - "pistol"
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
pub struct WeaponId(pub String);

impl From<&str> for WeaponId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for WeaponId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Resource, Clone, Debug)]
pub struct WeaponDefinitions {
    definitions: HashMap<WeaponId, WeaponConfig>,
}

impl WeaponDefinitions {
    /// Пустой registry
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
        }
    }

    pub fn get(&self, id: &WeaponId) -> Option<&WeaponConfig> {
        self.definitions.get(id)
    }

    /// Lookup с ошибкой для caller'а
    pub fn require(&self, id: &WeaponId) -> WeaponryResult<&WeaponConfig> {
        self.get(id).ok_or_else(|| WeaponryError::UnknownWeapon { id: id.0.clone() })
    }

    /// Добавить (validate перед вставкой)
    pub fn add(&mut self, id: impl Into<WeaponId>, config: WeaponConfig) -> WeaponryResult<()> {
        config.validate()?;
        self.definitions.insert(id.into(), config);
        Ok(())
    }

    /// Все IDs (отсортированы — стабильный порядок для UI и логов)
    pub fn all_ids(&self) -> Vec<&WeaponId> {
        let mut ids: Vec<_> = self.definitions.keys().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// RON map `{ "id": (...), }`. Любой невалидный конфиг — ошибка всего файла.
    pub fn from_ron_str(source: &str) -> WeaponryResult<Self> {
        let parsed: HashMap<String, WeaponConfig> = ron::from_str(source)?;

        let mut definitions = Self::new();
        for (id, config) in parsed {
            definitions.add(WeaponId(id), config)?;
        }
        Ok(definitions)
    }

    /// Definitions из `assets/weapons.ron`
    pub fn bundled() -> WeaponryResult<Self> {
        Self::from_ron_str(BUNDLED_WEAPONS)
    }
}

impl Default for WeaponDefinitions {
    /// Hardcoded presets
    fn default() -> Self {
        let presets = [
            ("assault_rifle", WeaponConfig::assault_rifle()),
            ("pistol", WeaponConfig::pistol()),
            ("burst_rifle", WeaponConfig::burst_rifle()),
            ("shotgun", WeaponConfig::shotgun()),
            ("rocket_launcher", WeaponConfig::rocket_launcher()),
        ];

        let definitions = presets
            .into_iter()
            .map(|(id, config)| (WeaponId::from(id), config))
            .collect();

        Self { definitions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weapon::config::FireMode;

    #[test]
    fn test_default_presets() {
        let definitions = WeaponDefinitions::default();
        assert_eq!(definitions.len(), 5);
        assert!(definitions.get(&"pistol".into()).is_some());
        assert_eq!(
            definitions.all_ids().first().map(|id| id.0.as_str()),
            Some("assault_rifle")
        );
    }

    #[test]
    fn test_require_unknown() {
        let definitions = WeaponDefinitions::default();
        assert_eq!(
            definitions.require(&"railgun".into()).err(),
            Some(WeaponryError::UnknownWeapon { id: "railgun".to_string() })
        );
    }

    #[test]
    fn test_bundled_assets_parse() {
        let definitions = WeaponDefinitions::bundled().expect("assets/weapons.ron is valid");
        assert!(!definitions.is_empty());

        let smg = definitions.get(&"smg".into()).expect("smg defined");
        assert_eq!(smg.fire_mode, FireMode::FullyAutomatic);
    }

    #[test]
    fn test_invalid_entry_rejects_file() {
        let source = r#"{
            "broken": (
                display_name: "Broken",
                magazine_capacity: 0,
                max_ammo: 10,
                rounds_per_minute: 100,
                projectile: (kind: Prefab((prefab: "x"))),
            ),
        }"#;

        assert!(matches!(
            WeaponDefinitions::from_ron_str(source),
            Err(WeaponryError::InvalidConfig { .. })
        ));
    }
}
