//! Ошибки weaponry (контрактные нарушения + конфиг)
//!
//! Runtime-отказы вроде "switch throttled" — НЕ ошибки, они возвращаются
//! как `SwitchRequest` (см. controller). Здесь только то, что caller
//! обязан исправить у себя.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum WeaponryError {
    /// Switch/replace в слот за пределами `0..slot_count`
    SlotOutOfRange { index: usize, slot_count: usize },

    /// Weapon reference не найден в `WeaponDefinitions`
    UnknownWeapon { id: String },

    /// Controller пуст, операция требует current weapon
    NoWeapons,

    /// Некорректный `WeaponConfig` (fire mode, capacity, recoil pattern...)
    InvalidConfig { weapon: String, reason: String },

    /// RON не распарсился
    Parse(String),
}

impl WeaponryError {
    pub fn invalid_config(weapon: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            weapon: weapon.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for WeaponryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeaponryError::SlotOutOfRange { index, slot_count } => write!(
                f,
                "weapon slot {} out of range (controller holds {} weapons)",
                index, slot_count
            ),
            WeaponryError::UnknownWeapon { id } => {
                write!(f, "weapon definition '{}' not found", id)
            }
            WeaponryError::NoWeapons => write!(f, "controller holds no weapons"),
            WeaponryError::InvalidConfig { weapon, reason } => {
                write!(f, "invalid config for weapon '{}': {}", weapon, reason)
            }
            WeaponryError::Parse(message) => write!(f, "failed to parse weapon RON: {}", message),
        }
    }
}

impl std::error::Error for WeaponryError {}

impl From<ron::error::SpannedError> for WeaponryError {
    fn from(error: ron::error::SpannedError) -> Self {
        WeaponryError::Parse(error.to_string())
    }
}

pub type WeaponryResult<T> = Result<T, WeaponryError>;
