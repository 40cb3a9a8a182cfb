//! Inbound signals (уже нормализованы host'ом: analog → bool)

use bevy::prelude::*;

/// Сигнал от input/movement слоя
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeaponSignal {
    /// Спуск (level)
    Fire(bool),
    /// Edge
    Reload,
    /// ADS (level)
    Zoom(bool),
    Walk(bool),
    Run(bool),
    /// true = прыжок, false = приземление
    Jump(bool),
    Move(Vec2),
    Look(Vec2),
}

impl WeaponSignal {
    /// Вид сигнала для dispatch table (`None` — только обновляет input level)
    pub fn kind(&self) -> Option<SignalKind> {
        match self {
            WeaponSignal::Fire(_) => Some(SignalKind::Fire),
            WeaponSignal::Reload => Some(SignalKind::Reload),
            WeaponSignal::Zoom(_) => Some(SignalKind::Zoom),
            WeaponSignal::Walk(_) => Some(SignalKind::Walk),
            WeaponSignal::Run(_) => Some(SignalKind::Run),
            WeaponSignal::Jump(_) => Some(SignalKind::Jump),
            WeaponSignal::Move(_) | WeaponSignal::Look(_) => None,
        }
    }

    /// Boolean-значение сигнала (Reload — всегда нажатие)
    pub fn pressed(&self) -> bool {
        match *self {
            WeaponSignal::Fire(value)
            | WeaponSignal::Zoom(value)
            | WeaponSignal::Walk(value)
            | WeaponSignal::Run(value)
            | WeaponSignal::Jump(value) => value,
            WeaponSignal::Reload => true,
            WeaponSignal::Move(_) | WeaponSignal::Look(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Fire,
    Reload,
    Zoom,
    Walk,
    Run,
    Jump,
}

/// Текущие уровни input'а, которые читают state handlers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputLevels {
    pub fire: bool,
    pub zoom: bool,
    pub look: Vec2,
}
