//! ECS events controller'а
//!
//! Host (input layer, AI, pickups) пишет intents/signals, controller
//! отвечает `WeaponNotification` на каждый `WeaponEvent`.

use bevy::prelude::*;

use crate::weapon::{WeaponEvent, WeaponId, WeaponSignal};

/// Input signal для текущего оружия holder'а
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct WeaponSignalEvent {
    pub holder: Entity,
    pub signal: WeaponSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchTarget {
    Slot(usize),
    Next,
    Previous,
    PutAway,
    BringOut,
}

/// Switch-weapon input (edge)
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchWeaponIntent {
    pub holder: Entity,
    pub target: SwitchTarget,
}

/// Pickup: добавить оружие из `WeaponDefinitions`
#[derive(Event, Debug, Clone, PartialEq)]
pub struct AddWeaponIntent {
    pub holder: Entity,
    pub weapon: WeaponId,
}

/// Outbound: событие оружия holder'а (slot внутри `event`)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeaponNotification {
    pub holder: Entity,
    pub event: WeaponEvent,
}
