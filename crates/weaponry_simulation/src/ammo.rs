//! Ammo ledger — reserve/magazine bookkeeping
//!
//! Ledger ничего не знает про state machine: гейты (trigger release,
//! reloading, running, fire interval) приходят снаружи через `TriggerGate`.
//! Guard-функции (`can_fire`, `can_reload`) — единственный источник истины,
//! мутаторы не валидируют повторно.
//!
//! Инварианты:
//! - 0 ≤ magazine ≤ magazine_capacity
//! - reserve + magazine уменьшается только выстрелом
//! - reload сохраняет reserve + magazine
//! - reserve ≤ max_ammo (кроме явного refill)

use bevy::prelude::*;

/// Допуск при сравнении накопленного tick-времени с fire interval.
///
/// Сумма N шагов по dt в f32 редко попадает ровно в 60/rpm.
pub const FIRE_INTERVAL_TOLERANCE: f32 = 1e-4;

/// Внешние условия выстрела (флаги принадлежат Weapon)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerGate {
    pub need_to_release_trigger: bool,
    pub is_reloading: bool,
    pub is_running: bool,
    /// Секунды с последнего выстрела
    pub time_since_last_shot: f32,
    pub rounds_per_minute: u32,
}

impl TriggerGate {
    /// Минимальный интервал между выстрелами (секунды)
    pub fn fire_interval(&self) -> f32 {
        if self.rounds_per_minute == 0 {
            return f32::INFINITY;
        }
        60.0 / self.rounds_per_minute as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct AmmoLedger {
    /// Патроны вне магазина
    pub reserve: u32,
    /// Патроны в магазине
    pub magazine: u32,
    pub magazine_capacity: u32,
    pub max_ammo: u32,
}

impl AmmoLedger {
    /// Новый ledger сразу заполнен (weapon assemble = refill)
    pub fn new(magazine_capacity: u32, max_ammo: u32) -> Self {
        let mut ledger = Self {
            reserve: 0,
            magazine: 0,
            magazine_capacity,
            max_ammo,
        };
        ledger.refill_to_max();
        ledger
    }

    /// Ledger с произвольным состоянием (тесты, pickups с частичным ammo)
    pub fn with_state(magazine_capacity: u32, max_ammo: u32, magazine: u32, reserve: u32) -> Self {
        Self {
            reserve,
            magazine: magazine.min(magazine_capacity),
            magazine_capacity,
            max_ammo,
        }
    }

    pub fn can_fire(&self, gate: &TriggerGate) -> bool {
        !gate.need_to_release_trigger
            && !gate.is_reloading
            && !gate.is_running
            && self.magazine > 0
            && gate.time_since_last_shot + FIRE_INTERVAL_TOLERANCE >= gate.fire_interval()
    }

    /// Минус один патрон из магазина. На пустом магазине — no-op (false).
    pub fn consume_round(&mut self) -> bool {
        if self.magazine == 0 {
            return false;
        }
        self.magazine -= 1;
        true
    }

    pub fn can_reload(&self, is_reloading: bool) -> bool {
        self.reserve > 0 && !is_reloading && self.magazine < self.magazine_capacity
    }

    /// Dump magazine → reserve, затем draw min(reserve, capacity).
    ///
    /// Никакого частичного top-up: результат либо полный магазин,
    /// либо весь остаток reserve.
    pub fn reload(&mut self) {
        self.reserve += self.magazine;
        self.magazine = 0;

        let receiving = self.reserve.min(self.magazine_capacity);
        self.magazine = receiving;
        self.reserve -= receiving;
    }

    /// Pickup / spawn: reserve = max_ammo, magazine = capacity
    pub fn refill_to_max(&mut self) {
        self.reserve = self.max_ammo;
        self.magazine = self.magazine_capacity;
    }

    /// reserve + magazine
    pub fn total_ammo(&self) -> u32 {
        self.reserve + self.magazine
    }

    pub fn is_magazine_empty(&self) -> bool {
        self.magazine == 0
    }
}
