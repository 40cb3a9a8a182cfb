//! Recoil pattern + sequencer
//!
//! Pattern — immutable конфиг оружия (кладётся в `WeaponConfig`).
//! Sequencer хранит только индекс и выдаёт entry на каждый выстрел.
//! Визуальное применение (camera kick/recovery) — внешний collaborator,
//! сюда приходит только факт завершения recovery → `reset()`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Один kick: (horizontal, vertical, timing)
///
/// `timing == 0` → длительность выводится из fire rate (`1 / fire_speed`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Reflect)]
pub struct RecoilEntry {
    pub horizontal: f32,
    pub vertical: f32,
    #[serde(default)]
    pub timing: f32,
}

impl RecoilEntry {
    pub const ZERO: Self = Self {
        horizontal: 0.0,
        vertical: 0.0,
        timing: 0.0,
    };

    pub fn new(horizontal: f32, vertical: f32, timing: f32) -> Self {
        Self { horizontal, vertical, timing }
    }

    /// Длительность kick'а для camera collaborator
    pub fn duration(&self, fire_speed: f32) -> f32 {
        if self.timing == 0.0 {
            if fire_speed > 0.0 { 1.0 / fire_speed } else { 0.0 }
        } else {
            self.timing
        }
    }
}

/// Что делать после последнего entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Reflect)]
pub enum RecoilRepeatMode {
    /// Снова с 0
    #[default]
    Loop,
    /// С указанного индекса (типично: "разгон" отдачи не повторяется)
    LoopFrom(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Reflect)]
pub struct RecoilPattern {
    pub entries: Vec<RecoilEntry>,
    #[serde(default)]
    pub repeat_mode: RecoilRepeatMode,
    /// Сколько camera восстанавливается после серии (секунды)
    #[serde(default = "default_recovery_time")]
    pub recovery_time: f32,
}

fn default_recovery_time() -> f32 {
    0.3
}

impl RecoilPattern {
    pub fn new(entries: Vec<RecoilEntry>, repeat_mode: RecoilRepeatMode) -> Self {
        Self {
            entries,
            repeat_mode,
            recovery_time: default_recovery_time(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Индекс после переполнения
    pub fn wrap_index(&self) -> usize {
        match self.repeat_mode {
            RecoilRepeatMode::Loop => 0,
            RecoilRepeatMode::LoopFrom(index) => index,
        }
    }

    /// Проверка конфига (LoopFrom за пределами pattern = бесконечный out-of-range)
    pub fn validate(&self) -> Result<(), String> {
        if let RecoilRepeatMode::LoopFrom(index) = self.repeat_mode {
            if index >= self.entries.len() {
                return Err(format!(
                    "recoil loop_from index {} outside pattern of {} entries",
                    index,
                    self.entries.len()
                ));
            }
        }
        if self.recovery_time < 0.0 {
            return Err("recoil recovery_time must be >= 0".to_string());
        }
        Ok(())
    }
}

/// Индекс в recoil pattern
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoilSequencer {
    pattern: Option<RecoilPattern>,
    index: usize,
}

impl RecoilSequencer {
    pub fn new(pattern: Option<RecoilPattern>) -> Self {
        Self { pattern, index: 0 }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pattern(&self) -> Option<&RecoilPattern> {
        self.pattern.as_ref()
    }

    /// Текущий entry + advance (wraparound по repeat mode)
    pub fn next(&mut self) -> RecoilEntry {
        let Some(pattern) = self.pattern.as_ref() else {
            return RecoilEntry::ZERO;
        };
        if pattern.is_empty() {
            return RecoilEntry::ZERO;
        }

        let entry = pattern.entries.get(self.index).copied().unwrap_or(RecoilEntry::ZERO);

        self.index += 1;
        if self.index >= pattern.len() {
            self.index = pattern.wrap_index();
        }

        entry
    }

    /// Recovery завершён → pattern снова с начала
    pub fn reset(&mut self) {
        self.index = 0;
    }
}
