//! Outbound weapon events
//!
//! Core ничего не рендерит: всё, что видят UI/audio/camera/animation
//! collaborators, уходит через `WeaponEvent`. Weapon пишет в `EventSink`,
//! ECS host оборачивает в `WeaponNotification` с holder entity.

use bevy::prelude::*;

use super::state_machine::PrimaryState;

/// Размер прицела (HUD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum CrosshairSize {
    Small,
    Normal,
    Big,
}

/// Анимационные клипы first-person рук
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum AnimationClip {
    Idle,
    Equip,
    Deequip,
    Reloading,
}

/// Запрос к animation driver: clip + скорость + нормализованный старт
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRequest {
    pub clip: AnimationClip,
    pub speed: f32,
    pub offset: f32,
}

impl AnimationRequest {
    pub fn new(clip: AnimationClip, speed: f32, offset: f32) -> Self {
        Self { clip, speed, offset }
    }
}

/// Скорость проигрывания, чтобы клип уложился в `duration`
pub fn playback_speed(duration: f32) -> f32 {
    if duration > 0.0 {
        1.0 / duration
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WeaponEventKind {
    AmmoChanged { magazine: u32, reserve: u32 },
    Shot,
    /// Hit-scan попал в target (один на каждое обработанное пересечение)
    Hit { target: Entity, point: Vec3, normal: Vec3, distance: f32 },
    /// VFX в точке попадания
    ImpactEffect { prefab: String, point: Vec3, normal: Vec3 },
    /// Конечные точки лучей выстрела (tracers)
    ProjectileFired { end_points: Vec<Vec3> },
    /// Host должен заспавнить prefab projectile
    ProjectileSpawned { prefab: String, position: Vec3, rotation: Quat },
    Empty,
    ReloadStarted,
    ReloadFinished,
    ZoomProgress(f32),
    Jumping(bool),
    Running(bool),
    Walking(bool),
    Deequip,
    Deequipped,
    Equip,
    Equipped,
    /// Weapon instance уничтожен (replace)
    Removed,
    Crosshair(CrosshairSize),
    InterruptRunning,
    /// Camera kick (градусы)
    RecoilImpulse { pitch: f32, yaw: f32, duration: f32 },
    RecoilRecovery { duration: f32 },
    Animation(AnimationRequest),
    StateChanged { from: PrimaryState, to: PrimaryState },
}

/// Событие конкретного слота
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponEvent {
    pub slot: usize,
    pub kind: WeaponEventKind,
}

/// Буфер событий, привязанный к слоту оружия
pub struct EventSink<'a> {
    slot: usize,
    events: &'a mut Vec<WeaponEvent>,
}

impl<'a> EventSink<'a> {
    pub fn new(slot: usize, events: &'a mut Vec<WeaponEvent>) -> Self {
        Self { slot, events }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn emit(&mut self, kind: WeaponEventKind) {
        self.events.push(WeaponEvent {
            slot: self.slot,
            kind,
        });
    }
}
