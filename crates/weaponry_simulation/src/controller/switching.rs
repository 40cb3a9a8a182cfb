//! WeaponController — слоты оружия holder'а + оркестрация switch/replace
//!
//! Switch: deequip текущего → ждём его deequip duration → current = target
//! → equip target → ждём equip duration. Каждое ожидание — `TaskSlot`,
//! новый switch отменяет предыдущий (continuation старого не выполнится,
//! "equipped" отменённого оружия не придёт).
//!
//! Guards:
//! - `is_replacing` — switch/replace/add отклоняются (Busy)
//! - cooldown после каждого принятого switch (Throttled)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{WeaponryError, WeaponryResult};
use crate::logger;
use crate::timing::{clamp_timer, TaskSlot};
use crate::weapon::{
    EventSink, PrimaryState, TickContext, Weapon, WeaponConfig, WeaponDefinitions, WeaponEvent,
    WeaponEventKind, WeaponId, WeaponSignal,
};

/// Cooldown между switch'ами (секунды)
pub const SWITCH_COOLDOWN: f32 = 0.1;

/// Параметры controller'а
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Сколько оружия помещается в руки. Сверх — replace текущего.
    #[serde(default = "default_max_weapons")]
    pub max_weapons: usize,
    #[serde(default = "default_switch_cooldown")]
    pub switch_cooldown: f32,
}

fn default_max_weapons() -> usize {
    2
}

fn default_switch_cooldown() -> f32 {
    SWITCH_COOLDOWN
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_weapons: default_max_weapons(),
            switch_cooldown: default_switch_cooldown(),
        }
    }
}

/// Результат запроса switch/replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRequest {
    Started,
    /// Cooldown ещё идёт
    Throttled,
    /// Идёт replace (или switch для replace)
    Busy,
}

/// Результат add_weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddWeaponOutcome {
    /// Новый неактивный слот
    Added { slot: usize },
    /// Слоты заполнены → replace текущего запущен
    Replacing,
    /// Отклонено (replace/switch в процессе)
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwitchStep {
    AwaitDeequip { target: usize },
    AwaitEquip,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingReplacement {
    config: Box<WeaponConfig>,
}

/// Оружие holder'а (component)
#[derive(Component, Debug, Clone)]
pub struct WeaponController {
    weapons: Vec<Weapon>,
    config: ControllerConfig,
    current_index: usize,
    /// Цель switch'а в процессе (для switch_next)
    new_index: usize,
    is_switching: bool,
    is_replacing: bool,
    weapon_is_put_away: bool,
    switch_cooldown_timer: f32,
    switch_task: TaskSlot<SwitchStep>,
    replace_task: TaskSlot<PendingReplacement>,
    movement: Vec2,
}

impl Default for WeaponController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl WeaponController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            weapons: Vec::new(),
            config,
            current_index: 0,
            new_index: 0,
            is_switching: false,
            is_replacing: false,
            weapon_is_put_away: false,
            switch_cooldown_timer: 0.0,
            switch_task: TaskSlot::new(),
            replace_task: TaskSlot::new(),
            movement: Vec2::ZERO,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn weapons(&self) -> &[Weapon] {
        &self.weapons
    }

    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_weapon(&self) -> Option<&Weapon> {
        self.weapons.get(self.current_index)
    }

    pub fn current_weapon_mut(&mut self) -> Option<&mut Weapon> {
        self.weapons.get_mut(self.current_index)
    }

    pub fn weapon(&self, slot: usize) -> Option<&Weapon> {
        self.weapons.get(slot)
    }

    pub fn is_switching(&self) -> bool {
        self.is_switching
    }

    pub fn is_replacing(&self) -> bool {
        self.is_replacing
    }

    /// Switch возможен, пока не идёт replace (cooldown проверяется отдельно)
    pub fn can_switch(&self) -> bool {
        !self.is_replacing
    }

    pub fn weapon_is_put_away(&self) -> bool {
        self.weapon_is_put_away
    }

    pub fn switch_cooldown_remaining(&self) -> f32 {
        self.switch_cooldown_timer
    }

    /// Последний movement vector (читают sway/bob collaborators)
    pub fn movement(&self) -> Vec2 {
        self.movement
    }

    /// Такое же оружие уже есть (по display name)
    pub fn contains_weapon(&self, display_name: &str) -> bool {
        self.get_weapon(display_name).is_some()
    }

    pub fn get_weapon(&self, display_name: &str) -> Option<&Weapon> {
        self.weapons
            .iter()
            .find(|weapon| weapon.display_name() == display_name)
    }

    // ========================================================================
    // Slots
    // ========================================================================

    /// Сбросить всё и взять starter weapon в руки
    pub fn initialize(
        &mut self,
        definitions: &WeaponDefinitions,
        starter: &WeaponId,
        events: &mut Vec<WeaponEvent>,
    ) -> WeaponryResult<()> {
        let config = lookup(definitions, starter)?;
        self.initialize_with(config, events)
    }

    pub fn initialize_with(
        &mut self,
        starter: WeaponConfig,
        events: &mut Vec<WeaponEvent>,
    ) -> WeaponryResult<()> {
        validate(&starter)?;

        self.switch_task.cancel();
        self.replace_task.cancel();
        self.weapons.clear();
        self.current_index = 0;
        self.new_index = 0;
        self.is_switching = false;
        self.is_replacing = false;
        self.weapon_is_put_away = false;
        self.switch_cooldown_timer = 0.0;

        logger::log_info(&format!("WeaponController: starter weapon '{}'", starter.display_name));
        self.weapons.push(Weapon::new(starter));
        self.switch_to(0, events)?;
        Ok(())
    }

    /// Добавить оружие по id. Unknown id — ошибка, состояние не меняется.
    pub fn add_weapon(
        &mut self,
        definitions: &WeaponDefinitions,
        id: &WeaponId,
        events: &mut Vec<WeaponEvent>,
    ) -> WeaponryResult<AddWeaponOutcome> {
        if self.is_replacing {
            return Ok(AddWeaponOutcome::Busy);
        }
        let config = lookup(definitions, id)?;
        self.add_weapon_config(config, events)
    }

    pub fn add_weapon_config(
        &mut self,
        config: WeaponConfig,
        events: &mut Vec<WeaponEvent>,
    ) -> WeaponryResult<AddWeaponOutcome> {
        if self.is_replacing {
            return Ok(AddWeaponOutcome::Busy);
        }
        validate(&config)?;

        if self.weapons.len() >= self.config.max_weapons {
            // Слоты заполнены → меняем оружие в руках
            return Ok(match self.replace(config, events) {
                SwitchRequest::Started => AddWeaponOutcome::Replacing,
                SwitchRequest::Throttled | SwitchRequest::Busy => AddWeaponOutcome::Busy,
            });
        }

        logger::log(&format!(
            "WeaponController: '{}' added to slot {}",
            config.display_name,
            self.weapons.len()
        ));
        self.weapons.push(Weapon::new(config));
        Ok(AddWeaponOutcome::Added {
            slot: self.weapons.len() - 1,
        })
    }

    /// Заменить текущее оружие: deequip → ждём → Removed → новый инстанс
    /// в том же слоте → switch на него (cooldown не действует).
    pub fn replace(&mut self, config: WeaponConfig, events: &mut Vec<WeaponEvent>) -> SwitchRequest {
        if self.is_replacing || self.is_switching {
            return SwitchRequest::Busy;
        }

        let slot = self.current_index;
        let Some(weapon) = self.weapons.get_mut(slot) else {
            // Нечего заменять — просто первый слот
            self.weapons.push(Weapon::new(config));
            self.current_index = self.weapons.len() - 1;
            self.start_switch(self.current_index, events);
            return SwitchRequest::Started;
        };

        logger::log(&format!(
            "WeaponController: replacing '{}' with '{}'",
            weapon.display_name(),
            config.display_name
        ));

        self.is_replacing = true;
        let mut sink = EventSink::new(slot, events);
        weapon.release_inputs();
        weapon.deequip(&mut sink);
        sink.emit(WeaponEventKind::Deequip);

        let wait = remaining_put_away(weapon, &mut sink).unwrap_or(0.0);
        self.replace_task.start(
            wait,
            PendingReplacement {
                config: Box::new(config),
            },
        );
        SwitchRequest::Started
    }

    // ========================================================================
    // Switching
    // ========================================================================

    /// Switch на слот. Out of range — ошибка без мутаций.
    pub fn switch_to(
        &mut self,
        index: usize,
        events: &mut Vec<WeaponEvent>,
    ) -> WeaponryResult<SwitchRequest> {
        if index >= self.weapons.len() {
            logger::log_error(&format!(
                "WeaponController: switch to slot {} rejected ({} weapons)",
                index,
                self.weapons.len()
            ));
            return Err(WeaponryError::SlotOutOfRange {
                index,
                slot_count: self.weapons.len(),
            });
        }

        Ok(self.request_switch(index, events))
    }

    /// Следующий/предыдущий слот с wraparound (от цели switch'а, если он идёт)
    pub fn switch_next(
        &mut self,
        forward: bool,
        events: &mut Vec<WeaponEvent>,
    ) -> WeaponryResult<SwitchRequest> {
        let count = self.weapons.len();
        if count == 0 {
            return Err(WeaponryError::NoWeapons);
        }

        if let Some(weapon) = self.weapons.get(self.current_index) {
            if weapon.primary_state() == PrimaryState::Running {
                EventSink::new(self.current_index, events).emit(WeaponEventKind::InterruptRunning);
            }
        }

        let base = if self.is_switching {
            self.new_index
        } else {
            self.current_index
        };
        let index = if forward {
            (base + 1) % count
        } else {
            (base + count - 1) % count
        };

        Ok(self.request_switch(index, events))
    }

    fn request_switch(&mut self, index: usize, events: &mut Vec<WeaponEvent>) -> SwitchRequest {
        if !self.can_switch() {
            return SwitchRequest::Busy;
        }
        if self.switch_cooldown_timer > 0.0 {
            return SwitchRequest::Throttled;
        }

        self.switch_cooldown_timer = self.config.switch_cooldown;
        self.start_switch(index, events);
        SwitchRequest::Started
    }

    /// Без guard'ов (replace продолжает им свой sequence)
    fn start_switch(&mut self, index: usize, events: &mut Vec<WeaponEvent>) {
        if self.switch_task.cancel() {
            logger::log(&format!(
                "WeaponController: switch to slot {} cancelled by switch to {}",
                self.new_index, index
            ));
        }

        self.is_switching = true;
        self.new_index = index;
        self.weapon_is_put_away = false;

        let current = self.current_index;
        if current != index {
            if let Some(weapon) = self.weapons.get_mut(current) {
                if weapon.is_equipped() {
                    let mut sink = EventSink::new(current, events);
                    if !weapon.has_pending_deequip() {
                        weapon.release_inputs();
                        weapon.deequip(&mut sink);
                        sink.emit(WeaponEventKind::Deequip);
                    }

                    let wait = remaining_put_away(weapon, &mut sink).unwrap_or(0.0);
                    self.switch_task
                        .start(wait, SwitchStep::AwaitDeequip { target: index });
                    return;
                }
            }
        }

        self.begin_equip(index, events);
    }

    fn begin_equip(&mut self, index: usize, events: &mut Vec<WeaponEvent>) {
        self.current_index = index;

        let Some(weapon) = self.weapons.get_mut(index) else {
            self.is_switching = false;
            return;
        };
        // Switch обратно, пока burst держал deequip
        weapon.cancel_pending_deequip();
        if weapon.is_equipped() {
            self.is_switching = false;
            return;
        }

        let mut sink = EventSink::new(index, events);
        weapon.equip(&mut sink);
        sink.emit(WeaponEventKind::Equip);

        let wait = weapon.equip_duration();
        self.switch_task.start(wait, SwitchStep::AwaitEquip);
    }

    // ========================================================================
    // Put away / bring out
    // ========================================================================

    /// Убрать текущее оружие (руки свободны). Прерывает switch в процессе.
    pub fn put_away(&mut self, events: &mut Vec<WeaponEvent>) -> bool {
        if self.weapon_is_put_away || self.is_replacing {
            return false;
        }
        let slot = self.current_index;
        let Some(weapon) = self.weapons.get_mut(slot) else {
            return false;
        };

        self.switch_task.cancel();
        self.is_switching = false;
        self.weapon_is_put_away = true;

        let mut sink = EventSink::new(slot, events);
        weapon.release_inputs();
        weapon.deequip(&mut sink);
        true
    }

    pub fn bring_out(&mut self, events: &mut Vec<WeaponEvent>) -> bool {
        if !self.weapon_is_put_away {
            return false;
        }
        let slot = self.current_index;
        let Some(weapon) = self.weapons.get_mut(slot) else {
            return false;
        };

        self.weapon_is_put_away = false;
        weapon.cancel_pending_deequip();
        if !weapon.is_equipped() {
            let mut sink = EventSink::new(slot, events);
            weapon.equip(&mut sink);
        }
        true
    }

    // ========================================================================
    // Input + tick
    // ========================================================================

    /// Сигналы получает только текущее оружие
    pub fn handle_signal(&mut self, signal: WeaponSignal, events: &mut Vec<WeaponEvent>) {
        if let WeaponSignal::Move(movement) = signal {
            self.movement = movement;
            return;
        }

        let slot = self.current_index;
        let put_away = self.weapon_is_put_away;
        let Some(weapon) = self.weapons.get_mut(slot) else {
            return;
        };
        let mut sink = EventSink::new(slot, events);

        match signal {
            WeaponSignal::Jump(jumping) => sink.emit(WeaponEventKind::Jumping(jumping)),
            WeaponSignal::Run(running) => sink.emit(WeaponEventKind::Running(running)),
            WeaponSignal::Walk(walking) => sink.emit(WeaponEventKind::Walking(walking)),
            WeaponSignal::Fire(pressed) if put_away => {
                weapon.note_trigger(pressed);
                return;
            }
            WeaponSignal::Reload | WeaponSignal::Zoom(_) if put_away => return,
            _ => {}
        }

        weapon.handle_signal(signal, &mut sink);
    }

    /// Tick: cooldown → все активные оружия → switch/replace tasks
    pub fn tick(&mut self, dt: f32, ctx: &mut TickContext, events: &mut Vec<WeaponEvent>) {
        let dt = dt.max(0.0);
        self.switch_cooldown_timer = clamp_timer(self.switch_cooldown_timer - dt);

        for (slot, weapon) in self.weapons.iter_mut().enumerate() {
            if weapon.is_active() {
                let mut sink = EventSink::new(slot, events);
                weapon.tick(dt, ctx, &mut sink);
            }
        }

        if let Some((_, step)) = self.switch_task.tick(dt) {
            self.resume_switch(step, events);
        }

        if let Some((_, pending)) = self.replace_task.tick(dt) {
            self.finish_replace(*pending.config, events);
        }
    }

    fn resume_switch(&mut self, step: SwitchStep, events: &mut Vec<WeaponEvent>) {
        match step {
            SwitchStep::AwaitDeequip { target } => {
                let slot = self.current_index;
                let mut sink = EventSink::new(slot, events);
                if let Some(weapon) = self.weapons.get_mut(slot) {
                    if let Some(wait) = remaining_put_away(weapon, &mut sink) {
                        self.switch_task.start(wait, step);
                        return;
                    }
                }
                sink.emit(WeaponEventKind::Deequipped);
                self.begin_equip(target, events);
            }
            SwitchStep::AwaitEquip => {
                EventSink::new(self.current_index, events).emit(WeaponEventKind::Equipped);
                self.is_switching = false;
                logger::log(&format!(
                    "WeaponController: slot {} equipped",
                    self.current_index
                ));
            }
        }
    }

    fn finish_replace(&mut self, config: WeaponConfig, events: &mut Vec<WeaponEvent>) {
        let slot = self.current_index;
        let mut sink = EventSink::new(slot, events);
        if let Some(weapon) = self.weapons.get_mut(slot) {
            if let Some(wait) = remaining_put_away(weapon, &mut sink) {
                self.replace_task.start(
                    wait,
                    PendingReplacement {
                        config: Box::new(config),
                    },
                );
                return;
            }
        }
        sink.emit(WeaponEventKind::Removed);

        match self.weapons.get_mut(slot) {
            Some(entry) => *entry = Weapon::new(config),
            None => self.weapons.push(Weapon::new(config)),
        }
        self.is_replacing = false;

        // Re-switch на тот же слот, мимо cooldown
        let slot = slot.min(self.weapons.len() - 1);
        self.start_switch(slot, events);
    }
}

/// Сколько ещё ждать, пока оружие уйдёт из рук. None — уже убрано.
///
/// Deequip, отложенный burst'ом, стартует только после последнего выстрела:
/// до этого проверяем каждый tick.
fn remaining_put_away(weapon: &mut Weapon, sink: &mut EventSink) -> Option<f32> {
    if !weapon.is_active() {
        return None;
    }
    if weapon.primary_state() != PrimaryState::Deequip && !weapon.has_pending_deequip() {
        weapon.deequip(sink);
    }
    if weapon.primary_state() == PrimaryState::Deequip {
        Some(weapon.deequip_duration())
    } else {
        Some(0.0)
    }
}

fn lookup(definitions: &WeaponDefinitions, id: &WeaponId) -> WeaponryResult<WeaponConfig> {
    match definitions.require(id) {
        Ok(config) => Ok(config.clone()),
        Err(err) => {
            logger::log_error(&format!("WeaponController: {}", err));
            Err(err)
        }
    }
}

fn validate(config: &WeaponConfig) -> WeaponryResult<()> {
    config.validate().map_err(|err| {
        logger::log_error(&format!("WeaponController: {}", err));
        err
    })
}
