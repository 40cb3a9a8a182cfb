//! Weapon — один экземпляр оружия в руках holder'а
//!
//! Владеет ledger'ом, flags, FSM, recoil sequencer и всеми таймерами.
//! Снаружи: `handle_signal` (input), `tick` (время), `equip`/`deequip`
//! (controller) и read-only queries. Никто другой flags не пишет.
//!
//! Tick order:
//! 1. time_since_last_shot += dt (clamp 60s)
//! 2. recoil recovery countdown → reset sequencer
//! 3. zoom tween
//! 4. behavior текущего primary state (equip tween / shooting / reload)
//! 5. отложенный Equip/Deequip, если gate открылся

use super::config::{FireMode, WeaponConfig};
use super::events::{
    playback_speed, AnimationClip, AnimationRequest, CrosshairSize, EventSink, WeaponEventKind,
};
use super::fire_control::{resolve_hit_scan, spawn_prefab, FireControl, TickContext};
use super::input::{InputLevels, WeaponSignal};
use super::state_machine::{
    Handler, PrimaryState, Substate, Substates, TransitionCheck, WeaponStateMachine,
};
use crate::ammo::{AmmoLedger, TriggerGate};
use crate::logger;
use crate::projectile::ProjectileKind;
use crate::recoil::RecoilSequencer;
use crate::timing::{clamp_timer, ProgressTween, TaskSlot, TIMER_CEILING};

/// Boolean flags оружия (read-only снаружи)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeaponFlags {
    /// Weapon object активен (тикается). Снимается по завершении deequip.
    pub is_active: bool,
    pub is_equipped: bool,
    pub is_equipping: bool,
    pub is_reloading: bool,
    pub is_running: bool,
    pub is_walking: bool,
    pub is_jumping: bool,
    pub is_zooming_in: bool,
    pub is_zoomed_in: bool,
    pub need_to_release_trigger: bool,
    pub is_shooting: bool,
}

impl WeaponFlags {
    pub fn is_zooming(&self) -> bool {
        self.is_zooming_in || self.is_zoomed_in
    }
}

#[derive(Debug, Clone)]
pub struct Weapon {
    config: WeaponConfig,
    ledger: AmmoLedger,
    flags: WeaponFlags,
    state: WeaponStateMachine,
    fire: FireControl,
    recoil: RecoilSequencer,
    recoil_recovery: TaskSlot<()>,
    reload_task: TaskSlot<()>,
    /// 0 = убрано, 1 = в руках
    equip_progress: f32,
    equip_tween: Option<ProgressTween>,
    /// 0 = hip, 1 = ADS
    zoom_progress: f32,
    zoom_tween: Option<ProgressTween>,
    time_since_last_shot: f32,
    input: InputLevels,
}

impl Weapon {
    /// Собранное оружие: полный ledger, Idle, неактивно и не в руках
    pub fn new(config: WeaponConfig) -> Self {
        let ledger = AmmoLedger::new(config.magazine_capacity, config.max_ammo);
        let recoil = RecoilSequencer::new(config.recoil.clone());

        Self {
            config,
            ledger,
            flags: WeaponFlags::default(),
            state: WeaponStateMachine::new(),
            fire: FireControl::default(),
            recoil,
            recoil_recovery: TaskSlot::new(),
            reload_task: TaskSlot::new(),
            equip_progress: 0.0,
            equip_tween: None,
            zoom_progress: 0.0,
            zoom_tween: None,
            time_since_last_shot: TIMER_CEILING,
            input: InputLevels::default(),
        }
    }

    /// Заменить ammo state (pickup с частичным боезапасом, тесты)
    pub fn with_ledger(mut self, ledger: AmmoLedger) -> Self {
        self.ledger = ledger;
        self
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn display_name(&self) -> &str {
        &self.config.display_name
    }

    pub fn ledger(&self) -> &AmmoLedger {
        &self.ledger
    }

    pub fn flags(&self) -> WeaponFlags {
        self.flags
    }

    pub fn is_active(&self) -> bool {
        self.flags.is_active
    }

    pub fn is_equipped(&self) -> bool {
        self.flags.is_equipped
    }

    pub fn primary_state(&self) -> PrimaryState {
        self.state.primary()
    }

    pub fn substates(&self) -> Substates {
        self.state.substates()
    }

    pub fn allows_exit(&self) -> bool {
        self.state.allows_exit()
    }

    pub fn equip_progress(&self) -> f32 {
        self.equip_progress
    }

    /// Читают shooting/visual collaborators для blend hip ↔ ADS
    pub fn zoom_progress(&self) -> f32 {
        self.zoom_progress
    }

    pub fn time_since_last_shot(&self) -> f32 {
        self.time_since_last_shot
    }

    pub fn shots_fired(&self) -> u32 {
        self.fire.shots_fired
    }

    pub fn recoil_index(&self) -> usize {
        self.recoil.index()
    }

    pub fn input(&self) -> InputLevels {
        self.input
    }

    pub fn can_fire(&self) -> bool {
        self.ledger.can_fire(&TriggerGate {
            need_to_release_trigger: self.flags.need_to_release_trigger,
            is_reloading: self.flags.is_reloading,
            is_running: self.flags.is_running,
            time_since_last_shot: self.time_since_last_shot,
            rounds_per_minute: self.config.rounds_per_minute,
        })
    }

    pub fn can_reload(&self) -> bool {
        self.ledger.can_reload(self.flags.is_reloading)
    }

    pub fn can_zoom(&self) -> bool {
        !self.flags.is_reloading && !self.flags.is_running
    }

    /// Оставшееся время equip от текущего progress
    pub fn equip_duration(&self) -> f32 {
        self.config.equip_time * (1.0 - self.equip_progress)
    }

    /// Оставшееся время deequip от текущего progress
    pub fn deequip_duration(&self) -> f32 {
        self.config.equip_time * self.equip_progress
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Достать оружие (controller). false если переход отклонён/отложен.
    pub fn equip(&mut self, sink: &mut EventSink) -> bool {
        self.transition(PrimaryState::Equip, sink)
    }

    /// Убрать оружие (controller). Во время burst'а запрос откладывается.
    pub fn deequip(&mut self, sink: &mut EventSink) -> bool {
        self.transition(PrimaryState::Deequip, sink)
    }

    /// Deequip ждёт, пока burst отпустит gate
    pub fn has_pending_deequip(&self) -> bool {
        self.state.deferred() == Some(PrimaryState::Deequip)
    }

    /// Controller передумал убирать оружие
    pub fn cancel_pending_deequip(&mut self) -> bool {
        self.state.clear_deferred_if(PrimaryState::Deequip)
    }

    /// Pickup / respawn
    pub fn refill_to_max(&mut self, sink: &mut EventSink) {
        self.ledger.refill_to_max();
        sink.emit(self.ammo_changed());
    }

    /// Руки уходят с оружия: спуск и ADS считаются отпущенными
    pub fn release_inputs(&mut self) {
        self.input.fire = false;
        self.input.zoom = false;
        self.flags.need_to_release_trigger = false;
    }

    /// Отпускание спуска снимает блокировку даже у убранного оружия
    pub fn note_trigger(&mut self, pressed: bool) {
        if !pressed && self.flags.need_to_release_trigger {
            self.flags.need_to_release_trigger = false;
        }
    }

    pub fn handle_signal(&mut self, signal: WeaponSignal, sink: &mut EventSink) {
        match signal {
            WeaponSignal::Fire(pressed) => {
                self.note_trigger(pressed);
                self.input.fire = pressed;
            }
            WeaponSignal::Zoom(pressed) => self.input.zoom = pressed,
            WeaponSignal::Look(delta) => self.input.look = delta,
            _ => {}
        }

        let Some(kind) = signal.kind() else {
            return;
        };
        let pressed = signal.pressed();

        for handler in self.state.resolve(kind) {
            self.run_handler(handler, pressed, sink);
        }
    }

    pub fn tick(&mut self, dt: f32, ctx: &mut TickContext, sink: &mut EventSink) {
        if !self.flags.is_active {
            return;
        }
        let dt = dt.max(0.0);

        self.time_since_last_shot = clamp_timer(self.time_since_last_shot + dt);

        if self.recoil_recovery.tick(dt).is_some() {
            self.recoil.reset();
        }

        self.tick_zoom(dt, sink);

        match self.state.primary() {
            PrimaryState::Equip | PrimaryState::Deequip => self.tick_equip(dt, sink),
            PrimaryState::Shooting => self.tick_shooting(dt, ctx, sink),
            PrimaryState::Reloading => {
                if self.reload_task.tick(dt).is_some() {
                    self.finish_reload(sink);
                }
            }
            PrimaryState::Idle | PrimaryState::Running | PrimaryState::Empty => {}
        }

        if let Some(target) = self.state.take_ready_deferred() {
            self.transition(target, sink);
        }
    }

    // ========================================================================
    // Signal handlers
    // ========================================================================

    fn run_handler(&mut self, handler: Handler, pressed: bool, sink: &mut EventSink) {
        match handler {
            Handler::BeginShooting => self.on_fire_pressed(pressed, sink),
            Handler::ReleaseToIdle => {
                if !pressed {
                    self.transition(PrimaryState::Idle, sink);
                }
            }
            Handler::Reload => {
                if pressed && self.can_reload() {
                    self.transition(PrimaryState::Reloading, sink);
                }
            }
            Handler::Run => self.on_run(pressed, sink),
            Handler::Walk => self.on_walk(pressed, sink),
            Handler::Jump => {
                if pressed {
                    self.enter_substate(Substate::Jumping, sink);
                } else {
                    self.exit_substate(Substate::Jumping, sink);
                }
            }
            Handler::Zoom => self.on_zoom(pressed, sink),
        }
    }

    fn on_fire_pressed(&mut self, pressed: bool, sink: &mut EventSink) {
        if !pressed {
            return;
        }

        if self.can_fire() {
            self.transition(PrimaryState::Shooting, sink);
        } else if self.state.primary() == PrimaryState::Running {
            sink.emit(WeaponEventKind::InterruptRunning);
        } else if self.ledger.is_magazine_empty() {
            self.transition(PrimaryState::Empty, sink);
        }
    }

    fn on_run(&mut self, running: bool, sink: &mut EventSink) {
        if running && !self.flags.is_running {
            // Бег прерывает что угодно, включая burst
            self.state.set_allows_exit(true);
            self.transition(PrimaryState::Running, sink);
        } else if !running && self.flags.is_running {
            if self.input.fire && self.can_fire() {
                self.transition(PrimaryState::Shooting, sink);
            } else {
                self.transition(PrimaryState::Idle, sink);
            }
            self.resume_zoom(sink);
        }
    }

    fn on_walk(&mut self, walking: bool, sink: &mut EventSink) {
        if !self.flags.is_jumping {
            if walking {
                self.enter_substate(Substate::Walking, sink);
            } else {
                self.exit_substate(Substate::Walking, sink);
            }
        }

        if self.input.fire && self.can_fire() {
            self.transition(PrimaryState::Shooting, sink);
        }
        self.resume_zoom(sink);
    }

    fn on_zoom(&mut self, pressed: bool, sink: &mut EventSink) {
        if pressed && self.can_zoom() {
            self.enter_substate(Substate::Zoom, sink);
        } else {
            self.exit_substate(Substate::Zoom, sink);
        }

        if self.state.primary() == PrimaryState::Running {
            sink.emit(WeaponEventKind::InterruptRunning);
        }
    }

    /// Zoom всё ещё зажат → вернуться в ADS
    fn resume_zoom(&mut self, sink: &mut EventSink) {
        if self.input.zoom && self.can_zoom() {
            self.enter_substate(Substate::Zoom, sink);
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Non-forced переход (gate + deferral)
    fn transition(&mut self, target: PrimaryState, sink: &mut EventSink) -> bool {
        match self.state.check(target) {
            TransitionCheck::Allowed => {
                self.change_state(target, sink);
                true
            }
            TransitionCheck::Deferred => {
                logger::log(&format!(
                    "{}: {} deferred until {} allows exit",
                    self.config.display_name,
                    target.as_str(),
                    self.state.primary().as_str()
                ));
                false
            }
            TransitionCheck::AlreadyActive | TransitionCheck::Refused => false,
        }
    }

    fn change_state(&mut self, target: PrimaryState, sink: &mut EventSink) {
        let from = self.state.primary();
        self.exit_primary(from, sink);
        self.state.enter(target);

        logger::log(&format!(
            "{}: {} → {}",
            self.config.display_name,
            from.as_str(),
            target.as_str()
        ));
        sink.emit(WeaponEventKind::StateChanged { from, to: target });

        self.enter_primary(target, sink);
    }

    fn enter_primary(&mut self, state: PrimaryState, sink: &mut EventSink) {
        match state {
            PrimaryState::Idle => self.enter_idle(sink),
            PrimaryState::Equip => self.enter_equip(sink),
            PrimaryState::Deequip => self.enter_deequip(sink),
            PrimaryState::Shooting => self.enter_shooting(),
            PrimaryState::Reloading => self.enter_reloading(sink),
            PrimaryState::Running => {
                if self.flags.is_zooming() {
                    self.exit_substate(Substate::Zoom, sink);
                }
                self.flags.is_running = true;
                sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Small));
            }
            PrimaryState::Empty => sink.emit(WeaponEventKind::Empty),
        }
    }

    fn exit_primary(&mut self, state: PrimaryState, sink: &mut EventSink) {
        match state {
            PrimaryState::Equip => {
                self.flags.is_equipping = false;
                self.equip_tween = None;
            }
            PrimaryState::Deequip => self.equip_tween = None,
            PrimaryState::Shooting => self.exit_shooting(sink),
            PrimaryState::Reloading => self.exit_reloading(sink),
            PrimaryState::Running => self.flags.is_running = false,
            PrimaryState::Idle | PrimaryState::Empty => {}
        }
    }

    fn enter_idle(&mut self, sink: &mut EventSink) {
        // После equip/reload с зажатым спуском — сразу стрельба
        if self.input.fire && self.can_fire() {
            self.transition(PrimaryState::Shooting, sink);
            return;
        }

        let crosshair = if self.flags.is_walking {
            CrosshairSize::Big
        } else {
            CrosshairSize::Normal
        };
        sink.emit(WeaponEventKind::Crosshair(crosshair));
        sink.emit(WeaponEventKind::Animation(AnimationRequest::new(
            AnimationClip::Idle,
            1.0,
            0.0,
        )));
    }

    fn enter_equip(&mut self, sink: &mut EventSink) {
        sink.emit(WeaponEventKind::Animation(AnimationRequest::new(
            AnimationClip::Equip,
            playback_speed(self.config.equip_time),
            self.equip_progress,
        )));

        self.flags.is_active = true;
        self.flags.is_equipped = true;
        self.flags.is_equipping = true;
        self.equip_tween = Some(ProgressTween::new(
            self.equip_progress,
            1.0,
            self.equip_duration(),
        ));
        sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Small));
    }

    fn enter_deequip(&mut self, sink: &mut EventSink) {
        if self.flags.is_zooming() {
            self.exit_substate(Substate::Zoom, sink);
        }

        // Клип deequip проигрывается в обратную сторону от equip progress
        sink.emit(WeaponEventKind::Animation(AnimationRequest::new(
            AnimationClip::Deequip,
            playback_speed(self.config.equip_time),
            (self.equip_progress - 1.0).abs(),
        )));

        self.flags.is_equipped = false;
        self.equip_tween = Some(ProgressTween::new(
            self.equip_progress,
            0.0,
            self.deequip_duration(),
        ));
        sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Small));
    }

    fn tick_equip(&mut self, dt: f32, sink: &mut EventSink) {
        let Some(tween) = self.equip_tween.as_mut() else {
            return;
        };
        let step = tween.tick(dt);
        self.equip_progress = step.value();

        if !step.is_completed() {
            return;
        }
        self.equip_tween = None;

        match self.state.primary() {
            PrimaryState::Equip => {
                self.transition(PrimaryState::Idle, sink);
            }
            PrimaryState::Deequip => {
                self.flags.is_active = false;
                logger::log(&format!("{}: put away", self.config.display_name));
            }
            _ => {}
        }
    }

    // ========================================================================
    // Shooting
    // ========================================================================

    fn enter_shooting(&mut self) {
        if self.config.fire_mode == FireMode::Burst {
            // Burst нельзя прервать до последнего выстрела
            self.state.set_allows_exit(false);
        }
        self.flags.is_shooting = true;
        self.fire.begin(self.config.fire_speed());
        self.recoil_recovery.cancel();
    }

    fn exit_shooting(&mut self, sink: &mut EventSink) {
        self.flags.is_shooting = false;

        if let Some(pattern) = self.recoil.pattern() {
            let duration = pattern.recovery_time;
            sink.emit(WeaponEventKind::RecoilRecovery { duration });
            self.recoil_recovery.start(duration, ());
        }
    }

    fn tick_shooting(&mut self, dt: f32, ctx: &mut TickContext, sink: &mut EventSink) {
        if self.ledger.magazine > 0 {
            self.shoot(ctx, sink);
        }

        if self.config.fire_mode == FireMode::FullyAutomatic {
            self.fire.completed_fire_mode = !self.input.fire || self.ledger.magazine == 0;
        }

        self.fire.fire_animation_timer -= dt;
        if self.fire.fire_animation_timer <= 0.0 && self.fire.completed_fire_mode {
            self.state.set_allows_exit(true);

            let natural = if self.ledger.magazine == 0 && self.ledger.reserve > 0 {
                PrimaryState::Reloading
            } else {
                PrimaryState::Idle
            };
            let target = self.state.take_deferred().unwrap_or(natural);
            self.transition(target, sink);
        }
    }

    /// Один выстрел (все точки stamp'а)
    fn shoot(&mut self, ctx: &mut TickContext, sink: &mut EventSink) {
        if !self.can_fire() || self.fire.completed_fire_mode {
            return;
        }

        let projectile = &self.config.projectile;
        let count = projectile.projectile_count();
        let mut end_points = Vec::with_capacity(count);

        match &projectile.kind {
            ProjectileKind::HitScan(spec) => {
                for index in 0..count {
                    end_points.push(resolve_hit_scan(
                        spec,
                        projectile.stamp_offset(index),
                        self.flags.is_zoomed_in,
                        ctx,
                        sink,
                    ));
                }
            }
            ProjectileKind::Prefab(spec) => {
                for index in 0..count {
                    spawn_prefab(spec, projectile.stamp_offset(index), ctx.aim, sink);
                }
            }
        }
        sink.emit(WeaponEventKind::ProjectileFired { end_points });

        self.ledger.consume_round();
        self.time_since_last_shot = 0.0;
        self.apply_recoil(sink);

        let needs_release = self.fire.register_shot(
            self.config.fire_mode,
            self.config.burst_fire_amount,
            self.ledger.magazine,
            self.input.fire,
        );
        if needs_release {
            self.flags.need_to_release_trigger = true;
        }

        // Выход только после fire animation
        self.state.set_allows_exit(false);

        sink.emit(WeaponEventKind::Shot);
        sink.emit(self.ammo_changed());
        sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Big));
    }

    fn apply_recoil(&mut self, sink: &mut EventSink) {
        if self.recoil.pattern().is_none() {
            return;
        }
        let entry = self.recoil.next();
        sink.emit(WeaponEventKind::RecoilImpulse {
            pitch: entry.vertical,
            yaw: entry.horizontal,
            duration: entry.duration(self.fire.fire_speed),
        });
    }

    // ========================================================================
    // Reloading
    // ========================================================================

    fn enter_reloading(&mut self, sink: &mut EventSink) {
        if self.flags.is_zooming() {
            self.exit_substate(Substate::Zoom, sink);
        }

        self.flags.is_reloading = true;
        self.reload_task.start(self.config.reload_time, ());

        sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Small));
        sink.emit(WeaponEventKind::ReloadStarted);
        sink.emit(WeaponEventKind::Animation(AnimationRequest::new(
            AnimationClip::Reloading,
            playback_speed(self.config.reload_time),
            0.0,
        )));
    }

    fn exit_reloading(&mut self, sink: &mut EventSink) {
        if !self.flags.is_reloading {
            sink.emit(WeaponEventKind::ReloadFinished);
            return;
        }

        // Прерван: патроны не переносятся, анимация доигрывается вдвое быстрее
        let reload_time = self.config.reload_time;
        let elapsed = reload_time - self.reload_task.remaining().unwrap_or(0.0);
        let offset = if reload_time > 0.0 {
            (elapsed / reload_time).clamp(0.0, 1.0)
        } else {
            1.0
        };

        self.flags.is_reloading = false;
        self.reload_task.cancel();
        sink.emit(WeaponEventKind::Animation(AnimationRequest::new(
            AnimationClip::Reloading,
            playback_speed(reload_time * 0.5),
            offset,
        )));
        logger::log(&format!("{}: reload interrupted", self.config.display_name));
    }

    fn finish_reload(&mut self, sink: &mut EventSink) {
        self.ledger.reload();
        self.flags.is_reloading = false;
        sink.emit(self.ammo_changed());

        self.resume_zoom(sink);
        self.transition(PrimaryState::Idle, sink);
    }

    // ========================================================================
    // Substates
    // ========================================================================

    fn enter_substate(&mut self, substate: Substate, sink: &mut EventSink) {
        if !self.state.insert_substate(substate) {
            return;
        }

        match substate {
            Substate::Walking => {
                self.flags.is_walking = true;
                sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Big));
            }
            Substate::Jumping => {
                self.flags.is_jumping = true;
                if !self.flags.is_reloading || !self.flags.is_zooming() {
                    sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Big));
                }
            }
            Substate::Zoom => {
                self.flags.is_zooming_in = true;
                sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Small));
                let duration = self.config.zoom_time * (1.0 - self.zoom_progress);
                self.zoom_tween = Some(ProgressTween::new(self.zoom_progress, 1.0, duration));
            }
        }
    }

    fn exit_substate(&mut self, substate: Substate, sink: &mut EventSink) {
        if !self.state.remove_substate(substate) {
            return;
        }

        match substate {
            Substate::Walking => {
                self.flags.is_walking = false;
                sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Normal));
            }
            Substate::Jumping => {
                self.flags.is_jumping = false;
                if !self.flags.is_reloading || !self.flags.is_zooming() {
                    sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Normal));
                }
            }
            Substate::Zoom => {
                self.flags.is_zooming_in = false;
                self.flags.is_zoomed_in = false;
                sink.emit(WeaponEventKind::Crosshair(CrosshairSize::Normal));
                let duration = self.config.zoom_time * self.zoom_progress;
                self.zoom_tween = Some(ProgressTween::new(self.zoom_progress, 0.0, duration));
            }
        }
    }

    fn tick_zoom(&mut self, dt: f32, sink: &mut EventSink) {
        let Some(tween) = self.zoom_tween.as_mut() else {
            return;
        };
        let step = tween.tick(dt);
        let zooming_in = tween.target() >= 1.0;

        let value = step.value();
        if value != self.zoom_progress {
            self.zoom_progress = value;
            sink.emit(WeaponEventKind::ZoomProgress(value));
        }

        if step.is_completed() {
            self.zoom_tween = None;
            if zooming_in {
                self.flags.is_zoomed_in = true;
            }
        }
    }

    fn ammo_changed(&self) -> WeaponEventKind {
        WeaponEventKind::AmmoChanged {
            magazine: self.ledger.magazine,
            reserve: self.ledger.reserve,
        }
    }
}
