//! Weapon FSM: primary state + substate overlay + listener table
//!
//! # Архитектура
//!
//! Primary state — ровно один (enum). Substates (Walking, Jumping, Zoom)
//! — независимый bitflags-набор поверх любого primary.
//!
//! Вместо subscribe/unsubscribe на входе/выходе состояния — статическая
//! таблица `(SignalKind, Handler)` на каждый primary state и substate.
//! Активные listeners = primary ∪ активные substates, пересчитываются на
//! каждый сигнал, поэтому "забытых" подписок после выхода не бывает.
//!
//! Здесь только bookkeeping (какой state, можно ли выйти, что отложено).
//! Entry/exit actions живут в `Weapon`, т.к. мутируют его flags/ledger.

use bitflags::bitflags;

use super::input::SignalKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimaryState {
    #[default]
    Idle,
    Equip,
    Deequip,
    Shooting,
    Reloading,
    Running,
    Empty,
}

impl PrimaryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryState::Idle => "idle",
            PrimaryState::Equip => "equip",
            PrimaryState::Deequip => "deequip",
            PrimaryState::Shooting => "shooting",
            PrimaryState::Reloading => "reloading",
            PrimaryState::Running => "running",
            PrimaryState::Empty => "empty",
        }
    }

    /// Equip/Deequip запросы откладываются, если gate закрыт
    pub fn is_deferrable(&self) -> bool {
        matches!(self, PrimaryState::Equip | PrimaryState::Deequip)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Substates: u8 {
        const WALKING = 1 << 0;
        const JUMPING = 1 << 1;
        const ZOOM = 1 << 2;
    }
}

/// Один substate (для enter/exit hooks)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Substate {
    Walking,
    Jumping,
    Zoom,
}

impl Substate {
    pub fn flag(self) -> Substates {
        match self {
            Substate::Walking => Substates::WALKING,
            Substate::Jumping => Substates::JUMPING,
            Substate::Zoom => Substates::ZOOM,
        }
    }
}

/// Обработчик сигнала (реализация — `Weapon::run_handler`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    /// fire pressed → Shooting / interrupt running / Empty
    BeginShooting,
    /// fire released → Idle (из Empty)
    ReleaseToIdle,
    Reload,
    Run,
    Walk,
    Jump,
    Zoom,
}

type Listeners = &'static [(SignalKind, Handler)];

const IDLE_LISTENERS: Listeners = &[
    (SignalKind::Jump, Handler::Jump),
    (SignalKind::Reload, Handler::Reload),
    (SignalKind::Run, Handler::Run),
    (SignalKind::Fire, Handler::BeginShooting),
    (SignalKind::Walk, Handler::Walk),
    (SignalKind::Zoom, Handler::Zoom),
];

const SHOOTING_LISTENERS: Listeners = &[
    (SignalKind::Jump, Handler::Jump),
    (SignalKind::Reload, Handler::Reload),
    (SignalKind::Run, Handler::Run),
    (SignalKind::Walk, Handler::Walk),
    (SignalKind::Zoom, Handler::Zoom),
];

const RELOADING_LISTENERS: Listeners = &[
    (SignalKind::Walk, Handler::Walk),
    (SignalKind::Run, Handler::Run),
    (SignalKind::Jump, Handler::Jump),
];

// Fire и Zoom здесь только ради interrupt-running
const RUNNING_LISTENERS: Listeners = &[
    (SignalKind::Run, Handler::Run),
    (SignalKind::Fire, Handler::BeginShooting),
    (SignalKind::Jump, Handler::Jump),
    (SignalKind::Zoom, Handler::Zoom),
];

const EMPTY_LISTENERS: Listeners = &[(SignalKind::Fire, Handler::ReleaseToIdle)];

const WALKING_LISTENERS: Listeners = &[(SignalKind::Walk, Handler::Walk)];

/// Listeners primary state'а
pub fn primary_listeners(state: PrimaryState) -> Listeners {
    match state {
        PrimaryState::Idle => IDLE_LISTENERS,
        PrimaryState::Equip | PrimaryState::Deequip => &[],
        PrimaryState::Shooting => SHOOTING_LISTENERS,
        PrimaryState::Reloading => RELOADING_LISTENERS,
        PrimaryState::Running => RUNNING_LISTENERS,
        PrimaryState::Empty => EMPTY_LISTENERS,
    }
}

/// Listeners одного substate flag'а
pub fn substate_listeners(substate: Substates) -> Listeners {
    if substate == Substates::WALKING {
        WALKING_LISTENERS
    } else {
        &[]
    }
}

/// Результат запроса на non-forced переход
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
    /// Можно переходить
    Allowed,
    /// Уже в этом state — no-op
    AlreadyActive,
    /// Gate закрыт, запрос отложен до открытия
    Deferred,
    /// Gate закрыт, запрос отброшен
    Refused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaponStateMachine {
    primary: PrimaryState,
    substates: Substates,
    allows_exit: bool,
    deferred: Option<PrimaryState>,
}

impl Default for WeaponStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WeaponStateMachine {
    pub fn new() -> Self {
        Self {
            primary: PrimaryState::Idle,
            substates: Substates::empty(),
            allows_exit: true,
            deferred: None,
        }
    }

    pub fn primary(&self) -> PrimaryState {
        self.primary
    }

    pub fn substates(&self) -> Substates {
        self.substates
    }

    pub fn has_substate(&self, substate: Substates) -> bool {
        self.substates.contains(substate)
    }

    pub fn allows_exit(&self) -> bool {
        self.allows_exit
    }

    pub fn set_allows_exit(&mut self, allows_exit: bool) {
        self.allows_exit = allows_exit;
    }

    pub fn deferred(&self) -> Option<PrimaryState> {
        self.deferred
    }

    /// Проверка non-forced перехода. Deferrable цели запоминаются.
    pub fn check(&mut self, target: PrimaryState) -> TransitionCheck {
        if target == self.primary {
            return TransitionCheck::AlreadyActive;
        }
        if !self.allows_exit {
            if target.is_deferrable() {
                self.deferred = Some(target);
                return TransitionCheck::Deferred;
            }
            return TransitionCheck::Refused;
        }
        TransitionCheck::Allowed
    }

    /// Переключить primary. Gate на входе всегда открыт,
    /// state сам закрывает его в entry action.
    pub fn enter(&mut self, target: PrimaryState) -> PrimaryState {
        let previous = self.primary;
        self.primary = target;
        self.allows_exit = true;
        if target.is_deferrable() {
            self.deferred = None;
        }
        previous
    }

    /// Отложенный Equip/Deequip, если gate уже открыт
    pub fn take_ready_deferred(&mut self) -> Option<PrimaryState> {
        if self.allows_exit {
            self.deferred.take()
        } else {
            None
        }
    }

    /// Снять отложенный запрос, если он именно `target`
    pub fn clear_deferred_if(&mut self, target: PrimaryState) -> bool {
        if self.deferred == Some(target) {
            self.deferred = None;
            true
        } else {
            false
        }
    }

    /// Забрать отложенный запрос безусловно (caller сам открывает gate)
    pub fn take_deferred(&mut self) -> Option<PrimaryState> {
        self.deferred.take()
    }

    /// true если substate не был активен
    pub fn insert_substate(&mut self, substate: Substate) -> bool {
        let flag = substate.flag();
        let inserted = !self.substates.contains(flag);
        self.substates.insert(flag);
        inserted
    }

    /// true если substate был активен
    pub fn remove_substate(&mut self, substate: Substate) -> bool {
        let flag = substate.flag();
        let removed = self.substates.contains(flag);
        self.substates.remove(flag);
        removed
    }

    /// Handlers для сигнала: primary, затем substates; каждый handler максимум один раз
    pub fn resolve(&self, kind: SignalKind) -> Vec<Handler> {
        let mut handlers = Vec::new();

        let substate_tables = self.substates.iter().map(substate_listeners);
        for table in std::iter::once(primary_listeners(self.primary)).chain(substate_tables) {
            for (listened, handler) in table {
                if *listened == kind && !handlers.contains(handler) {
                    handlers.push(*handler);
                }
            }
        }

        handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equip_and_deequip_ignore_all_signals() {
        let mut machine = WeaponStateMachine::new();
        for state in [PrimaryState::Equip, PrimaryState::Deequip] {
            machine.enter(state);
            for kind in [
                SignalKind::Fire,
                SignalKind::Reload,
                SignalKind::Zoom,
                SignalKind::Walk,
                SignalKind::Run,
                SignalKind::Jump,
            ] {
                assert!(machine.resolve(kind).is_empty());
            }
        }
    }

    #[test]
    fn test_reloading_does_not_listen_to_fire() {
        let mut machine = WeaponStateMachine::new();
        machine.enter(PrimaryState::Reloading);
        assert!(machine.resolve(SignalKind::Fire).is_empty());
        assert!(machine.resolve(SignalKind::Reload).is_empty());
        assert_eq!(machine.resolve(SignalKind::Run), vec![Handler::Run]);
    }

    #[test]
    fn test_walking_substate_listens_in_empty() {
        let mut machine = WeaponStateMachine::new();
        machine.enter(PrimaryState::Empty);
        assert!(machine.resolve(SignalKind::Walk).is_empty());

        machine.insert_substate(Substate::Walking);
        assert_eq!(machine.resolve(SignalKind::Walk), vec![Handler::Walk]);
    }

    #[test]
    fn test_walk_handler_runs_once_with_substate() {
        let mut machine = WeaponStateMachine::new();
        machine.insert_substate(Substate::Walking);
        assert_eq!(machine.resolve(SignalKind::Walk), vec![Handler::Walk]);
    }

    #[test]
    fn test_listeners_follow_primary_state() {
        let mut machine = WeaponStateMachine::new();
        assert_eq!(machine.resolve(SignalKind::Fire), vec![Handler::BeginShooting]);

        machine.enter(PrimaryState::Shooting);
        assert!(machine.resolve(SignalKind::Fire).is_empty());

        machine.enter(PrimaryState::Empty);
        assert_eq!(machine.resolve(SignalKind::Fire), vec![Handler::ReleaseToIdle]);
    }

    #[test]
    fn test_same_state_is_noop() {
        let mut machine = WeaponStateMachine::new();
        assert_eq!(machine.check(PrimaryState::Idle), TransitionCheck::AlreadyActive);
    }

    #[test]
    fn test_closed_gate_defers_equip_and_refuses_others() {
        let mut machine = WeaponStateMachine::new();
        machine.enter(PrimaryState::Shooting);
        machine.set_allows_exit(false);

        assert_eq!(machine.check(PrimaryState::Reloading), TransitionCheck::Refused);
        assert_eq!(machine.check(PrimaryState::Deequip), TransitionCheck::Deferred);
        assert_eq!(machine.deferred(), Some(PrimaryState::Deequip));

        // gate ещё закрыт
        assert_eq!(machine.take_ready_deferred(), None);

        machine.set_allows_exit(true);
        assert_eq!(machine.take_ready_deferred(), Some(PrimaryState::Deequip));
        assert_eq!(machine.deferred(), None);
    }

    #[test]
    fn test_entering_deferred_target_clears_it() {
        let mut machine = WeaponStateMachine::new();
        machine.enter(PrimaryState::Shooting);
        machine.set_allows_exit(false);
        machine.check(PrimaryState::Equip);

        machine.enter(PrimaryState::Equip);
        assert_eq!(machine.deferred(), None);
        assert!(machine.allows_exit());
    }

    #[test]
    fn test_substates_are_independent() {
        let mut machine = WeaponStateMachine::new();
        assert!(machine.insert_substate(Substate::Zoom));
        assert!(!machine.insert_substate(Substate::Zoom));
        assert!(machine.insert_substate(Substate::Jumping));

        machine.enter(PrimaryState::Running);
        assert!(machine.has_substate(Substates::ZOOM | Substates::JUMPING));

        assert!(machine.remove_substate(Substate::Zoom));
        assert!(!machine.remove_substate(Substate::Zoom));
        assert_eq!(machine.substates(), Substates::JUMPING);
    }

    #[test]
    fn test_clear_deferred_only_matching_target() {
        let mut machine = WeaponStateMachine::new();
        machine.enter(PrimaryState::Shooting);
        machine.set_allows_exit(false);

        assert_eq!(machine.check(PrimaryState::Deequip), TransitionCheck::Deferred);
        assert!(!machine.clear_deferred_if(PrimaryState::Equip));
        assert_eq!(machine.deferred(), Some(PrimaryState::Deequip));

        assert!(machine.clear_deferred_if(PrimaryState::Deequip));
        assert_eq!(machine.deferred(), None);

        machine.set_allows_exit(true);
        assert_eq!(machine.take_ready_deferred(), None);
    }
}
