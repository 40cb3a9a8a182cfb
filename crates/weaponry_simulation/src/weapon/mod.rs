//! Weapon module — один экземпляр оружия и его FSM
//!
//! Data flow: `WeaponSignal` → listener table (state_machine) → handlers
//! (instance) → FireControl (ledger + recoil) → `WeaponEvent`.
//!
//! Всё здесь — обычный Rust без ECS, время двигает явный `tick(dt)`.
//! ECS host: см. `controller::systems`.

pub mod config;
pub mod definitions;
pub mod events;
pub mod fire_control;
pub mod input;
pub mod instance;
pub mod state_machine;


pub use config::{FireMode, WeaponConfig};
pub use definitions::{WeaponDefinitions, WeaponId};
pub use events::{
    AnimationClip, AnimationRequest, CrosshairSize, EventSink, WeaponEvent, WeaponEventKind,
};
pub use fire_control::{FireControl, TickContext};
pub use input::{InputLevels, SignalKind, WeaponSignal};
pub use instance::{Weapon, WeaponFlags};
pub use state_machine::{Handler, PrimaryState, Substate, Substates, WeaponStateMachine};
