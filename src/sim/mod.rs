//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - The host supplies frame deltas, nothing reads a clock
//! - Seeded RNG only
//! - No rendering or platform dependencies

pub mod collision;
pub mod particles;
pub mod powerup;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Rect, collectible_points, streak_multiplier};
pub use particles::{Particle, ParticleSystem};
pub use powerup::{Powerup, PowerupEffects, PowerupKind};
pub use state::{Flash, GameEvent, GamePhase, GameState, MilkGlass, Player, Stats, Whisk};
pub use tick::{Action, SimError, autopilot, handle_action, tick};
