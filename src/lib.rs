//! Cookie Dunk - a side-scrolling flap and dunk arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, spawning, collisions, power-ups, particles)
//! - `render`: Drawing capability and the per-frame draw pass
//! - `assets`: Logical asset keys, fallback paths and load tracking
//! - `platform`: Frame loop control and browser bindings
//! - `tuning`: Data-driven game balance

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod assets;
pub mod leaderboard;
pub mod platform;
pub mod render;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod ui;

pub use leaderboard::{LeaderboardEntry, LocalLeaderboard};
pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Default viewport size (the host resizes to its container)
    pub const DEFAULT_VIEW_WIDTH: f32 = 800.0;
    pub const DEFAULT_VIEW_HEIGHT: f32 = 600.0;

    /// Nominal frame duration in milliseconds (60 Hz)
    pub const FRAME_MS: f32 = 1000.0 / 60.0;
    /// Largest wall-clock delta a single frame may advance the clock by
    pub const MAX_FRAME_DT_MS: f32 = 100.0;
    /// Delay before the loop retries after a failed frame
    pub const FRAME_RETRY_BACKOFF_MS: i32 = 1000;

    /// Lives at the start of a run
    pub const START_LIVES: u32 = 3;
    /// Frames of invulnerability after losing a life
    pub const INVINCIBILITY_FRAMES: u32 = 60;

    /// Points for one collectible before multipliers
    pub const BASE_POINTS: u64 = 5;
    /// Streak length per multiplier step
    pub const STREAK_STEP: u32 = 3;
    /// Cap on the streak multiplier
    pub const MAX_STREAK_MULTIPLIER: u32 = 5;
    /// Point multiplier granted by the multiplier power-up
    pub const POWERUP_POINT_MULTIPLIER: u32 = 2;

    /// Power-up durations (frames at 60 Hz)
    pub const PRIMARY_POWERUP_FRAMES: u32 = 300;
    pub const SLOW_MOTION_FRAMES: u32 = 300;
    pub const SHIELD_FRAMES: u32 = 600;

    /// Fire mode: triggered every FIRE_MODE_STREAK pickups in a row
    pub const FIRE_MODE_STREAK: u32 = 5;
    pub const FIRE_MODE_FRAMES: u32 = 300;

    /// Minimum wall-clock time between obstacle pair spawns
    pub const OBSTACLE_SPAWN_INTERVAL_MS: f64 = 2000.0;
    /// Obstacle gap must sit at least this far from the top and the floor
    pub const OBSTACLE_MIN_HEIGHT: f32 = 50.0;
    pub const OBSTACLE_FLOOR_MARGIN: f32 = 50.0;
    /// Below this many live pairs a scrolled-off pair is replaced immediately
    pub const OBSTACLE_REPLENISH_PAIRS: usize = 2;

    /// Vertical margin kept free above and below spawned collectibles
    pub const COLLECTIBLE_MARGIN: f32 = 50.0;
    /// Chance a pickup immediately tries to spawn another collectible
    pub const BONUS_COLLECTIBLE_CHANCE: f64 = 0.3;

    /// Particle budget
    pub const MAX_PARTICLES: usize = 200;

    /// How long transient HUD messages stay up
    pub const MESSAGE_MS: u32 = 1000;

    /// Entries kept on the leaderboard
    pub const LEADERBOARD_SIZE: usize = 25;
}
