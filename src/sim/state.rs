//! Game state and core simulation types
//!
//! Everything a run mutates lives in [`GameState`]; `reset` rebuilds it in
//! one step so no field can leak from one run into the next.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::particles::{Particle, ParticleSystem, palette};
use super::powerup::{Powerup, PowerupEffects};
use super::spawn::gap_layout;
use crate::assets::SoundCue;
use crate::consts::*;
use crate::tuning::Tuning;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, waiting for the first input
    Menu,
    /// Active gameplay
    Playing,
    /// Frozen mid-run, nothing advances
    Paused,
    /// Run ended, waiting for restart
    GameOver,
}

/// Frames the flap squash animation runs for
pub const FLAP_ANIM_FRAMES: u32 = 10;
/// Lifetime of a dribble crumb
pub const CRUMB_FRAMES: f32 = 20.0;

/// The player's cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub size: Vec2,
    pub velocity_y: f32,
    /// Visual tilt in radians, derived from velocity
    pub rotation: f32,
    /// Frames until the next flap is accepted
    pub flap_cooldown: u32,
    /// Draw scale for the flap pulse
    pub scale: f32,
    scale_direction: f32,
    anim_frames: u32,
    /// Cosmetic crumbs shed on each flap
    #[serde(skip)]
    pub crumbs: Vec<Particle>,
}

impl Player {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pos: Vec2::new(tuning.player_start_x, tuning.player_start_y),
            size: Vec2::new(tuning.player_width, tuning.player_height),
            velocity_y: 0.0,
            rotation: 0.0,
            flap_cooldown: 0,
            scale: 1.0,
            scale_direction: 1.0,
            anim_frames: 0,
            crumbs: Vec::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    /// Gravity, velocity clamp, position and tilt for one frame
    pub fn update(&mut self, tuning: &Tuning) {
        self.velocity_y += tuning.gravity;
        self.velocity_y = self
            .velocity_y
            .clamp(-tuning.max_ascent_speed, tuning.terminal_velocity);
        self.pos.y += self.velocity_y;

        self.rotation = if self.velocity_y < 0.0 {
            (self.velocity_y * 0.03).max(-0.35)
        } else {
            (self.velocity_y * 0.05).min(0.8)
        };

        self.flap_cooldown = self.flap_cooldown.saturating_sub(1);

        if self.anim_frames > 0 {
            self.anim_frames -= 1;
            self.scale += 0.03 * self.scale_direction;
            if self.scale > 1.2 {
                self.scale = 1.2;
                self.scale_direction = -1.0;
            } else if self.scale < 0.9 {
                self.scale = 0.9;
                self.scale_direction = 1.0;
            }
            if self.anim_frames == 0 {
                self.scale = 1.0;
            }
        }

        self.crumbs.retain_mut(|c| c.update());
    }

    /// Replace the vertical velocity with the flap impulse
    pub fn flap(&mut self, tuning: &Tuning, rng: &mut impl Rng) {
        self.velocity_y = tuning.flap_power;
        self.flap_cooldown = tuning.flap_cooldown;
        self.scale = 1.2;
        self.scale_direction = -1.0;
        self.anim_frames = FLAP_ANIM_FRAMES;

        let center = self.center();
        for _ in 0..rng.random_range(3..=5) {
            let vel = Vec2::new(
                (rng.random::<f32>() - 0.5) * 2.0,
                -rng.random::<f32>() * 2.0 - 1.0,
            );
            let radius = 1.0 + rng.random::<f32>() * 2.5;
            self.crumbs
                .push(Particle::new(center, vel, radius, palette::CRUMB, CRUMB_FRAMES));
        }
    }

    pub fn can_flap(&self) -> bool {
        self.flap_cooldown == 0
    }
}

/// Float bob amplitude of an uncollected glass
pub const GLASS_FLOAT_AMPLITUDE: f32 = 5.0;
/// Frames the pickup splash rings stay visible
pub const GLASS_SPLASH_FRAMES: u32 = 60;

/// A collectible glass of milk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilkGlass {
    pub id: u32,
    pub pos: Vec2,
    pub size: Vec2,
    /// Centre line of the float bob (moved by the magnet)
    pub base_y: f32,
    /// Set once on pickup, never cleared
    pub scored: bool,
    /// Picked up at a streak multiplier of 3 or more
    pub perfect: bool,
    /// Opacity, counts down after pickup
    pub fade: f32,
    pub float_phase: f32,
    pub pulse_phase: f32,
    pub rotation: f32,
    /// Frames since pickup while the splash plays
    pub splash_frames: Option<u32>,
}

impl MilkGlass {
    pub fn new(id: u32, pos: Vec2, size: Vec2, phase: f32) -> Self {
        Self {
            id,
            pos,
            size,
            base_y: pos.y,
            scored: false,
            perfect: false,
            fade: 1.0,
            float_phase: phase,
            pulse_phase: phase,
            rotation: 0.0,
            splash_frames: None,
        }
    }

    pub fn update(&mut self, scroll: f32) {
        self.pos.x -= scroll;
        if !self.scored {
            self.float_phase += 0.03;
            self.pos.y = self.base_y + self.float_phase.sin() * GLASS_FLOAT_AMPLITUDE;
            self.rotation += 0.005;
            self.pulse_phase += 0.03;
        } else {
            if let Some(frames) = self.splash_frames.as_mut() {
                *frames += 1;
                if *frames >= GLASS_SPLASH_FRAMES {
                    self.splash_frames = None;
                }
            }
            self.fade = (self.fade - 0.01).max(0.0);
        }
    }

    /// Mark collected. Returns false if it already was.
    pub fn collect(&mut self, perfect: bool) -> bool {
        if self.scored {
            return false;
        }
        self.scored = true;
        self.perfect = perfect;
        self.splash_frames = Some(0);
        true
    }

    /// Drift toward `target` (magnet pull)
    pub fn pull_toward(&mut self, target: Vec2, strength: f32) {
        let delta = target - self.center();
        let dir = delta.normalize_or_zero();
        self.pos.x += dir.x * strength;
        self.base_y += dir.y * strength;
        self.pos.y += dir.y * strength;
    }

    pub fn rect(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn is_alive(&self) -> bool {
        self.pos.x + self.size.x > 0.0 && self.fade > 0.0
    }
}

/// One half of an obstacle pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Whisk {
    pub id: u32,
    /// Shared by the two halves of one spawn
    pub pair_id: u32,
    pub pos: Vec2,
    pub size: Vec2,
    /// Hangs from the ceiling (drawn flipped)
    pub top: bool,
    /// Pair already counted as passed
    pub counted: bool,
}

impl Whisk {
    pub fn update(&mut self, scroll: f32) {
        self.pos.x -= scroll;
    }

    pub fn rect(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    pub fn is_off_screen(&self) -> bool {
        self.right() < 0.0
    }
}

/// Per-run statistics shown in the info box and on game over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub collected: u32,
    pub highest_streak: u32,
    /// Pixels scrolled
    pub distance: f32,
    pub obstacles_passed: u32,
    pub elapsed_secs: f64,
    pub powerups_collected: u32,
}

/// Full-screen colour flash
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flash {
    /// Overall strength, decays 0.1 per frame
    pub alpha: f32,
    /// 0xRRGGBB
    pub color: u32,
    /// Opacity of the tint at full strength
    pub tint: f32,
}

impl Flash {
    pub const NONE: Flash = Flash {
        alpha: 0.0,
        color: 0xFFFFFF,
        tint: 1.0,
    };

    pub fn new(alpha: f32, color: u32, tint: f32) -> Self {
        Self { alpha, color, tint }
    }

    pub fn decay(&mut self) {
        self.alpha = (self.alpha - 0.1).max(0.0);
    }

    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0
    }
}

/// Notifications for the host, drained once per frame
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ScoreChanged(u64),
    LivesChanged(u32),
    Message { text: String, duration_ms: u32 },
    Sound(SoundCue),
    StartMusic,
    StopMusic,
    /// Run is over; the host stops the frame loop
    GameOver { score: u64 },
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed the RNG was created from
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub phase: GamePhase,

    // === Viewport ===
    pub width: f32,
    pub height: f32,
    /// Touching this line costs a life
    pub floor_y: f32,

    // === Session ===
    pub score: u64,
    pub streak: u32,
    pub lives: u32,
    pub effects: PowerupEffects,
    pub stats: Stats,
    pub invincible_frames: u32,
    /// Set while the player is bouncing off the floor
    pub bouncing: bool,
    pub fire_frames: u32,

    // === Entities ===
    pub player: Player,
    pub glasses: Vec<MilkGlass>,
    pub whisks: Vec<Whisk>,
    pub powerups: Vec<Powerup>,
    /// Visual particles (not gameplay-affecting)
    pub particles: ParticleSystem,

    // === Feedback ===
    pub screen_shake: f32,
    pub flash: Flash,

    // === Clocks ===
    /// Frames simulated this run
    pub frame: u64,
    /// Milliseconds simulated this run
    pub clock_ms: f64,
    /// `clock_ms` of the last obstacle pair spawn
    pub last_obstacle_spawn_ms: Option<f64>,

    events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Fresh state on the menu screen
    pub fn new(seed: u64, width: f32, height: f32, tuning: Tuning) -> Self {
        let player = Player::new(&tuning);
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            phase: GamePhase::Menu,
            width,
            height,
            floor_y: floor_line(height),
            score: 0,
            streak: 0,
            lives: START_LIVES,
            effects: PowerupEffects::default(),
            stats: Stats::default(),
            invincible_frames: 0,
            bouncing: false,
            fire_frames: 0,
            player,
            glasses: Vec::new(),
            whisks: Vec::new(),
            powerups: Vec::new(),
            particles: ParticleSystem::default(),
            screen_shake: 0.0,
            flash: Flash::NONE,
            frame: 0,
            clock_ms: 0.0,
            last_obstacle_spawn_ms: None,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Reinitialise every session field and recreate the player.
    ///
    /// The RNG keeps running so consecutive runs differ; viewport, tuning
    /// and the particle cap are host configuration and survive.
    pub fn reset(&mut self) {
        self.score = 0;
        self.streak = 0;
        self.lives = START_LIVES;
        self.effects = PowerupEffects::default();
        self.stats = Stats::default();
        self.invincible_frames = 0;
        self.bouncing = false;
        self.fire_frames = 0;
        self.player = Player::new(&self.tuning);
        self.glasses.clear();
        self.whisks.clear();
        self.powerups.clear();
        self.particles.clear();
        self.screen_shake = 0.0;
        self.flash = Flash::NONE;
        self.frame = 0;
        self.clock_ms = 0.0;
        self.last_obstacle_spawn_ms = None;
        self.next_id = 1;
        log::info!("Run reset");
    }

    /// Follow a viewport resize. Entities keep their positions.
    pub fn resize(&mut self, width: f32, height: f32) {
        let fitted = self.obstacles_fit();
        self.width = width;
        self.height = height;
        self.floor_y = floor_line(height);
        if fitted && !self.obstacles_fit() {
            log::warn!(
                "Viewport {width}x{height} is too short for a {} obstacle gap; no whisks until it grows",
                self.tuning.obstacle_gap
            );
        }
    }

    /// Whether an obstacle gap fits above the current floor
    pub fn obstacles_fit(&self) -> bool {
        gap_layout(self.floor_y, self.tuning.obstacle_gap, 0.0).is_some()
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_frames > 0
    }

    pub fn in_fire_mode(&self) -> bool {
        self.fire_frames > 0
    }

    /// Scroll distance this frame
    pub fn scroll(&self) -> f32 {
        self.tuning.effective_scroll(self.effects.slow_motion())
    }

    /// Distinct obstacle pairs still on screen
    pub fn pair_count(&self) -> usize {
        let mut ids: Vec<u32> = self.whisks.iter().map(|w| w.pair_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn play(&mut self, cue: SoundCue) {
        self.events.push(GameEvent::Sound(cue));
    }

    /// Queue a transient HUD message
    pub fn message(&mut self, text: impl Into<String>) {
        self.events.push(GameEvent::Message {
            text: text.into(),
            duration_ms: MESSAGE_MS,
        });
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Hand queued events to the host
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Floor line for a viewport height: three quarters down, whole pixels
pub fn floor_line(height: f32) -> f32 {
    (height * 0.75).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameState {
        GameState::new(42, DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT, Tuning::default())
    }

    #[test]
    fn test_new_state_on_menu() {
        let s = state();
        assert_eq!(s.phase, GamePhase::Menu);
        assert_eq!(s.lives, START_LIVES);
        assert_eq!(s.floor_y, 450.0);
        assert_eq!(s.player.pos, Vec2::new(100.0, 200.0));
    }

    #[test]
    fn test_short_resize_stops_obstacles() {
        let mut s = state();
        assert!(s.obstacles_fit());
        s.resize(DEFAULT_VIEW_WIDTH, 300.0);
        assert_eq!(s.floor_y, 225.0);
        assert!(!s.obstacles_fit());
        s.resize(DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT);
        assert!(s.obstacles_fit());
    }

    #[test]
    fn test_floor_line_is_whole_pixels() {
        assert_eq!(floor_line(601.0), 450.0);
        assert_eq!(floor_line(1000.0), 750.0);
    }

    #[test]
    fn test_gravity_ten_ticks() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning);
        for _ in 0..10 {
            player.update(&tuning);
        }
        assert!((player.velocity_y - 0.5).abs() < 1e-5);
        // 0.05 * (1 + 2 + ... + 10)
        assert!((player.pos.y - 202.75).abs() < 1e-3);
    }

    #[test]
    fn test_velocity_clamped_asymmetrically() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning);
        player.velocity_y = 50.0;
        player.update(&tuning);
        assert_eq!(player.velocity_y, tuning.terminal_velocity);

        player.velocity_y = -50.0;
        player.update(&tuning);
        assert_eq!(player.velocity_y, -tuning.max_ascent_speed);
    }

    #[test]
    fn test_rotation_follows_velocity() {
        let tuning = Tuning::default();
        let mut player = Player::new(&tuning);
        player.velocity_y = -4.0 - tuning.gravity;
        player.update(&tuning);
        assert!((player.rotation + 0.12).abs() < 1e-5);

        player.velocity_y = 2.0 - tuning.gravity;
        player.update(&tuning);
        assert!((player.rotation - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_flap_overrides_velocity() {
        let tuning = Tuning::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let mut player = Player::new(&tuning);
        player.velocity_y = 3.5;
        player.flap(&tuning, &mut rng);
        assert_eq!(player.velocity_y, tuning.flap_power);
        assert_eq!(player.flap_cooldown, tuning.flap_cooldown);
        assert!(!player.can_flap());
        assert!((3..=5).contains(&player.crumbs.len()));
        assert_eq!(player.scale, 1.2);

        for _ in 0..tuning.flap_cooldown {
            player.update(&tuning);
        }
        assert!(player.can_flap());
        for _ in 0..FLAP_ANIM_FRAMES {
            player.update(&tuning);
        }
        assert_eq!(player.scale, 1.0);
    }

    #[test]
    fn test_crumbs_expire() {
        let tuning = Tuning::default();
        let mut rng = Pcg32::seed_from_u64(5);
        let mut player = Player::new(&tuning);
        player.flap(&tuning, &mut rng);
        for _ in 0..CRUMB_FRAMES as usize {
            player.update(&tuning);
        }
        assert!(player.crumbs.is_empty());
    }

    #[test]
    fn test_glass_collect_once() {
        let mut glass = MilkGlass::new(1, Vec2::new(300.0, 100.0), Vec2::new(60.0, 80.0), 0.0);
        assert!(glass.collect(false));
        assert!(!glass.collect(true));
        assert!(!glass.perfect);
    }

    #[test]
    fn test_glass_fades_after_pickup() {
        let mut glass = MilkGlass::new(1, Vec2::new(300.0, 100.0), Vec2::new(60.0, 80.0), 0.0);
        glass.collect(false);
        let mut frames = 0;
        while glass.is_alive() {
            glass.update(0.8);
            frames += 1;
            assert!(frames < 200);
        }
        assert!((99..=101).contains(&frames));
        assert_eq!(glass.splash_frames, None);
    }

    #[test]
    fn test_glass_dies_off_left_edge() {
        let mut glass = MilkGlass::new(1, Vec2::new(0.0, 100.0), Vec2::new(60.0, 80.0), 0.0);
        glass.update(59.0);
        assert!(glass.is_alive());
        glass.update(1.0);
        assert!(!glass.is_alive());
    }

    #[test]
    fn test_magnet_pull_moves_toward_target() {
        let mut glass = MilkGlass::new(1, Vec2::new(300.0, 100.0), Vec2::new(60.0, 80.0), 0.0);
        let before = glass.center();
        glass.pull_toward(Vec2::new(100.0, 140.0), 2.0);
        assert!(glass.center().x < before.x);
    }

    #[test]
    fn test_flash_decays() {
        let mut flash = Flash::new(0.25, 0xFF0000, 0.2);
        flash.decay();
        flash.decay();
        assert!(flash.is_visible());
        flash.decay();
        assert!(!flash.is_visible());
    }

    #[test]
    fn test_reset_restores_session() {
        let mut s = state();
        s.score = 120;
        s.streak = 7;
        s.lives = 1;
        s.effects.activate(crate::sim::powerup::PowerupKind::Shield);
        s.stats.collected = 9;
        s.screen_shake = 4.0;
        s.clock_ms = 5000.0;
        s.player.pos.y = 400.0;
        s.reset();

        assert_eq!(s.score, 0);
        assert_eq!(s.streak, 0);
        assert_eq!(s.lives, START_LIVES);
        assert_eq!(s.effects, PowerupEffects::default());
        assert_eq!(s.stats, Stats::default());
        assert_eq!(s.screen_shake, 0.0);
        assert_eq!(s.clock_ms, 0.0);
        assert_eq!(s.player.pos.y, 200.0);
    }

    #[test]
    fn test_drain_events_empties_queue() {
        let mut s = state();
        s.message("hello");
        s.play(SoundCue::Flap);
        assert_eq!(s.drain_events().len(), 2);
        assert!(s.events().is_empty());
    }
}
