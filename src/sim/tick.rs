//! Per-frame simulation step
//!
//! The host owns timing: it feeds discrete [`Action`]s through
//! [`handle_action`] and calls [`tick`] once per display frame. Frame order
//! is effects, player physics, entity movement, collisions, spawns, then
//! particles. Nothing past the first game-over transition runs.

use glam::Vec2;
use rand::Rng;
use thiserror::Error;

use super::collision::{collectible_points, streak_multiplier};
use super::particles::palette;
use super::powerup::PowerupKind;
use super::spawn;
use super::state::{Flash, GameEvent, GamePhase, GameState};
use crate::assets::SoundCue;
use crate::consts::*;

/// Simulation failures surfaced to the frame loop
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("player state is not finite (y = {y}, velocity = {velocity_y})")]
    NonFinite { y: f32, velocity_y: f32 },
}

/// Device-independent input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Click, tap or space: start from the menu, flap while playing, restart after game over
    Primary,
    Pause,
    Resume,
    /// Start over from pause or game over
    Restart,
}

/// Apply one input action
pub fn handle_action(state: &mut GameState, action: Action) {
    match (state.phase, action) {
        (GamePhase::Menu, Action::Primary)
        | (GamePhase::GameOver, Action::Primary | Action::Restart)
        | (GamePhase::Paused, Action::Restart) => start_run(state),
        (GamePhase::Playing, Action::Primary) => flap(state),
        (GamePhase::Playing, Action::Pause) => {
            state.phase = GamePhase::Paused;
            log::info!("Paused at score {}", state.score);
        }
        (GamePhase::Paused, Action::Resume) => {
            state.phase = GamePhase::Playing;
            log::info!("Resumed");
        }
        (phase, action) => log::trace!("Ignoring {action:?} in {phase:?}"),
    }
}

fn start_run(state: &mut GameState) {
    state.reset();
    state.phase = GamePhase::Playing;
    state.emit(GameEvent::ScoreChanged(0));
    state.emit(GameEvent::LivesChanged(state.lives));
    state.emit(GameEvent::StartMusic);
    log::info!("Run started (seed {})", state.seed);
}

fn flap(state: &mut GameState) {
    if !state.player.can_flap() {
        return;
    }
    let GameState {
        player, tuning, rng, ..
    } = state;
    player.flap(tuning, rng);
    state.play(SoundCue::Flap);

    let foot = Vec2::new(state.player.center().x, state.player.bottom());
    state
        .particles
        .emit_splash(&mut state.rng, foot, palette::GOLD, 5);
}

/// Advance the simulation by one display frame of `dt_ms` wall-clock time
pub fn tick(state: &mut GameState, dt_ms: f32) -> Result<(), SimError> {
    if state.phase != GamePhase::Playing {
        return Ok(());
    }

    let dt_ms = dt_ms.clamp(0.0, MAX_FRAME_DT_MS);
    state.frame += 1;
    state.clock_ms += dt_ms as f64;
    state.stats.elapsed_secs = state.clock_ms / 1000.0;
    let scroll = state.scroll();
    state.stats.distance += scroll;

    update_effects(state);
    update_player(state);

    if state.phase == GamePhase::Playing {
        update_entities(state, scroll);
        resolve_glass_collisions(state);
        resolve_obstacle_collisions(state);
        resolve_powerup_collisions(state);
    }

    if state.phase == GamePhase::Playing {
        spawn::run_spawners(state);
    }

    state.particles.update();

    if state.phase == GamePhase::Playing && state.in_fire_mode() {
        let pos = Vec2::new(state.player.pos.x, state.player.center().y);
        state
            .particles
            .emit_trail(&mut state.rng, pos, palette::FIRE);
    }

    check_finite(state)
}

fn check_finite(state: &GameState) -> Result<(), SimError> {
    let player = &state.player;
    if player.pos.y.is_finite() && player.velocity_y.is_finite() {
        Ok(())
    } else {
        Err(SimError::NonFinite {
            y: player.pos.y,
            velocity_y: player.velocity_y,
        })
    }
}

/// Count down every timer and report expiries
fn update_effects(state: &mut GameState) {
    state.screen_shake = (state.screen_shake - 1.0).max(0.0);
    state.flash.decay();
    state.invincible_frames = state.invincible_frames.saturating_sub(1);

    if state.fire_frames > 0 {
        state.fire_frames -= 1;
        if state.fire_frames == 0 {
            state.message("FIRE MODE ENDED!");
        }
    }

    for kind in state.effects.tick() {
        log::debug!("{kind:?} expired");
        if let Some(text) = kind.expiry_message() {
            state.message(text);
        }
    }
}

fn update_player(state: &mut GameState) {
    state.player.update(&state.tuning);

    let floor_y = state.floor_y;
    if state.player.bottom() >= floor_y && !state.bouncing {
        state.bouncing = true;
        let GameState {
            player, tuning, rng, ..
        } = state;
        player.flap(tuning, rng);
        state.play(SoundCue::Flap);
        state.player.pos.y = floor_y - state.player.size.y;

        let contact = Vec2::new(state.player.center().x, floor_y);
        lose_life(state);
        state.particles.emit_debris(&mut state.rng, contact, 15);
    } else if state.player.bottom() < floor_y {
        state.bouncing = false;
    }

    if state.player.pos.y < 0.0 {
        state.player.pos.y = 0.0;
        state.player.velocity_y = 0.0;
    }
}

/// Scroll, animate and cull everything that moves with the world
fn update_entities(state: &mut GameState, scroll: f32) {
    if state.effects.magnet_active() {
        apply_magnet(state);
    }

    for glass in &mut state.glasses {
        glass.update(scroll);
    }
    state.glasses.retain(|g| g.is_alive());

    for whisk in &mut state.whisks {
        whisk.update(scroll);
        if !whisk.top && whisk.pos.y + whisk.size.y > state.floor_y {
            whisk.size.y = (state.floor_y - whisk.pos.y).max(0.0);
        }
    }
    let before = state.whisks.len();
    state.whisks.retain(|w| !w.is_off_screen());
    if state.whisks.len() < before && state.pair_count() < OBSTACLE_REPLENISH_PAIRS {
        spawn::try_spawn_obstacle_pair(state);
    }

    let player_left = state.player.pos.x;
    for whisk in &mut state.whisks {
        if whisk.top && !whisk.counted && whisk.right() < player_left {
            whisk.counted = true;
            state.stats.obstacles_passed += 1;
        }
    }

    for powerup in &mut state.powerups {
        powerup.update(scroll);
    }
    state.powerups.retain(|p| !p.is_off_screen());
}

fn apply_magnet(state: &mut GameState) {
    let target = state.player.center();
    let range = state.tuning.magnet_range;
    for glass in state.glasses.iter_mut().filter(|g| !g.scored) {
        let from = glass.center();
        let distance = from.distance(target);
        if distance <= 0.0 || distance >= range {
            continue;
        }
        let strength = 0.5 + (1.0 - distance / range) * 2.0;
        glass.pull_toward(target, strength);
        if state.rng.random::<f32>() < 0.1 {
            state
                .particles
                .emit_magnetic(&mut state.rng, glass.center(), target);
        }
    }
}

fn resolve_glass_collisions(state: &mut GameState) {
    let player = state.player.rect();
    let hits: Vec<usize> = state
        .glasses
        .iter()
        .enumerate()
        .filter(|(_, g)| !g.scored && g.rect().overlaps(&player))
        .map(|(i, _)| i)
        .collect();

    let mut bonus_attempts = 0;
    for i in hits {
        if collect_glass(state, i) {
            bonus_attempts += 1;
        }
    }
    for _ in 0..bonus_attempts {
        spawn::try_spawn_glass(state);
    }
}

/// Score the glass at `index`. Returns true if a bonus spawn was rolled.
fn collect_glass(state: &mut GameState, index: usize) -> bool {
    let streak = state.streak + 1;
    let multiplier = streak_multiplier(streak);

    let glass = &mut state.glasses[index];
    if !glass.collect(multiplier >= 3) {
        return false;
    }
    let center = glass.center();

    state.streak = streak;
    state.stats.highest_streak = state.stats.highest_streak.max(streak);
    state.stats.collected += 1;
    state.score += collectible_points(streak, state.effects.point_multiplier());

    if state.streak >= STREAK_STEP {
        state.message(format!("{multiplier}x COMBO! ({})", state.streak));
        state.play(SoundCue::Perfect);
        if multiplier >= 3 {
            state.flash = Flash::new(0.5, palette::GOLD, 0.2);
        }
    }

    state
        .particles
        .emit_splash(&mut state.rng, center, palette::MILK, 15);
    state.play(SoundCue::Dunk);
    state.emit(GameEvent::ScoreChanged(state.score));

    if state.streak % FIRE_MODE_STREAK == 0 {
        state.fire_frames = FIRE_MODE_FRAMES;
        state.message("FIRE MODE!");
        state.play(SoundCue::Fire);
    }

    state.rng.random::<f64>() < BONUS_COLLECTIBLE_CHANCE
}

/// At most one obstacle hit is resolved per frame
fn resolve_obstacle_collisions(state: &mut GameState) {
    if state.is_invincible() {
        return;
    }
    let player = state.player.rect();
    if !state.whisks.iter().any(|w| w.rect().overlaps(&player)) {
        return;
    }

    if state.effects.consume_shield() {
        log::debug!("Shield absorbed a hit");
        state.screen_shake = 10.0;
        state.flash = Flash::new(1.0, palette::SHIELD, 0.3);
        let center = state.player.center();
        state
            .particles
            .emit_explosion(&mut state.rng, center, palette::SHIELD, 30);
        state.message("SHIELD ABSORBED HIT!");
    } else {
        lose_life(state);
    }
}

fn resolve_powerup_collisions(state: &mut GameState) {
    let player = state.player.rect();
    let (hit, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.powerups)
        .into_iter()
        .partition(|p| p.rect().overlaps(&player));
    state.powerups = kept;

    for powerup in hit {
        activate_powerup(state, powerup.kind);
        let center = powerup.rect().center();
        state
            .particles
            .emit_explosion(&mut state.rng, center, powerup.kind.color(), 20);
    }
}

fn activate_powerup(state: &mut GameState, kind: PowerupKind) {
    log::debug!("Activating {kind:?}");
    match kind {
        PowerupKind::ExtraLife => {
            state.lives += 1;
            state.emit(GameEvent::LivesChanged(state.lives));
        }
        _ => state.effects.activate(kind),
    }
    state.message(kind.activation_message());
    state.flash = Flash::new(1.0, 0xFFFFFF, 0.3);
    state.stats.powerups_collected += 1;
    state.play(SoundCue::Powerup);
}

/// Shared life-loss path for obstacle and floor hits
fn lose_life(state: &mut GameState) {
    if state.is_invincible() {
        return;
    }

    state.lives = state.lives.saturating_sub(1);
    state.streak = 0;
    state.emit(GameEvent::LivesChanged(state.lives));

    let center = state.player.center();
    state.particles.emit_debris(&mut state.rng, center, 20);
    state.screen_shake = 15.0;
    state.flash = Flash::new(1.0, 0xFF0000, 0.2);

    if state.lives == 0 {
        game_over(state);
        return;
    }

    state.invincible_frames = INVINCIBILITY_FRAMES;
    state.play(SoundCue::Crumble);
}

fn game_over(state: &mut GameState) {
    if state.phase == GamePhase::GameOver {
        return;
    }
    state.phase = GamePhase::GameOver;
    state.emit(GameEvent::StopMusic);
    state.play(SoundCue::GameOver);
    state.emit(GameEvent::GameOver { score: state.score });
    log::info!(
        "Game over: score {} after {:.1}s",
        state.score,
        state.stats.elapsed_secs
    );
}

/// Simple pilot for demos and headless runs: steer toward the next gap,
/// else the next glass, else mid-screen.
pub fn autopilot(state: &GameState) -> Option<Action> {
    if state.phase != GamePhase::Playing {
        return None;
    }
    let player = &state.player;
    let gap = state.tuning.obstacle_gap;

    let next_gap = state
        .whisks
        .iter()
        .filter(|w| w.top && w.right() > player.pos.x)
        .min_by(|a, b| a.pos.x.total_cmp(&b.pos.x))
        .map(|w| w.size.y + gap * 0.5);
    let next_glass = state
        .glasses
        .iter()
        .filter(|g| !g.scored && g.pos.x + g.size.x > player.pos.x)
        .min_by(|a, b| a.pos.x.total_cmp(&b.pos.x))
        .map(|g| g.center().y);
    let target = next_gap
        .or(next_glass)
        .unwrap_or(state.floor_y * 0.5);

    let falling_below = player.center().y > target + 10.0 && player.velocity_y > -1.0;
    let near_floor = player.bottom() > state.floor_y - 40.0;
    (player.can_flap() && (falling_below || near_floor)).then_some(Action::Primary)
}
