//! Full frame pass
//!
//! Order: background, shaken world (glasses, whisks, power-ups, player,
//! particles, power-up overlays), floor info box, HUD, flash, phase overlay.

use glam::Vec2;

use super::canvas::{Canvas, Color, Font, RenderError, TextAlign, scoped};
use super::sprites::{
    PlayerLook, draw_glass, draw_magnet_field, draw_particles, draw_player, draw_powerup,
    draw_shield, draw_whisk,
};
use crate::assets::{AssetCache, ImageKey};
use crate::consts::STREAK_STEP;
use crate::settings::Settings;
use crate::sim::{GamePhase, GameState, PowerupKind, streak_multiplier};

const SKY_TOP: Color = Color::hex(0x87CEEB);
const SKY_BOTTOM: Color = Color::hex(0xE0F7FA);
const INFO_PADDING: f32 = 15.0;
const INFO_LINE: f32 = 20.0;
/// Invincibility blink period in frames
const BLINK_FRAMES: u32 = 6;

/// Visual toggles resolved from [`Settings`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub screen_shake: bool,
    pub flashes: bool,
    pub powerup_effects: bool,
    pub show_stats: bool,
    pub background_image: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for RenderOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            screen_shake: settings.effective_screen_shake(),
            flashes: settings.effective_flashes(),
            powerup_effects: settings.powerup_effects,
            show_stats: settings.show_stats,
            background_image: settings.quality.background_image(),
        }
    }
}

/// Deterministic shake offset for the current frame
pub fn shake_offset(magnitude: f32, frame: u64) -> Vec2 {
    if magnitude <= 0.0 {
        return Vec2::ZERO;
    }
    let t = (frame % 10_000) as f32;
    Vec2::new((t * 1.7).sin(), (t * 2.3).cos()) * magnitude * 0.5
}

/// Whole seconds left on a frame timer, rounded up
pub fn seconds_left(frames: u32) -> u32 {
    frames.div_ceil(60)
}

/// Draw one complete frame
pub fn draw_frame<C: Canvas + ?Sized>(
    canvas: &mut C,
    state: &GameState,
    assets: &AssetCache,
    options: RenderOptions,
) -> Result<(), RenderError> {
    canvas.clear();
    draw_background(canvas, assets, options)?;

    if state.phase != GamePhase::Menu {
        scoped(canvas, |canvas| {
            if options.screen_shake {
                let offset = shake_offset(state.screen_shake, state.frame);
                if offset != Vec2::ZERO {
                    canvas.translate(offset.x, offset.y)?;
                }
            }
            draw_world(canvas, state, assets, options)
        })?;

        draw_floor(canvas, state, options)?;
        draw_hud(canvas, state)?;
        draw_powerup_status(canvas, state)?;

        if options.flashes && state.flash.is_visible() {
            let color = Color::hex(state.flash.color).with_alpha(state.flash.tint);
            scoped(canvas, |canvas| {
                canvas.set_alpha(state.flash.alpha);
                canvas.fill_rect(0.0, 0.0, canvas.width(), canvas.height(), color);
                Ok(())
            })?;
        }
    }

    match state.phase {
        GamePhase::Menu => draw_menu(canvas, assets),
        GamePhase::Paused => draw_paused(canvas),
        GamePhase::GameOver => draw_game_over(canvas, state.score),
        GamePhase::Playing => Ok(()),
    }
}

fn draw_background<C: Canvas + ?Sized>(
    canvas: &mut C,
    assets: &AssetCache,
    options: RenderOptions,
) -> Result<(), RenderError> {
    let (w, h) = (canvas.width(), canvas.height());
    if options.background_image && assets.has_image(ImageKey::Background) {
        canvas.draw_image(ImageKey::Background, 0.0, 0.0, w, h)
    } else {
        canvas.fill_vertical_gradient(0.0, 0.0, w, h, SKY_TOP, SKY_BOTTOM);
        Ok(())
    }
}

fn draw_world<C: Canvas + ?Sized>(
    canvas: &mut C,
    state: &GameState,
    assets: &AssetCache,
    options: RenderOptions,
) -> Result<(), RenderError> {
    for glass in &state.glasses {
        draw_glass(canvas, glass)?;
    }
    for whisk in &state.whisks {
        draw_whisk(canvas, whisk, assets)?;
    }
    for powerup in &state.powerups {
        draw_powerup(canvas, powerup)?;
    }

    let blink = state.is_invincible() && (state.invincible_frames / BLINK_FRAMES) % 2 == 0;
    let look = PlayerLook {
        alpha: if blink { 0.5 } else { 1.0 },
        fire: state.in_fire_mode(),
    };
    draw_player(canvas, &state.player, assets, look)?;

    if options.powerup_effects {
        if state.effects.magnet_active() {
            draw_magnet_field(canvas, &state.player, state.tuning.magnet_range, state.frame)?;
        }
        if state.effects.shield_active() {
            draw_shield(canvas, &state.player)?;
        }
    }

    draw_particles(canvas, state.particles.iter())
}

/// Info box under the floor line
fn draw_floor<C: Canvas + ?Sized>(
    canvas: &mut C,
    state: &GameState,
    options: RenderOptions,
) -> Result<(), RenderError> {
    let w = canvas.width();
    let box_height = (canvas.height() - state.floor_y).max(0.0);
    canvas.fill_rect(0.0, state.floor_y, w, box_height, Color::BLACK.with_alpha(0.6));
    canvas.fill_rect(0.0, state.floor_y, w, 2.0, Color::WHITE.with_alpha(0.8));

    if !options.show_stats {
        return Ok(());
    }

    let text = Color::WHITE.with_alpha(0.9);
    let top = state.floor_y + INFO_PADDING;
    canvas.fill_text("Game Stats", INFO_PADDING, top, Font::new(18.0).bold(), text)?;

    let stats = &state.stats;
    let left = [
        format!("Score: {}", state.score),
        format!("Lives: {}", state.lives),
        format!("Streak: {}", state.streak),
        format!("Highest Streak: {}", stats.highest_streak),
    ];
    let right = [
        format!("Milk Collected: {}", stats.collected),
        format!("Whisks Passed: {}", stats.obstacles_passed),
        format!("Powerups: {}", stats.powerups_collected),
        format!("Time: {:.1}s", stats.elapsed_secs),
    ];
    let rows = state.floor_y + INFO_PADDING * 2.0 + INFO_LINE;
    let body = Font::new(14.0);
    for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
        let y = rows + i as f32 * INFO_LINE;
        canvas.fill_text(l, INFO_PADDING, y, body, text)?;
        canvas.fill_text(r, w / 2.0, y, body, text)?;
    }

    let active = state.effects.active();
    if !active.is_empty() {
        let y = rows + 4.0 * INFO_LINE;
        canvas.fill_text("Active Powerups:", INFO_PADDING, y, body.bold(), text)?;
        let names = active
            .iter()
            .map(|(kind, _)| kind.label())
            .collect::<Vec<_>>()
            .join(", ");
        canvas.fill_text(&names, INFO_PADDING, y + INFO_LINE, body, text)?;
    }
    Ok(())
}

fn draw_hud<C: Canvas + ?Sized>(canvas: &mut C, state: &GameState) -> Result<(), RenderError> {
    let font = Font::new(24.0).bold();
    canvas.fill_text(&format!("Score: {}", state.score), 20.0, 40.0, font, Color::WHITE)?;
    canvas.fill_text(&format!("Lives: {}", state.lives), 20.0, 70.0, font, Color::WHITE)?;

    if state.streak >= STREAK_STEP {
        let multiplier = streak_multiplier(state.streak);
        canvas.fill_text(
            &format!("Streak: {} ({multiplier}x)", state.streak),
            20.0,
            100.0,
            font,
            Color::GOLD,
        )?;
    }
    Ok(())
}

/// Top-right countdown for each timed power-up
fn draw_powerup_status<C: Canvas + ?Sized>(canvas: &mut C, state: &GameState) -> Result<(), RenderError> {
    let x = canvas.width() - 20.0;
    let font = Font::new(16.0).bold().align(TextAlign::Right);
    let timed = state
        .effects
        .active()
        .into_iter()
        .filter(|(kind, _)| *kind != PowerupKind::ExtraLife);
    for (row, (kind, frames)) in timed.enumerate() {
        let line = format!("{}: {}s", kind.label(), seconds_left(frames));
        let y = 36.0 + row as f32 * 22.0;
        canvas.fill_text(&line, x, y, font, Color::hex(kind.color()))?;
    }
    Ok(())
}

fn dim<C: Canvas + ?Sized>(canvas: &mut C, alpha: f32) {
    let (w, h) = (canvas.width(), canvas.height());
    canvas.fill_rect(0.0, 0.0, w, h, Color::BLACK.with_alpha(alpha));
}

fn draw_menu<C: Canvas + ?Sized>(canvas: &mut C, assets: &AssetCache) -> Result<(), RenderError> {
    dim(canvas, 0.3);
    let (w, h) = (canvas.width(), canvas.height());
    let center = Font::new(48.0).bold().align(TextAlign::Center);

    if assets.has_image(ImageKey::Logo) {
        let size = (w.min(h) * 0.4).min(240.0);
        canvas.draw_image(ImageKey::Logo, (w - size) / 2.0, h * 0.45 - size, size, size)?;
    } else {
        canvas.fill_text("Cookie Dunk", w / 2.0, h * 0.4, center, Color::WHITE)?;
    }
    canvas.fill_text(
        "Tap or press Space to start",
        w / 2.0,
        h * 0.55,
        Font::new(24.0).align(TextAlign::Center),
        Color::WHITE,
    )
}

fn draw_paused<C: Canvas + ?Sized>(canvas: &mut C) -> Result<(), RenderError> {
    dim(canvas, 0.4);
    let (w, h) = (canvas.width(), canvas.height());
    canvas.fill_text(
        "PAUSED",
        w / 2.0,
        h / 2.0,
        Font::new(48.0).bold().align(TextAlign::Center),
        Color::WHITE,
    )
}

fn draw_game_over<C: Canvas + ?Sized>(canvas: &mut C, score: u64) -> Result<(), RenderError> {
    dim(canvas, 0.5);
    let (w, h) = (canvas.width(), canvas.height());
    canvas.fill_text(
        "Game Over",
        w / 2.0,
        h / 2.0,
        Font::new(48.0).align(TextAlign::Center),
        Color::RED,
    )?;
    canvas.fill_text(
        &format!("Final Score: {score}"),
        w / 2.0,
        h / 2.0 + 50.0,
        Font::new(24.0).align(TextAlign::Center),
        Color::WHITE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{DrawCommand, RecordingCanvas};
    use crate::sim::{Action, handle_action, tick};
    use crate::tuning::Tuning;

    fn playing_state() -> GameState {
        let mut state = GameState::new(7, 800.0, 600.0, Tuning::default());
        handle_action(&mut state, Action::Primary);
        state
    }

    fn render(state: &GameState, assets: &AssetCache, options: RenderOptions) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::new(state.width, state.height);
        draw_frame(&mut canvas, state, assets, options).unwrap();
        canvas
    }

    #[test]
    fn test_menu_overlay() {
        let state = GameState::new(1, 800.0, 600.0, Tuning::default());
        let canvas = render(&state, &AssetCache::default(), RenderOptions::default());
        assert!(canvas.has_text("Cookie Dunk"));
        assert!(canvas.has_text("Space"));
        assert!(!canvas.has_text("Score:"));
    }

    #[test]
    fn test_gradient_when_background_missing() {
        let state = playing_state();
        let canvas = render(&state, &AssetCache::default(), RenderOptions::default());
        assert!(matches!(canvas.commands[1], DrawCommand::Gradient { .. }));

        let canvas = render(&state, &AssetCache::all_loaded(), RenderOptions::default());
        assert_eq!(canvas.images().next(), Some(ImageKey::Background));
    }

    #[test]
    fn test_frame_is_balanced_mid_run() {
        let mut state = playing_state();
        for _ in 0..300 {
            tick(&mut state, 16.0).unwrap();
            if state.phase == GamePhase::Playing && state.player.can_flap() && state.player.pos.y > 250.0 {
                handle_action(&mut state, Action::Primary);
            }
        }
        state.screen_shake = 10.0;
        let canvas = render(&state, &AssetCache::all_loaded(), RenderOptions::default());
        assert!(canvas.is_balanced());
        assert!(!canvas.has_unscoped_state_change());
    }

    #[test]
    fn test_hud_and_stats_text() {
        let mut state = playing_state();
        state.score = 42;
        state.streak = 7;
        let canvas = render(&state, &AssetCache::default(), RenderOptions::default());
        assert!(canvas.has_text("Score: 42"));
        assert!(canvas.has_text("Streak: 7 (2x)"));
        assert!(canvas.has_text("Game Stats"));
        assert!(canvas.has_text("Time: 0.0s"));
    }

    #[test]
    fn test_stats_box_can_be_hidden() {
        let state = playing_state();
        let options = RenderOptions {
            show_stats: false,
            ..RenderOptions::default()
        };
        let canvas = render(&state, &AssetCache::default(), options);
        assert!(!canvas.has_text("Game Stats"));
    }

    #[test]
    fn test_powerup_status_rounds_seconds_up() {
        let mut state = playing_state();
        state.effects.activate(PowerupKind::Multiplier);
        state.effects.primary = Some((PowerupKind::Multiplier, 61));
        let canvas = render(&state, &AssetCache::default(), RenderOptions::default());
        assert!(canvas.has_text("2X POINTS: 2s"));
        assert!(canvas.has_text("Active Powerups:"));
    }

    #[test]
    fn test_shield_bubble_respects_toggle() {
        let mut state = playing_state();
        state.effects.activate(PowerupKind::Shield);
        let rings = |c: &RecordingCanvas| {
            c.commands
                .iter()
                .filter(|cmd| matches!(cmd, DrawCommand::Ring { .. }))
                .count()
        };
        let on = render(&state, &AssetCache::default(), RenderOptions::default());
        let off = render(
            &state,
            &AssetCache::default(),
            RenderOptions {
                powerup_effects: false,
                ..RenderOptions::default()
            },
        );
        assert_eq!(rings(&on), rings(&off) + 1);
    }

    #[test]
    fn test_flash_overlay_only_when_enabled() {
        let mut state = playing_state();
        state.flash = crate::sim::Flash::new(1.0, 0xFF0000, 0.2);
        let tint = |c: &RecordingCanvas| {
            c.commands.iter().any(|cmd| matches!(
                cmd,
                DrawCommand::Rect { color, .. } if *color == Color::RED.with_alpha(0.2)
            ))
        };
        let with = render(&state, &AssetCache::default(), RenderOptions::default());
        assert!(tint(&with));
        let without = render(
            &state,
            &AssetCache::default(),
            RenderOptions {
                flashes: false,
                ..RenderOptions::default()
            },
        );
        assert!(!tint(&without));
    }

    #[test]
    fn test_shake_is_skipped_when_disabled() {
        let mut state = playing_state();
        state.screen_shake = 15.0;
        state.frame = 3;
        let options = RenderOptions {
            screen_shake: false,
            ..RenderOptions::default()
        };
        let canvas = render(&state, &AssetCache::default(), options);
        let offset = shake_offset(15.0, 3);
        assert!(!canvas.commands.contains(&DrawCommand::Translate(offset.x, offset.y)));
    }

    #[test]
    fn test_overlays() {
        let mut state = playing_state();
        handle_action(&mut state, Action::Pause);
        assert!(render(&state, &AssetCache::default(), RenderOptions::default()).has_text("PAUSED"));

        state.phase = GamePhase::GameOver;
        state.score = 90;
        let canvas = render(&state, &AssetCache::default(), RenderOptions::default());
        assert!(canvas.has_text("Game Over"));
        assert!(canvas.has_text("Final Score: 90"));
    }

    #[test]
    fn test_seconds_left() {
        assert_eq!(seconds_left(0), 0);
        assert_eq!(seconds_left(1), 1);
        assert_eq!(seconds_left(60), 1);
        assert_eq!(seconds_left(61), 2);
        assert_eq!(seconds_left(600), 10);
    }
}
