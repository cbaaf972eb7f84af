//! Per-entity drawing
//!
//! Each sprite draws its image when the asset cache has it and a procedural
//! stand-in otherwise. Every function wraps its transforms in [`scoped`].

use std::f32::consts::PI;

use glam::Vec2;

use super::canvas::{Canvas, Color, Font, RenderError, TextAlign, scoped};
use crate::assets::{AssetCache, ImageKey};
use crate::sim::particles::palette;
use crate::sim::state::GLASS_SPLASH_FRAMES;
use crate::sim::{MilkGlass, Particle, Player, Powerup, Whisk};

const COOKIE_BODY: Color = Color::hex(0xD2691E);
const COOKIE_CHIP: Color = Color::hex(0x3D1C02);
/// Chip offsets as fractions of the cookie size; fixed so the fallback doesn't flicker
const CHIP_OFFSETS: [(f32, f32); 5] = [
    (-0.18, -0.15),
    (0.2, -0.08),
    (-0.05, 0.2),
    (0.15, 0.22),
    (-0.22, 0.08),
];

const WHISK_FALLBACK: Color = Color::hex(0xD0D0D0);
const GLASS_BODY: Color = Color::hex(0xE8F4FF);
const GLASS_MILK: Color = Color::WHITE;
const SPLASH_RINGS: [u32; 3] = [0xFFFFFF, 0xF0F8FF, 0xE6F0FF];

/// How the player should look this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerLook {
    /// Overall opacity (halved on invincibility blink frames)
    pub alpha: f32,
    /// Fire mode glow
    pub fire: bool,
}

impl Default for PlayerLook {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            fire: false,
        }
    }
}

pub fn draw_player<C: Canvas + ?Sized>(
    canvas: &mut C,
    player: &Player,
    assets: &AssetCache,
    look: PlayerLook,
) -> Result<(), RenderError> {
    draw_particles(canvas, &player.crumbs)?;

    scoped(canvas, |canvas| {
        let center = player.center();
        if look.alpha < 1.0 {
            canvas.set_alpha(look.alpha);
        }
        canvas.translate(center.x, center.y)?;
        canvas.rotate(player.rotation)?;
        canvas.scale(player.scale, player.scale)?;

        let half = player.size * 0.5;
        if look.fire {
            canvas.fill_circle(
                Vec2::ZERO,
                half.x * 1.3,
                Color::hex(palette::FIRE).with_alpha(0.35),
            )?;
        }

        if assets.has_image(ImageKey::Cookie) {
            canvas.draw_image(ImageKey::Cookie, -half.x, -half.y, player.size.x, player.size.y)
        } else {
            canvas.fill_circle(Vec2::ZERO, half.x, COOKIE_BODY)?;
            for (fx, fy) in CHIP_OFFSETS {
                let chip = Vec2::new(fx * player.size.x, fy * player.size.y);
                canvas.fill_circle(chip, player.size.x * 0.1, COOKIE_CHIP)?;
            }
            Ok(())
        }
    })
}

pub fn draw_glass<C: Canvas + ?Sized>(canvas: &mut C, glass: &MilkGlass) -> Result<(), RenderError> {
    if glass.fade <= 0.0 {
        return Ok(());
    }

    scoped(canvas, |canvas| {
        canvas.set_alpha(glass.fade);

        if let Some(frames) = glass.splash_frames {
            draw_splash(canvas, glass, frames)?;
        }

        let pulse = if glass.scored {
            1.0
        } else {
            1.0 + glass.pulse_phase.sin() * 0.05
        };
        let center = glass.center();
        canvas.translate(center.x, center.y)?;
        canvas.rotate(glass.rotation)?;
        canvas.scale(pulse, pulse)?;

        // Tapered tumbler, milk filling the lower two thirds
        let w = glass.size.x * 0.7;
        let h = glass.size.y * 0.8;
        let top = -h / 2.0;
        let bottom = h / 2.0;
        let taper = w * 0.12;
        canvas.fill_polygon(
            &[
                Vec2::new(-w / 2.0, top),
                Vec2::new(w / 2.0, top),
                Vec2::new(w / 2.0 - taper, bottom),
                Vec2::new(-w / 2.0 + taper, bottom),
            ],
            GLASS_BODY.with_alpha(0.6),
        );
        let milk_top = top + h / 3.0;
        let milk_taper = taper * (milk_top - top) / h;
        canvas.fill_polygon(
            &[
                Vec2::new(-w / 2.0 + milk_taper, milk_top),
                Vec2::new(w / 2.0 - milk_taper, milk_top),
                Vec2::new(w / 2.0 - taper, bottom),
                Vec2::new(-w / 2.0 + taper, bottom),
            ],
            GLASS_MILK,
        );

        if glass.scored {
            let glow = if glass.perfect { Color::GOLD } else { Color::WHITE };
            canvas.stroke_circle(Vec2::ZERO, w * 0.8, 2.0, glow.with_alpha(0.5))?;
        }
        Ok(())
    })
}

/// Expanding rings after a pickup
fn draw_splash<C: Canvas + ?Sized>(
    canvas: &mut C,
    glass: &MilkGlass,
    frames: u32,
) -> Result<(), RenderError> {
    let progress = frames as f32 / GLASS_SPLASH_FRAMES as f32;
    let center = glass.center();
    let max_radius = glass.size.x * 3.0;

    for (i, color) in SPLASH_RINGS.into_iter().enumerate() {
        let ring = (progress * 1.5 - i as f32 * 0.2).min(1.0);
        if ring <= 0.0 {
            continue;
        }
        let opacity = (0.9 - ring).max(0.0);
        canvas.stroke_circle(
            center,
            max_radius * ring,
            5.0 - i as f32 * 0.5,
            Color::hex(color).with_alpha(opacity),
        )?;
    }
    Ok(())
}

pub fn draw_whisk<C: Canvas + ?Sized>(
    canvas: &mut C,
    whisk: &Whisk,
    assets: &AssetCache,
) -> Result<(), RenderError> {
    scoped(canvas, |canvas| {
        if !assets.has_image(ImageKey::Whisk) {
            canvas.fill_rect(whisk.pos.x, whisk.pos.y, whisk.size.x, whisk.size.y, WHISK_FALLBACK);
            return Ok(());
        }

        if whisk.top {
            let center = whisk.pos + whisk.size * 0.5;
            canvas.translate(center.x, center.y)?;
            canvas.rotate(PI)?;
            canvas.draw_image(
                ImageKey::Whisk,
                -whisk.size.x / 2.0,
                -whisk.size.y / 2.0,
                whisk.size.x,
                whisk.size.y,
            )
        } else {
            canvas.draw_image(ImageKey::Whisk, whisk.pos.x, whisk.pos.y, whisk.size.x, whisk.size.y)
        }
    })
}

pub fn draw_powerup<C: Canvas + ?Sized>(canvas: &mut C, powerup: &Powerup) -> Result<(), RenderError> {
    scoped(canvas, |canvas| {
        let pulse = 1.0 + powerup.pulse_phase.sin() * 0.1;
        let center = powerup.pos + powerup.size * 0.5;
        canvas.translate(center.x, center.y)?;
        canvas.rotate(powerup.rotation)?;
        canvas.scale(pulse, pulse)?;

        let radius = powerup.size.x / 2.0;
        let color = Color::hex(powerup.kind.color());
        canvas.fill_circle(Vec2::ZERO, radius * 1.3, color.with_alpha(0.25))?;
        canvas.fill_circle(Vec2::ZERO, radius, color)?;
        canvas.stroke_circle(Vec2::ZERO, radius, 2.0, Color::WHITE.with_alpha(0.8))?;
        canvas.fill_text(
            powerup.kind.symbol(),
            0.0,
            radius * 0.35,
            Font::new(radius).bold().align(TextAlign::Center),
            Color::WHITE,
        )
    })
}

pub fn draw_particles<'a, C, I>(canvas: &mut C, particles: I) -> Result<(), RenderError>
where
    C: Canvas + ?Sized,
    I: IntoIterator<Item = &'a Particle>,
{
    let mut particles = particles.into_iter().peekable();
    if particles.peek().is_none() {
        return Ok(());
    }

    scoped(canvas, |canvas| {
        for p in particles {
            let alpha = p.opacity();
            if alpha <= 0.0 {
                continue;
            }
            canvas.fill_circle(p.pos, p.radius, Color::hex(p.color).with_alpha(alpha))?;
        }
        Ok(())
    })
}

/// Cyan bubble around the player while the shield holds
pub fn draw_shield<C: Canvas + ?Sized>(canvas: &mut C, player: &Player) -> Result<(), RenderError> {
    let radius = player.size.max_element() * 0.8;
    let center = player.center();
    let cyan = Color::hex(palette::SHIELD);
    scoped(canvas, |canvas| {
        canvas.fill_circle(center, radius, cyan.with_alpha(0.12))?;
        canvas.stroke_circle(center, radius, 2.0, cyan.with_alpha(0.8))
    })
}

/// Magnet field with a pulsing inner ring; `frame` drives the pulse
pub fn draw_magnet_field<C: Canvas + ?Sized>(
    canvas: &mut C,
    player: &Player,
    range: f32,
    frame: u64,
) -> Result<(), RenderError> {
    let center = player.center();
    let t = (frame % 3600) as f32 / 60.0;
    let pulse_radius = 30.0 + (t * 3.0).sin() * 10.0;
    scoped(canvas, |canvas| {
        canvas.fill_circle(center, range * 0.5, Color::hex(0xADD8E6).with_alpha(0.15))?;
        canvas.stroke_circle(center, range, 1.0, Color::hex(0xADD8E6).with_alpha(0.25))?;
        canvas.stroke_circle(center, pulse_radius, 2.0, Color::WHITE.with_alpha(0.5))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{DrawCommand, RecordingCanvas};
    use crate::sim::PowerupKind;
    use crate::tuning::Tuning;

    fn canvas() -> RecordingCanvas {
        RecordingCanvas::new(800.0, 600.0)
    }

    #[test]
    fn test_player_uses_image_when_loaded() {
        let mut c = canvas();
        let player = Player::new(&Tuning::default());
        draw_player(&mut c, &player, &AssetCache::all_loaded(), PlayerLook::default()).unwrap();
        assert_eq!(c.images().collect::<Vec<_>>(), vec![ImageKey::Cookie]);
        assert!(c.is_balanced());
        assert!(!c.has_unscoped_state_change());
    }

    #[test]
    fn test_player_fallback_draws_cookie_and_chips() {
        let mut c = canvas();
        let player = Player::new(&Tuning::default());
        draw_player(&mut c, &player, &AssetCache::default(), PlayerLook::default()).unwrap();
        let circles = c
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Circle { .. }))
            .count();
        assert_eq!(circles, 1 + CHIP_OFFSETS.len());
        assert_eq!(c.images().count(), 0);
    }

    #[test]
    fn test_fallback_cookie_is_stable_between_frames() {
        let player = Player::new(&Tuning::default());
        let mut a = canvas();
        let mut b = canvas();
        draw_player(&mut a, &player, &AssetCache::default(), PlayerLook::default()).unwrap();
        draw_player(&mut b, &player, &AssetCache::default(), PlayerLook::default()).unwrap();
        assert_eq!(a.commands, b.commands);
    }

    #[test]
    fn test_failed_image_still_restores() {
        let mut c = canvas();
        c.broken_images.insert(ImageKey::Cookie);
        let player = Player::new(&Tuning::default());
        let result = draw_player(&mut c, &player, &AssetCache::all_loaded(), PlayerLook::default());
        assert!(result.is_err());
        assert!(c.is_balanced());
    }

    #[test]
    fn test_top_whisk_is_flipped() {
        let mut c = canvas();
        let whisk = Whisk {
            id: 1,
            pair_id: 1,
            pos: Vec2::new(300.0, 0.0),
            size: Vec2::new(60.0, 120.0),
            top: true,
            counted: false,
        };
        draw_whisk(&mut c, &whisk, &AssetCache::all_loaded()).unwrap();
        assert!(c.commands.contains(&DrawCommand::Rotate(PI)));
        assert!(c.is_balanced());
    }

    #[test]
    fn test_whisk_fallback_is_a_rect() {
        let mut c = canvas();
        let whisk = Whisk {
            id: 2,
            pair_id: 1,
            pos: Vec2::new(300.0, 320.0),
            size: Vec2::new(60.0, 130.0),
            top: false,
            counted: false,
        };
        draw_whisk(&mut c, &whisk, &AssetCache::default()).unwrap();
        assert!(c.commands.iter().any(|cmd| matches!(
            cmd,
            DrawCommand::Rect { x, w, .. } if *x == 300.0 && *w == 60.0
        )));
    }

    #[test]
    fn test_faded_glass_draws_nothing() {
        let mut c = canvas();
        let mut glass = MilkGlass::new(1, Vec2::new(400.0, 200.0), Vec2::new(60.0, 80.0), 0.0);
        glass.fade = 0.0;
        draw_glass(&mut c, &glass).unwrap();
        assert!(c.commands.is_empty());
    }

    #[test]
    fn test_collected_glass_draws_splash_rings() {
        let mut c = canvas();
        let mut glass = MilkGlass::new(1, Vec2::new(400.0, 200.0), Vec2::new(60.0, 80.0), 0.0);
        glass.collect(true);
        glass.splash_frames = Some(20);
        draw_glass(&mut c, &glass).unwrap();
        let rings = c
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Ring { .. }))
            .count();
        // three splash rings plus the gold glow
        assert_eq!(rings, 4);
        assert!(c.is_balanced());
    }

    #[test]
    fn test_powerup_shows_symbol() {
        let mut c = canvas();
        let p = Powerup::new(1, PowerupKind::Multiplier, Vec2::new(500.0, 100.0), Vec2::splat(40.0));
        draw_powerup(&mut c, &p).unwrap();
        assert!(c.has_text("2X"));
        assert!(!c.has_unscoped_state_change());
    }

    #[test]
    fn test_no_particles_no_commands() {
        let mut c = canvas();
        draw_particles(&mut c, &Vec::<Particle>::new()).unwrap();
        assert!(c.commands.is_empty());
    }
}
