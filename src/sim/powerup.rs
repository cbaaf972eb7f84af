//! Power-up kinds and the active-effect state machine
//!
//! Multiplier and magnet share one primary slot: activating either replaces
//! whatever occupied it. Slow motion and shield run on their own timers and
//! stack freely with the primary slot and each other. Extra life is instant.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::consts::{
    POWERUP_POINT_MULTIPLIER, PRIMARY_POWERUP_FRAMES, SHIELD_FRAMES, SLOW_MOTION_FRAMES,
};

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerupKind {
    /// Doubles points while active (primary slot)
    Multiplier,
    /// Pulls nearby collectibles toward the player (primary slot)
    Magnet,
    /// Halves scroll speed
    SlowMotion,
    /// Absorbs one obstacle hit
    Shield,
    /// +1 life, no duration
    ExtraLife,
}

impl PowerupKind {
    /// Selection order for weighted spawning
    pub const ALL: [PowerupKind; 5] = [
        PowerupKind::Multiplier,
        PowerupKind::Magnet,
        PowerupKind::SlowMotion,
        PowerupKind::Shield,
        PowerupKind::ExtraLife,
    ];

    /// Weighted pick for a uniform `roll` in [0, 1).
    ///
    /// Weights are not renormalised: a roll that falls past the summed weights
    /// selects the first kind.
    pub fn choose(weights: &[f64; 5], roll: f64) -> PowerupKind {
        let mut remaining = roll;
        for (kind, weight) in Self::ALL.iter().zip(weights) {
            if remaining < *weight {
                return *kind;
            }
            remaining -= weight;
        }
        Self::ALL[0]
    }

    /// Duration in frames (0 = instant)
    pub fn duration_frames(self) -> u32 {
        match self {
            PowerupKind::Multiplier | PowerupKind::Magnet => PRIMARY_POWERUP_FRAMES,
            PowerupKind::SlowMotion => SLOW_MOTION_FRAMES,
            PowerupKind::Shield => SHIELD_FRAMES,
            PowerupKind::ExtraLife => 0,
        }
    }

    /// Occupies the single primary slot
    pub fn is_primary(self) -> bool {
        matches!(self, PowerupKind::Multiplier | PowerupKind::Magnet)
    }

    /// Body colour (0xRRGGBB)
    pub fn color(self) -> u32 {
        match self {
            PowerupKind::Multiplier => 0xFFD700,
            PowerupKind::Magnet => 0x1E90FF,
            PowerupKind::SlowMotion => 0x9370DB,
            PowerupKind::Shield => 0x00FFFF,
            PowerupKind::ExtraLife => 0xFF4444,
        }
    }

    /// Glyph drawn on the power-up body
    pub fn symbol(self) -> &'static str {
        match self {
            PowerupKind::Multiplier => "2X",
            PowerupKind::Magnet => "M",
            PowerupKind::SlowMotion => "S",
            PowerupKind::Shield => "O",
            PowerupKind::ExtraLife => "+1",
        }
    }

    /// Name shown in the status panel
    pub fn label(self) -> &'static str {
        match self {
            PowerupKind::Multiplier => "2X POINTS",
            PowerupKind::Magnet => "MILK MAGNET",
            PowerupKind::SlowMotion => "SLOW MOTION",
            PowerupKind::Shield => "SHIELD",
            PowerupKind::ExtraLife => "EXTRA LIFE",
        }
    }

    pub fn activation_message(self) -> &'static str {
        match self {
            PowerupKind::Multiplier => "2X POINTS!",
            PowerupKind::Magnet => "MILK MAGNET!",
            PowerupKind::SlowMotion => "SLOW MOTION!",
            PowerupKind::Shield => "SHIELD ACTIVATED!",
            PowerupKind::ExtraLife => "EXTRA LIFE!",
        }
    }

    pub fn expiry_message(self) -> Option<&'static str> {
        match self {
            PowerupKind::Multiplier => Some("2X POINTS ENDED!"),
            PowerupKind::Magnet => Some("MILK MAGNET ENDED!"),
            PowerupKind::SlowMotion => Some("NORMAL SPEED RESUMED!"),
            PowerupKind::Shield => Some("SHIELD DEACTIVATED!"),
            PowerupKind::ExtraLife => None,
        }
    }
}

/// A floating power-up pickup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Powerup {
    pub id: u32,
    pub kind: PowerupKind,
    pub pos: Vec2,
    pub size: Vec2,
    /// Centre line of the float bob
    pub base_y: f32,
    pub float_phase: f32,
    pub rotation: f32,
    pub pulse_phase: f32,
}

/// Float bob amplitude in pixels
pub const POWERUP_FLOAT_AMPLITUDE: f32 = 15.0;

impl Powerup {
    pub fn new(id: u32, kind: PowerupKind, pos: Vec2, size: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            size,
            base_y: pos.y,
            float_phase: 0.0,
            rotation: 0.0,
            pulse_phase: 0.0,
        }
    }

    /// Scroll left and advance the idle animation
    pub fn update(&mut self, scroll: f32) {
        self.pos.x -= scroll;
        self.float_phase += 0.05;
        self.pos.y = self.base_y + self.float_phase.sin() * POWERUP_FLOAT_AMPLITUDE;
        self.rotation += 0.02;
        self.pulse_phase += 0.1;
    }

    pub fn rect(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    pub fn is_off_screen(&self) -> bool {
        self.pos.x + self.size.x < 0.0
    }
}

/// Currently running power-up effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerupEffects {
    /// Multiplier or magnet with frames remaining
    pub primary: Option<(PowerupKind, u32)>,
    pub slow_motion_frames: u32,
    pub shield_frames: u32,
}

impl PowerupEffects {
    /// Start a timed effect. Extra life has no timed part and is ignored here.
    pub fn activate(&mut self, kind: PowerupKind) {
        match kind {
            PowerupKind::Multiplier | PowerupKind::Magnet => {
                if let Some((previous, _)) = self.primary
                    && previous != kind
                {
                    log::debug!("{previous:?} replaced by {kind:?}");
                }
                self.primary = Some((kind, kind.duration_frames()));
            }
            PowerupKind::SlowMotion => self.slow_motion_frames = kind.duration_frames(),
            PowerupKind::Shield => self.shield_frames = kind.duration_frames(),
            PowerupKind::ExtraLife => {}
        }
    }

    /// Count every timer down one frame. Returns the effects that just ran out.
    pub fn tick(&mut self) -> Vec<PowerupKind> {
        let mut expired = Vec::new();

        if let Some((kind, frames)) = self.primary.as_mut() {
            *frames = frames.saturating_sub(1);
            if *frames == 0 {
                expired.push(*kind);
                self.primary = None;
            }
        }

        if self.slow_motion_frames > 0 {
            self.slow_motion_frames -= 1;
            if self.slow_motion_frames == 0 {
                expired.push(PowerupKind::SlowMotion);
            }
        }

        if self.shield_frames > 0 {
            self.shield_frames -= 1;
            if self.shield_frames == 0 {
                expired.push(PowerupKind::Shield);
            }
        }

        expired
    }

    /// Spend the shield on a hit. Returns false if none was up.
    pub fn consume_shield(&mut self) -> bool {
        if self.shield_frames == 0 {
            return false;
        }
        self.shield_frames = 0;
        true
    }

    pub fn point_multiplier(&self) -> u32 {
        match self.primary {
            Some((PowerupKind::Multiplier, _)) => POWERUP_POINT_MULTIPLIER,
            _ => 1,
        }
    }

    pub fn magnet_active(&self) -> bool {
        matches!(self.primary, Some((PowerupKind::Magnet, _)))
    }

    pub fn slow_motion(&self) -> bool {
        self.slow_motion_frames > 0
    }

    pub fn shield_active(&self) -> bool {
        self.shield_frames > 0
    }

    /// Active timed effects with frames left, for the status panel
    pub fn active(&self) -> Vec<(PowerupKind, u32)> {
        let mut out = Vec::with_capacity(3);
        if let Some(primary) = self.primary {
            out.push(primary);
        }
        if self.slow_motion_frames > 0 {
            out.push((PowerupKind::SlowMotion, self.slow_motion_frames));
        }
        if self.shield_frames > 0 {
            out.push((PowerupKind::Shield, self.shield_frames));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WEIGHTS: [f64; 5] = [0.3, 0.3, 0.2, 0.1, 0.1];

    #[test]
    fn test_choose_by_weight() {
        assert_eq!(PowerupKind::choose(&WEIGHTS, 0.0), PowerupKind::Multiplier);
        assert_eq!(PowerupKind::choose(&WEIGHTS, 0.29), PowerupKind::Multiplier);
        assert_eq!(PowerupKind::choose(&WEIGHTS, 0.31), PowerupKind::Magnet);
        assert_eq!(PowerupKind::choose(&WEIGHTS, 0.65), PowerupKind::SlowMotion);
        assert_eq!(PowerupKind::choose(&WEIGHTS, 0.85), PowerupKind::Shield);
        assert_eq!(PowerupKind::choose(&WEIGHTS, 0.95), PowerupKind::ExtraLife);
    }

    #[test]
    fn test_choose_falls_back_to_first() {
        let short = [0.1, 0.1, 0.1, 0.1, 0.1];
        assert_eq!(PowerupKind::choose(&short, 0.75), PowerupKind::Multiplier);
        assert_eq!(PowerupKind::choose(&[0.0; 5], 0.0), PowerupKind::Multiplier);
    }

    #[test]
    fn test_primary_slot_overwrites() {
        let mut fx = PowerupEffects::default();
        fx.activate(PowerupKind::Multiplier);
        assert_eq!(fx.point_multiplier(), 2);

        fx.activate(PowerupKind::Magnet);
        assert!(fx.magnet_active());
        assert_eq!(fx.point_multiplier(), 1);
        assert_eq!(fx.primary, Some((PowerupKind::Magnet, PRIMARY_POWERUP_FRAMES)));
    }

    #[test]
    fn test_independent_timers_coexist() {
        let mut fx = PowerupEffects::default();
        fx.activate(PowerupKind::Multiplier);
        fx.activate(PowerupKind::SlowMotion);
        fx.activate(PowerupKind::Shield);
        assert_eq!(fx.active().len(), 3);
        assert!(fx.slow_motion());
        assert!(fx.shield_active());
        assert_eq!(fx.point_multiplier(), 2);
    }

    #[test]
    fn test_expiry_reports_each_effect_once() {
        let mut fx = PowerupEffects::default();
        fx.activate(PowerupKind::Multiplier);
        fx.activate(PowerupKind::SlowMotion);

        let mut expired = Vec::new();
        for _ in 0..PRIMARY_POWERUP_FRAMES + 10 {
            expired.extend(fx.tick());
        }
        assert_eq!(expired, vec![PowerupKind::Multiplier, PowerupKind::SlowMotion]);
        assert_eq!(fx.point_multiplier(), 1);
        assert!(!fx.slow_motion());
    }

    #[test]
    fn test_consumed_shield_never_reports_expiry() {
        let mut fx = PowerupEffects::default();
        fx.activate(PowerupKind::Shield);
        fx.tick();
        assert!(fx.consume_shield());
        assert!(!fx.shield_active());
        assert!(!fx.consume_shield());

        for _ in 0..SHIELD_FRAMES {
            assert!(fx.tick().is_empty());
        }
    }

    #[test]
    fn test_extra_life_is_not_timed() {
        let mut fx = PowerupEffects::default();
        fx.activate(PowerupKind::ExtraLife);
        assert_eq!(fx, PowerupEffects::default());
        assert_eq!(PowerupKind::ExtraLife.expiry_message(), None);
    }

    #[test]
    fn test_powerup_floats_and_scrolls() {
        let mut p = Powerup::new(1, PowerupKind::Shield, Vec2::new(800.0, 100.0), Vec2::splat(40.0));
        for _ in 0..100 {
            p.update(1.0);
            assert!((p.pos.y - 100.0).abs() <= POWERUP_FLOAT_AMPLITUDE + 1e-3);
        }
        assert!((p.pos.x - 700.0).abs() < 1e-3);
        assert!(!p.is_off_screen());
    }

    proptest! {
        #[test]
        fn prop_choose_total(roll in 0.0f64..1.0, weights in proptest::array::uniform5(0.0f64..1.0)) {
            let kind = PowerupKind::choose(&weights, roll);
            prop_assert!(PowerupKind::ALL.contains(&kind));
        }
    }
}
