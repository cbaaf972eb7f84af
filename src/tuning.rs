//! Data-driven game balance
//!
//! Every probability, speed and size the simulation reads lives here so a
//! host can ship a JSON override without rebuilding. Missing fields fall
//! back to the stock balance.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::DEFAULT_VIEW_HEIGHT;
use crate::sim::spawn::gap_layout;
use crate::sim::state::floor_line;

/// Errors from loading or validating a tuning file
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("tuning JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be within [0, 1], got {value}")]
    Probability { field: &'static str, value: f64 },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },
    #[error("power-up weights must not be negative")]
    NegativeWeight,
    #[error("obstacle_gap {gap} leaves no room for whisks above a floor at {floor}")]
    GapTooTall { gap: f32, floor: f32 },
}

/// Game balance values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Player physics ===
    /// Downward acceleration added to velocity every frame
    pub gravity: f32,
    /// Velocity a flap sets (negative = upward)
    pub flap_power: f32,
    /// Fastest allowed ascent (magnitude)
    pub max_ascent_speed: f32,
    /// Fastest allowed fall
    pub terminal_velocity: f32,
    /// Frames before another flap is accepted
    pub flap_cooldown: u32,

    // === Player geometry ===
    pub player_width: f32,
    pub player_height: f32,
    pub player_start_x: f32,
    pub player_start_y: f32,

    // === World ===
    /// Horizontal scroll per frame
    pub scroll_speed: f32,
    /// Scroll multiplier while slow motion is active
    pub slow_motion_factor: f32,

    // === Collectibles ===
    pub collectible_width: f32,
    pub collectible_height: f32,
    pub collectible_spawn_rate: f64,
    /// Minimum gap between the right edge and the newest collectible
    pub collectible_spacing: f32,
    /// Chance a collectible lands in the upper ("challenging") half
    pub collectible_challenge_bias: f64,

    // === Obstacles ===
    pub obstacle_width: f32,
    pub obstacle_spawn_rate: f64,
    pub obstacle_spacing: f32,
    pub obstacle_gap: f32,

    // === Power-ups ===
    pub powerup_width: f32,
    pub powerup_height: f32,
    pub powerup_spawn_rate: f64,
    /// Selection weights in `PowerupKind::ALL` order
    pub powerup_weights: [f64; 5],
    /// Distance within which the magnet pulls collectibles
    pub magnet_range: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 0.05,
            flap_power: -2.3,
            max_ascent_speed: 6.0,
            terminal_velocity: 4.0,
            flap_cooldown: 3,

            player_width: 50.0,
            player_height: 50.0,
            player_start_x: 100.0,
            player_start_y: 200.0,

            scroll_speed: 0.8,
            slow_motion_factor: 0.5,

            collectible_width: 60.0,
            collectible_height: 80.0,
            collectible_spawn_rate: 0.008,
            collectible_spacing: 400.0,
            collectible_challenge_bias: 0.7,

            obstacle_width: 60.0,
            obstacle_spawn_rate: 0.003,
            obstacle_spacing: 500.0,
            obstacle_gap: 200.0,

            powerup_width: 40.0,
            powerup_height: 40.0,
            powerup_spawn_rate: 0.001,
            powerup_weights: [0.3, 0.3, 0.2, 0.1, 0.1],
            magnet_range: 200.0,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON override and validate it
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Check ranges the simulation relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        let probabilities = [
            ("collectible_spawn_rate", self.collectible_spawn_rate),
            ("collectible_challenge_bias", self.collectible_challenge_bias),
            ("obstacle_spawn_rate", self.obstacle_spawn_rate),
            ("powerup_spawn_rate", self.powerup_spawn_rate),
        ];
        for (field, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(TuningError::Probability { field, value });
            }
        }

        let sizes = [
            ("gravity", self.gravity),
            ("max_ascent_speed", self.max_ascent_speed),
            ("terminal_velocity", self.terminal_velocity),
            ("player_width", self.player_width),
            ("player_height", self.player_height),
            ("scroll_speed", self.scroll_speed),
            ("slow_motion_factor", self.slow_motion_factor),
            ("collectible_width", self.collectible_width),
            ("collectible_height", self.collectible_height),
            ("obstacle_width", self.obstacle_width),
            ("obstacle_gap", self.obstacle_gap),
            ("powerup_width", self.powerup_width),
            ("powerup_height", self.powerup_height),
            ("magnet_range", self.magnet_range),
        ];
        for (field, value) in sizes {
            if value.is_nan() || value <= 0.0 {
                return Err(TuningError::NonPositive { field, value });
            }
        }

        if self.powerup_weights.iter().any(|w| *w < 0.0) {
            return Err(TuningError::NegativeWeight);
        }

        let floor = floor_line(DEFAULT_VIEW_HEIGHT);
        if gap_layout(floor, self.obstacle_gap, 0.0).is_none() {
            return Err(TuningError::GapTooTall {
                gap: self.obstacle_gap,
                floor,
            });
        }

        Ok(())
    }

    /// Scroll distance for one frame
    pub fn effective_scroll(&self, slow_motion: bool) -> f32 {
        if slow_motion {
            self.scroll_speed * self.slow_motion_factor
        } else {
            self.scroll_speed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "gravity": 0.1, "obstacle_gap": 240 }"#).unwrap();
        assert_eq!(tuning.gravity, 0.1);
        assert_eq!(tuning.obstacle_gap, 240.0);
        assert_eq!(tuning.flap_power, Tuning::default().flap_power);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = Tuning::from_json(r#"{ "powerup_spawn_rate": 1.5 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::Probability {
                field: "powerup_spawn_rate",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_non_positive_size() {
        let err = Tuning::from_json(r#"{ "obstacle_gap": 0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::NonPositive { .. }));
    }

    #[test]
    fn test_rejects_gap_taller_than_the_view() {
        let err = Tuning::from_json(r#"{ "obstacle_gap": 400 }"#).unwrap_err();
        assert!(matches!(err, TuningError::GapTooTall { gap, floor } if gap == 400.0 && floor == 450.0));

        // 450 floor: whisks need 50 above, 50 below and a 50 margin
        assert!(Tuning::from_json(r#"{ "obstacle_gap": 299 }"#).is_ok());
        assert!(Tuning::from_json(r#"{ "obstacle_gap": 300 }"#).is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            Tuning::from_json("{ gravity: }"),
            Err(TuningError::Parse(_))
        ));
    }

    #[test]
    fn test_slow_motion_scroll() {
        let tuning = Tuning::default();
        assert_eq!(tuning.effective_scroll(false), 0.8);
        assert!((tuning.effective_scroll(true) - 0.4).abs() < 1e-6);
    }
}
