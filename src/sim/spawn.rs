//! Spawner policies
//!
//! Each frame rolls three independent Bernoulli trials. A successful roll
//! only attempts a spawn; spacing and interval gates can still refuse it.

use glam::Vec2;
use rand::Rng;

use super::powerup::{Powerup, PowerupKind};
use super::state::{GameState, MilkGlass, Whisk};
use crate::consts::{
    COLLECTIBLE_MARGIN, OBSTACLE_FLOOR_MARGIN, OBSTACLE_MIN_HEIGHT, OBSTACLE_SPAWN_INTERVAL_MS,
};

/// Vertical layout of one obstacle pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapLayout {
    pub top_height: f32,
    pub bottom_y: f32,
    pub bottom_height: f32,
}

/// Place the gap for a uniform `roll` in [0, 1).
///
/// Returns `None` when the viewport is too short to fit the gap with the
/// required margins.
pub fn gap_layout(floor_y: f32, gap: f32, roll: f32) -> Option<GapLayout> {
    let min_height = OBSTACLE_MIN_HEIGHT;
    let max_height = floor_y - gap - min_height - OBSTACLE_FLOOR_MARGIN;
    if max_height <= min_height {
        return None;
    }
    let top_height = (roll * (max_height - min_height)).floor() + min_height;
    let bottom_y = top_height + gap;
    Some(GapLayout {
        top_height,
        bottom_y,
        bottom_height: floor_y - bottom_y,
    })
}

/// Vertical position of a new collectible.
///
/// `band_roll < challenge_bias` puts it in the upper half of the allowed
/// band, otherwise the lower half; `pos_roll` places it inside that half.
pub fn glass_y(floor_y: f32, height: f32, challenge_bias: f64, band_roll: f64, pos_roll: f32) -> f32 {
    let min_y = COLLECTIBLE_MARGIN;
    let max_y = (floor_y - height - COLLECTIBLE_MARGIN).max(min_y);
    let half = (max_y - min_y) * 0.5;
    if band_roll < challenge_bias {
        min_y + pos_roll * half
    } else {
        min_y + half + pos_roll * half
    }
}

/// Run all three spawn rolls for this frame
pub fn run_spawners(state: &mut GameState) {
    if roll(state) < state.tuning.collectible_spawn_rate {
        try_spawn_glass(state);
    }
    if roll(state) < state.tuning.obstacle_spawn_rate {
        try_spawn_obstacle_pair(state);
    }
    if roll(state) < state.tuning.powerup_spawn_rate {
        try_spawn_powerup(state);
    }
}

#[inline]
fn roll(state: &mut GameState) -> f64 {
    state.rng.random::<f64>()
}

/// Spawn a collectible at the right edge if the newest one has moved far enough
pub fn try_spawn_glass(state: &mut GameState) -> bool {
    let spacing_ok = state
        .glasses
        .last()
        .is_none_or(|g| g.pos.x < state.width - state.tuning.collectible_spacing);
    if !spacing_ok {
        return false;
    }

    let band_roll = state.rng.random::<f64>();
    let pos_roll = state.rng.random::<f32>();
    let phase = state.rng.random::<f32>() * std::f32::consts::TAU;
    let y = glass_y(
        state.floor_y,
        state.tuning.collectible_height,
        state.tuning.collectible_challenge_bias,
        band_roll,
        pos_roll,
    );

    let id = state.next_entity_id();
    let size = Vec2::new(state.tuning.collectible_width, state.tuning.collectible_height);
    state
        .glasses
        .push(MilkGlass::new(id, Vec2::new(state.width, y), size, phase));
    log::debug!("Spawned glass {id} at y={y:.0}");
    true
}

/// Spawn an obstacle pair at the right edge.
///
/// Refused while the rightmost pair is still within the spacing distance or
/// less than the spawn interval has passed since the last pair.
pub fn try_spawn_obstacle_pair(state: &mut GameState) -> bool {
    let spacing_ok = state
        .whisks
        .iter()
        .map(|w| w.pos.x)
        .reduce(f32::max)
        .is_none_or(|x| x < state.width - state.tuning.obstacle_spacing);
    if !spacing_ok {
        return false;
    }
    if !obstacle_interval_elapsed(state) {
        return false;
    }

    let roll = state.rng.random::<f32>();
    let Some(layout) = gap_layout(state.floor_y, state.tuning.obstacle_gap, roll) else {
        log::debug!(
            "Viewport too short for an obstacle gap (floor {}, gap {})",
            state.floor_y,
            state.tuning.obstacle_gap
        );
        return false;
    };

    state.last_obstacle_spawn_ms = Some(state.clock_ms);
    let pair_id = state.next_entity_id();
    let width = state.tuning.obstacle_width;
    let x = state.width;

    let top = Whisk {
        id: state.next_entity_id(),
        pair_id,
        pos: Vec2::new(x, 0.0),
        size: Vec2::new(width, layout.top_height),
        top: true,
        counted: false,
    };
    let bottom = Whisk {
        id: state.next_entity_id(),
        pair_id,
        pos: Vec2::new(x, layout.bottom_y),
        size: Vec2::new(width, layout.bottom_height),
        top: false,
        counted: false,
    };
    state.whisks.push(top);
    state.whisks.push(bottom);
    log::debug!(
        "Spawned obstacle pair {pair_id}: gap {:.0}..{:.0}",
        layout.top_height,
        layout.bottom_y
    );
    true
}

fn obstacle_interval_elapsed(state: &GameState) -> bool {
    state
        .last_obstacle_spawn_ms
        .is_none_or(|last| state.clock_ms - last >= OBSTACLE_SPAWN_INTERVAL_MS)
}

/// Spawn a power-up of a weighted-random kind at the right edge.
///
/// The power-up always sits fully above the floor; a viewport too short to
/// hold one gets none.
pub fn try_spawn_powerup(state: &mut GameState) -> bool {
    let lowest = state.floor_y - state.tuning.powerup_height;
    if lowest < 0.0 {
        log::debug!("Viewport too short for a power-up (floor {})", state.floor_y);
        return false;
    }
    let y = (state.rng.random::<f32>() * (state.floor_y - 100.0).max(0.0) + 50.0).min(lowest);
    let kind = PowerupKind::choose(&state.tuning.powerup_weights, state.rng.random::<f64>());
    let id = state.next_entity_id();
    let size = Vec2::new(state.tuning.powerup_width, state.tuning.powerup_height);
    state
        .powerups
        .push(Powerup::new(id, kind, Vec2::new(state.width, y), size));
    log::debug!("Spawned {kind:?} power-up at y={y:.0}");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH};
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn state() -> GameState {
        GameState::new(11, DEFAULT_VIEW_WIDTH, DEFAULT_VIEW_HEIGHT, Tuning::default())
    }

    #[test]
    fn test_gap_layout_bounds() {
        // floor 450, gap 200: top heights in [50, 150)
        let low = gap_layout(450.0, 200.0, 0.0).unwrap();
        assert_eq!(low.top_height, 50.0);
        assert_eq!(low.bottom_y, 250.0);
        assert_eq!(low.bottom_height, 200.0);

        let high = gap_layout(450.0, 200.0, 0.999).unwrap();
        assert_eq!(high.top_height, 149.0);
    }

    #[test]
    fn test_gap_layout_rejects_short_viewport() {
        assert_eq!(gap_layout(300.0, 200.0, 0.5), None);
    }

    #[test]
    fn test_glass_y_bands() {
        // floor 450, height 80: band [50, 320], halves split at 185
        assert_eq!(glass_y(450.0, 80.0, 0.7, 0.1, 0.0), 50.0);
        assert_eq!(glass_y(450.0, 80.0, 0.7, 0.1, 1.0), 185.0);
        assert_eq!(glass_y(450.0, 80.0, 0.7, 0.9, 0.0), 185.0);
        assert_eq!(glass_y(450.0, 80.0, 0.7, 0.9, 1.0), 320.0);
    }

    #[test]
    fn test_glass_spacing_gate() {
        let mut s = state();
        assert!(try_spawn_glass(&mut s));
        assert!(!try_spawn_glass(&mut s));

        s.glasses[0].pos.x = DEFAULT_VIEW_WIDTH - s.tuning.collectible_spacing - 1.0;
        assert!(try_spawn_glass(&mut s));
        assert_eq!(s.glasses.len(), 2);
    }

    #[test]
    fn test_obstacle_pair_geometry() {
        let mut s = state();
        assert!(try_spawn_obstacle_pair(&mut s));
        assert_eq!(s.whisks.len(), 2);

        let (top, bottom) = (&s.whisks[0], &s.whisks[1]);
        assert!(top.top && !bottom.top);
        assert_eq!(top.pair_id, bottom.pair_id);
        assert_eq!(top.pos.x, bottom.pos.x);
        assert_eq!(top.pos.y, 0.0);
        assert_eq!(bottom.pos.y, top.size.y + s.tuning.obstacle_gap);
        assert_eq!(bottom.size.y, s.floor_y - bottom.pos.y);
    }

    #[test]
    fn test_obstacle_interval_gate() {
        let mut s = state();
        assert!(try_spawn_obstacle_pair(&mut s));
        // Clear the spacing gate; only the interval remains
        for w in &mut s.whisks {
            w.pos.x = 0.0;
        }
        s.clock_ms = OBSTACLE_SPAWN_INTERVAL_MS - 1.0;
        assert!(!try_spawn_obstacle_pair(&mut s));
        s.clock_ms = OBSTACLE_SPAWN_INTERVAL_MS;
        assert!(try_spawn_obstacle_pair(&mut s));
        assert_eq!(s.pair_count(), 2);
    }

    #[test]
    fn test_obstacle_spacing_uses_rightmost_pair() {
        let mut s = state();
        assert!(try_spawn_obstacle_pair(&mut s));
        s.clock_ms = 10_000.0;
        // Still at the right edge
        assert!(!try_spawn_obstacle_pair(&mut s));
    }

    #[test]
    fn test_powerup_spawns_at_right_edge() {
        let mut s = state();
        for _ in 0..50 {
            assert!(try_spawn_powerup(&mut s));
        }
        for p in &s.powerups {
            assert_eq!(p.pos.x, DEFAULT_VIEW_WIDTH);
            assert!(p.pos.y >= 50.0 && p.pos.y <= s.floor_y - 50.0);
        }
    }

    #[test]
    fn test_powerup_stays_above_a_low_floor() {
        let mut s = state();
        s.resize(DEFAULT_VIEW_WIDTH, 110.0);
        assert_eq!(s.floor_y, 82.0);
        for _ in 0..50 {
            assert!(try_spawn_powerup(&mut s));
        }
        for p in &s.powerups {
            assert!(p.pos.y + p.size.y <= s.floor_y);
        }

        s.resize(DEFAULT_VIEW_WIDTH, 40.0);
        assert!(!try_spawn_powerup(&mut s));
        assert_eq!(s.powerups.len(), 50);
    }

    proptest! {
        #[test]
        fn prop_gap_fits_above_floor(floor in 100.0f32..2000.0, gap in 10.0f32..400.0, roll in 0.0f32..1.0) {
            if let Some(layout) = gap_layout(floor, gap, roll) {
                prop_assert!(layout.top_height >= OBSTACLE_MIN_HEIGHT);
                prop_assert_eq!(layout.bottom_y, layout.top_height + gap);
                prop_assert_eq!(layout.bottom_height, floor - layout.bottom_y);
                prop_assert!(layout.bottom_height >= OBSTACLE_FLOOR_MARGIN);
            }
        }
    }
}
