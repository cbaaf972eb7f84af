//! Collision detection and scoring math
//!
//! Every entity collides as an axis-aligned box. Touching edges do not
//! count: all four comparisons are strict.

use glam::Vec2;

use crate::consts::{BASE_POINTS, MAX_STREAK_MULTIPLIER, STREAK_STEP};

/// Axis-aligned rectangle (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.pos.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// True iff the rectangles share interior area
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

/// Streak bonus applied to a pickup: floor(streak / 3) capped at 5.
///
/// Returns 1 below the first step so the result can always be multiplied in.
pub fn streak_multiplier(streak: u32) -> u32 {
    if streak < STREAK_STEP {
        1
    } else {
        (streak / STREAK_STEP).min(MAX_STREAK_MULTIPLIER)
    }
}

/// Points for one pickup at the given streak (already incremented)
pub fn collectible_points(streak: u32, point_multiplier: u32) -> u64 {
    BASE_POINTS * streak_multiplier(streak) as u64 * point_multiplier.max(1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_touching_edges_do_not_collide() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&Rect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(0.0, 10.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(-10.0, 0.0, 10.0, 10.0)));
        assert!(!a.overlaps(&Rect::new(0.0, -10.0, 10.0, 10.0)));
    }

    #[test]
    fn test_separated_on_one_axis() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Overlaps horizontally, clear vertically
        assert!(!a.overlaps(&Rect::new(2.0, 30.0, 5.0, 5.0)));
    }

    #[test]
    fn test_streak_multiplier_table() {
        assert_eq!(streak_multiplier(0), 1);
        assert_eq!(streak_multiplier(1), 1);
        assert_eq!(streak_multiplier(2), 1);
        assert_eq!(streak_multiplier(3), 1);
        assert_eq!(streak_multiplier(5), 1);
        assert_eq!(streak_multiplier(6), 2);
        assert_eq!(streak_multiplier(8), 2);
        assert_eq!(streak_multiplier(10), 3);
        assert_eq!(streak_multiplier(14), 4);
        assert_eq!(streak_multiplier(15), 5);
        assert_eq!(streak_multiplier(99), 5);
    }

    #[test]
    fn test_points_at_streak_ten() {
        assert_eq!(collectible_points(10, 1), 15);
    }

    #[test]
    fn test_points_with_powerup() {
        assert_eq!(collectible_points(1, 2), 10);
        assert_eq!(collectible_points(6, 2), 20);
    }

    proptest! {
        #[test]
        fn prop_multiplier_bounded(streak in 0u32..10_000) {
            let m = streak_multiplier(streak);
            prop_assert!((1..=MAX_STREAK_MULTIPLIER).contains(&m));
            if streak >= 15 {
                prop_assert_eq!(m, MAX_STREAK_MULTIPLIER);
            }
        }

        #[test]
        fn prop_overlap_is_symmetric(
            ax in -100.0f32..100.0, ay in -100.0f32..100.0,
            bx in -100.0f32..100.0, by in -100.0f32..100.0,
            w in 1.0f32..50.0, h in 1.0f32..50.0,
        ) {
            let a = Rect::new(ax, ay, w, h);
            let b = Rect::new(bx, by, h, w);
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }
}
