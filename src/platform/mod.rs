//! Platform layer
//!
//! [`FrameLoop`] is the host-side scheduler bookkeeping: it tracks the one
//! outstanding animation-frame request, turns timestamps into frame deltas
//! and holds the retry timer after a failed frame. It is plain data so the
//! rules can be tested off the browser; `web` wires it to the real APIs.

#[cfg(target_arch = "wasm32")]
pub mod web;

use thiserror::Error;

use crate::assets::AssetCache;
use crate::consts::{FRAME_MS, FRAME_RETRY_BACKOFF_MS, MAX_FRAME_DT_MS};
use crate::render::{Canvas, RenderError, RenderOptions, draw_frame};
use crate::sim::{GamePhase, GameState, SimError, tick};

/// A frame step failed; the loop backs off and retries
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("update failed: {0}")]
    Sim(#[from] SimError),
    #[error("draw failed: {0}")]
    Render(#[from] RenderError),
}

/// Advance the simulation by `dt_ms` and draw the result
pub fn step_frame<C: Canvas + ?Sized>(
    state: &mut GameState,
    canvas: &mut C,
    assets: &AssetCache,
    options: RenderOptions,
    dt_ms: f32,
) -> Result<(), FrameError> {
    tick(state, dt_ms)?;
    draw_frame(canvas, state, assets, options)?;
    Ok(())
}

/// Only a running game keeps requesting frames
pub fn wants_frames(phase: GamePhase) -> bool {
    phase == GamePhase::Playing
}

/// Animation-frame scheduling state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameLoop {
    /// Outstanding requestAnimationFrame handle
    pending: Option<i32>,
    /// Outstanding retry timeout handle
    retry: Option<i32>,
    last_time: Option<f64>,
    consecutive_failures: u32,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame or a retry is already on its way
    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some() || self.retry.is_some()
    }

    pub fn pending(&self) -> Option<i32> {
        self.pending
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether the host may issue a new frame request now
    pub fn can_request(&self) -> bool {
        !self.is_scheduled()
    }

    /// Record the handle of a newly issued request
    pub fn requested(&mut self, handle: i32) {
        debug_assert!(self.pending.is_none(), "second frame requested while one is pending");
        self.pending = Some(handle);
    }

    /// The requested frame fired. Returns the delta to simulate, in ms.
    pub fn frame_started(&mut self, time_ms: f64) -> f32 {
        self.pending = None;
        let dt = match self.last_time {
            Some(last) => ((time_ms - last) as f32).clamp(0.0, MAX_FRAME_DT_MS),
            None => FRAME_MS,
        };
        self.last_time = Some(time_ms);
        dt
    }

    pub fn frame_succeeded(&mut self) {
        self.consecutive_failures = 0;
    }

    /// A frame step failed. Returns the delay before the retry.
    pub fn frame_failed(&mut self) -> i32 {
        self.consecutive_failures += 1;
        FRAME_RETRY_BACKOFF_MS
    }

    pub fn retry_scheduled(&mut self, handle: i32) {
        self.retry = Some(handle);
    }

    /// Retry timer fired; the host requests a fresh frame next
    pub fn retry_fired(&mut self) {
        self.retry = None;
        self.last_time = None;
    }

    /// Stop the loop. Returns the frame and retry handles the host must cancel.
    pub fn cancel(&mut self) -> (Option<i32>, Option<i32>) {
        self.last_time = None;
        (self.pending.take(), self.retry.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingCanvas;
    use crate::sim::{Action, handle_action};
    use crate::tuning::Tuning;

    #[test]
    fn test_at_most_one_request_in_flight() {
        let mut frames = FrameLoop::new();
        assert!(frames.can_request());
        frames.requested(1);
        assert!(!frames.can_request());
        frames.frame_started(0.0);
        assert!(frames.can_request());
    }

    #[test]
    fn test_first_frame_uses_nominal_delta() {
        let mut frames = FrameLoop::new();
        frames.requested(1);
        assert_eq!(frames.frame_started(5000.0), FRAME_MS);
        frames.requested(2);
        assert_eq!(frames.frame_started(5016.0), 16.0);
    }

    #[test]
    fn test_long_gaps_are_clamped() {
        let mut frames = FrameLoop::new();
        frames.frame_started(0.0);
        assert_eq!(frames.frame_started(10_000.0), MAX_FRAME_DT_MS);
        // clock going backwards never produces a negative step
        assert_eq!(frames.frame_started(9_000.0), 0.0);
    }

    #[test]
    fn test_cancel_returns_handles_and_forgets_time() {
        let mut frames = FrameLoop::new();
        frames.frame_started(1000.0);
        frames.requested(7);
        assert_eq!(frames.cancel(), (Some(7), None));
        assert!(!frames.is_scheduled());
        // resumed loop does not see the paused interval
        assert_eq!(frames.frame_started(60_000.0), FRAME_MS);
    }

    #[test]
    fn test_failure_backoff_cycle() {
        let mut frames = FrameLoop::new();
        assert_eq!(frames.frame_failed(), FRAME_RETRY_BACKOFF_MS);
        frames.retry_scheduled(3);
        assert!(!frames.can_request());
        assert_eq!(frames.cancel(), (None, Some(3)));

        frames.frame_failed();
        frames.retry_scheduled(4);
        frames.retry_fired();
        assert!(frames.can_request());
        assert_eq!(frames.consecutive_failures(), 2);
        frames.frame_succeeded();
        assert_eq!(frames.consecutive_failures(), 0);
    }

    #[test]
    fn test_step_frame_reports_non_finite_state() {
        let mut state = GameState::new(5, 800.0, 600.0, Tuning::default());
        handle_action(&mut state, Action::Primary);
        let mut canvas = RecordingCanvas::new(800.0, 600.0);
        state.player.velocity_y = f32::NAN;

        let err = step_frame(
            &mut state,
            &mut canvas,
            &AssetCache::default(),
            RenderOptions::default(),
            FRAME_MS,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::Sim(_)));
        assert!(canvas.commands.is_empty());
    }

    #[test]
    fn test_step_frame_surfaces_draw_failures() {
        let mut state = GameState::new(5, 800.0, 600.0, Tuning::default());
        handle_action(&mut state, Action::Primary);
        let mut canvas = RecordingCanvas::new(800.0, 600.0);
        canvas.broken_images.insert(crate::assets::ImageKey::Background);

        let err = step_frame(
            &mut state,
            &mut canvas,
            &AssetCache::all_loaded(),
            RenderOptions::default(),
            FRAME_MS,
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::Render(_)));
        assert!(canvas.is_balanced());
    }

    #[test]
    fn test_only_playing_wants_frames() {
        assert!(wants_frames(GamePhase::Playing));
        assert!(!wants_frames(GamePhase::Paused));
        assert!(!wants_frames(GamePhase::GameOver));
        assert!(!wants_frames(GamePhase::Menu));
    }
}
