//! Canvas2D rendering
//!
//! Drawing goes through the [`Canvas`] capability so the frame pass runs the
//! same against the browser canvas and the recording canvas used in tests.

pub mod canvas;
pub mod recording;
pub mod scene;
pub mod sprites;

pub use canvas::{Canvas, Color, Font, RenderError, TextAlign, scoped};
pub use recording::{DrawCommand, RecordingCanvas};
pub use scene::{RenderOptions, draw_frame};
