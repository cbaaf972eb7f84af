//! Canvas that records commands instead of drawing
//!
//! Used by tests and by the native headless run.

use glam::Vec2;
use std::collections::HashSet;

use super::canvas::{Canvas, Color, Font, RenderError};
use crate::assets::ImageKey;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    Translate(f32, f32),
    Rotate(f32),
    Scale(f32, f32),
    Alpha(f32),
    Clear,
    Rect { x: f32, y: f32, w: f32, h: f32, color: Color },
    Gradient { top: Color, bottom: Color },
    Circle { center: Vec2, radius: f32, color: Color },
    Ring { center: Vec2, radius: f32, color: Color },
    Polygon { points: usize, color: Color },
    Text { text: String, x: f32, y: f32, font: Font, color: Color },
    Image { key: ImageKey, x: f32, y: f32, w: f32, h: f32 },
}

#[derive(Debug, Clone)]
pub struct RecordingCanvas {
    width: f32,
    height: f32,
    pub commands: Vec<DrawCommand>,
    depth: usize,
    max_depth: usize,
    unbalanced: bool,
    /// Images that fail when drawn
    pub broken_images: HashSet<ImageKey>,
}

impl RecordingCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
            depth: 0,
            max_depth: 0,
            unbalanced: false,
            broken_images: HashSet::new(),
        }
    }

    /// True when every save had a matching restore and no restore came first
    pub fn is_balanced(&self) -> bool {
        self.depth == 0 && !self.unbalanced
    }

    /// True if a transform or alpha change happened outside any save block
    pub fn has_unscoped_state_change(&self) -> bool {
        let mut depth = 0usize;
        for cmd in &self.commands {
            match cmd {
                DrawCommand::Save => depth += 1,
                DrawCommand::Restore => depth = depth.saturating_sub(1),
                DrawCommand::Translate(..)
                | DrawCommand::Rotate(_)
                | DrawCommand::Scale(..)
                | DrawCommand::Alpha(_)
                    if depth == 0 =>
                {
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn has_text(&self, needle: &str) -> bool {
        self.texts().any(|t| t.contains(needle))
    }

    pub fn images(&self) -> impl Iterator<Item = ImageKey> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Image { key, .. } => Some(*key),
            _ => None,
        })
    }

    pub fn reset(&mut self) {
        self.commands.clear();
        self.depth = 0;
        self.max_depth = 0;
        self.unbalanced = false;
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn save(&mut self) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        if self.depth == 0 {
            self.unbalanced = true;
        } else {
            self.depth -= 1;
        }
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, x: f32, y: f32) -> Result<(), RenderError> {
        self.commands.push(DrawCommand::Translate(x, y));
        Ok(())
    }

    fn rotate(&mut self, angle: f32) -> Result<(), RenderError> {
        self.commands.push(DrawCommand::Rotate(angle));
        Ok(())
    }

    fn scale(&mut self, sx: f32, sy: f32) -> Result<(), RenderError> {
        self.commands.push(DrawCommand::Scale(sx, sy));
        Ok(())
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::Alpha(alpha));
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.commands.push(DrawCommand::Rect { x, y, w, h, color });
    }

    fn fill_vertical_gradient(&mut self, _x: f32, _y: f32, _w: f32, _h: f32, top: Color, bottom: Color) {
        self.commands.push(DrawCommand::Gradient { top, bottom });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), RenderError> {
        self.commands.push(DrawCommand::Circle { center, radius, color });
        Ok(())
    }

    fn stroke_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        _line_width: f32,
        color: Color,
    ) -> Result<(), RenderError> {
        self.commands.push(DrawCommand::Ring { center, radius, color });
        Ok(())
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            points: points.len(),
            color,
        });
    }

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: Font,
        color: Color,
    ) -> Result<(), RenderError> {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            y,
            font,
            color,
        });
        Ok(())
    }

    fn draw_image(&mut self, key: ImageKey, x: f32, y: f32, w: f32, h: f32) -> Result<(), RenderError> {
        if self.broken_images.contains(&key) {
            return Err(RenderError::Backend {
                op: "drawImage",
                message: format!("{key:?} is broken"),
            });
        }
        self.commands.push(DrawCommand::Image { key, x, y, w, h });
        Ok(())
    }
}
