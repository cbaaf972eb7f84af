//! Drawing capability consumed by sprites and the frame pass

use glam::Vec2;
use thiserror::Error;

use crate::assets::ImageKey;

/// A drawing primitive failed on the host surface
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("canvas call `{op}` failed: {message}")]
    Backend { op: &'static str, message: String },
    #[error("image {0:?} is not registered with the canvas")]
    MissingImage(ImageKey),
}

/// RGBA colour; channels 0-255, alpha 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const GOLD: Color = Color::rgb(255, 215, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// From a packed `0xRRGGBB` value
    pub const fn hex(packed: u32) -> Self {
        Self::rgb(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
        )
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// CSS colour string accepted by `fillStyle`/`strokeStyle`
    pub fn to_css(self) -> String {
        format!("rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

/// Font request for `fill_text`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub size: f32,
    pub bold: bool,
    pub align: TextAlign,
}

impl Font {
    pub const fn new(size: f32) -> Self {
        Self {
            size,
            bold: false,
            align: TextAlign::Left,
        }
    }

    pub const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub const fn align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    /// CSS font shorthand
    pub fn to_css(self) -> String {
        if self.bold {
            format!("bold {}px Arial", self.size)
        } else {
            format!("{}px Arial", self.size)
        }
    }
}

/// 2D drawing surface.
///
/// Transform and alpha changes are only legal between `save` and `restore`;
/// use [`scoped`] so the pair is always balanced.
pub trait Canvas {
    fn width(&self) -> f32;
    fn height(&self) -> f32;

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32) -> Result<(), RenderError>;
    fn rotate(&mut self, angle: f32) -> Result<(), RenderError>;
    fn scale(&mut self, sx: f32, sy: f32) -> Result<(), RenderError>;
    /// Multiplies into subsequent fills (`globalAlpha`)
    fn set_alpha(&mut self, alpha: f32);

    fn clear(&mut self);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);
    fn fill_vertical_gradient(&mut self, x: f32, y: f32, w: f32, h: f32, top: Color, bottom: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), RenderError>;
    fn stroke_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        line_width: f32,
        color: Color,
    ) -> Result<(), RenderError>;
    fn fill_polygon(&mut self, points: &[Vec2], color: Color);
    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: Font,
        color: Color,
    ) -> Result<(), RenderError>;
    /// Draw a registered image stretched to the given box
    fn draw_image(&mut self, key: ImageKey, x: f32, y: f32, w: f32, h: f32) -> Result<(), RenderError>;
}

/// Run `f` inside a save/restore pair. Restores even when `f` fails.
pub fn scoped<C, F>(canvas: &mut C, f: F) -> Result<(), RenderError>
where
    C: Canvas + ?Sized,
    F: FnOnce(&mut C) -> Result<(), RenderError>,
{
    canvas.save();
    let result = f(canvas);
    canvas.restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_unpacks_channels() {
        let c = Color::hex(0xFF5500);
        assert_eq!((c.r, c.g, c.b), (255, 85, 0));
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_css_strings() {
        assert_eq!(Color::hex(0x00FFFF).with_alpha(0.3).to_css(), "rgba(0, 255, 255, 0.300)");
        assert_eq!(Font::new(24.0).bold().to_css(), "bold 24px Arial");
        assert_eq!(Font::new(14.0).to_css(), "14px Arial");
    }

    #[test]
    fn test_alpha_is_clamped() {
        assert_eq!(Color::WHITE.with_alpha(3.0).a, 1.0);
        assert_eq!(Color::WHITE.with_alpha(-1.0).a, 0.0);
    }
}
