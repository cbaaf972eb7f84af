//! Browser bindings: storage, the DOM HUD and the Canvas2D surface

use std::collections::HashMap;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, Storage,
};

use crate::assets::ImageKey;
use crate::leaderboard::LeaderboardEntry;
use crate::render::{Canvas, Color, Font, RenderError};
use crate::ui::{Hud, leaderboard_rows};

/// LocalStorage, if the page may use it
pub fn local_storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok()?
}

pub fn document() -> Option<Document> {
    web_sys::window()?.document()
}

fn backend(op: &'static str) -> impl Fn(JsValue) -> RenderError {
    move |e| RenderError::Backend {
        op,
        message: format!("{e:?}"),
    }
}

// === HUD ===

/// HUD backed by the page's overlay elements
pub struct DomHud {
    document: Document,
    message_timeout: Option<i32>,
}

impl DomHud {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            message_timeout: None,
        }
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Some(el) = self.document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_display(&self, id: &str, display: &str) {
        set_display(&self.document, id, display);
    }

    /// Hide the game-over and leaderboard panels when a run restarts
    pub fn hide_panels(&self) {
        self.set_display("game-over", "none");
        self.set_display("leaderboard", "none");
    }

    /// Swap the pause button glyph and the replay button with the phase
    pub fn show_paused(&self, paused: bool) {
        self.set_text("pause-btn", if paused { "\u{25B6}" } else { "\u{23F8}" });
        self.set_display("replay-btn", if paused { "inline-block" } else { "none" });
    }
}

pub fn set_display(document: &Document, id: &str, display: &str) {
    if let Some(el) = document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    {
        let _ = el.style().set_property("display", display);
    }
}

fn cell(document: &Document, class: &str, text: &str) -> Option<Element> {
    let el = document.create_element("div").ok()?;
    el.set_class_name(class);
    el.set_text_content(Some(text));
    Some(el)
}

impl Hud for DomHud {
    fn update_score(&mut self, score: u64) {
        self.set_text("score", &score.to_string());
    }

    fn update_lives(&mut self, lives: u32) {
        self.set_text("lives", &lives.to_string());
    }

    fn show_message(&mut self, text: &str, duration_ms: u32) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(handle) = self.message_timeout.take() {
            window.clear_timeout_with_handle(handle);
        }
        if self.document.get_element_by_id("message-container").is_none() {
            log::info!("Message: {text}");
            return;
        }

        self.set_text("message", text);
        self.set_display("message-container", "flex");

        let document = self.document.clone();
        let hide = Closure::once(move || set_display(&document, "message-container", "none"));
        match window.set_timeout_with_callback_and_timeout_and_arguments_0(
            hide.as_ref().unchecked_ref(),
            duration_ms as i32,
        ) {
            Ok(handle) => self.message_timeout = Some(handle),
            Err(e) => log::warn!("Could not schedule message hide: {e:?}"),
        }
        hide.forget();
    }

    fn show_game_over(&mut self, score: u64) {
        self.set_text("final-score", &score.to_string());
        self.set_display("game-over", "flex");
    }

    fn show_leaderboard(&mut self, entries: &[LeaderboardEntry]) {
        let Some(list) = self.document.get_element_by_id("leaderboard-list") else {
            log::error!("Leaderboard elements not found");
            return;
        };
        list.set_text_content(None);

        let rows = std::iter::once(("Rank".to_string(), "Player".to_string(), "Score".to_string()))
            .chain(
                leaderboard_rows(entries)
                    .into_iter()
                    .map(|(rank, name, score)| (rank.to_string(), name, score.to_string())),
            );
        for (i, (rank, name, score)) in rows.enumerate() {
            let Ok(row) = self.document.create_element("div") else {
                continue;
            };
            row.set_class_name(if i == 0 { "leaderboard-row header" } else { "leaderboard-row" });
            for (class, text) in [("rank", &rank), ("email", &name), ("score", &score)] {
                if let Some(c) = cell(&self.document, class, text) {
                    let _ = row.append_child(&c);
                }
            }
            let _ = list.append_child(&row);
        }
        self.set_display("leaderboard", "flex");
    }
}

// === Canvas2D ===

/// [`Canvas`] over a `CanvasRenderingContext2d`
pub struct WebCanvas {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    images: HashMap<ImageKey, HtmlImageElement>,
}

impl WebCanvas {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, RenderError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(backend("getContext"))?
            .ok_or_else(|| RenderError::Backend {
                op: "getContext",
                message: "2d context unavailable".into(),
            })?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RenderError::Backend {
                op: "getContext",
                message: "not a 2d context".into(),
            })?;
        Ok(Self {
            canvas,
            ctx,
            images: HashMap::new(),
        })
    }

    pub fn register_image(&mut self, key: ImageKey, image: HtmlImageElement) {
        self.images.insert(key, image);
    }

    /// Match the backing store to the element's layout size
    pub fn fit_to_container(&self) -> (f32, f32) {
        let (w, h) = (self.canvas.client_width(), self.canvas.client_height());
        if w > 0 && h > 0 {
            self.canvas.set_width(w as u32);
            self.canvas.set_height(h as u32);
        }
        (self.width(), self.height())
    }

    fn arc_path(&self, center: Vec2, radius: f32) -> Result<(), RenderError> {
        self.ctx.begin_path();
        self.ctx
            .arc(
                center.x as f64,
                center.y as f64,
                radius.max(0.0) as f64,
                0.0,
                std::f64::consts::TAU,
            )
            .map_err(backend("arc"))
    }
}

impl Canvas for WebCanvas {
    fn width(&self) -> f32 {
        self.canvas.width() as f32
    }

    fn height(&self) -> f32 {
        self.canvas.height() as f32
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, x: f32, y: f32) -> Result<(), RenderError> {
        self.ctx.translate(x as f64, y as f64).map_err(backend("translate"))
    }

    fn rotate(&mut self, angle: f32) -> Result<(), RenderError> {
        self.ctx.rotate(angle as f64).map_err(backend("rotate"))
    }

    fn scale(&mut self, sx: f32, sy: f32) -> Result<(), RenderError> {
        self.ctx.scale(sx as f64, sy as f64).map_err(backend("scale"))
    }

    fn set_alpha(&mut self, alpha: f32) {
        let current = self.ctx.global_alpha();
        self.ctx.set_global_alpha(current * alpha.clamp(0.0, 1.0) as f64);
    }

    fn clear(&mut self) {
        self.ctx
            .clear_rect(0.0, 0.0, self.width() as f64, self.height() as f64);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.fill_rect(x as f64, y as f64, w as f64, h as f64);
    }

    fn fill_vertical_gradient(&mut self, x: f32, y: f32, w: f32, h: f32, top: Color, bottom: Color) {
        let gradient = self
            .ctx
            .create_linear_gradient(x as f64, y as f64, x as f64, (y + h) as f64);
        if gradient.add_color_stop(0.0, &top.to_css()).is_err()
            || gradient.add_color_stop(1.0, &bottom.to_css()).is_err()
        {
            self.fill_rect(x, y, w, h, top);
            return;
        }
        self.ctx.set_fill_style_canvas_gradient(&gradient);
        self.ctx.fill_rect(x as f64, y as f64, w as f64, h as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) -> Result<(), RenderError> {
        self.arc_path(center, radius)?;
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.fill();
        Ok(())
    }

    fn stroke_circle(
        &mut self,
        center: Vec2,
        radius: f32,
        line_width: f32,
        color: Color,
    ) -> Result<(), RenderError> {
        self.arc_path(center, radius)?;
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(line_width as f64);
        self.ctx.stroke();
        Ok(())
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.ctx.begin_path();
        self.ctx.move_to(first.x as f64, first.y as f64);
        for p in rest {
            self.ctx.line_to(p.x as f64, p.y as f64);
        }
        self.ctx.close_path();
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.fill();
    }

    fn fill_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: Font,
        color: Color,
    ) -> Result<(), RenderError> {
        self.ctx.set_font(&font.to_css());
        self.ctx.set_text_align(font.align.as_str());
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_text(text, x as f64, y as f64)
            .map_err(backend("fillText"))
    }

    fn draw_image(&mut self, key: ImageKey, x: f32, y: f32, w: f32, h: f32) -> Result<(), RenderError> {
        let image = self.images.get(&key).ok_or(RenderError::MissingImage(key))?;
        self.ctx
            .draw_image_with_html_image_element_and_dw_and_dh(
                image, x as f64, y as f64, w as f64, h as f64,
            )
            .map_err(backend("drawImage"))
    }
}
