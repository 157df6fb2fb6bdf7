//! Sprite decoding and half-block cell rendering.
//!
//! Sprites arrive as PNG bytes from the sprite host and are decoded once
//! into an RGBA buffer. Rendering samples two vertical pixels per terminal
//! cell (`▀` with foreground = top pixel, background = bottom pixel), which
//! keeps the image roughly square on a 2:1 terminal cell.

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use serde::{Deserialize, Serialize};

const ALPHA_CUTOFF: u8 = 128;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteImage {
    pub width: u32,
    pub height: u32,
    rgba: Vec<u8>,
}

pub fn decode_sprite(bytes: &[u8]) -> Result<SpriteImage, String> {
    let image = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = image.to_rgba8();
    Ok(SpriteImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

impl SpriteImage {
    /// Largest cell grid inside `max_cols` x `max_rows` that preserves the
    /// image aspect, assuming one cell shows a 1x2 pixel column.
    pub fn fit(&self, max_cols: u16, max_rows: u16) -> (u16, u16) {
        if max_cols == 0 || max_rows == 0 || self.width == 0 || self.height == 0 {
            return (max_cols.max(1), max_rows.max(1));
        }
        let ratio = self.width as f32 / self.height as f32;
        let cols_for_max_rows = ratio * (max_rows as f32) * 2.0;
        if cols_for_max_rows <= max_cols as f32 {
            return ((cols_for_max_rows.round() as u16).max(1), max_rows);
        }
        let rows_for_max_cols = (max_cols as f32) / (ratio * 2.0);
        (max_cols, (rows_for_max_cols.round() as u16).clamp(1, max_rows))
    }

    /// Renders the sprite into `cols` x `rows` half-block cells with nearest
    /// sampling. Fully transparent cells stay unstyled.
    pub fn to_text(&self, cols: u16, rows: u16) -> Text<'static> {
        if cols == 0 || rows == 0 || self.width == 0 || self.height == 0 {
            return Text::default();
        }
        let mut lines = Vec::with_capacity(rows as usize);
        for row in 0..rows {
            let mut spans = Vec::with_capacity(cols as usize);
            for col in 0..cols {
                let top = self.sample(col, row * 2, cols, rows * 2);
                let bottom = self.sample(col, row * 2 + 1, cols, rows * 2);
                spans.push(half_block(top, bottom));
            }
            lines.push(Line::from(spans));
        }
        Text::from(lines)
    }

    fn sample(&self, x: u16, y: u16, grid_w: u16, grid_h: u16) -> Option<Color> {
        let sx = (x as u32 * self.width) / grid_w as u32;
        let sy = (y as u32 * self.height) / grid_h as u32;
        let offset = ((sy * self.width + sx) * 4) as usize;
        let pixel = self.rgba.get(offset..offset + 4)?;
        if pixel[3] < ALPHA_CUTOFF {
            return None;
        }
        Some(Color::Rgb(pixel[0], pixel[1], pixel[2]))
    }
}

fn half_block(top: Option<Color>, bottom: Option<Color>) -> Span<'static> {
    match (top, bottom) {
        (Some(top), Some(bottom)) => {
            Span::styled("▀", Style::default().fg(top).bg(bottom))
        }
        (Some(top), None) => Span::styled("▀", Style::default().fg(top)),
        (None, Some(bottom)) => Span::styled("▄", Style::default().fg(bottom)),
        (None, None) => Span::raw(" "),
    }
}
