//! Per-frame visual effects for the frame-loop encoder.
//!
//! Effects are pure functions over [`image::RgbImage`] so they can be tested
//! without a video backend. The frame writer converts decoded frames into
//! `RgbImage` before calling [`apply_effects`].

use image::RgbImage;

use sitesense_models::{ObjectLabels, LABEL_ANIMAL, LABEL_CAR, LABEL_PERSON};

/// Blend weight kept from the original frame when tinting.
const TINT_KEEP: f32 = 0.95;
/// Blend weight of the flat tint overlay.
const TINT_MIX: f32 = 0.05;
/// Channel value of the tint overlay.
const TINT_VALUE: f32 = 20.0;

/// Inset of the border rectangle from the frame edge, in pixels.
const BORDER_MARGIN: u32 = 5;
/// Stroke width of the border rectangle.
const BORDER_WIDTH: u32 = 2;

/// Top-left anchor of the watermark.
const WATERMARK_ORIGIN: (u32, u32) = (20, 20);
/// Integer upscale factor applied to the 5x7 glyph grid.
const WATERMARK_SCALE: u32 = 3;
/// Horizontal gap between glyphs, in unscaled columns.
const GLYPH_GAP: u32 = 1;

const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;

const WATERMARK_TEXT: &str = "PROCESSED";

/// RGB channel index, named to keep tint call sites readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

/// Apply the canonical effect stack for a label set, in a fixed order:
/// person tint, car border, animal tint, then the watermark on every frame.
pub fn apply_effects(frame: &mut RgbImage, labels: &ObjectLabels) {
    if labels.contains(LABEL_PERSON) {
        apply_tint(frame, Channel::Blue);
    }
    if labels.contains(LABEL_CAR) {
        draw_border(frame, [255, 0, 0]);
    }
    if labels.contains(LABEL_ANIMAL) {
        apply_tint(frame, Channel::Green);
    }
    draw_watermark(frame);
}

/// Blend a flat single-channel overlay into the frame.
///
/// Every channel is scaled by the keep weight; the tinted channel
/// additionally receives the overlay contribution. This mirrors a weighted
/// sum against an overlay image that is zero everywhere except one channel.
pub fn apply_tint(frame: &mut RgbImage, channel: Channel) {
    let tinted = channel as usize;
    let boost = TINT_MIX * TINT_VALUE;

    for pixel in frame.pixels_mut() {
        for (i, value) in pixel.0.iter_mut().enumerate() {
            let mut blended = *value as f32 * TINT_KEEP;
            if i == tinted {
                blended += boost;
            }
            *value = blended.round().min(255.0) as u8;
        }
    }
}

/// Draw a rectangular border inset from the frame edge.
///
/// Frames too small to hold the inset rectangle are left untouched.
pub fn draw_border(frame: &mut RgbImage, color: [u8; 3]) {
    let (width, height) = frame.dimensions();
    let needed = 2 * (BORDER_MARGIN + BORDER_WIDTH);
    if width <= needed || height <= needed {
        return;
    }

    let x0 = BORDER_MARGIN;
    let y0 = BORDER_MARGIN;
    let x1 = width - BORDER_MARGIN - 1;
    let y1 = height - BORDER_MARGIN - 1;

    for offset in 0..BORDER_WIDTH {
        for x in x0..=x1 {
            frame.put_pixel(x, y0 + offset, image::Rgb(color));
            frame.put_pixel(x, y1 - offset, image::Rgb(color));
        }
        for y in y0..=y1 {
            frame.put_pixel(x0 + offset, y, image::Rgb(color));
            frame.put_pixel(x1 - offset, y, image::Rgb(color));
        }
    }
}

/// Stamp the white "PROCESSED" watermark near the top-left corner.
///
/// Uses a built-in 5x7 glyph set so the frame-loop path has no font
/// dependency. Glyph pixels outside the frame are skipped.
pub fn draw_watermark(frame: &mut RgbImage) {
    let (origin_x, origin_y) = WATERMARK_ORIGIN;
    let advance = (GLYPH_COLS + GLYPH_GAP) * WATERMARK_SCALE;

    for (index, ch) in WATERMARK_TEXT.chars().enumerate() {
        let Some(rows) = glyph(ch) else { continue };
        let glyph_x = origin_x + index as u32 * advance;

        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_COLS {
                if bits & (1 << (GLYPH_COLS - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..WATERMARK_SCALE {
                    for dx in 0..WATERMARK_SCALE {
                        let x = glyph_x + col * WATERMARK_SCALE + dx;
                        let y = origin_y + row as u32 * WATERMARK_SCALE + dy;
                        if x < frame.width() && y < frame.height() {
                            frame.put_pixel(x, y, image::Rgb([255, 255, 255]));
                        }
                    }
                }
            }
        }
    }
}

/// Bounding box of the watermark as (x, y, width, height).
///
/// Lets tests assert that frames are untouched outside the stamped region.
pub fn watermark_bounds() -> (u32, u32, u32, u32) {
    let chars = WATERMARK_TEXT.chars().count() as u32;
    let advance = (GLYPH_COLS + GLYPH_GAP) * WATERMARK_SCALE;
    (
        WATERMARK_ORIGIN.0,
        WATERMARK_ORIGIN.1,
        chars * advance,
        GLYPH_ROWS * WATERMARK_SCALE,
    )
}

/// 5x7 row bitmaps for the letters of the watermark text, MSB = left column.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'P' => [
            0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000,
        ],
        'R' => [
            0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001,
        ],
        'O' => [
            0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110,
        ],
        'C' => [
            0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110,
        ],
        'E' => [
            0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111,
        ],
        'S' => [
            0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110,
        ],
        'D' => [
            0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110,
        ],
        _ => return None,
    };
    Some(rows)
}
