// src/plot/canvas.rs
use super::font::{glyph, text_width, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::core::Result;
use image::{Rgb, RgbImage};
use std::path::Path;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const GREY: Rgb<u8> = Rgb([136, 136, 136]);
pub const LIGHT_GREY: Rgb<u8> = Rgb([221, 221, 221]);
/// Positive contributions and high feature values.
pub const RED: Rgb<u8> = Rgb([255, 0, 81]);
/// Negative contributions and low feature values.
pub const BLUE: Rgb<u8> = Rgb([0, 139, 251]);

/// Linear blend from `BLUE` (t = 0) to `RED` (t = 1).
pub fn blue_to_red(t: f64) -> Rgb<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgb([mix(BLUE.0[0], RED.0[0]), mix(BLUE.0[1], RED.0[1]), mix(BLUE.0[2], RED.0[2])])
}

/// RGB drawing surface; every primitive clips to the image bounds.
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Canvas {
            image: RgbImage::from_pixel(width, height, WHITE),
        }
    }

    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u32) < self.image.width() && (y as u32) < self.image.height() {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let (xa, xb) = (x0.min(x1), x0.max(x1));
        let (ya, yb) = (y0.min(y1), y0.max(y1));
        let xa = xa.max(0);
        let ya = ya.max(0);
        let xb = xb.min(self.image.width() as i64 - 1);
        let yb = yb.min(self.image.height() as i64 - 1);
        for y in ya..=yb {
            for x in xa..=xb {
                self.image.put_pixel(x as u32, y as u32, color);
            }
        }
    }

    pub fn hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgb<u8>) {
        self.fill_rect(x0, y, x1, y, color);
    }

    pub fn vline(&mut self, x: i64, y0: i64, y1: i64, color: Rgb<u8>) {
        self.fill_rect(x, y0, x, y1, color);
    }

    pub fn dashed_vline(&mut self, x: i64, y0: i64, y1: i64, color: Rgb<u8>) {
        let (ya, yb) = (y0.min(y1), y0.max(y1));
        for y in ya..=yb {
            if (y - ya) % 8 < 4 {
                self.put(x, y, color);
            }
        }
    }

    pub fn dashed_hline(&mut self, x0: i64, x1: i64, y: i64, color: Rgb<u8>) {
        let (xa, xb) = (x0.min(x1), x0.max(x1));
        for x in xa..=xb {
            if (x - xa) % 6 < 2 {
                self.put(x, y, color);
            }
        }
    }

    pub fn dot(&mut self, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Draws `text` with its top-left corner at (x, y).
    pub fn text(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let s = scale as i64;
        for (i, c) in text.chars().enumerate() {
            let origin = x + i as i64 * GLYPH_ADVANCE as i64 * s;
            for (row, bits) in glyph(c).iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                        let px = origin + col as i64 * s;
                        let py = y + row as i64 * s;
                        self.fill_rect(px, py, px + s - 1, py + s - 1, color);
                    }
                }
            }
        }
    }

    /// Draws `text` right-aligned to `right`, vertically centered on `cy`.
    pub fn text_right(&mut self, right: i64, cy: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let w = text_width(text, scale) as i64;
        let h = (GLYPH_HEIGHT * scale) as i64;
        self.text(right - w, cy - h / 2, text, scale, color);
    }

    /// Draws `text` centered on (cx, cy).
    pub fn text_centered(&mut self, cx: i64, cy: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let w = text_width(text, scale) as i64;
        let h = (GLYPH_HEIGHT * scale) as i64;
        self.text(cx - w / 2, cy - h / 2, text, scale, color);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Maps data values in `[lo, hi]` onto pixel columns `[left, right]`.
#[derive(Debug, Clone, Copy)]
pub struct Scale {
    lo: f64,
    hi: f64,
    left: i64,
    right: i64,
}

impl Scale {
    /// Range covering `values` plus 5% padding on both sides.
    pub fn covering<I: IntoIterator<Item = f64>>(values: I, left: i64, right: i64) -> Self {
        let (mut lo, mut hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !lo.is_finite() || !hi.is_finite() {
            lo = -1.0;
            hi = 1.0;
        }
        if hi - lo < 1e-12 {
            lo -= 1.0;
            hi += 1.0;
        }
        let pad = (hi - lo) * 0.05;
        Scale {
            lo: lo - pad,
            hi: hi + pad,
            left,
            right,
        }
    }

    pub fn map(&self, value: f64) -> i64 {
        let t = (value - self.lo) / (self.hi - self.lo);
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
        self.left + (t * (self.right - self.left) as f64).round() as i64
    }

    pub fn lo(&self) -> f64 {
        self.lo
    }

    pub fn hi(&self) -> f64 {
        self.hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawing_outside_bounds_is_clipped() {
        let mut canvas = Canvas::new(10, 10);
        canvas.fill_rect(-5, -5, 20, 2, RED);
        canvas.dot(100, 100, 3, BLUE);
        canvas.text(8, 8, "0x1", 2, BLACK);
        assert_eq!(canvas.pixel(0, 0), RED);
        assert_eq!(canvas.pixel(9, 5), WHITE);
    }

    #[test]
    fn gradient_endpoints_are_palette_colors() {
        assert_eq!(blue_to_red(0.0), BLUE);
        assert_eq!(blue_to_red(1.0), RED);
        assert_eq!(blue_to_red(f64::NAN), blue_to_red(0.5));
    }

    #[test]
    fn scale_pads_and_orders() {
        let scale = Scale::covering(vec![0.0, 10.0], 100, 200);
        assert!(scale.lo() < 0.0 && scale.hi() > 10.0);
        assert!(scale.map(0.0) < scale.map(10.0));
        assert_eq!(scale.map(-1e9), 100);
        assert_eq!(scale.map(1e9), 200);
    }

    #[test]
    fn degenerate_range_is_widened() {
        let scale = Scale::covering(vec![3.0, 3.0], 0, 100);
        assert_eq!(scale.map(3.0), 50);
    }
}
