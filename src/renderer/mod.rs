//! Pixel renderer for the face.
//!
//! The dial is drawn into an owned RGBA pixel buffer (`Canvas`) at watch
//! resolution. Output backends scale the canvas to their native format at
//! submission time; text is returned separately as positioned labels.

pub mod dial;

use palette::Srgb;

use crate::engine::trig::{int_to_fixed, FPoint, Fixed, FIX1};

/// Owned RGBA pixel buffer.
///
/// Internal format is 4 bytes per pixel in **RGBA** order.
pub struct Canvas {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0u8; width * height * 4],
            width,
            height,
        }
    }

    /// Resize the canvas, reallocating only when the buffer is too small.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        let needed = width * height * 4;
        if self.data.len() < needed {
            self.data.resize(needed, 0);
        }
    }

    /// Fill the whole canvas with one opaque color.
    pub fn clear(&mut self, color: Srgb<u8>) {
        let len = self.width * self.height * 4;
        for px in self.data[..len].chunks_exact_mut(4) {
            px.copy_from_slice(&[color.red, color.green, color.blue, 255]);
        }
    }

    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Srgb<u8>) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        self.data[idx] = color.red;
        self.data[idx + 1] = color.green;
        self.data[idx + 2] = color.blue;
        self.data[idx + 3] = 255;
    }

    /// Read the color at (x, y). Out-of-bounds reads are black.
    #[inline]
    pub fn get_pixel(&self, x: usize, y: usize) -> Srgb<u8> {
        let idx = (y * self.width + x) * 4;
        if x < self.width && idx + 3 < self.data.len() {
            Srgb::new(self.data[idx], self.data[idx + 1], self.data[idx + 2])
        } else {
            Srgb::new(0, 0, 0)
        }
    }

    /// Fill rows `top..bottom` across the full width.
    pub fn fill_rows(&mut self, top: i32, bottom: i32, color: Srgb<u8>) {
        self.fill_rect(0, top, self.width as i32, bottom - top, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Srgb<u8>) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i32);
        let y1 = (y + h).min(self.height as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.put_pixel(px, py, color);
            }
        }
    }

    /// Horizontal line across the full width.
    pub fn hline(&mut self, y: i32, color: Srgb<u8>) {
        self.fill_rows(y, y + 1, color);
    }

    /// Fill every pixel whose center lies inside the circle.
    pub fn fill_circle(&mut self, center: FPoint, radius: Fixed, color: Srgb<u8>) {
        if radius <= 0 {
            return;
        }
        let r2 = radius as i64 * radius as i64;
        let (x0, x1) = pixel_span(center.x - radius, center.x + radius, self.width);
        let (y0, y1) = pixel_span(center.y - radius, center.y + radius, self.height);
        for py in y0..y1 {
            let dy = (pixel_center(py) - center.y) as i64;
            for px in x0..x1 {
                let dx = (pixel_center(px) - center.x) as i64;
                if dx * dx + dy * dy <= r2 {
                    self.put_pixel(px, py, color);
                }
            }
        }
    }

    /// Fill a closed polygon with the even-odd rule, sampling pixel centers.
    pub fn fill_polygon(&mut self, points: &[FPoint], color: Srgb<u8>) {
        if points.len() < 3 {
            return;
        }
        let top = points.iter().map(|p| p.y).min().unwrap_or(0);
        let bottom = points.iter().map(|p| p.y).max().unwrap_or(0);
        let (y0, y1) = pixel_span(top, bottom, self.height);

        let mut crossings: Vec<Fixed> = Vec::with_capacity(points.len());
        for py in y0..y1 {
            let sy = pixel_center(py);
            crossings.clear();
            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                if (a.y <= sy) != (b.y <= sy) {
                    let t = (sy - a.y) as i64;
                    let x = a.x as i64 + (b.x - a.x) as i64 * t / (b.y - a.y) as i64;
                    crossings.push(x as Fixed);
                }
            }
            crossings.sort_unstable();
            for span in crossings.chunks_exact(2) {
                let (sx0, sx1) = pixel_span(span[0], span[1], self.width);
                for px in sx0..sx1 {
                    let cx = pixel_center(px);
                    if cx >= span[0] && cx < span[1] {
                        self.put_pixel(px, py, color);
                    }
                }
            }
        }
    }
}

#[inline]
fn pixel_center(p: i32) -> Fixed {
    int_to_fixed(p) + FIX1 / 2
}

/// Pixel range covering `lo..=hi` in fixed point, clipped to `0..limit`.
fn pixel_span(lo: Fixed, hi: Fixed, limit: usize) -> (i32, i32) {
    let start = (lo >> crate::engine::trig::FIXED_SHIFT).max(0);
    let end = ((hi >> crate::engine::trig::FIXED_SHIFT) + 1).min(limit as i32);
    (start, end)
}
