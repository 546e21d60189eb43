//! CPU raster implementation of [`DrawSurface`].
//!
//! Pixels are kept as premultiplied float RGBA and composited source-over,
//! so layered glows accumulate without 8-bit banding. Shapes get one pixel
//! of analytic anti-aliasing. The buffer is quantized on the way out, either
//! to an [`RgbaImage`] for PNG export or to premultiplied RGBA8 bytes for
//! texture upload.

use std::path::Path;

use glam::{Affine2, Vec2, Vec4};
use image::{Rgba, RgbaImage};

use crate::error::SurfaceError;
use crate::surface::{check_extent, check_point, premultiply, unpremultiply, DrawSurface, Paint};

/// 3x5 bitmap glyphs for the digits, one `u8` per row, high bit on the left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b001, 0b001, 0b001],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Glyph cap height relative to the font size.
const CAP_HEIGHT: f32 = 0.7;
/// Monospace advance relative to the font size.
const ADVANCE: f32 = 0.6;

/// An offscreen RGBA canvas.
pub struct Canvas {
    width: u32,
    height: u32,
    /// Premultiplied RGBA, row-major.
    pixels: Vec<Vec4>,
    transform: Affine2,
    stack: Vec<Affine2>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; width as usize * height as usize],
            transform: Affine2::IDENTITY,
            stack: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Premultiplied colour of a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Vec4> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// The raw premultiplied buffer.
    pub fn pixels(&self) -> &[Vec4] {
        &self.pixels
    }

    /// Whether every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| p.w <= 0.0)
    }

    /// Quantize to a straight-alpha image.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let c = unpremultiply(self.pixels[(y * self.width + x) as usize]);
            Rgba([quantize(c.x), quantize(c.y), quantize(c.z), quantize(c.w)])
        })
    }

    /// Write the canvas as a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.to_image().save(path)
    }

    /// Quantize to premultiplied RGBA8, reusing `out`.
    pub fn write_premultiplied_rgba8(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.pixels.len() * 4);
        for p in &self.pixels {
            out.extend_from_slice(&[quantize(p.x), quantize(p.y), quantize(p.z), quantize(p.w)]);
        }
    }

    /// Composite `paint` over every pixel whose centre maps into the local
    /// bounds, weighted by `coverage` evaluated in local space.
    fn cover<F>(&mut self, local_min: Vec2, local_max: Vec2, paint: &Paint<'_>, coverage: F)
    where
        F: Fn(Vec2) -> f32,
    {
        if self.width == 0 || self.height == 0 {
            return;
        }

        let corners = [
            local_min,
            Vec2::new(local_max.x, local_min.y),
            local_max,
            Vec2::new(local_min.x, local_max.y),
        ];
        let mut device_min = Vec2::splat(f32::INFINITY);
        let mut device_max = Vec2::splat(f32::NEG_INFINITY);
        for corner in corners {
            let d = self.transform.transform_point2(corner);
            device_min = device_min.min(d);
            device_max = device_max.max(d);
        }

        // Saturating casts clip anything off-canvas to an empty range
        let x0 = (device_min.x - 1.0).floor().max(0.0) as u32;
        let y0 = (device_min.y - 1.0).floor().max(0.0) as u32;
        let x1 = ((device_max.x + 1.0).ceil().min(self.width as f32)) as u32;
        let y1 = ((device_max.y + 1.0).ceil().min(self.height as f32)) as u32;

        let inverse = self.transform.inverse();
        for y in y0..y1 {
            for x in x0..x1 {
                let local = inverse.transform_point2(Vec2::new(x as f32 + 0.5, y as f32 + 0.5));
                let cov = coverage(local);
                if cov <= 0.0 {
                    continue;
                }
                let src = premultiply(paint.sample(local)) * cov;
                if src.w <= 0.0 {
                    continue;
                }
                let dst = &mut self.pixels[(y * self.width + x) as usize];
                *dst = src + *dst * (1.0 - src.w);
            }
        }
    }
}

impl DrawSurface for Canvas {
    fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![Vec4::ZERO; width as usize * height as usize];
        self.transform = Affine2::IDENTITY;
        self.stack.clear();
    }

    fn clear(&mut self) {
        self.pixels.fill(Vec4::ZERO);
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
    }

    fn restore(&mut self) -> Result<(), SurfaceError> {
        self.transform = self.stack.pop().ok_or(SurfaceError::UnbalancedRestore)?;
        Ok(())
    }

    fn translate(&mut self, offset: Vec2) {
        self.transform = self.transform * Affine2::from_translation(offset);
    }

    fn rotate(&mut self, angle: f32) {
        self.transform = self.transform * Affine2::from_angle(angle);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint<'_>) -> Result<(), SurfaceError> {
        check_point(center, "circle center")?;
        check_extent(radius, "circle radius")?;
        paint.validate()?;

        let reach = Vec2::splat(radius);
        self.cover(center - reach, center + reach, &paint, |p| {
            (radius + 0.5 - p.distance(center)).clamp(0.0, 1.0)
        });
        Ok(())
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, paint: Paint<'_>) -> Result<(), SurfaceError> {
        check_point(origin, "rect origin")?;
        check_point(size, "rect size")?;
        paint.validate()?;

        let min = origin.min(origin + size);
        let max = origin.max(origin + size);
        let extent = max - min;
        self.cover(min, max, &paint, |p| {
            let cx = (p.x - min.x + 0.5).min(max.x - p.x + 0.5).min(extent.x).clamp(0.0, 1.0);
            let cy = (p.y - min.y + 0.5).min(max.y - p.y + 0.5).min(extent.y).clamp(0.0, 1.0);
            cx * cy
        });
        Ok(())
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint<'_>) -> Result<(), SurfaceError> {
        check_point(from, "line start")?;
        check_point(to, "line end")?;
        check_extent(width, "line width")?;
        paint.validate()?;

        let half = width * 0.5;
        let axis = to - from;
        let len_sq = axis.length_squared();
        let pad = Vec2::splat(half);
        self.cover(from.min(to) - pad, from.max(to) + pad, &paint, |p| {
            let t = if len_sq > 0.0 {
                ((p - from).dot(axis) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let d = p.distance(from + axis * t);
            (half + 0.5 - d).clamp(0.0, 1.0).min(width)
        });
        Ok(())
    }

    fn fill_text(&mut self, text: &str, center: Vec2, size: f32, color: Vec4) -> Result<(), SurfaceError> {
        check_point(center, "text position")?;
        check_extent(size, "text size")?;
        let glyphs = text
            .chars()
            .map(|c| match c.to_digit(10) {
                Some(d) => Ok(&DIGITS[d as usize]),
                None => Err(SurfaceError::UnsupportedGlyph(c)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cell = size * CAP_HEIGHT / 5.0;
        let advance = size * ADVANCE;
        let total = advance * glyphs.len() as f32;
        let top = center.y - cell * 2.5;
        let mut left = center.x - total * 0.5 + (advance - cell * 3.0) * 0.5;

        let paint = Paint::Solid(color);
        for rows in glyphs {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..3 {
                    if bits & (0b100 >> col) == 0 {
                        continue;
                    }
                    let origin = Vec2::new(left + col as f32 * cell, top + row as f32 * cell);
                    self.fill_rect(origin, Vec2::splat(cell), paint)?;
                }
            }
            left += advance;
        }
        Ok(())
    }
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

    #[test]
    fn test_new_canvas_is_blank() {
        let canvas = Canvas::new(16, 8);
        assert!(canvas.is_blank());
        assert_eq!(canvas.size(), Vec2::new(16.0, 8.0));
        assert_eq!(canvas.pixel(16, 0), None);
    }

    #[test]
    fn test_fill_circle_solid() {
        let mut canvas = Canvas::new(32, 32);
        canvas.fill_circle(Vec2::new(16.0, 16.0), 5.0, Paint::Solid(RED)).unwrap();

        assert_eq!(canvas.pixel(16, 16), Some(RED));
        assert_eq!(canvas.pixel(0, 0), Some(Vec4::ZERO));
        assert_eq!(canvas.pixel(16, 25), Some(Vec4::ZERO));
    }

    #[test]
    fn test_source_over_accumulates() {
        let mut canvas = Canvas::new(4, 4);
        let half = Vec4::new(1.0, 1.0, 1.0, 0.5);
        canvas.fill_rect(Vec2::ZERO, Vec2::splat(4.0), Paint::Solid(half)).unwrap();
        canvas.fill_rect(Vec2::ZERO, Vec2::splat(4.0), Paint::Solid(half)).unwrap();

        let p = canvas.pixel(1, 1).unwrap();
        assert!((p.w - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_transform_stack() {
        let mut canvas = Canvas::new(20, 20);
        canvas.save();
        canvas.translate(Vec2::new(10.0, 10.0));
        canvas.rotate(FRAC_PI_2);
        // A rect along +x lands along +y after a quarter turn
        canvas.fill_rect(Vec2::new(2.0, -1.0), Vec2::new(6.0, 2.0), Paint::Solid(RED)).unwrap();
        canvas.restore().unwrap();

        assert!(canvas.pixel(10, 15).unwrap().w > 0.9);
        assert_eq!(canvas.pixel(15, 10), Some(Vec4::ZERO));
        assert_eq!(canvas.restore(), Err(SurfaceError::UnbalancedRestore));
    }

    #[test]
    fn test_stroke_line_covers_segment_only() {
        let mut canvas = Canvas::new(20, 20);
        canvas
            .stroke_line(Vec2::new(2.0, 10.5), Vec2::new(18.0, 10.5), 2.0, Paint::Solid(RED))
            .unwrap();

        assert!(canvas.pixel(10, 10).unwrap().w > 0.9);
        assert_eq!(canvas.pixel(10, 2), Some(Vec4::ZERO));
    }

    #[test]
    fn test_fill_text_digits() {
        let mut canvas = Canvas::new(40, 20);
        canvas.fill_text("1010", Vec2::new(20.0, 10.0), 12.0, RED).unwrap();
        assert!(!canvas.is_blank());

        let mut other = Canvas::new(40, 20);
        assert_eq!(
            other.fill_text("10a", Vec2::new(20.0, 10.0), 12.0, RED),
            Err(SurfaceError::UnsupportedGlyph('a'))
        );
        // Nothing is drawn when a glyph is missing
        assert!(other.is_blank());
    }

    #[test]
    fn test_invalid_geometry_draws_nothing() {
        let mut canvas = Canvas::new(8, 8);
        assert!(canvas.fill_circle(Vec2::new(f32::NAN, 1.0), 2.0, Paint::Solid(RED)).is_err());
        assert!(canvas.fill_circle(Vec2::ONE, f32::INFINITY, Paint::Solid(RED)).is_err());
        assert!(canvas.stroke_line(Vec2::ZERO, Vec2::ONE, -1.0, Paint::Solid(RED)).is_err());
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_export_unpremultiplies() {
        let mut canvas = Canvas::new(2, 2);
        let soft = Vec4::new(0.0, 1.0, 0.0, 0.5);
        canvas.fill_rect(Vec2::ZERO, Vec2::splat(2.0), Paint::Solid(soft)).unwrap();

        let image = canvas.to_image();
        assert_eq!(image.get_pixel(0, 0).0, [0, 255, 0, 128]);

        let mut bytes = Vec::new();
        canvas.write_premultiplied_rgba8(&mut bytes);
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..4], &[0, 128, 0, 128]);
    }

    #[test]
    fn test_resize_clears() {
        let mut canvas = Canvas::new(4, 4);
        canvas.fill_rect(Vec2::ZERO, Vec2::splat(4.0), Paint::Solid(RED)).unwrap();
        canvas.resize(6, 3);
        assert!(canvas.is_blank());
        assert_eq!(canvas.pixels().len(), 18);
    }
}
