//! The drawing surface the engine paints onto.
//!
//! [`DrawSurface`] is the small slice of a 2D canvas API the particle models
//! need: circles, rectangles, lines and centred monospace text, filled with a
//! solid colour or a radial/linear gradient, under a save/restore transform
//! stack. It is object safe so pools can draw through `&mut dyn DrawSurface`.
//!
//! Colours are straight-alpha [`Vec4`] in `[0, 1]`. Gradients interpolate
//! their stops in premultiplied space, so a stop fading to transparent white
//! does not wash the colour out.

use glam::{Vec2, Vec4};

use crate::error::SurfaceError;

/// A colour stop of a gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    /// Position along the gradient in `[0, 1]`.
    pub offset: f32,
    /// Straight-alpha colour.
    pub color: Vec4,
}

impl GradientStop {
    pub const fn new(offset: f32, color: Vec4) -> Self {
        Self { offset, color }
    }
}

/// How a shape is filled or stroked.
///
/// Gradient geometry is expressed in the coordinate space active when the
/// shape is drawn.
#[derive(Debug, Clone, Copy)]
pub enum Paint<'a> {
    Solid(Vec4),
    /// Radial gradient from `center` (offset 0) to `radius` (offset 1).
    Radial {
        center: Vec2,
        radius: f32,
        stops: &'a [GradientStop],
    },
    /// Linear gradient from `from` (offset 0) to `to` (offset 1).
    Linear {
        from: Vec2,
        to: Vec2,
        stops: &'a [GradientStop],
    },
}

impl Paint<'_> {
    /// Straight-alpha colour of this paint at `point`.
    pub fn sample(&self, point: Vec2) -> Vec4 {
        match *self {
            Paint::Solid(color) => color,
            Paint::Radial { center, radius, stops } => {
                let t = if radius > 0.0 { point.distance(center) / radius } else { 1.0 };
                sample_stops(stops, t)
            }
            Paint::Linear { from, to, stops } => {
                let axis = to - from;
                let len_sq = axis.length_squared();
                let t = if len_sq > 0.0 { (point - from).dot(axis) / len_sq } else { 0.0 };
                sample_stops(stops, t)
            }
        }
    }

    /// Check that the paint geometry is usable.
    pub fn validate(&self) -> Result<(), SurfaceError> {
        match *self {
            Paint::Solid(color) => check_color(color),
            Paint::Radial { center, radius, stops } => {
                check_point(center, "gradient center")?;
                check_extent(radius, "gradient radius")?;
                stops.iter().try_for_each(|s| check_color(s.color))
            }
            Paint::Linear { from, to, stops } => {
                check_point(from, "gradient start")?;
                check_point(to, "gradient end")?;
                stops.iter().try_for_each(|s| check_color(s.color))
            }
        }
    }
}

/// Interpolate gradient stops at `t`, clamped to the first and last stop.
pub fn sample_stops(stops: &[GradientStop], t: f32) -> Vec4 {
    let Some(first) = stops.first() else {
        return Vec4::ZERO;
    };
    let t = t.clamp(0.0, 1.0);
    if t <= first.offset {
        return first.color;
    }
    let last = stops[stops.len() - 1];
    if t >= last.offset {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let f = if span > 0.0 { (t - a.offset) / span } else { 1.0 };
            let pa = premultiply(a.color);
            let pb = premultiply(b.color);
            return unpremultiply(pa.lerp(pb, f));
        }
    }
    last.color
}

#[inline]
pub fn premultiply(c: Vec4) -> Vec4 {
    Vec4::new(c.x * c.w, c.y * c.w, c.z * c.w, c.w)
}

#[inline]
pub fn unpremultiply(c: Vec4) -> Vec4 {
    if c.w <= 0.0 {
        Vec4::ZERO
    } else {
        Vec4::new(c.x / c.w, c.y / c.w, c.z / c.w, c.w)
    }
}

pub(crate) fn check_point(p: Vec2, what: &'static str) -> Result<(), SurfaceError> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(SurfaceError::NonFinite(what))
    }
}

pub(crate) fn check_extent(v: f32, what: &'static str) -> Result<(), SurfaceError> {
    if !v.is_finite() {
        Err(SurfaceError::NonFinite(what))
    } else if v < 0.0 {
        Err(SurfaceError::NegativeExtent(what))
    } else {
        Ok(())
    }
}

fn check_color(c: Vec4) -> Result<(), SurfaceError> {
    if c.is_finite() {
        Ok(())
    } else {
        Err(SurfaceError::NonFinite("color"))
    }
}

/// A 2D raster target.
pub trait DrawSurface {
    /// Size in pixels.
    fn size(&self) -> Vec2;

    /// Change the pixel dimensions. Like resizing a canvas, this clears it
    /// and resets the transform.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear every pixel to transparent.
    fn clear(&mut self);

    /// Push the current transform.
    fn save(&mut self);

    /// Pop the transform pushed by the matching [`save`](Self::save).
    fn restore(&mut self) -> Result<(), SurfaceError>;

    fn translate(&mut self, offset: Vec2);

    /// Rotate subsequent drawing by `angle` radians.
    fn rotate(&mut self, angle: f32);

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint<'_>) -> Result<(), SurfaceError>;

    /// Fill the axis-aligned (in current space) rectangle at `origin` with `size`.
    fn fill_rect(&mut self, origin: Vec2, size: Vec2, paint: Paint<'_>) -> Result<(), SurfaceError>;

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint<'_>) -> Result<(), SurfaceError>;

    /// Draw monospace `text` centred on `center`, `size` pixels tall.
    fn fill_text(&mut self, text: &str, center: Vec2, size: f32, color: Vec4) -> Result<(), SurfaceError>;
}

/// A surface that records what would have been drawn without rasterizing.
///
/// Used by tests to count draw calls and by benches to time the simulation
/// without pixel costs. It can be told to fail a specific draw call to
/// exercise the engine's dropped-frame path.
#[derive(Debug, Clone)]
pub struct DrawRecorder {
    width: u32,
    height: u32,
    depth: usize,
    clears: u64,
    draws: u64,
    fail_at: Option<u64>,
}

impl DrawRecorder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            depth: 0,
            clears: 0,
            draws: 0,
            fail_at: None,
        }
    }

    /// Number of `clear` calls so far.
    pub fn clears(&self) -> u64 {
        self.clears
    }

    /// Number of draw calls so far, including the failed one.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Make the draw call with this zero-based index fail.
    pub fn fail_on_draw(&mut self, index: u64) {
        self.fail_at = Some(index);
    }

    fn record(&mut self, validation: Result<(), SurfaceError>) -> Result<(), SurfaceError> {
        let index = self.draws;
        self.draws += 1;
        validation?;
        if self.fail_at == Some(index) {
            return Err(SurfaceError::NonFinite("injected failure"));
        }
        Ok(())
    }
}

impl DrawSurface for DrawRecorder {
    fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.depth = 0;
    }

    fn clear(&mut self) {
        self.clears += 1;
    }

    fn save(&mut self) {
        self.depth += 1;
    }

    fn restore(&mut self) -> Result<(), SurfaceError> {
        if self.depth == 0 {
            return Err(SurfaceError::UnbalancedRestore);
        }
        self.depth -= 1;
        Ok(())
    }

    fn translate(&mut self, _offset: Vec2) {}

    fn rotate(&mut self, _angle: f32) {}

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint<'_>) -> Result<(), SurfaceError> {
        let checked = check_point(center, "circle center")
            .and_then(|_| check_extent(radius, "circle radius"))
            .and_then(|_| paint.validate());
        self.record(checked)
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, paint: Paint<'_>) -> Result<(), SurfaceError> {
        let checked = check_point(origin, "rect origin")
            .and_then(|_| check_point(size, "rect size"))
            .and_then(|_| paint.validate());
        self.record(checked)
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint<'_>) -> Result<(), SurfaceError> {
        let checked = check_point(from, "line start")
            .and_then(|_| check_point(to, "line end"))
            .and_then(|_| check_extent(width, "line width"))
            .and_then(|_| paint.validate());
        self.record(checked)
    }

    fn fill_text(&mut self, text: &str, center: Vec2, size: f32, _color: Vec4) -> Result<(), SurfaceError> {
        let checked = check_point(center, "text position")
            .and_then(|_| check_extent(size, "text size"))
            .and_then(|_| match text.chars().find(|c| !c.is_ascii_digit()) {
                Some(c) => Err(SurfaceError::UnsupportedGlyph(c)),
                None => Ok(()),
            });
        self.record(checked)
    }
}
