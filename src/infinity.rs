//! Infinity mode particles.
//!
//! Particles stream along a tilted figure-eight, spaced evenly along the
//! curve at creation and each moving at its own speed. Depth bobs them in
//! and out of the loop plane, changing their size, opacity and colour, and
//! every so often a particle flares with a cross-shaped burst. A short trail
//! of past positions fades out behind each one.

use std::collections::VecDeque;
use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;

use crate::config::LoopConfig;
use crate::error::SurfaceError;
use crate::host::Viewport;
use crate::projection::{project, LoopGeometry, Projected};
use crate::surface::{DrawSurface, GradientStop, Paint};
use crate::visuals::rgba;

/// Period of the parametric angle: two turns trace the whole figure-eight.
pub const LOOP_PERIOD: f32 = 4.0 * PI;

impl LoopConfig {
    /// Particle count for a viewport, decided once at pool construction.
    pub fn population(&self, viewport: Viewport) -> usize {
        if viewport.width < self.compact_breakpoint {
            self.compact_count
        } else {
            self.count
        }
    }

    /// Loop geometry for a viewport, centred on it.
    pub fn geometry(&self, viewport: Viewport) -> LoopGeometry {
        let (w, h) = (viewport.width as f32, viewport.height as f32);
        LoopGeometry {
            width: (w * self.width_ratio).min(self.max_width),
            height: (h * self.height_ratio).min(self.max_height),
            center: Vec2::new(w / 2.0, h / 2.0),
            curve_divisor: self.curve_divisor,
            depth_scale: self.depth_scale,
            z_lift: self.z_lift,
            tilt_deg: self.tilt_deg,
            perspective_deg: self.perspective_deg,
        }
    }
}

/// One past position of a particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub position: Vec2,
    pub opacity: f32,
}

/// An infinity mode particle.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopParticle {
    /// Parametric angle in `[0, 4π)`.
    pub t: f32,
    pub speed: f32,
    pub size: f32,
    pub depth_phase: f32,
    pub flare_phase: f32,
    pub flare_speed: f32,
    pub flare_intensity: f32,
    /// Newest first. Drawing state only; never read by `advance`.
    pub trail: VecDeque<TrailPoint>,
}

impl LoopParticle {
    /// Particle `index` of `count`, placed at `index / count` of the way
    /// around the loop.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, index: usize, count: usize, config: &LoopConfig) -> Self {
        let t = (index as f32 / count.max(1) as f32 * LOOP_PERIOD).rem_euclid(LOOP_PERIOD);
        Self {
            t,
            speed: uniform(rng, config.speed_min, config.speed_max),
            size: uniform(rng, config.dot_size_min, config.dot_size_max),
            depth_phase: rng.gen_range(0.0..TAU),
            flare_phase: rng.gen_range(0.0..TAU),
            flare_speed: uniform(rng, config.flare_rate_min, config.flare_rate_max),
            flare_intensity: uniform(rng, config.flare_intensity_min, config.flare_intensity_max),
            trail: VecDeque::with_capacity(config.trail_length + 1),
        }
    }

    pub fn advance(&mut self, config: &LoopConfig) {
        self.t = (self.t + self.speed).rem_euclid(LOOP_PERIOD);
        self.depth_phase = (self.depth_phase + config.depth_rate).rem_euclid(TAU);
        self.flare_phase = (self.flare_phase + self.flare_speed).rem_euclid(TAU);
    }

    pub fn position(&self, geometry: &LoopGeometry) -> Projected {
        project(self.t, self.depth_phase, geometry)
    }

    /// Flare magnitude in `(0, 1]`, or `None` when not flaring.
    pub fn flare(&self, threshold: f32) -> Option<f32> {
        let value = self.flare_phase.sin();
        (value > threshold).then(|| (value - threshold) / (1.0 - threshold))
    }

    /// Draw glow, flare, core and trail, recording this frame's position in
    /// the trail.
    pub fn render(
        &mut self,
        surface: &mut dyn DrawSurface,
        geometry: &LoopGeometry,
        config: &LoopConfig,
    ) -> Result<(), SurfaceError> {
        let pos = self.position(geometry);
        let center = pos.position();
        let palette = &config.palette;

        let depth_opacity = 0.2 + (pos.depth + 1.0) * 0.4;
        let z_opacity = if pos.z > 0.0 { 1.0 } else { 0.5 + pos.z };
        let opacity = (depth_opacity * z_opacity).clamp(0.0, 1.0);

        let color_mix = (self.t % TAU) / TAU;
        let depth_mix = (pos.z + 0.6) / 1.2;
        let (dot, glow) = (palette.dot, palette.glow);
        let sweep = |from: u8, to: u8, amount: f32| (from as f32 + (to as f32 - from as f32) * amount).floor();
        let r = sweep(dot.r, glow.r, color_mix * depth_mix);
        let g = sweep(dot.g, glow.g, color_mix);
        let b = sweep(dot.b, glow.b, color_mix * (1.0 - depth_mix * 0.3));

        let glow_radius = config.glow_radius * pos.scale * if pos.z > 0.0 { 1.2 } else { 0.8 };
        let glow_stops = [
            GradientStop::new(0.0, rgba(r, g, b, opacity * 0.9)),
            GradientStop::new(0.4, rgba(r, g, b, opacity * 0.5)),
            GradientStop::new(1.0, rgba(r, g, b, 0.0)),
        ];
        let glow_paint = Paint::Radial {
            center,
            radius: glow_radius,
            stops: &glow_stops,
        };
        surface.fill_circle(center, glow_radius, glow_paint)?;

        let flare = self.flare(config.flare_threshold);
        if let Some(magnitude) = flare {
            let flare_color = palette.flare;
            let flare_size = config.glow_radius * 2.5 * pos.scale * magnitude * self.flare_intensity;
            let burst_stops = [
                GradientStop::new(0.0, flare_color.with_alpha(magnitude * 0.8)),
                GradientStop::new(0.3, flare_color.with_alpha(magnitude * 0.4)),
                GradientStop::new(1.0, flare_color.with_alpha(0.0)),
            ];
            let burst = Paint::Radial {
                center,
                radius: flare_size,
                stops: &burst_stops,
            };
            surface.fill_circle(center, flare_size, burst)?;

            let arm = flare_size * 1.5;
            let stroke = Paint::Solid(flare_color.with_alpha(0.8 * magnitude * 0.6));
            let width = 2.0 * pos.scale;
            surface.stroke_line(center - Vec2::new(arm, 0.0), center + Vec2::new(arm, 0.0), width, stroke)?;
            surface.stroke_line(center - Vec2::new(0.0, arm), center + Vec2::new(0.0, arm), width, stroke)?;
        }

        let brightness = if flare.is_some() { 1.3 } else { 1.0 };
        let core = Paint::Solid(rgba(r * brightness, g * brightness, b * brightness, opacity));
        surface.fill_circle(center, self.size * pos.scale, core)?;

        self.trail.push_front(TrailPoint {
            position: center,
            opacity: opacity * 0.3,
        });
        self.trail.truncate(config.trail_length);

        let trail_radius = self.size * 0.5;
        for (index, point) in self.trail.iter().enumerate() {
            let fade = 1.0 - index as f32 / config.trail_length as f32;
            let paint = Paint::Solid(palette.trail.with_alpha(point.opacity * fade));
            surface.fill_circle(point.position, trail_radius, paint)?;
        }
        Ok(())
    }
}

/// Uniform draw in `[min, max)`, or `min` for an empty range.
fn uniform<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}
