//! Geometry of the infinity loop.
//!
//! A particle on the loop is described by its parametric angle `t` and a
//! depth phase. [`project`] maps that pair onto the drawing surface: a
//! lemniscate (figure-eight) in the plane, lifted out of the plane by the
//! depth phase, tilted and turned by two fixed angles, and foreshortened by
//! a perspective scale.
//!
//! Everything here is pure. The same inputs always give bit-identical output.

use std::f32::consts::SQRT_2;

use glam::Vec2;

/// Fixed geometry of a loop, derived from the viewport when a pool is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopGeometry {
    /// Horizontal extent of the figure-eight in pixels.
    pub width: f32,
    /// Vertical extent available to the lobes in pixels.
    pub height: f32,
    /// Screen position of the crossing point.
    pub center: Vec2,
    /// Divisor applied to `width` to get the curve's half-axis.
    pub curve_divisor: f32,
    /// How far the depth phase lifts particles out of the plane.
    pub depth_scale: f32,
    /// Pixels of screen offset per unit of `z` before rotation.
    pub z_lift: f32,
    /// Rotation about the horizontal axis, in degrees.
    pub tilt_deg: f32,
    /// Rotation about the vertical axis, in degrees.
    pub perspective_deg: f32,
}

/// A projected position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub x: f32,
    pub y: f32,
    /// `sin(depth_phase)`, in `[-1, 1]`.
    pub depth: f32,
    /// Perspective scale applied to sizes at this point.
    pub scale: f32,
    /// Height above the loop plane, `depth * depth_scale`.
    pub z: f32,
}

impl Projected {
    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Project a loop particle onto the surface.
pub fn project(t: f32, depth_phase: f32, geometry: &LoopGeometry) -> Projected {
    let a = geometry.width / geometry.curve_divisor;
    // The lobes of a lemniscate reach a / (2 * sqrt 2) above the axis.
    let b = a.min(geometry.height * SQRT_2);
    let (sin_t, cos_t) = t.sin_cos();
    let denominator = 1.0 + sin_t * sin_t;

    let x = a * cos_t / denominator;
    let y = b * sin_t * cos_t / denominator;

    let depth = depth_phase.sin();
    let z = depth * geometry.depth_scale;
    let perspective = 1.0 / (1.0 - z * 0.5);
    let scale = 0.5 + perspective * 0.5;

    let (sin_tilt, cos_tilt) = geometry.tilt_deg.to_radians().sin_cos();
    let (sin_turn, cos_turn) = geometry.perspective_deg.to_radians().sin_cos();
    let lift = z * geometry.z_lift;
    let y_rotated = y * cos_tilt - lift * sin_tilt;
    let x_rotated = x * cos_turn + lift * sin_turn;

    Projected {
        x: x_rotated * scale + geometry.center.x,
        y: y_rotated * scale + geometry.center.y,
        depth,
        scale,
        z,
    }
}
