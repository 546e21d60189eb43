//! Fragment mode particles.
//!
//! Fragments drift across the surface, wrap at its edges, pull gently on
//! their neighbours and are joined to them by faint edges. Each fragment is
//! one of three kinds, drawn differently:
//!
//! - [`FragmentKind::Point`]: a pulsing glow with a solid core.
//! - [`FragmentKind::Stream`]: a binary token that flickers through a fixed
//!   set, with a scan line sweeping over it.
//! - [`FragmentKind::Cluster`]: a rotating 5x5 pixel grid that decays and
//!   recovers as its glitch timer advances.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::config::FragmentConfig;
use crate::error::SurfaceError;
use crate::surface::{DrawSurface, GradientStop, Paint};
use crate::visuals::{FragmentColor, Rgb, TRANSPARENT};

/// Tokens a stream fragment cycles through.
pub const BINARY_TOKENS: [&str; 6] = ["1010", "0101", "1100", "0011", "1111", "0000"];

/// Frames each stream token stays up.
const TOKEN_FRAMES: f32 = 10.0;
/// Frames for a stream scan line to sweep top to bottom.
const SCAN_FRAMES: f32 = 80.0;
const GRID: usize = 5;

/// Kind of a fragment, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentKind {
    Point,
    Stream {
        /// Frame counter driving the token and the scan line. Starts at a
        /// random fractional offset.
        glitch_timer: f32,
    },
    Cluster {
        rotation: f32,
        rotation_speed: f32,
        /// Frame counter driving which grid cells are lit.
        glitch_timer: f32,
    },
}

impl FragmentKind {
    /// Weighted draw: 60% points, 25% streams, 15% clusters.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, config: &FragmentConfig) -> Self {
        let roll: f32 = rng.gen();
        if roll < 0.6 {
            FragmentKind::Point
        } else if roll < 0.85 {
            FragmentKind::Stream {
                glitch_timer: glitch_start(rng),
            }
        } else {
            FragmentKind::Cluster {
                rotation: rng.gen_range(0.0..TAU),
                rotation_speed: symmetric(rng, config.rotation_speed),
                glitch_timer: glitch_start(rng),
            }
        }
    }

    fn advance(&mut self) {
        match self {
            FragmentKind::Point => {}
            FragmentKind::Stream { glitch_timer } => {
                *glitch_timer += 1.0;
            }
            FragmentKind::Cluster {
                rotation,
                rotation_speed,
                glitch_timer,
            } => {
                *rotation = (*rotation + *rotation_speed).rem_euclid(TAU);
                *glitch_timer += 1.0;
            }
        }
    }
}

/// A neighbour within connection distance, found during the last advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Index of the other fragment in the pool.
    pub index: usize,
    pub distance: f32,
}

/// A fragment mode particle.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: f32,
    pub color: FragmentColor,
    pub kind: FragmentKind,
    pub pulse_phase: f32,
    /// Recomputed on every advance.
    pub connections: Vec<Connection>,
}

impl Fragment {
    /// A fragment at a random spot on a surface of size `bounds`.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, bounds: Vec2, config: &FragmentConfig) -> Self {
        let position = Vec2::new(rng.gen::<f32>() * bounds.x, rng.gen::<f32>() * bounds.y);
        let velocity = Vec2::new(
            symmetric(rng, config.initial_speed),
            symmetric(rng, config.initial_speed),
        );
        let kind = FragmentKind::random(rng, config);
        let size = if config.size_max > config.size_min {
            rng.gen_range(config.size_min..config.size_max)
        } else {
            config.size_min
        };
        let color = FragmentColor::random(rng);
        let pulse_phase = rng.gen_range(0.0..TAU);

        Self {
            position,
            velocity,
            size,
            color,
            kind,
            pulse_phase,
            connections: Vec::new(),
        }
    }

    /// Step the fragment by one frame.
    ///
    /// `neighbours` holds every fragment's position from before this frame's
    /// advance, indexed like the pool; `index` is this fragment's own slot.
    /// Reading positions from that snapshot keeps the result independent of
    /// the order fragments are advanced in.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        neighbours: &[Vec2],
        bounds: Vec2,
        config: &FragmentConfig,
        rng: &mut R,
    ) {
        self.position += self.velocity;
        self.kind.advance();
        self.pulse_phase = (self.pulse_phase + config.pulse_rate).rem_euclid(TAU);
        self.wrap(bounds);

        self.connections.clear();
        for (other, &position) in neighbours.iter().enumerate() {
            if other == index {
                continue;
            }
            let delta = position - self.position;
            let distance = delta.length();

            if distance < config.attraction_distance && distance > 0.0 {
                self.velocity += delta / distance * config.attraction;
            }
            if distance < config.connection_distance {
                self.connections.push(Connection { index: other, distance });
            }
        }

        self.velocity *= config.damping;

        if rng.gen::<f32>() < config.disperse_chance {
            self.velocity += Vec2::new(
                symmetric(rng, config.disperse_strength),
                symmetric(rng, config.disperse_strength),
            );
        }
    }

    /// Toroidal wrap into `[-size, bounds + size]`.
    fn wrap(&mut self, bounds: Vec2) {
        let size = self.size;
        if self.position.x < -size {
            self.position.x = bounds.x + size;
        } else if self.position.x > bounds.x + size {
            self.position.x = -size;
        }
        if self.position.y < -size {
            self.position.y = bounds.y + size;
        } else if self.position.y > bounds.y + size {
            self.position.y = -size;
        }
    }

    /// Draw the connection edges, then the fragment itself.
    ///
    /// `pool` is the fragment slice the connection indices refer to.
    pub fn render(
        &self,
        surface: &mut dyn DrawSurface,
        pool: &[Fragment],
        config: &FragmentConfig,
    ) -> Result<(), SurfaceError> {
        let rgb = self.color.rgb();
        for connection in &self.connections {
            let Some(other) = pool.get(connection.index) else {
                continue;
            };
            let alpha = (1.0 - connection.distance / config.connection_distance) * config.edge_alpha;
            let stops = [
                GradientStop::new(0.0, rgb.with_alpha(alpha)),
                GradientStop::new(1.0, other.color.rgb().with_alpha(alpha)),
            ];
            let paint = Paint::Linear {
                from: self.position,
                to: other.position,
                stops: &stops,
            };
            surface.stroke_line(self.position, other.position, config.edge_width, paint)?;
        }

        match self.kind {
            FragmentKind::Point => self.draw_point(surface, rgb),
            FragmentKind::Stream { glitch_timer } => self.draw_stream(surface, rgb, glitch_timer),
            FragmentKind::Cluster {
                rotation,
                glitch_timer,
                ..
            } => self.draw_cluster(surface, rgb, rotation, glitch_timer),
        }
    }

    fn draw_point(&self, surface: &mut dyn DrawSurface, rgb: Rgb) -> Result<(), SurfaceError> {
        let pulse = self.pulse_phase.sin() * 0.3 + 0.7;
        let radius = self.size * 3.0;
        let stops = [
            GradientStop::new(0.0, rgb.with_alpha(pulse * 0.8)),
            GradientStop::new(0.3, rgb.with_alpha(pulse * 0.4)),
            GradientStop::new(0.6, rgb.with_alpha(pulse * 0.15)),
            GradientStop::new(1.0, TRANSPARENT),
        ];
        let glow = Paint::Radial {
            center: self.position,
            radius,
            stops: &stops,
        };
        surface.fill_circle(self.position, radius, glow)?;
        surface.fill_circle(self.position, self.size * 0.3, Paint::Solid(rgb.with_alpha(pulse)))
    }

    fn draw_stream(&self, surface: &mut dyn DrawSurface, rgb: Rgb, glitch_timer: f32) -> Result<(), SurfaceError> {
        let pulse = self.pulse_phase.sin() * 0.2 + 0.8;
        let size = self.size;

        surface.save();
        surface.translate(self.position);
        let drawn = (|| -> Result<(), SurfaceError> {
            let reach = size * 2.5;
            let stops = [
                GradientStop::new(0.0, rgb.with_alpha(pulse * 0.3)),
                GradientStop::new(0.5, rgb.with_alpha(pulse * 0.12)),
                GradientStop::new(1.0, TRANSPARENT),
            ];
            let glow = Paint::Radial {
                center: Vec2::ZERO,
                radius: reach,
                stops: &stops,
            };
            surface.fill_rect(Vec2::splat(-reach), Vec2::splat(reach * 2.0), glow)?;

            surface.fill_text(stream_token(glitch_timer), Vec2::ZERO, size * 0.35, rgb.with_alpha(pulse * 0.9))?;

            let flow_y = scan_offset(glitch_timer) * size * 2.0 - size;
            surface.stroke_line(
                Vec2::new(-size * 0.8, flow_y),
                Vec2::new(size * 0.8, flow_y),
                1.0,
                Paint::Solid(rgb.with_alpha(pulse * 0.25)),
            )
        })();
        surface.restore()?;
        drawn
    }

    fn draw_cluster(
        &self,
        surface: &mut dyn DrawSurface,
        rgb: Rgb,
        rotation: f32,
        glitch_timer: f32,
    ) -> Result<(), SurfaceError> {
        let pulse = self.pulse_phase.sin() * 0.3 + 0.7;
        let size = self.size;

        surface.save();
        surface.translate(self.position);
        surface.rotate(rotation);
        let drawn = (|| -> Result<(), SurfaceError> {
            let reach = size * 2.0;
            let ambient_stops = [
                GradientStop::new(0.0, rgb.with_alpha(pulse * 0.25)),
                GradientStop::new(0.5, rgb.with_alpha(pulse * 0.1)),
                GradientStop::new(1.0, TRANSPARENT),
            ];
            let ambient = Paint::Radial {
                center: Vec2::ZERO,
                radius: reach,
                stops: &ambient_stops,
            };
            surface.fill_rect(Vec2::splat(-reach), Vec2::splat(reach * 2.0), ambient)?;

            let pixel = size * 0.12;
            let spacing = size * 0.18;
            let start = -((GRID - 1) as f32) * spacing / 2.0;
            let pixel_stops = [
                GradientStop::new(0.0, rgb.with_alpha(pulse * 0.7)),
                GradientStop::new(0.5, rgb.with_alpha(pulse * 0.3)),
                GradientStop::new(1.0, TRANSPARENT),
            ];
            let core = Paint::Solid(rgb.with_alpha(pulse));

            for row in 0..GRID {
                for col in 0..GRID {
                    if !cell_lit(row, col, glitch_timer) {
                        continue;
                    }
                    let cell = Vec2::new(start + col as f32 * spacing, start + row as f32 * spacing);
                    let glow = Paint::Radial {
                        center: cell,
                        radius: pixel * 3.0,
                        stops: &pixel_stops,
                    };
                    surface.fill_rect(cell - Vec2::splat(pixel * 3.0), Vec2::splat(pixel * 6.0), glow)?;
                    surface.fill_rect(cell - Vec2::splat(pixel / 2.0), Vec2::splat(pixel), core)?;
                }
            }
            Ok(())
        })();
        surface.restore()?;
        drawn
    }
}

/// Token shown by a stream fragment at this glitch time.
pub fn stream_token(glitch_timer: f32) -> &'static str {
    BINARY_TOKENS[(glitch_timer / TOKEN_FRAMES).max(0.0) as usize % BINARY_TOKENS.len()]
}

/// Scan line progress in `[0, 1)`.
fn scan_offset(glitch_timer: f32) -> f32 {
    glitch_timer.rem_euclid(SCAN_FRAMES) / SCAN_FRAMES
}

/// Whether a cluster grid cell is lit at this glitch time.
pub fn cell_lit(row: usize, col: usize, glitch_timer: f32) -> bool {
    let pattern = ((row * GRID + col) as f32 + glitch_timer / 20.0) % 17.0;
    pattern <= 11.0
}

/// Initial glitch time, uniform in `[0, 200)`.
#[inline]
fn glitch_start<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>() * 200.0
}

/// Uniform draw in `[-half, half)`.
#[inline]
fn symmetric<R: Rng + ?Sized>(rng: &mut R, half: f32) -> f32 {
    (rng.gen::<f32>() - 0.5) * 2.0 * half
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::DrawRecorder;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn point_at(position: Vec2, velocity: Vec2) -> Fragment {
        Fragment {
            position,
            velocity,
            size: 20.0,
            color: FragmentColor::MintCyan,
            kind: FragmentKind::Point,
            pulse_phase: 0.0,
            connections: Vec::new(),
        }
    }

    #[test]
    fn test_kind_distribution() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let config = FragmentConfig::default();
        let (mut points, mut streams, mut clusters) = (0, 0, 0);
        for _ in 0..10_000 {
            match FragmentKind::random(&mut rng, &config) {
                FragmentKind::Point => points += 1,
                FragmentKind::Stream { .. } => streams += 1,
                FragmentKind::Cluster { .. } => clusters += 1,
            }
        }
        assert!((5700..6300).contains(&points));
        assert!((2200..2800).contains(&streams));
        assert!((1200..1800).contains(&clusters));
    }

    #[test]
    fn test_glitch_timer_starts_fractional() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let config = FragmentConfig::default();
        let timers: Vec<f32> = (0..500)
            .filter_map(|_| match FragmentKind::random(&mut rng, &config) {
                FragmentKind::Point => None,
                FragmentKind::Stream { glitch_timer } | FragmentKind::Cluster { glitch_timer, .. } => {
                    Some(glitch_timer)
                }
            })
            .collect();
        assert!(timers.len() > 100);
        assert!(timers.iter().all(|t| (0.0..200.0).contains(t)));
        assert!(timers.iter().any(|t| t.fract() != 0.0));
    }

    #[test]
    fn test_wrap_right_edge() {
        let config = FragmentConfig {
            disperse_chance: 0.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut f = point_at(Vec2::new(119.5, 50.0), Vec2::new(1.0, 0.0));
        let snapshot = [f.position];
        f.advance(0, &snapshot, Vec2::new(100.0, 100.0), &config, &mut rng);
        assert_eq!(f.position.x, -20.0);
    }

    #[test]
    fn test_attraction_and_connections() {
        let config = FragmentConfig {
            disperse_chance: 0.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let neighbours = [Vec2::new(100.0, 100.0), Vec2::new(200.0, 100.0), Vec2::new(250.0, 100.0), Vec2::new(900.0, 900.0)];
        let mut f = point_at(neighbours[0], Vec2::ZERO);
        f.advance(0, &neighbours, Vec2::new(1000.0, 1000.0), &config, &mut rng);

        // Only the neighbour at 100 px attracts; the one at 150 px only connects
        assert!((f.velocity.x - 0.002 * 0.99).abs() < 1e-7);
        assert_eq!(f.velocity.y, 0.0);
        let indices: Vec<usize> = f.connections.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(f.connections[1].distance, 150.0);
    }

    #[test]
    fn test_velocity_decays() {
        let config = FragmentConfig {
            disperse_chance: 0.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut f = point_at(Vec2::new(50.0, 50.0), Vec2::new(2.0, -1.0));
        let before = f.velocity.length();
        for _ in 0..100 {
            let snapshot = [f.position];
            f.advance(0, &snapshot, Vec2::new(100.0, 100.0), &config, &mut rng);
        }
        assert!(f.velocity.length() < before * 0.4);
    }

    #[test]
    fn test_stream_token_cycle() {
        assert_eq!(stream_token(0.0), "1010");
        assert_eq!(stream_token(9.0), "1010");
        assert_eq!(stream_token(10.0), "0101");
        assert_eq!(stream_token(60.0), "1010");
        // Fractional times cycle on the same boundaries
        assert_eq!(stream_token(9.99), "1010");
        assert_eq!(stream_token(19.5), "0101");
    }

    #[test]
    fn test_cluster_cells_decay() {
        let lit = |t| {
            (0..GRID)
                .flat_map(|r| (0..GRID).map(move |c| (r, c)))
                .filter(|&(r, c)| cell_lit(r, c, t))
                .count()
        };
        // Some cells are always skipped, never all of them
        for t in [0.0, 37.0, 120.5, 333.25] {
            let n = lit(t);
            assert!(n > 0 && n < GRID * GRID, "t={} lit={}", t, n);
        }
        assert!(!cell_lit(2, 2, 0.0));
        assert!(cell_lit(0, 0, 0.0));
        // A fractional timer shifts the pattern between whole frames
        assert!(cell_lit(2, 1, 0.0) && !cell_lit(2, 1, 19.0));
    }

    #[test]
    fn test_render_kinds_balance_transforms() {
        let config = FragmentConfig::default();
        let mut surface = DrawRecorder::new(800, 600);
        let mut f = point_at(Vec2::new(100.0, 100.0), Vec2::ZERO);
        for kind in [
            FragmentKind::Point,
            FragmentKind::Stream { glitch_timer: 15.5 },
            FragmentKind::Cluster {
                rotation: 0.4,
                rotation_speed: 0.01,
                glitch_timer: 15.5,
            },
        ] {
            f.kind = kind;
            f.render(&mut surface, &[], &config).unwrap();
        }
        // Every save was matched by a restore
        assert!(surface.restore().is_err());
        assert!(surface.draws() > 10);
    }

    #[test]
    fn test_render_draws_edges_first() {
        let config = FragmentConfig::default();
        let mut surface = DrawRecorder::new(800, 600);
        let mut a = point_at(Vec2::new(100.0, 100.0), Vec2::ZERO);
        let b = point_at(Vec2::new(150.0, 100.0), Vec2::ZERO);
        a.connections.push(Connection { index: 1, distance: 50.0 });
        // Fail the first draw: it must be the edge
        surface.fail_on_draw(0);
        let pool = [a.clone(), b];
        assert!(a.render(&mut surface, &pool, &config).is_err());
        assert_eq!(surface.draws(), 1);
    }
}
