//! Simulation pools.
//!
//! A pool owns every particle of one mode and steps them once per accepted
//! frame. The two modes share nothing beyond the [`SimulationPool`] trait;
//! [`build_pool`] picks the implementation when the engine mounts or the
//! mode changes.
//!
//! Within a tick every particle is advanced, in index order, before any is
//! drawn. Fragment interactions read a snapshot of positions taken before
//! the tick, so the outcome does not depend on the iteration order.

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{EngineConfig, FragmentConfig, LoopConfig, Mode};
use crate::error::SurfaceError;
use crate::fragment::Fragment;
use crate::host::Viewport;
use crate::infinity::LoopParticle;
use crate::projection::LoopGeometry;
use crate::surface::DrawSurface;

/// Read-only view of a pool's particles.
#[derive(Debug, Clone, Copy)]
pub enum PoolState<'a> {
    Fragments(&'a [Fragment]),
    Loop {
        particles: &'a [LoopParticle],
        geometry: &'a LoopGeometry,
    },
}

impl PoolState<'_> {
    pub fn len(&self) -> usize {
        match self {
            PoolState::Fragments(f) => f.len(),
            PoolState::Loop { particles, .. } => particles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The particles of one mode.
pub trait SimulationPool {
    fn mode(&self) -> Mode;

    /// Number of live particles.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance every particle by one frame on a surface of size `bounds`.
    fn advance(&mut self, bounds: Vec2);

    /// Draw every particle.
    fn render(&mut self, surface: &mut dyn DrawSurface) -> Result<(), SurfaceError>;

    /// One accepted frame: advance all, then render all.
    fn tick(&mut self, surface: &mut dyn DrawSurface) -> Result<(), SurfaceError> {
        self.advance(surface.size());
        self.render(surface)
    }

    /// The viewport changed. Particle state is never rescaled.
    fn resize(&mut self, _viewport: Viewport) {}

    /// Discard every particle. The pool is empty afterwards.
    fn teardown(&mut self);

    fn state(&self) -> PoolState<'_>;
}

/// Build the pool for `mode`, sized for `viewport`.
pub fn build_pool(mode: Mode, viewport: Viewport, config: &EngineConfig) -> Box<dyn SimulationPool> {
    let rng = match config.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    match mode {
        Mode::Fragments => Box::new(FragmentPool::new(viewport, config.fragments.clone(), rng)),
        Mode::Infinity => Box::new(LoopPool::new(viewport, config.infinity.clone(), rng)),
    }
}

/// Fragment mode pool.
pub struct FragmentPool {
    fragments: Vec<Fragment>,
    /// Positions before the current advance, reused across ticks.
    snapshot: Vec<Vec2>,
    config: FragmentConfig,
    rng: ChaCha8Rng,
}

impl FragmentPool {
    pub fn new(viewport: Viewport, config: FragmentConfig, mut rng: ChaCha8Rng) -> Self {
        let bounds = Vec2::new(viewport.width as f32, viewport.height as f32);
        let fragments = (0..config.count)
            .map(|_| Fragment::spawn(&mut rng, bounds, &config))
            .collect();
        Self {
            fragments,
            snapshot: Vec::with_capacity(config.count),
            config,
            rng,
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }
}

impl SimulationPool for FragmentPool {
    fn mode(&self) -> Mode {
        Mode::Fragments
    }

    fn len(&self) -> usize {
        self.fragments.len()
    }

    fn advance(&mut self, bounds: Vec2) {
        self.snapshot.clear();
        self.snapshot.extend(self.fragments.iter().map(|f| f.position));
        for (index, fragment) in self.fragments.iter_mut().enumerate() {
            fragment.advance(index, &self.snapshot, bounds, &self.config, &mut self.rng);
        }
    }

    fn render(&mut self, surface: &mut dyn DrawSurface) -> Result<(), SurfaceError> {
        for fragment in &self.fragments {
            fragment.render(surface, &self.fragments, &self.config)?;
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.fragments.clear();
        self.snapshot.clear();
    }

    fn state(&self) -> PoolState<'_> {
        PoolState::Fragments(&self.fragments)
    }
}

/// Infinity mode pool.
///
/// Population and loop size come from the viewport at construction; a
/// resize only moves the loop's centre.
pub struct LoopPool {
    particles: Vec<LoopParticle>,
    geometry: LoopGeometry,
    config: LoopConfig,
}

impl LoopPool {
    pub fn new(viewport: Viewport, config: LoopConfig, mut rng: ChaCha8Rng) -> Self {
        let count = config.population(viewport);
        let particles = (0..count)
            .map(|i| LoopParticle::spawn(&mut rng, i, count, &config))
            .collect();
        Self {
            particles,
            geometry: config.geometry(viewport),
            config,
        }
    }

    pub fn particles(&self) -> &[LoopParticle] {
        &self.particles
    }

    pub fn geometry(&self) -> &LoopGeometry {
        &self.geometry
    }
}

impl SimulationPool for LoopPool {
    fn mode(&self) -> Mode {
        Mode::Infinity
    }

    fn len(&self) -> usize {
        self.particles.len()
    }

    fn advance(&mut self, _bounds: Vec2) {
        for particle in &mut self.particles {
            particle.advance(&self.config);
        }
    }

    fn render(&mut self, surface: &mut dyn DrawSurface) -> Result<(), SurfaceError> {
        for particle in &mut self.particles {
            particle.render(surface, &self.geometry, &self.config)?;
        }
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        self.geometry.center = Vec2::new(viewport.width as f32 / 2.0, viewport.height as f32 / 2.0);
    }

    fn teardown(&mut self) {
        self.particles.clear();
    }

    fn state(&self) -> PoolState<'_> {
        PoolState::Loop {
            particles: &self.particles,
            geometry: &self.geometry,
        }
    }
}
