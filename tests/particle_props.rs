//! Invariants that hold for any seed and any number of frames.

use std::f32::consts::PI;

use backdrop::config::{FragmentConfig, LoopConfig};
use backdrop::host::Viewport;
use backdrop::pool::{FragmentPool, LoopPool, PoolState, SimulationPool};
use backdrop::surface::DrawRecorder;
use backdrop::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[test]
fn test_fragments_stay_within_wrap_bounds() {
    let bounds = Vec2::new(640.0, 360.0);
    for seed in 0..8 {
        // Frequent kicks push fragments across the edges often
        let config = FragmentConfig {
            disperse_chance: 0.2,
            disperse_strength: 12.0,
            ..Default::default()
        };
        let mut pool = FragmentPool::new(Viewport::new(640, 360), config, ChaCha8Rng::seed_from_u64(seed));
        for _ in 0..500 {
            pool.advance(bounds);
            for f in pool.fragments() {
                assert!(f.position.x >= -f.size && f.position.x <= bounds.x + f.size, "x={}", f.position.x);
                assert!(f.position.y >= -f.size && f.position.y <= bounds.y + f.size, "y={}", f.position.y);
            }
        }
    }
}

#[test]
fn test_fragments_wrap_after_shrink() {
    let mut pool = FragmentPool::new(
        Viewport::new(1920, 1080),
        FragmentConfig::default(),
        ChaCha8Rng::seed_from_u64(99),
    );
    let small = Vec2::new(200.0, 150.0);
    for _ in 0..3 {
        pool.advance(small);
    }
    for f in pool.fragments() {
        assert!(f.position.x >= -f.size && f.position.x <= small.x + f.size);
        assert!(f.position.y >= -f.size && f.position.y <= small.y + f.size);
    }
}

#[test]
fn test_loop_t_stays_in_period() {
    let config = LoopConfig {
        // Fast enough to wrap many times
        speed_min: 0.5,
        speed_max: 1.7,
        ..Default::default()
    };
    let mut pool = LoopPool::new(Viewport::new(1280, 720), config, ChaCha8Rng::seed_from_u64(5));
    for _ in 0..2_000 {
        pool.advance(Vec2::ZERO);
        for p in pool.particles() {
            assert!(p.t >= 0.0 && p.t < 4.0 * PI, "t={}", p.t);
            assert!(p.depth_phase >= 0.0 && p.depth_phase < 2.0 * PI);
            assert!(p.flare_phase >= 0.0 && p.flare_phase < 2.0 * PI);
        }
    }
}

#[test]
fn test_trails_never_exceed_limit() {
    for trail_length in [1, 3, 5, 9] {
        let config = LoopConfig {
            compact_count: 24,
            count: 24,
            trail_length,
            ..Default::default()
        };
        let mut pool = LoopPool::new(Viewport::new(800, 600), config, ChaCha8Rng::seed_from_u64(7));
        let mut surface = DrawRecorder::new(800, 600);
        for frame in 0..40 {
            pool.tick(&mut surface).unwrap();
            let PoolState::Loop { particles, .. } = pool.state() else {
                panic!("expected loop pool");
            };
            for p in particles {
                assert!(p.trail.len() <= trail_length);
                assert_eq!(p.trail.len(), (frame + 1).min(trail_length));
            }
        }
    }
}

#[test]
fn test_trail_opacity_fades_along_trail() {
    let config = LoopConfig {
        compact_count: 1,
        count: 1,
        ..Default::default()
    };
    let mut pool = LoopPool::new(Viewport::new(800, 600), config, ChaCha8Rng::seed_from_u64(8));
    let mut surface = DrawRecorder::new(800, 600);
    for _ in 0..10 {
        pool.tick(&mut surface).unwrap();
    }
    let p = &pool.particles()[0];
    for point in &p.trail {
        assert!((0.0..=0.3).contains(&point.opacity));
    }
}
