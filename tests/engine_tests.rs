//! Render loop controller scenarios on a headless host.

use backdrop::error::{ConfigError, EngineError, SurfaceError};
use backdrop::fragment::Fragment;
use backdrop::infinity::LoopParticle;
use backdrop::prelude::*;
use backdrop::surface::Paint;

const STEP: f64 = 20.0;

fn recording_engine(mode: Mode) -> Engine<HeadlessHost<DrawRecorder>> {
    let host = HeadlessHost::recording(Viewport::new(1280, 720));
    let mut engine = Engine::new(host, EngineConfig::default().with_seed(42));
    engine.mount(mode).unwrap();
    engine
}

fn fragments(engine: &Engine<impl FrameHost>) -> Vec<Fragment> {
    match engine.pool_state() {
        Some(PoolState::Fragments(f)) => f.to_vec(),
        other => panic!("expected fragment pool, got {:?}", other.map(|s| s.len())),
    }
}

fn loop_particles(engine: &Engine<impl FrameHost>) -> Vec<LoopParticle> {
    match engine.pool_state() {
        Some(PoolState::Loop { particles, .. }) => particles.to_vec(),
        other => panic!("expected loop pool, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn test_suspended_callbacks_do_nothing() {
    let host = HeadlessHost::with_canvas(Viewport::new(320, 240));
    let mut engine = Engine::new(host, EngineConfig::default().with_seed(3));
    engine.mount(Mode::Fragments).unwrap();
    for i in 1..=5 {
        engine.on_frame(i as f64 * STEP);
    }
    let pixels = engine.surface().unwrap().pixels().to_vec();
    let state = fragments(&engine);

    engine.visibility().set_intersecting(false);
    for i in 6..=30 {
        assert_eq!(engine.on_frame(i as f64 * STEP), FrameOutcome::Suspended);
        assert_eq!(engine.state(), LoopState::Suspended);
        // Still polling
        assert!(engine.host().pending_frame().is_some());
    }

    assert_eq!(engine.surface().unwrap().pixels(), pixels.as_slice());
    assert_eq!(fragments(&engine), state);
    assert_eq!(engine.stats().ticks(), 5);
    assert_eq!(engine.host().frames_rendered(), 5);
}

#[test]
fn test_suspended_makes_no_draw_calls() {
    let mut engine = recording_engine(Mode::Infinity);
    engine.on_frame(STEP);
    let draws = engine.surface().unwrap().draws();
    let clears = engine.surface().unwrap().clears();

    engine.visibility().set_document_visible(false);
    for i in 2..=12 {
        engine.on_frame(i as f64 * STEP);
    }
    assert_eq!(engine.surface().unwrap().draws(), draws);
    assert_eq!(engine.surface().unwrap().clears(), clears);
}

#[test]
fn test_resume_continues_from_suspension_onset() {
    let mut engine = recording_engine(Mode::Fragments);
    let mut now = 0.0;
    for _ in 0..10 {
        now += STEP;
        engine.on_frame(now);
    }
    let onset = fragments(&engine);

    let document = engine.visibility().document();
    document.set(false);
    for _ in 0..10 {
        now += STEP;
        assert_eq!(engine.on_frame(now), FrameOutcome::Suspended);
    }
    document.set(true);
    assert_eq!(fragments(&engine), onset);

    now += STEP;
    assert_eq!(engine.on_frame(now), FrameOutcome::Ticked);
    assert_eq!(engine.state(), LoopState::Running);
    assert_ne!(fragments(&engine), onset);
}

#[test]
fn test_frame_gate_caps_ticks() {
    let mut engine = recording_engine(Mode::Fragments);
    let mut ticks = 0;
    for i in 0..200 {
        if engine.on_frame(i as f64 * 5.0) == FrameOutcome::Ticked {
            ticks += 1;
        }
    }
    let total_time = 199.0 * 5.0;
    let interval = EngineConfig::default().frame_interval_ms();
    assert!(ticks as f64 <= (total_time / interval).ceil());
    assert_eq!(ticks, engine.stats().ticks());
    assert!(engine.stats().throttled() > 0);
}

#[test]
fn test_acquisition_failure_disables_engine() {
    let host = HeadlessHost::new(Viewport::new(640, 480), |_| -> Result<DrawRecorder, SurfaceError> {
        Err(SurfaceError::Unavailable("no 2d context".into()))
    });
    let mut engine = Engine::new(host, EngineConfig::default());
    let result = engine.mount(Mode::Fragments);

    assert!(matches!(result, Err(EngineError::Surface(SurfaceError::Unavailable(_)))));
    assert_eq!(engine.state(), LoopState::TornDown);
    assert_eq!(engine.host().frames_requested(), 0);
    assert_eq!(engine.host().subscription_count(), 0);
    assert_eq!(engine.on_frame(100.0), FrameOutcome::Inactive);
    assert!(engine.pool_state().is_none());
}

#[test]
fn test_missing_signal_degrades_gracefully() {
    let host = HeadlessHost::recording(Viewport::new(640, 480)).without_signal(HostSignal::Intersection);
    let mut engine = Engine::new(host, EngineConfig::default().with_seed(1));
    engine.mount(Mode::Fragments).unwrap();

    assert!(engine.is_listening(HostSignal::Resize));
    assert!(engine.is_listening(HostSignal::DocumentVisibility));
    assert!(!engine.is_listening(HostSignal::Intersection));
    assert_eq!(engine.on_frame(STEP), FrameOutcome::Ticked);
}

#[test]
fn test_draw_failure_drops_frame_only() {
    let mut engine = recording_engine(Mode::Fragments);
    engine.surface_mut().unwrap().fail_on_draw(3);

    assert_eq!(engine.on_frame(STEP), FrameOutcome::Dropped);
    assert_eq!(engine.stats().dropped(), 1);
    assert_eq!(engine.state(), LoopState::Running);
    assert!(engine.host().pending_frame().is_some());
    assert_eq!(engine.host().frames_rendered(), 0);

    assert_eq!(engine.on_frame(2.0 * STEP), FrameOutcome::Ticked);
    assert_eq!(engine.host().frames_rendered(), 1);
}

/// A canvas whose nth draw call fails after earlier draws have landed.
struct FlakyCanvas {
    canvas: Canvas,
    draws: u64,
    fail_at: Option<u64>,
}

impl FlakyCanvas {
    fn new(viewport: Viewport) -> Self {
        Self {
            canvas: Canvas::new(viewport.width, viewport.height),
            draws: 0,
            fail_at: None,
        }
    }

    fn count(&mut self) -> Result<(), SurfaceError> {
        let index = self.draws;
        self.draws += 1;
        if self.fail_at == Some(index) {
            return Err(SurfaceError::NonFinite("injected failure"));
        }
        Ok(())
    }
}

impl DrawSurface for FlakyCanvas {
    fn size(&self) -> Vec2 {
        self.canvas.size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.canvas.resize(width, height);
    }

    fn clear(&mut self) {
        self.canvas.clear();
    }

    fn save(&mut self) {
        self.canvas.save();
    }

    fn restore(&mut self) -> Result<(), SurfaceError> {
        self.canvas.restore()
    }

    fn translate(&mut self, offset: Vec2) {
        self.canvas.translate(offset);
    }

    fn rotate(&mut self, angle: f32) {
        self.canvas.rotate(angle);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, paint: Paint<'_>) -> Result<(), SurfaceError> {
        self.count()?;
        self.canvas.fill_circle(center, radius, paint)
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, paint: Paint<'_>) -> Result<(), SurfaceError> {
        self.count()?;
        self.canvas.fill_rect(origin, size, paint)
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, paint: Paint<'_>) -> Result<(), SurfaceError> {
        self.count()?;
        self.canvas.stroke_line(from, to, width, paint)
    }

    fn fill_text(&mut self, text: &str, center: Vec2, size: f32, color: Vec4) -> Result<(), SurfaceError> {
        self.count()?;
        self.canvas.fill_text(text, center, size, color)
    }
}

#[test]
fn test_dropped_frame_leaves_surface_clear() {
    let host = HeadlessHost::new(Viewport::new(320, 240), |viewport| Ok(FlakyCanvas::new(viewport)));
    let mut engine = Engine::new(host, EngineConfig::default().with_seed(5));
    engine.mount(Mode::Fragments).unwrap();
    assert_eq!(engine.on_frame(STEP), FrameOutcome::Ticked);
    assert!(!engine.surface().unwrap().canvas.is_blank());

    // Fail well into the next frame, after dozens of draws have landed
    let surface = engine.surface_mut().unwrap();
    surface.fail_at = Some(surface.draws + 40);
    assert_eq!(engine.on_frame(2.0 * STEP), FrameOutcome::Dropped);
    assert!(engine.surface().unwrap().canvas.is_blank());

    assert_eq!(engine.on_frame(3.0 * STEP), FrameOutcome::Ticked);
    assert!(!engine.surface().unwrap().canvas.is_blank());
}

#[test]
fn test_bad_frame_rate_disables_engine() {
    for fps in [0.0, -30.0, f32::NAN, f32::INFINITY] {
        let host = HeadlessHost::recording(Viewport::new(640, 480));
        let mut engine = Engine::new(host, EngineConfig::default().with_target_fps(fps));
        let result = engine.mount(Mode::Infinity);

        assert!(matches!(result, Err(EngineError::Config(ConfigError::Invalid(_)))), "fps={}", fps);
        assert_eq!(engine.state(), LoopState::TornDown);
        assert_eq!(engine.host().frames_requested(), 0);
        assert_eq!(engine.host().subscription_count(), 0);
        assert_eq!(engine.on_frame(1_000.0), FrameOutcome::Inactive);
    }
}

#[test]
fn test_teardown_cancels_and_unsubscribes() {
    let mut engine = recording_engine(Mode::Infinity);
    engine.on_frame(STEP);
    assert_eq!(engine.host().subscription_count(), 3);
    assert!(engine.host().pending_frame().is_some());

    engine.teardown();
    assert_eq!(engine.state(), LoopState::TornDown);
    assert_eq!(engine.host().pending_frame(), None);
    assert_eq!(engine.host().frames_cancelled(), 1);
    assert_eq!(engine.host().subscription_count(), 0);
    assert!(engine.pool_state().is_none());

    let requested = engine.host().frames_requested();
    assert_eq!(engine.on_frame(2.0 * STEP), FrameOutcome::Inactive);
    assert_eq!(engine.host().frames_requested(), requested);
}

#[test]
fn test_mode_switch_happens_between_ticks() {
    let mut engine = recording_engine(Mode::Fragments);
    engine.on_frame(STEP);

    engine.set_mode(Mode::Infinity);
    // Nothing changes until the next callback
    assert_eq!(engine.mode(), Mode::Fragments);
    assert_eq!(engine.pool_state().map(|s| s.len()), Some(50));

    assert_eq!(engine.on_frame(2.0 * STEP), FrameOutcome::Ticked);
    assert_eq!(engine.mode(), Mode::Infinity);
    assert_eq!(engine.pool_state().map(|s| s.len()), Some(800));
}

#[test]
fn test_loop_resize_moves_center_only() {
    let mut engine = recording_engine(Mode::Infinity);
    for i in 1..=5 {
        engine.on_frame(i as f64 * STEP);
    }
    let before = loop_particles(&engine);

    engine.host_mut().set_viewport(Viewport::new(1920, 1080));
    engine.on_resize(Viewport::new(1920, 1080));

    assert_eq!(engine.surface().unwrap().size(), Vec2::new(1920.0, 1080.0));
    let Some(PoolState::Loop { particles, geometry }) = engine.pool_state() else {
        panic!("expected loop pool");
    };
    assert_eq!(geometry.center, Vec2::new(960.0, 540.0));
    assert_eq!(particles.len(), before.len());
    for (now, then) in particles.iter().zip(&before) {
        assert_eq!(now.t, then.t);
        assert_eq!(now.depth_phase, then.depth_phase);
    }
    // Positions come from the new centre straight away
    let moved = particles[0].position(geometry);
    let projected = backdrop::projection::project(particles[0].t, particles[0].depth_phase, geometry);
    assert_eq!(moved, projected);
}

#[test]
fn test_resize_outside_frame_gate() {
    let mut engine = recording_engine(Mode::Fragments);
    engine.on_frame(STEP);
    let before = fragments(&engine);
    engine.on_resize(Viewport::new(400, 300));
    assert_eq!(engine.surface().unwrap().size(), Vec2::new(400.0, 300.0));
    // Positions are not rescaled
    assert_eq!(fragments(&engine), before);
}
