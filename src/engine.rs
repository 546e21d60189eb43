//! The render loop controller.
//!
//! [`Engine`] ties a [`FrameHost`] to a simulation pool. It is a small state
//! machine:
//!
//! ```text
//!            mount                 gate hidden
//!   Idle ───────────▶ Running ◀───────────────▶ Suspended
//!     │                  │         gate visible      │
//!     │                  └──────────┬────────────────┘
//!     │ acquisition fails           │ teardown / drop
//!     └───────────────────────▶ TornDown ◀┘
//! ```
//!
//! Every frame callback is rescheduled while the engine is running or
//! suspended. A suspended callback only re-checks the visibility gate, so
//! resuming needs no extra event from the host. A running callback ticks the
//! pool only when the frame gate accepts its timestamp.
//!
//! Errors never escape a callback: a failed draw drops that frame and the
//! chain continues, a failed surface acquisition or an unusable config
//! disables the engine, and a signal the host cannot deliver is simply not
//! listened to.

use log::{debug, error, info, warn};

use crate::config::{EngineConfig, Mode};
use crate::error::EngineError;
use crate::gate::VisibilityGate;
use crate::host::{FrameHost, FrameRequest, HostSignal, Subscription, Viewport};
use crate::pool::{build_pool, PoolState, SimulationPool};
use crate::surface::DrawSurface;
use crate::time::{FrameGate, FrameStats};

/// Lifecycle state of an [`Engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// Created, not yet mounted.
    Idle,
    Running,
    /// Mounted but not visible. Callbacks keep coming; nothing is ticked.
    Suspended,
    /// Terminal. No further callbacks are scheduled.
    TornDown,
}

/// What a frame callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameOutcome {
    /// The pool was advanced and drawn.
    Ticked,
    /// Too soon after the last tick.
    Throttled,
    /// The gate reported not visible.
    Suspended,
    /// The tick failed to draw and the frame was discarded.
    Dropped,
    /// The engine is not mounted; nothing was rescheduled.
    Inactive,
}

/// Drives one pool on one host surface.
pub struct Engine<H: FrameHost> {
    host: H,
    config: EngineConfig,
    state: LoopState,
    mode: Mode,
    /// Mode requested since the last callback, applied before the next tick.
    pending_mode: Option<Mode>,
    surface: Option<H::Surface>,
    pool: Option<Box<dyn SimulationPool>>,
    gate: VisibilityGate,
    frame_gate: FrameGate,
    stats: FrameStats,
    pending_frame: Option<FrameRequest>,
    subscriptions: Vec<(HostSignal, Subscription)>,
}

impl<H: FrameHost> Engine<H> {
    pub fn new(host: H, config: EngineConfig) -> Self {
        let frame_gate = FrameGate::new(config.frame_interval_ms());
        Self {
            host,
            mode: config.mode,
            config,
            state: LoopState::Idle,
            pending_mode: None,
            surface: None,
            pool: None,
            gate: VisibilityGate::new(),
            frame_gate,
            stats: FrameStats::new(),
            pending_frame: None,
            subscriptions: Vec::new(),
        }
    }

    /// Acquire the surface, build the pool for `mode` and schedule the first
    /// frame.
    ///
    /// If the config is unusable or the surface cannot be acquired the
    /// engine tears itself down and stays inert; the error is returned for
    /// the caller to log, never retried.
    pub fn mount(&mut self, mode: Mode) -> Result<(), EngineError> {
        match self.state {
            LoopState::Idle => {}
            LoopState::TornDown => return Err(EngineError::TornDown),
            LoopState::Running | LoopState::Suspended => return Err(EngineError::AlreadyMounted),
        }

        if let Err(e) = self.config.validate() {
            error!("Backdrop disabled, bad config: {}", e);
            self.state = LoopState::TornDown;
            return Err(e.into());
        }

        let viewport = self.host.viewport();
        let surface = match self.host.acquire_surface(viewport) {
            Ok(surface) => surface,
            Err(e) => {
                error!("Backdrop disabled, no drawing surface: {}", e);
                self.state = LoopState::TornDown;
                return Err(e.into());
            }
        };

        self.mode = mode;
        self.surface = Some(surface);
        self.pool = Some(build_pool(mode, viewport, &self.config));

        for signal in HostSignal::ALL {
            match self.host.subscribe(signal) {
                Ok(subscription) => self.subscriptions.push((signal, subscription)),
                Err(e) => warn!("Continuing without {} signal: {}", signal.name(), e),
            }
        }

        self.frame_gate.reset();
        self.state = LoopState::Running;
        self.schedule();
        info!("Backdrop mounted in {:?} mode at {}", mode, viewport);
        Ok(())
    }

    /// Handle one frame callback at host time `now` (milliseconds).
    pub fn on_frame(&mut self, now: f64) -> FrameOutcome {
        if matches!(self.state, LoopState::Idle | LoopState::TornDown) {
            return FrameOutcome::Inactive;
        }
        self.pending_frame = None;

        if let Some(mode) = self.pending_mode.take() {
            self.switch_pool(mode);
        }

        if !self.gate.is_visible() {
            if self.state == LoopState::Running {
                debug!("Backdrop suspended");
                self.state = LoopState::Suspended;
            }
            self.stats.record_suspended();
            self.schedule();
            return FrameOutcome::Suspended;
        }
        if self.state == LoopState::Suspended {
            debug!("Backdrop resumed");
            self.state = LoopState::Running;
        }

        if !self.frame_gate.accept(now) {
            self.stats.record_throttled();
            self.schedule();
            return FrameOutcome::Throttled;
        }

        let outcome = self.tick();
        if let Some(fps) = self.stats.record_tick(now) {
            debug!(
                "Backdrop {:.1} fps, {} ticks, {} dropped",
                fps,
                self.stats.ticks(),
                self.stats.dropped()
            );
        }
        self.schedule();
        outcome
    }

    fn tick(&mut self) -> FrameOutcome {
        let (Some(surface), Some(pool)) = (self.surface.as_mut(), self.pool.as_mut()) else {
            return FrameOutcome::Dropped;
        };
        surface.clear();
        match pool.tick(surface) {
            Ok(()) => {
                self.host.frame_rendered(surface);
                FrameOutcome::Ticked
            }
            Err(e) => {
                warn!("Dropped backdrop frame: {}", e);
                surface.clear();
                self.stats.record_dropped();
                FrameOutcome::Dropped
            }
        }
    }

    fn schedule(&mut self) {
        self.pending_frame = Some(self.host.request_frame());
    }

    fn switch_pool(&mut self, mode: Mode) {
        if let Some(mut pool) = self.pool.take() {
            pool.teardown();
        }
        let viewport = self.host.viewport();
        self.pool = Some(build_pool(mode, viewport, &self.config));
        self.mode = mode;
        self.frame_gate.reset();
        info!("Backdrop switched to {:?} mode", mode);
    }

    /// Request a different mode. The old pool is replaced at the start of
    /// the next frame callback, never during a tick.
    pub fn set_mode(&mut self, mode: Mode) {
        match self.state {
            LoopState::Idle => self.mode = mode,
            LoopState::TornDown => {}
            LoopState::Running | LoopState::Suspended => {
                self.pending_mode = (mode != self.mode).then_some(mode);
            }
        }
    }

    /// Resize the surface right away, outside the frame gate. Particle state
    /// is left as is.
    pub fn on_resize(&mut self, viewport: Viewport) {
        if matches!(self.state, LoopState::Idle | LoopState::TornDown) {
            return;
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(viewport.width, viewport.height);
        }
        if let Some(pool) = self.pool.as_mut() {
            pool.resize(viewport);
        }
        debug!("Backdrop resized to {}", viewport);
    }

    /// Cancel the pending callback, drop every subscription and discard the
    /// pool. Idempotent.
    pub fn teardown(&mut self) {
        if self.state == LoopState::TornDown {
            return;
        }
        if let Some(request) = self.pending_frame.take() {
            self.host.cancel_frame(request);
        }
        for (_, subscription) in self.subscriptions.drain(..) {
            self.host.unsubscribe(subscription);
        }
        if let Some(mut pool) = self.pool.take() {
            pool.teardown();
        }
        self.pending_mode = None;
        self.state = LoopState::TornDown;
        info!("Backdrop torn down");
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Mode of the live pool.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The visibility gate. Hosts clone its signal handles and flip them as
    /// their events arrive.
    pub fn visibility(&self) -> &VisibilityGate {
        &self.gate
    }

    /// Whether the engine holds a live subscription to `signal`.
    pub fn is_listening(&self, signal: HostSignal) -> bool {
        self.subscriptions.iter().any(|(s, _)| *s == signal)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn surface(&self) -> Option<&H::Surface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut H::Surface> {
        self.surface.as_mut()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Particles of the live pool, if mounted.
    pub fn pool_state(&self) -> Option<PoolState<'_>> {
        self.pool.as_ref().map(|pool| pool.state())
    }
}

impl<H: FrameHost> Drop for Engine<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use crate::surface::DrawRecorder;

    fn engine() -> Engine<HeadlessHost<DrawRecorder>> {
        let host = HeadlessHost::recording(Viewport::new(640, 480));
        Engine::new(host, EngineConfig::default().with_seed(1))
    }

    #[test]
    fn test_idle_ignores_callbacks() {
        let mut engine = engine();
        assert_eq!(engine.on_frame(100.0), FrameOutcome::Inactive);
        assert_eq!(engine.host().frames_requested(), 0);
    }

    #[test]
    fn test_mount_schedules_and_subscribes() {
        let mut engine = engine();
        engine.mount(Mode::Fragments).unwrap();
        assert_eq!(engine.state(), LoopState::Running);
        assert!(engine.host().pending_frame().is_some());
        assert_eq!(engine.host().subscription_count(), 3);
        assert_eq!(engine.pool_state().map(|s| s.len()), Some(50));
        assert!(matches!(engine.mount(Mode::Fragments), Err(EngineError::AlreadyMounted)));
    }

    #[test]
    fn test_tick_clears_then_draws() {
        let mut engine = engine();
        engine.mount(Mode::Infinity).unwrap();
        assert_eq!(engine.on_frame(20.0), FrameOutcome::Ticked);
        let surface = engine.surface().unwrap();
        assert_eq!(surface.clears(), 1);
        assert!(surface.draws() > 0);
        assert_eq!(engine.host().frames_rendered(), 1);
    }

    #[test]
    fn test_set_mode_before_mount() {
        let mut engine = engine();
        engine.set_mode(Mode::Infinity);
        assert_eq!(engine.mode(), Mode::Infinity);
    }

    #[test]
    fn test_drop_tears_down() {
        let mut engine = engine();
        engine.mount(Mode::Fragments).unwrap();
        engine.teardown();
        engine.teardown();
        assert_eq!(engine.host().frames_cancelled(), 1);
        assert!(matches!(engine.mount(Mode::Fragments), Err(EngineError::TornDown)));
    }
}
