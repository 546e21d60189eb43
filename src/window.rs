//! Desktop viewer.
//!
//! Mounts the engine in a winit window. The window plays the host: redraw
//! requests are the frame callbacks, `Resized` is the resize signal, a zero
//! area or minimised window clears the intersection signal and
//! `Occluded` stands in for document visibility. Each accepted tick is
//! presented through [`Presenter`].
//!
//! A frame request only marks a callback as wanted. The redraw itself is
//! issued from `about_to_wait` once the [`FramePacer`] deadline has passed,
//! and the event loop sleeps until then, so throttled and suspended
//! callbacks never busy-wait.

use std::sync::Arc;
use std::time::Instant;

use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::canvas::Canvas;
use crate::config::{EngineConfig, Mode};
use crate::engine::Engine;
use crate::error::{HostError, SurfaceError};
use crate::gpu::{Presenter, DARK_BACKGROUND, LIGHT_BACKGROUND};
use crate::host::{FrameHost, FrameRequest, HostSignal, Subscription, Viewport};
use crate::time::FramePacer;

/// A [`FrameHost`] backed by a window.
pub struct WindowHost {
    window: Arc<Window>,
    presenter: Presenter,
    next_id: u64,
    pending: Option<FrameRequest>,
    subscriptions: Vec<(Subscription, HostSignal)>,
    /// Set when presenting failed in a way the viewer cannot recover from.
    fatal: bool,
}

impl WindowHost {
    pub fn new(window: Arc<Window>, presenter: Presenter) -> Self {
        Self {
            window,
            presenter,
            next_id: 0,
            pending: None,
            subscriptions: Vec::new(),
            fatal: false,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn is_subscribed(&self, signal: HostSignal) -> bool {
        self.subscriptions.iter().any(|(_, s)| *s == signal)
    }

    /// Consume the pending frame request. A redraw without one was not asked
    /// for by the engine and is not a frame callback.
    pub fn take_frame(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.presenter.resize(size.width, size.height);
    }

    pub fn set_background(&mut self, mode: Mode) {
        self.presenter.set_background(match mode {
            Mode::Fragments => LIGHT_BACKGROUND,
            Mode::Infinity => DARK_BACKGROUND,
        });
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl FrameHost for WindowHost {
    type Surface = Canvas;

    fn viewport(&self) -> Viewport {
        let size = self.window.inner_size();
        Viewport::new(size.width, size.height)
    }

    fn acquire_surface(&mut self, viewport: Viewport) -> Result<Canvas, SurfaceError> {
        Ok(Canvas::new(viewport.width, viewport.height))
    }

    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_id());
        self.pending = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }

    fn subscribe(&mut self, signal: HostSignal) -> Result<Subscription, HostError> {
        let subscription = Subscription(self.next_id());
        self.subscriptions.push((subscription, signal));
        Ok(subscription)
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscriptions.retain(|(s, _)| *s != subscription);
    }

    fn frame_rendered(&mut self, canvas: &Canvas) {
        match self.presenter.present(canvas) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => self.presenter.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("Out of GPU memory while presenting");
                self.fatal = true;
            }
            Err(e) => warn!("Present error: {:?}", e),
        }
    }
}

/// The viewer application.
pub struct App {
    config: EngineConfig,
    engine: Option<Engine<WindowHost>>,
    start: Instant,
    pacer: FramePacer,
    /// When to issue the next frame callback.
    wake: Option<Instant>,
}

impl App {
    pub fn new(config: EngineConfig) -> Self {
        let pacer = FramePacer::new(config.frame_interval_ms(), FramePacer::DEFAULT_IDLE_POLL);
        Self {
            config,
            engine: None,
            start: Instant::now(),
            pacer,
            wake: None,
        }
    }

    /// Host clock in milliseconds at `instant`.
    fn millis(&self, instant: Instant) -> f64 {
        instant.saturating_duration_since(self.start).as_secs_f64() * 1000.0
    }

    /// Issue the next callback as soon as possible, as after becoming
    /// visible again.
    fn wake_now(&mut self) {
        self.pacer.reset();
        self.wake = Some(Instant::now());
    }

    fn shut_down(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(engine) = self.engine.as_mut() {
            engine.teardown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("Backdrop")
            .with_inner_size(LogicalSize::new(1280, 720));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let presenter = match pollster::block_on(Presenter::new(window.clone())) {
            Ok(presenter) => presenter,
            Err(e) => {
                error!("{}", e);
                event_loop.exit();
                return;
            }
        };

        let mut host = WindowHost::new(window, presenter);
        host.set_background(self.config.mode);
        let mut engine = Engine::new(host, self.config.clone());
        if let Err(e) = engine.mount(self.config.mode) {
            error!("{}", e);
            event_loop.exit();
            return;
        }
        self.engine = Some(engine);
        self.wake_now();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let instant = Instant::now();
        let now = self.millis(instant);
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.shut_down(event_loop),
            WindowEvent::Resized(size) => {
                engine.host_mut().resize(size);
                let viewport = Viewport::new(size.width, size.height);
                let mut shown = false;
                if engine.host().is_subscribed(HostSignal::Intersection) {
                    let minimized = engine.host().window().is_minimized().unwrap_or(false);
                    let intersecting = !viewport.is_empty() && !minimized;
                    shown = intersecting && !engine.visibility().is_visible();
                    engine.visibility().set_intersecting(intersecting);
                }
                if engine.host().is_subscribed(HostSignal::Resize) {
                    engine.on_resize(viewport);
                }
                if shown {
                    self.wake_now();
                }
            }
            WindowEvent::Occluded(occluded) => {
                if engine.host().is_subscribed(HostSignal::DocumentVisibility) {
                    engine.visibility().set_document_visible(!occluded);
                }
                if !occluded {
                    self.wake_now();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => self.shut_down(event_loop),
                KeyCode::KeyM => {
                    let mode = engine.mode().toggled();
                    info!("Switching to {:?} mode", mode);
                    engine.set_mode(mode);
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                if engine.host_mut().take_frame() {
                    let outcome = engine.on_frame(now);
                    let mode = engine.mode();
                    engine.host_mut().set_background(mode);
                    self.wake = self.pacer.next_deadline(outcome, instant);
                }
                if engine.host().is_fatal() {
                    self.shut_down(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        match self.wake {
            Some(deadline) if engine.host().has_pending_frame() => {
                let now = Instant::now();
                if now >= deadline {
                    engine.host().window().request_redraw();
                    // Ask again if the platform swallows this redraw
                    let retry = now + FramePacer::DEFAULT_IDLE_POLL;
                    self.wake = Some(retry);
                    event_loop.set_control_flow(ControlFlow::WaitUntil(retry));
                } else {
                    event_loop.set_control_flow(ControlFlow::WaitUntil(deadline));
                }
            }
            _ => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

/// Open the viewer and block until it is closed.
pub fn run(config: EngineConfig) -> Result<(), winit::error::EventLoopError> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)
}
