//! The contract between the engine and the environment that mounts it.
//!
//! The host owns the window or page: it knows the viewport, can hand out a
//! drawing surface, schedules frame callbacks and delivers resize and
//! visibility signals. [`FrameHost`] is that contract; the desktop viewer
//! implements it over winit, and [`HeadlessHost`] implements it in-process
//! for snapshots and tests.

use std::fmt;

use crate::canvas::Canvas;
use crate::error::{HostError, SurfaceError};
use crate::surface::{DrawRecorder, DrawSurface};

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether the viewport has no visible area.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Handle of a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Handle of a signal subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(pub u64);

/// Signals the engine listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostSignal {
    Resize,
    /// Document foregrounded or hidden.
    DocumentVisibility,
    /// Drawing surface on or off screen.
    Intersection,
}

impl HostSignal {
    pub const ALL: [HostSignal; 3] = [HostSignal::Resize, HostSignal::DocumentVisibility, HostSignal::Intersection];

    pub fn name(self) -> &'static str {
        match self {
            HostSignal::Resize => "resize",
            HostSignal::DocumentVisibility => "document visibility",
            HostSignal::Intersection => "intersection",
        }
    }
}

/// Services a host provides to the engine.
pub trait FrameHost {
    type Surface: DrawSurface;

    /// Current viewport size.
    fn viewport(&self) -> Viewport;

    /// Create the drawing surface, sized to `viewport`.
    fn acquire_surface(&mut self, viewport: Viewport) -> Result<Self::Surface, SurfaceError>;

    /// Schedule one frame callback.
    fn request_frame(&mut self) -> FrameRequest;

    /// Cancel a callback scheduled by [`request_frame`](Self::request_frame).
    fn cancel_frame(&mut self, request: FrameRequest);

    /// Start delivering `signal`.
    fn subscribe(&mut self, signal: HostSignal) -> Result<Subscription, HostError>;

    fn unsubscribe(&mut self, subscription: Subscription);

    /// Called with the surface after every accepted tick.
    fn frame_rendered(&mut self, _surface: &Self::Surface) {}
}

type SurfaceFactory<S> = Box<dyn FnMut(Viewport) -> Result<S, SurfaceError>>;

/// An in-process host with a virtual clock.
///
/// Surfaces come from a factory, so the same host drives a [`Canvas`] for
/// snapshots or a [`DrawRecorder`] for tests. Subscriptions and surface
/// acquisition can be made to fail.
pub struct HeadlessHost<S> {
    viewport: Viewport,
    factory: SurfaceFactory<S>,
    next_id: u64,
    pending: Option<FrameRequest>,
    requested: u64,
    cancelled: u64,
    subscriptions: Vec<(Subscription, HostSignal)>,
    unavailable: Vec<HostSignal>,
    rendered: u64,
}

impl<S: DrawSurface> HeadlessHost<S> {
    pub fn new<F>(viewport: Viewport, factory: F) -> Self
    where
        F: FnMut(Viewport) -> Result<S, SurfaceError> + 'static,
    {
        Self {
            viewport,
            factory: Box::new(factory),
            next_id: 0,
            pending: None,
            requested: 0,
            cancelled: 0,
            subscriptions: Vec::new(),
            unavailable: Vec::new(),
            rendered: 0,
        }
    }

    /// Make subscriptions to `signal` fail.
    pub fn without_signal(mut self, signal: HostSignal) -> Self {
        self.unavailable.push(signal);
        self
    }

    /// Change the viewport the host reports. The engine still has to be told
    /// through `Engine::on_resize`, as a real resize event would.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// The frame callback currently scheduled, if any.
    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Total frame callbacks ever requested.
    pub fn frames_requested(&self) -> u64 {
        self.requested
    }

    pub fn frames_cancelled(&self) -> u64 {
        self.cancelled
    }

    /// Number of `frame_rendered` notifications.
    pub fn frames_rendered(&self) -> u64 {
        self.rendered
    }

    pub fn is_subscribed(&self, signal: HostSignal) -> bool {
        self.subscriptions.iter().any(|(_, s)| *s == signal)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl HeadlessHost<Canvas> {
    /// A host that hands out CPU canvases.
    pub fn with_canvas(viewport: Viewport) -> Self {
        Self::new(viewport, |v| Ok(Canvas::new(v.width, v.height)))
    }
}

impl HeadlessHost<DrawRecorder> {
    /// A host that hands out recording surfaces.
    pub fn recording(viewport: Viewport) -> Self {
        Self::new(viewport, |v| Ok(DrawRecorder::new(v.width, v.height)))
    }
}

impl<S: DrawSurface> FrameHost for HeadlessHost<S> {
    type Surface = S;

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn acquire_surface(&mut self, viewport: Viewport) -> Result<S, SurfaceError> {
        (self.factory)(viewport)
    }

    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_id());
        self.pending = Some(request);
        self.requested += 1;
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
            self.cancelled += 1;
        }
    }

    fn subscribe(&mut self, signal: HostSignal) -> Result<Subscription, HostError> {
        if self.unavailable.contains(&signal) {
            return Err(HostError::SignalUnavailable(signal.name()));
        }
        let subscription = Subscription(self.next_id());
        self.subscriptions.push((subscription, signal));
        Ok(subscription)
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.subscriptions.retain(|(s, _)| *s != subscription);
    }

    fn frame_rendered(&mut self, _surface: &S) {
        self.rendered += 1;
    }
}
