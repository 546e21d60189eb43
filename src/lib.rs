//! # Backdrop - ambient particle animation engine
//!
//! A real-time particle simulation meant to run behind an application's UI,
//! painted onto a 2D drawing surface. Two mutually exclusive modes:
//!
//! - **Fragments**: drifting data fragments (glowing points, binary streams
//!   and rotating pixel clusters) that attract their neighbours and are
//!   joined to them by fading edges.
//! - **Infinity**: hundreds of particles streaming along a tilted,
//!   perspective-projected figure-eight, with depth shading, lens flares
//!   and short trails.
//!
//! The engine paces itself to a target frame rate and suspends while its
//! surface is off screen or the host is in the background.
//!
//! ## Quick Start
//!
//! ```
//! use backdrop::prelude::*;
//!
//! let host = HeadlessHost::with_canvas(Viewport::new(320, 200));
//! let config = EngineConfig::default().with_seed(7);
//! let mut engine = Engine::new(host, config);
//! engine.mount(Mode::Infinity).unwrap();
//!
//! // Host frame callbacks, in milliseconds
//! for i in 1..=3 {
//!     engine.on_frame(i as f64 * 20.0);
//! }
//! assert_eq!(engine.stats().ticks(), 3);
//! assert!(!engine.surface().unwrap().is_blank());
//! ```
//!
//! ## Architecture
//!
//! | Module | Role |
//! |--------|------|
//! | [`projection`] | Pure loop geometry: `(t, depth phase)` to screen |
//! | [`fragment`], [`infinity`] | Particle models, one per mode |
//! | [`pool`] | The particles of the active mode, stepped per tick |
//! | [`engine`] | Render loop controller and its state machine |
//! | [`gate`] | Visibility signals folded into one decision |
//! | [`time`] | Frame-rate gate and frame statistics |
//! | [`surface`], [`canvas`] | Drawing surface trait and CPU rasteriser |
//! | [`host`] | What the embedding environment provides |
//! | [`window`], [`gpu`] | Desktop viewer over winit and wgpu |

pub mod canvas;
pub mod config;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod gate;
pub mod gpu;
pub mod host;
pub mod infinity;
pub mod pool;
pub mod projection;
pub mod surface;
pub mod time;
pub mod visuals;
pub mod window;

pub use canvas::Canvas;
pub use config::{EngineConfig, FragmentConfig, LoopConfig, Mode};
pub use engine::{Engine, FrameOutcome, LoopState};
pub use error::{ConfigError, EngineError, HostError, PresentError, SurfaceError};
pub use gate::VisibilityGate;
pub use glam::{Vec2, Vec4};
pub use host::{FrameHost, HeadlessHost, HostSignal, Viewport};
pub use pool::{build_pool, PoolState, SimulationPool};
pub use surface::{DrawRecorder, DrawSurface, Paint};

/// Convenient re-exports for common usage.
///
/// ```
/// use backdrop::prelude::*;
/// ```
pub mod prelude {
    pub use crate::canvas::Canvas;
    pub use crate::config::{EngineConfig, FragmentConfig, LoopConfig, Mode};
    pub use crate::engine::{Engine, FrameOutcome, LoopState};
    pub use crate::host::{FrameHost, HeadlessHost, HostSignal, Viewport};
    pub use crate::pool::{PoolState, SimulationPool};
    pub use crate::surface::{DrawRecorder, DrawSurface};
    pub use crate::{Vec2, Vec4};
}
