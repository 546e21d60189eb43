//! Error types for the backdrop engine.
//!
//! Errors are grouped by who raises them: the drawing surface, the host
//! environment, the engine lifecycle, configuration loading and the
//! desktop presenter.

use std::fmt;

/// Errors raised by a [`DrawSurface`](crate::surface::DrawSurface).
///
/// These abort the current frame only; the engine drops the frame and
/// keeps scheduling.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceError {
    /// A coordinate, radius or width was NaN or infinite.
    NonFinite(&'static str),
    /// A radius or width was negative.
    NegativeExtent(&'static str),
    /// The surface has no glyph for this character.
    UnsupportedGlyph(char),
    /// `restore` was called without a matching `save`.
    UnbalancedRestore,
    /// The drawing context could not be created.
    Unavailable(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::NonFinite(what) => write!(f, "Non-finite {} passed to drawing surface", what),
            SurfaceError::NegativeExtent(what) => write!(f, "Negative {} passed to drawing surface", what),
            SurfaceError::UnsupportedGlyph(c) => write!(f, "No glyph for character {:?}", c),
            SurfaceError::UnbalancedRestore => write!(f, "restore() called without a matching save()"),
            SurfaceError::Unavailable(msg) => write!(f, "Drawing surface unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SurfaceError {}

/// Errors raised by the host environment when wiring up signals.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The host cannot deliver this signal.
    SignalUnavailable(&'static str),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::SignalUnavailable(name) => write!(f, "Host signal unavailable: {}", name),
        }
    }
}

impl std::error::Error for HostError {}

/// Errors returned by [`Engine`](crate::engine::Engine) lifecycle calls.
#[derive(Debug)]
pub enum EngineError {
    /// Surface acquisition failed; the engine has disabled itself.
    Surface(SurfaceError),
    /// The config failed validation at mount; the engine has disabled itself.
    Config(ConfigError),
    /// `mount` was called on an engine that is not idle.
    AlreadyMounted,
    /// The engine was torn down and cannot be reused.
    TornDown,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Surface(e) => write!(f, "Engine disabled: {}", e),
            EngineError::Config(e) => write!(f, "Engine disabled: {}", e),
            EngineError::AlreadyMounted => write!(f, "Engine is already mounted"),
            EngineError::TornDown => write!(f, "Engine has been torn down"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Surface(e) => Some(e),
            EngineError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SurfaceError> for EngineError {
    fn from(e: SurfaceError) -> Self {
        EngineError::Surface(e)
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Config(e)
    }
}

/// Errors that can occur while loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the file from disk.
    Io(std::io::Error),
    /// The file is not valid configuration JSON.
    Parse(serde_json::Error),
    /// A value is out of its accepted range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Errors that can occur while setting up the wgpu presenter.
#[derive(Debug)]
pub enum PresentError {
    /// Failed to create a surface for the window.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
}

impl fmt::Display for PresentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresentError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            PresentError::NoAdapter => write!(f, "No compatible GPU adapter found"),
            PresentError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
        }
    }
}

impl std::error::Error for PresentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PresentError::SurfaceCreation(e) => Some(e),
            PresentError::DeviceCreation(e) => Some(e),
            PresentError::NoAdapter => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for PresentError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        PresentError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for PresentError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        PresentError::DeviceCreation(e)
    }
}
