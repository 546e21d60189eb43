//! Engine configuration.
//!
//! Every tunable of both modes lives here with the defaults the backdrop
//! ships with. Configs are plain data: build them with the `with_*` methods
//! or load them from JSON, where missing fields fall back to defaults.
//!
//! ```json
//! {
//!   "mode": "infinity",
//!   "target_fps": 60,
//!   "seed": 42,
//!   "infinity": { "trail_length": 8 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::visuals::LoopPalette;

/// Which simulation runs.
///
/// Supplied by the theme preference: the light theme shows fragments, the
/// dark theme shows the infinity loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Drifting data fragments with connection edges (mode A).
    #[default]
    #[serde(alias = "a", alias = "A", alias = "light")]
    #[value(aliases = ["a", "light"])]
    Fragments,
    /// Particles streaming along a tilted figure-eight (mode B).
    #[serde(alias = "b", alias = "B", alias = "dark")]
    #[value(aliases = ["b", "dark"])]
    Infinity,
}

impl Mode {
    /// The other mode.
    pub fn toggled(self) -> Self {
        match self {
            Mode::Fragments => Mode::Infinity,
            Mode::Infinity => Mode::Fragments,
        }
    }
}

/// Fragment mode tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentConfig {
    pub count: usize,
    /// Fragments closer than this are joined by an edge.
    pub connection_distance: f32,
    /// Fragments closer than this attract each other.
    pub attraction_distance: f32,
    /// Velocity impulse per frame towards each nearby fragment.
    pub attraction: f32,
    /// Multiplicative velocity decay per frame.
    pub damping: f32,
    /// Probability per frame of a random disperse kick.
    pub disperse_chance: f32,
    /// Half-range of the disperse kick per axis.
    pub disperse_strength: f32,
    /// Half-range of the initial velocity per axis.
    pub initial_speed: f32,
    pub size_min: f32,
    pub size_max: f32,
    /// Half-range of the cluster rotation speed in radians per frame.
    pub rotation_speed: f32,
    /// Pulse phase advance in radians per frame.
    pub pulse_rate: f32,
    /// Edge opacity at zero distance.
    pub edge_alpha: f32,
    pub edge_width: f32,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            count: 50,
            connection_distance: 180.0,
            attraction_distance: 120.0,
            attraction: 0.002,
            damping: 0.99,
            disperse_chance: 0.002,
            disperse_strength: 1.0,
            initial_speed: 0.75,
            size_min: 20.0,
            size_max: 60.0,
            rotation_speed: 0.01,
            pulse_rate: 0.05,
            edge_alpha: 0.2,
            edge_width: 0.8,
        }
    }
}

/// Infinity loop tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Population on viewports narrower than `compact_breakpoint`.
    pub compact_count: usize,
    pub count: usize,
    pub compact_breakpoint: u32,
    pub dot_size_min: f32,
    pub dot_size_max: f32,
    /// Loop width as a fraction of the viewport width, capped by `max_width`.
    pub width_ratio: f32,
    pub max_width: f32,
    /// Loop height as a fraction of the viewport height, capped by `max_height`.
    pub height_ratio: f32,
    pub max_height: f32,
    pub curve_divisor: f32,
    /// Range of the parametric speed in radians per frame.
    pub speed_min: f32,
    pub speed_max: f32,
    /// Depth phase advance in radians per frame.
    pub depth_rate: f32,
    pub flare_rate_min: f32,
    pub flare_rate_max: f32,
    pub flare_intensity_min: f32,
    pub flare_intensity_max: f32,
    /// `sin(flare_phase)` above this flares.
    pub flare_threshold: f32,
    pub glow_radius: f32,
    pub trail_length: usize,
    pub depth_scale: f32,
    pub z_lift: f32,
    pub tilt_deg: f32,
    pub perspective_deg: f32,
    pub palette: LoopPalette,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            compact_count: 400,
            count: 800,
            compact_breakpoint: 768,
            dot_size_min: 3.0,
            dot_size_max: 8.0,
            width_ratio: 0.7,
            max_width: 900.0,
            height_ratio: 0.5,
            max_height: 500.0,
            curve_divisor: 1.2,
            speed_min: 0.0003,
            speed_max: 0.0015,
            depth_rate: 0.008,
            flare_rate_min: 0.02,
            flare_rate_max: 0.05,
            flare_intensity_min: 0.3,
            flare_intensity_max: 1.0,
            flare_threshold: 0.85,
            glow_radius: 20.0,
            trail_length: 5,
            depth_scale: 0.6,
            z_lift: 100.0,
            tilt_deg: 15.0,
            perspective_deg: 25.0,
            palette: LoopPalette::default(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Mode used at mount when the host does not supply one.
    pub mode: Mode,
    /// Upper bound on accepted ticks per second.
    pub target_fps: f32,
    /// Seed for particle construction and disperse kicks. `None` seeds from
    /// entropy, so every mount looks different.
    pub seed: Option<u64>,
    pub fragments: FragmentConfig,
    pub infinity: LoopConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            target_fps: 60.0,
            seed: None,
            fragments: FragmentConfig::default(),
            infinity: LoopConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_target_fps(mut self, fps: f32) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fragments(mut self, fragments: FragmentConfig) -> Self {
        self.fragments = fragments;
        self
    }

    pub fn with_infinity(mut self, infinity: LoopConfig) -> Self {
        self.infinity = infinity;
        self
    }

    /// Minimum time between accepted ticks, in milliseconds.
    pub fn frame_interval_ms(&self) -> f64 {
        1000.0 / self.target_fps as f64
    }

    /// Parse a JSON config.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(ConfigError::Invalid(format!("target_fps must be positive, got {}", self.target_fps)));
        }
        let f = &self.fragments;
        if !(f.size_min > 0.0 && f.size_min <= f.size_max) {
            return Err(ConfigError::Invalid("fragments: need 0 < size_min <= size_max".into()));
        }
        if !(0.0..=1.0).contains(&f.damping) {
            return Err(ConfigError::Invalid("fragments: damping must be in [0, 1]".into()));
        }
        if f.connection_distance <= 0.0 {
            return Err(ConfigError::Invalid("fragments: connection_distance must be positive".into()));
        }
        let l = &self.infinity;
        if !(l.speed_min >= 0.0 && l.speed_min <= l.speed_max) {
            return Err(ConfigError::Invalid("infinity: need 0 <= speed_min <= speed_max".into()));
        }
        if !(l.dot_size_min > 0.0 && l.dot_size_min <= l.dot_size_max) {
            return Err(ConfigError::Invalid("infinity: need 0 < dot_size_min <= dot_size_max".into()));
        }
        if l.trail_length == 0 {
            return Err(ConfigError::Invalid("infinity: trail_length must be at least 1".into()));
        }
        if !(l.flare_threshold < 1.0) || l.curve_divisor <= 0.0 {
            return Err(ConfigError::Invalid("infinity: flare_threshold must be < 1 and curve_divisor > 0".into()));
        }
        Ok(())
    }
}
