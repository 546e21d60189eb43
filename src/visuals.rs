//! Colours and palettes for both backdrop modes.
//!
//! Colours are stored as 8-bit RGB triples, matching how the palettes are
//! authored, and converted to normalized straight-alpha [`Vec4`] paints at
//! draw time.

use glam::Vec4;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Normalized colour with the given alpha, clamped to `[0, 1]`.
    ///
    /// Negative or oversized opacities are common in the falloff math and are
    /// clamped the same way a canvas clamps `rgba()` strings.
    #[inline]
    pub fn with_alpha(self, alpha: f32) -> Vec4 {
        rgba(self.r as f32, self.g as f32, self.b as f32, alpha)
    }
}

/// Build a normalized colour from channel values in `0..=255`.
///
/// Channels are clamped to 255, so brightness boosts can overshoot freely.
#[inline]
pub fn rgba(r: f32, g: f32, b: f32, alpha: f32) -> Vec4 {
    Vec4::new(
        r.clamp(0.0, 255.0) / 255.0,
        g.clamp(0.0, 255.0) / 255.0,
        b.clamp(0.0, 255.0) / 255.0,
        if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) },
    )
}

/// Fully transparent white, the outer stop of every glow.
pub const TRANSPARENT: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.0);

/// The fixed named palette of fragment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragmentColor {
    /// Electric blue (100, 180, 255).
    ElectricBlue,
    /// Soft purple (180, 140, 255).
    SoftPurple,
    /// Mint cyan (120, 220, 200).
    MintCyan,
    /// Coral pink (255, 150, 180).
    CoralPink,
    /// Pearl white (240, 245, 255).
    PearlWhite,
}

impl FragmentColor {
    pub const ALL: [FragmentColor; 5] = [
        FragmentColor::ElectricBlue,
        FragmentColor::SoftPurple,
        FragmentColor::MintCyan,
        FragmentColor::CoralPink,
        FragmentColor::PearlWhite,
    ];

    pub fn rgb(self) -> Rgb {
        match self {
            FragmentColor::ElectricBlue => Rgb::new(100, 180, 255),
            FragmentColor::SoftPurple => Rgb::new(180, 140, 255),
            FragmentColor::MintCyan => Rgb::new(120, 220, 200),
            FragmentColor::CoralPink => Rgb::new(255, 150, 180),
            FragmentColor::PearlWhite => Rgb::new(240, 245, 255),
        }
    }

    /// Uniform draw over the palette.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Colours of the infinity loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopPalette {
    /// Base particle colour, the start of the colour sweep.
    pub dot: Rgb,
    /// Glow colour, the end of the colour sweep.
    pub glow: Rgb,
    pub trail: Rgb,
    pub flare: Rgb,
}

impl Default for LoopPalette {
    fn default() -> Self {
        Self {
            dot: Rgb::new(125, 90, 255),
            glow: Rgb::new(90, 210, 255),
            trail: Rgb::WHITE,
            flare: Rgb::WHITE,
        }
    }
}
