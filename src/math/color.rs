//! RGB color samples and the redmean perceptual distance
//!
//! The distance is a ranking score rather than a true metric: light sample pairs
//! receive a fixed handicap so they rank closer than their raw distance, since the
//! eye separates dark tones more readily than light ones.

use crate::io::configuration::{BRIGHTNESS_THRESHOLD, LIGHT_HANDICAP};
use image::Rgba;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// A single 8-bit RGBA color sample
///
/// Alpha is carried through persistence and compositing but never contributes
/// to distance scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorSample {
    /// Red intensity
    pub r: u8,
    /// Green intensity
    pub g: u8,
    /// Blue intensity
    pub b: u8,
    /// Alpha (opacity), ignored for distance
    pub a: u8,
}

impl ColorSample {
    /// Create an opaque sample
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: u8::MAX }
    }

    /// Create a sample with explicit alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Sum of the red, green and blue channels
    pub const fn brightness(self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }

    /// Channels as an `[r, g, b, a]` array
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Rgba<u8>> for ColorSample {
    fn from(pixel: Rgba<u8>) -> Self {
        let [r, g, b, a] = pixel.0;
        Self { r, g, b, a }
    }
}

impl From<ColorSample> for Rgba<u8> {
    fn from(sample: ColorSample) -> Self {
        Self(sample.to_array())
    }
}

impl Serialize for ColorSample {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

// Accepts both RGB triples and RGBA quadruples
impl<'de> Deserialize<'de> for ColorSample {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let channels = Vec::<u8>::deserialize(deserializer)?;
        match *channels.as_slice() {
            [r, g, b] => Ok(Self::rgb(r, g, b)),
            [r, g, b, a] => Ok(Self::rgba(r, g, b, a)),
            _ => Err(de::Error::invalid_length(
                channels.len(),
                &"3 or 4 color channels",
            )),
        }
    }
}

/// Perceptual distance between two samples
///
/// Redmean weighted Euclidean approximation in RGB space, computed with integer
/// channel arithmetic. Pairs whose combined RGB sum exceeds
/// [`BRIGHTNESS_THRESHOLD`] score [`LIGHT_HANDICAP`] lower. The result is
/// symmetric and may be negative for light pairs.
pub fn distance(a: ColorSample, b: ColorSample) -> f64 {
    let handicap = if a.brightness() + b.brightness() > BRIGHTNESS_THRESHOLD {
        LIGHT_HANDICAP
    } else {
        0.0
    };

    let r_mean = (i32::from(a.r) + i32::from(b.r)) / 2;
    let r_diff = i32::from(a.r) - i32::from(b.r);
    let g_diff = i32::from(a.g) - i32::from(b.g);
    let b_diff = i32::from(a.b) - i32::from(b.b);

    let weighted = (((512 + r_mean) * r_diff * r_diff) >> 8)
        + 4 * g_diff * g_diff
        + (((767 - r_mean) * b_diff * b_diff) >> 8);

    f64::from(weighted).sqrt() - handicap
}

