use std::fmt;
use std::time::Duration;

use crate::foundation::error::{ReelError, ReelResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Frame rate as the exact ratio `num/den` frames per second.
///
/// Both parts are non-zero; the only constructors are [`Fps::new`], [`Fps::integer`] and
/// deserialization, which all check that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "FpsParts")]
pub struct Fps {
    num: u32,
    den: u32,
}

#[derive(serde::Deserialize)]
struct FpsParts {
    num: u32,
    den: u32,
}

impl TryFrom<FpsParts> for Fps {
    type Error = ReelError;

    fn try_from(parts: FpsParts) -> ReelResult<Self> {
        Self::new(parts.num, parts.den)
    }
}

impl Fps {
    /// `num/den` frames per second.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if num == 0 || den == 0 {
            return Err(ReelError::validation(format!(
                "frame rate {num}/{den} must have a non-zero numerator and denominator"
            )));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate.
    pub fn integer(num: u32) -> ReelResult<Self> {
        Self::new(num, 1)
    }

    /// Frames.
    pub fn num(self) -> u32 {
        self.num
    }

    /// Seconds.
    pub fn den(self) -> u32 {
        self.den
    }

    /// Wall-clock length of one frame, rounded down to the nanosecond.
    pub fn frame_interval(self) -> Duration {
        let nanos = u128::from(self.den) * 1_000_000_000 / u128::from(self.num.max(1));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Session clock at `frames`.
    pub fn frames_to_secs(self, frames: u64) -> f64 {
        frames as f64 * f64::from(self.den) / f64::from(self.num)
    }

    /// Whole frames elapsed at `secs`; negative times map to 0.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * f64::from(self.num) / f64::from(self.den))
            .floor()
            .max(0.0) as u64
    }
}

impl Default for Fps {
    /// 30 frames per second.
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Drawing area in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Canvas with both sides non-zero.
    pub fn new(width: u32, height: u32) -> ReelResult<Self> {
        if width == 0 || height == 0 {
            return Err(ReelError::validation(format!(
                "canvas {width}x{height} must not be empty"
            )));
        }
        Ok(Self { width, height })
    }

    /// Pixels in one frame, the unit of the per-chunk pixel budget.
    pub fn pixels(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Paint color with red, green and blue already scaled by alpha.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red, scaled by alpha.
    pub r: u8,
    /// Green, scaled by alpha.
    pub g: u8,
    /// Blue, scaled by alpha.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully opaque color.
    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
