//! Block colours: RGBA values and the four-stop gradient keyed by score.

/// 8-bit RGBA colour, the same layout a mesh stores per vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Linear interpolation per channel; `t` is clamped to [0, 1].
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// Blend this colour over `background` using its alpha.
    pub fn over(self, background: Self) -> Self {
        background.lerp(self.with_alpha(255), self.a as f32 / 255.0).with_alpha(255)
    }
}

/// Width of each gradient segment.
const SEGMENT: f32 = 1.0 / 3.0;

/// Four-stop piecewise-linear gradient. Inputs below zero clamp to the first stop.
pub fn gradient(stops: &[Rgba; 4], t: f32) -> Rgba {
    if t < SEGMENT {
        stops[0].lerp(stops[1], t / SEGMENT)
    } else if t < 2.0 * SEGMENT {
        stops[1].lerp(stops[2], (t - SEGMENT) / SEGMENT)
    } else {
        stops[2].lerp(stops[3], (t - 2.0 * SEGMENT) / SEGMENT)
    }
}

/// Colour of a block that becomes current at `score`.
pub fn color_for_score(stops: &[Rgba; 4], score: u32, multiplier: f32) -> Rgba {
    gradient(stops, (score as f32 * multiplier).sin())
}
