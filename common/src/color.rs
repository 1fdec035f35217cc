use serde::Serialize;

pub const TEMP_COLOR_MIN: f32 = -10.0;
pub const TEMP_COLOR_THRESHOLD: f32 = 18.0;
pub const TEMP_COLOR_MAX: f32 = 50.0;

pub const COLOR_COLD_MIN: Rgb = Rgb::new(7, 14, 136);
pub const COLOR_COLD_MAX: Rgb = Rgb::new(0, 247, 255);
pub const COLOR_WARM_MIN: Rgb = Rgb::new(255, 217, 0);
pub const COLOR_WARM_MAX: Rgb = Rgb::new(255, 0, 171);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Strip colour for a temperature: deep blue to cyan below 18 °C, yellow to
/// magenta from 18 °C up. Out-of-range temperatures stick to the end colours.
pub fn temperature_color(temp: f32) -> Rgb {
    if temp >= TEMP_COLOR_THRESHOLD {
        interpolate(
            temp,
            TEMP_COLOR_THRESHOLD,
            TEMP_COLOR_MAX,
            COLOR_WARM_MIN,
            COLOR_WARM_MAX,
        )
    } else {
        interpolate(
            temp,
            TEMP_COLOR_MIN,
            TEMP_COLOR_THRESHOLD,
            COLOR_COLD_MIN,
            COLOR_COLD_MAX,
        )
    }
}

pub fn interpolate(value: f32, min: f32, max: f32, low: Rgb, high: Rgb) -> Rgb {
    let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
    // NaN saturates to 0 in the cast.
    let frac = (ratio * 255.0) as u8;

    Rgb {
        r: lerp8(low.r, high.r, frac),
        g: lerp8(low.g, high.g, frac),
        b: lerp8(low.b, high.b, frac),
    }
}

fn lerp8(a: u8, b: u8, frac: u8) -> u8 {
    if b >= a {
        a + scale8(b - a, frac)
    } else {
        a - scale8(a - b, frac)
    }
}

/// `i * (frac + 1) / 256`; hits `i` exactly at `frac == 255`.
fn scale8(i: u8, frac: u8) -> u8 {
    ((u16::from(i) * (u16::from(frac) + 1)) >> 8) as u8
}
