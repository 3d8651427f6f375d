/// Exponential zoom ramp between two stops, clamped outside them.
///
/// `t = (base^(z - z0) - 1) / (base^(z1 - z0) - 1)`, the same curve vector
/// map styles use for `["interpolate", ["exponential", base], ["zoom"], ...]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ZoomRamp {
    pub base: f64,
    pub low: (f64, f64),
    pub high: (f64, f64),
}

impl ZoomRamp {
    pub const fn new(base: f64, low: (f64, f64), high: (f64, f64)) -> Self {
        Self { base, low, high }
    }

    pub fn eval(&self, zoom: f64) -> f64 {
        let (z0, v0) = self.low;
        let (z1, v1) = self.high;
        if zoom <= z0 {
            return v0;
        }
        if zoom >= z1 {
            return v1;
        }
        let t = if (self.base - 1.0).abs() < f64::EPSILON {
            (zoom - z0) / (z1 - z0)
        } else {
            (self.base.powf(zoom - z0) - 1.0) / (self.base.powf(z1 - z0) - 1.0)
        };
        v0 + t * (v1 - v0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointStyle {
    /// Circle radius in pixels as a function of zoom.
    pub radius: ZoomRamp,
    pub fill: [f32; 4],
    pub hover_fill: [f32; 4],
    pub opacity: f32,
    /// Screen-space offset in pixels.
    pub displacement: [f32; 2],
}

impl PointStyle {
    pub fn radius_at(&self, zoom: f64) -> f32 {
        self.radius.eval(zoom) as f32
    }

    /// Fill color with opacity folded into alpha.
    pub fn fill_for(&self, hovered: bool, own: Option<[f32; 4]>) -> [f32; 4] {
        let mut c = if hovered {
            self.hover_fill
        } else {
            own.unwrap_or(self.fill)
        };
        c[3] *= self.opacity;
        c
    }
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            radius: ZoomRamp::new(2.0, (5.0, 1.5), (15.0, 1536.0)),
            fill: rgb(0x00, 0x66, 0x88),
            hover_fill: rgb(0xff, 0x3f, 0x3f),
            opacity: 0.95,
            displacement: [0.0, 0.0],
        }
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> [f32; 4] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
}

/// Parse `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(s: &str) -> Option<[f32; 4]> {
    let hex = s.strip_prefix('#')?;
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let a = if hex.len() == 8 { channel(6)? } else { 0xff };
    Some([
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
        a as f32 / 255.0,
    ])
}
