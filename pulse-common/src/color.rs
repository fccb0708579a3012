use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Color selected before the user touches the picker.
pub const DEFAULT_COLOR: Color = Color::new(79. / 255., 195. / 255., 247. / 255., 1.);

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Color {
        Color { r, g, b, a }
    }

    /// Build a color from 4 0..255 components
    pub fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color::new(
            r as f32 / 255.,
            g as f32 / 255.,
            b as f32 / 255.,
            a as f32 / 255.,
        )
    }

    /// Build a color from a hexadecimal u32
    /// Example: 0x3CA7D5 - a light blue
    pub fn from_hex(hex: u32) -> Color {
        let bytes: [u8; 4] = hex.to_be_bytes();

        Self::from_rgba(bytes[1], bytes[2], bytes[3], 255)
    }

    /// RGB components as bytes, alpha is dropped.
    pub fn to_rgb8(&self) -> [u8; 3] {
        let q = |v: f32| (v.clamp(0., 1.) * 255.).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }

    /// Lowercase `#rrggbb`, the form carried on the wire.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    /// CSS `rgba()` string with an explicit alpha, for canvas gradient stops.
    pub fn css_rgba(&self, alpha: f32) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("rgba({r}, {g}, {b}, {:.3})", alpha.clamp(0., 1.))
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some(digits) = s.strip_prefix('#') else {
            bail!("color `{s}` does not start with `#`");
        };
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            bail!("color `{s}` is not in #rrggbb form");
        }
        let hex = u32::from_str_radix(digits, 16).map_err(|e| anyhow!("color `{s}`: {e}"))?;
        Ok(Color::from_hex(hex))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        let c: Color = "#ff0000".parse().unwrap();
        assert_eq!(c, Color::new(1., 0., 0., 1.));

        let c: Color = "#3CA7D5".parse().unwrap();
        assert_eq!(c, Color::from_hex(0x3CA7D5));
        assert_eq!(c.to_hex(), "#3ca7d5");
    }

    #[test]
    fn test_reject_malformed() {
        for s in ["ff0000", "#ff00", "#ff00000", "#gg0000", "", "#", "red", "#+f0000"] {
            assert!(s.parse::<Color>().is_err(), "{s} should not parse");
        }
    }

    #[test]
    fn test_css_rgba() {
        let c = Color::from_hex(0x102030);
        assert_eq!(c.css_rgba(0.5), "rgba(16, 32, 48, 0.500)");
        assert_eq!(c.css_rgba(2.0), "rgba(16, 32, 48, 1.000)");
    }

    #[test]
    fn test_default_color() {
        assert_eq!(DEFAULT_COLOR.to_hex(), "#4fc3f7");
    }
}
