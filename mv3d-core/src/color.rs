/// RGB colours and host colour-string parsing
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ColorError;

/// An 8-bit RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::from_hex(0x000000);
    pub const WHITE: Rgb = Rgb::from_hex(0xffffff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Build from linear [0, 1] components, clamping out-of-range values
    pub fn from_unit(r: f32, g: f32, b: f32) -> Self {
        let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(to_u8(r), to_u8(g), to_u8(b))
    }

    /// Perceived brightness in [0, 1]
    pub fn luminance(&self) -> f32 {
        (0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32) / 255.0
    }

    pub fn scaled(&self, factor: f32) -> Self {
        let scale = |c: u8| (c as f32 * factor).clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    pub fn to_css(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    /// Accepts `#rrggbb`, `0xrrggbb`, `rrggbb` and the `#rgb` shorthand
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError(s.to_string()));
        }

        let hex = match digits.len() {
            6 => u32::from_str_radix(digits, 16).map_err(|_| ColorError(s.to_string()))?,
            3 => digits
                .chars()
                .filter_map(|c| c.to_digit(16))
                .fold(0u32, |acc, d| (acc << 8) | (d << 4) | d),
            _ => return Err(ColorError(s.to_string())),
        };

        Ok(Rgb::from_hex(hex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("#ff8000".parse::<Rgb>(), Ok(Rgb::new(255, 128, 0)));
        assert_eq!("0x303030".parse::<Rgb>(), Ok(Rgb::new(48, 48, 48)));
        assert_eq!("444444".parse::<Rgb>(), Ok(Rgb::from_hex(0x444444)));
        assert_eq!("#f0a".parse::<Rgb>(), Ok(Rgb::new(255, 0, 170)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("red".parse::<Rgb>().is_err());
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn test_css_roundtrip() {
        let color = Rgb::new(1, 2, 255);
        assert_eq!(color.to_css(), "#0102ff");
    }
}
