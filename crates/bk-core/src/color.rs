//! Colors as stored in templates (CSS strings) and as consumed by renderers.
//!
//! Templates keep colors as the strings the editor wrote (`#1E293B`,
//! `rgba(0,0,0,0.4)`, `white`, `transparent`). Renderers and the color-role
//! pass parse them into [`Color`] on demand.

use serde::{Deserialize, Serialize};
use winnow::ascii::{float, space0};
use winnow::combinator::{alt, delimited, preceded, separated};
use winnow::prelude::*;
use winnow::token::take_while;

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        match bytes.len() {
            3 | 4 => {
                let mut ch = [15u8; 4];
                for (slot, b) in ch.iter_mut().zip(bytes) {
                    *slot = hex_val(*b)?;
                }
                Some(Self::from_rgba8(ch[0] * 17, ch[1] * 17, ch[2] * 17, ch[3] * 17))
            }
            6 | 8 => {
                let mut ch = [255u8; 4];
                for (slot, pair) in ch.iter_mut().zip(bytes.chunks(2)) {
                    *slot = hex_val(pair[0])? << 4 | hex_val(pair[1])?;
                }
                Some(Self::from_rgba8(ch[0], ch[1], ch[2], ch[3]))
            }
            _ => None,
        }
    }

    /// Parse any CSS color the editor writes: hex, `rgb()`/`rgba()`, or a
    /// small set of named colors.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        parse_css_color.parse(s).ok()
    }

    /// Uppercase `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// BT.601 weighted brightness on gamma-encoded channels, in [0, 1].
    ///
    /// Not relative luminance: no linearization is applied.
    pub fn brightness(&self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// True for fill values that paint nothing (`transparent`, `none`, empty).
pub fn is_blank_fill(value: &str) -> bool {
    let v = value.trim();
    v.is_empty()
        || v.eq_ignore_ascii_case("transparent")
        || v.eq_ignore_ascii_case("none")
}

// ─── CSS color grammar ───────────────────────────────────────────────────

fn parse_css_color(input: &mut &str) -> ModalResult<Color> {
    alt((parse_hex_color, parse_rgb_function, parse_named_color)).parse_next(input)
}

fn parse_hex_color(input: &mut &str) -> ModalResult<Color> {
    let digits: &str =
        preceded('#', take_while(3..=8, |c: char| c.is_ascii_hexdigit())).parse_next(input)?;
    Color::from_hex(digits)
        .ok_or_else(|| winnow::error::ErrMode::Backtrack(winnow::error::ContextError::new()))
}

fn parse_component(input: &mut &str) -> ModalResult<f32> {
    delimited(space0, float, space0).parse_next(input)
}

fn parse_rgb_function(input: &mut &str) -> ModalResult<Color> {
    let _ = alt(("rgba", "rgb")).parse_next(input)?;
    let parts: Vec<f32> = delimited(
        '(',
        separated(3..=4, parse_component, ','),
        ')',
    )
    .parse_next(input)?;
    let channel = |v: f32| (v / 255.0).clamp(0.0, 1.0);
    let alpha = parts.get(3).copied().unwrap_or(1.0).clamp(0.0, 1.0);
    Ok(Color::rgba(
        channel(parts[0]),
        channel(parts[1]),
        channel(parts[2]),
        alpha,
    ))
}

fn parse_named_color(input: &mut &str) -> ModalResult<Color> {
    let name: &str = take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)?;
    named_color(name)
        .ok_or_else(|| winnow::error::ErrMode::Backtrack(winnow::error::ContextError::new()))
}

fn named_color(name: &str) -> Option<Color> {
    let hex = match name.to_ascii_lowercase().as_str() {
        "transparent" => return Some(Color::TRANSPARENT),
        "black" => "000000",
        "white" => "FFFFFF",
        "red" => "FF0000",
        "green" => "008000",
        "lime" => "00FF00",
        "blue" => "0000FF",
        "yellow" => "FFFF00",
        "orange" => "FFA500",
        "purple" => "800080",
        "gray" | "grey" => "808080",
        "silver" => "C0C0C0",
        "navy" => "000080",
        "teal" => "008080",
        "gold" => "FFD700",
        _ => return None,
    };
    Color::from_hex(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex().len(), 9);
    }

    #[test]
    fn short_hex_expands() {
        assert_eq!(Color::parse("#fff").unwrap().to_hex(), "#FFFFFF");
        assert_eq!(Color::parse("#0008").unwrap().to_hex(), "#00000088");
    }

    #[test]
    fn parses_rgb_functions() {
        let c = Color::parse("rgba(255, 0, 0, 0.5)").unwrap();
        assert_eq!(c.to_rgba8(), [255, 0, 0, 128]);
        let c = Color::parse("rgb(0,128,255)").unwrap();
        assert_eq!(c.to_hex(), "#0080FF");
    }

    #[test]
    fn parses_named_colors() {
        assert_eq!(Color::parse("White"), Some(Color::WHITE));
        assert!(Color::parse("transparent").unwrap().is_transparent());
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn brightness_uses_bt601_weights() {
        assert!(Color::BLACK.brightness() < 128.0 / 255.0);
        assert!(Color::WHITE.brightness() > 0.99);
        let green = Color::parse("#00FF00").unwrap();
        assert!((green.brightness() - 0.587).abs() < 1e-6);
    }

    #[test]
    fn blank_fills() {
        assert!(is_blank_fill(""));
        assert!(is_blank_fill(" transparent "));
        assert!(!is_blank_fill("#000"));
    }
}
