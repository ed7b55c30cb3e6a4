//! Icon synthesis.
//!
//! Glyphs come from an external provider as bare vector markup. The
//! drawing surface cannot recolor an arbitrary glyph, so the node's fill
//! and stroke are baked into a standalone SVG document first, which is
//! then drawn like any other image.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::HashMap;

/// Native size assumed for glyphs built from a bare path string.
pub const FALLBACK_GLYPH_SIZE: f32 = 24.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IconGlyph {
    /// SVG fragment (paths, circles, ...) without the `<svg>` wrapper.
    pub body: String,
    pub width: f32,
    pub height: f32,
}

impl IconGlyph {
    /// Wrap a bare SVG path string.
    pub fn from_path_data(data: &str) -> Self {
        Self {
            body: format!(r#"<path d="{}"/>"#, escape_attr(data)),
            width: FALLBACK_GLYPH_SIZE,
            height: FALLBACK_GLYPH_SIZE,
        }
    }
}

/// Resolves an icon name (e.g. `mdi:phone`) to glyph markup.
pub trait IconProvider {
    fn resolve_icon(&self, name: &str) -> Option<IconGlyph>;
}

/// In-memory icon table.
#[derive(Debug, Default, Clone)]
pub struct IconSet {
    glyphs: HashMap<String, IconGlyph>,
}

impl IconSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, glyph: IconGlyph) {
        self.glyphs.insert(name.to_string(), glyph);
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl IconProvider for IconSet {
    fn resolve_icon(&self, name: &str) -> Option<IconGlyph> {
        self.glyphs.get(name).cloned()
    }
}

/// Characters XML 1.0 allows in documents.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape for an attribute value. Characters XML cannot carry are dropped.
pub(crate) fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Standalone SVG for a glyph with paint applied.
pub fn icon_svg(glyph: &IconGlyph, fill: &str, stroke: Option<&str>, stroke_width: f32) -> String {
    let fill = escape_attr(fill);
    let body = glyph.body.replace("currentColor", &fill);
    let stroke_attrs = match stroke {
        Some(s) if stroke_width > 0.0 => {
            format!(r#" stroke="{}" stroke-width="{stroke_width}""#, escape_attr(s))
        }
        _ => String::new(),
    };
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><g fill="{fill}"{stroke_attrs}>{body}</g></svg>"#,
        w = glyph.width,
        h = glyph.height,
    )
}

pub fn icon_data_uri(glyph: &IconGlyph, fill: &str, stroke: Option<&str>, stroke_width: f32) -> String {
    let svg = icon_svg(glyph, fill, stroke, stroke_width);
    format!("data:image/svg+xml;base64,{}", BASE64.encode(svg))
}
