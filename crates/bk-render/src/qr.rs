//! QR synthesis from `qrMetadata`.
//!
//! The code is rebuilt from metadata on every render as vector SVG; a
//! node's stored `src` is a PNG fallback for when generation fails.

use crate::error::{RenderError, Result};
use crate::icon::escape_attr;
use crate::raster::rasterize_svg;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bk_core::model::{QrDotStyle, QrErrorCorrection, QrEyeStyle, QrMetadata};
use qrcodegen::{QrCode, QrCodeEcc};
use std::fmt::Write as _;

/// Light modules around the code, in modules.
const QUIET_ZONE: i32 = 2;

/// Finder patterns are 7×7 modules.
const EYE: i32 = 7;

fn ecc(level: QrErrorCorrection) -> QrCodeEcc {
    match level {
        QrErrorCorrection::L => QrCodeEcc::Low,
        QrErrorCorrection::M => QrCodeEcc::Medium,
        QrErrorCorrection::Q => QrCodeEcc::Quartile,
        QrErrorCorrection::H => QrCodeEcc::High,
    }
}

fn encode(meta: &QrMetadata) -> Result<QrCode> {
    if meta.value.is_empty() {
        return Err(RenderError::Qr("empty QR value".into()));
    }
    QrCode::encode_text(&meta.value, ecc(meta.error_correction))
        .map_err(|e| RenderError::Qr(format!("{e:?}")))
}

fn in_eye(size: i32, x: i32, y: i32) -> bool {
    let near = |v: i32| v < EYE;
    let far = |v: i32| v >= size - EYE;
    (near(x) && near(y)) || (far(x) && near(y)) || (near(x) && far(y))
}

/// Styled SVG for the code, `edge` pixels square.
pub fn qr_svg(meta: &QrMetadata, edge: u32) -> Result<String> {
    let code = encode(meta)?;
    let size = code.size();
    let total = size + QUIET_ZONE * 2;
    let fg = escape_attr(&meta.fg_color);
    let bg = escape_attr(&meta.bg_color);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{edge}" height="{edge}" viewBox="0 0 {total} {total}"><rect width="{total}" height="{total}" fill="{bg}"/><g fill="{fg}" transform="translate({QUIET_ZONE} {QUIET_ZONE})">"#
    );

    let mut squares = String::new();
    for y in 0..size {
        for x in 0..size {
            if !code.get_module(x, y) || in_eye(size, x, y) {
                continue;
            }
            match meta.dot_style {
                QrDotStyle::Square => {
                    let _ = write!(squares, "M{x} {y}h1v1h-1z");
                }
                QrDotStyle::Rounded => {
                    let _ = write!(
                        svg,
                        r#"<rect x="{x}" y="{y}" width="1" height="1" rx="0.35"/>"#
                    );
                }
                QrDotStyle::Dots => {
                    let _ = write!(
                        svg,
                        r#"<circle cx="{}" cy="{}" r="0.45"/>"#,
                        x as f32 + 0.5,
                        y as f32 + 0.5
                    );
                }
            }
        }
    }
    if !squares.is_empty() {
        let _ = write!(svg, r#"<path d="{squares}" shape-rendering="crispEdges"/>"#);
    }

    for (ex, ey) in [(0, 0), (size - EYE, 0), (0, size - EYE)] {
        write_eye(&mut svg, meta.eye_style, ex, ey, &fg);
    }
    svg.push_str("</g>");

    if let Some(logo) = meta.logo.as_deref().filter(|l| !l.is_empty()) {
        let side = total as f32 * meta.logo_size.clamp(0.05, 0.35);
        let at = (total as f32 - side) / 2.0;
        let pad = side * 0.08;
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{bg}"/><image x="{at}" y="{at}" width="{side}" height="{side}" xlink:href="{}"/>"#,
            at - pad,
            at - pad,
            side + pad * 2.0,
            side + pad * 2.0,
            escape_attr(logo)
        );
    }
    svg.push_str("</svg>");
    Ok(svg)
}

fn write_eye(out: &mut String, style: QrEyeStyle, ex: i32, ey: i32, fg: &str) {
    match style {
        QrEyeStyle::Square | QrEyeStyle::Rounded => {
            let (outer_r, inner_r) = if style == QrEyeStyle::Rounded {
                (1.5, 0.8)
            } else {
                (0.0, 0.0)
            };
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="6" height="6" rx="{outer_r}" fill="none" stroke="{fg}" stroke-width="1"/><rect x="{}" y="{}" width="3" height="3" rx="{inner_r}"/>"#,
                ex as f32 + 0.5,
                ey as f32 + 0.5,
                ex + 2,
                ey + 2
            );
        }
        QrEyeStyle::Circle => {
            let (cx, cy) = (ex as f32 + 3.5, ey as f32 + 3.5);
            let _ = write!(
                out,
                r#"<circle cx="{cx}" cy="{cy}" r="3" fill="none" stroke="{fg}" stroke-width="1"/><circle cx="{cx}" cy="{cy}" r="1.5"/>"#
            );
        }
    }
}

/// Fresh PNG bitmap for the code.
pub fn qr_png(meta: &QrMetadata, edge: u32) -> Result<Vec<u8>> {
    let svg = qr_svg(meta, edge)?;
    rasterize_svg(&svg, 1.0, None, false)?.encode_png()
}

/// Vector data URI for rendering. The rasterizer draws the modules at the
/// output resolution, so print exports stay sharp.
pub fn qr_svg_data_uri(meta: &QrMetadata, edge: u32) -> Result<String> {
    let svg = qr_svg(meta, edge)?;
    Ok(format!("data:image/svg+xml;base64,{}", BASE64.encode(svg)))
}

/// Fresh PNG bitmap as a data URI, for the node's stored fallback `src`.
pub fn qr_data_uri(meta: &QrMetadata, edge: u32) -> Result<String> {
    let png = qr_png(meta, edge)?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(png)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(value: &str) -> QrMetadata {
        QrMetadata {
            value: value.into(),
            ..QrMetadata::default()
        }
    }

    #[test]
    fn empty_value_fails() {
        assert!(matches!(qr_svg(&meta(""), 256), Err(RenderError::Qr(_))));
    }

    #[test]
    fn svg_changes_with_style() {
        let square = qr_svg(&meta("https://example.com"), 256).unwrap();
        let dots = qr_svg(
            &QrMetadata {
                dot_style: QrDotStyle::Dots,
                ..meta("https://example.com")
            },
            256,
        )
        .unwrap();
        assert!(square.contains("crispEdges"));
        assert!(dots.contains("<circle"));
        assert_ne!(square, dots);
    }

    #[test]
    fn colors_are_applied() {
        let svg = qr_svg(
            &QrMetadata {
                fg_color: "#112233".into(),
                bg_color: "#FFEEDD".into(),
                ..meta("hello")
            },
            128,
        )
        .unwrap();
        assert!(svg.contains(r##"fill="#112233""##));
        assert!(svg.contains(r##"fill="#FFEEDD""##));
    }

    #[test]
    fn render_uri_is_vector() {
        let uri = qr_svg_data_uri(&meta("hello"), 300).unwrap();
        let b64 = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(BASE64.decode(b64).unwrap()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="300""#));
    }

    #[test]
    fn png_has_requested_edge() {
        let png = qr_png(&meta("hello"), 200).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (200, 200));
    }
}
