//! Draw list → SVG document.
//!
//! The document is what the CPU rasterizer consumes and what `bk export
//! --format svg` writes. Gradients, drop shadows and image filters are
//! collected into `<defs>` and referenced by id.

use crate::command::{DrawItem, DrawLayer, DrawList, Paint, Primitive, ShadowSpec, StrokeSpec, TextRun};
use crate::icon::{escape_attr, is_xml_char};
use bk_core::Color;
use bk_core::model::{FillRule, ImageFilters, LineCap, TextAlign};
use kurbo::Affine;
use std::fmt::Write as _;

/// Baseline offset of the first line, as a fraction of font size.
const ASCENT: f32 = 0.8;

#[derive(Default)]
struct Defs {
    out: String,
    next: usize,
}

impl Defs {
    fn id(&mut self, prefix: &str) -> String {
        self.next += 1;
        format!("{prefix}{}", self.next)
    }

    fn gradient(&mut self, paint: &Paint) -> Option<String> {
        let (open, stops) = match paint {
            Paint::Solid(_) => return None,
            Paint::Linear { start, end, stops } => (
                format!(
                    r#"x1="{}" y1="{}" x2="{}" y2="{}""#,
                    start.0, start.1, end.0, end.1
                ),
                stops,
            ),
            Paint::Radial {
                center,
                radius,
                stops,
            } => (
                format!(r#"cx="{}" cy="{}" r="{radius}""#, center.0, center.1),
                stops,
            ),
        };
        let tag = if matches!(paint, Paint::Linear { .. }) {
            "linearGradient"
        } else {
            "radialGradient"
        };
        let id = self.id("grad");
        let _ = write!(
            self.out,
            r#"<{tag} id="{id}" gradientUnits="userSpaceOnUse" {open}>"#
        );
        for (offset, color) in stops {
            let _ = write!(
                self.out,
                r#"<stop offset="{offset}" stop-color="{}" stop-opacity="{}"/>"#,
                rgb_hex(color),
                color.a
            );
        }
        let _ = write!(self.out, "</{tag}>");
        Some(id)
    }

    fn shadow(&mut self, shadow: &ShadowSpec) -> String {
        let id = self.id("shadow");
        let _ = write!(
            self.out,
            r#"<filter id="{id}" x="-50%" y="-50%" width="200%" height="200%"><feDropShadow dx="{}" dy="{}" stdDeviation="{}" flood-color="{}" flood-opacity="{}"/></filter>"#,
            shadow.offset_x,
            shadow.offset_y,
            shadow.blur / 2.0,
            rgb_hex(&shadow.color),
            shadow.color.a
        );
        id
    }

    fn image_filter(&mut self, f: &ImageFilters) -> String {
        let id = self.id("filter");
        let _ = write!(self.out, r#"<filter id="{id}">"#);
        let brightness = f.brightness / 100.0;
        if brightness != 1.0 {
            let _ = write!(
                self.out,
                r#"<feComponentTransfer><feFuncR type="linear" slope="{brightness}"/><feFuncG type="linear" slope="{brightness}"/><feFuncB type="linear" slope="{brightness}"/></feComponentTransfer>"#
            );
        }
        let contrast = f.contrast / 100.0;
        if contrast != 1.0 {
            let intercept = 0.5 - 0.5 * contrast;
            let _ = write!(
                self.out,
                r#"<feComponentTransfer><feFuncR type="linear" slope="{contrast}" intercept="{intercept}"/><feFuncG type="linear" slope="{contrast}" intercept="{intercept}"/><feFuncB type="linear" slope="{contrast}" intercept="{intercept}"/></feComponentTransfer>"#
            );
        }
        let saturation = (f.saturate / 100.0) * (1.0 - f.grayscale / 100.0);
        if saturation != 1.0 {
            let _ = write!(self.out, r#"<feColorMatrix type="saturate" values="{saturation}"/>"#);
        }
        if f.blur > 0.0 {
            let _ = write!(self.out, r#"<feGaussianBlur stdDeviation="{}"/>"#, f.blur / 2.0);
        }
        self.out.push_str("</filter>");
        id
    }
}

fn rgb_hex(c: &Color) -> String {
    let [r, g, b, _] = c.to_rgba8();
    format!("#{r:02X}{g:02X}{b:02X}")
}

fn matrix(a: Affine) -> Option<String> {
    if a == Affine::IDENTITY {
        return None;
    }
    let [m0, m1, m2, m3, m4, m5] = a.as_coeffs();
    Some(format!("matrix({m0} {m1} {m2} {m3} {m4} {m5})"))
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars().filter(|&c| is_xml_char(c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Encode a draw list as a standalone SVG document.
pub fn to_svg(list: &DrawList) -> String {
    let mut defs = Defs::default();
    let mut content = String::new();
    let mut overlays = String::new();
    for item in &list.items {
        let out = if item.layer == DrawLayer::Overlay {
            &mut overlays
        } else {
            &mut content
        };
        write_item(out, &mut defs, item);
    }

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = list.width,
        h = list.height
    );
    let _ = write!(
        svg,
        r#"<defs><clipPath id="card"><rect width="{}" height="{}"/></clipPath>{}</defs>"#,
        list.card_width, list.card_height, defs.out
    );
    match matrix(list.view) {
        Some(m) => {
            let _ = write!(svg, r#"<g transform="{m}">"#);
        }
        None => svg.push_str("<g>"),
    }
    let _ = write!(svg, r#"<g clip-path="url(#card)">{content}</g>{overlays}</g></svg>"#);
    svg
}

fn paint_attrs(defs: &mut Defs, fill: Option<&Paint>, stroke: Option<&StrokeSpec>) -> String {
    let mut attrs = String::new();
    match fill {
        Some(Paint::Solid(c)) => {
            let _ = write!(attrs, r#" fill="{}""#, rgb_hex(c));
            if c.a < 1.0 {
                let _ = write!(attrs, r#" fill-opacity="{}""#, c.a);
            }
        }
        Some(gradient) => {
            if let Some(id) = defs.gradient(gradient) {
                let _ = write!(attrs, r#" fill="url(#{id})""#);
            }
        }
        None => attrs.push_str(r#" fill="none""#),
    }
    if let Some(s) = stroke {
        let _ = write!(attrs, r#" stroke="{}" stroke-width="{}""#, rgb_hex(&s.color), s.width);
        if s.color.a < 1.0 {
            let _ = write!(attrs, r#" stroke-opacity="{}""#, s.color.a);
        }
        let cap = match s.cap {
            LineCap::Butt => None,
            LineCap::Round => Some("round"),
            LineCap::Square => Some("square"),
        };
        if let Some(cap) = cap {
            let _ = write!(attrs, r#" stroke-linecap="{cap}" stroke-linejoin="round""#);
        }
        if !s.dash.is_empty() {
            let dash: Vec<String> = s.dash.iter().map(|d| d.to_string()).collect();
            let _ = write!(attrs, r#" stroke-dasharray="{}""#, dash.join(" "));
        }
    }
    attrs
}

fn write_item(out: &mut String, defs: &mut Defs, item: &DrawItem) {
    let mut group = String::new();
    if let Some(m) = matrix(item.transform) {
        let _ = write!(group, r#" transform="{m}""#);
    }
    if item.opacity < 1.0 {
        let _ = write!(group, r#" opacity="{}""#, item.opacity.max(0.0));
    }
    if let Some(shadow) = &item.shadow {
        let id = defs.shadow(shadow);
        let _ = write!(group, r#" filter="url(#{id})""#);
    }
    if let Some(id) = item.node {
        let _ = write!(group, r#" data-node="{}""#, escape_attr(id.as_str()));
    }
    let _ = write!(out, "<g{group}>");

    let paint = paint_attrs(defs, item.fill.as_ref(), item.stroke.as_ref());
    match &item.primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
            corner_radius,
        } => {
            let _ = write!(
                out,
                r#"<rect x="{x}" y="{y}" width="{width}" height="{height}""#
            );
            if *corner_radius > 0.0 {
                let _ = write!(out, r#" rx="{corner_radius}""#);
            }
            let _ = write!(out, "{paint}/>");
        }
        Primitive::Ellipse { cx, cy, rx, ry } => {
            let _ = write!(
                out,
                r#"<ellipse cx="{cx}" cy="{cy}" rx="{rx}" ry="{ry}"{paint}/>"#
            );
        }
        Primitive::Path { data, fill_rule } => {
            let rule = match fill_rule {
                FillRule::Nonzero => "nonzero",
                FillRule::Evenodd => "evenodd",
            };
            let _ = write!(
                out,
                r#"<path d="{}" fill-rule="{rule}"{paint}/>"#,
                escape_attr(data)
            );
        }
        Primitive::Text(run) => write_text(out, run, &paint),
        Primitive::Image {
            href,
            width,
            height,
            flip_horizontal,
            flip_vertical,
            filters,
            crop,
        } => {
            let mut attrs = String::new();
            if *flip_horizontal || *flip_vertical {
                let sx = if *flip_horizontal { -1.0 } else { 1.0 };
                let sy = if *flip_vertical { -1.0 } else { 1.0 };
                let tx = if *flip_horizontal { *width } else { 0.0 };
                let ty = if *flip_vertical { *height } else { 0.0 };
                let _ = write!(attrs, r#" transform="translate({tx} {ty}) scale({sx} {sy})""#);
            }
            if let Some(f) = filters {
                let id = defs.image_filter(f);
                let _ = write!(attrs, r#" filter="url(#{id})""#);
            }
            let href = escape_attr(href);
            match crop {
                Some(c) => {
                    let _ = write!(
                        out,
                        r#"<g{attrs}><svg width="{width}" height="{height}" viewBox="{} {} {} {}" preserveAspectRatio="none"><image xlink:href="{href}"/></svg></g>"#,
                        c.x, c.y, c.width, c.height
                    );
                }
                None => {
                    let _ = write!(
                        out,
                        r#"<image width="{width}" height="{height}" preserveAspectRatio="none" xlink:href="{href}"{attrs}/>"#
                    );
                }
            }
        }
        Primitive::Placeholder { width, height } => {
            let cross = paint_attrs(defs, None, item.stroke.as_ref());
            let _ = write!(
                out,
                r#"<rect width="{width}" height="{height}"{paint} stroke-dasharray="6 4"/><path d="M0 0L{width} {height}M{width} 0L0 {height}"{cross}/>"#
            );
        }
    }
    out.push_str("</g>");
}

fn write_text(out: &mut String, run: &TextRun, paint: &str) {
    let (anchor, x) = match run.align {
        TextAlign::Center => ("middle", run.width / 2.0),
        TextAlign::Right => ("end", run.width),
        TextAlign::Left | TextAlign::Justify => ("start", 0.0),
    };
    let mut attrs = format!(
        r#" font-family="{}" font-size="{}" text-anchor="{anchor}""#,
        escape_attr(&run.font_family),
        run.font_size
    );
    if run.bold {
        attrs.push_str(r#" font-weight="bold""#);
    }
    if run.italic {
        attrs.push_str(r#" font-style="italic""#);
    }
    if run.letter_spacing != 0.0 {
        let _ = write!(attrs, r#" letter-spacing="{}""#, run.letter_spacing);
    }
    if !run.decoration.is_empty() {
        let _ = write!(attrs, r#" text-decoration="{}""#, escape_attr(&run.decoration));
    }
    let step = run.font_size * run.line_height;
    for (i, line) in run.lines.iter().enumerate() {
        let y = run.font_size * ASCENT + step * i as f32;
        let _ = write!(
            out,
            r#"<text x="{x}" y="{y}"{attrs}{paint} xml:space="preserve">{}</text>"#,
            escape_text(line)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DrawItem;

    fn list_with(item: DrawItem) -> DrawList {
        let mut list = DrawList::new(100.0, 50.0);
        list.push(item);
        list
    }

    #[test]
    fn solid_rect_document() {
        let mut item = DrawItem::new(
            DrawLayer::Content,
            Primitive::Rect {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 5.0,
                corner_radius: 2.0,
            },
        );
        item.fill = Some(Paint::Solid(Color::rgba(1.0, 0.0, 0.0, 0.5)));
        let svg = to_svg(&list_with(item));
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r##"fill="#FF0000" fill-opacity="0.5""##));
        assert!(svg.contains(r#"rx="2""#));
    }

    #[test]
    fn gradients_land_in_defs() {
        let mut item = DrawItem::new(DrawLayer::Background, Primitive::Rect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
            corner_radius: 0.0,
        });
        item.fill = Some(Paint::Radial {
            center: (50.0, 25.0),
            radius: 66.0,
            stops: vec![(0.0, Color::WHITE), (1.0, Color::BLACK)],
        });
        let svg = to_svg(&list_with(item));
        assert!(svg.contains("<radialGradient id=\"grad1\""));
        assert!(svg.contains(r#"fill="url(#grad1)""#));
    }

    #[test]
    fn text_is_escaped_per_line() {
        let item = DrawItem::new(
            DrawLayer::Content,
            Primitive::Text(TextRun {
                lines: vec!["A & B".into(), "<c>".into()],
                width: 100.0,
                font_size: 10.0,
                font_family: "Inter".into(),
                bold: true,
                italic: false,
                align: TextAlign::Center,
                line_height: 1.5,
                letter_spacing: 0.0,
                decoration: String::new(),
            }),
        );
        let svg = to_svg(&list_with(item));
        assert!(svg.contains("A &amp; B"));
        assert!(svg.contains("&lt;c&gt;"));
        assert!(svg.contains(r#"y="23""#));
        assert!(svg.contains(r#"text-anchor="middle""#));
    }

    #[test]
    fn overlays_sit_outside_the_card_clip() {
        let content = DrawItem::new(DrawLayer::Content, Primitive::Ellipse {
            cx: 1.0,
            cy: 1.0,
            rx: 1.0,
            ry: 1.0,
        });
        let overlay = DrawItem::new(DrawLayer::Overlay, Primitive::Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            corner_radius: 0.0,
        });
        let mut list = list_with(content);
        list.push(overlay);
        let svg = to_svg(&list);
        let clip_end = svg.find("</g><g").unwrap();
        assert!(svg[..clip_end].contains("<ellipse"));
        assert!(svg[clip_end..].contains("<rect"));
    }
}
