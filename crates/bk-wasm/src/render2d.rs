//! Canvas2D painter.
//!
//! Replays a [`DrawList`] onto an HTML `<canvas>` via
//! `CanvasRenderingContext2d`. Content is clipped to the card; overlay
//! items are drawn after the clip is released.

use bk_core::model::{FillRule, ImageFilters, LineCap, TextAlign};
use bk_core::Color;
use bk_render::{DrawItem, DrawLayer, DrawList, Paint, Primitive, StrokeSpec, TextRun};
use kurbo::Affine;
use std::collections::HashMap;
use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, CanvasWindingRule, HtmlImageElement, Path2d};

/// Stage colors around the card.
pub struct CanvasTheme {
    pub bg: &'static str,
    pub card_border: &'static str,
    pub placeholder_text: &'static str,
}

impl CanvasTheme {
    pub fn light() -> Self {
        Self {
            bg: "#F5F5F7",
            card_border: "rgba(0, 0, 0, 0.08)",
            placeholder_text: "#86868B",
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: "#1C1C1E",
            card_border: "rgba(255, 255, 255, 0.08)",
            placeholder_text: "#98989D",
        }
    }
}

/// Decoded `<img>` elements keyed by href.
///
/// An element is created on first use; until the browser finishes
/// decoding it the image is skipped and the host is expected to redraw.
#[derive(Default)]
pub struct ImageCache {
    images: HashMap<String, HtmlImageElement>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_load(&mut self, href: &str) -> Option<&HtmlImageElement> {
        if !self.images.contains_key(href) {
            let img = HtmlImageElement::new().ok()?;
            img.set_src(href);
            self.images.insert(href.to_string(), img);
        }
        self.images
            .get(href)
            .filter(|img| img.complete() && img.natural_width() > 0)
    }

    /// True while some image is still decoding.
    pub fn has_pending(&self) -> bool {
        self.images.values().any(|img| !img.complete())
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

/// Paint a full frame: stage background, card content, then overlays.
pub fn render_list(
    ctx: &CanvasRenderingContext2d,
    list: &DrawList,
    images: &mut ImageCache,
    theme: &CanvasTheme,
) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_fill_style_str(theme.bg);
    ctx.fill_rect(0.0, 0.0, list.width as f64, list.height as f64);

    ctx.save();
    set_affine(ctx, list.view);
    ctx.begin_path();
    ctx.rect(0.0, 0.0, list.card_width as f64, list.card_height as f64);
    ctx.set_stroke_style_str(theme.card_border);
    ctx.set_line_width(1.0);
    ctx.stroke();
    ctx.clip();
    for item in list.items.iter().filter(|i| i.layer != DrawLayer::Overlay) {
        draw_item(ctx, list.view, item, images, theme);
    }
    ctx.restore();

    for item in list.items.iter().filter(|i| i.layer == DrawLayer::Overlay) {
        draw_item(ctx, list.view, item, images, theme);
    }
}

fn set_affine(ctx: &CanvasRenderingContext2d, a: Affine) {
    let [a, b, c, d, e, f] = a.as_coeffs();
    let _ = ctx.set_transform(a, b, c, d, e, f);
}

fn draw_item(
    ctx: &CanvasRenderingContext2d,
    view: Affine,
    item: &DrawItem,
    images: &mut ImageCache,
    theme: &CanvasTheme,
) {
    ctx.save();
    set_affine(ctx, view * item.transform);
    ctx.set_global_alpha(item.opacity.clamp(0.0, 1.0) as f64);
    if let Some(shadow) = &item.shadow {
        ctx.set_shadow_blur(shadow.blur as f64);
        ctx.set_shadow_offset_x(shadow.offset_x as f64);
        ctx.set_shadow_offset_y(shadow.offset_y as f64);
        ctx.set_shadow_color(&css_color(&shadow.color));
    }

    match &item.primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
            corner_radius,
        } => {
            rounded_rect_path(
                ctx,
                *x as f64,
                *y as f64,
                *width as f64,
                *height as f64,
                *corner_radius as f64,
            );
            fill_and_stroke(ctx, item, None);
        }
        Primitive::Ellipse { cx, cy, rx, ry } => {
            ctx.begin_path();
            let _ = ctx.ellipse(
                *cx as f64,
                *cy as f64,
                *rx as f64,
                *ry as f64,
                0.0,
                0.0,
                std::f64::consts::TAU,
            );
            fill_and_stroke(ctx, item, None);
        }
        Primitive::Path { data, fill_rule } => match Path2d::new_with_path_string(data) {
            Ok(path) => fill_and_stroke(ctx, item, Some((&path, *fill_rule))),
            Err(_) => log::warn!("unparseable path on {:?}", item.node),
        },
        Primitive::Text(run) => draw_text(ctx, run, item.fill.as_ref()),
        Primitive::Image {
            href,
            width,
            height,
            flip_horizontal,
            flip_vertical,
            filters,
            crop,
        } => {
            let (w, h) = (*width as f64, *height as f64);
            if let Some(img) = images.get_or_load(href) {
                if *flip_horizontal || *flip_vertical {
                    let _ = ctx.translate(
                        if *flip_horizontal { w } else { 0.0 },
                        if *flip_vertical { h } else { 0.0 },
                    );
                    let _ = ctx.scale(
                        if *flip_horizontal { -1.0 } else { 1.0 },
                        if *flip_vertical { -1.0 } else { 1.0 },
                    );
                }
                if let Some(f) = filters {
                    ctx.set_filter(&css_filter(f));
                }
                let _ = match crop {
                    Some(c) => ctx
                        .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                            img,
                            c.x as f64,
                            c.y as f64,
                            c.width as f64,
                            c.height as f64,
                            0.0,
                            0.0,
                            w,
                            h,
                        ),
                    None => ctx.draw_image_with_html_image_element_and_dw_and_dh(img, 0.0, 0.0, w, h),
                };
            }
        }
        Primitive::Placeholder { width, height } => {
            draw_placeholder(ctx, item, *width as f64, *height as f64, theme);
        }
    }
    ctx.restore();
}

fn fill_and_stroke(ctx: &CanvasRenderingContext2d, item: &DrawItem, path: Option<(&Path2d, FillRule)>) {
    if let Some(paint) = &item.fill {
        set_fill(ctx, paint);
        match path {
            Some((p, FillRule::Evenodd)) => ctx.fill_with_path_2d_and_winding(p, CanvasWindingRule::Evenodd),
            Some((p, FillRule::Nonzero)) => ctx.fill_with_path_2d(p),
            None => ctx.fill(),
        }
    }
    // Strokes never cast the shape's shadow.
    clear_shadow(ctx);
    if let Some(stroke) = &item.stroke {
        apply_stroke(ctx, stroke);
        match path {
            Some((p, _)) => ctx.stroke_with_path(p),
            None => ctx.stroke(),
        }
    }
}

fn draw_text(ctx: &CanvasRenderingContext2d, run: &TextRun, fill: Option<&Paint>) {
    ctx.set_font(&css_font(run));
    ctx.set_text_baseline("top");
    let (align, x) = match run.align {
        TextAlign::Center => ("center", run.width as f64 / 2.0),
        TextAlign::Right => ("right", run.width as f64),
        TextAlign::Left | TextAlign::Justify => ("left", 0.0),
    };
    ctx.set_text_align(align);
    let color = fill.map_or_else(|| css_color(&Color::BLACK), |p| css_color(&p.base_color()));
    ctx.set_fill_style_str(&color);
    let step = (run.font_size * run.line_height) as f64;
    for (i, line) in run.lines.iter().enumerate() {
        let y = step * i as f64;
        let _ = ctx.fill_text(line, x, y);
        if run.decoration.contains("underline") {
            let width = ctx.measure_text(line).map_or(0.0, |m| m.width());
            let x0 = match run.align {
                TextAlign::Center => x - width / 2.0,
                TextAlign::Right => x - width,
                _ => x,
            };
            ctx.fill_rect(x0, y + run.font_size as f64 * 1.05, width, (run.font_size / 14.0).max(1.0) as f64);
        }
    }
}

fn draw_placeholder(ctx: &CanvasRenderingContext2d, item: &DrawItem, w: f64, h: f64, theme: &CanvasTheme) {
    ctx.begin_path();
    ctx.rect(0.0, 0.0, w, h);
    if let Some(paint) = &item.fill {
        set_fill(ctx, paint);
        ctx.fill();
    }
    clear_shadow(ctx);
    if let Some(stroke) = &item.stroke {
        apply_stroke(ctx, stroke);
    } else {
        ctx.set_stroke_style_str(theme.placeholder_text);
    }
    let _ = ctx.set_line_dash(&dash_array(&[6.0, 4.0]));
    ctx.stroke();
    let _ = ctx.set_line_dash(&dash_array(&[]));
    ctx.begin_path();
    ctx.move_to(0.0, 0.0);
    ctx.line_to(w, h);
    ctx.move_to(w, 0.0);
    ctx.line_to(0.0, h);
    ctx.stroke();
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    let r = r.max(0.0).min(w / 2.0).min(h / 2.0);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.arc_to(x + w, y, x + w, y + r, r).unwrap_or(());
    ctx.line_to(x + w, y + h - r);
    ctx.arc_to(x + w, y + h, x + w - r, y + h, r).unwrap_or(());
    ctx.line_to(x + r, y + h);
    ctx.arc_to(x, y + h, x, y + h - r, r).unwrap_or(());
    ctx.line_to(x, y + r);
    ctx.arc_to(x, y, x + r, y, r).unwrap_or(());
    ctx.close_path();
}

/// Set the fill style, building a CanvasGradient for gradient paints.
fn set_fill(ctx: &CanvasRenderingContext2d, paint: &Paint) {
    match paint {
        Paint::Solid(c) => ctx.set_fill_style_str(&css_color(c)),
        Paint::Linear { start, end, stops } => {
            let grad = ctx.create_linear_gradient(start.0 as f64, start.1 as f64, end.0 as f64, end.1 as f64);
            for (offset, color) in stops {
                let _ = grad.add_color_stop(offset.clamp(0.0, 1.0), &css_color(color));
            }
            ctx.set_fill_style_canvas_gradient(&grad);
        }
        Paint::Radial { center, radius, stops } => {
            let (cx, cy) = (center.0 as f64, center.1 as f64);
            match ctx.create_radial_gradient(cx, cy, 0.0, cx, cy, *radius as f64) {
                Ok(grad) => {
                    for (offset, color) in stops {
                        let _ = grad.add_color_stop(offset.clamp(0.0, 1.0), &css_color(color));
                    }
                    ctx.set_fill_style_canvas_gradient(&grad);
                }
                Err(_) => ctx.set_fill_style_str(&css_color(&paint.base_color())),
            }
        }
    }
}

fn apply_stroke(ctx: &CanvasRenderingContext2d, stroke: &StrokeSpec) {
    ctx.set_stroke_style_str(&css_color(&stroke.color));
    ctx.set_line_width(stroke.width as f64);
    ctx.set_line_cap(line_cap(stroke.cap));
    let _ = ctx.set_line_dash(&dash_array(&stroke.dash));
}

fn clear_shadow(ctx: &CanvasRenderingContext2d) {
    ctx.set_shadow_blur(0.0);
    ctx.set_shadow_offset_x(0.0);
    ctx.set_shadow_offset_y(0.0);
    ctx.set_shadow_color("transparent");
}

fn dash_array(dash: &[f32]) -> js_sys::Array {
    dash.iter().map(|d| JsValue::from_f64(*d as f64)).collect()
}

pub(crate) fn line_cap(cap: LineCap) -> &'static str {
    match cap {
        LineCap::Butt => "butt",
        LineCap::Round => "round",
        LineCap::Square => "square",
    }
}

pub(crate) fn css_color(c: &Color) -> String {
    let [r, g, b, _] = c.to_rgba8();
    format!("rgba({r}, {g}, {b}, {})", c.a.clamp(0.0, 1.0))
}

pub(crate) fn css_font(run: &TextRun) -> String {
    let style = if run.italic { "italic " } else { "" };
    let weight = if run.bold { "bold " } else { "" };
    format!("{style}{weight}{}px {}", run.font_size, run.font_family)
}

/// CSS `filter` string; grayscale is folded into saturation.
pub(crate) fn css_filter(f: &ImageFilters) -> String {
    let saturate = f.saturate * (1.0 - f.grayscale / 100.0);
    let mut parts = vec![
        format!("brightness({}%)", f.brightness),
        format!("contrast({}%)", f.contrast),
        format!("saturate({saturate}%)"),
    ];
    if f.blur > 0.0 {
        parts.push(format!("blur({}px)", f.blur / 2.0));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn colors_keep_alpha() {
        assert_eq!(css_color(&Color::rgba(1.0, 0.0, 0.0, 0.5)), "rgba(255, 0, 0, 0.5)");
    }

    #[test]
    fn font_shorthand() {
        let run = TextRun {
            lines: vec!["Hi".into()],
            width: 100.0,
            font_size: 18.0,
            font_family: "Inter".into(),
            bold: true,
            italic: true,
            align: TextAlign::Left,
            line_height: 1.2,
            letter_spacing: 0.0,
            decoration: String::new(),
        };
        assert_eq!(css_font(&run), "italic bold 18px Inter");
    }

    #[test]
    fn grayscale_desaturates() {
        let f = ImageFilters {
            grayscale: 100.0,
            blur: 4.0,
            ..ImageFilters::default()
        };
        assert_eq!(
            css_filter(&f),
            "brightness(100%) contrast(100%) saturate(0%) blur(2px)"
        );
    }
}
