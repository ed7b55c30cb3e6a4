//! Draw list → Vello drawing commands.
//!
//! Emits fills, strokes, gradients and rect shadows for GPU hosts. Text
//! and images need a font context and decoded textures on the host side,
//! so they are traced and skipped here; the CPU path in [`crate::raster`]
//! is the reference output.

use crate::command::{DrawItem, DrawLayer, DrawList, Paint, Primitive, StrokeSpec};
use bk_core::Color as CardColor;
use bk_core::model::{FillRule, LineCap};
use kurbo::{Affine, BezPath, Cap, Ellipse as KurboEllipse, Point, Rect, Shape, Stroke as KurboStroke};
use peniko::{Brush, Color, ColorStop, Fill, Gradient, Mix};
use vello::Scene;

/// Encode the whole draw list into a fresh Vello scene.
///
/// Content is clipped to the card; overlays are drawn on top, unclipped.
pub fn encode_scene(list: &DrawList) -> Scene {
    let mut scene = Scene::new();
    let card = Rect::new(0.0, 0.0, list.card_width as f64, list.card_height as f64);
    scene.push_layer(Mix::Normal, 1.0, list.view, &card);
    for item in list.items.iter().filter(|i| i.layer != DrawLayer::Overlay) {
        paint_item(&mut scene, list.view, item);
    }
    scene.pop_layer();
    for item in list.items.iter().filter(|i| i.layer == DrawLayer::Overlay) {
        paint_item(&mut scene, list.view, item);
    }
    scene
}

fn paint_item(scene: &mut Scene, view: Affine, item: &DrawItem) {
    let transform = view * item.transform;
    let opacity = item.opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }

    match &item.primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
            corner_radius,
        } => {
            let rect = Rect::new(*x as f64, *y as f64, (x + width) as f64, (y + height) as f64);
            if let Some(shadow) = &item.shadow {
                let offset = Affine::translate((shadow.offset_x as f64, shadow.offset_y as f64));
                scene.draw_blurred_rounded_rect(
                    transform * offset,
                    rect,
                    to_peniko(shadow.color, opacity),
                    *corner_radius as f64,
                    (shadow.blur / 2.0) as f64,
                );
            }
            paint_shape(scene, transform, &rect.to_rounded_rect(*corner_radius as f64), item, opacity, Fill::NonZero);
        }
        Primitive::Ellipse { cx, cy, rx, ry } => {
            let shape = KurboEllipse::new(Point::new(*cx as f64, *cy as f64), (*rx as f64, *ry as f64), 0.0);
            paint_shape(scene, transform, &shape, item, opacity, Fill::NonZero);
        }
        Primitive::Path { data, fill_rule } => match BezPath::from_svg(data) {
            Ok(path) => {
                let rule = match fill_rule {
                    FillRule::Nonzero => Fill::NonZero,
                    FillRule::Evenodd => Fill::EvenOdd,
                };
                paint_shape(scene, transform, &path, item, opacity, rule);
            }
            Err(e) => log::warn!("unparseable path on {:?}: {e:?}", item.node),
        },
        Primitive::Text(run) => {
            log::trace!("TEXT {:?} {} line(s), {}px", item.node, run.lines.len(), run.font_size);
        }
        Primitive::Image { width, height, .. } => {
            log::trace!("IMAGE {:?} {width}x{height}", item.node);
        }
        Primitive::Placeholder { width, height } => {
            let rect = Rect::new(0.0, 0.0, *width as f64, *height as f64);
            paint_shape(scene, transform, &rect, item, opacity, Fill::NonZero);
            if let Some(stroke) = &item.stroke {
                let mut cross = BezPath::new();
                cross.move_to((0.0, 0.0));
                cross.line_to((*width as f64, *height as f64));
                cross.move_to((*width as f64, 0.0));
                cross.line_to((0.0, *height as f64));
                scene.stroke(&kurbo_stroke(stroke), transform, to_peniko(stroke.color, opacity), None, &cross);
            }
        }
    }
}

// ─── Fill and stroke ─────────────────────────────────────────────────────────

fn paint_shape<S: Shape>(scene: &mut Scene, transform: Affine, shape: &S, item: &DrawItem, opacity: f32, rule: Fill) {
    if let Some(paint) = &item.fill {
        scene.fill(rule, transform, &to_brush(paint, opacity), None, shape);
    }
    if let Some(stroke) = &item.stroke {
        scene.stroke(&kurbo_stroke(stroke), transform, to_peniko(stroke.color, opacity), None, shape);
    }
}

fn kurbo_stroke(stroke: &StrokeSpec) -> KurboStroke {
    let cap = map_cap(stroke.cap);
    let base = KurboStroke::new(stroke.width as f64).with_caps(cap);
    if stroke.dash.is_empty() {
        base
    } else {
        base.with_dashes(0.0, stroke.dash.iter().map(|d| *d as f64))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn map_cap(cap: LineCap) -> Cap {
    match cap {
        LineCap::Butt => Cap::Butt,
        LineCap::Round => Cap::Round,
        LineCap::Square => Cap::Square,
    }
}

fn to_peniko(color: CardColor, opacity: f32) -> Color {
    let [r, g, b, a] = color.to_rgba8();
    Color::from_rgba8(r, g, b, (a as f32 * opacity).round() as u8)
}

fn to_brush(paint: &Paint, opacity: f32) -> Brush {
    let stops = |stops: &[(f32, CardColor)]| -> Vec<ColorStop> {
        stops
            .iter()
            .map(|(offset, c)| ColorStop::from((*offset, to_peniko(*c, opacity))))
            .collect()
    };
    match paint {
        Paint::Solid(c) => Brush::Solid(to_peniko(*c, opacity)),
        Paint::Linear { start, end, stops: s } => Brush::Gradient(
            Gradient::new_linear(
                (start.0 as f64, start.1 as f64),
                (end.0 as f64, end.1 as f64),
            )
            .with_stops(stops(s).as_slice()),
        ),
        Paint::Radial {
            center,
            radius,
            stops: s,
        } => Brush::Gradient(
            Gradient::new_radial((center.0 as f64, center.1 as f64), *radius)
                .with_stops(stops(s).as_slice()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DrawItem;

    #[test]
    fn opacity_scales_alpha() {
        let c = to_peniko(CardColor::from_rgba8(10, 20, 30, 200), 0.5);
        assert!((c.components[3] - 100.0 / 255.0).abs() < 1e-3);
    }

    #[test]
    fn encodes_every_primitive_kind() {
        let mut list = DrawList::new(100.0, 50.0);
        let mut rect = DrawItem::new(
            DrawLayer::Background,
            Primitive::Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 50.0,
                corner_radius: 4.0,
            },
        );
        rect.fill = Some(Paint::Linear {
            start: (0.0, 0.0),
            end: (100.0, 0.0),
            stops: vec![(0.0, CardColor::BLACK), (1.0, CardColor::WHITE)],
        });
        list.push(rect);
        let mut path = DrawItem::new(
            DrawLayer::Content,
            Primitive::Path {
                data: "M0 0L10 10Z".into(),
                fill_rule: FillRule::Evenodd,
            },
        );
        path.fill = Some(Paint::Solid(CardColor::BLACK));
        list.push(path);
        list.push(DrawItem::new(
            DrawLayer::Content,
            Primitive::Path {
                data: "not a path".into(),
                fill_rule: FillRule::Nonzero,
            },
        ));
        list.push(DrawItem::new(
            DrawLayer::Overlay,
            Primitive::Placeholder {
                width: 10.0,
                height: 10.0,
            },
        ));
        let scene = encode_scene(&list);
        assert!(!scene.encoding().is_empty());
    }
}
