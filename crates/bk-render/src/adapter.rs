//! Scene → draw list.
//!
//! Dispatches on node type. Icons and QR codes go through an extra
//! synthesis step that produces an image href. Node-level failures never
//! abort the pass: the node becomes a placeholder and a warning is
//! logged.

use crate::assets::{AssetCache, AssetResolver, AssetState};
use crate::command::{DrawItem, DrawLayer, DrawList, Paint, Primitive, ShadowSpec, StrokeSpec, TextRun};
use crate::error::Result;
use crate::icon::{IconGlyph, IconProvider, IconSet, icon_data_uri};
use crate::qr::qr_svg_data_uri;
use crate::raster::{Surface, rasterize_svg};
use crate::svg::to_svg;
use bk_core::background::{Background, GradientType, PatternBackground};
use bk_core::color::is_blank_fill;
use bk_core::model::{
    ArrowProps, CropRect, FillRule, ImageProps, LineCap, LineProps, Node, NodeKind, TextProps,
    icon_visual_size,
};
use bk_core::{Color, NodeId, Scene, ViewportState};
use kurbo::Affine;
use serde::Deserialize;
use std::f32::consts::PI;
use std::fmt::Write as _;

/// Average glyph advance as a fraction of font size, for line wrapping.
const AVG_GLYPH_ADVANCE: f32 = 0.55;

const SELECTION_COLOR: Color = Color::rgba(0.231, 0.510, 0.965, 1.0);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderOptions {
    /// Opacity of the tint drawn over pattern backgrounds.
    pub pattern_overlay_opacity: f32,
    pub placeholder_fill: String,
    pub placeholder_stroke: String,
    /// Load system fonts for text rasterization.
    pub load_system_fonts: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pattern_overlay_opacity: 0.1,
            placeholder_fill: "#E5E7EB".into(),
            placeholder_stroke: "#9CA3AF".into(),
            load_system_fonts: true,
        }
    }
}

/// Renders scenes with the given icon and image collaborators.
pub struct Renderer<'a> {
    icons: &'a dyn IconProvider,
    assets: &'a dyn AssetResolver,
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(icons: &'a dyn IconProvider, assets: &'a dyn AssetResolver) -> Self {
        Self {
            icons,
            assets,
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Draw list in card coordinates, 1:1, no overlays.
    pub fn build(&self, scene: &Scene) -> DrawList {
        let mut list = DrawList::new(scene.width, scene.height);
        self.push_background(&mut list, scene);
        for layer in scene.layers() {
            let node = layer.props.as_ref();
            if !node.base.visible {
                continue;
            }
            log::trace!("draw {} {}", node.node_type(), node.id());
            let start = list.items.len();
            self.push_node(&mut list, node);
            let transform = node_transform(node);
            let shadow = node_shadow(node);
            for item in &mut list.items[start..] {
                item.node = Some(node.id());
                item.transform = transform * item.transform;
                item.opacity = node.base.opacity;
                item.shadow = shadow;
            }
        }
        list
    }

    /// Scale-to-fit preview inside a container, centred.
    pub fn render_preview(&self, scene: &Scene, container_width: f32, container_height: f32) -> DrawList {
        let viewport = ViewportState::fit(container_width, container_height, scene.width, scene.height);
        let mut list = self.build(scene);
        apply_viewport(&mut list, &viewport);
        list
    }

    /// Editing-stage frame: the live viewport plus selection outlines when
    /// overlays are visible.
    pub fn render_frame(
        &self,
        scene: &Scene,
        viewport: &ViewportState,
        selection: &[NodeId],
        overlays_visible: bool,
    ) -> DrawList {
        let mut list = self.build(scene);
        apply_viewport(&mut list, viewport);
        if overlays_visible {
            let hairline = 1.0 / viewport.scale.max(f32::EPSILON);
            for node in selection.iter().filter_map(|id| scene.node(*id)) {
                let b = node.bounds();
                let mut item = DrawItem::new(
                    DrawLayer::Overlay,
                    Primitive::Rect {
                        x: b.x - node.base.x,
                        y: b.y - node.base.y,
                        width: b.width,
                        height: b.height,
                        corner_radius: 0.0,
                    },
                );
                item.transform = node_transform(node);
                item.stroke = Some(StrokeSpec {
                    color: SELECTION_COLOR,
                    width: hairline,
                    cap: LineCap::Butt,
                    dash: Vec::new(),
                });
                list.push(item);
            }
        }
        list
    }

    /// Rasterize the scene at `pixel_ratio`, cropped to `crop` in card
    /// coordinates (default: the card).
    pub fn render_export_surface(
        &self,
        scene: &Scene,
        pixel_ratio: f32,
        crop: Option<CropRect>,
    ) -> Result<Surface> {
        let svg = to_svg(&self.build(scene));
        rasterize_svg(&svg, pixel_ratio, crop, self.options.load_system_fonts)
    }

    // ─── Background ──────────────────────────────────────────────────────

    fn push_background(&self, list: &mut DrawList, scene: &Scene) {
        let (w, h) = (scene.width, scene.height);
        let card = || Primitive::Rect {
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
            corner_radius: 0.0,
        };
        let mut base = DrawItem::new(DrawLayer::Background, card());
        base.fill = Some(match &scene.background {
            Background::Solid(s) => Paint::Solid(parse_or(&s.color1, Color::WHITE)),
            Background::Gradient(g) => {
                let stops: Vec<(f32, Color)> = g
                    .effective_stops()
                    .iter()
                    .map(|s| (s.offset, parse_or(&s.color, Color::BLACK)))
                    .collect();
                match g.gradient_type {
                    GradientType::Linear => {
                        let (start, end) = linear_endpoints(w, h, g.rotation);
                        Paint::Linear { start, end, stops }
                    }
                    GradientType::Radial => Paint::Radial {
                        center: (w / 2.0, h / 2.0),
                        radius: w.max(h) / 1.5,
                        stops,
                    },
                }
            }
            Background::Pattern(p) | Background::Texture(p) => {
                Paint::Solid(parse_or(&p.color1, Color::WHITE))
            }
        });
        list.push(base);

        let tint = match &scene.background {
            Background::Pattern(p) => Some(overlay_tint(&p.pattern_color, self.options.pattern_overlay_opacity)),
            Background::Texture(p) => Some(texture_tint(p)),
            _ => None,
        };
        if let Some(tint) = tint.flatten() {
            let mut overlay = DrawItem::new(DrawLayer::Background, card());
            overlay.fill = Some(Paint::Solid(tint));
            list.push(overlay);
        }
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    fn push_node(&self, list: &mut DrawList, node: &Node) {
        let b = &node.base;
        let fill = fill_paint(b.fill.as_deref());
        let stroke = stroke_spec(node, LineCap::Butt, &[]);
        let mut shape = |primitive: Primitive, fill: Option<Paint>, stroke: Option<StrokeSpec>| {
            let mut item = DrawItem::new(DrawLayer::Content, primitive);
            item.fill = fill;
            item.stroke = stroke;
            list.push(item);
        };

        match &node.kind {
            NodeKind::Rect(r) => shape(
                Primitive::Rect {
                    x: 0.0,
                    y: 0.0,
                    width: b.width,
                    height: b.height,
                    corner_radius: r.corner_radius,
                },
                fill,
                stroke,
            ),
            NodeKind::Circle(c) => shape(
                Primitive::Ellipse {
                    cx: 0.0,
                    cy: 0.0,
                    rx: c.radius,
                    ry: c.radius,
                },
                fill,
                stroke,
            ),
            NodeKind::Ellipse(e) => shape(
                Primitive::Ellipse {
                    cx: 0.0,
                    cy: 0.0,
                    rx: e.radius_x,
                    ry: e.radius_y,
                },
                fill,
                stroke,
            ),
            NodeKind::Star(s) => shape(
                Primitive::Path {
                    data: star_path(s.num_points, s.inner_radius, s.outer_radius),
                    fill_rule: FillRule::Nonzero,
                },
                fill,
                stroke,
            ),
            NodeKind::RegularPolygon(p) => shape(
                Primitive::Path {
                    data: polygon_path(p.sides, p.radius),
                    fill_rule: FillRule::Nonzero,
                },
                fill,
                stroke,
            ),
            NodeKind::Line(LineProps {
                points,
                line_cap,
                dash,
            }) => shape(
                Primitive::Path {
                    data: polyline_path(points),
                    fill_rule: FillRule::Nonzero,
                },
                None,
                stroke_spec(node, *line_cap, dash),
            ),
            NodeKind::Arrow(arrow) => {
                shape(
                    Primitive::Path {
                        data: polyline_path(&arrow.points),
                        fill_rule: FillRule::Nonzero,
                    },
                    None,
                    stroke.clone(),
                );
                let head_fill = fill.or_else(|| stroke.as_ref().map(|s| Paint::Solid(s.color)));
                for head in arrow_heads(arrow) {
                    shape(
                        Primitive::Path {
                            data: head,
                            fill_rule: FillRule::Nonzero,
                        },
                        head_fill.clone(),
                        stroke.clone(),
                    );
                }
            }
            NodeKind::Path(p) => {
                let scale = Affine::scale_non_uniform(p.scale_x as f64, p.scale_y as f64);
                let mut subpaths: Vec<(String, Option<Paint>, FillRule)> = Vec::new();
                if !p.data.is_empty() {
                    subpaths.push((p.data.clone(), fill.clone(), FillRule::Nonzero));
                }
                for sub in &p.paths {
                    let sub_fill = match sub.fill.as_deref() {
                        Some(f) => fill_paint(Some(f)),
                        None => fill.clone(),
                    };
                    subpaths.push((sub.data.clone(), sub_fill, sub.fill_rule));
                }
                for (data, sub_fill, fill_rule) in subpaths {
                    let mut item = DrawItem::new(DrawLayer::Content, Primitive::Path { data, fill_rule });
                    item.fill = sub_fill;
                    item.stroke = stroke.clone();
                    item.transform = scale;
                    list.push(item);
                }
            }
            NodeKind::Text(t) => shape(Primitive::Text(text_run(t, b.width)), fill.or(Some(Paint::Solid(Color::BLACK))), stroke),
            NodeKind::Image(img) => self.push_image(list, node, img),
            NodeKind::Icon(icon) => {
                let width = icon_visual_size(b.width, icon.scale_x);
                let height = icon_visual_size(b.height, icon.scale_y);
                let glyph = self.icons.resolve_icon(&icon.icon_name).or_else(|| {
                    (!icon.data.is_empty()).then(|| IconGlyph::from_path_data(&icon.data))
                });
                match glyph {
                    Some(glyph) => {
                        let fill = b.fill.as_deref().filter(|f| !is_blank_fill(f)).unwrap_or("#000000");
                        let href = icon_data_uri(&glyph, fill, b.stroke.as_deref(), b.stroke_width.unwrap_or(0.0));
                        list.push(image_item(href, width, height, &ImageProps::default()));
                    }
                    None => {
                        log::warn!("icon `{}` on {} could not be resolved", icon.icon_name, node.id());
                        list.push(self.placeholder(width, height));
                    }
                }
            }
        }
    }

    fn push_image(&self, list: &mut DrawList, node: &Node, img: &ImageProps) {
        let (w, h) = (node.base.width, node.base.height);
        if let Some(meta) = &img.qr_metadata {
            let edge = w.max(h).ceil().max(1.0) as u32;
            match qr_svg_data_uri(meta, edge) {
                Ok(href) => {
                    list.push(image_item(href, w, h, img));
                    return;
                }
                Err(e) => log::warn!("QR for {} not regenerated, using stored src: {e}", node.id()),
            }
        }
        match self.assets.resolve(&img.src) {
            AssetState::Ready(href) => list.push(image_item(href, w, h, img)),
            AssetState::Pending => log::trace!("image for {} still loading", node.id()),
            AssetState::Failed(reason) => {
                log::warn!("image for {} failed: {reason}", node.id());
                list.push(self.placeholder(w, h));
            }
        }
    }

    fn placeholder(&self, width: f32, height: f32) -> DrawItem {
        let mut item = DrawItem::new(DrawLayer::Content, Primitive::Placeholder { width, height });
        item.fill = fill_paint(Some(&self.options.placeholder_fill));
        item.stroke = Some(StrokeSpec {
            color: parse_or(&self.options.placeholder_stroke, Color::BLACK),
            width: 1.0,
            cap: LineCap::Butt,
            dash: Vec::new(),
        });
        item
    }
}

/// Preview with no icon provider and only inline images.
pub fn render_preview(scene: &Scene, container_width: f32, container_height: f32) -> DrawList {
    let (icons, assets) = (IconSet::new(), AssetCache::new());
    Renderer::new(&icons, &assets).render_preview(scene, container_width, container_height)
}

/// Export surface with no icon provider and only inline images.
pub fn render_export_surface(scene: &Scene, pixel_ratio: f32, crop: Option<CropRect>) -> Result<Surface> {
    let (icons, assets) = (IconSet::new(), AssetCache::new());
    Renderer::new(&icons, &assets).render_export_surface(scene, pixel_ratio, crop)
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn apply_viewport(list: &mut DrawList, viewport: &ViewportState) {
    list.width = viewport.width;
    list.height = viewport.height;
    list.view = Affine::translate((viewport.x as f64, viewport.y as f64))
        * Affine::scale(viewport.scale as f64);
}

fn node_transform(node: &Node) -> Affine {
    Affine::translate((node.base.x as f64, node.base.y as f64))
        * Affine::rotate((node.base.rotation as f64).to_radians())
}

fn node_shadow(node: &Node) -> Option<ShadowSpec> {
    let shadow = node.base.shadow.as_ref()?;
    let color = Color::parse(&shadow.color)?;
    Some(ShadowSpec {
        color,
        blur: shadow.blur.max(0.0),
        offset_x: shadow.offset_x,
        offset_y: shadow.offset_y,
    })
}

fn parse_or(value: &str, fallback: Color) -> Color {
    Color::parse(value).unwrap_or(fallback)
}

fn fill_paint(fill: Option<&str>) -> Option<Paint> {
    let fill = fill.filter(|f| !is_blank_fill(f))?;
    match Color::parse(fill) {
        Some(c) => Some(Paint::Solid(c)),
        None => {
            log::trace!("unpaintable fill `{fill}`");
            None
        }
    }
}

fn stroke_spec(node: &Node, cap: LineCap, dash: &[f32]) -> Option<StrokeSpec> {
    let width = node.base.stroke_width.unwrap_or(0.0);
    let color = node.base.stroke.as_deref().filter(|s| !is_blank_fill(s))?;
    if width <= 0.0 {
        return None;
    }
    Some(StrokeSpec {
        color: Color::parse(color)?,
        width,
        cap,
        dash: dash.to_vec(),
    })
}

fn overlay_tint(color: &str, opacity: f32) -> Option<Color> {
    Color::parse(color).map(|c| c.with_alpha(c.a * opacity.clamp(0.0, 1.0)))
}

fn texture_tint(p: &PatternBackground) -> Option<Color> {
    let color = p.overlay_color.as_deref().unwrap_or(&p.pattern_color);
    overlay_tint(color, p.opacity)
}

/// Start and end of a linear gradient: the card centre ± the rotation
/// direction scaled to half the diagonal.
pub fn linear_endpoints(width: f32, height: f32, rotation_deg: f32) -> ((f32, f32), (f32, f32)) {
    let (cx, cy) = (width / 2.0, height / 2.0);
    let half_diag = (width * width + height * height).sqrt() / 2.0;
    let angle = rotation_deg.to_radians();
    let (dx, dy) = (angle.cos() * half_diag, angle.sin() * half_diag);
    ((cx - dx, cy - dy), (cx + dx, cy + dy))
}

fn image_item(href: String, width: f32, height: f32, img: &ImageProps) -> DrawItem {
    DrawItem::new(
        DrawLayer::Content,
        Primitive::Image {
            href,
            width,
            height,
            flip_horizontal: img.flip_horizontal,
            flip_vertical: img.flip_vertical,
            filters: (!img.filters.is_identity()).then(|| img.filters.clone()),
            crop: img.crop,
        },
    )
}

fn text_run(t: &TextProps, width: f32) -> TextRun {
    TextRun {
        lines: wrap_text(&t.text, width, t.font_size, t.letter_spacing),
        width,
        font_size: t.font_size,
        font_family: t.font_family.clone(),
        bold: t.is_bold(),
        italic: t.is_italic(),
        align: t.align,
        line_height: t.line_height,
        letter_spacing: t.letter_spacing,
        decoration: t.text_decoration.clone(),
    }
}

/// Greedy word wrap against an estimated glyph advance. Explicit newlines
/// always break; a single overlong word keeps its own line.
pub fn wrap_text(text: &str, width: f32, font_size: f32, letter_spacing: f32) -> Vec<String> {
    let advance = font_size * AVG_GLYPH_ADVANCE + letter_spacing;
    let max_chars = if width > 0.0 && advance > 0.0 {
        ((width / advance).floor() as usize).max(1)
    } else {
        usize::MAX
    };
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split(' ') {
            let needed = line.chars().count() + usize::from(!line.is_empty()) + word.chars().count();
            if !line.is_empty() && needed > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    lines
}

fn closed_path(points: impl Iterator<Item = (f32, f32)>) -> String {
    let mut d = String::new();
    for (i, (x, y)) in points.enumerate() {
        let _ = write!(d, "{}{x} {y}", if i == 0 { "M" } else { "L" });
    }
    d.push('Z');
    d
}

/// Alternating outer/inner vertices, first point straight up.
pub fn star_path(num_points: u32, inner: f32, outer: f32) -> String {
    let n = num_points.max(2);
    closed_path((0..n * 2).map(|i| {
        let r = if i % 2 == 0 { outer } else { inner };
        let a = i as f32 * PI / n as f32;
        (r * a.sin(), -r * a.cos())
    }))
}

pub fn polygon_path(sides: u32, radius: f32) -> String {
    let n = sides.max(3);
    closed_path((0..n).map(|i| {
        let a = i as f32 * 2.0 * PI / n as f32;
        (radius * a.sin(), -radius * a.cos())
    }))
}

fn polyline_path(points: &[f32]) -> String {
    let mut d = String::new();
    for (i, p) in points.chunks_exact(2).enumerate() {
        let _ = write!(d, "{}{} {}", if i == 0 { "M" } else { "L" }, p[0], p[1]);
    }
    d
}

/// Triangular heads at the last point, and the first when requested.
fn arrow_heads(arrow: &ArrowProps) -> Vec<String> {
    let pts: Vec<(f32, f32)> = arrow.points.chunks_exact(2).map(|p| (p[0], p[1])).collect();
    let n = pts.len();
    if n < 2 {
        return Vec::new();
    }
    let head = |tip: (f32, f32), from: (f32, f32)| {
        let (dx, dy) = (tip.0 - from.0, tip.1 - from.1);
        let len = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
        let (ux, uy) = (dx / len, dy / len);
        let base = (tip.0 - ux * arrow.pointer_length, tip.1 - uy * arrow.pointer_length);
        let half = arrow.pointer_width / 2.0;
        closed_path(
            [
                tip,
                (base.0 - uy * half, base.1 + ux * half),
                (base.0 + uy * half, base.1 - ux * half),
            ]
            .into_iter(),
        )
    };
    let mut heads = vec![head(pts[n - 1], pts[n - 2])];
    if arrow.pointer_at_beginning {
        heads.push(head(pts[0], pts[1]));
    }
    heads
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_core::model::{NodeType, QrMetadata};
    use bk_core::{LayerDefinition, Node};
    use pretty_assertions::assert_eq;

    fn scene_with(nodes: Vec<Node>) -> Scene {
        let mut scene = Scene::new(1050.0, 600.0);
        for node in nodes {
            scene.insert(LayerDefinition::new(node), None).unwrap();
        }
        scene
    }

    #[test]
    fn preview_scales_to_fit_and_centres() {
        let list = render_preview(&scene_with(vec![]), 525.0, 600.0);
        let [s, _, _, _, tx, ty] = list.view.as_coeffs();
        assert_eq!(s, 0.5);
        assert_eq!(tx, 0.0);
        assert_eq!(ty, 150.0);
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let mut hidden = Node::new(NodeType::Rect, NodeId::intern("hidden"));
        hidden.base.visible = false;
        let list = render_preview(&scene_with(vec![hidden]), 100.0, 100.0);
        assert_eq!(list.items_for(NodeId::intern("hidden")).count(), 0);
    }

    #[test]
    fn pattern_background_gets_a_tint() {
        let mut scene = scene_with(vec![]);
        scene.background = Background::Pattern(PatternBackground {
            color1: "#FFFFFF".into(),
            pattern_color: "#FF0000".into(),
            ..PatternBackground::default()
        });
        let list = render_preview(&scene, 100.0, 100.0);
        assert_eq!(list.items.len(), 2);
        let Some(Paint::Solid(tint)) = &list.items[1].fill else {
            panic!("expected solid tint");
        };
        assert!((tint.a - 0.1).abs() < 1e-6);
    }

    #[test]
    fn linear_gradient_spans_half_diagonal() {
        let ((x0, y0), (x1, y1)) = linear_endpoints(600.0, 800.0, 0.0);
        assert_eq!((x0, y0), (-200.0, 400.0));
        assert_eq!((x1, y1), (800.0, 400.0));
    }

    #[test]
    fn unresolved_icon_becomes_placeholder() {
        let mut icon = Node::new(NodeType::Icon, NodeId::intern("icon-x"));
        if let NodeKind::Icon(i) = &mut icon.kind {
            i.icon_name = "mdi:missing".into();
        }
        let list = render_preview(&scene_with(vec![icon]), 100.0, 100.0);
        let items: Vec<_> = list.items_for(NodeId::intern("icon-x")).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0].primitive, Primitive::Placeholder { .. }));
    }

    #[test]
    fn resolved_icon_is_an_image() {
        let mut icons = IconSet::new();
        icons.insert("mdi:phone", IconGlyph::from_path_data("M0 0h24v24H0z"));
        let assets = AssetCache::new();
        let mut icon = Node::new(NodeType::Icon, NodeId::intern("icon-ok"));
        if let NodeKind::Icon(i) = &mut icon.kind {
            i.icon_name = "mdi:phone".into();
            i.scale_x = 0.5;
        }
        let scene = scene_with(vec![icon]);
        let list = Renderer::new(&icons, &assets).build(&scene);
        let item = list.items_for(NodeId::intern("icon-ok")).next().unwrap();
        let Primitive::Image { href, width, .. } = &item.primitive else {
            panic!("expected image");
        };
        assert!(href.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(*width, 30.0);
    }

    #[test]
    fn pending_image_draws_nothing_failed_draws_placeholder() {
        let mut pending = Node::new(NodeType::Image, NodeId::intern("img-pending"));
        if let NodeKind::Image(i) = &mut pending.kind {
            i.src = "https://cdn.example.com/photo.jpg".into();
        }
        let broken = Node::new(NodeType::Image, NodeId::intern("img-broken"));
        let list = render_preview(&scene_with(vec![pending, broken]), 100.0, 100.0);
        assert_eq!(list.items_for(NodeId::intern("img-pending")).count(), 0);
        assert_eq!(list.items_for(NodeId::intern("img-broken")).count(), 1);
    }

    #[test]
    fn qr_is_regenerated_from_metadata() {
        let mut qr = Node::new(NodeType::Image, NodeId::intern("qr-node"));
        if let NodeKind::Image(i) = &mut qr.kind {
            i.src = "data:image/png;base64,STALE".into();
            i.qr_metadata = Some(QrMetadata {
                value: "https://example.com".into(),
                ..QrMetadata::default()
            });
        }
        let list = render_preview(&scene_with(vec![qr]), 100.0, 100.0);
        let item = list.items_for(NodeId::intern("qr-node")).next().unwrap();
        let Primitive::Image { href, .. } = &item.primitive else {
            panic!("expected image");
        };
        assert!(href.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn qr_stays_sharp_at_print_ratio() {
        let mut qr = Node::new(NodeType::Image, NodeId::intern("qr-print"));
        qr.base.x = 100.0;
        qr.base.y = 100.0;
        qr.base.width = 290.0;
        qr.base.height = 290.0;
        if let NodeKind::Image(i) = &mut qr.kind {
            i.qr_metadata = Some(QrMetadata {
                value: "https://example.com".into(),
                ..QrMetadata::default()
            });
        }
        let img = render_export_surface(&scene_with(vec![qr]), 4.0, None)
            .unwrap()
            .to_rgba_image();
        // Quiet zone, then the centre of the top-left finder pattern.
        assert_eq!(img.get_pixel(4 * 102, 4 * 102).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(4 * 158, 4 * 158).0, [0, 0, 0, 255]);
    }

    #[test]
    fn overlays_only_when_visible() {
        let rect = Node::new(NodeType::Rect, NodeId::intern("sel"));
        let scene = scene_with(vec![rect]);
        let (icons, assets) = (IconSet::new(), AssetCache::new());
        let renderer = Renderer::new(&icons, &assets);
        let vp = ViewportState::identity(1050.0, 600.0);
        let sel = [NodeId::intern("sel")];
        assert!(renderer.render_frame(&scene, &vp, &sel, true).has_overlays());
        assert!(!renderer.render_frame(&scene, &vp, &sel, false).has_overlays());
    }

    #[test]
    fn wrap_breaks_on_width_and_newlines() {
        let lines = wrap_text("one two three\nfour", 55.0, 10.0, 0.0);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn star_has_twice_the_points() {
        let d = star_path(5, 10.0, 20.0);
        assert_eq!(d.matches('L').count(), 9);
        assert!(d.starts_with("M0 -20"));
    }

    #[test]
    fn export_surface_matches_pixel_ratio() {
        let surface = render_export_surface(&scene_with(vec![]), 0.1, None).unwrap();
        assert_eq!((surface.width(), surface.height()), (105, 60));
    }
}
