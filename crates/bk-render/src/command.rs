//! Draw list: the renderer's inspectable output.
//!
//! A [`DrawList`] is a flat, back-to-front sequence of primitives in card
//! coordinates, each with its own transform, opacity and shadow. It is
//! what preview callers receive, and what the SVG, Vello and Canvas2D
//! encoders consume.

use bk_core::model::{CropRect, FillRule, ImageFilters, LineCap, TextAlign};
use bk_core::{Color, NodeId};
use kurbo::Affine;

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear {
        start: (f32, f32),
        end: (f32, f32),
        stops: Vec<(f32, Color)>,
    },
    Radial {
        center: (f32, f32),
        radius: f32,
        stops: Vec<(f32, Color)>,
    },
}

impl Paint {
    /// A representative flat color, for encoders without gradient support.
    pub fn base_color(&self) -> Color {
        match self {
            Paint::Solid(c) => *c,
            Paint::Linear { stops, .. } | Paint::Radial { stops, .. } => {
                stops.first().map_or(Color::BLACK, |(_, c)| *c)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeSpec {
    pub color: Color,
    pub width: f32,
    pub cap: LineCap,
    pub dash: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSpec {
    pub color: Color,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub lines: Vec<String>,
    pub width: f32,
    pub font_size: f32,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub align: TextAlign,
    /// Multiple of `font_size`.
    pub line_height: f32,
    pub letter_spacing: f32,
    pub decoration: String,
}

/// Shapes in the item's local coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        corner_radius: f32,
    },
    Ellipse {
        cx: f32,
        cy: f32,
        rx: f32,
        ry: f32,
    },
    /// SVG path data.
    Path { data: String, fill_rule: FillRule },
    Text(TextRun),
    Image {
        href: String,
        width: f32,
        height: f32,
        flip_horizontal: bool,
        flip_vertical: bool,
        filters: Option<ImageFilters>,
        crop: Option<CropRect>,
    },
    /// Visible stand-in for an asset that failed to resolve.
    Placeholder { width: f32, height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawLayer {
    Background,
    Content,
    /// Selection outlines; never part of exported output.
    Overlay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawItem {
    /// Source node, `None` for background and overlay chrome.
    pub node: Option<NodeId>,
    pub layer: DrawLayer,
    pub primitive: Primitive,
    pub fill: Option<Paint>,
    pub stroke: Option<StrokeSpec>,
    pub transform: Affine,
    pub opacity: f32,
    pub shadow: Option<ShadowSpec>,
}

impl DrawItem {
    pub fn new(layer: DrawLayer, primitive: Primitive) -> Self {
        Self {
            node: None,
            layer,
            primitive,
            fill: None,
            stroke: None,
            transform: Affine::IDENTITY,
            opacity: 1.0,
            shadow: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    /// Output surface size in pixels.
    pub width: f32,
    pub height: f32,
    /// Card → surface mapping (scale-to-fit for previews).
    pub view: Affine,
    /// Card size; content outside is clipped.
    pub card_width: f32,
    pub card_height: f32,
    pub items: Vec<DrawItem>,
}

impl DrawList {
    pub fn new(card_width: f32, card_height: f32) -> Self {
        Self {
            width: card_width,
            height: card_height,
            view: Affine::IDENTITY,
            card_width,
            card_height,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: DrawItem) {
        self.items.push(item);
    }

    /// Items drawn for a given node, in order.
    pub fn items_for(&self, id: NodeId) -> impl Iterator<Item = &DrawItem> {
        self.items.iter().filter(move |i| i.node == Some(id))
    }

    pub fn has_overlays(&self) -> bool {
        self.items.iter().any(|i| i.layer == DrawLayer::Overlay)
    }
}
