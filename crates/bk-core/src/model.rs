//! Node model: the closed set of drawable variants on a card.
//!
//! A [`Node`] is a shared [`NodeBase`] (id, geometry, paint, shadow) plus a
//! [`NodeKind`] tagged by `type`. Both halves are flattened into a single
//! JSON object, so `{"type": "Text", "id": "t1", "x": 10, "text": "Hi"}`
//! is one node.
//!
//! Circle, Ellipse, Star and RegularPolygon are centre-anchored: `x`/`y` is
//! the centre and `width`/`height` are derived, never authoritative.

use crate::error::{CoreError, Result};
use crate::id::NodeId;
use crate::roles::ColorRole;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Visual base box for icons; scale is always relative to this.
pub const ICON_BASE_SIZE: f32 = 60.0;

/// Longest side for a freshly placed image.
pub const IMAGE_PLACEMENT_BOX: f32 = 300.0;

// ─── Node type tag ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Text,
    Rect,
    Image,
    Circle,
    Ellipse,
    Star,
    RegularPolygon,
    Line,
    Arrow,
    Path,
    Icon,
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        NodeType::Text,
        NodeType::Rect,
        NodeType::Image,
        NodeType::Circle,
        NodeType::Ellipse,
        NodeType::Star,
        NodeType::RegularPolygon,
        NodeType::Line,
        NodeType::Arrow,
        NodeType::Path,
        NodeType::Icon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Text => "Text",
            NodeType::Rect => "Rect",
            NodeType::Image => "Image",
            NodeType::Circle => "Circle",
            NodeType::Ellipse => "Ellipse",
            NodeType::Star => "Star",
            NodeType::RegularPolygon => "RegularPolygon",
            NodeType::Line => "Line",
            NodeType::Arrow => "Arrow",
            NodeType::Path => "Path",
            NodeType::Icon => "Icon",
        }
    }

    /// Lowercased type name, used as an id prefix.
    pub fn id_prefix(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::InvalidNodeType(s.to_string()))
    }
}

// ─── Shared attributes ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub color: String,
    #[serde(default)]
    pub blur: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Attributes every node carries regardless of its variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeBase {
    pub id: NodeId,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    /// Degrees, clockwise.
    #[serde(default)]
    pub rotation: f32,
    /// Stored and rendered in [0, 1]. The editor's 0–100 scale is converted
    /// only by [`opacity_from_percent`] / [`opacity_to_percent`].
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
    /// Set by the color-role pass; read only when recoloring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_color_role: Option<ColorRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color_role: Option<ColorRole>,
}

impl NodeBase {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            opacity: 1.0,
            visible: true,
            fill: None,
            stroke: None,
            stroke_width: None,
            shadow: None,
            shadow_color_role: None,
            stroke_color_role: None,
        }
    }
}

// ─── Variant props ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextProps {
    pub text: String,
    pub font_size: f32,
    pub font_family: String,
    /// `normal`, `bold`, `italic` or `italic bold`.
    pub font_style: String,
    /// Empty, `underline` or `line-through`.
    pub text_decoration: String,
    pub align: TextAlign,
    /// Multiple of `font_size`.
    pub line_height: f32,
    pub letter_spacing: f32,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            text: "Text".into(),
            font_size: 28.0,
            font_family: "Inter".into(),
            font_style: "normal".into(),
            text_decoration: String::new(),
            align: TextAlign::Left,
            line_height: 1.2,
            letter_spacing: 0.0,
        }
    }
}

impl TextProps {
    pub fn is_bold(&self) -> bool {
        self.font_style.contains("bold")
    }

    pub fn is_italic(&self) -> bool {
        self.font_style.contains("italic")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RectProps {
    pub corner_radius: f32,
}

/// Image adjustments. Brightness, contrast and saturate are percentages in
/// 0–200 (100 = unchanged); grayscale is 0–100 %; blur is 0–100 px.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageFilters {
    pub brightness: f32,
    pub contrast: f32,
    pub saturate: f32,
    pub blur: f32,
    pub grayscale: f32,
}

impl Default for ImageFilters {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            saturate: 100.0,
            blur: 0.0,
            grayscale: 0.0,
        }
    }
}

impl ImageFilters {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    fn clamp(&mut self) {
        self.brightness = self.brightness.clamp(0.0, 200.0);
        self.contrast = self.contrast.clamp(0.0, 200.0);
        self.saturate = self.saturate.clamp(0.0, 200.0);
        self.blur = self.blur.clamp(0.0, 100.0);
        self.grayscale = self.grayscale.clamp(0.0, 100.0);
    }
}

/// Source rectangle in natural image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrDotStyle {
    #[default]
    Square,
    Rounded,
    Dots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrEyeStyle {
    #[default]
    Square,
    Rounded,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QrErrorCorrection {
    L,
    #[default]
    M,
    Q,
    H,
}

/// Everything needed to regenerate a QR bitmap from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QrMetadata {
    pub value: String,
    pub fg_color: String,
    pub bg_color: String,
    pub dot_style: QrDotStyle,
    pub eye_style: QrEyeStyle,
    pub error_correction: QrErrorCorrection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Logo edge as a fraction of the QR edge.
    pub logo_size: f32,
}

impl Default for QrMetadata {
    fn default() -> Self {
        Self {
            value: String::new(),
            fg_color: "#000000".into(),
            bg_color: "#FFFFFF".into(),
            dot_style: QrDotStyle::Square,
            eye_style: QrEyeStyle::Square,
            error_correction: QrErrorCorrection::M,
            logo: None,
            logo_size: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageProps {
    pub src: String,
    pub filters: ImageFilters,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_metadata: Option<QrMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropRect>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircleProps {
    pub radius: f32,
}

impl Default for CircleProps {
    fn default() -> Self {
        Self { radius: 50.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EllipseProps {
    pub radius_x: f32,
    pub radius_y: f32,
}

impl Default for EllipseProps {
    fn default() -> Self {
        Self {
            radius_x: 60.0,
            radius_y: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StarProps {
    pub num_points: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
}

impl Default for StarProps {
    fn default() -> Self {
        Self {
            num_points: 5,
            inner_radius: 20.0,
            outer_radius: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolygonProps {
    pub sides: u32,
    pub radius: f32,
}

impl Default for PolygonProps {
    fn default() -> Self {
        Self {
            sides: 6,
            radius: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Flat `[x0, y0, x1, y1, ...]` points relative to the node origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LineProps {
    pub points: Vec<f32>,
    pub line_cap: LineCap,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dash: Vec<f32>,
}

impl Default for LineProps {
    fn default() -> Self {
        Self {
            points: vec![0.0, 0.0, 150.0, 0.0],
            line_cap: LineCap::Round,
            dash: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArrowProps {
    pub points: Vec<f32>,
    pub pointer_length: f32,
    pub pointer_width: f32,
    pub pointer_at_beginning: bool,
}

impl Default for ArrowProps {
    fn default() -> Self {
        Self {
            points: vec![0.0, 0.0, 150.0, 0.0],
            pointer_length: 12.0,
            pointer_width: 12.0,
            pointer_at_beginning: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillRule {
    #[default]
    Nonzero,
    Evenodd,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubPath {
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    pub fill_rule: FillRule,
}

/// A vector path: either one `data` string or several `paths`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathProps {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<SubPath>,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for PathProps {
    fn default() -> Self {
        Self {
            data: String::new(),
            paths: Vec::new(),
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IconProps {
    /// Fallback path data used when `icon_name` cannot be resolved.
    pub data: String,
    pub icon_name: String,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for IconProps {
    fn default() -> Self {
        Self {
            data: String::new(),
            icon_name: String::new(),
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

/// Visual size of an icon edge: `base × scale`.
pub fn icon_visual_size(base: f32, scale: f32) -> f32 {
    base * scale
}

/// Back-solve the scale that yields `visual` for an icon of `base` size.
pub fn icon_scale_for_visual_size(base: f32, visual: f32) -> f32 {
    if base <= 0.0 { 1.0 } else { visual / base }
}

// ─── Node ────────────────────────────────────────────────────────────────

/// Variant-specific payload, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    Text(TextProps),
    Rect(RectProps),
    Image(ImageProps),
    Circle(CircleProps),
    Ellipse(EllipseProps),
    Star(StarProps),
    RegularPolygon(PolygonProps),
    Line(LineProps),
    Arrow(ArrowProps),
    Path(PathProps),
    Icon(IconProps),
}

impl NodeKind {
    pub fn default_for(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Text => NodeKind::Text(TextProps::default()),
            NodeType::Rect => NodeKind::Rect(RectProps::default()),
            NodeType::Image => NodeKind::Image(ImageProps::default()),
            NodeType::Circle => NodeKind::Circle(CircleProps::default()),
            NodeType::Ellipse => NodeKind::Ellipse(EllipseProps::default()),
            NodeType::Star => NodeKind::Star(StarProps::default()),
            NodeType::RegularPolygon => NodeKind::RegularPolygon(PolygonProps::default()),
            NodeType::Line => NodeKind::Line(LineProps::default()),
            NodeType::Arrow => NodeKind::Arrow(ArrowProps::default()),
            NodeType::Path => NodeKind::Path(PathProps::default()),
            NodeType::Icon => NodeKind::Icon(IconProps::default()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Rect(_) => NodeType::Rect,
            NodeKind::Image(_) => NodeType::Image,
            NodeKind::Circle(_) => NodeType::Circle,
            NodeKind::Ellipse(_) => NodeType::Ellipse,
            NodeKind::Star(_) => NodeType::Star,
            NodeKind::RegularPolygon(_) => NodeType::RegularPolygon,
            NodeKind::Line(_) => NodeType::Line,
            NodeKind::Arrow(_) => NodeType::Arrow,
            NodeKind::Path(_) => NodeType::Path,
            NodeKind::Icon(_) => NodeType::Icon,
        }
    }
}

/// A drawable scene entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    pub base: NodeBase,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Axis-aligned box before rotation, top-left anchored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

impl Node {
    /// A node of `node_type` with the editor's defaults.
    pub fn new(node_type: NodeType, id: NodeId) -> Self {
        let mut base = NodeBase::new(id);
        match node_type {
            NodeType::Text => {
                base.width = 200.0;
                base.height = 34.0;
                base.fill = Some("#000000".into());
            }
            NodeType::Rect => {
                base.width = 200.0;
                base.height = 100.0;
                base.fill = Some("#3B82F6".into());
            }
            NodeType::Image => {
                base.width = 200.0;
                base.height = 200.0;
            }
            NodeType::Circle => base.fill = Some("#10B981".into()),
            NodeType::Ellipse => base.fill = Some("#F59E0B".into()),
            NodeType::Star => base.fill = Some("#FBBF24".into()),
            NodeType::RegularPolygon => base.fill = Some("#8B5CF6".into()),
            NodeType::Line => {
                base.stroke = Some("#000000".into());
                base.stroke_width = Some(2.0);
            }
            NodeType::Arrow => {
                base.fill = Some("#000000".into());
                base.stroke = Some("#000000".into());
                base.stroke_width = Some(2.0);
            }
            NodeType::Path => base.fill = Some("#000000".into()),
            NodeType::Icon => {
                base.width = ICON_BASE_SIZE;
                base.height = ICON_BASE_SIZE;
                base.fill = Some("#000000".into());
            }
        }
        let mut node = Self {
            base,
            kind: NodeKind::default_for(node_type),
        };
        node.sync_derived_size();
        node
    }

    pub fn id(&self) -> NodeId {
        self.base.id
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Merge a partial JSON object of props into this node.
    ///
    /// `id` and `type` cannot be rewritten. The merged node is validated by
    /// deserializing it as a whole, so a bad value leaves `self` untouched.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<()> {
        let id = self.base.id;
        if let Some(key) = ["id", "type"].into_iter().find(|k| patch.contains_key(*k)) {
            return Err(CoreError::InvalidProps {
                id,
                reason: format!("`{key}` cannot be changed"),
            });
        }
        let mut value = serde_json::to_value(&*self).map_err(|e| CoreError::InvalidProps {
            id,
            reason: e.to_string(),
        })?;
        if let Some(obj) = value.as_object_mut() {
            for (k, v) in patch {
                obj.insert(k.clone(), v.clone());
            }
        }
        let mut next: Node = serde_json::from_value(value).map_err(|e| CoreError::InvalidProps {
            id,
            reason: e.to_string(),
        })?;
        next.normalize();
        *self = next;
        Ok(())
    }

    /// Clamp ranges and refresh derived geometry.
    pub fn normalize(&mut self) {
        self.base.opacity = self.base.opacity.clamp(0.0, 1.0);
        self.base.width = self.base.width.max(0.0);
        self.base.height = self.base.height.max(0.0);
        if let Some(w) = self.base.stroke_width.as_mut() {
            *w = w.max(0.0);
        }
        match &mut self.kind {
            NodeKind::Image(img) => img.filters.clamp(),
            NodeKind::Star(star) => star.num_points = star.num_points.max(2),
            NodeKind::RegularPolygon(p) => p.sides = p.sides.max(3),
            NodeKind::Text(t) => t.font_size = t.font_size.max(1.0),
            _ => {}
        }
        self.sync_derived_size();
    }

    /// Refresh `width`/`height` for variants where they are derived.
    fn sync_derived_size(&mut self) {
        let size = match &self.kind {
            NodeKind::Circle(c) => Some((c.radius * 2.0, c.radius * 2.0)),
            NodeKind::Ellipse(e) => Some((e.radius_x * 2.0, e.radius_y * 2.0)),
            NodeKind::Star(s) => Some((s.outer_radius * 2.0, s.outer_radius * 2.0)),
            NodeKind::RegularPolygon(p) => Some((p.radius * 2.0, p.radius * 2.0)),
            _ => None,
        };
        if let Some((w, h)) = size {
            self.base.width = w;
            self.base.height = h;
        }
    }

    /// Unrotated bounding box in card coordinates.
    pub fn bounds(&self) -> Bounds {
        let b = &self.base;
        match &self.kind {
            NodeKind::Circle(_)
            | NodeKind::Ellipse(_)
            | NodeKind::Star(_)
            | NodeKind::RegularPolygon(_) => Bounds {
                x: b.x - b.width / 2.0,
                y: b.y - b.height / 2.0,
                width: b.width,
                height: b.height,
            },
            NodeKind::Line(LineProps { points, .. }) | NodeKind::Arrow(ArrowProps { points, .. }) => {
                points_bounds(b.x, b.y, points)
            }
            NodeKind::Path(p) => Bounds {
                x: b.x,
                y: b.y,
                width: b.width * p.scale_x,
                height: b.height * p.scale_y,
            },
            NodeKind::Icon(icon) => Bounds {
                x: b.x,
                y: b.y,
                width: icon_visual_size(b.width, icon.scale_x),
                height: icon_visual_size(b.height, icon.scale_y),
            },
            _ => Bounds {
                x: b.x,
                y: b.y,
                width: b.width,
                height: b.height,
            },
        }
    }

    /// An image node placed from an external source, fit into 300×300.
    pub fn image_from_source(source: &ImageSource, id: NodeId) -> Self {
        let mut node = Node::new(NodeType::Image, id);
        let scale = fit_scale(source.width, source.height);
        node.base.width = source.width * scale;
        node.base.height = source.height * scale;
        if let NodeKind::Image(img) = &mut node.kind {
            img.src = source.url.clone();
        }
        node
    }
}

fn points_bounds(ox: f32, oy: f32, points: &[f32]) -> Bounds {
    let mut min = (f32::MAX, f32::MAX);
    let mut max = (f32::MIN, f32::MIN);
    for pair in points.chunks_exact(2) {
        min = (min.0.min(pair[0]), min.1.min(pair[1]));
        max = (max.0.max(pair[0]), max.1.max(pair[1]));
    }
    if min.0 > max.0 {
        return Bounds {
            x: ox,
            y: oy,
            ..Bounds::default()
        };
    }
    Bounds {
        x: ox + min.0,
        y: oy + min.1,
        width: max.0 - min.0,
        height: max.1 - min.1,
    }
}

/// Build a node from a type name and a partial props object.
///
/// Missing props take the type's defaults. An `id` in `partial` is kept;
/// otherwise a fresh one is generated.
pub fn create_node(type_name: &str, partial: &Map<String, Value>) -> Result<Node> {
    let node_type: NodeType = type_name.parse()?;
    let id = match partial.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => NodeId::intern(id),
        _ => NodeId::generate(&node_type.id_prefix()),
    };
    let mut node = Node::new(node_type, id);
    let mut rest = partial.clone();
    rest.remove("id");
    if let Some(t) = rest.remove("type")
        && t.as_str().is_some_and(|t| !t.eq_ignore_ascii_case(node_type.as_str()))
    {
        return Err(CoreError::InvalidProps {
            id,
            reason: format!("`type` {t} conflicts with {node_type}"),
        });
    }
    if !rest.is_empty() {
        node.apply_patch(&rest)?;
    }
    node.normalize();
    Ok(node)
}

// ─── External image sources ──────────────────────────────────────────────

/// What an image search or upload hands the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub url: String,
    pub width: f32,
    pub height: f32,
}

/// Uniform scale that fits an image into the placement box without upscaling.
pub fn fit_scale(natural_width: f32, natural_height: f32) -> f32 {
    if natural_width <= 0.0 || natural_height <= 0.0 {
        return 1.0;
    }
    (IMAGE_PLACEMENT_BOX / natural_width)
        .min(IMAGE_PLACEMENT_BOX / natural_height)
        .min(1.0)
}

// ─── Opacity boundary ────────────────────────────────────────────────────

/// Editor slider value (0–100) to stored opacity (0–1).
pub fn opacity_from_percent(percent: f32) -> f32 {
    (percent / 100.0).clamp(0.0, 1.0)
}

/// Stored opacity (0–1) to editor slider value (0–100).
pub fn opacity_to_percent(opacity: f32) -> f32 {
    (opacity.clamp(0.0, 1.0) * 100.0).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn text_defaults() {
        let node = create_node("Text", &Map::new()).unwrap();
        let NodeKind::Text(t) = &node.kind else {
            panic!("expected text");
        };
        assert_eq!(t.font_size, 28.0);
        assert_eq!(t.font_family, "Inter");
        assert_eq!(node.base.fill.as_deref(), Some("#000000"));
        assert!(node.base.visible);
        assert_eq!(node.base.opacity, 1.0);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = create_node("Hexagon", &Map::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidNodeType(t) if t == "Hexagon"));
    }

    #[test]
    fn icon_has_base_box() {
        let node = create_node("Icon", &obj(json!({ "iconName": "mdi:phone", "scaleX": 0.5 }))).unwrap();
        assert_eq!(node.base.width, ICON_BASE_SIZE);
        assert_eq!(node.bounds().width, 30.0);
        assert_eq!(icon_scale_for_visual_size(ICON_BASE_SIZE, 90.0), 1.5);
    }

    #[test]
    fn partial_props_override_defaults() {
        let node = create_node(
            "Rect",
            &obj(json!({ "id": "bg", "x": 5, "width": 400, "fill": "#FFFFFF", "cornerRadius": 8 })),
        )
        .unwrap();
        assert_eq!(node.id(), NodeId::intern("bg"));
        assert_eq!(node.base.x, 5.0);
        assert_eq!(node.base.width, 400.0);
        assert_eq!(node.kind, NodeKind::Rect(RectProps { corner_radius: 8.0 }));
    }

    #[test]
    fn circle_size_derives_from_radius() {
        let node = create_node("Circle", &obj(json!({ "radius": 30, "width": 999 }))).unwrap();
        assert_eq!(node.base.width, 60.0);
        assert_eq!(node.bounds().x, -30.0);
    }

    #[test]
    fn patch_cannot_rewrite_identity() {
        let mut node = Node::new(NodeType::Rect, NodeId::intern("r"));
        let err = node.apply_patch(&obj(json!({ "type": "Text" }))).unwrap_err();
        assert!(matches!(err, CoreError::InvalidProps { .. }));
        assert_eq!(node.node_type(), NodeType::Rect);
    }

    #[test]
    fn bad_patch_leaves_node_untouched() {
        let mut node = Node::new(NodeType::Text, NodeId::intern("t"));
        let before = node.clone();
        assert!(node.apply_patch(&obj(json!({ "fontSize": "huge" }))).is_err());
        assert_eq!(node, before);
    }

    #[test]
    fn json_is_flat() {
        let node = Node::new(NodeType::Text, NodeId::intern("hello"));
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["type"], "Text");
        assert_eq!(v["id"], "hello");
        assert_eq!(v["fontSize"], 28.0);
        let back: Node = serde_json::from_value(v).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn image_placement_fits_300_box() {
        let src = ImageSource {
            url: "https://example.com/a.jpg".into(),
            width: 1200.0,
            height: 600.0,
        };
        let node = Node::image_from_source(&src, NodeId::intern("img"));
        assert_eq!(node.base.width, 300.0);
        assert_eq!(node.base.height, 150.0);
        assert_eq!(fit_scale(100.0, 50.0), 1.0);
    }

    #[test]
    fn opacity_conversions() {
        assert_eq!(opacity_from_percent(45.0), 0.45);
        assert_eq!(opacity_from_percent(150.0), 1.0);
        assert_eq!(opacity_to_percent(0.333), 33.0);
    }

    #[test]
    fn line_bounds_follow_points() {
        let mut node = Node::new(NodeType::Line, NodeId::intern("l"));
        node.base.x = 10.0;
        if let NodeKind::Line(l) = &mut node.kind {
            l.points = vec![0.0, 20.0, 50.0, -10.0];
        }
        let b = node.bounds();
        assert_eq!((b.x, b.y, b.width, b.height), (10.0, -10.0, 50.0, 30.0));
    }
}
