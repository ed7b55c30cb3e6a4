//! Color-role inference and palette swap.
//!
//! Roles are derived data: [`assign_color_roles`] recomputes them from the
//! fill distribution at any time. They are persisted with a template only
//! so repeated exports stay stable.

use crate::color::{Color, is_blank_fill};
use crate::model::{Node, NodeKind};
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorRole {
    Surface,
    Accent,
    Decorative,
    PrimaryText,
    SecondaryText,
    Highlight,
    Background,
}

/// Node id → role.
pub type ColorRoleMap = BTreeMap<String, ColorRole>;

/// Role → replacement color.
pub type Palette = BTreeMap<ColorRole, String>;

/// A Rect wider or taller than this can claim the `surface` role.
const SURFACE_MIN_EDGE: f32 = 200.0;

/// Text groups darker than this are primary text.
const DARK_TEXT_THRESHOLD: f32 = 128.0 / 255.0;

struct FillGroup<'a> {
    key: String,
    members: Vec<&'a Node>,
}

impl FillGroup<'_> {
    fn is_mostly_text(&self) -> bool {
        let text = self
            .members
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Text(_)))
            .count();
        text * 2 > self.members.len()
    }

    fn has_large_rect(&self) -> bool {
        self.members.iter().any(|n| {
            matches!(n.kind, NodeKind::Rect(_))
                && (n.base.width > SURFACE_MIN_EDGE || n.base.height > SURFACE_MIN_EDGE)
        })
    }

    /// Unparseable colors count as bright.
    fn brightness(&self) -> f32 {
        Color::parse(&self.key).map_or(1.0, |c| c.brightness())
    }
}

/// Grouping key for a fill: canonical hex when parseable, else the
/// trimmed lowercase string.
fn fill_key(fill: &str) -> String {
    match Color::parse(fill) {
        Some(c) => c.to_hex(),
        None => fill.trim().to_ascii_lowercase(),
    }
}

/// Infer a role for every node with a paintable fill.
///
/// Groups are ranked by size, ties keeping discovery order, so the result
/// is a pure function of the node sequence.
pub fn assign_color_roles<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> ColorRoleMap {
    let mut groups: Vec<FillGroup<'a>> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for node in nodes {
        let Some(fill) = node.base.fill.as_deref() else {
            continue;
        };
        if is_blank_fill(fill) {
            continue;
        }
        let key = fill_key(fill);
        let slot = *by_key.entry(key.clone()).or_insert_with(|| {
            groups.push(FillGroup {
                key,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(node);
    }
    groups.sort_by(|a, b| b.members.len().cmp(&a.members.len()));

    let mut roles = ColorRoleMap::new();
    let mut surface_taken = false;
    let mut accent_taken = false;
    for group in &groups {
        let role = if group.is_mostly_text() {
            if group.brightness() < DARK_TEXT_THRESHOLD {
                ColorRole::PrimaryText
            } else {
                ColorRole::SecondaryText
            }
        } else if !surface_taken && group.has_large_rect() {
            surface_taken = true;
            ColorRole::Surface
        } else if !accent_taken {
            accent_taken = true;
            ColorRole::Accent
        } else {
            ColorRole::Decorative
        };
        log::trace!("fill {} ({} nodes) -> {role:?}", group.key, group.members.len());
        for node in &group.members {
            roles.insert(node.id().to_string(), role);
        }
    }
    // TODO: infer stroke and shadow roles (`strokeColorRole`,
    // `shadowColorRole`) once outline colors get their own clustering rule.
    roles
}

/// Recompute the scene's persisted role map.
pub fn refresh_color_roles(scene: &mut Scene) {
    let roles = assign_color_roles(scene.nodes());
    log::debug!("assigned {} color roles", roles.len());
    scene.color_roles = Some(roles);
}

/// Recolor nodes by role. Fills follow `roles`; strokes and shadows follow
/// the node's own `strokeColorRole` / `shadowColorRole` tags. Returns the
/// number of nodes touched.
pub fn apply_palette(scene: &mut Scene, roles: &ColorRoleMap, palette: &Palette) -> usize {
    let mut touched = 0;
    for layer in scene.layers_mut() {
        let node = &layer.props;
        let fill = roles
            .get(node.id().as_str())
            .and_then(|r| palette.get(r))
            .filter(|c| node.base.fill.as_ref() != Some(*c));
        let stroke = node
            .base
            .stroke_color_role
            .and_then(|r| palette.get(&r))
            .filter(|c| node.base.stroke.as_ref() != Some(*c));
        let shadow = node
            .base
            .shadow
            .as_ref()
            .and(node.base.shadow_color_role)
            .and_then(|r| palette.get(&r));
        if fill.is_none() && stroke.is_none() && shadow.is_none() {
            continue;
        }
        let (fill, stroke, shadow) = (fill.cloned(), stroke.cloned(), shadow.cloned());
        let node = Arc::make_mut(&mut layer.props);
        if let Some(c) = fill {
            node.base.fill = Some(c);
        }
        if let Some(c) = stroke {
            node.base.stroke = Some(c);
        }
        if let (Some(c), Some(s)) = (shadow, node.base.shadow.as_mut()) {
            s.color = c;
        }
        touched += 1;
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::NodeId;
    use crate::model::NodeType;
    use pretty_assertions::assert_eq;

    fn node(id: &str, ty: NodeType, fill: &str, w: f32, h: f32) -> Node {
        let mut n = Node::new(ty, NodeId::intern(id));
        n.base.fill = Some(fill.into());
        n.base.width = w;
        n.base.height = h;
        n
    }

    #[test]
    fn black_text_and_large_white_rect() {
        let nodes = vec![
            node("t1", NodeType::Text, "#000000", 100.0, 30.0),
            node("t2", NodeType::Text, "#000000", 100.0, 30.0),
            node("t3", NodeType::Text, "#000000", 100.0, 30.0),
            node("bg", NodeType::Rect, "#FFFFFF", 300.0, 200.0),
        ];
        let roles = assign_color_roles(&nodes);
        let expected: ColorRoleMap = [
            ("bg".to_string(), ColorRole::Surface),
            ("t1".to_string(), ColorRole::PrimaryText),
            ("t2".to_string(), ColorRole::PrimaryText),
            ("t3".to_string(), ColorRole::PrimaryText),
        ]
        .into_iter()
        .collect();
        assert_eq!(roles, expected);
    }

    #[test]
    fn light_text_is_secondary() {
        let nodes = vec![node("t", NodeType::Text, "#EEEEEE", 10.0, 10.0)];
        assert_eq!(assign_color_roles(&nodes)["t"], ColorRole::SecondaryText);
    }

    #[test]
    fn surface_and_accent_are_first_wins() {
        let nodes = vec![
            node("a", NodeType::Rect, "#111111", 400.0, 10.0),
            node("b", NodeType::Rect, "#222222", 400.0, 10.0),
            node("c", NodeType::Circle, "#333333", 10.0, 10.0),
        ];
        let roles = assign_color_roles(&nodes);
        assert_eq!(roles["a"], ColorRole::Surface);
        assert_eq!(roles["b"], ColorRole::Accent);
        assert_eq!(roles["c"], ColorRole::Decorative);
    }

    #[test]
    fn equivalent_spellings_share_a_group() {
        let nodes = vec![
            node("x", NodeType::Star, "#fff", 10.0, 10.0),
            node("y", NodeType::Star, "white", 10.0, 10.0),
            node("z", NodeType::Star, "transparent", 10.0, 10.0),
        ];
        let roles = assign_color_roles(&nodes);
        assert_eq!(roles.len(), 2);
        assert_eq!(roles["x"], roles["y"]);
    }

    #[test]
    fn unparseable_text_color_counts_as_bright() {
        let nodes = vec![node("t", NodeType::Text, "var(--ink)", 10.0, 10.0)];
        assert_eq!(assign_color_roles(&nodes)["t"], ColorRole::SecondaryText);
    }

    #[test]
    fn larger_groups_rank_first() {
        let nodes = vec![
            node("r1", NodeType::Rect, "#FF0000", 10.0, 10.0),
            node("g1", NodeType::Rect, "#00FF00", 10.0, 10.0),
            node("g2", NodeType::Rect, "#00FF00", 10.0, 10.0),
        ];
        let roles = assign_color_roles(&nodes);
        assert_eq!(roles["g1"], ColorRole::Accent);
        assert_eq!(roles["r1"], ColorRole::Decorative);
    }

    #[test]
    fn role_names_are_kebab_case() {
        let s = serde_json::to_string(&ColorRole::PrimaryText).unwrap();
        assert_eq!(s, "\"primary-text\"");
    }
}
