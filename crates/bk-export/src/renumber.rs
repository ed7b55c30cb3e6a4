//! Save-as-template normalization.
//!
//! Ids become `node_<prefix>_<NN>`, where the prefix is the lowercased type
//! name and Text nodes are sniffed by content. Counters run per prefix in
//! storage order, so the result depends only on type, content and
//! position, and a second run reproduces the first.

use crate::error::Result;
use bk_core::{Node, NodeId, NodeType, Scene, Template, refresh_color_roles};
use std::collections::HashMap;
use winnow::combinator::eof;
use winnow::prelude::*;
use winnow::token::take_while;

const MAX_SLUG_LEN: usize = 20;

/// Loose phone shape: digits and the usual separators, 7+ characters,
/// nothing else.
fn phone_like(input: &mut &str) -> ModalResult<()> {
    (
        take_while(7.., |c: char| {
            c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')' | '.')
        })
        .verify(|s: &str| s.chars().any(|c| c.is_ascii_digit())),
        eof,
    )
        .void()
        .parse_next(input)
}

pub fn is_phone_like(text: &str) -> bool {
    phone_like.parse(text.trim()).is_ok()
}

/// Lowercase ASCII alphanumerics, other runs collapsed to `_`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut gap = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('_');
            }
            gap = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            gap = true;
        }
    }
    slug
}

fn text_prefix(text: &str) -> String {
    if text.contains('@') {
        return "text_email".into();
    }
    if is_phone_like(text) {
        return "text_contact".into();
    }
    let slug = slugify(text);
    if slug.is_empty() || slug.len() >= MAX_SLUG_LEN {
        "text".into()
    } else {
        format!("text_{slug}")
    }
}

pub fn id_prefix(node: &Node) -> String {
    match (node.node_type(), node.text()) {
        (NodeType::Text, Some(text)) => text_prefix(text),
        (ty, _) => ty.id_prefix(),
    }
}

/// The ids [`renumber_nodes`] would assign, in storage order.
pub fn renumber_ids(scene: &Scene) -> Vec<NodeId> {
    let mut counters: HashMap<String, u32> = HashMap::new();
    scene
        .nodes()
        .map(|node| {
            let prefix = id_prefix(node);
            let n = counters.entry(prefix.clone()).or_default();
            *n += 1;
            NodeId::intern(&format!("node_{prefix}_{n:02}"))
        })
        .collect()
}

pub fn renumber_nodes(scene: &mut Scene) -> Result<()> {
    let ids = renumber_ids(scene);
    scene.reassign_ids(&ids)?;
    log::debug!("renumbered {} nodes", ids.len());
    Ok(())
}

/// Prepare a template for saving: renumber ids, then recompute color roles.
pub fn normalize_template(template: &mut Template) -> Result<()> {
    renumber_nodes(&mut template.scene)?;
    refresh_color_roles(&mut template.scene);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_core::{LayerDefinition, create_node};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(s: &str) -> LayerDefinition {
        let props = json!({ "id": format!("t{}", s.len()), "text": s });
        LayerDefinition::new(create_node("Text", props.as_object().unwrap()).unwrap())
    }

    #[test]
    fn text_nodes_are_sniffed() {
        assert_eq!(text_prefix("jordan@reyes.studio"), "text_email");
        assert_eq!(text_prefix("+1 (555) 010-2030"), "text_contact");
        assert_eq!(text_prefix("Jordan Reyes"), "text_jordan_reyes");
        assert_eq!(text_prefix("Senior Product Designer"), "text");
        assert_eq!(text_prefix("  Lead, Design  "), "text_lead_design");
        assert_eq!(text_prefix("★ ★"), "text");
        assert_eq!(text_prefix(""), "text");
    }

    #[test]
    fn short_digit_runs_are_not_phones() {
        assert!(!is_phone_like("2024"));
        assert!(!is_phone_like("-------"));
        assert!(is_phone_like("555.0102"));
        assert!(!is_phone_like("call 555 0102"));
    }

    #[test]
    fn counters_are_per_prefix() {
        let mut scene = Scene::new(100.0, 100.0);
        scene.insert(text("Hi"), None).unwrap();
        let rect = create_node("Rect", json!({ "id": "r" }).as_object().unwrap()).unwrap();
        scene.insert(LayerDefinition::new(rect), None).unwrap();
        scene.insert(text("Hi there"), None).unwrap();
        let mut again = text("Hi");
        again.node_mut().base.id = NodeId::intern("t-hi-2");
        scene.insert(again, None).unwrap();

        let ids: Vec<String> = renumber_ids(&scene).iter().map(|id| id.to_string()).collect();
        assert_eq!(
            ids,
            ["node_text_hi_01", "node_rect_01", "node_text_hi_there_01", "node_text_hi_02"]
        );
    }
}
