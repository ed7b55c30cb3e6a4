//! Mutation API: the single write path into a scene.
//!
//! Every structural change from the UI, import, or scripted callers is a
//! [`SceneMutation`] applied by [`apply_mutation`]. Lock gating lives
//! here and nowhere else: moving or removing a locked layer is rejected
//! with `LockedLayerViolation`. Prop writes are not gated; callers check
//! `locked` before sending geometry patches.

use bk_core::model::opacity_from_percent;
use bk_core::{CoreError, LayerDefinition, NodeId, Result, Scene};
use serde_json::{Map, Value};

/// A change to the scene, as requested by a caller.
#[derive(Debug, Clone)]
pub enum SceneMutation {
    /// Insert at `at` (default: the front).
    AddNode {
        layer: Box<LayerDefinition>,
        at: Option<usize>,
    },
    RemoveLayer {
        index: usize,
    },
    /// Multi-select delete. Rejected whole if any target is locked.
    RemoveLayers {
        indices: Vec<usize>,
    },
    MoveLayer {
        from: usize,
        to: usize,
    },
    UpdateNodeProps {
        id: NodeId,
        patch: Map<String, Value>,
    },
    UpdateLayerDefinition {
        index: usize,
        patch: Map<String, Value>,
    },
    CreateGroup {
        name: String,
        indices: Vec<usize>,
    },
    DeleteGroup {
        id: String,
    },
    SetGroupProp {
        id: String,
        patch: Map<String, Value>,
    },
    SetBackground {
        patch: Map<String, Value>,
    },
    /// Opacity as the property panel shows it, 0–100.
    SetOpacityPercent {
        id: NodeId,
        percent: f32,
    },
    SetLayerVisible {
        index: usize,
        visible: bool,
    },
    SetLayerLocked {
        index: usize,
        locked: bool,
    },
}

impl SceneMutation {
    /// Whether this mutation edits a node's QR metadata.
    pub fn touches_qr(&self) -> Option<NodeId> {
        let qr_key = |patch: &Map<String, Value>| patch.contains_key("qrMetadata");
        match self {
            SceneMutation::UpdateNodeProps { id, patch } if qr_key(patch) => Some(*id),
            _ => None,
        }
    }
}

/// What a successful mutation did, for the session's bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    /// Storage index an added layer landed at.
    pub index: Option<usize>,
    /// Node ids that left the scene.
    pub removed: Vec<NodeId>,
    /// Id of a newly created group.
    pub group_id: Option<String>,
}

fn ensure_unlocked(scene: &Scene, index: usize) -> Result<()> {
    let layer = scene.layer(index)?;
    if layer.locked {
        return Err(CoreError::LockedLayerViolation(layer.id()));
    }
    Ok(())
}

/// Apply one mutation. On error the scene is unchanged.
pub fn apply_mutation(scene: &mut Scene, mutation: SceneMutation) -> Result<Applied> {
    log::debug!("apply {}", mutation_name(&mutation));
    let mut applied = Applied::default();
    match mutation {
        SceneMutation::AddNode { layer, at } => {
            applied.index = Some(scene.insert(*layer, at)?);
        }
        SceneMutation::RemoveLayer { index } => {
            ensure_unlocked(scene, index)?;
            applied.removed.push(scene.remove(index)?.id());
        }
        SceneMutation::RemoveLayers { indices } => {
            for &index in &indices {
                ensure_unlocked(scene, index)?;
            }
            applied.removed = scene.remove_many(&indices)?.iter().map(LayerDefinition::id).collect();
        }
        SceneMutation::MoveLayer { from, to } => {
            ensure_unlocked(scene, from)?;
            scene.move_layer(from, to)?;
        }
        SceneMutation::UpdateNodeProps { id, patch } => scene.update_node_props(id, &patch)?,
        SceneMutation::UpdateLayerDefinition { index, patch } => {
            scene.update_layer_definition(index, &patch)?;
        }
        SceneMutation::CreateGroup { name, indices } => {
            applied.group_id = Some(scene.create_group(&name, &indices)?);
        }
        SceneMutation::DeleteGroup { id } => {
            scene.delete_group(&id)?;
        }
        SceneMutation::SetGroupProp { id, patch } => scene.set_group_prop(&id, &patch)?,
        SceneMutation::SetBackground { patch } => scene.set_background(&patch)?,
        SceneMutation::SetOpacityPercent { id, percent } => {
            let mut patch = Map::new();
            patch.insert("opacity".into(), Value::from(opacity_from_percent(percent)));
            scene.update_node_props(id, &patch)?;
        }
        SceneMutation::SetLayerVisible { index, visible } => scene.set_layer_visible(index, visible)?,
        SceneMutation::SetLayerLocked { index, locked } => scene.set_layer_locked(index, locked)?,
    }
    Ok(applied)
}

fn mutation_name(mutation: &SceneMutation) -> &'static str {
    match mutation {
        SceneMutation::AddNode { .. } => "addNode",
        SceneMutation::RemoveLayer { .. } => "removeLayer",
        SceneMutation::RemoveLayers { .. } => "removeLayers",
        SceneMutation::MoveLayer { .. } => "moveLayer",
        SceneMutation::UpdateNodeProps { .. } => "updateNodeProps",
        SceneMutation::UpdateLayerDefinition { .. } => "updateLayerDefinition",
        SceneMutation::CreateGroup { .. } => "createGroup",
        SceneMutation::DeleteGroup { .. } => "deleteGroup",
        SceneMutation::SetGroupProp { .. } => "setGroupProp",
        SceneMutation::SetBackground { .. } => "setBackground",
        SceneMutation::SetOpacityPercent { .. } => "setOpacity",
        SceneMutation::SetLayerVisible { .. } => "setLayerVisible",
        SceneMutation::SetLayerLocked { .. } => "setLayerLocked",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_core::{Node, NodeType};
    use pretty_assertions::assert_eq;

    fn scene(n: usize) -> Scene {
        let mut scene = Scene::new(1050.0, 600.0);
        for i in 0..n {
            let node = Node::new(NodeType::Rect, NodeId::intern(&format!("m{i}")));
            scene.insert(LayerDefinition::new(node), None).unwrap();
        }
        scene
    }

    #[test]
    fn locked_layer_cannot_move_or_be_removed() {
        let mut s = scene(3);
        s.set_layer_locked(1, true).unwrap();
        let err = apply_mutation(&mut s, SceneMutation::MoveLayer { from: 1, to: 2 }).unwrap_err();
        assert!(matches!(err, CoreError::LockedLayerViolation(id) if id.as_str() == "m1"));
        assert!(apply_mutation(&mut s, SceneMutation::RemoveLayer { index: 1 }).is_err());
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn bulk_delete_with_a_locked_layer_is_rejected_whole() {
        let mut s = scene(4);
        s.set_layer_locked(2, true).unwrap();
        let res = apply_mutation(&mut s, SceneMutation::RemoveLayers { indices: vec![0, 2, 3] });
        assert!(res.is_err());
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn bulk_delete_reports_removed_ids() {
        let mut s = scene(4);
        let applied = apply_mutation(&mut s, SceneMutation::RemoveLayers { indices: vec![1, 3] }).unwrap();
        let removed: Vec<&str> = applied.removed.iter().map(|id| id.as_str()).collect();
        assert_eq!(removed, vec!["m3", "m1"]);
    }

    #[test]
    fn locked_layer_props_are_still_writable() {
        let mut s = scene(1);
        s.set_layer_locked(0, true).unwrap();
        let mut patch = Map::new();
        patch.insert("fill".into(), Value::from("#FF0000"));
        apply_mutation(&mut s, SceneMutation::UpdateNodeProps { id: NodeId::intern("m0"), patch }).unwrap();
        assert_eq!(s.layers()[0].props.base.fill.as_deref(), Some("#FF0000"));
    }

    #[test]
    fn opacity_percent_is_stored_as_fraction() {
        let mut s = scene(1);
        apply_mutation(
            &mut s,
            SceneMutation::SetOpacityPercent {
                id: NodeId::intern("m0"),
                percent: 40.0,
            },
        )
        .unwrap();
        assert!((s.layers()[0].props.base.opacity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn qr_edits_are_flagged() {
        let mut patch = Map::new();
        patch.insert("qrMetadata".into(), serde_json::json!({ "value": "x" }));
        let m = SceneMutation::UpdateNodeProps {
            id: NodeId::intern("qr"),
            patch,
        };
        assert_eq!(m.touches_qr(), Some(NodeId::intern("qr")));
        assert_eq!(SceneMutation::RemoveLayer { index: 0 }.touches_qr(), None);
    }
}
