//! Scene: the ordered layer stack, its groups and the background.
//!
//! Storage order is z-order: index 0 is the back, the last layer is the
//! front. Layer panels list layers front-to-back, so every conversion
//! between a panel position and a storage index goes through
//! [`flip_index`].
//!
//! Groups own no member list. A layer belongs to a group when its
//! `groupId` names it; [`Scene::delete_group`] and
//! [`Scene::repair_group_references`] are the only places that clear those
//! back-references. `parentGroupId` links groups into a forest, walked with
//! petgraph.

use crate::background::Background;
use crate::error::{CoreError, Result};
use crate::id::{NodeId, generate_id};
use crate::model::{Node, NodeType};
use crate::roles::ColorRoleMap;
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn default_true() -> bool {
    true
}

/// A node plus editor-only metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDefinition {
    /// Shared so snapshots and untouched layers cost a pointer copy;
    /// writers go through `Arc::make_mut`.
    pub props: Arc<Node>,
    #[serde(default = "default_true")]
    pub editable: bool,
    /// Blocks move and delete.
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl LayerDefinition {
    pub fn new(node: Node) -> Self {
        Self {
            props: Arc::new(node),
            editable: true,
            locked: false,
            group_id: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.props.id()
    }

    pub fn node_mut(&mut self) -> &mut Node {
        Arc::make_mut(&mut self.props)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub expanded: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
}

impl LayerGroup {
    pub fn new(id: String, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            expanded: true,
            visible: true,
            locked: false,
            parent_group_id: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

/// Convert between panel position (front-to-back) and storage index
/// (back-to-front). The mapping is its own inverse. `index` must be
/// below `len`.
pub fn flip_index(len: usize, index: usize) -> usize {
    len - 1 - index
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub background: Background,
    #[serde(default)]
    layers: Vec<LayerDefinition>,
    #[serde(default)]
    groups: Vec<LayerGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_roles: Option<ColorRoleMap>,
}

impl Scene {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            orientation: if height > width {
                Orientation::Portrait
            } else {
                Orientation::Landscape
            },
            background: Background::default(),
            layers: Vec::new(),
            groups: Vec::new(),
            color_roles: None,
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[LayerDefinition] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> std::slice::IterMut<'_, LayerDefinition> {
        self.layers.iter_mut()
    }

    pub fn groups(&self) -> &[LayerGroup] {
        &self.groups
    }

    /// Nodes in z-order, back to front.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.layers.iter().map(|l| l.props.as_ref())
    }

    pub fn layer(&self, index: usize) -> Result<&LayerDefinition> {
        self.layers.get(index).ok_or(CoreError::IndexOutOfBounds {
            index,
            len: self.layers.len(),
        })
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.layers
            .iter()
            .find(|l| l.id() == id)
            .map(|l| l.props.as_ref())
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn group(&self, id: &str) -> Option<&LayerGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    fn group_index(&self, id: &str) -> Result<usize> {
        self.groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| CoreError::UnknownGroup(id.to_string()))
    }

    /// Storage indices of layers directly in `group_id`.
    pub fn member_indices(&self, group_id: &str) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, l)| l.group_id.as_deref() == Some(group_id))
            .map(|(i, _)| i)
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.layers.len() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: self.layers.len(),
            });
        }
        Ok(())
    }

    pub fn display_to_storage(&self, display_index: usize) -> Result<usize> {
        self.check_index(display_index)?;
        Ok(flip_index(self.layers.len(), display_index))
    }

    pub fn storage_to_display(&self, storage_index: usize) -> Result<usize> {
        self.check_index(storage_index)?;
        Ok(flip_index(self.layers.len(), storage_index))
    }

    // ─── Layer stack ─────────────────────────────────────────────────────

    /// Insert a layer at `at` (default: the front). A colliding node id is
    /// replaced by a freshly generated one.
    pub fn insert(&mut self, mut layer: LayerDefinition, at: Option<usize>) -> Result<usize> {
        let len = self.layers.len();
        let index = at.unwrap_or(len);
        if index > len {
            return Err(CoreError::IndexOutOfBounds { index, len });
        }
        if let Some(group_id) = &layer.group_id
            && self.group(group_id).is_none()
        {
            return Err(CoreError::UnknownGroup(group_id.clone()));
        }
        let id = layer.id();
        if self.contains_id(id) {
            let fresh = self.fresh_id(layer.props.node_type());
            log::warn!("node id `{id}` already in scene, renamed to `{fresh}`");
            layer.node_mut().base.id = fresh;
        }
        self.layers.insert(index, layer);
        log::debug!("inserted layer at {index}");
        Ok(index)
    }

    fn fresh_id(&self, node_type: NodeType) -> NodeId {
        let prefix = node_type.id_prefix();
        loop {
            let id = NodeId::generate(&prefix);
            if !self.contains_id(id) {
                return id;
            }
        }
    }

    /// Remove and reinsert. Equal indices are a no-op.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from == to {
            return Ok(());
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        log::debug!("moved layer {from} -> {to}");
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<LayerDefinition> {
        self.check_index(index)?;
        Ok(self.layers.remove(index))
    }

    /// Remove several layers by storage index, in any input order.
    ///
    /// Indices are validated up front so the call is all-or-nothing, then
    /// removed from highest to lowest so earlier removals never shift a
    /// pending target. Duplicates count once. Returns the removed layers,
    /// highest index first.
    pub fn remove_many(&mut self, indices: &[usize]) -> Result<Vec<LayerDefinition>> {
        let len = self.layers.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(CoreError::IndexOutOfBounds { index, len });
        }
        let mut order = indices.to_vec();
        order.sort_unstable_by(|a, b| b.cmp(a));
        order.dedup();
        Ok(order.into_iter().map(|i| self.layers.remove(i)).collect())
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.check_index(index)?;
        let layer = &mut self.layers[index];
        if layer.props.base.visible != visible {
            layer.node_mut().base.visible = visible;
        }
        Ok(())
    }

    pub fn set_layer_locked(&mut self, index: usize, locked: bool) -> Result<()> {
        self.check_index(index)?;
        self.layers[index].locked = locked;
        Ok(())
    }

    /// Patch a layer's metadata (`editable`, `locked`, `groupId`) and, via
    /// a nested `props` object, its node.
    pub fn update_layer_definition(&mut self, index: usize, patch: &Map<String, Value>) -> Result<()> {
        self.check_index(index)?;
        let mut next = self.layers[index].clone();
        let id = next.id();
        let invalid = |reason: String| CoreError::InvalidProps { id, reason };
        for (key, value) in patch {
            match key.as_str() {
                "props" => {
                    let obj = value
                        .as_object()
                        .ok_or_else(|| invalid("`props` must be an object".into()))?;
                    next.node_mut().apply_patch(obj)?;
                }
                "editable" => {
                    next.editable = value
                        .as_bool()
                        .ok_or_else(|| invalid("`editable` must be a bool".into()))?;
                }
                "locked" => {
                    next.locked = value
                        .as_bool()
                        .ok_or_else(|| invalid("`locked` must be a bool".into()))?;
                }
                "groupId" => {
                    next.group_id = match value {
                        Value::Null => None,
                        Value::String(g) if self.group(g).is_some() => Some(g.clone()),
                        Value::String(g) => return Err(CoreError::UnknownGroup(g.clone())),
                        _ => return Err(invalid("`groupId` must be a string or null".into())),
                    };
                }
                other => return Err(invalid(format!("unknown layer field `{other}`"))),
            }
        }
        self.layers[index] = next;
        Ok(())
    }

    /// Merge `patch` into the node with `id`.
    pub fn update_node_props(&mut self, id: NodeId, patch: &Map<String, Value>) -> Result<()> {
        let index = self.index_of(id).ok_or(CoreError::UnknownNode(id))?;
        let mut node = (*self.layers[index].props).clone();
        node.apply_patch(patch)?;
        self.layers[index].props = Arc::new(node);
        Ok(())
    }

    pub fn set_background(&mut self, patch: &Map<String, Value>) -> Result<()> {
        self.background.apply_patch(patch)
    }

    /// Give every layer a new id, in storage order. Color-role keys follow
    /// their nodes.
    pub fn reassign_ids(&mut self, ids: &[NodeId]) -> Result<()> {
        if ids.len() != self.layers.len() {
            return Err(CoreError::IndexOutOfBounds {
                index: ids.len(),
                len: self.layers.len(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(CoreError::DuplicateNodeId(*dup));
        }
        let renames: HashMap<String, String> = self
            .layers
            .iter()
            .zip(ids)
            .map(|(layer, new_id)| (layer.id().to_string(), new_id.to_string()))
            .collect();
        for (layer, &new_id) in self.layers.iter_mut().zip(ids) {
            if layer.id() != new_id {
                layer.node_mut().base.id = new_id;
            }
        }
        if let Some(roles) = self.color_roles.take() {
            self.color_roles = Some(
                roles
                    .into_iter()
                    .filter_map(|(old, role)| renames.get(&old).map(|new| (new.clone(), role)))
                    .collect(),
            );
        }
        Ok(())
    }

    /// Every node id must be unique.
    pub fn check_unique_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.id()) {
                return Err(CoreError::DuplicateNodeId(layer.id()));
            }
        }
        Ok(())
    }

    // ─── Groups ──────────────────────────────────────────────────────────

    fn group_forest(&self) -> DiGraphMap<&str, ()> {
        let mut forest = DiGraphMap::new();
        for group in &self.groups {
            forest.add_node(group.id.as_str());
        }
        for group in &self.groups {
            if let Some(parent) = &group.parent_group_id {
                forest.add_edge(parent.as_str(), group.id.as_str(), ());
            }
        }
        forest
    }

    /// `id` and every group nested below it.
    pub fn group_subtree(&self, id: &str) -> Result<Vec<String>> {
        let start = self
            .groups
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.id.as_str())
            .ok_or_else(|| CoreError::UnknownGroup(id.to_string()))?;
        let forest = self.group_forest();
        let mut dfs = Dfs::new(&forest, start);
        let mut out = Vec::new();
        while let Some(g) = dfs.next(&forest) {
            out.push(g.to_string());
        }
        Ok(out)
    }

    /// Create a group from layers at `indices`. When every member already
    /// shares one group, the new group nests inside it. Duplicates count
    /// once; an empty selection is rejected.
    pub fn create_group(&mut self, name: &str, indices: &[usize]) -> Result<String> {
        for &index in indices {
            self.check_index(index)?;
        }
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        if indices.is_empty() {
            return Err(CoreError::EmptyGroup);
        }
        let mut parents = indices.iter().map(|&i| self.layers[i].group_id.clone());
        let first = parents.next().flatten();
        let parent = first.filter(|p| parents.all(|q| q.as_ref() == Some(p)));

        let id = generate_id("group");
        let mut group = LayerGroup::new(id.clone(), name);
        group.parent_group_id = parent;
        self.groups.push(group);
        for &index in &indices {
            self.layers[index].group_id = Some(id.clone());
        }
        log::debug!("created group `{id}` with {} layers", indices.len());
        Ok(id)
    }

    /// Ungroup: members keep their place in the stack with no group;
    /// sub-groups move up to the deleted group's parent.
    pub fn delete_group(&mut self, id: &str) -> Result<LayerGroup> {
        let index = self.group_index(id)?;
        let removed = self.groups.remove(index);
        self.detach_members(id);
        for group in &mut self.groups {
            if group.parent_group_id.as_deref() == Some(id) {
                group.parent_group_id = removed.parent_group_id.clone();
            }
        }
        log::debug!("deleted group `{id}`");
        Ok(removed)
    }

    fn detach_members(&mut self, group_id: &str) {
        for layer in &mut self.layers {
            if layer.group_id.as_deref() == Some(group_id) {
                layer.group_id = None;
            }
        }
    }

    fn subtree_layers_mut(&mut self, subtree: &[String]) -> impl Iterator<Item = &mut LayerDefinition> {
        self.layers.iter_mut().filter(move |l| {
            l.group_id
                .as_ref()
                .is_some_and(|g| subtree.iter().any(|s| s == g))
        })
    }

    /// Set the group's `visible` flag and write the same value once into
    /// every member layer, including layers of nested groups.
    pub fn set_group_visible(&mut self, id: &str, visible: bool) -> Result<()> {
        let subtree = self.group_subtree(id)?;
        for group in self.groups.iter_mut().filter(|g| subtree.contains(&g.id)) {
            group.visible = visible;
        }
        for layer in self.subtree_layers_mut(&subtree) {
            if layer.props.base.visible != visible {
                layer.node_mut().base.visible = visible;
            }
        }
        Ok(())
    }

    /// Same fan-out as [`Scene::set_group_visible`] for `locked`.
    pub fn set_group_locked(&mut self, id: &str, locked: bool) -> Result<()> {
        let subtree = self.group_subtree(id)?;
        for group in self.groups.iter_mut().filter(|g| subtree.contains(&g.id)) {
            group.locked = locked;
        }
        for layer in self.subtree_layers_mut(&subtree) {
            layer.locked = locked;
        }
        Ok(())
    }

    /// Patch a group (`name`, `expanded`, `visible`, `locked`,
    /// `parentGroupId`). `visible` and `locked` fan out to members.
    pub fn set_group_prop(&mut self, id: &str, patch: &Map<String, Value>) -> Result<()> {
        let index = self.group_index(id)?;
        let before = self.groups[index].clone();
        let invalid = |reason: String| CoreError::InvalidProps {
            id: NodeId::intern(id),
            reason,
        };
        if patch.contains_key("id") {
            return Err(invalid("`id` cannot be changed".into()));
        }
        let mut value = serde_json::to_value(&before).map_err(|e| invalid(e.to_string()))?;
        if let Some(obj) = value.as_object_mut() {
            for (k, v) in patch {
                obj.insert(k.clone(), v.clone());
            }
        }
        let next: LayerGroup = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;

        if next.parent_group_id != before.parent_group_id
            && let Some(parent) = &next.parent_group_id
        {
            if self.group(parent).is_none() {
                return Err(CoreError::UnknownGroup(parent.clone()));
            }
            if self.group_subtree(id)?.contains(parent) {
                return Err(invalid(format!("nesting under `{parent}` would form a cycle")));
            }
        }

        self.groups[index] = LayerGroup {
            visible: before.visible,
            locked: before.locked,
            ..next.clone()
        };
        if patch.contains_key("visible") {
            self.set_group_visible(id, next.visible)?;
        }
        if patch.contains_key("locked") {
            self.set_group_locked(id, next.locked)?;
        }
        Ok(())
    }

    /// Bring group references of an imported scene into a consistent state.
    ///
    /// Duplicate group ids and cyclic nesting are rejected. References to
    /// missing groups (a layer's `groupId`, a group's `parentGroupId`) are
    /// dropped with a warning.
    pub fn repair_group_references(&mut self) -> Result<()> {
        let mut ids = HashSet::new();
        for group in &self.groups {
            if !ids.insert(group.id.clone()) {
                return Err(CoreError::MalformedTemplateJson(format!(
                    "duplicate group id `{}`",
                    group.id
                )));
            }
        }
        for group in &mut self.groups {
            if let Some(parent) = &group.parent_group_id
                && (!ids.contains(parent) || *parent == group.id)
            {
                log::warn!("group `{}` nests under missing group `{parent}`, detached", group.id);
                group.parent_group_id = None;
            }
        }
        if is_cyclic_directed(&self.group_forest()) {
            return Err(CoreError::MalformedTemplateJson(
                "group nesting forms a cycle".into(),
            ));
        }
        let orphans: Vec<String> = self
            .layers
            .iter()
            .filter_map(|l| l.group_id.clone())
            .filter(|g| !ids.contains(g))
            .collect();
        for orphan in orphans {
            log::warn!("layers reference missing group `{orphan}`, cleared");
            self.detach_members(&orphan);
        }
        Ok(())
    }

    // ─── Snapshots ───────────────────────────────────────────────────────

    /// Compact MessagePack encoding, used for undo history.
    pub fn to_snapshot(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| CoreError::Snapshot(e.to_string()))
    }

    pub fn from_snapshot(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| CoreError::Snapshot(e.to_string()))
    }
}
