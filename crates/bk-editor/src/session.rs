//! The editing session.
//!
//! [`Editor`] exclusively owns the template being edited. Every change goes
//! through [`SceneMutation`] and the command stack; after each successful
//! change the registered listeners are told to re-render (push-based, in
//! call order, on the caller's thread).

use crate::commands::CommandStack;
use crate::error::Result;
use crate::mutation::{Applied, SceneMutation};
use crate::qr_queue::QrRefreshQueue;
use crate::recent::{RecentImageStore, RingBufferStore};
use crate::selection::Selection;
use bk_core::model::{ImageSource, NodeKind, create_node};
use bk_core::{
    EditingSurface, LayerDefinition, Node, NodeId, Palette, Scene, Template, ViewportState, apply_palette,
    assign_color_roles, refresh_color_roles,
};
use bk_render::{DrawList, Renderer, qr_data_uri};
use serde_json::{Map, Value};

pub const DEFAULT_HISTORY_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    SceneChanged { description: String },
    SelectionChanged,
    ViewportChanged,
}

type Listener = Box<dyn FnMut(&EditorEvent)>;

pub struct Editor {
    template: Template,
    history: CommandStack,
    selection: Selection,
    viewport: ViewportState,
    overlays_visible: bool,
    listeners: Vec<Listener>,
    recent: Box<dyn RecentImageStore>,
    qr_queue: QrRefreshQueue,
}

impl Editor {
    pub fn new(template: Template) -> Self {
        let viewport = ViewportState::identity(template.scene.width, template.scene.height);
        Self {
            template,
            history: CommandStack::new(DEFAULT_HISTORY_DEPTH),
            selection: Selection::new(),
            viewport,
            overlays_visible: true,
            listeners: Vec::new(),
            recent: Box::new(RingBufferStore::default()),
            qr_queue: QrRefreshQueue::new(),
        }
    }

    /// Swap in a different recent-images store.
    pub fn with_recent_store(mut self, store: Box<dyn RecentImageStore>) -> Self {
        self.recent = store;
        self
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history = CommandStack::new(depth);
        self
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&EditorEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: EditorEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Replace the template from JSON. Either the whole document loads or
    /// the session is left untouched.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let template = Template::from_json(json)?;
        self.replace_template(template);
        Ok(())
    }

    pub fn replace_template(&mut self, template: Template) {
        self.viewport = ViewportState::identity(template.scene.width, template.scene.height);
        self.template = template;
        self.history.clear();
        self.selection.clear();
        self.qr_queue = QrRefreshQueue::new();
        self.emit(EditorEvent::SceneChanged {
            description: "load template".into(),
        });
    }

    // ─── Mutation API ────────────────────────────────────────────────────

    /// Apply and record one mutation, then notify listeners.
    pub fn apply(&mut self, mutation: SceneMutation, description: &str) -> Result<Applied> {
        let qr = mutation.touches_qr();
        let added_qr = match &mutation {
            SceneMutation::AddNode { layer, .. } => has_qr(&layer.props),
            _ => false,
        };
        let applied = self
            .history
            .execute(&mut self.template.scene, mutation, description)?;

        if let Some(id) = qr {
            self.qr_queue.enqueue(id);
        }
        if added_qr
            && let Some(index) = applied.index
        {
            let id = self.template.scene.layer(index)?.id();
            self.qr_queue.enqueue(id);
        }
        if !applied.removed.is_empty() {
            self.qr_queue.forget(&applied.removed);
            if self.selection.remove_all(&applied.removed) {
                self.emit(EditorEvent::SelectionChanged);
            }
        }
        self.emit(EditorEvent::SceneChanged {
            description: description.to_string(),
        });
        Ok(applied)
    }

    pub fn add_node(&mut self, node: Node) -> Result<NodeId> {
        self.add_layer(LayerDefinition::new(node), None)
    }

    /// Insert a layer; returns the id it ended up with (a colliding id is
    /// renamed by the scene).
    pub fn add_layer(&mut self, layer: LayerDefinition, at: Option<usize>) -> Result<NodeId> {
        let applied = self.apply(
            SceneMutation::AddNode {
                layer: Box::new(layer),
                at,
            },
            "add layer",
        )?;
        let index = applied.index.unwrap_or(self.template.scene.len().saturating_sub(1));
        Ok(self.template.scene.layer(index)?.id())
    }

    /// `createNode` + `addNode` in one step.
    pub fn create_and_add(&mut self, type_name: &str, partial: &Map<String, Value>) -> Result<NodeId> {
        let node = create_node(type_name, partial)?;
        self.add_node(node)
    }

    /// Place an image from an external source, fit into the default box,
    /// and remember it in the recent list.
    pub fn add_image(&mut self, source: &ImageSource) -> Result<NodeId> {
        let node = Node::image_from_source(source, NodeId::generate("image"));
        let id = self.add_node(node)?;
        self.recent.push(source.clone());
        Ok(id)
    }

    pub fn remove_layer(&mut self, index: usize) -> Result<()> {
        self.apply(SceneMutation::RemoveLayer { index }, "delete layer")?;
        Ok(())
    }

    pub fn remove_layers(&mut self, indices: &[usize]) -> Result<()> {
        self.apply(
            SceneMutation::RemoveLayers {
                indices: indices.to_vec(),
            },
            "delete layers",
        )?;
        Ok(())
    }

    /// Delete every selected layer.
    pub fn delete_selection(&mut self) -> Result<()> {
        let scene = &self.template.scene;
        let indices: Vec<usize> = self
            .selection
            .ids()
            .iter()
            .filter_map(|id| scene.index_of(*id))
            .collect();
        if indices.is_empty() {
            return Ok(());
        }
        self.remove_layers(&indices)
    }

    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.apply(SceneMutation::MoveLayer { from, to }, "reorder layer")?;
        Ok(())
    }

    /// Reorder using front-to-back panel positions.
    pub fn move_layer_display(&mut self, from_display: usize, to_display: usize) -> Result<()> {
        let scene = &self.template.scene;
        let from = scene.display_to_storage(from_display)?;
        let to = scene.display_to_storage(to_display)?;
        self.move_layer(from, to)
    }

    pub fn update_node_props(&mut self, id: NodeId, patch: Map<String, Value>) -> Result<()> {
        self.apply(SceneMutation::UpdateNodeProps { id, patch }, "edit properties")?;
        Ok(())
    }

    pub fn update_layer_definition(&mut self, index: usize, patch: Map<String, Value>) -> Result<()> {
        self.apply(SceneMutation::UpdateLayerDefinition { index, patch }, "edit layer")?;
        Ok(())
    }

    pub fn create_group(&mut self, name: &str, indices: &[usize]) -> Result<String> {
        let applied = self.apply(
            SceneMutation::CreateGroup {
                name: name.to_string(),
                indices: indices.to_vec(),
            },
            "group layers",
        )?;
        Ok(applied.group_id.unwrap_or_default())
    }

    pub fn delete_group(&mut self, id: &str) -> Result<()> {
        self.apply(SceneMutation::DeleteGroup { id: id.to_string() }, "ungroup")?;
        Ok(())
    }

    pub fn set_group_prop(&mut self, id: &str, patch: Map<String, Value>) -> Result<()> {
        self.apply(
            SceneMutation::SetGroupProp {
                id: id.to_string(),
                patch,
            },
            "edit group",
        )?;
        Ok(())
    }

    pub fn set_background(&mut self, patch: Map<String, Value>) -> Result<()> {
        self.apply(SceneMutation::SetBackground { patch }, "edit background")?;
        Ok(())
    }

    /// Opacity from the property panel's 0–100 slider.
    pub fn set_opacity_percent(&mut self, id: NodeId, percent: f32) -> Result<()> {
        self.apply(SceneMutation::SetOpacityPercent { id, percent }, "change opacity")?;
        Ok(())
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.apply(SceneMutation::SetLayerVisible { index, visible }, "toggle visibility")?;
        Ok(())
    }

    pub fn set_layer_locked(&mut self, index: usize, locked: bool) -> Result<()> {
        self.apply(SceneMutation::SetLayerLocked { index, locked }, "toggle lock")?;
        Ok(())
    }

    // ─── Colors ──────────────────────────────────────────────────────────

    /// Recompute the cached color-role map.
    pub fn refresh_color_roles(&mut self) {
        refresh_color_roles(&mut self.template.scene);
    }

    /// Recolor by role as one undoable step. Uses the cached role map when
    /// present. Returns how many colors changed.
    pub fn apply_palette(&mut self, palette: &Palette) -> Result<usize> {
        let scene = &self.template.scene;
        let roles = scene
            .color_roles
            .clone()
            .unwrap_or_else(|| assign_color_roles(scene.nodes()));
        let changed = self
            .history
            .record(&mut self.template.scene, "apply palette", |scene| {
                Ok(apply_palette(scene, &roles, palette))
            })?;
        self.emit(EditorEvent::SceneChanged {
            description: "apply palette".into(),
        });
        Ok(changed)
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Start a drag gesture; everything until `end_gesture` is one undo step.
    pub fn begin_gesture(&mut self, description: &str) -> Result<()> {
        self.history.begin_batch(&self.template.scene, description)?;
        Ok(())
    }

    pub fn end_gesture(&mut self) -> Result<()> {
        self.history.end_batch(&self.template.scene)?;
        Ok(())
    }

    pub fn undo(&mut self) -> Result<Option<String>> {
        let desc = self.history.undo(&mut self.template.scene)?;
        self.after_history(desc.as_deref());
        Ok(desc)
    }

    pub fn redo(&mut self) -> Result<Option<String>> {
        let desc = self.history.redo(&mut self.template.scene)?;
        self.after_history(desc.as_deref());
        Ok(desc)
    }

    fn after_history(&mut self, desc: Option<&str>) {
        let Some(desc) = desc else {
            return;
        };
        let scene = &self.template.scene;
        let gone: Vec<NodeId> = self
            .selection
            .ids()
            .iter()
            .copied()
            .filter(|id| !scene.contains_id(*id))
            .collect();
        if self.selection.remove_all(&gone) {
            self.emit(EditorEvent::SelectionChanged);
        }
        self.emit(EditorEvent::SceneChanged {
            description: desc.to_string(),
        });
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selection(&self) -> &[NodeId] {
        self.selection.ids()
    }

    /// Replace the selection. Ids not in the scene are ignored.
    pub fn select(&mut self, ids: &[NodeId]) {
        let scene = &self.template.scene;
        let ids: Vec<NodeId> = ids.iter().copied().filter(|id| scene.contains_id(*id)).collect();
        self.selection.set(ids);
        self.emit(EditorEvent::SelectionChanged);
    }

    pub fn toggle_selected(&mut self, id: NodeId) {
        if self.template.scene.contains_id(id) {
            self.selection.toggle(id);
            self.emit(EditorEvent::SelectionChanged);
        }
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.emit(EditorEvent::SelectionChanged);
        }
    }

    // ─── Images and QR ───────────────────────────────────────────────────

    pub fn recent_images(&self) -> Vec<ImageSource> {
        self.recent.list()
    }

    pub fn pending_qr_refreshes(&self) -> usize {
        self.qr_queue.len()
    }

    /// Rebuild the stored fallback `src` of every QR node edited since the
    /// last call, once per node. Not recorded in history: the fallback is
    /// derived from metadata that already is. Returns how many were
    /// rebuilt.
    pub fn refresh_qr_fallbacks(&mut self, edge: u32) -> Result<usize> {
        let mut refreshed = 0;
        for id in self.qr_queue.drain() {
            let meta = self.template.scene.node(id).and_then(|n| match &n.kind {
                NodeKind::Image(img) => img.qr_metadata.clone(),
                _ => None,
            });
            let Some(meta) = meta else {
                continue;
            };
            let src = match qr_data_uri(&meta, edge) {
                Ok(src) => src,
                Err(e) => {
                    log::warn!("QR fallback for {id} not rebuilt: {e}");
                    continue;
                }
            };
            let mut patch = Map::new();
            patch.insert("src".into(), Value::String(src));
            self.template.scene.update_node_props(id, &patch)?;
            refreshed += 1;
        }
        if refreshed > 0 {
            log::debug!("rebuilt {refreshed} QR fallback(s)");
            self.emit(EditorEvent::SceneChanged {
                description: "refresh QR".into(),
            });
        }
        Ok(refreshed)
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// The editing-stage frame: live viewport, selection outlines when
    /// overlays are on.
    pub fn render_frame(&self, renderer: &Renderer<'_>) -> DrawList {
        renderer.render_frame(
            &self.template.scene,
            &self.viewport,
            self.selection.ids(),
            self.overlays_visible,
        )
    }
}

fn has_qr(node: &Node) -> bool {
    matches!(&node.kind, NodeKind::Image(img) if img.qr_metadata.is_some())
}

impl EditingSurface for Editor {
    fn scene(&self) -> &Scene {
        &self.template.scene
    }

    fn viewport(&self) -> ViewportState {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: ViewportState) {
        self.viewport = viewport;
        self.emit(EditorEvent::ViewportChanged);
    }

    fn overlays_visible(&self) -> bool {
        self.overlays_visible
    }

    fn set_overlays_visible(&mut self, visible: bool) {
        self.overlays_visible = visible;
    }
}
