//! Undo/Redo command stack.
//!
//! Every undo step is a pair of scene snapshots (MessagePack-encoded)
//! taken around a mutation. Undo restores the "before" snapshot, redo the
//! "after" one, so no per-mutation inverse has to be derived.
//!
//! Drag gestures use batching: the scene is captured at the start and end
//! of the gesture, so the whole gesture is one undo step.

use crate::mutation::{Applied, SceneMutation, apply_mutation};
use bk_core::{Result, Scene};

/// One reversible step.
#[derive(Debug, Clone)]
pub struct Command {
    before: Vec<u8>,
    after: Vec<u8>,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured at the start of a batch.
    batch_snapshot: Option<Vec<u8>>,
    batch_description: String,
    /// Whether any mutations occurred during the current batch.
    batch_dirty: bool,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
            batch_description: String::new(),
            batch_dirty: false,
        }
    }

    /// Start a batch group. Mutations until the matching `end_batch()` are
    /// applied live but recorded as one undo step.
    pub fn begin_batch(&mut self, scene: &Scene, description: &str) -> Result<()> {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(scene.to_snapshot()?);
            self.batch_description = description.to_string();
            self.batch_dirty = false;
        }
        self.batch_depth += 1;
        Ok(())
    }

    /// End a batch group. Closing the outermost batch pushes one command
    /// if the scene actually changed.
    pub fn end_batch(&mut self, scene: &Scene) -> Result<()> {
        if self.batch_depth == 0 {
            return Ok(());
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            let before = self.batch_snapshot.take();
            if self.batch_dirty
                && let Some(before) = before
            {
                let after = scene.to_snapshot()?;
                let description = std::mem::take(&mut self.batch_description);
                self.push(before, after, description);
            }
            self.batch_dirty = false;
        }
        Ok(())
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Apply a mutation and record it. Failed mutations leave no entry.
    pub fn execute(&mut self, scene: &mut Scene, mutation: SceneMutation, description: &str) -> Result<Applied> {
        self.record(scene, description, |scene| apply_mutation(scene, mutation))
    }

    /// Run an arbitrary scene edit as one undo step (or as part of the
    /// open batch).
    pub fn record<T>(
        &mut self,
        scene: &mut Scene,
        description: &str,
        edit: impl FnOnce(&mut Scene) -> Result<T>,
    ) -> Result<T> {
        if self.batch_depth > 0 {
            let out = edit(scene)?;
            self.batch_dirty = true;
            return Ok(out);
        }

        let before = scene.to_snapshot()?;
        let out = edit(scene)?;
        let after = scene.to_snapshot()?;
        self.push(before, after, description.to_string());
        Ok(out)
    }

    fn push(&mut self, before: Vec<u8>, after: Vec<u8>, description: String) {
        if before == after {
            return;
        }
        self.undo_stack.push(Command {
            before,
            after,
            description,
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, scene: &mut Scene) -> Result<Option<String>> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };
        *scene = Scene::from_snapshot(&cmd.before)?;
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        Ok(Some(desc))
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, scene: &mut Scene) -> Result<Option<String>> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        *scene = Scene::from_snapshot(&cmd.after)?;
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        Ok(Some(desc))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bk_core::{LayerDefinition, Node, NodeId, NodeType};
    use serde_json::{Map, Value};

    fn scene() -> Scene {
        let mut scene = Scene::new(1050.0, 600.0);
        let node = Node::new(NodeType::Rect, NodeId::intern("box"));
        scene.insert(LayerDefinition::new(node), None).unwrap();
        scene
    }

    fn move_by(x: f32) -> SceneMutation {
        let mut patch = Map::new();
        patch.insert("x".into(), Value::from(x));
        SceneMutation::UpdateNodeProps {
            id: NodeId::intern("box"),
            patch,
        }
    }

    fn x_of(scene: &Scene) -> f32 {
        scene.node(NodeId::intern("box")).unwrap().base.x
    }

    #[test]
    fn undo_redo_move() {
        let mut s = scene();
        let mut stack = CommandStack::new(100);
        stack.execute(&mut s, move_by(50.0), "Move box").unwrap();
        assert_eq!(x_of(&s), 50.0);

        assert_eq!(stack.undo(&mut s).unwrap().as_deref(), Some("Move box"));
        assert_eq!(x_of(&s), 0.0);

        assert_eq!(stack.redo(&mut s).unwrap().as_deref(), Some("Move box"));
        assert_eq!(x_of(&s), 50.0);
    }

    #[test]
    fn redo_clears_on_new_action() {
        let mut s = scene();
        let mut stack = CommandStack::new(100);
        stack.execute(&mut s, move_by(5.0), "move").unwrap();
        stack.undo(&mut s).unwrap();
        assert!(stack.can_redo());
        stack.execute(&mut s, move_by(1.0), "move2").unwrap();
        assert!(!stack.can_redo());
    }

    #[test]
    fn max_depth_trims_oldest() {
        let mut s = scene();
        let mut stack = CommandStack::new(3);
        for i in 0..5 {
            stack.execute(&mut s, move_by((i + 1) as f32), "move").unwrap();
        }
        let mut undo_count = 0;
        while stack.undo(&mut s).unwrap().is_some() {
            undo_count += 1;
        }
        assert_eq!(undo_count, 3);
        assert_eq!(x_of(&s), 2.0);
    }

    #[test]
    fn failed_mutation_records_nothing() {
        let mut s = scene();
        let mut stack = CommandStack::new(100);
        assert!(stack.execute(&mut s, SceneMutation::RemoveLayer { index: 9 }, "bad").is_err());
        assert!(!stack.can_undo());
    }

    #[test]
    fn no_op_records_nothing() {
        let mut s = scene();
        let mut stack = CommandStack::new(100);
        stack.execute(&mut s, SceneMutation::MoveLayer { from: 0, to: 0 }, "noop").unwrap();
        assert!(!stack.can_undo());
    }

    #[test]
    fn batch_undo_is_single_step() {
        let mut s = scene();
        let mut stack = CommandStack::new(100);
        stack.begin_batch(&s, "drag").unwrap();
        for i in 1..=5 {
            stack.execute(&mut s, move_by(i as f32 * 10.0), "drag step").unwrap();
        }
        stack.end_batch(&s).unwrap();
        assert_eq!(x_of(&s), 50.0);

        assert_eq!(stack.undo(&mut s).unwrap().as_deref(), Some("drag"));
        assert_eq!(x_of(&s), 0.0);
        assert!(!stack.can_undo());

        stack.redo(&mut s).unwrap();
        assert_eq!(x_of(&s), 50.0);
    }

    #[test]
    fn nested_batches_close_once() {
        let mut s = scene();
        let mut stack = CommandStack::new(100);
        stack.begin_batch(&s, "outer").unwrap();
        stack.begin_batch(&s, "inner").unwrap();
        stack.execute(&mut s, move_by(3.0), "step").unwrap();
        stack.end_batch(&s).unwrap();
        assert!(!stack.can_undo());
        stack.end_batch(&s).unwrap();
        assert!(stack.can_undo());
    }

    #[test]
    fn empty_batch_no_undo_entry() {
        let s = scene();
        let mut stack = CommandStack::new(100);
        stack.begin_batch(&s, "drag").unwrap();
        stack.end_batch(&s).unwrap();
        assert!(!stack.can_undo());
    }
}
