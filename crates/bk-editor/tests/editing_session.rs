//! Integration tests: the editing session over a real template (bk-editor).

use bk_core::*;
use bk_editor::*;
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};
use std::cell::RefCell;
use std::rc::Rc;

fn editor() -> Editor {
    let template = Template::from_json(include_str!("../../bk-core/tests/fixtures/business_card.json")).unwrap();
    Editor::new(template)
}

fn patch(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn ids(ed: &Editor) -> Vec<String> {
    ed.scene().nodes().map(|n| n.id().to_string()).collect()
}

// ─── Lock gating ────────────────────────────────────────────────────────

#[test]
fn locked_panel_cannot_be_moved_or_deleted() {
    let mut ed = editor();
    let before = ids(&ed);
    let err = ed.move_layer(0, 3).unwrap_err();
    assert!(matches!(
        err,
        EditorError::Core(CoreError::LockedLayerViolation(id)) if id.as_str() == "panel"
    ));
    assert!(ed.remove_layer(0).is_err());
    assert_eq!(ids(&ed), before);
    assert!(!ed.can_undo());
}

#[test]
fn unlocking_through_the_layer_definition_allows_the_move() {
    let mut ed = editor();
    ed.update_layer_definition(0, patch(json!({ "locked": false }))).unwrap();
    ed.move_layer(0, 1).unwrap();
    assert_eq!(ids(&ed)[1], "panel");
}

// ─── Ordering ───────────────────────────────────────────────────────────

#[test]
fn display_order_moves_are_flipped_to_storage() {
    let mut ed = editor();
    // Display 0 is the frontmost layer (storage 8).
    ed.move_layer_display(0, 1).unwrap();
    let order = ids(&ed);
    assert_eq!(&order[7..], &["qr".to_string(), "phone-icon".to_string()]);
}

// ─── Groups ─────────────────────────────────────────────────────────────

#[test]
fn hiding_a_group_is_one_undo_step() {
    let mut ed = editor();
    ed.set_group_prop("contact", patch(json!({ "visible": false }))).unwrap();
    let hidden: Vec<bool> = ed.scene().nodes().map(|n| n.base.visible).collect();
    assert_eq!(hidden.iter().filter(|v| !**v).count(), 3);

    ed.undo().unwrap();
    assert!(ed.scene().nodes().all(|n| n.base.visible));
    assert!(ed.scene().group("contact").unwrap().visible);
}

#[test]
fn deleting_a_group_clears_member_references() {
    let mut ed = editor();
    ed.delete_group("decor").unwrap();
    assert!(ed.scene().group("decor").is_none());
    assert!(ed.scene().layers().iter().all(|l| l.group_id.as_deref() != Some("decor")));
}

// ─── History ────────────────────────────────────────────────────────────

#[test]
fn drag_gesture_undoes_in_one_step() {
    let mut ed = editor();
    let name = NodeId::intern("name");
    ed.begin_gesture("drag name").unwrap();
    for x in [90.0, 100.0, 110.0] {
        ed.update_node_props(name, patch(json!({ "x": x }))).unwrap();
    }
    ed.end_gesture().unwrap();
    assert_eq!(ed.scene().node(name).unwrap().base.x, 110.0);

    assert_eq!(ed.undo().unwrap().as_deref(), Some("drag name"));
    assert_eq!(ed.scene().node(name).unwrap().base.x, 80.0);
    assert!(!ed.can_undo());
}

#[test]
fn palette_swap_is_undoable() {
    let mut ed = editor();
    ed.refresh_color_roles();
    let palette: Palette = [(ColorRole::Accent, "#EF4444".to_string())].into_iter().collect();
    assert_eq!(ed.apply_palette(&palette).unwrap(), 2);
    assert_eq!(ed.scene().node(NodeId::intern("dot")).unwrap().base.fill.as_deref(), Some("#EF4444"));
    ed.undo().unwrap();
    assert_eq!(ed.scene().node(NodeId::intern("dot")).unwrap().base.fill.as_deref(), Some("#F59E0B"));
}

// ─── Import ─────────────────────────────────────────────────────────────

#[test]
fn malformed_import_leaves_the_session_untouched() {
    let mut ed = editor();
    let before = ids(&ed);
    assert!(ed.load_json(r#"{ "id": "x", "layers": 5 }"#).is_err());
    assert_eq!(ids(&ed), before);
}

// ─── Injected services ──────────────────────────────────────────────────

#[derive(Clone, Default)]
struct SharedStore(Rc<RefCell<Vec<model::ImageSource>>>);

impl RecentImageStore for SharedStore {
    fn push(&mut self, image: model::ImageSource) {
        self.0.borrow_mut().insert(0, image);
    }
    fn list(&self) -> Vec<model::ImageSource> {
        self.0.borrow().clone()
    }
    fn clear(&mut self) {
        self.0.borrow_mut().clear();
    }
}

#[test]
fn recent_images_go_to_the_injected_store() {
    let store = SharedStore::default();
    let mut ed = editor().with_recent_store(Box::new(store.clone()));
    let source = model::ImageSource {
        url: "https://cdn.example.com/portrait.jpg".into(),
        width: 400.0,
        height: 800.0,
    };
    let id = ed.add_image(&source).unwrap();
    assert_eq!(store.0.borrow().len(), 1);
    let node = ed.scene().node(id).unwrap();
    assert_eq!((node.base.width, node.base.height), (150.0, 300.0));
}

#[test]
fn every_change_is_pushed_to_listeners() {
    let mut ed = editor();
    let count = Rc::new(RefCell::new(0));
    let sink = count.clone();
    ed.subscribe(move |event| {
        if matches!(event, EditorEvent::SceneChanged { .. }) {
            *sink.borrow_mut() += 1;
        }
    });
    ed.set_background(patch(json!({ "type": "solid", "color1": "#FFFFFF" }))).unwrap();
    ed.set_opacity_percent(NodeId::intern("title"), 50.0).unwrap();
    ed.undo().unwrap();
    assert_eq!(*count.borrow(), 3);
}
