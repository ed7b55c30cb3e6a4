//! WASM bridge for Badgekit: exposes the card editor to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Structured arguments and
//! results cross the boundary as JSON strings; editing calls report
//! failure as `false` (or an empty string) and log the reason to the
//! console. Loading, serialization and export throw on failure.

mod render2d;

use bk_core::model::ImageSource;
use bk_core::{EditingSurface, NodeId, Palette, Template, ViewportState};
use bk_editor::Editor;
use bk_export::{ExportConfig, export_pdf_from, export_png_from, normalize_template};
use bk_render::{AssetCache, IconGlyph, IconSet, Renderer, to_svg};
use render2d::{CanvasTheme, ImageCache};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The main WASM-facing card editor.
///
/// Owns the editing session plus the icon and image tables the host fills
/// in as downloads complete. All interaction from JS goes through this
/// struct.
#[wasm_bindgen]
pub struct CardEditor {
    editor: Editor,
    icons: IconSet,
    assets: AssetCache,
    images: ImageCache,
    width: f64,
    height: f64,
    dark_mode: bool,
}

fn parse_object(json: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(json) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            log::warn!("expected a JSON object, got {json}");
            None
        }
        Err(e) => {
            log::warn!("invalid JSON: {e}");
            None
        }
    }
}

/// Log an editing failure and collapse it to `false`.
fn report<T, E: std::fmt::Display>(result: Result<T, E>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            log::warn!("{e}");
            false
        }
    }
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    log::error!("{e}");
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
impl CardEditor {
    /// Open a template for editing inside a `width`×`height` stage.
    #[wasm_bindgen(constructor)]
    pub fn new(template_json: &str, width: f64, height: f64) -> Result<CardEditor, JsValue> {
        console_setup();
        let template = Template::from_json(template_json).map_err(js_err)?;
        let mut this = Self {
            editor: Editor::new(template),
            icons: IconSet::new(),
            assets: AssetCache::new(),
            images: ImageCache::new(),
            width,
            height,
            dark_mode: false,
        };
        this.fit_to_stage();
        Ok(this)
    }

    /// Replace the document. Returns `false` and keeps the current one if
    /// the JSON is malformed.
    pub fn load_json(&mut self, json: &str) -> bool {
        let ok = report(self.editor.load_json(json));
        if ok {
            self.images.clear();
            self.fit_to_stage();
        }
        ok
    }

    pub fn to_json(&self) -> Result<String, JsValue> {
        self.editor.template().to_json().map_err(js_err)
    }

    /// Renumbered, role-assigned copy of the document for "save as
    /// template". The live session keeps its ids.
    pub fn normalized_json(&self) -> Result<String, JsValue> {
        let mut template = self.editor.template().clone();
        normalize_template(&mut template).map_err(js_err)?;
        template.to_json().map_err(js_err)
    }

    // ─── Stage ───────────────────────────────────────────────────────────

    pub fn render(&mut self, ctx: &CanvasRenderingContext2d) {
        let renderer = Renderer::new(&self.icons, &self.assets);
        let mut list = self.editor.render_frame(&renderer);
        list.width = self.width as f32;
        list.height = self.height as f32;
        let theme = if self.dark_mode {
            CanvasTheme::dark()
        } else {
            CanvasTheme::light()
        };
        render2d::render_list(ctx, &list, &mut self.images, &theme);
    }

    /// True while an image is still decoding and another frame is needed.
    pub fn needs_redraw(&self) -> bool {
        self.images.has_pending()
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.dark_mode = is_dark;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.fit_to_stage();
    }

    pub fn set_zoom(&mut self, scale: f32, x: f32, y: f32) {
        self.editor.set_viewport(ViewportState {
            scale: scale.max(0.01),
            x,
            y,
            width: self.width as f32,
            height: self.height as f32,
        });
    }

    pub fn set_overlays_visible(&mut self, visible: bool) {
        self.editor.set_overlays_visible(visible);
    }

    fn fit_to_stage(&mut self) {
        let scene = self.editor.scene();
        let viewport = ViewportState::fit(self.width as f32, self.height as f32, scene.width, scene.height);
        self.editor.set_viewport(viewport);
    }

    // ─── Host-provided resources ─────────────────────────────────────────

    /// Register icon markup (SVG body without the `<svg>` wrapper).
    pub fn register_icon(&mut self, name: &str, body: &str, width: f32, height: f32) {
        self.icons.insert(
            name,
            IconGlyph {
                body: body.to_string(),
                width,
                height,
            },
        );
    }

    /// Hand over downloaded image bytes for `url`.
    pub fn insert_asset(&mut self, url: &str, bytes: &[u8]) {
        self.assets.insert_bytes(url, bytes);
    }

    pub fn mark_asset_failed(&mut self, url: &str, reason: &str) {
        self.assets.mark_failed(url, reason);
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    /// Create a node of `kind` from partial JSON props. Returns the new id,
    /// or an empty string on failure.
    pub fn add_node(&mut self, kind: &str, props_json: &str) -> String {
        let Some(props) = parse_object(props_json) else {
            return String::new();
        };
        match self.editor.create_and_add(kind, &props) {
            Ok(id) => id.to_string(),
            Err(e) => {
                log::warn!("{e}");
                String::new()
            }
        }
    }

    /// Add an image sized to fit the card and remember it as recent.
    pub fn add_image(&mut self, url: &str, width: f32, height: f32) -> String {
        let source = ImageSource {
            url: url.to_string(),
            width,
            height,
        };
        match self.editor.add_image(&source) {
            Ok(id) => id.to_string(),
            Err(e) => {
                log::warn!("{e}");
                String::new()
            }
        }
    }

    pub fn recent_images_json(&self) -> String {
        let list: Vec<Value> = self
            .editor
            .recent_images()
            .into_iter()
            .map(|img| serde_json::json!({ "url": img.url, "width": img.width, "height": img.height }))
            .collect();
        Value::Array(list).to_string()
    }

    pub fn remove_layer(&mut self, index: usize) -> bool {
        report(self.editor.remove_layer(index))
    }

    pub fn delete_selected(&mut self) -> bool {
        report(self.editor.delete_selection())
    }

    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        report(self.editor.move_layer(from, to))
    }

    /// Move using layer-panel indices (0 = frontmost).
    pub fn move_layer_display(&mut self, from: usize, to: usize) -> bool {
        report(self.editor.move_layer_display(from, to))
    }

    pub fn update_node_props(&mut self, id: &str, patch_json: &str) -> bool {
        match parse_object(patch_json) {
            Some(patch) => report(self.editor.update_node_props(NodeId::intern(id), patch)),
            None => false,
        }
    }

    pub fn update_layer_definition(&mut self, index: usize, patch_json: &str) -> bool {
        match parse_object(patch_json) {
            Some(patch) => report(self.editor.update_layer_definition(index, patch)),
            None => false,
        }
    }

    pub fn set_opacity_percent(&mut self, id: &str, percent: f32) -> bool {
        report(self.editor.set_opacity_percent(NodeId::intern(id), percent))
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> bool {
        report(self.editor.set_layer_visible(index, visible))
    }

    pub fn set_layer_locked(&mut self, index: usize, locked: bool) -> bool {
        report(self.editor.set_layer_locked(index, locked))
    }

    pub fn set_background(&mut self, patch_json: &str) -> bool {
        match parse_object(patch_json) {
            Some(patch) => report(self.editor.set_background(patch)),
            None => false,
        }
    }

    // ─── Groups ──────────────────────────────────────────────────────────

    /// Group the layers at `indices_json` (a JSON array of storage indices).
    /// Returns the group id, or an empty string on failure.
    pub fn create_group(&mut self, name: &str, indices_json: &str) -> String {
        let indices: Vec<usize> = match serde_json::from_str(indices_json) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("invalid index list: {e}");
                return String::new();
            }
        };
        self.editor.create_group(name, &indices).unwrap_or_else(|e| {
            log::warn!("{e}");
            String::new()
        })
    }

    pub fn delete_group(&mut self, id: &str) -> bool {
        report(self.editor.delete_group(id))
    }

    pub fn set_group_prop(&mut self, id: &str, patch_json: &str) -> bool {
        match parse_object(patch_json) {
            Some(patch) => report(self.editor.set_group_prop(id, patch)),
            None => false,
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Replace the selection with a JSON array of node ids.
    pub fn select_ids(&mut self, ids_json: &str) -> bool {
        match serde_json::from_str::<Vec<String>>(ids_json) {
            Ok(ids) => {
                let ids: Vec<NodeId> = ids.iter().map(|s| NodeId::intern(s)).collect();
                self.editor.select(&ids);
                true
            }
            Err(e) => {
                log::warn!("invalid id list: {e}");
                false
            }
        }
    }

    pub fn toggle_selected(&mut self, id: &str) {
        self.editor.toggle_selected(NodeId::intern(id));
    }

    pub fn clear_selection(&mut self) {
        self.editor.clear_selection();
    }

    pub fn get_selected_ids(&self) -> Result<String, JsValue> {
        let ids: Vec<&str> = self.editor.selection().iter().map(|id| id.as_str()).collect();
        serde_json::to_string(&ids).map_err(js_err)
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        matches!(self.editor.undo(), Ok(Some(_)))
    }

    pub fn redo(&mut self) -> bool {
        matches!(self.editor.redo(), Ok(Some(_)))
    }

    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.editor.can_redo()
    }

    /// Start coalescing a continuous gesture (drag, slider) into one step.
    pub fn begin_gesture(&mut self, description: &str) -> bool {
        report(self.editor.begin_gesture(description))
    }

    pub fn end_gesture(&mut self) -> bool {
        report(self.editor.end_gesture())
    }

    // ─── Colors ──────────────────────────────────────────────────────────

    pub fn color_roles_json(&mut self) -> Result<String, JsValue> {
        self.editor.refresh_color_roles();
        let roles = &self.editor.scene().color_roles;
        serde_json::to_string(roles).map_err(js_err)
    }

    /// Recolor by role. `palette_json` maps role names to colors. Returns
    /// the number of recolored nodes, or -1 on failure.
    pub fn apply_palette(&mut self, palette_json: &str) -> i32 {
        let palette: Palette = match serde_json::from_str(palette_json) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("invalid palette: {e}");
                return -1;
            }
        };
        match self.editor.apply_palette(&palette) {
            Ok(n) => n as i32,
            Err(e) => {
                log::warn!("{e}");
                -1
            }
        }
    }

    /// Regenerate bitmap fallbacks for QR codes edited since the last call.
    pub fn refresh_qr(&mut self, edge: u32) -> u32 {
        match self.editor.refresh_qr_fallbacks(edge) {
            Ok(n) => n as u32,
            Err(e) => {
                log::warn!("{e}");
                0
            }
        }
    }

    // ─── Export ──────────────────────────────────────────────────────────

    /// PNG at native size times `pixel_ratio`.
    pub fn export_png(&mut self, pixel_ratio: f32) -> Result<Vec<u8>, JsValue> {
        let config = ExportConfig {
            png_pixel_ratio: pixel_ratio,
            ..ExportConfig::default()
        };
        let renderer = Renderer::new(&self.icons, &self.assets);
        export_png_from(&mut self.editor, &renderer, &config).map_err(js_err)
    }

    /// Print PDF; `config_json` may override any [`ExportConfig`] field.
    pub fn export_pdf(&mut self, config_json: &str) -> Result<Vec<u8>, JsValue> {
        let config: ExportConfig = if config_json.trim().is_empty() {
            ExportConfig::default()
        } else {
            serde_json::from_str(config_json).map_err(js_err)?
        };
        let renderer = Renderer::new(&self.icons, &self.assets);
        export_pdf_from(&mut self.editor, &renderer, &config).map_err(js_err)
    }

    pub fn export_svg(&self) -> String {
        let renderer = Renderer::new(&self.icons, &self.assets);
        to_svg(&renderer.build(self.editor.scene()))
    }
}

// ─── Console wiring ──────────────────────────────────────────────────────

#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            _ => web_sys::console::log_1(&msg),
        }
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
static LOGGER: ConsoleLogger = ConsoleLogger;

fn console_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Badgekit WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(log::LevelFilter::Info);
            }
        });
    }
}

// ─── Standalone functions (no editor needed) ─────────────────────────────

/// Validate template JSON. Returns `{"ok":true}` or `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(json: &str) -> String {
    match Template::from_json(json) {
        Ok(_) => serde_json::json!({ "ok": true }).to_string(),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
    }
}

/// Thumbnail SVG of a template scaled to fit `width`×`height`.
#[wasm_bindgen]
pub fn preview_svg(json: &str, width: f32, height: f32) -> Result<String, JsValue> {
    let template = Template::from_json(json).map_err(js_err)?;
    Ok(to_svg(&bk_render::render_preview(&template.scene, width, height)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CARD: &str = include_str!("../../bk-core/tests/fixtures/business_card.json");

    #[test]
    fn json_accessors_return_documents() {
        let mut editor = CardEditor::new(CARD, 800.0, 600.0).unwrap();
        let json = editor.to_json().unwrap();
        assert_eq!(Template::from_json(&json).unwrap(), *editor.editor.template());

        editor.select_ids(r#"["name","dot"]"#);
        assert_eq!(editor.get_selected_ids().unwrap(), r#"["name","dot"]"#);

        let roles: Value = serde_json::from_str(&editor.color_roles_json().unwrap()).unwrap();
        assert!(roles.as_object().is_some_and(|m| !m.is_empty()));
    }
}
