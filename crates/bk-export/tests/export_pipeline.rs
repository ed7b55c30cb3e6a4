//! Integration tests: export and save-as-template on a real card (bk-export).

use bk_core::*;
use bk_export::*;
use bk_render::{AssetCache, IconSet, RenderOptions, Renderer};
use pretty_assertions::assert_eq;

fn template() -> Template {
    Template::from_json(include_str!("../../bk-core/tests/fixtures/business_card.json")).unwrap()
}

fn with_renderer<T>(f: impl FnOnce(&Renderer<'_>) -> T) -> T {
    let (icons, assets) = (IconSet::new(), AssetCache::new());
    let renderer = Renderer::new(&icons, &assets).with_options(RenderOptions {
        load_system_fonts: false,
        ..RenderOptions::default()
    });
    f(&renderer)
}

// ─── Print geometry ─────────────────────────────────────────────────────

#[test]
fn business_card_print_geometry() {
    let t = template();
    let layout = ExportConfig::default().print_layout(t.scene.width, t.scene.height).unwrap();
    assert_eq!(layout.canvas_px, (4200 + 2 * 142, 2400 + 2 * 142));
    // 1050 px at 300 DPI is 88.9 mm, plus 3 mm bleed each side.
    assert!((layout.physical_mm.0 - 94.9).abs() < 0.01);
    assert!((layout.physical_mm.1 - 56.8).abs() < 0.01);
}

#[test]
fn png_export_is_native_size() {
    let t = template();
    let bytes = with_renderer(|r| export_png(&t.scene, r, &ExportConfig::default())).unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    assert_eq!((img.width(), img.height()), (1050, 600));
}

#[test]
fn print_image_keeps_bleed_white() {
    let t = template();
    let config = ExportConfig {
        pdf_dpi: 300.0,
        ..ExportConfig::default()
    };
    let (img, layout) = with_renderer(|r| compose_print_image(&t.scene, r, &config)).unwrap();
    assert_eq!(layout.bleed_px, 35);
    assert_eq!(img.dimensions(), (1050 + 70, 600 + 70));
    assert_eq!(img.get_pixel(5, 5).0, [255, 255, 255, 255]);
    // Dark gradient just inside the bleed.
    let inside = img.get_pixel(40, 40).0;
    assert!(inside[0] < 64 && inside[3] == 255);
}

// ─── Save as template ───────────────────────────────────────────────────

#[test]
fn normalize_renumbers_and_assigns_roles() {
    let mut t = template();
    normalize_template(&mut t).unwrap();
    let ids: Vec<String> = t.scene.nodes().map(|n| n.id().to_string()).collect();
    assert_eq!(
        ids,
        [
            "node_rect_01",
            "node_circle_01",
            "node_star_01",
            "node_text_jordan_reyes_01",
            "node_text_product_designer_01",
            "node_text_email_01",
            "node_text_contact_01",
            "node_icon_01",
            "node_image_01",
        ]
    );
    let roles = t.scene.color_roles.as_ref().unwrap();
    assert_eq!(roles.get("node_circle_01"), Some(&ColorRole::Accent));
    assert_eq!(roles.len(), 8);
}

#[test]
fn normalize_is_idempotent() {
    let mut once = template();
    normalize_template(&mut once).unwrap();
    let first = once.to_json().unwrap();
    normalize_template(&mut once).unwrap();
    assert_eq!(once.to_json().unwrap(), first);
}

#[test]
fn normalized_template_round_trips() {
    let mut t = template();
    normalize_template(&mut t).unwrap();
    let reloaded = Template::from_json(&t.to_json().unwrap()).unwrap();
    assert_eq!(reloaded.to_json().unwrap(), t.to_json().unwrap());
}
