//! PNG export: native resolution, cropped exactly to the card, no bleed.

use crate::config::ExportConfig;
use crate::error::Result;
use crate::surface::with_export_viewport;
use bk_core::model::CropRect;
use bk_core::{EditingSurface, Scene};
use bk_render::Renderer;

pub fn card_crop(scene: &Scene) -> CropRect {
    CropRect {
        x: 0.0,
        y: 0.0,
        width: scene.width,
        height: scene.height,
    }
}

pub fn export_png(scene: &Scene, renderer: &Renderer<'_>, config: &ExportConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let surface = renderer.render_export_surface(scene, config.png_pixel_ratio, Some(card_crop(scene)))?;
    log::debug!("PNG export {}x{}", surface.width(), surface.height());
    Ok(surface.encode_png()?)
}

/// PNG export from a live editing surface.
pub fn export_png_from<S: EditingSurface>(
    surface: &mut S,
    renderer: &Renderer<'_>,
    config: &ExportConfig,
) -> Result<Vec<u8>> {
    with_export_viewport(surface, |s| export_png(s.scene(), renderer, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::tests::Stage;
    use bk_render::{AssetCache, IconSet, RenderOptions};

    #[test]
    fn png_matches_native_size() {
        let (icons, assets) = (IconSet::new(), AssetCache::new());
        let renderer = Renderer::new(&icons, &assets).with_options(RenderOptions {
            load_system_fonts: false,
            ..RenderOptions::default()
        });
        let mut stage = Stage::zoomed(Scene::new(210.0, 120.0));
        let png = export_png_from(&mut stage, &renderer, &ExportConfig::default()).unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (210, 120));
        assert!(stage.overlays);
    }
}
