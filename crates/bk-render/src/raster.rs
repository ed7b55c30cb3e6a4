//! CPU rasterization: SVG document → pixel surface via usvg/resvg.

use crate::error::{RenderError, Result};
use bk_core::model::CropRect;
use resvg::tiny_skia::{Pixmap, Transform};
use std::io::Cursor;
use std::sync::{Arc, LazyLock};
use usvg::fontdb::Database;

/// System fonts, loaded once per process.
static SYSTEM_FONTS: LazyLock<Arc<Database>> = LazyLock::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    log::debug!("loaded {} font faces", db.len());
    Arc::new(db)
});

/// A rendered RGBA surface (premultiplied internally).
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha RGBA copy.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let (w, h) = (self.width(), self.height());
        let mut buf = Vec::with_capacity((w * h * 4) as usize);
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            buf.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        image::RgbaImage::from_raw(w, h, buf).unwrap_or_else(|| image::RgbaImage::new(w, h))
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.to_rgba_image())
    }
}

pub fn encode_png(img: &image::RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Rasterize `svg` at `pixel_ratio`, keeping only `crop` (document units;
/// default: the whole document).
pub fn rasterize_svg(
    svg: &str,
    pixel_ratio: f32,
    crop: Option<CropRect>,
    system_fonts: bool,
) -> Result<Surface> {
    let mut opt = usvg::Options::default();
    if system_fonts {
        opt.fontdb = SYSTEM_FONTS.clone();
    }
    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size();
    let crop = crop.unwrap_or(CropRect {
        x: 0.0,
        y: 0.0,
        width: size.width(),
        height: size.height(),
    });
    let width = (crop.width * pixel_ratio).round().max(1.0) as u32;
    let height = (crop.height * pixel_ratio).round().max(1.0) as u32;
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
    let transform = Transform::from_row(
        pixel_ratio,
        0.0,
        0.0,
        pixel_ratio,
        -crop.x * pixel_ratio,
        -crop.y * pixel_ratio,
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());
    log::debug!("rasterized {width}x{height} at {pixel_ratio}x");
    Ok(Surface { pixmap })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"><rect width="10" height="10" fill="#FF0000"/></svg>"##;

    #[test]
    fn pixel_ratio_scales_output() {
        let surface = rasterize_svg(RED_SQUARE, 4.0, None, false).unwrap();
        assert_eq!((surface.width(), surface.height()), (40, 40));
        let img = surface.to_rgba_image();
        assert_eq!(img.get_pixel(20, 20).0, [255, 0, 0, 255]);
    }

    #[test]
    fn crop_limits_output() {
        let crop = CropRect {
            x: 5.0,
            y: 0.0,
            width: 5.0,
            height: 10.0,
        };
        let surface = rasterize_svg(RED_SQUARE, 1.0, Some(crop), false).unwrap();
        assert_eq!((surface.width(), surface.height()), (5, 10));
    }

    #[test]
    fn png_has_signature() {
        let surface = rasterize_svg(RED_SQUARE, 1.0, None, false).unwrap();
        let png = surface.encode_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn malformed_svg_is_an_error() {
        assert!(matches!(
            rasterize_svg("<svg", 1.0, None, false),
            Err(RenderError::Svg(_))
        ));
    }
}
