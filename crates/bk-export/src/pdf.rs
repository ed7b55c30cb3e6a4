//! Print PDF export.
//!
//! The card is rendered at `pdf_dpi`, padded with white bleed, and placed
//! as a single image centred on the page at the size it has at
//! `base_dpi`.

use crate::config::{ExportConfig, PT_PER_MM, PrintLayout};
use crate::error::{ExportError, Result};
use crate::png::card_crop;
use crate::surface::with_export_viewport;
use bk_core::{EditingSurface, Scene};
use bk_render::Renderer;
use image::{DynamicImage, Rgba, RgbaImage, imageops};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// Card art on a white full-bleed canvas, plus the geometry used.
pub fn compose_print_image(
    scene: &Scene,
    renderer: &Renderer<'_>,
    config: &ExportConfig,
) -> Result<(RgbaImage, PrintLayout)> {
    let layout = config.print_layout(scene.width, scene.height)?;
    let art = renderer
        .render_export_surface(scene, layout.pixel_ratio, Some(card_crop(scene)))?
        .to_rgba_image();
    let mut canvas = RgbaImage::from_pixel(layout.canvas_px.0, layout.canvas_px.1, Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &art, layout.bleed_px as i64, layout.bleed_px as i64);
    log::debug!(
        "print image {}x{} ({} px bleed) at {}x",
        layout.canvas_px.0,
        layout.canvas_px.1,
        layout.bleed_px,
        layout.pixel_ratio
    );
    Ok((canvas, layout))
}

pub fn export_pdf(scene: &Scene, renderer: &Renderer<'_>, config: &ExportConfig) -> Result<Vec<u8>> {
    let (image, layout) = compose_print_image(scene, renderer, config)?;
    build_pdf(image, &layout)
}

/// PDF export from a live editing surface.
pub fn export_pdf_from<S: EditingSurface>(
    surface: &mut S,
    renderer: &Renderer<'_>,
    config: &ExportConfig,
) -> Result<Vec<u8>> {
    with_export_viewport(surface, |s| export_pdf(s.scene(), renderer, config))
}

fn pdf_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// One-page PDF with `image` placed per `layout`.
pub fn build_pdf(image: RgbaImage, layout: &PrintLayout) -> Result<Vec<u8>> {
    let (px_w, px_h) = image.dimensions();
    let rgb = DynamicImage::ImageRgba8(image).into_rgb8().into_raw();

    let page_w = layout.page.width_mm * PT_PER_MM;
    let page_h = layout.page.height_mm * PT_PER_MM;
    let img_w = layout.physical_mm.0 * PT_PER_MM;
    let img_h = layout.physical_mm.1 * PT_PER_MM;
    let x = layout.offset_mm.0 * PT_PER_MM;
    // PDF space grows upward.
    let y = page_h - layout.offset_mm.1 * PT_PER_MM - img_h;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => px_w as i64,
            "Height" => px_h as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        },
        rgb,
    ));
    let resources_id = doc.add_object(dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    img_w.into(),
                    0.0_f32.into(),
                    0.0_f32.into(),
                    img_h.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(pdf_err)?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.0_f32.into(), 0.0_f32.into(), page_w.into(), page_h.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1_i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(pdf_err)?;
    log::debug!("PDF assembled, {} bytes", out.len());
    Ok(out)
}
