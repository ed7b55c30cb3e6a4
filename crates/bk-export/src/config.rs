//! Export configuration and print geometry.
//!
//! Two DPI values are in play and must not be mixed up. `pdf_dpi` decides
//! how many pixels get rendered; `base_dpi` decides what physical size
//! those pixels stand for. Templates are authored at `base_dpi`.

use crate::error::{ExportError, Result};
use serde::Deserialize;

pub const MM_PER_INCH: f32 = 25.4;

/// Points per millimetre (PDF user space is 1/72 inch).
pub const PT_PER_MM: f32 = 72.0 / MM_PER_INCH;

pub fn mm_to_px(mm: f32, dpi: f32) -> f32 {
    mm / MM_PER_INCH * dpi
}

pub fn px_to_mm(px: f32, dpi: f32) -> f32 {
    px / dpi * MM_PER_INCH
}

// ─── Config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSize {
    pub width_mm: f32,
    pub height_mm: f32,
}

impl PageSize {
    pub const A4_LANDSCAPE: PageSize = PageSize {
        width_mm: 297.0,
        height_mm: 210.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// Configuration for PNG and PDF export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    /// Resolution templates are authored at. Default: **300**.
    pub base_dpi: f32,
    /// Render resolution for print. Default: **1200** (4× the base).
    pub pdf_dpi: f32,
    /// Bleed on every side, in millimetres. Default: **3**.
    pub bleed_mm: f32,
    pub page: PageSize,
    /// PNG export multiplier over the native size. Default: **1**.
    pub png_pixel_ratio: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_dpi: 300.0,
            pdf_dpi: 1200.0,
            bleed_mm: 3.0,
            page: PageSize::A4_LANDSCAPE,
            png_pixel_ratio: 1.0,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("baseDpi", self.base_dpi),
            ("pdfDpi", self.pdf_dpi),
            ("pngPixelRatio", self.png_pixel_ratio),
            ("page.widthMm", self.page.width_mm),
            ("page.heightMm", self.page.height_mm),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(ExportError::InvalidConfig(format!("{name} must be positive, got {value}")));
        }
        if !(self.bleed_mm.is_finite() && self.bleed_mm >= 0.0) {
            return Err(ExportError::InvalidConfig(format!(
                "bleedMm must not be negative, got {}",
                self.bleed_mm
            )));
        }
        Ok(())
    }

    /// Pixel ratio for the print render.
    pub fn pdf_pixel_ratio(&self) -> f32 {
        self.pdf_dpi / self.base_dpi
    }

    /// Print geometry for a card of `card_width`×`card_height` native pixels.
    pub fn print_layout(&self, card_width: f32, card_height: f32) -> Result<PrintLayout> {
        self.validate()?;
        let ratio = self.pdf_pixel_ratio();
        let bleed_px = mm_to_px(self.bleed_mm, self.pdf_dpi).round() as u32;
        let card_px = (
            (card_width * ratio).round() as u32,
            (card_height * ratio).round() as u32,
        );
        let physical_mm = (
            px_to_mm(card_width, self.base_dpi) + 2.0 * self.bleed_mm,
            px_to_mm(card_height, self.base_dpi) + 2.0 * self.bleed_mm,
        );
        if physical_mm.0 > self.page.width_mm || physical_mm.1 > self.page.height_mm {
            return Err(ExportError::InvalidConfig(format!(
                "a {:.1}×{:.1} mm card does not fit a {}×{} mm page",
                physical_mm.0, physical_mm.1, self.page.width_mm, self.page.height_mm
            )));
        }
        Ok(PrintLayout {
            pixel_ratio: ratio,
            card_px,
            bleed_px,
            canvas_px: (card_px.0 + 2 * bleed_px, card_px.1 + 2 * bleed_px),
            physical_mm,
            offset_mm: (
                (self.page.width_mm - physical_mm.0) / 2.0,
                (self.page.height_mm - physical_mm.1) / 2.0,
            ),
            page: self.page,
        })
    }
}

// ─── Layout ───────────────────────────────────────────────────────────────

/// Everything the PDF stage needs to place the print image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintLayout {
    pub pixel_ratio: f32,
    /// Rendered card art, before bleed padding.
    pub card_px: (u32, u32),
    /// Bleed on each side at the render resolution.
    pub bleed_px: u32,
    /// Card plus bleed.
    pub canvas_px: (u32, u32),
    /// Printed size of card plus bleed.
    pub physical_mm: (f32, f32),
    /// Top-left corner of the image on the page, centring it.
    pub offset_mm: (f32, f32),
    pub page: PageSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn business_card_print_layout() {
        let layout = ExportConfig::default().print_layout(1050.0, 600.0).unwrap();
        assert_eq!(layout.pixel_ratio, 4.0);
        assert_eq!(layout.card_px, (4200, 2400));
        assert_eq!(layout.bleed_px, 142);
        assert_eq!(layout.canvas_px, (4484, 2684));
        assert!(close(layout.physical_mm.0, 1050.0 / 300.0 * 25.4 + 6.0));
        assert!(close(layout.physical_mm.1, 600.0 / 300.0 * 25.4 + 6.0));
        assert!(close(layout.offset_mm.0, (297.0 - layout.physical_mm.0) / 2.0));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad_dpi = ExportConfig {
            pdf_dpi: 0.0,
            ..ExportConfig::default()
        };
        assert!(matches!(bad_dpi.validate(), Err(ExportError::InvalidConfig(_))));
        let bad_bleed = ExportConfig {
            bleed_mm: -1.0,
            ..ExportConfig::default()
        };
        assert!(bad_bleed.validate().is_err());
    }

    #[test]
    fn oversized_card_does_not_fit() {
        assert!(ExportConfig::default().print_layout(4000.0, 3000.0).is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ExportConfig = serde_json::from_str(r#"{ "bleedMm": 5 }"#).unwrap();
        assert_eq!(config.bleed_mm, 5.0);
        assert_eq!(config.pdf_dpi, 1200.0);
    }
}
