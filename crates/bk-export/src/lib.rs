pub mod config;
pub mod error;
pub mod pdf;
pub mod png;
pub mod renumber;
pub mod surface;

pub use config::{ExportConfig, PageSize, PrintLayout, mm_to_px, px_to_mm};
pub use error::{ExportError, Result};
pub use pdf::{build_pdf, compose_print_image, export_pdf, export_pdf_from};
pub use png::{export_png, export_png_from};
pub use renumber::{normalize_template, renumber_ids, renumber_nodes};
pub use surface::{ExportGuard, with_export_viewport};
