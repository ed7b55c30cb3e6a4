pub mod adapter;
pub mod assets;
pub mod command;
pub mod error;
pub mod icon;
pub mod paint;
pub mod qr;
pub mod raster;
pub mod svg;

pub use adapter::{RenderOptions, Renderer, render_export_surface, render_preview};
pub use assets::{AssetCache, AssetResolver, AssetState};
pub use command::{DrawItem, DrawLayer, DrawList, Paint, Primitive, ShadowSpec, StrokeSpec, TextRun};
pub use error::{RenderError, Result};
pub use icon::{IconGlyph, IconProvider, IconSet};
pub use paint::encode_scene;
pub use qr::{qr_data_uri, qr_png, qr_svg, qr_svg_data_uri};
pub use raster::{Surface, encode_png, rasterize_svg};
pub use svg::to_svg;
