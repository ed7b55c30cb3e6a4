use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("SVG parse failed: {0}")]
    Svg(#[from] usvg::Error),

    #[error("cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("QR generation failed: {0}")]
    Qr(String),
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
