use bk_core::CoreError;
use bk_render::RenderError;
use thiserror::Error;

/// A failed export. Nothing is written when one of these is returned.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("PDF assembly failed: {0}")]
    Pdf(String),

    #[error("invalid export config: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = ExportError> = std::result::Result<T, E>;
