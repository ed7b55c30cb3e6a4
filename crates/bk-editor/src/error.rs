use bk_core::CoreError;
use bk_render::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;
