pub mod commands;
pub mod error;
pub mod mutation;
pub mod qr_queue;
pub mod recent;
pub mod selection;
pub mod session;

pub use commands::CommandStack;
pub use error::{EditorError, Result};
pub use mutation::{Applied, SceneMutation, apply_mutation};
pub use qr_queue::QrRefreshQueue;
pub use recent::{RECENT_IMAGES_CAPACITY, RecentImageStore, RingBufferStore};
pub use selection::Selection;
pub use session::{Editor, EditorEvent};
