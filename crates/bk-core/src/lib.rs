pub mod background;
pub mod color;
pub mod error;
pub mod id;
pub mod model;
pub mod roles;
pub mod scene;
pub mod template;
pub mod viewport;

pub use background::{Background, GradientBackground, GradientStop, GradientType, PatternBackground};
pub use color::Color;
pub use error::{CoreError, Result};
pub use id::NodeId;
pub use model::*;
pub use roles::{ColorRole, ColorRoleMap, Palette, apply_palette, assign_color_roles, refresh_color_roles};
pub use scene::{LayerDefinition, LayerGroup, Orientation, Scene, flip_index};
pub use template::Template;
pub use viewport::{EditingSurface, ViewportState};
