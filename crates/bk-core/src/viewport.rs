//! Editing viewport state and the surface contract export relies on.

use crate::scene::Scene;
use serde::{Deserialize, Serialize};

/// Zoom, pan and size of the live editing stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportState {
    /// 1:1 at the origin, sized to the card.
    pub fn identity(card_width: f32, card_height: f32) -> Self {
        Self {
            scale: 1.0,
            x: 0.0,
            y: 0.0,
            width: card_width,
            height: card_height,
        }
    }

    /// Scale-to-fit preserving aspect ratio, centred in the container.
    pub fn fit(container_width: f32, container_height: f32, card_width: f32, card_height: f32) -> Self {
        let scale = if card_width > 0.0 && card_height > 0.0 {
            (container_width / card_width).min(container_height / card_height)
        } else {
            1.0
        };
        Self {
            scale,
            x: (container_width - card_width * scale) / 2.0,
            y: (container_height - card_height * scale) / 2.0,
            width: container_width,
            height: container_height,
        }
    }
}

/// Anything hosting a scene on an interactive stage.
///
/// Export borrows the surface, resets the viewport to identity, hides
/// editing overlays, renders, then puts both back.
pub trait EditingSurface {
    fn scene(&self) -> &Scene;
    fn viewport(&self) -> ViewportState;
    fn set_viewport(&mut self, viewport: ViewportState);
    /// Selection outlines and transform handles.
    fn overlays_visible(&self) -> bool;
    fn set_overlays_visible(&mut self, visible: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_preserves_aspect_and_centres() {
        let v = ViewportState::fit(800.0, 800.0, 1050.0, 600.0);
        assert!((v.scale - 800.0 / 1050.0).abs() < 1e-6);
        assert_eq!(v.x, 0.0);
        assert!(v.y > 0.0);
    }
}
