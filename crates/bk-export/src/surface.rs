//! Viewport snapshot/restore around an export.
//!
//! Export renders from the live editing surface. For the duration of the
//! render the viewport must be 1:1 at the origin, sized to the card, and
//! selection overlays hidden. [`ExportGuard`] does both and puts the
//! previous state back when dropped, on success and failure alike.

use bk_core::{EditingSurface, ViewportState};

pub struct ExportGuard<'a, S: EditingSurface> {
    surface: &'a mut S,
    saved_viewport: ViewportState,
    saved_overlays: bool,
}

impl<'a, S: EditingSurface> ExportGuard<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        let saved_viewport = surface.viewport();
        let saved_overlays = surface.overlays_visible();
        let (w, h) = (surface.scene().width, surface.scene().height);
        surface.set_viewport(ViewportState::identity(w, h));
        surface.set_overlays_visible(false);
        log::debug!("export viewport reset to 1:1 at {w}x{h}");
        Self {
            surface,
            saved_viewport,
            saved_overlays,
        }
    }

    pub fn surface(&self) -> &S {
        &*self.surface
    }
}

impl<S: EditingSurface> Drop for ExportGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.set_viewport(self.saved_viewport);
        self.surface.set_overlays_visible(self.saved_overlays);
    }
}

/// Run `export` against the surface with the viewport reset and overlays
/// hidden.
pub fn with_export_viewport<S: EditingSurface, T>(surface: &mut S, export: impl FnOnce(&S) -> T) -> T {
    let guard = ExportGuard::new(surface);
    export(guard.surface())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bk_core::Scene;

    /// Minimal stage for export tests.
    pub(crate) struct Stage {
        pub scene: Scene,
        pub viewport: ViewportState,
        pub overlays: bool,
    }

    impl Stage {
        pub fn zoomed(scene: Scene) -> Self {
            Self {
                scene,
                viewport: ViewportState {
                    scale: 2.5,
                    x: -120.0,
                    y: 40.0,
                    width: 800.0,
                    height: 500.0,
                },
                overlays: true,
            }
        }
    }

    impl EditingSurface for Stage {
        fn scene(&self) -> &Scene {
            &self.scene
        }
        fn viewport(&self) -> ViewportState {
            self.viewport
        }
        fn set_viewport(&mut self, viewport: ViewportState) {
            self.viewport = viewport;
        }
        fn overlays_visible(&self) -> bool {
            self.overlays
        }
        fn set_overlays_visible(&mut self, visible: bool) {
            self.overlays = visible;
        }
    }

    #[test]
    fn viewport_is_reset_then_restored() {
        let mut stage = Stage::zoomed(Scene::new(1050.0, 600.0));
        let before = stage.viewport;
        let seen = with_export_viewport(&mut stage, |s| (s.viewport(), s.overlays_visible()));
        assert_eq!(seen, (ViewportState::identity(1050.0, 600.0), false));
        assert_eq!(stage.viewport, before);
        assert!(stage.overlays);
    }
}
