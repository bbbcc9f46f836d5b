use egui::Ui;
use log::debug;

use crate::{error::ViewerError, renderer::GraphRenderer};

const LABEL: &str = "⟲ Reset view";
const TOOLTIP: &str = "fit the graph to the window and center it";

/// Button restoring the fitted and centered view of the mounted graph.
///
/// Hidden until the first graph was mounted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetControl;

impl ResetControl {
    pub fn is_visible(self, renderer: &GraphRenderer) -> bool {
        renderer.has_loaded()
    }

    /// Resets then centers the mounted viewport. Does nothing when no graph is mounted.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] when the mounted viewport was disposed.
    pub fn trigger(self, renderer: &mut GraphRenderer) -> Result<(), ViewerError> {
        let Some(viewport) = renderer.viewport_mut() else {
            debug!("reset requested with nothing mounted");
            return Ok(());
        };
        viewport.reset()?;
        viewport.center()
    }

    /// Draws the button when visible; returns the result of a click.
    pub fn show(self, ui: &mut Ui, renderer: &mut GraphRenderer) -> Option<Result<(), ViewerError>> {
        if !self.is_visible(renderer) {
            return None;
        }
        ui.button(LABEL)
            .on_hover_text(TOOLTIP)
            .clicked()
            .then(|| self.trigger(renderer))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{backend::Backend, layout::DotLayout, settings::SettingsNavigation};

    struct OneGraph;

    impl Backend for OneGraph {
        fn list_files(&self) -> Result<Vec<String>, ViewerError> {
            Ok(vec!["g".to_string()])
        }

        fn graph_description(&self, _file_id: &str) -> Result<String, ViewerError> {
            Ok("digraph { a -> b; a -> c }".to_string())
        }
    }

    fn renderer() -> GraphRenderer {
        GraphRenderer::new(
            Arc::new(OneGraph),
            Arc::new(DotLayout::default()),
            SettingsNavigation::default(),
        )
    }

    #[test]
    fn test_hidden_and_noop_before_first_load() {
        let mut r = renderer();
        assert!(!ResetControl.is_visible(&r));
        assert_eq!(ResetControl.trigger(&mut r), Ok(()));
    }

    #[test]
    fn test_trigger_restores_mount_state() {
        let mut r = renderer();
        r.load("g");
        r.wait_idle(Duration::from_secs(5));
        assert!(ResetControl.is_visible(&r));

        let initial = r.current().unwrap().viewport.state().unwrap().clone();
        let viewport = r.viewport_mut().unwrap();
        viewport.zoom(4., None).unwrap();
        viewport.pan(egui::Vec2::new(-30., 12.)).unwrap();

        ResetControl.trigger(&mut r).unwrap();
        assert_eq!(r.current().unwrap().viewport.state().unwrap(), &initial);
    }
}
