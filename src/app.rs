use std::time::Duration;

use eframe::{App, CreationContext, Frame};
use egui::{CentralPanel, Color32, Context, RichText, TopBottomPanel, Ui};
use log::error;

use crate::{
    bootstrap::{Notice, Viewer},
    error::ViewerError,
    settings::SettingsNavigation,
    status::{StatusKind, StatusQueue},
    view::GraphCanvas,
};

pub const APP_NAME: &str = "DOT Viewer";

const COLOR_SUCCESS: Color32 = Color32::from_rgb(80, 200, 120);
const STATUS_REFRESH: Duration = Duration::from_millis(250);

/// Window of the viewer: file picker, reset button and status on top, graph below.
pub struct ViewerApp {
    viewer: Viewer,
    navigation: SettingsNavigation,
    status: StatusQueue,
}

impl ViewerApp {
    pub fn new(_: &CreationContext<'_>, viewer: Viewer, navigation: SettingsNavigation) -> Self {
        Self::headless(viewer, navigation)
    }

    /// Builds the app without a window, starting the viewer right away.
    pub fn headless(mut viewer: Viewer, navigation: SettingsNavigation) -> Self {
        viewer.start();
        Self {
            viewer,
            navigation,
            status: StatusQueue::new(),
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn status(&self) -> &StatusQueue {
        &self.status
    }

    fn report(&mut self, notice: Notice) {
        match notice {
            Notice::Info(text) => self.status.push_info(text),
            Notice::Success(text) => self.status.push_success(text),
            Notice::Error(err) => self.report_error(&err),
        }
    }

    fn report_error(&mut self, err: &ViewerError) {
        if matches!(err, ViewerError::InvalidState(_)) {
            error!("{err}");
        }
        self.status.push_error(err);
    }

    /// Draws one frame.
    pub fn ui(&mut self, ctx: &Context) {
        for notice in self.viewer.tick() {
            self.report(notice);
        }

        TopBottomPanel::top("dotview_top").show(ctx, |ui| {
            ui.horizontal(|ui| self.top_bar(ui));
        });

        CentralPanel::default().show(ctx, |ui| {
            let mut canvas = GraphCanvas::new(self.viewer.renderer_mut(), &self.navigation);
            ui.add(&mut canvas);
        });

        self.status.retain_active();
        if self.viewer.is_busy() {
            ctx.request_repaint();
        } else if !self.status.is_empty() {
            ctx.request_repaint_after(STATUS_REFRESH);
        }
    }

    fn top_bar(&mut self, ui: &mut Ui) {
        ui.label("File:");
        let (picker, renderer, reset) = self.viewer.parts_mut();
        picker.show(ui);

        if let Some(Err(err)) = reset.show(ui, renderer) {
            self.report_error(&err);
        }
        if self.viewer.renderer().is_loading() {
            ui.spinner();
        }

        ui.separator();
        if let Some(m) = self.status.latest() {
            let color = match m.kind {
                StatusKind::Error => ui.visuals().error_fg_color,
                StatusKind::Success => COLOR_SUCCESS,
                StatusKind::Info => ui.visuals().hyperlink_color,
            };
            ui.label(RichText::new(&m.text).monospace().color(color));
        }
    }
}

impl App for ViewerApp {
    fn update(&mut self, ctx: &Context, _: &mut Frame) {
        self.ui(ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{backend::Backend, layout::DotLayout};

    struct Files;

    impl Backend for Files {
        fn list_files(&self) -> Result<Vec<String>, ViewerError> {
            Ok(vec!["a.py".to_string()])
        }

        fn graph_description(&self, _file_id: &str) -> Result<String, ViewerError> {
            Ok("digraph { module -> main }".to_string())
        }
    }

    #[test]
    fn test_frames_load_default_selection() {
        let viewer = Viewer::new(
            Arc::new(Files),
            Arc::new(DotLayout::default()),
            SettingsNavigation::default(),
        );
        let mut app = ViewerApp::headless(viewer, SettingsNavigation::default());
        let ctx = Context::default();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while app.viewer().renderer().current().is_none() && std::time::Instant::now() < deadline {
            let _ = ctx.run(egui::RawInput::default(), |ctx| app.ui(ctx));
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(app.viewer().picker().selected(), Some("a.py"));
        assert_eq!(app.viewer().renderer().current().unwrap().file_id, "a.py");
        assert!(app.viewer().renderer().has_loaded());
    }
}
