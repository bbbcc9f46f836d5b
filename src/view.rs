use egui::{Align2, FontId, Rect, Response, Sense, Ui, Vec2, Widget};
use log::error;

use crate::{
    draw::{graph_shapes, DrawContext},
    error::ViewerError,
    renderer::GraphRenderer,
    settings::SettingsNavigation,
    viewport::ViewportController,
};

const PLACEHOLDER: &str = "select a file to show its graph";
const LABEL_FONT_SIZE: f32 = 11.;
const DOUBLE_CLICK_ZOOM: f32 = 1.5;

/// Widget showing the mounted graph and translating pointer input into viewport calls.
///
/// Drag pans, scrolling and pinching zoom around the pointer, double click zooms in.
///
/// ```no_run
/// # use egui_dotview::{GraphCanvas, GraphRenderer, SettingsNavigation};
/// # fn show(ui: &mut egui::Ui, renderer: &mut GraphRenderer) {
/// let navigation = SettingsNavigation::default();
/// ui.add(&mut GraphCanvas::new(renderer, &navigation));
/// # }
/// ```
pub struct GraphCanvas<'a> {
    renderer: &'a mut GraphRenderer,
    navigation: &'a SettingsNavigation,
    font_size: f32,
}

impl<'a> GraphCanvas<'a> {
    pub fn new(renderer: &'a mut GraphRenderer, navigation: &'a SettingsNavigation) -> Self {
        Self {
            renderer,
            navigation,
            font_size: LABEL_FONT_SIZE,
        }
    }

    /// Label font size in canvas units.
    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }
}

impl Widget for &mut GraphCanvas<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let (resp, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        self.renderer.set_surface(resp.rect.size());

        let Some(mounted) = self.renderer.current_mut() else {
            painter.text(
                resp.rect.center(),
                Align2::CENTER_CENTER,
                PLACEHOLDER,
                FontId::proportional(14.),
                ui.visuals().weak_text_color(),
            );
            return resp;
        };

        handle_navigation(ui, &resp, &mut mounted.viewport, self.navigation);

        let state = match mounted.viewport.state() {
            Ok(state) => state,
            Err(err) => {
                error!("drawing {}: {err}", mounted.file_id);
                return resp;
            }
        };
        let dc = DrawContext {
            ctx: ui.ctx(),
            visuals: ui.visuals(),
            state,
            origin: resp.rect.min.to_vec2(),
            font_size: self.font_size,
        };
        painter.extend(graph_shapes(&dc, &mounted.geometry));

        resp
    }
}

fn handle_navigation(
    ui: &Ui,
    resp: &Response,
    viewport: &mut ViewportController,
    navigation: &SettingsNavigation,
) {
    let rect = resp.rect;
    if let Err(err) = handle_zoom(ui, resp, rect, viewport, navigation)
        .and_then(|()| handle_pan(resp, viewport))
    {
        error!("navigation: {err}");
    }
}

fn handle_zoom(
    ui: &Ui,
    resp: &Response,
    rect: Rect,
    viewport: &mut ViewportController,
    navigation: &SettingsNavigation,
) -> Result<(), ViewerError> {
    if !resp.hovered() {
        return Ok(());
    }

    let (zoom_delta, scroll, pointer) =
        ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta.y, i.pointer.hover_pos()));
    let focal = pointer.map(|p| (p - rect.min).to_pos2());

    if resp.double_clicked() {
        return viewport.zoom(DOUBLE_CLICK_ZOOM, focal);
    }
    if zoom_delta != 1. {
        return viewport.zoom(zoom_delta, focal);
    }
    if scroll != 0. {
        return viewport.zoom(1. + navigation.zoom_speed * scroll.signum(), focal);
    }
    Ok(())
}

fn handle_pan(resp: &Response, viewport: &mut ViewportController) -> Result<(), ViewerError> {
    if resp.dragged() {
        let delta = resp.drag_delta();
        if delta != Vec2::ZERO {
            return viewport.pan(delta);
        }
    }
    Ok(())
}
