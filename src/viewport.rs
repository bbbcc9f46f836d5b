use egui::{Pos2, Rect, Vec2};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::ViewerError, layout::Geometry, settings::SettingsNavigation};

/// Pan and zoom of one mounted graph.
///
/// Screen positions are relative to the top left corner of the display surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    /// Zoom factor relative to the fitted scale, 1 means fitted
    pub zoom: f32,
    /// Screen offset of the canvas origin
    pub pan: Vec2,
    /// Canvas to screen scale at which the whole graph fits the surface
    pub fit_scale: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Whether panning is constrained to keep the graph on the surface
    pub contain: bool,
}

impl ViewportState {
    /// Effective canvas to screen scale.
    pub fn scale(&self) -> f32 {
        self.fit_scale * self.zoom
    }

    pub fn canvas_to_screen_pos(&self, pos: Pos2) -> Pos2 {
        (pos.to_vec2() * self.scale() + self.pan).to_pos2()
    }

    pub fn canvas_to_screen_size(&self, size: f32) -> f32 {
        size * self.scale()
    }

    pub fn canvas_to_screen_rect(&self, rect: Rect) -> Rect {
        Rect::from_min_max(
            self.canvas_to_screen_pos(rect.min),
            self.canvas_to_screen_pos(rect.max),
        )
    }

    pub fn screen_to_canvas_pos(&self, pos: Pos2) -> Pos2 {
        ((pos.to_vec2() - self.pan) / self.scale()).to_pos2()
    }
}

/// Owns the viewport of the currently mounted graph.
///
/// Created by [`ViewportController::attach`] for one geometry and never rebound; a new
/// mount creates a new controller. After [`ViewportController::dispose`] every operation
/// fails with [`ViewerError::InvalidState`].
#[derive(Debug)]
pub struct ViewportController {
    state: ViewportState,
    bounds: Rect,
    surface: Vec2,
    padding: f32,
    disposed: bool,
}

impl ViewportController {
    /// Binds a controller to `geometry` shown on a surface of size `surface`.
    ///
    /// The controller starts unfitted with the identity transform; callers follow up with
    /// [`fit`](Self::fit) and [`center`](Self::center).
    pub fn attach(geometry: &Geometry, surface: Vec2, settings: &SettingsNavigation) -> Self {
        let (min_zoom, max_zoom) = if settings.min_zoom <= settings.max_zoom {
            (settings.min_zoom, settings.max_zoom)
        } else {
            (settings.max_zoom, settings.min_zoom)
        };
        Self {
            state: ViewportState {
                zoom: 1.,
                pan: Vec2::ZERO,
                fit_scale: 1.,
                min_zoom,
                max_zoom,
                contain: settings.contain,
            },
            bounds: geometry.bounds(),
            surface,
            padding: settings.fit_to_screen_padding,
            disposed: false,
        }
    }

    fn check(&self, op: &'static str) -> Result<(), ViewerError> {
        if self.disposed {
            log::error!("{op} called on a disposed viewport");
            return Err(ViewerError::InvalidState(op));
        }
        Ok(())
    }

    /// Bounds used for fitting, with a unit square standing in for empty or broken bounds.
    fn fit_bounds(&self) -> Rect {
        let (min, max) = (self.bounds.min, self.bounds.max);
        let invalid = !min.x.is_finite()
            || !min.y.is_finite()
            || !max.x.is_finite()
            || !max.y.is_finite()
            || min.x > max.x
            || min.y > max.y;
        if invalid {
            Rect::from_min_max(Pos2::new(-0.5, -0.5), Pos2::new(0.5, 0.5))
        } else {
            self.bounds
        }
    }

    /// Scales the graph so it fits the surface and aligns it with the surface origin.
    /// The zoom factor becomes 1.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] after dispose.
    pub fn fit(&mut self) -> Result<(), ViewerError> {
        self.check("fit")?;

        let bounds = self.fit_bounds();
        let mut diag = bounds.size();
        if !diag.x.is_finite() || !diag.y.is_finite() || diag.x <= 0. || diag.y <= 0. {
            diag = Vec2::new(diag.x.max(1.), diag.y.max(1.));
        }
        let graph_size = diag * (1. + self.padding);
        let (width, height) = (graph_size.x.max(1e-3), graph_size.y.max(1e-3));

        let zoom_x = (self.surface.x / width).abs();
        let zoom_y = (self.surface.y / height).abs();
        let mut fit_scale = zoom_x.min(zoom_y);
        if !fit_scale.is_finite() || fit_scale <= 0. {
            fit_scale = 1.;
        }

        let margin = (graph_size - diag) / 2.;
        self.state.fit_scale = fit_scale;
        self.state.zoom = 1.;
        self.state.pan = (margin - bounds.min.to_vec2()) * fit_scale;

        debug!("fit: scale {fit_scale}, surface {:?}", self.surface);
        Ok(())
    }

    /// Moves the graph center to the surface center at the current zoom.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] after dispose.
    pub fn center(&mut self) -> Result<(), ViewerError> {
        self.check("center")?;

        let graph_center = self.fit_bounds().center().to_vec2();
        self.state.pan = self.surface / 2. - graph_center * self.state.scale();
        Ok(())
    }

    /// Translates the view by `delta` screen units.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] after dispose.
    pub fn pan(&mut self, delta: Vec2) -> Result<(), ViewerError> {
        self.check("pan")?;

        if !delta.is_finite() {
            return Ok(());
        }
        self.state.pan += delta;
        if self.state.contain {
            self.contain();
        }
        Ok(())
    }

    /// Multiplies the zoom factor by `factor` keeping the canvas point under `focal`
    /// (surface center when `None`) in place. The result is clamped to the zoom range;
    /// non-finite and non-positive factors are ignored.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] after dispose.
    pub fn zoom(&mut self, factor: f32, focal: Option<Pos2>) -> Result<(), ViewerError> {
        self.check("zoom")?;

        if !factor.is_finite() || factor <= 0. {
            debug!("ignoring zoom factor {factor}");
            return Ok(());
        }

        let focal = focal.unwrap_or_else(|| (self.surface / 2.).to_pos2());
        let canvas_focal = self.state.screen_to_canvas_pos(focal);

        let new_zoom = (self.state.zoom * factor).clamp(self.state.min_zoom, self.state.max_zoom);
        self.state.zoom = new_zoom;
        self.state.pan = focal.to_vec2() - canvas_focal.to_vec2() * self.state.scale();

        if self.state.contain {
            self.contain();
        }
        Ok(())
    }

    /// Restores the state right after mount: fitted and centered.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] after dispose.
    pub fn reset(&mut self) -> Result<(), ViewerError> {
        self.fit()?;
        self.center()
    }

    /// Updates the surface size. Pan and zoom are left untouched.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] after dispose.
    pub fn resize(&mut self, surface: Vec2) -> Result<(), ViewerError> {
        self.check("resize")?;
        self.surface = surface;
        Ok(())
    }

    /// Releases the controller.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] when already disposed.
    pub fn dispose(&mut self) -> Result<(), ViewerError> {
        self.check("dispose")?;
        self.disposed = true;
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] after dispose.
    pub fn state(&self) -> Result<&ViewportState, ViewerError> {
        self.check("state")?;
        Ok(&self.state)
    }

    pub fn surface(&self) -> Vec2 {
        self.surface
    }

    /// Keeps at least part of the graph on the surface.
    fn contain(&mut self) {
        let screen = self.state.canvas_to_screen_rect(self.fit_bounds());
        let mut shift = Vec2::ZERO;
        if screen.max.x < 0. {
            shift.x = -screen.max.x;
        } else if screen.min.x > self.surface.x {
            shift.x = self.surface.x - screen.min.x;
        }
        if screen.max.y < 0. {
            shift.y = -screen.max.y;
        } else if screen.min.y > self.surface.y {
            shift.y = self.surface.y - screen.min.y;
        }
        self.state.pan += shift;
    }
}
