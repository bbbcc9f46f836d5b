use std::{env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

const ENV_BACKEND_URL: &str = "DOTVIEW_BACKEND_URL";
const ENV_DIR: &str = "DOTVIEW_DIR";
const ENV_TIMEOUT_SECS: &str = "DOTVIEW_TIMEOUT_SECS";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsNavigation {
    /// Lower bound of the zoom factor, relative to the fitted scale
    pub min_zoom: f32,

    /// Upper bound of the zoom factor, relative to the fitted scale
    pub max_zoom: f32,

    /// Constrain panning so the graph cannot leave the surface
    pub contain: bool,

    /// Padding around the graph when fitting to screen
    pub fit_to_screen_padding: f32,

    /// Zoom step applied per scroll notch
    pub zoom_speed: f32,
}

impl Default for SettingsNavigation {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 5.,
            contain: false,
            fit_to_screen_padding: 0.1,
            zoom_speed: 0.1,
        }
    }
}

impl SettingsNavigation {
    pub fn with_zoom_range(mut self, min_zoom: f32, max_zoom: f32) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_fit_to_screen_padding(mut self, padding: f32) -> Self {
        self.fit_to_screen_padding = padding;
        self
    }

    pub fn with_zoom_speed(mut self, speed: f32) -> Self {
        self.zoom_speed = speed;
        self
    }
}

/// Geometry knobs of the DOT layout engine. Distances are canvas units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsLayout {
    /// Distance between levels. Overridden by the graph's `ranksep`.
    pub rank_sep: f32,

    /// Distance between siblings. Overridden by the graph's `nodesep`.
    pub node_sep: f32,

    /// Estimated advance of one label character
    pub char_width: f32,

    /// Height of one label line
    pub line_height: f32,

    /// Inner padding of a node box
    pub node_padding: f32,

    /// Padding between a cluster box and its members
    pub cluster_padding: f32,
}

impl Default for SettingsLayout {
    fn default() -> Self {
        Self {
            rank_sep: 30.,
            node_sep: 20.,
            char_width: 7.,
            line_height: 14.,
            node_padding: 8.,
            cluster_padding: 12.,
        }
    }
}

impl SettingsLayout {
    pub fn with_separation(mut self, rank_sep: f32, node_sep: f32) -> Self {
        self.rank_sep = rank_sep;
        self.node_sep = node_sep;
        self
    }

    pub fn with_text_metrics(mut self, char_width: f32, line_height: f32) -> Self {
        self.char_width = char_width;
        self.line_height = line_height;
        self
    }
}

/// Where graph descriptions come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsBackend {
    /// Base url of the REST backend
    pub base_url: String,

    /// Serve files from this directory instead of the REST backend
    pub directory: Option<PathBuf>,

    /// Request timeout of the REST backend
    pub timeout: Duration,
}

impl Default for SettingsBackend {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            directory: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SettingsBackend {
    /// Reads the collaborator locations from `DOTVIEW_BACKEND_URL`, `DOTVIEW_DIR` and
    /// `DOTVIEW_TIMEOUT_SECS`, falling back to defaults for unset or invalid values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            settings.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup(ENV_DIR).filter(|v| !v.trim().is_empty()) {
            settings.directory = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => settings.timeout = Duration::from_secs(secs),
                Err(err) => log::warn!("ignoring {ENV_TIMEOUT_SECS}={raw}: {err}"),
            }
        }
        settings
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }
}
