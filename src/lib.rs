mod app;
mod bootstrap;
mod draw;
mod error;
mod picker;
mod renderer;
mod reset;
mod status;
mod view;
mod viewport;

pub mod backend;
pub mod layout;
pub mod settings;

pub use self::app::{ViewerApp, APP_NAME};
pub use self::backend::{Backend, DirectoryBackend, HttpBackend};
pub use self::bootstrap::{Notice, Viewer};
pub use self::error::ViewerError;
pub use self::layout::{DotLayout, Geometry, LayoutEngine};
pub use self::picker::{FilePicker, SelectionSink};
pub use self::renderer::{run_pipeline, GraphRenderer, LoadOutcome, MountedGraph};
pub use self::reset::ResetControl;
pub use self::settings::{SettingsBackend, SettingsLayout, SettingsNavigation};
pub use self::status::{StatusKind, StatusMsg, StatusQueue};
pub use self::view::GraphCanvas;
pub use self::viewport::{ViewportController, ViewportState};
