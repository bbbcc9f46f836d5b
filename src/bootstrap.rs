use std::{sync::Arc, thread, time::Duration};

use crossbeam::channel::{unbounded, Receiver, TryRecvError};
use instant::Instant;
use log::{error, info};

use crate::{
    backend::{self, Backend},
    error::ViewerError,
    layout::{DotLayout, LayoutEngine},
    picker::FilePicker,
    renderer::{GraphRenderer, LoadOutcome},
    reset::ResetControl,
    settings::{SettingsBackend, SettingsLayout, SettingsNavigation},
};

type Listing = Result<Vec<String>, ViewerError>;

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Success(String),
    Error(ViewerError),
}

/// The viewer without its window: picker, renderer and the wiring between them.
///
/// Selection changes flow from the picker through a channel into
/// [`GraphRenderer::load`]; [`tick`](Self::tick) drives everything and is meant to be
/// called once per frame.
pub struct Viewer {
    backend: Arc<dyn Backend>,
    picker: FilePicker,
    renderer: GraphRenderer,
    reset: ResetControl,
    selections: Receiver<String>,
    listing: Option<Receiver<Listing>>,
    started: bool,
}

impl Viewer {
    pub fn new(
        backend: Arc<dyn Backend>,
        layout: Arc<dyn LayoutEngine>,
        navigation: SettingsNavigation,
    ) -> Self {
        let (sender, selections) = unbounded();
        let mut picker = FilePicker::new();
        picker.on_selection_change(sender);

        Self {
            renderer: GraphRenderer::new(Arc::clone(&backend), layout, navigation),
            backend,
            picker,
            reset: ResetControl,
            selections,
            listing: None,
            started: false,
        }
    }

    pub fn from_settings(
        backend: &SettingsBackend,
        layout: SettingsLayout,
        navigation: SettingsNavigation,
    ) -> Self {
        Self::new(
            backend::from_settings(backend),
            Arc::new(DotLayout::new(layout)),
            navigation,
        )
    }

    /// Requests the file list in the background. Only the first call has an effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let (sender, receiver) = unbounded();
        let backend = Arc::clone(&self.backend);
        let spawned = thread::Builder::new()
            .name("dotview-list".to_string())
            .spawn(move || {
                let _ = sender.send(backend.list_files());
            });

        match spawned {
            Ok(_) => self.listing = Some(receiver),
            Err(err) => {
                error!("cannot start listing worker: {err}");
                self.listing_unavailable(format!("cannot start worker: {err}"));
            }
        }
    }

    /// Queues a failed listing so the next [`tick`](Self::tick) reports it.
    fn listing_unavailable(&mut self, reason: String) {
        let (sender, receiver) = unbounded();
        let _ = sender.send(Err(ViewerError::ListUnavailable(reason)));
        self.listing = Some(receiver);
    }

    /// Advances the viewer: installs the file list once it arrives, turns selection
    /// changes into loads and applies finished loads.
    pub fn tick(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();

        if let Some(listing) = &self.listing {
            let received = match listing.try_recv() {
                Ok(result) => Some(result),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Err(ViewerError::ListUnavailable(
                    "listing worker stopped".to_string(),
                ))),
            };
            if let Some(result) = received {
                self.listing = None;
                match self.picker.install(result) {
                    Ok([]) => notices.push(Notice::Info("no files available".to_string())),
                    Ok(files) => notices.push(Notice::Info(format!("{} files available", files.len()))),
                    Err(err) => notices.push(Notice::Error(err)),
                }
            }
        }

        while let Ok(file_id) = self.selections.try_recv() {
            self.renderer.load(&file_id);
            notices.push(Notice::Info(format!("loading {file_id}")));
        }

        for outcome in self.renderer.poll() {
            notices.push(match outcome {
                LoadOutcome::Mounted { file_id, .. } => Notice::Success(format!("showing {file_id}")),
                LoadOutcome::Failed { error, .. } => Notice::Error(error),
            });
        }

        notices
    }

    /// Ticks until nothing is pending or `timeout` passes.
    pub fn run_until_idle(&mut self, timeout: Duration) -> Vec<Notice> {
        let deadline = Instant::now() + timeout;
        let mut notices = self.tick();
        while self.is_busy() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
            notices.extend(self.tick());
        }
        notices
    }

    /// Whether the file list or any graph is still being retrieved.
    pub fn is_busy(&self) -> bool {
        self.listing.is_some() || !self.selections.is_empty() || self.renderer.in_flight() > 0
    }

    /// User picked `file_id`.
    pub fn select(&mut self, file_id: &str) -> bool {
        let changed = self.picker.select(file_id);
        if changed {
            info!("selected {file_id}");
        }
        changed
    }

    /// # Errors
    ///
    /// [`ViewerError::InvalidState`] when the mounted viewport was disposed.
    pub fn reset_view(&mut self) -> Result<(), ViewerError> {
        self.reset.trigger(&mut self.renderer)
    }

    pub fn picker(&self) -> &FilePicker {
        &self.picker
    }

    pub fn picker_mut(&mut self) -> &mut FilePicker {
        &mut self.picker
    }

    pub fn renderer(&self) -> &GraphRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut GraphRenderer {
        &mut self.renderer
    }

    pub fn reset_control(&self) -> ResetControl {
        self.reset
    }

    /// Picker and renderer at once, for drawing the top bar.
    pub fn parts_mut(&mut self) -> (&mut FilePicker, &mut GraphRenderer, ResetControl) {
        (&mut self.picker, &mut self.renderer, self.reset)
    }
}
