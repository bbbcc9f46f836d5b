use std::{sync::Arc, thread, time::Duration};

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use egui::Vec2;
use instant::Instant;
use log::{debug, error, info, warn};

use crate::{
    backend::Backend,
    error::ViewerError,
    layout::{Geometry, LayoutEngine},
    settings::SettingsNavigation,
    viewport::ViewportController,
};

const DEFAULT_SURFACE: Vec2 = Vec2::new(800., 600.);

/// Graph currently on display together with its viewport.
#[derive(Debug)]
pub struct MountedGraph {
    pub file_id: String,
    pub geometry: Geometry,
    pub viewport: ViewportController,
}

/// What happened to a load that was still the latest one when it completed.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Mounted { seq: u64, file_id: String },
    Failed { seq: u64, file_id: String, error: ViewerError },
}

#[derive(Debug)]
struct Completion {
    seq: u64,
    file_id: String,
    result: Result<Geometry, ViewerError>,
}

/// Fetches, lays out and mounts graphs; owns the single mounted graph.
///
/// Work for each [`load`](Self::load) runs on its own thread. Results are applied on the
/// caller's thread by [`poll`](Self::poll), and only the result of the most recent load
/// is ever mounted.
pub struct GraphRenderer {
    backend: Arc<dyn Backend>,
    layout: Arc<dyn LayoutEngine>,
    navigation: SettingsNavigation,
    surface: Vec2,

    sender: Sender<Completion>,
    receiver: Receiver<Completion>,

    /// Sequence number of the most recent load, 0 before the first one.
    issued: u64,
    /// Sequence number of the most recent completion that was applied.
    settled: u64,
    in_flight: usize,

    current: Option<MountedGraph>,
    has_loaded: bool,
}

impl GraphRenderer {
    pub fn new(
        backend: Arc<dyn Backend>,
        layout: Arc<dyn LayoutEngine>,
        navigation: SettingsNavigation,
    ) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            backend,
            layout,
            navigation,
            surface: DEFAULT_SURFACE,
            sender,
            receiver,
            issued: 0,
            settled: 0,
            in_flight: 0,
            current: None,
            has_loaded: false,
        }
    }

    /// Starts loading the graph of `file_id` and returns the sequence number of the load.
    ///
    /// Any load still running becomes stale; its result will be discarded.
    pub fn load(&mut self, file_id: &str) -> u64 {
        self.issued += 1;
        self.in_flight += 1;
        let seq = self.issued;
        info!("loading graph #{seq} for {file_id}");

        let backend = Arc::clone(&self.backend);
        let layout = Arc::clone(&self.layout);
        let sender = self.sender.clone();
        let id = file_id.to_string();

        let spawned = thread::Builder::new()
            .name(format!("dotview-load-{seq}"))
            .spawn(move || {
                let started = Instant::now();
                let result = run_pipeline(backend.as_ref(), layout.as_ref(), &id);
                debug!("load #{seq} for {id} finished in {:?}", started.elapsed());
                if sender
                    .send(Completion {
                        seq,
                        file_id: id,
                        result,
                    })
                    .is_err()
                {
                    debug!("renderer dropped before load #{seq} completed");
                }
            });

        if let Err(err) = spawned {
            error!("cannot start worker for load #{seq}: {err}");
            let _ = self.sender.send(Completion {
                seq,
                file_id: file_id.to_string(),
                result: Err(ViewerError::fetch(file_id, format!("cannot start worker: {err}"))),
            });
        }

        seq
    }

    /// Applies every completion that has arrived so far.
    pub fn poll(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.receiver.try_recv() {
            if let Some(outcome) = self.apply(completion) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Blocks until no load is in flight or `timeout` passes, applying completions as
    /// they arrive.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = Vec::new();
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(completion) => outcomes.extend(self.apply(completion)),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    warn!("{} loads still in flight after {timeout:?}", self.in_flight);
                    break;
                }
            }
        }
        outcomes
    }

    fn apply(&mut self, completion: Completion) -> Option<LoadOutcome> {
        let Completion {
            seq,
            file_id,
            result,
        } = completion;
        self.in_flight = self.in_flight.saturating_sub(1);

        if seq != self.issued {
            match &result {
                Ok(_) => info!("discarding stale graph #{seq} for {file_id}, latest is #{}", self.issued),
                Err(err) => info!("discarding stale failure #{seq} for {file_id}: {err}"),
            }
            return None;
        }
        self.settled = seq;

        match result {
            Ok(geometry) => {
                self.mount(file_id.clone(), geometry);
                Some(LoadOutcome::Mounted { seq, file_id })
            }
            Err(error) => {
                warn!("load #{seq} for {file_id} failed: {error}");
                Some(LoadOutcome::Failed {
                    seq,
                    file_id,
                    error,
                })
            }
        }
    }

    fn mount(&mut self, file_id: String, geometry: Geometry) {
        if let Some(mut previous) = self.current.take() {
            debug!("disposing graph for {}", previous.file_id);
            if let Err(err) = previous.viewport.dispose() {
                error!("disposing viewport of {}: {err}", previous.file_id);
            }
        }

        let mut viewport = ViewportController::attach(&geometry, self.surface, &self.navigation);
        if let Err(err) = viewport.fit().and_then(|()| viewport.center()) {
            error!("initializing viewport of {file_id}: {err}");
        }

        info!(
            "mounted graph for {file_id}: {} nodes, {} edges, {} clusters",
            geometry.nodes.len(),
            geometry.edges.len(),
            geometry.clusters.len()
        );
        self.current = Some(MountedGraph {
            file_id,
            geometry,
            viewport,
        });
        self.has_loaded = true;
    }

    pub fn current(&self) -> Option<&MountedGraph> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut MountedGraph> {
        self.current.as_mut()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut ViewportController> {
        self.current.as_mut().map(|m| &mut m.viewport)
    }

    /// Whether the most recent load has not completed yet.
    pub fn is_loading(&self) -> bool {
        self.settled < self.issued
    }

    /// Number of loads, stale ones included, whose results have not arrived yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Whether at least one graph was mounted.
    pub fn has_loaded(&self) -> bool {
        self.has_loaded
    }

    pub fn latest_seq(&self) -> u64 {
        self.issued
    }

    /// Sets the size of the display surface, forwarding it to the mounted viewport.
    pub fn set_surface(&mut self, surface: Vec2) {
        if surface == self.surface {
            return;
        }
        self.surface = surface;
        if let Some(viewport) = self.viewport_mut() {
            if let Err(err) = viewport.resize(surface) {
                error!("resizing viewport: {err}");
            }
        }
    }

    pub fn surface(&self) -> Vec2 {
        self.surface
    }
}

/// Fetch and layout of one file, without touching any display state.
///
/// # Errors
///
/// Fetch failures, [`ViewerError::EmptyGraph`] for blank descriptions and layout
/// failures.
pub fn run_pipeline(
    backend: &dyn Backend,
    layout: &dyn LayoutEngine,
    file_id: &str,
) -> Result<Geometry, ViewerError> {
    let description = backend.graph_description(file_id)?;
    if description.trim().is_empty() {
        return Err(ViewerError::EmptyGraph {
            file_id: file_id.to_string(),
        });
    }
    layout.layout(&description)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use crossbeam::channel::bounded;

    use super::*;
    use crate::layout::DotLayout;

    const WAIT: Duration = Duration::from_secs(5);

    /// Backend answering from a map; ids with a gate block until the gate is opened.
    #[derive(Default)]
    struct FakeBackend {
        graphs: HashMap<String, String>,
        gates: Mutex<HashMap<String, Receiver<()>>>,
    }

    impl FakeBackend {
        fn with(mut self, id: &str, dot: &str) -> Self {
            self.graphs.insert(id.to_string(), dot.to_string());
            self
        }

        fn gate(&self, id: &str) -> Sender<()> {
            let (tx, rx) = bounded(1);
            self.gates.lock().unwrap().insert(id.to_string(), rx);
            tx
        }
    }

    impl Backend for FakeBackend {
        fn list_files(&self) -> Result<Vec<String>, ViewerError> {
            let mut ids: Vec<_> = self.graphs.keys().cloned().collect();
            ids.sort();
            Ok(ids)
        }

        fn graph_description(&self, file_id: &str) -> Result<String, ViewerError> {
            let gate = self.gates.lock().unwrap().remove(file_id);
            if let Some(gate) = gate {
                gate.recv().unwrap();
            }
            self.graphs
                .get(file_id)
                .cloned()
                .ok_or_else(|| ViewerError::fetch(file_id, "not found"))
        }
    }

    fn renderer(backend: FakeBackend) -> GraphRenderer {
        GraphRenderer::new(
            Arc::new(backend),
            Arc::new(DotLayout::default()),
            SettingsNavigation::default(),
        )
    }

    fn mounted_id(r: &GraphRenderer) -> Option<&str> {
        r.current().map(|m| m.file_id.as_str())
    }

    #[test]
    fn test_load_mounts_and_fits() {
        let mut r = renderer(FakeBackend::default().with("a", "digraph { x -> y }"));
        assert!(!r.has_loaded());

        let seq = r.load("a");
        assert!(r.is_loading());
        let outcomes = r.wait_idle(WAIT);

        assert_eq!(
            outcomes,
            vec![LoadOutcome::Mounted {
                seq,
                file_id: "a".to_string()
            }]
        );
        assert!(!r.is_loading());
        assert!(r.has_loaded());
        let mounted = r.current().unwrap();
        assert_eq!(mounted.geometry.nodes.len(), 2);
        assert_eq!(mounted.viewport.state().unwrap().zoom, 1.);
    }

    #[test]
    fn test_stale_load_never_replaces_newer_one() {
        let backend = FakeBackend::default()
            .with("a", "digraph { a1 -> a2 }")
            .with("b", "digraph { b1 }");
        let open_a = backend.gate("a");
        let mut r = renderer(backend);

        let first = r.load("a");
        let second = r.load("b");
        assert!(second > first);

        // b completes while a is still blocked
        let deadline = Instant::now() + WAIT;
        while mounted_id(&r).is_none() && Instant::now() < deadline {
            r.poll();
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(mounted_id(&r), Some("b"));

        open_a.send(()).unwrap();
        let outcomes = r.wait_idle(WAIT);
        assert!(outcomes.is_empty());
        assert_eq!(mounted_id(&r), Some("b"));
        assert_eq!(r.in_flight(), 0);
    }

    #[test]
    fn test_stale_failure_is_discarded() {
        let backend = FakeBackend::default().with("b", "digraph { b1 }");
        let open_missing = backend.gate("missing");
        let mut r = renderer(backend);

        r.load("missing");
        r.load("b");
        open_missing.send(()).unwrap();
        let outcomes = r.wait_idle(WAIT);

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(&outcomes[0], LoadOutcome::Mounted { file_id, .. } if file_id == "b"));
    }

    #[test]
    fn test_failures_keep_previous_graph() {
        let mut r = renderer(
            FakeBackend::default()
                .with("a", "digraph { x -> y }")
                .with("blank", "  \n\t ")
                .with("broken", "digraph { x -> "),
        );
        r.load("a");
        r.wait_idle(WAIT);

        r.load("blank");
        let outcomes = r.wait_idle(WAIT);
        assert!(matches!(
            &outcomes[0],
            LoadOutcome::Failed { error: ViewerError::EmptyGraph { .. }, .. }
        ));
        assert_eq!(mounted_id(&r), Some("a"));

        r.load("broken");
        let outcomes = r.wait_idle(WAIT);
        assert!(matches!(
            &outcomes[0],
            LoadOutcome::Failed { error: ViewerError::Layout(_), .. }
        ));

        r.load("nope");
        let outcomes = r.wait_idle(WAIT);
        assert!(matches!(
            &outcomes[0],
            LoadOutcome::Failed { error: ViewerError::Fetch { .. }, .. }
        ));
        assert_eq!(mounted_id(&r), Some("a"));
        assert!(r.current().unwrap().viewport.state().is_ok());
    }

    #[test]
    fn test_remount_gets_fresh_viewport() {
        let mut r = renderer(
            FakeBackend::default()
                .with("a", "digraph { x -> y }")
                .with("b", "digraph { p -> q -> r }"),
        );
        r.load("a");
        r.wait_idle(WAIT);
        r.viewport_mut().unwrap().zoom(3., None).unwrap();

        r.load("b");
        r.wait_idle(WAIT);
        assert_eq!(mounted_id(&r), Some("b"));
        assert_eq!(r.current().unwrap().viewport.state().unwrap().zoom, 1.);
    }

    #[test]
    fn test_set_surface_resizes_viewport() {
        let mut r = renderer(FakeBackend::default().with("a", "digraph { x }"));
        r.load("a");
        r.wait_idle(WAIT);
        r.set_surface(Vec2::new(320., 200.));
        assert_eq!(r.current().unwrap().viewport.surface(), Vec2::new(320., 200.));
    }
}
