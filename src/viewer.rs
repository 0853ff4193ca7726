//! The interaction controller: owns the view state and keeps the surface in
//! sync with it.

use crate::config::ViewerConfig;
use crate::debounce::Debouncer;
use crate::error::ClipboardError;
use crate::index::{DirectoryIndex, IndexView};
use crate::menu::{FocusTarget, MenuEvent, MenuState, MenuTransition};
use crate::parser::parse_entries;
use crate::render::{self, Content, CopyBinding};
use crate::source::TextSource;
use crate::telemetry::{LoadKind, Telemetry};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// Write side of the page. Calls arrive while the view state is locked, so
/// implementations must not call back into the [`Viewer`].
pub trait Surface: Send + Sync + 'static {
    fn show_content(&self, content: &Content);
    fn set_subtitle(&self, text: &str);
    fn set_menu_open(&self, open: bool);
    fn focus(&self, target: FocusTarget);
    fn set_card_acknowledged(&self, index: usize, acknowledged: bool);
}

#[async_trait]
pub trait Clipboard: Send + Sync + 'static {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard for hosts without one; every write fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

#[async_trait]
impl Clipboard for NoClipboard {
    async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError("no clipboard attached".to_string()))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LoadOutcome {
    Loaded(usize),
    Failed,
    /// Another fetch was still pending.
    Skipped,
}

#[derive(Debug, Default)]
struct ViewState {
    index: DirectoryIndex,
    search_term: String,
    menu: MenuState,
    bindings: Vec<CopyBinding>,
    render_generation: u64,
    acknowledgements: HashMap<usize, u64>,
    next_ack: u64,
}

impl ViewState {
    fn search_active(&self) -> bool {
        !self.search_term.is_empty()
    }

    fn replace_bindings(&mut self, content: &Content) {
        self.bindings = content.copy_bindings();
        self.render_generation = self.render_generation.wrapping_add(1);
        self.acknowledgements.clear();
    }
}

struct ViewerShared {
    config: ViewerConfig,
    source: TextSource,
    surface: Arc<dyn Surface>,
    clipboard: Arc<dyn Clipboard>,
    telemetry: Telemetry,
    state: Mutex<ViewState>,
    fetching: AtomicBool,
    debouncer: Debouncer,
}

/// Cheap handle to one viewer; clones drive the same state.
#[derive(Clone)]
pub struct Viewer {
    shared: Arc<ViewerShared>,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Viewer {
    pub fn new(
        config: ViewerConfig,
        source: TextSource,
        surface: Arc<dyn Surface>,
        clipboard: Arc<dyn Clipboard>,
        telemetry: Telemetry,
    ) -> Self {
        let debouncer = Debouncer::new(config.debounce_window());
        Self {
            shared: Arc::new(ViewerShared {
                config,
                source,
                surface,
                clipboard,
                telemetry,
                state: Mutex::new(ViewState::default()),
                fetching: AtomicBool::new(false),
                debouncer,
            }),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.shared.config
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.shared.telemetry
    }

    pub fn search_term(&self) -> String {
        self.shared.state.lock().search_term.clone()
    }

    pub fn menu_state(&self) -> MenuState {
        self.shared.state.lock().menu
    }

    pub fn entry_count(&self) -> usize {
        self.shared.state.lock().index.len()
    }

    /// Number of cards in the last rendered content.
    pub fn card_count(&self) -> usize {
        self.shared.state.lock().bindings.len()
    }

    pub fn is_fetching(&self) -> bool {
        self.shared.fetching.load(Ordering::SeqCst)
    }

    /// Read-only query against the loaded entries; does not touch the surface.
    pub fn query(&self, term: &str) -> IndexView {
        self.shared.state.lock().index.view(term)
    }

    /// Fetches, parses and displays the entry list.
    ///
    /// Only one fetch runs at a time; a call made while one is pending
    /// returns [`LoadOutcome::Skipped`] without touching the network.
    pub async fn load(&self) -> LoadOutcome {
        let shared = &self.shared;
        if shared.fetching.swap(true, Ordering::SeqCst) {
            debug!("fetch already in flight, ignoring request");
            shared.telemetry.record_load(LoadKind::Skipped, 0);
            return LoadOutcome::Skipped;
        }
        let _in_flight = InFlight(&shared.fetching);

        self.show(render::render_loading());
        match shared.source.resolve(&shared.config.source_url).await {
            Ok(text) => {
                let entries = parse_entries(&text);
                let count = entries.len();
                shared.state.lock().index.replace_all(entries);
                self.render_cycle();
                self.update_subtitle();
                info!(count, policy = %shared.source.policy(), "entry list loaded");
                shared.telemetry.record_load(LoadKind::Loaded, count);
                LoadOutcome::Loaded(count)
            }
            Err(err) => {
                warn!(error = %err, url = %shared.config.source_url, "failed to load entry list");
                let labels = &shared.config.labels;
                self.show(render::render_error(labels.load_error.clone(), labels));
                shared.telemetry.record_load(LoadKind::Failed, 0);
                LoadOutcome::Failed
            }
        }
    }

    /// User-triggered reload. Same as [`Viewer::load`], with no backoff.
    pub async fn retry(&self) -> LoadOutcome {
        self.load().await
    }

    /// Raw search input; committed once the debounce window passes quietly.
    pub fn input(&self, raw: impl Into<String>) {
        let term = raw.into();
        let weak: Weak<ViewerShared> = Arc::downgrade(&self.shared);
        self.shared.debouncer.schedule(move || {
            if let Some(shared) = weak.upgrade() {
                Viewer { shared }.commit_search(term);
            }
        });
    }

    /// Sets the search term, re-renders, then refreshes the subtitle.
    pub fn commit_search(&self, term: impl Into<String>) {
        let term = term.into();
        debug!(term = %term, "committing search term");
        self.shared.state.lock().search_term = term;
        self.render_cycle();
        self.update_subtitle();
        self.shared.telemetry.record_search_commit();
    }

    /// Renders the current filter over the loaded entries.
    pub fn render_cycle(&self) -> Content {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        let view = state.index.view(&state.search_term);
        let content = render::render(
            &view.groups,
            state.search_active(),
            view.total,
            &shared.config.labels,
        );
        state.replace_bindings(&content);
        shared.surface.show_content(&content);
        content
    }

    fn update_subtitle(&self) {
        let state = self.shared.state.lock();
        let text = render::subtitle(state.search_active(), &self.shared.config.labels);
        self.shared.surface.set_subtitle(text);
    }

    fn show(&self, content: Content) {
        let mut state = self.shared.state.lock();
        state.replace_bindings(&content);
        self.shared.surface.show_content(&content);
    }

    pub fn menu(&self, event: MenuEvent) -> MenuTransition {
        let mut state = self.shared.state.lock();
        let transition = state.menu.apply(event);
        if transition.state != state.menu {
            state.menu = transition.state;
            self.shared.surface.set_menu_open(transition.state.is_open());
        }
        if let Some(target) = transition.focus {
            self.shared.surface.focus(target);
        }
        transition
    }

    /// Copies a card's text and flashes the card. Returns whether the copy
    /// succeeded; failures are otherwise silent.
    pub async fn click_card(&self, index: usize) -> bool {
        let Some((text, generation)) = self.binding(index) else {
            return false;
        };
        let result = self.shared.clipboard.write_text(&text).await;
        self.finish_copy(index, generation, result)
    }

    /// Records a copy the host performed itself, such as a page writing to
    /// its own clipboard inside the click handler.
    pub fn report_copy(&self, index: usize, result: Result<(), ClipboardError>) -> bool {
        let Some((_, generation)) = self.binding(index) else {
            return false;
        };
        self.finish_copy(index, generation, result)
    }

    fn binding(&self, index: usize) -> Option<(String, u64)> {
        let state = self.shared.state.lock();
        state
            .bindings
            .iter()
            .find(|binding| binding.index == index)
            .map(|binding| (binding.text.clone(), state.render_generation))
    }

    fn finish_copy(
        &self,
        index: usize,
        generation: u64,
        result: Result<(), ClipboardError>,
    ) -> bool {
        if let Err(err) = result {
            trace!(error = %err, index, "clipboard write failed");
            self.shared.telemetry.record_copy(false);
            return false;
        }
        self.shared.telemetry.record_copy(true);

        let ticket = {
            let mut state = self.shared.state.lock();
            if state.render_generation != generation {
                return true;
            }
            state.next_ack = state.next_ack.wrapping_add(1);
            let ticket = state.next_ack;
            state.acknowledgements.insert(index, ticket);
            self.shared.surface.set_card_acknowledged(index, true);
            ticket
        };

        let weak = Arc::downgrade(&self.shared);
        let window = self.shared.config.acknowledge_window();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut state = shared.state.lock();
            if state.render_generation == generation
                && state.acknowledgements.get(&index) == Some(&ticket)
            {
                state.acknowledgements.remove(&index);
                shared.surface.set_card_acknowledged(index, false);
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::source::Transport;
    use crate::source::tests::FakeTransport;
    use std::time::Duration;
    use tokio::sync::Notify;

    const URL: &str = "https://example.org/names.txt";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Content(Content),
        Subtitle(String),
        Menu(bool),
        Focus(FocusTarget),
        Ack(usize, bool),
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingSurface {
        fn take(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.lock())
        }
    }

    impl Surface for RecordingSurface {
        fn show_content(&self, content: &Content) {
            self.calls.lock().push(Call::Content(content.clone()));
        }
        fn set_subtitle(&self, text: &str) {
            self.calls.lock().push(Call::Subtitle(text.to_string()));
        }
        fn set_menu_open(&self, open: bool) {
            self.calls.lock().push(Call::Menu(open));
        }
        fn focus(&self, target: FocusTarget) {
            self.calls.lock().push(Call::Focus(target));
        }
        fn set_card_acknowledged(&self, index: usize, acknowledged: bool) {
            self.calls.lock().push(Call::Ack(index, acknowledged));
        }
    }

    #[derive(Default)]
    struct FakeClipboard {
        broken: AtomicBool,
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Clipboard for FakeClipboard {
        async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(ClipboardError("denied".into()));
            }
            self.written.lock().push(text.to_string());
            Ok(())
        }
    }

    /// Transport that holds every request until released.
    struct GatedTransport {
        gate: Notify,
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn get_text(&self, _url: &str) -> Result<String, FetchError> {
            self.gate.notified().await;
            Ok("Ana\nBia".to_string())
        }
    }

    struct Harness {
        viewer: Viewer,
        surface: Arc<RecordingSurface>,
        clipboard: Arc<FakeClipboard>,
    }

    fn config() -> ViewerConfig {
        ViewerConfig {
            source_url: URL.to_string(),
            ..ViewerConfig::default()
        }
    }

    fn harness(transport: Arc<dyn Transport>) -> Harness {
        let surface = Arc::new(RecordingSurface::default());
        let clipboard = Arc::new(FakeClipboard::default());
        let source = TextSource::single_source(transport);
        let viewer = Viewer::new(
            config(),
            source,
            surface.clone(),
            clipboard.clone(),
            Telemetry::new(),
        );
        Harness {
            viewer,
            surface,
            clipboard,
        }
    }

    fn serving(body: &str) -> Arc<FakeTransport> {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(URL, Ok(body.to_string()));
        transport
    }

    fn card_texts(content: &Content) -> Vec<String> {
        content.cards().map(|card| card.text.clone()).collect()
    }

    fn last_content(calls: &[Call]) -> Content {
        calls
            .iter()
            .rev()
            .find_map(|call| match call {
                Call::Content(content) => Some(content.clone()),
                _ => None,
            })
            .expect("content was rendered")
    }

    #[tokio::test]
    async fn load_shows_loading_then_listing_then_subtitle() {
        let h = harness(serving("Bia\n  Ana \n\n"));
        assert_eq!(h.viewer.load().await, LoadOutcome::Loaded(2));

        let calls = h.surface.take();
        assert_eq!(calls[0], Call::Content(Content::Loading));
        let Call::Content(listing) = &calls[1] else {
            panic!("expected rendered listing, got {:?}", calls[1]);
        };
        assert_eq!(card_texts(listing), vec!["Ana", "Bia"]);
        assert_eq!(
            calls[2],
            Call::Subtitle("Lista completa de nomes".to_string())
        );
        assert_eq!(calls.len(), 3);
        assert_eq!(h.viewer.entry_count(), 2);
    }

    #[tokio::test]
    async fn failure_shows_generic_error_and_retry_refetches() {
        let transport = Arc::new(FakeTransport::default());
        transport.respond(URL, Err(FetchError::Http(500)));
        let h = harness(transport.clone());

        assert_eq!(h.viewer.load().await, LoadOutcome::Failed);
        match last_content(&h.surface.take()) {
            Content::Error(view) => {
                assert_eq!(view.message, h.viewer.config().labels.load_error);
                assert_eq!(view.retry_label, "Tentar novamente");
            }
            other => panic!("expected error view, got {other:?}"),
        }

        transport.respond(URL, Ok("Caio".to_string()));
        assert_eq!(h.viewer.retry().await, LoadOutcome::Loaded(1));
        assert_eq!(transport.requested().len(), 2);
        assert_eq!(card_texts(&last_content(&h.surface.take())), vec!["Caio"]);
    }

    #[tokio::test]
    async fn retry_during_a_pending_fetch_is_skipped() {
        let transport = Arc::new(GatedTransport {
            gate: Notify::new(),
        });
        let h = harness(transport.clone());

        let first = tokio::spawn({
            let viewer = h.viewer.clone();
            async move { viewer.load().await }
        });
        while !h.viewer.is_fetching() {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.viewer.retry().await, LoadOutcome::Skipped);

        transport.gate.notify_one();
        assert_eq!(first.await.unwrap(), LoadOutcome::Loaded(2));
        assert!(!h.viewer.is_fetching());
        assert_eq!(h.viewer.telemetry().snapshot().skipped_loads, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn input_burst_commits_once_with_the_last_value() {
        let h = harness(serving("Ana\nBruno\nMariana"));
        h.viewer.load().await;
        h.surface.take();

        h.viewer.input("b");
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.viewer.input("br");
        tokio::time::sleep(Duration::from_millis(50)).await;
        h.viewer.input("an");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.surface.take().is_empty());
        assert_eq!(h.viewer.search_term(), "");

        tokio::time::sleep(Duration::from_millis(250)).await;
        let calls = h.surface.take();
        assert_eq!(calls.len(), 2);
        assert_eq!(card_texts(&last_content(&calls)), vec!["Ana", "Mariana"]);
        assert_eq!(calls[1], Call::Subtitle("Resultados da busca".to_string()));
        assert_eq!(h.viewer.search_term(), "an");
        assert_eq!(h.viewer.telemetry().snapshot().search_commits, 1);
    }

    #[tokio::test]
    async fn search_without_matches_renders_the_empty_state() {
        let h = harness(serving("Ana"));
        h.viewer.load().await;
        h.viewer.commit_search("zz");
        assert!(matches!(
            last_content(&h.surface.take()),
            Content::Empty(_)
        ));
        h.viewer.commit_search("");
        let calls = h.surface.take();
        assert_eq!(card_texts(&last_content(&calls)), vec!["Ana"]);
        assert_eq!(
            calls.last(),
            Some(&Call::Subtitle("Lista completa de nomes".to_string()))
        );
    }

    #[tokio::test]
    async fn menu_moves_focus_and_ignores_redundant_escape() {
        let h = harness(serving("Ana"));
        h.viewer.menu(MenuEvent::TriggerClick);
        assert_eq!(
            h.surface.take(),
            vec![Call::Menu(true), Call::Focus(FocusTarget::MenuFirstItem)]
        );
        h.viewer.menu(MenuEvent::Escape);
        assert_eq!(
            h.surface.take(),
            vec![Call::Menu(false), Call::Focus(FocusTarget::MenuTrigger)]
        );
        let t = h.viewer.menu(MenuEvent::Escape);
        assert_eq!(t.state, MenuState::Closed);
        assert!(h.surface.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn card_click_copies_and_acknowledgement_reverts() {
        let h = harness(serving("Bia\nAna"));
        h.viewer.load().await;
        h.surface.take();

        assert!(h.viewer.click_card(1).await);
        assert_eq!(*h.clipboard.written.lock(), vec!["Bia".to_string()]);
        assert_eq!(h.surface.take(), vec![Call::Ack(1, true)]);

        tokio::time::sleep(Duration::from_millis(799)).await;
        assert!(h.surface.take().is_empty());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(h.surface.take(), vec![Call::Ack(1, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn clipboard_failure_is_swallowed() {
        let h = harness(serving("Ana"));
        h.viewer.load().await;
        h.surface.take();
        h.clipboard.broken.store(true, Ordering::SeqCst);

        assert!(!h.viewer.click_card(0).await);
        assert!(!h.viewer.click_card(42).await);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(h.surface.take().is_empty());
        assert_eq!(h.viewer.telemetry().snapshot().copy_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reported_copy_failure_leaves_the_card_alone() {
        let h = harness(serving("Ana"));
        h.viewer.load().await;
        h.surface.take();

        let refused = Err(ClipboardError("NotAllowedError".into()));
        assert!(!h.viewer.report_copy(0, refused));
        assert!(h.surface.take().is_empty());

        assert!(h.viewer.report_copy(0, Ok(())));
        assert_eq!(h.surface.take(), vec![Call::Ack(0, true)]);
        assert!(h.clipboard.written.lock().is_empty());
        let stats = h.viewer.telemetry().snapshot();
        assert_eq!((stats.copies, stats.copy_failures), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn rerender_drops_pending_acknowledgement() {
        let h = harness(serving("Ana"));
        h.viewer.load().await;
        assert!(h.viewer.click_card(0).await);
        h.viewer.commit_search("a");
        h.surface.take();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(h.surface.take().is_empty());
    }
}
