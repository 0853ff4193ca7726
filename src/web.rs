//! Browser front end. The page is a thin shell: it posts UI events to the
//! server and applies the snapshots streamed back over server-sent events.

use crate::config::{Labels, ViewerConfig};
use crate::error::{ClipboardError, FetchError};
use crate::index::IndexView;
use crate::menu::{FocusTarget, MenuEvent};
use crate::render::Content;
use crate::source::{ReqwestTransport, TextSource, Transport};
use crate::telemetry::{Telemetry, TelemetrySnapshot};
use crate::viewer::{LoadOutcome, NoClipboard, Surface, Viewer};
use askama::Template;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures_util::Stream;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, info, warn};

type SharedState = Arc<AppState>;

pub struct AppState {
    pub viewer: Viewer,
    pub publisher: Arc<watch::Sender<Snapshot>>,
    /// Highest input sequence number accepted so far.
    last_input: Mutex<u64>,
}

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub viewer: ViewerConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            viewer: ViewerConfig::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http client error: {0}")]
    Client(#[from] FetchError),
}

/// A one-shot instruction for the page, applied once per `seq`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signal<T> {
    pub seq: u64,
    pub value: T,
}

/// Everything the page needs to draw itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub content_seq: u64,
    pub content_html: String,
    pub subtitle: String,
    pub menu_open: bool,
    pub acknowledged: BTreeSet<usize>,
    pub focus: Option<Signal<FocusTarget>>,
}

/// [`Surface`] that publishes into the snapshot channel.
pub struct HtmlSurface {
    publisher: Arc<watch::Sender<Snapshot>>,
}

impl HtmlSurface {
    pub fn new(publisher: Arc<watch::Sender<Snapshot>>) -> Self {
        Self { publisher }
    }
}

impl Surface for HtmlSurface {
    fn show_content(&self, content: &Content) {
        let html = content.to_html().unwrap_or_else(|err| {
            warn!(error = %err, "failed to render content");
            render_error_fragment(&err.to_string())
        });
        self.publisher.send_modify(|snapshot| {
            snapshot.content_seq += 1;
            snapshot.content_html = html;
            snapshot.acknowledged.clear();
        });
    }

    fn set_subtitle(&self, text: &str) {
        self.publisher
            .send_modify(|snapshot| snapshot.subtitle = text.to_string());
    }

    fn set_menu_open(&self, open: bool) {
        self.publisher
            .send_modify(|snapshot| snapshot.menu_open = open);
    }

    fn focus(&self, target: FocusTarget) {
        self.publisher.send_modify(|snapshot| {
            let seq = snapshot.focus.as_ref().map_or(1, |signal| signal.seq + 1);
            snapshot.focus = Some(Signal { seq, value: target });
        });
    }

    fn set_card_acknowledged(&self, index: usize, acknowledged: bool) {
        self.publisher.send_modify(|snapshot| {
            if acknowledged {
                snapshot.acknowledged.insert(index);
            } else {
                snapshot.acknowledged.remove(&index);
            }
        });
    }
}

impl AppState {
    pub fn new(config: ViewerConfig, transport: Arc<dyn Transport>, telemetry: Telemetry) -> Self {
        let (publisher, _) = watch::channel(Snapshot::default());
        let publisher = Arc::new(publisher);
        let source = TextSource::from_config(&config, transport).with_telemetry(telemetry.clone());
        let viewer = Viewer::new(
            config,
            source,
            Arc::new(HtmlSurface::new(publisher.clone())),
            // The page writes its own clipboard and reports the outcome.
            Arc::new(NoClipboard),
            telemetry,
        );
        Self {
            viewer,
            publisher,
            last_input: Mutex::new(0),
        }
    }

    /// Accepts an input event unless a later one was already seen. Requests
    /// can arrive out of order, so the page numbers them.
    fn accept_input(&self, seq: u64, value: String) -> bool {
        let mut last = self.last_input.lock();
        if seq <= *last {
            return false;
        }
        *last = seq;
        self.viewer.input(value);
        true
    }
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let transport = ReqwestTransport::new(config.viewer.request_timeout())?;
    let state = Arc::new(AppState::new(
        config.viewer.clone(),
        Arc::new(transport),
        Telemetry::new(),
    ));
    let viewer = state.viewer.clone();
    tokio::spawn(async move {
        viewer.load().await;
    });

    let router = build_router(state);
    info!(
        %config.addr,
        source = %config.viewer.source_url,
        policy = %config.viewer.policy,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/events", get(events).post(dispatch))
        .route("/api/view", get(api_view))
        .route("/api/entries", get(api_entries))
        .route("/api/stats", get(api_stats))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn home(State(state): State<SharedState>) -> impl IntoResponse {
    let config = state.viewer.config();
    let template = PageTemplate {
        labels: &config.labels,
        notes: &config.notes,
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_fragment(&err.to_string())),
    )
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "namegrid-web",
        "entries": state.viewer.entry_count(),
        "fetching": state.viewer.is_fetching(),
    }))
}

async fn events(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut updates = state.publisher.subscribe();
    let stream = async_stream::stream! {
        loop {
            let snapshot = updates.borrow_and_update().clone();
            yield Event::default().event("snapshot").json_data(&snapshot);
            if updates.changed().await.is_err() {
                break;
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Events posted by the page script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum UiEvent {
    Input { seq: u64, value: String },
    Retry,
    Menu { event: MenuEvent },
    /// The page has already tried the clipboard write; `copied` is the result.
    CardClick { index: usize, copied: bool },
}

async fn dispatch(
    State(state): State<SharedState>,
    Json(event): Json<UiEvent>,
) -> Result<Response, ApiError> {
    let viewer = &state.viewer;
    let response = match event {
        UiEvent::Input { seq, value } => {
            let accepted = state.accept_input(seq, value);
            if !accepted {
                debug!(seq, "dropping out-of-order input");
            }
            (StatusCode::ACCEPTED, Json(json!({ "accepted": accepted }))).into_response()
        }
        UiEvent::Retry => {
            let viewer = viewer.clone();
            tokio::spawn(async move {
                if viewer.retry().await == LoadOutcome::Skipped {
                    info!("retry ignored while a fetch is pending");
                }
            });
            (StatusCode::ACCEPTED, Json(json!({ "accepted": true }))).into_response()
        }
        UiEvent::Menu { event } => {
            let transition = viewer.menu(event);
            Json(json!({ "open": transition.state.is_open() })).into_response()
        }
        UiEvent::CardClick { index, copied } => {
            if index >= viewer.card_count() {
                return Err(ApiError::not_found(format!("no card at index {index}")));
            }
            let result = if copied {
                Ok(())
            } else {
                Err(ClipboardError("page clipboard write failed".to_string()))
            };
            let copied = viewer.report_copy(index, result);
            Json(json!({ "copied": copied })).into_response()
        }
    };
    Ok(response)
}

async fn api_view(State(state): State<SharedState>) -> Json<Snapshot> {
    Json(state.publisher.borrow().clone())
}

#[derive(Debug, Deserialize)]
struct EntriesParams {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct EntriesPayload {
    query: String,
    #[serde(flatten)]
    view: IndexView,
}

async fn api_entries(
    State(state): State<SharedState>,
    Query(params): Query<EntriesParams>,
) -> Json<EntriesPayload> {
    let query = params.q.unwrap_or_default();
    let view = state.viewer.query(&query);
    Json(EntriesPayload { query, view })
}

async fn api_stats(State(state): State<SharedState>) -> Json<TelemetrySnapshot> {
    Json(state.viewer.telemetry().snapshot())
}

fn render_error_fragment(message: &str) -> String {
    let escaped = message
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(r#"<div class="error-container"><p class="error-message">{escaped}</p></div>"#)
}

#[derive(Template)]
#[template(
    source = r##"<!DOCTYPE html>
<html lang="pt-BR">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <meta name="generator" content="namegrid-rs {{ version }}" />
    <title>{{ labels.page_title }}</title>
    <style>
      body { font-family: system-ui, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
      header { display: flex; gap: 0.75rem; align-items: center; padding: 1rem 1.5rem; background: #fff; box-shadow: 0 1px 2px rgba(0,0,0,.08); }
      header input { flex: 1; padding: 0.5rem 0.75rem; border: 1px solid #cbd5e1; border-radius: 0.5rem; font-size: 1rem; }
      .notes { position: relative; }
      .notes ul { position: absolute; right: 0; margin: 0.25rem 0 0; padding: 0.25rem 0; list-style: none; background: #fff; border: 1px solid #e2e8f0; border-radius: 0.5rem; min-width: 14rem; }
      .notes li { padding: 0.5rem 0.75rem; cursor: pointer; }
      main { padding: 1rem 1.5rem; }
      .letter-heading { border-bottom: 2px solid #e2e8f0; }
      .names-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(10rem, 1fr)); gap: 0.5rem; }
      .name-card { background: #fff; border: 1px solid #e2e8f0; border-radius: 0.5rem; padding: 0 0.75rem; cursor: pointer; transition: background .2s; }
      .name-card.copied { background: #dcfce7; border-color: #22c55e; }
      .spinner { width: 2rem; height: 2rem; margin: 2rem auto; border: 3px solid #e2e8f0; border-top-color: #0f172a; border-radius: 50%; animation: spin 1s linear infinite; }
      .error-icon, .retry-button svg { width: 1.5rem; height: 1.5rem; }
      @keyframes spin { to { transform: rotate(360deg); } }
    </style>
  </head>
  <body>
    <header>
      <input id="search" type="search" autocomplete="off" placeholder="{{ labels.search_placeholder }}" />
      {% if !notes.is_empty() %}
      <div class="notes">
        <button id="notes-trigger" type="button" aria-haspopup="true" aria-expanded="false">{{ labels.notes_button }}</button>
        <ul id="notes-menu" role="menu" hidden>
          {% for note in notes %}
          <li role="menuitem" tabindex="-1">{{ note }}</li>
          {% endfor %}
        </ul>
      </div>
      {% endif %}
    </header>
    <main>
      <h2 id="subtitle">{{ labels.subtitle_all }}</h2>
      <div id="content"><div class="loading"><div class="spinner"></div></div></div>
    </main>
    <script>
      const search = document.getElementById("search");
      const trigger = document.getElementById("notes-trigger");
      const menu = document.getElementById("notes-menu");
      const content = document.getElementById("content");
      const subtitle = document.getElementById("subtitle");
      const seen = { content: 0, focus: 0 };
      let menuOpen = false;
      let inputSeq = Date.now() * 1000;

      const post = (body) => fetch("/events", {
        method: "POST",
        headers: { "content-type": "application/json" },
        body: JSON.stringify(body),
      });
      const menuEvent = (event) => post({ type: "menu", event: event });

      const copyCard = async (card) => {
        const text = card.querySelector("p").textContent;
        let copied = false;
        try {
          if (navigator.clipboard) {
            await navigator.clipboard.writeText(text);
            copied = true;
          }
        } catch (_) {}
        post({ type: "card_click", index: Number(card.dataset.card), copied: copied });
      };

      search.addEventListener("input", (e) => {
        inputSeq += 1;
        post({ type: "input", seq: inputSeq, value: e.target.value });
      });
      content.addEventListener("click", (e) => {
        const card = e.target.closest("[data-card]");
        if (card) copyCard(card);
        if (e.target.closest("[data-action=retry]")) post({ type: "retry" });
      });
      content.addEventListener("keydown", (e) => {
        const card = e.target.closest("[data-card]");
        if (card && (e.key === "Enter" || e.key === " ")) {
          e.preventDefault();
          copyCard(card);
        }
      });
      if (trigger && menu) {
        trigger.addEventListener("click", (e) => {
          e.stopPropagation();
          menuEvent({ event: "trigger_click" });
        });
        trigger.addEventListener("keydown", (e) => {
          if (e.key === "Enter" || e.key === " ") {
            e.preventDefault();
            menuEvent({ event: "trigger_key", key: e.key === "Enter" ? "enter" : "space" });
          }
        });
        menu.addEventListener("click", (e) => {
          e.stopPropagation();
          if (e.target.closest("[role=menuitem]")) menuEvent({ event: "item_activated" });
        });
        document.addEventListener("click", () => {
          if (menuOpen) menuEvent({ event: "outside_click" });
        });
        document.addEventListener("keydown", (e) => {
          if (e.key === "Escape" && menuOpen) menuEvent({ event: "escape" });
        });
      }

      const apply = (snap) => {
        if (snap.content_seq !== seen.content) {
          seen.content = snap.content_seq;
          content.innerHTML = snap.content_html;
        }
        subtitle.textContent = snap.subtitle || subtitle.textContent;
        content.querySelectorAll("[data-card]").forEach((card) => {
          card.classList.toggle("copied", snap.acknowledged.includes(Number(card.dataset.card)));
        });
        if (!trigger || !menu) return;
        menuOpen = snap.menu_open;
        menu.hidden = !menuOpen;
        trigger.setAttribute("aria-expanded", String(menuOpen));
        if (snap.focus && snap.focus.seq > seen.focus) {
          seen.focus = snap.focus.seq;
          const target = snap.focus.value === "menu_first_item"
            ? menu.querySelector("[role=menuitem]")
            : trigger;
          if (target) target.focus();
        }
      };
      new EventSource("/events").addEventListener("snapshot", (e) => apply(JSON.parse(e.data)));
    </script>
  </body>
</html>"##,
    ext = "html"
)]
struct PageTemplate<'a> {
    labels: &'a Labels,
    notes: &'a [String],
    version: &'static str,
}
