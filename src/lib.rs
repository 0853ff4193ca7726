//! Alphabetical directory of names loaded from a remote plain-text list.
//!
//! The pipeline is: [`TextSource`] fetches the list, [`parse_entries`] turns
//! it into [`Entry`] values, [`DirectoryIndex`] filters and groups them, and
//! [`render`] projects the groups into page [`Content`]. [`Viewer`] drives the
//! whole cycle and pushes results to a [`Surface`].

pub mod config;
pub mod debounce;
pub mod error;
pub mod index;
pub mod menu;
pub mod parser;
pub mod render;
pub mod source;
pub mod telemetry;
pub mod viewer;
#[cfg(feature = "web")]
pub mod web;

pub use config::{Labels, RetrievalPolicy, ViewerConfig};
pub use debounce::Debouncer;
pub use error::{ClipboardError, ConfigError, FetchError};
pub use index::{DirectoryIndex, IndexView, LetterGroup, filter, group_by_initial, locale_cmp};
pub use menu::{FocusTarget, MenuEvent, MenuState, MenuTransition, TriggerKey};
pub use parser::{Entry, parse_entries};
pub use render::{Card, Content, CopyBinding, Counter, Section, render, render_error, render_loading};
pub use source::{ReqwestTransport, RetrievalStrategy, TextSource, Transport};
pub use telemetry::{LoadKind, Telemetry, TelemetrySnapshot};
pub use viewer::{Clipboard, LoadOutcome, NoClipboard, Surface, Viewer};
