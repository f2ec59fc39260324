//! Split-pane terminal UI: sidebar of sessions on the left, the active
//! session's embedded terminal on the right, modal overlays centered on top.
//!
//! Architecture: a single-threaded reducer ([`model::Model::update`])
//! processes one message at a time from an inbox fed by input events,
//! command results, and terminal polling tasks. Side effects leave the
//! reducer as [`message::Command`] values and run as detached tasks. Every
//! frame is composed as a raw-ANSI string and painted through `ansi-to-tui`,
//! because the pane content arrives pre-rasterized from the multiplexer and
//! the dim/highlight/overlay transforms are all string-level.

mod input;
mod message;
mod model;
mod overlay;
mod runtime;
mod selection;
mod styles;
mod textfield;
mod view;

pub use runtime::{run, SessionService, Ui};
