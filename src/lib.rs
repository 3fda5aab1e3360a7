//! obs-overlay - dock and overlay elements sharing persisted state
//!
//! A dock (control panel) and an overlay (broadcast display) run in separate
//! browsing contexts. The dock commits state to a shared store and raises a
//! change signal; overlays re-read the store when signalled and re-render.

pub mod app;
pub mod config;
pub mod context;
pub mod elements;
pub mod scoreboard;
pub mod shared;
pub mod storage;

pub use app::{BrowsingContext, Origin};
pub use context::{ContextDetector, Role, Roles};
pub use elements::{Dock, DockBehavior, ElementError, Overlay, OverlayBehavior};
pub use shared::{ChangeSignal, SignalHub, State};
pub use storage::{MemoryStore, SqliteSignal, SqliteStore, StateStore};
