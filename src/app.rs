//! Origin and Browsing Contexts
//!
//! An origin owns the store and the signal shared by every page opened under
//! it. Each opened page is a browsing context with its own location and
//! document; docks and overlays attach to a context.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::context::{Document, Location};
use crate::shared::{ChangeSignal, ContextId, SignalHub};
use crate::storage::{MemoryStore, SqliteSignal, SqliteStore, StateStore};

/// Shared medium for all contexts of one origin
#[derive(Clone)]
pub struct Origin {
    store: Arc<dyn StateStore>,
    signal: Arc<dyn ChangeSignal>,
}

impl Origin {
    pub fn new(store: Arc<dyn StateStore>, signal: Arc<dyn ChangeSignal>) -> Self {
        Self { store, signal }
    }

    /// Origin backed by process memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SignalHub::new()))
    }

    /// Origin whose state and change log live in the SQLite database at `path`
    ///
    /// Origins opened on the same file, in this process or another, signal
    /// each other's commits.
    pub fn with_database(path: &Path) -> Result<Self> {
        let store = SqliteStore::open(path)?;
        let signal = SqliteSignal::open(path)?;
        Ok(Self::new(Arc::new(store), Arc::new(signal)))
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn signal(&self) -> &Arc<dyn ChangeSignal> {
        &self.signal
    }

    /// Open a new browsing context at `url`
    pub fn open(&self, url: &str, document: Document) -> Result<BrowsingContext> {
        let location = Location::parse(url)?;
        let ctx = BrowsingContext {
            id: ContextId::new(),
            location,
            document,
            store: self.store.clone(),
            signal: self.signal.clone(),
        };
        info!("Opened context {} at {}", ctx.id, ctx.location);
        Ok(ctx)
    }
}

/// One page: a dock page or an overlay page
#[derive(Clone)]
pub struct BrowsingContext {
    id: ContextId,
    location: Location,
    document: Document,
    store: Arc<dyn StateStore>,
    signal: Arc<dyn ChangeSignal>,
}

impl BrowsingContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    pub fn signal(&self) -> &dyn ChangeSignal {
        self.signal.as_ref()
    }
}

impl std::fmt::Debug for BrowsingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowsingContext")
            .field("id", &self.id)
            .field("location", &self.location.href())
            .field("document", &self.document)
            .finish()
    }
}
