//! Document load state and attached stylesheets

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Where the document is in its load sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// A stylesheet attached to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    /// Resource locator, `None` for inline `<style>` blocks
    pub href: Option<String>,
}

impl StyleSheet {
    pub fn linked(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
        }
    }

    pub fn inline() -> Self {
        Self { href: None }
    }

    /// Whether the sheet was injected as an embedded `data:` resource
    pub fn is_embedded(&self) -> bool {
        self.href
            .as_deref()
            .and_then(|href| href.get(..5))
            .map(|scheme| scheme.eq_ignore_ascii_case("data:"))
            .unwrap_or(false)
    }
}

struct DocumentInner {
    ready: watch::Sender<ReadyState>,
    stylesheets: RwLock<Vec<StyleSheet>>,
    body_loaded: AtomicBool,
}

/// Handle to a page's document; clones refer to the same document
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    fn with_state(state: ReadyState) -> Self {
        let (ready, _) = watch::channel(state);
        Self {
            inner: Arc::new(DocumentInner {
                ready,
                stylesheets: RwLock::new(Vec::new()),
                body_loaded: AtomicBool::new(state == ReadyState::Complete),
            }),
        }
    }

    /// A document still in its load sequence
    pub fn loading() -> Self {
        Self::with_state(ReadyState::Loading)
    }

    /// A document that has already finished loading
    pub fn loaded() -> Self {
        Self::with_state(ReadyState::Complete)
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.inner.ready.borrow()
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        if state == ReadyState::Complete {
            self.inner.body_loaded.store(true, Ordering::Release);
        }
        self.inner.ready.send_replace(state);
        debug!("Document ready state is now {:?}", state);
    }

    /// Finish the load sequence, firing the load event
    pub fn complete_load(&self) {
        self.set_ready_state(ReadyState::Complete);
    }

    /// Whether the body carries the `loaded` attribute set by the load event
    pub fn body_loaded(&self) -> bool {
        self.inner.body_loaded.load(Ordering::Acquire)
    }

    /// Suspend until the load event has fired
    pub async fn wait_for_load(&self) {
        let mut rx = self.inner.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|state| *state == ReadyState::Complete).await;
    }

    pub fn add_stylesheet(&self, sheet: StyleSheet) {
        self.inner.stylesheets.write().push(sheet);
    }

    pub fn stylesheets(&self) -> Vec<StyleSheet> {
        self.inner.stylesheets.read().clone()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("ready_state", &self.ready_state())
            .field("stylesheets", &self.inner.stylesheets.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_embedded_detection() {
        assert!(StyleSheet::linked("data:text/css;base64,Ym9keXt9").is_embedded());
        assert!(StyleSheet::linked("DATA:text/css,body{}").is_embedded());
        assert!(!StyleSheet::linked("https://cdn.example.com/site.css").is_embedded());
        assert!(!StyleSheet::linked("dat").is_embedded());
        assert!(!StyleSheet::inline().is_embedded());
    }

    #[test]
    fn test_load_sets_body_attribute() {
        let doc = Document::loading();
        assert_eq!(doc.ready_state(), ReadyState::Loading);
        assert!(!doc.body_loaded());

        doc.set_ready_state(ReadyState::Interactive);
        assert!(!doc.body_loaded());

        doc.complete_load();
        assert_eq!(doc.ready_state(), ReadyState::Complete);
        assert!(doc.body_loaded());
    }

    #[tokio::test]
    async fn test_wait_for_load_returns_when_complete() {
        let doc = Document::loaded();
        tokio::time::timeout(Duration::from_millis(100), doc.wait_for_load())
            .await
            .expect("already loaded document should not block");
    }

    #[tokio::test]
    async fn test_wait_for_load_suspends_until_load() {
        let doc = Document::loading();
        let waiter = {
            let doc = doc.clone();
            tokio::spawn(async move { doc.wait_for_load().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        doc.complete_load();
        tokio::time::timeout(Duration::from_millis(500), waiter)
            .await
            .expect("waiter should wake on load")
            .unwrap();
    }

    #[test]
    fn test_clones_share_stylesheets() {
        let doc = Document::loaded();
        let other = doc.clone();
        other.add_stylesheet(StyleSheet::linked("data:text/css,"));
        assert_eq!(doc.stylesheets().len(), 1);
    }
}
