//! Capture-host detection
//!
//! The capture host (an OBS browser source) injects its own stylesheet as an
//! embedded `data:` resource. An ordinary browser tab never does, so the
//! presence of such a sheet marks the page as captured.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::document::{Document, ReadyState};

/// Default wait after the load event before inspecting stylesheets
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Decides whether a document is being rendered by the capture host
///
/// Detection never fails; the absence of a signal is `false`.
#[async_trait]
pub trait CaptureProbe: Send + Sync {
    async fn detect(&self, document: &Document) -> bool;
}

/// Looks for a host-injected `data:` stylesheet once the page has settled
#[derive(Debug, Clone)]
pub struct StylesheetProbe {
    settle_delay: Duration,
}

impl StylesheetProbe {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }
}

impl Default for StylesheetProbe {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

#[async_trait]
impl CaptureProbe for StylesheetProbe {
    async fn detect(&self, document: &Document) -> bool {
        if document.ready_state() != ReadyState::Complete {
            document.wait_for_load().await;
            // Late-injected sheets register shortly after the load event
            tokio::time::sleep(self.settle_delay).await;
        }

        let captured = has_injected_stylesheet(document);
        debug!("Capture host detected: {}", captured);
        captured
    }
}

/// Probe with a known answer, for hosts that already know where they run
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

#[async_trait]
impl CaptureProbe for FixedProbe {
    async fn detect(&self, _document: &Document) -> bool {
        self.0
    }
}

/// True if any attached stylesheet is an embedded `data:` resource
pub fn has_injected_stylesheet(document: &Document) -> bool {
    document.stylesheets().iter().any(|sheet| sheet.is_embedded())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::document::StyleSheet;

    #[tokio::test]
    async fn test_plain_tab_is_not_captured() {
        let doc = Document::loaded();
        doc.add_stylesheet(StyleSheet::linked("https://example.com/app.css"));
        doc.add_stylesheet(StyleSheet::inline());

        assert!(!StylesheetProbe::default().detect(&doc).await);
    }

    #[tokio::test]
    async fn test_injected_sheet_is_captured() {
        let doc = Document::loaded();
        doc.add_stylesheet(StyleSheet::linked("app.css"));
        doc.add_stylesheet(StyleSheet::linked("data:text/css;charset=utf-8,body%7Bbackground%3A0%7D"));

        assert!(StylesheetProbe::default().detect(&doc).await);
    }

    #[tokio::test]
    async fn test_empty_document_resolves_false() {
        assert!(!StylesheetProbe::default().detect(&Document::loaded()).await);
    }

    #[tokio::test]
    async fn test_waits_for_load_and_settle() {
        let doc = Document::loading();
        let probe = StylesheetProbe::new(Duration::from_millis(50));

        let detection = {
            let doc = doc.clone();
            tokio::spawn(async move { probe.detect(&doc).await })
        };

        // Let the probe start waiting before the load event fires
        tokio::time::sleep(Duration::from_millis(10)).await;
        doc.complete_load();
        // Injected after the load event but inside the settle window
        tokio::time::sleep(Duration::from_millis(5)).await;
        doc.add_stylesheet(StyleSheet::linked("data:text/css,"));

        assert!(detection.await.unwrap());
    }

    #[tokio::test]
    async fn test_fixed_probe() {
        let doc = Document::loading();
        assert!(FixedProbe(true).detect(&doc).await);
        assert!(!FixedProbe(false).detect(&doc).await);
    }
}
