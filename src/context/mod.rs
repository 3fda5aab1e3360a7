//! Context Detection
//!
//! Works out which role a browsing context plays. A page captured by the host
//! is an overlay; a page open in an ordinary tab is a dock. The location
//! fragment can force either role (or both) for local development.

pub mod document;
pub mod location;
pub mod probe;

use std::sync::Arc;
use tracing::debug;

use crate::app::BrowsingContext;
use crate::config::DetectionConfig;

pub use document::{Document, ReadyState, StyleSheet};
pub use location::{Location, NamespaceKey};
pub use probe::{CaptureProbe, FixedProbe, StylesheetProbe};

/// Role an element takes for its whole attached lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Dock,
    Overlay,
    Inactive,
}

/// Fragment literals that force a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugOverrides {
    pub dock: Vec<String>,
    pub overlay: Vec<String>,
}

impl Default for DebugOverrides {
    fn default() -> Self {
        Self {
            dock: vec!["dock".to_string(), "debug".to_string()],
            overlay: vec!["overlay".to_string(), "debug".to_string()],
        }
    }
}

impl DebugOverrides {
    fn forces_dock(&self, fragment: &str) -> bool {
        !fragment.is_empty() && self.dock.iter().any(|f| f == fragment)
    }

    fn forces_overlay(&self, fragment: &str) -> bool {
        !fragment.is_empty() && self.overlay.iter().any(|f| f == fragment)
    }
}

/// Both derived roles of a context
///
/// Without overrides exactly one is true; under `debug` both are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    dock: bool,
    overlay: bool,
}

impl Roles {
    /// Combine a capture verdict with the location fragment
    pub fn derive(captured: bool, fragment: &str, overrides: &DebugOverrides) -> Self {
        Self {
            dock: !captured || overrides.forces_dock(fragment),
            overlay: captured || overrides.forces_overlay(fragment),
        }
    }

    pub fn is_dock(&self) -> bool {
        self.dock
    }

    pub fn is_overlay(&self) -> bool {
        self.overlay
    }

    /// Role of a dock element in this context
    pub fn dock_role(&self) -> Role {
        if self.dock {
            Role::Dock
        } else {
            Role::Inactive
        }
    }

    /// Role of an overlay element in this context
    pub fn overlay_role(&self) -> Role {
        if self.overlay {
            Role::Overlay
        } else {
            Role::Inactive
        }
    }
}

/// Resolves roles for browsing contexts
#[derive(Clone)]
pub struct ContextDetector {
    probe: Arc<dyn CaptureProbe>,
    overrides: DebugOverrides,
}

impl ContextDetector {
    pub fn new(probe: Arc<dyn CaptureProbe>, overrides: DebugOverrides) -> Self {
        Self { probe, overrides }
    }

    /// Detector using the stylesheet probe with configured delay and overrides
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            Arc::new(StylesheetProbe::new(config.settle_delay())),
            config.overrides(),
        )
    }

    /// Detector with a fixed capture verdict and default overrides
    pub fn fixed(captured: bool) -> Self {
        Self::new(Arc::new(FixedProbe(captured)), DebugOverrides::default())
    }

    pub fn overrides(&self) -> &DebugOverrides {
        &self.overrides
    }

    /// Whether `ctx` is being captured by the host
    pub async fn detect_capture_context(&self, ctx: &BrowsingContext) -> bool {
        self.probe.detect(ctx.document()).await
    }

    /// Derive both roles for `ctx`
    pub async fn resolve(&self, ctx: &BrowsingContext) -> Roles {
        let captured = self.detect_capture_context(ctx).await;
        let roles = Roles::derive(captured, ctx.location().fragment(), &self.overrides);
        debug!(
            "Context {} at {}: dock={} overlay={}",
            ctx.id(),
            ctx.location(),
            roles.is_dock(),
            roles.is_overlay()
        );
        roles
    }

    pub async fn is_dock(&self, ctx: &BrowsingContext) -> bool {
        self.resolve(ctx).await.is_dock()
    }

    pub async fn is_overlay(&self, ctx: &BrowsingContext) -> bool {
        self.resolve(ctx).await.is_overlay()
    }
}

impl Default for ContextDetector {
    fn default() -> Self {
        Self::new(Arc::new(StylesheetProbe::default()), DebugOverrides::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Origin;

    #[test]
    fn test_exactly_one_role_without_overrides() {
        let overrides = DebugOverrides::default();
        for captured in [true, false] {
            for fragment in ["", "unrelated", "Dock"] {
                let roles = Roles::derive(captured, fragment, &overrides);
                assert_ne!(roles.is_dock(), roles.is_overlay(), "captured={captured} fragment={fragment}");
            }
        }
    }

    #[test]
    fn test_debug_enables_both() {
        let overrides = DebugOverrides::default();
        for captured in [true, false] {
            let roles = Roles::derive(captured, "debug", &overrides);
            assert!(roles.is_dock());
            assert!(roles.is_overlay());
        }
    }

    #[test]
    fn test_single_role_overrides() {
        let overrides = DebugOverrides::default();

        let captured_dock = Roles::derive(true, "dock", &overrides);
        assert!(captured_dock.is_dock());
        assert!(captured_dock.is_overlay());

        let tab_overlay = Roles::derive(false, "overlay", &overrides);
        assert!(tab_overlay.is_dock());
        assert!(tab_overlay.is_overlay());

        let tab_dock = Roles::derive(false, "dock", &overrides);
        assert!(tab_dock.is_dock());
        assert!(!tab_dock.is_overlay());
    }

    #[test]
    fn test_custom_override_literals() {
        let overrides = DebugOverrides {
            dock: vec!["control".to_string()],
            overlay: vec!["preview".to_string()],
        };
        assert!(Roles::derive(true, "control", &overrides).is_dock());
        assert!(!Roles::derive(true, "dock", &overrides).is_dock());
        assert!(Roles::derive(false, "preview", &overrides).is_overlay());
    }

    #[test]
    fn test_element_roles() {
        let overrides = DebugOverrides::default();
        let tab = Roles::derive(false, "", &overrides);
        assert_eq!(tab.dock_role(), Role::Dock);
        assert_eq!(tab.overlay_role(), Role::Inactive);

        let captured = Roles::derive(true, "", &overrides);
        assert_eq!(captured.dock_role(), Role::Inactive);
        assert_eq!(captured.overlay_role(), Role::Overlay);
    }

    #[tokio::test]
    async fn test_resolve_uses_document_and_fragment() {
        let origin = Origin::in_memory();
        let detector = ContextDetector::default();

        let tab = origin.open("/match/42", Document::loaded()).unwrap();
        assert!(detector.is_dock(&tab).await);
        assert!(!detector.is_overlay(&tab).await);

        let captured_doc = Document::loaded();
        captured_doc.add_stylesheet(StyleSheet::linked("data:text/css,"));
        let source = origin.open("/match/42", captured_doc).unwrap();
        assert!(!detector.is_dock(&source).await);
        assert!(detector.is_overlay(&source).await);

        let debug = origin.open("/match/42#debug", Document::loaded()).unwrap();
        let roles = detector.resolve(&debug).await;
        assert!(roles.is_dock() && roles.is_overlay());
    }
}
