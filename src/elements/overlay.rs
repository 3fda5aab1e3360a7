//! Overlay element: the display side

use tracing::{debug, error, info, trace};

use crate::app::BrowsingContext;
use crate::config::ElementsConfig;
use crate::context::{ContextDetector, NamespaceKey, Role};
use crate::elements::{ElementError, Markup, MirrorTarget, Phase};
use crate::shared::{State, Subscription};

/// What a concrete overlay supplies
pub trait OverlayBehavior: Send {
    /// Shadow-root content for `state`; must be a pure function of it
    fn template(&self, state: &State) -> Option<Markup>;
}

/// Overlay that only projects its light-DOM children
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotOverlay;

impl OverlayBehavior for SlotOverlay {
    fn template(&self, _state: &State) -> Option<Markup> {
        Some(Markup::new("<slot></slot>"))
    }
}

enum Lifecycle {
    Unattached,
    RoleResolving,
    Active {
        ctx: BrowsingContext,
        namespace: NamespaceKey,
        subscription: Subscription,
    },
    Inert,
    Detached,
}

/// Display element driven by a dock in another context
pub struct Overlay<B: OverlayBehavior> {
    behavior: B,
    tag: String,
    lifecycle: Lifecycle,
    state: State,
    mirrors: Vec<MirrorTarget>,
    shadow: Option<Markup>,
    renders: u64,
}

impl<B: OverlayBehavior> Overlay<B> {
    pub fn new(behavior: B) -> Self {
        Self {
            behavior,
            tag: ElementsConfig::default().overlay_tag,
            lifecycle: Lifecycle::Unattached,
            state: State::new(),
            mirrors: Vec::new(),
            shadow: None,
            renders: 0,
        }
    }

    pub fn configured(mut self, elements: &ElementsConfig) -> Self {
        self.tag = elements.overlay_tag.clone();
        self
    }

    /// Add a child element that mirrors `key`
    pub fn with_mirror(mut self, key: impl Into<String>) -> Self {
        self.mirrors.push(MirrorTarget::new(key));
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn phase(&self) -> Phase {
        match self.lifecycle {
            Lifecycle::Unattached => Phase::Unattached,
            Lifecycle::RoleResolving => Phase::RoleResolving,
            Lifecycle::Active { .. } => Phase::Active,
            Lifecycle::Inert => Phase::Inert,
            Lifecycle::Detached => Phase::Detached,
        }
    }

    pub fn namespace(&self) -> Option<&NamespaceKey> {
        match &self.lifecycle {
            Lifecycle::Active { namespace, .. } => Some(namespace),
            _ => None,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn mirrors(&self) -> &[MirrorTarget] {
        &self.mirrors
    }

    /// Content of the first mirror tagged with `key`
    pub fn mirror(&self, key: &str) -> Option<&str> {
        self.mirror_target(key).map(|m| m.content.as_str())
    }

    pub fn mirror_target(&self, key: &str) -> Option<&MirrorTarget> {
        self.mirrors.iter().find(|m| m.key == key)
    }

    pub fn rendered(&self) -> Option<&Markup> {
        self.shadow.as_ref()
    }

    /// Number of renders performed so far
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Everything a viewer sees: shadow content followed by mirrored children
    pub fn output(&self) -> String {
        let mut out = self
            .shadow
            .as_ref()
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        for mirror in &self.mirrors {
            out.push('\n');
            out.push_str(&mirror.describe());
        }
        out
    }

    /// Attach to `ctx`; an overlay that resolves inert stays inert for good
    pub async fn connect(
        &mut self,
        ctx: &BrowsingContext,
        detector: &ContextDetector,
    ) -> Result<Role, ElementError> {
        match self.lifecycle {
            Lifecycle::Unattached | Lifecycle::Detached => {}
            Lifecycle::Active { .. } => return Ok(Role::Overlay),
            Lifecycle::RoleResolving | Lifecycle::Inert => return Ok(Role::Inactive),
        }

        let namespace = ctx.location().namespace_key();
        self.state = State::new();
        self.lifecycle = Lifecycle::RoleResolving;

        let role = detector.resolve(ctx).await.overlay_role();
        if role != Role::Overlay {
            info!("<{}> inert at {}", self.tag, ctx.location());
            self.lifecycle = Lifecycle::Inert;
            return Ok(role);
        }

        let subscription = ctx.signal().subscribe(ctx.id());
        info!("<{}> active for {}", self.tag, namespace);
        self.lifecycle = Lifecycle::Active {
            ctx: ctx.clone(),
            namespace,
            subscription,
        };

        if let Err(e) = self.refresh() {
            // Drops the subscription; an overlay that cannot render stays inert
            self.lifecycle = Lifecycle::Inert;
            return Err(e);
        }
        Ok(role)
    }

    /// Handle every pending change event with a single refresh
    ///
    /// Returns the number of events consumed; zero when detached or inert.
    pub fn process_signals(&mut self) -> Result<usize, ElementError> {
        let pending = match &self.lifecycle {
            Lifecycle::Active { subscription, .. } => subscription.drain().len(),
            _ => 0,
        };

        if pending > 0 {
            trace!("<{}> handling {} change events", self.tag, pending);
            self.refresh()?;
        }
        Ok(pending)
    }

    /// Re-read the full state, update mirrors and re-render
    pub fn refresh(&mut self) -> Result<(), ElementError> {
        let stored = match &self.lifecycle {
            Lifecycle::Active { ctx, namespace, .. } => ctx.store().read(namespace.as_str()),
            _ => return Ok(()),
        };

        if let Some(state) = stored {
            self.state = state;
        }
        self.reflect();
        self.render()
    }

    /// Stop listening; later signals have no effect
    pub fn detach(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Active { .. }) {
            // Dropping the subscription unregisters it from the signal
            self.lifecycle = Lifecycle::Detached;
            debug!("<{}> detached", self.tag);
        }
    }

    fn reflect(&mut self) {
        for mirror in &mut self.mirrors {
            if let Some(value) = self.state.display_value(&mirror.key) {
                mirror.reflect(value);
            }
        }
    }

    fn render(&mut self) -> Result<(), ElementError> {
        let Some(markup) = self.behavior.template(&self.state) else {
            error!("<{}> is missing its template", self.tag);
            return Err(ElementError::MissingTemplate {
                tag: self.tag.clone(),
            });
        };
        self.shadow = Some(markup);
        self.renders += 1;
        Ok(())
    }
}
