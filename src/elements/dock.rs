//! Dock element: the control panel side

use tracing::{debug, error, info, warn};

use crate::app::BrowsingContext;
use crate::config::{ElementsConfig, SignalConfig};
use crate::context::{ContextDetector, NamespaceKey, Role};
use crate::elements::{Controls, ElementError, Markup, Phase};
use crate::shared::State;

/// Styles applied to every dock unless the behaviour overrides them
pub const DEFAULT_DOCK_STYLES: &str = "<style>:host { display: flex; flex-direction: column; \
     justify-content: center; align-items: center; }</style>";

/// What a concrete dock supplies
pub trait DockBehavior: Send {
    /// State used when nothing has been stored for the page yet
    fn default_state(&self) -> State {
        State::new()
    }

    /// Wire interactive controls; runs once, when the dock first goes active
    fn setup(&mut self, _controls: &mut Controls) {}

    fn styles(&self, _state: &State) -> Markup {
        Markup::new(DEFAULT_DOCK_STYLES)
    }

    /// Shadow-root content; `None` is a configuration error
    fn template(&self, state: &State) -> Option<Markup>;
}

enum Lifecycle {
    Unattached,
    RoleResolving,
    Active {
        ctx: BrowsingContext,
        namespace: NamespaceKey,
    },
    Inert,
    Detached,
}

/// Control surface element
pub struct Dock<B: DockBehavior> {
    behavior: B,
    tag: String,
    notify_same_context: bool,
    lifecycle: Lifecycle,
    state: State,
    controls: Controls,
    setup_done: bool,
    shadow: Option<Markup>,
}

impl<B: DockBehavior> Dock<B> {
    pub fn new(behavior: B) -> Self {
        Self {
            behavior,
            tag: ElementsConfig::default().dock_tag,
            notify_same_context: SignalConfig::default().notify_same_context,
            lifecycle: Lifecycle::Unattached,
            state: State::new(),
            controls: Controls::new(),
            setup_done: false,
            shadow: None,
        }
    }

    /// Apply the tag name and signal settings from configuration
    pub fn configured(mut self, elements: &ElementsConfig, signal: &SignalConfig) -> Self {
        self.tag = elements.dock_tag.clone();
        self.notify_same_context = signal.notify_same_context;
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

    /// Mutable access to the in-memory state; changes stay local until [`commit`](Self::commit)
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    /// Last rendered shadow-root content
    pub fn rendered(&self) -> Option<&Markup> {
        self.shadow.as_ref()
    }

    /// Attach to `ctx`, load state and resolve the role
    pub async fn connect(
        &mut self,
        ctx: &BrowsingContext,
        detector: &ContextDetector,
    ) -> Result<Role, ElementError> {
        match self.lifecycle {
            Lifecycle::Unattached | Lifecycle::Detached => {}
            Lifecycle::Active { .. } => {
                warn!("<{}> is already connected", self.tag);
                return Ok(Role::Dock);
            }
            Lifecycle::RoleResolving | Lifecycle::Inert => {
                warn!("<{}> is already connected", self.tag);
                return Ok(Role::Inactive);
            }
        }

        let namespace = ctx.location().namespace_key();
        self.state = ctx
            .store()
            .read(namespace.as_str())
            .unwrap_or_else(|| self.behavior.default_state());

        self.lifecycle = Lifecycle::RoleResolving;
        let role = detector.resolve(ctx).await.dock_role();

        if role != Role::Dock {
            info!("<{}> inert at {}", self.tag, ctx.location());
            self.lifecycle = Lifecycle::Inert;
            return Ok(role);
        }

        if !self.setup_done {
            self.behavior.setup(&mut self.controls);
            self.setup_done = true;
        }

        // Nothing is committed from a dock that never rendered
        if let Err(e) = self.render() {
            self.lifecycle = Lifecycle::Inert;
            return Err(e);
        }

        info!("<{}> active for {}", self.tag, namespace);
        self.lifecycle = Lifecycle::Active {
            ctx: ctx.clone(),
            namespace,
        };
        Ok(role)
    }

    /// Persist the in-memory state, signal other contexts and re-render
    ///
    /// This is the only path by which dock changes reach overlays. Returns
    /// whether the state reached the store; a failed write is logged, sends no
    /// signal and still re-renders.
    pub fn commit(&mut self) -> Result<bool, ElementError> {
        let (ctx, namespace) = match &self.lifecycle {
            Lifecycle::Active { ctx, namespace } => (ctx, namespace),
            _ => {
                debug!("<{}> is not active; commit ignored", self.tag);
                return Ok(false);
            }
        };

        let stored = match ctx.store().write(namespace.as_str(), &self.state) {
            Ok(()) => {
                ctx.signal().publish(ctx.id());
                if self.notify_same_context {
                    ctx.signal().notify_local(ctx.id());
                }
                debug!("<{}> committed {} keys to {}", self.tag, self.state.len(), namespace);
                true
            }
            Err(e) => {
                warn!("<{}> failed to persist state for {}: {}", self.tag, namespace, e);
                false
            }
        };

        self.render()?;
        Ok(stored)
    }

    /// Run the control handler called `name`, then commit
    ///
    /// Returns what [`commit`](Self::commit) returned.
    pub fn interact(&mut self, name: &str) -> Result<bool, ElementError> {
        if !matches!(self.lifecycle, Lifecycle::Active { .. }) {
            debug!("<{}> is not active; '{}' ignored", self.tag, name);
            return Ok(false);
        }

        self.controls.invoke(name, &mut self.state)?;
        self.commit()
    }

    /// Detach from the page; an inert dock may be connected again afterwards
    pub fn detach(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Active { .. } | Lifecycle::Inert) {
            debug!("<{}> detached", self.tag);
            self.lifecycle = Lifecycle::Detached;
        }
    }

    fn render(&mut self) -> Result<(), ElementError> {
        let Some(template) = self.behavior.template(&self.state) else {
            error!("<{}> is missing its template", self.tag);
            return Err(ElementError::MissingTemplate {
                tag: self.tag.clone(),
            });
        };
        let styles = self.behavior.styles(&self.state);
        self.shadow = Some(Markup::new(format!("{} {}", styles, template)));
        Ok(())
    }
}
