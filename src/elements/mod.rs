//! Dock and Overlay Elements
//!
//! A dock is the control surface: it owns the in-memory state and commits it.
//! An overlay is the display: it listens for change signals, re-reads the
//! store and re-renders. Concrete pages supply behaviour through
//! [`DockBehavior`] and [`OverlayBehavior`].

pub mod dock;
pub mod overlay;
pub mod registry;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

use crate::shared::State;

pub use dock::{Dock, DockBehavior};
pub use overlay::{Overlay, OverlayBehavior, SlotOverlay};
pub use registry::{register_builtin_elements, ElementKind, ElementRegistry, RegistryError};

/// Errors raised by elements
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    /// The concrete element supplied no template; an integration bug
    #[error("<{tag}> has no render template")]
    MissingTemplate { tag: String },
    /// A control referenced a handler that setup never registered
    #[error("no handler named '{name}'")]
    UnknownHandler { name: String },
}

/// Lifecycle phase of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unattached,
    RoleResolving,
    Active,
    Inert,
    Detached,
}

/// Rendered output of an element's shadow root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Markup {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Markup {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Escape text for inclusion in markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// A light-DOM element that mirrors one state key
///
/// The value lands both in the text content and in an attribute named after
/// the key, so page styles can select on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorTarget {
    /// State key this element is tagged with
    pub key: String,
    /// Current text content
    pub content: String,
    /// Attributes set on the element, by name
    pub attributes: BTreeMap<String, String>,
}

impl MirrorTarget {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Show `value` as content and in the attribute named after the key
    pub fn reflect(&mut self, value: String) {
        self.attributes.insert(self.key.clone(), value.clone());
        self.content = value;
    }

    /// Opening tag selector followed by the content, e.g. `[data-state=score score="3"] 3`
    pub fn describe(&self) -> String {
        let mut out = format!("[data-state={}", self.key);
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
        }
        out.push_str("] ");
        out.push_str(&self.content);
        out
    }
}

type Handler = Box<dyn FnMut(&mut State) + Send>;

/// Named handlers that tagged dock controls invoke
#[derive(Default)]
pub struct Controls {
    handlers: HashMap<String, Handler>,
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous one
    pub fn on(&mut self, name: impl Into<String>, handler: impl FnMut(&mut State) + Send + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the handler called `name` against `state`
    pub(crate) fn invoke(&mut self, name: &str, state: &mut State) -> Result<(), ElementError> {
        let handler = self
            .handlers
            .get_mut(name)
            .ok_or_else(|| ElementError::UnknownHandler {
                name: name.to_string(),
            })?;
        handler(state);
        Ok(())
    }
}

impl fmt::Debug for Controls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controls")
            .field("handlers", &self.names())
            .finish()
    }
}
