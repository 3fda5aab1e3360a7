//! Process-wide element registry
//!
//! Mirrors the host's custom element registry: each tag name can be defined
//! once, and defining it again is an error rather than a silent replace.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::info;

use crate::config::ElementsConfig;

/// Which element a tag name resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Overlay,
    Dock,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("element '{0}' is already defined")]
    AlreadyDefined(String),
    #[error("'{0}' is not a valid custom element name")]
    InvalidName(String),
}

#[derive(Debug, Default)]
pub struct ElementRegistry {
    definitions: RwLock<HashMap<String, ElementKind>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `tag` as `kind`
    pub fn define(&self, tag: &str, kind: ElementKind) -> Result<(), RegistryError> {
        if !is_valid_element_name(tag) {
            return Err(RegistryError::InvalidName(tag.to_string()));
        }

        let mut definitions = self.definitions.write();
        if definitions.contains_key(tag) {
            return Err(RegistryError::AlreadyDefined(tag.to_string()));
        }
        definitions.insert(tag.to_string(), kind);
        info!("Defined <{}> as {:?}", tag, kind);
        Ok(())
    }

    pub fn get(&self, tag: &str) -> Option<ElementKind> {
        self.definitions.read().get(tag).copied()
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.read().contains_key(tag)
    }

    /// Define every `(tag, kind)` pair, or none of them
    pub fn define_all(&self, entries: &[(&str, ElementKind)]) -> Result<(), RegistryError> {
        if let Some((tag, _)) = entries.iter().find(|(tag, _)| !is_valid_element_name(tag)) {
            return Err(RegistryError::InvalidName(tag.to_string()));
        }

        let mut definitions = self.definitions.write();
        for (i, (tag, _)) in entries.iter().enumerate() {
            let repeated = entries[..i].iter().any(|(earlier, _)| earlier == tag);
            if repeated || definitions.contains_key(*tag) {
                return Err(RegistryError::AlreadyDefined(tag.to_string()));
            }
        }
        for (tag, kind) in entries {
            definitions.insert(tag.to_string(), *kind);
            info!("Defined <{}> as {:?}", tag, kind);
        }
        Ok(())
    }

    /// Define the overlay and dock tags from `config`
    pub fn define_builtin(&self, config: &ElementsConfig) -> Result<(), RegistryError> {
        self.define_all(&[
            (config.overlay_tag.as_str(), ElementKind::Overlay),
            (config.dock_tag.as_str(), ElementKind::Dock),
        ])
    }
}

/// The registry shared by the whole process
pub fn global() -> &'static ElementRegistry {
    static REGISTRY: OnceLock<ElementRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ElementRegistry::new)
}

/// Register both element kinds in the global registry
pub fn register_builtin_elements(config: &ElementsConfig) -> Result<(), RegistryError> {
    global().define_builtin(config)
}

/// Lowercase, starts with a letter, contains a hyphen
fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    starts_with_letter
        && name.contains('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'))
}
