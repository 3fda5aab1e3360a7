//! Page location and the namespace key derived from it

use std::fmt;
use url::Url;

const RELATIVE_BASE: &str = "http://localhost/";

/// The URL a browsing context was opened at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    url: Url,
}

impl Location {
    /// Parse an absolute URL, or a path such as `/match/42#dock`
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_BASE)?.join(input)?,
            Err(e) => return Err(e),
        };
        Ok(Self { url })
    }

    pub fn href(&self) -> &str {
        self.url.as_str()
    }

    /// Path component, without query or fragment
    pub fn pathname(&self) -> &str {
        self.url.path()
    }

    /// Fragment without the leading `#`, empty when there is none
    pub fn fragment(&self) -> &str {
        self.url.fragment().unwrap_or("")
    }

    /// Same location with the fragment replaced
    pub fn with_fragment(&self, fragment: Option<&str>) -> Self {
        let mut url = self.url.clone();
        url.set_fragment(fragment);
        Self { url }
    }

    /// Key under which state for this page is stored
    pub fn namespace_key(&self) -> NamespaceKey {
        NamespaceKey(self.pathname().to_string())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.href())
    }
}

/// Store key that keeps independent dock/overlay pairs apart
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceKey(String);

impl NamespaceKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
