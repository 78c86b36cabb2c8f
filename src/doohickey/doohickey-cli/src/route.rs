//! Routes between the list and detail views.

use crate::resolver::encode_identifier;

const DETAIL_PREFIX: &str = "/app/";

/// A view location. Detail identifiers are kept percent-encoded; the
/// resolver decodes them before lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    List,
    Detail { identifier: String },
}

impl Route {
    /// Route to the detail view of the application called `name`.
    pub fn detail(name: &str) -> Self {
        Route::Detail {
            identifier: encode_identifier(name),
        }
    }

    /// Route for an identifier as typed by a user or taken from a link.
    pub fn from_identifier(identifier: impl Into<String>) -> Self {
        Route::Detail {
            identifier: identifier.into(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::List => "/".to_string(),
            Route::Detail { identifier } => format!("{DETAIL_PREFIX}{identifier}"),
        }
    }

    /// Parse `/` or `/app/{identifier}`. Anything else is not a route.
    pub fn parse(path: &str) -> Option<Self> {
        if path == "/" {
            return Some(Route::List);
        }
        let identifier = path.strip_prefix(DETAIL_PREFIX)?;
        if identifier.is_empty() || identifier.contains('/') {
            return None;
        }
        Some(Route::from_identifier(identifier))
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Route::List => None,
            Route::Detail { identifier } => Some(identifier),
        }
    }
}
