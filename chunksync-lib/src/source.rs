//! Mapping from (track, chunk) to the URL a chunk is fetched from.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::constants::DEFAULT_SOURCE_PATTERN;

/// Resolves the location of one chunk of one track.
#[derive(Clone)]
pub enum SourceResolver {
    /// Arbitrary function of `(track_index, chunk_index)`.
    Template(Arc<dyn Fn(usize, usize) -> String + Send + Sync>),
    /// Base URL; `track` and `chunk` query parameters are set on it.
    BaseUrl(String),
    /// String with `{track}` and `{chunk}` placeholders.
    Pattern(String),
}

impl SourceResolver {
    /// Build a resolver from a closure.
    pub fn template<F>(f: F) -> Self
    where
        F: Fn(usize, usize) -> String + Send + Sync + 'static,
    {
        Self::Template(Arc::new(f))
    }

    /// Resolve the URL for a chunk.
    pub fn resolve(&self, track_index: usize, chunk_index: usize) -> String {
        match self {
            Self::Template(f) => f(track_index, chunk_index),
            Self::BaseUrl(base) => with_query_params(
                base,
                &[
                    ("track", track_index.to_string()),
                    ("chunk", chunk_index.to_string()),
                ],
            ),
            Self::Pattern(pattern) => pattern
                .replace("{track}", &track_index.to_string())
                .replace("{chunk}", &chunk_index.to_string()),
        }
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::Pattern(DEFAULT_SOURCE_PATTERN.to_string())
    }
}

impl From<&str> for SourceResolver {
    /// Strings with placeholders become patterns; anything else is a base URL.
    fn from(value: &str) -> Self {
        if value.contains("{track}") || value.contains("{chunk}") {
            Self::Pattern(value.to_string())
        } else {
            Self::BaseUrl(value.to_string())
        }
    }
}

impl Debug for SourceResolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template(_) => write!(f, "SourceResolver::Template(..)"),
            Self::BaseUrl(base) => write!(f, "SourceResolver::BaseUrl({:?})", base),
            Self::Pattern(pattern) => write!(f, "SourceResolver::Pattern({:?})", pattern),
        }
    }
}

/// Set query parameters on a URL, replacing existing ones with the same name.
///
/// Other parameters and any `#fragment` are preserved.
fn with_query_params(base: &str, params: &[(&str, String)]) -> String {
    let (without_fragment, fragment) = match base.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (base, None),
    };
    let (path, query) = match without_fragment.split_once('?') {
        Some((path, query)) => (path, query),
        None => (without_fragment, ""),
    };

    let mut pairs: Vec<String> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            !params.iter().any(|(name, _)| *name == key)
        })
        .map(str::to_string)
        .collect();
    for (name, value) in params {
        pairs.push(format!("{}={}", name, urlencoding::encode(value)));
    }

    let mut url = format!("{}?{}", path, pairs.join("&"));
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}
