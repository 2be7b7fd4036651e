//! Mapping between remote URLs and the local mirror layout.
//!
//! A URL such as `https://example.com/a/b/c.png` maps to the file `c.png`
//! inside the directory `a/b`, relative to the mirror root for
//! `example.com`. Relative references found in pages are resolved against
//! the page URL with RFC 3986 semantics (delegated to [`Url::join`]).

use crate::constants::DEFAULT_FILE_NAME;
use crate::error::{Result, ScanError};
use std::path::PathBuf;
use url::Url;

/// Local placement of a remote resource, relative to an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub file_name: String,
    pub output_dir: String,
}

impl ResolvedTarget {
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.output_dir.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(&self.file_name);
        path
    }
}

/// Resolve `candidate` against `base`.
///
/// A candidate that already carries a scheme is returned as parsed; anything
/// else is joined onto the base URL (`..`, `.`, leading `/`, query and
/// fragment replacement all follow RFC 3986).
pub fn resolve(base: &str, candidate: &str) -> Result<Url> {
    match Url::parse(candidate) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base_url = Url::parse(base)
                .map_err(|e| ScanError::MalformedUrl(format!("{}: {}", base, e)))?;
            base_url
                .join(candidate)
                .map_err(|e| ScanError::MalformedUrl(format!("{}: {}", candidate, e)))
        }
        Err(e) => Err(ScanError::MalformedUrl(format!("{}: {}", candidate, e))),
    }
}

/// Split a URL path into the file name and the directory chain above it.
pub fn split_target(url: &Url) -> ResolvedTarget {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default();

    let (file_name, dirs) = match segments.split_last() {
        Some((last, dirs)) => (*last, dirs),
        None => ("", &[][..]),
    };

    let file_name = if file_name.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        file_name.to_string()
    };

    let output_dir = dirs
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");

    ResolvedTarget {
        file_name,
        output_dir,
    }
}

/// Host (plus explicit port) that identifies a crawl scope.
pub fn scope_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Canonical visited-set key: the URL without its fragment.
pub fn canonical(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
