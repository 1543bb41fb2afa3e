//! URL handling module for Ency-Harvest
//!
//! This module generates the per-letter index URLs, validates them, and
//! resolves article hrefs found on index pages.

mod index;

pub use index::{filter_valid_urls, generate_index_urls, IndexUrl};

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses `raw` and checks that it carries both a scheme and a host
///
/// # Examples
///
/// ```
/// use ency_harvest::url::check_url;
///
/// assert!(check_url("https://medlineplus.gov/ency/encyclopedia_A.htm").is_ok());
/// assert!(check_url("/ency/encyclopedia_A.htm").is_err());
/// ```
pub fn check_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw).map_err(|e| match e {
        ::url::ParseError::RelativeUrlWithoutBase => UrlError::MissingScheme(raw.to_string()),
        other => UrlError::Parse(format!("{}: {}", raw, other)),
    })?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlError::MissingHost(raw.to_string())),
    }
}

/// Returns true if `raw` is an absolute URL with both a scheme and a host
pub fn is_valid_url(raw: &str) -> bool {
    check_url(raw).is_ok()
}

/// Resolves an article href against the index page it was found on
///
/// Returns None if the href cannot be joined onto the base.
pub fn resolve_article_url(href: &str, index_url: &Url) -> Option<String> {
    index_url
        .join(href.trim().trim_start_matches('/'))
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .map(|url| url.to_string())
}
