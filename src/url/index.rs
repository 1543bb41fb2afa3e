use crate::url::is_valid_url;

/// One per-letter index page of the encyclopedia
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUrl {
    /// Uppercase letter A-Z this page lists
    pub letter: char,

    /// Absolute URL of the index page
    pub url: String,
}

/// Builds the 26 index URLs, `<base>/encyclopedia_<LETTER>.htm`, in letter order
///
/// A trailing slash on `base_url` is ignored.
///
/// # Arguments
///
/// * `base_url` - Encyclopedia root, e.g. `https://medlineplus.gov/ency/`
///
/// # Returns
///
/// One [`IndexUrl`] per letter A-Z, in order. Validity is not checked here;
/// see [`filter_valid_urls`].
///
/// # Examples
///
/// ```
/// use ency_harvest::url::generate_index_urls;
///
/// let urls = generate_index_urls("https://medlineplus.gov/ency/");
/// assert_eq!(urls.len(), 26);
/// assert_eq!(urls[0].url, "https://medlineplus.gov/ency/encyclopedia_A.htm");
/// ```
pub fn generate_index_urls(base_url: &str) -> Vec<IndexUrl> {
    let base = base_url.trim_end_matches('/');

    ('A'..='Z')
        .map(|letter| IndexUrl {
            letter,
            url: format!("{}/encyclopedia_{}.htm", base, letter),
        })
        .collect()
}

/// Keeps only the index URLs that have both a scheme and a host
pub fn filter_valid_urls(urls: Vec<IndexUrl>) -> Vec<IndexUrl> {
    let (valid, invalid): (Vec<_>, Vec<_>) =
        urls.into_iter().partition(|index| is_valid_url(&index.url));

    for index in &invalid {
        tracing::warn!("Dropping invalid index URL for '{}': {}", index.letter, index.url);
    }

    valid
}
