//! Google Scholar profile link handling.
//!
//! Profile links look like `https://scholar.google.com/citations?user=XXXXXXX&hl=en`.
//! The author identifier is whatever follows the first `user=` up to the next `&`.

use crate::error::{MetricsError, Result};
use url::Url;

/// Marker that precedes the author identifier in a profile link
const USER_MARKER: &str = "user=";

/// Extract the Google Scholar author identifier from a profile link.
///
/// Returns `None` when there is no link or the link has no `user=` marker.
/// The identifier shape is not validated, so `"...user="` yields `Some("")`;
/// callers must treat an empty identifier as a failed lookup.
///
/// # Example
///
/// ```
/// use scholarboard::profile::extract_author_id;
///
/// let id = extract_author_id(Some("https://scholar.google.com/citations?user=ABC123&hl=en"));
/// assert_eq!(id.as_deref(), Some("ABC123"));
/// ```
pub fn extract_author_id(link: Option<&str>) -> Option<String> {
    let link = link?;
    let start = link.find(USER_MARKER)? + USER_MARKER.len();
    let rest = &link[start..];
    let id = rest.split('&').next().unwrap_or_default();
    Some(id.to_string())
}

/// Build the canonical profile page URL for an author identifier.
pub fn profile_url(base_url: &str, author_id: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("{}/citations", base_url.trim_end_matches('/')))
        .map_err(|e| MetricsError::Config(format!("Invalid base URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("user", author_id)
        .append_pair("hl", "en");

    Ok(url)
}
