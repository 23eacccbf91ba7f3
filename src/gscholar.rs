//! Google Scholar author profile lookup.
//!
//! Resolves an author identifier to a profile handle, then fills in the
//! citation count and h-index by scraping the public profile page. Every failure is reported as a [`MetricsError`]; callers that
//! must not fail use [`fetch_metrics`] which folds errors into a [`LookupOutcome`].

use crate::cookies::{build_cookie_header, CookieManager};
use crate::error::{MetricsError, OptionExt, Result};
use crate::profile::profile_url;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default Google Scholar URL
pub const DEFAULT_SCHOLAR_URL: &str = "https://scholar.google.com";

/// User agent string for requests
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Resolved author, before the indices are filled in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorHandle {
    pub scholar_id: String,
    pub name: String,
    pub affiliation: String,
    /// Profile page fetched while resolving, reused by `fill`
    #[serde(skip)]
    pub page: Option<String>,
}

/// Filled author record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub scholar_id: String,
    pub name: String,
    pub affiliation: String,
    /// All-time h-index
    pub hindex: Option<u64>,
    /// All-time citation count
    pub citedby: Option<u64>,
}

/// The two operations of the academic profile service
#[async_trait]
pub trait AuthorLookup: Send + Sync {
    /// Resolve an author identifier. Fails if the identifier is unknown.
    async fn search_author_id(&self, author_id: &str) -> Result<AuthorHandle>;

    /// Fetch the full profile details for a resolved author.
    async fn fill(&self, handle: AuthorHandle) -> Result<AuthorRecord>;
}

/// Metrics recorded for one scientist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorMetrics {
    pub hindex: u64,
    pub citations: u64,
}

/// Result of a metrics lookup: values on success, a human-readable reason on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Fetched(AuthorMetrics),
    Failed { reason: String },
}

/// Resolve and fill an author, folding every failure into [`LookupOutcome::Failed`].
///
/// An empty identifier fails without contacting the service. Any other identifier,
/// whitespace included, is passed to the service unchanged. A profile that lacks
/// either the h-index or the citation count is treated as malformed.
pub async fn fetch_metrics(lookup: &dyn AuthorLookup, author_id: &str) -> LookupOutcome {
    if author_id.is_empty() {
        return LookupOutcome::Failed {
            reason: "Empty Google Scholar author id".to_string(),
        };
    }

    let record = match lookup.search_author_id(author_id).await {
        Ok(handle) => lookup.fill(handle).await,
        Err(e) => Err(e),
    };

    match record {
        Ok(AuthorRecord {
            hindex: Some(hindex),
            citedby: Some(citations),
            ..
        }) => LookupOutcome::Fetched(AuthorMetrics { hindex, citations }),
        Ok(record) => LookupOutcome::Failed {
            reason: format!(
                "Profile {} is missing {}",
                author_id,
                if record.hindex.is_none() { "hindex" } else { "citedby" }
            ),
        },
        Err(e) => LookupOutcome::Failed {
            reason: e.to_string(),
        },
    }
}

/// Options for the Google Scholar profile client
#[derive(Debug, Clone)]
pub struct ScholarConfig {
    /// Base URL, overridable for mirror sites
    pub base_url: String,
    /// Proxy URL (e.g., "http://127.0.0.1:7890")
    pub proxy: Option<String>,
    /// Request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Cookie jar to send with requests; `None` uses the default location
    pub cookie_path: Option<PathBuf>,
}

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCHOLAR_URL.to_string(),
            proxy: None,
            timeout: None,
            cookie_path: None,
        }
    }
}

/// Profile-page scraper for Google Scholar
pub struct ScholarClient {
    client: reqwest::Client,
    base_url: String,
    cookie_header: String,
}

impl ScholarClient {
    /// Create a new ScholarClient
    pub fn new(config: ScholarConfig) -> Result<Self> {
        let cookie_manager = match config.cookie_path {
            Some(path) => CookieManager::with_path(path),
            None => CookieManager::default(),
        };
        let cookies = cookie_manager.load();
        if cookies.is_empty() {
            debug!("No cookies loaded for Google Scholar");
        } else {
            info!("Loaded {} cookies for Google Scholar", cookies.len());
        }

        Ok(Self {
            client: build_http_client(config.proxy.as_deref(), config.timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_header: build_cookie_header(&cookies),
        })
    }

    async fn fetch_profile(&self, author_id: &str) -> Result<String> {
        let url = profile_url(&self.base_url, author_id)?;
        debug!(author_id, url = %url, "Fetching profile page");

        let html = fetch_page_with_cookies(&self.client, &url, &self.cookie_header).await?;

        if html.contains("Solving the above CAPTCHA") || html.contains("unusual traffic") {
            warn!(author_id, "CAPTCHA detected");
            return Err(MetricsError::Captcha);
        }

        Ok(html)
    }
}

#[async_trait]
impl AuthorLookup for ScholarClient {
    async fn search_author_id(&self, author_id: &str) -> Result<AuthorHandle> {
        let html = self.fetch_profile(author_id).await?;
        let mut handle = parse_profile_header(&html, author_id)?;
        debug!(author_id, name = %handle.name, "Resolved author");
        handle.page = Some(html);
        Ok(handle)
    }

    async fn fill(&self, mut handle: AuthorHandle) -> Result<AuthorRecord> {
        let html = match handle.page.take() {
            Some(html) => html,
            None => self.fetch_profile(&handle.scholar_id).await?,
        };
        let mut record = parse_citation_indices(&html)?;
        record.scholar_id = handle.scholar_id;
        record.name = handle.name;
        record.affiliation = handle.affiliation;
        Ok(record)
    }
}

/// Build HTTP client with optional proxy and timeout
fn build_http_client(proxy: Option<&str>, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(true);

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = proxy {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            MetricsError::Config(format!("Invalid proxy URL '{}': {}", proxy_url, e))
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| MetricsError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Fetch page content using HTTP client with cookies
async fn fetch_page_with_cookies(
    client: &reqwest::Client,
    url: &Url,
    cookie_header: &str,
) -> Result<String> {
    let mut request = client
        .get(url.as_str())
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache")
        .header("Pragma", "no-cache")
        .header("Upgrade-Insecure-Requests", "1");

    if !cookie_header.is_empty() {
        request = request.header("Cookie", cookie_header);
    }

    let response = request.send().await?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(MetricsError::RateLimited(60));
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(MetricsError::NotFound(format!("No Google Scholar profile at {}", url)));
    }

    if !status.is_success() {
        return Err(MetricsError::Api {
            code: status.as_u16() as i32,
            message: format!("HTTP error: {}", status),
        });
    }

    Ok(response.text().await?)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| MetricsError::Parse(e.to_string()))
}

/// Parse the name and affiliation from a profile page.
///
/// A page without the profile name block is not an author profile.
pub fn parse_profile_header(html: &str, author_id: &str) -> Result<AuthorHandle> {
    let document = Html::parse_document(html);
    let name_selector = selector("#gsc_prf_in")?;
    let affiliation_selector = selector(".gsc_prf_il")?;

    let name = document
        .select(&name_selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| MetricsError::NotFound(format!("Author id '{}' not found", author_id)))?;

    let affiliation = document
        .select(&affiliation_selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    Ok(AuthorHandle {
        scholar_id: author_id.to_string(),
        name,
        affiliation,
        page: None,
    })
}

/// Parse the all-time citations and h-index from the "Cited by" table of a profile page.
///
/// Each row has a label followed by an all-time value and a recent-window value;
/// only the all-time column is read.
pub fn parse_citation_indices(html: &str) -> Result<AuthorRecord> {
    let document = Html::parse_document(html);
    let table_selector = selector("table#gsc_rsb_st")?;
    let row_selector = selector("tbody tr")?;
    let label_selector = selector("td.gsc_rsb_sc1")?;
    let value_selector = selector("td.gsc_rsb_std")?;
    let number_regex = Regex::new(r"\d[\d,]*").map_err(|e| MetricsError::Parse(e.to_string()))?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_parse("Profile page has no citation table")?;

    let mut record = AuthorRecord::default();

    for row in table.select(&row_selector) {
        let label = row
            .select(&label_selector)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_lowercase())
            .unwrap_or_default();

        let all_time = row.select(&value_selector).next().and_then(|cell| {
            let text = cell.text().collect::<String>();
            number_regex
                .find(&text)
                .and_then(|m| m.as_str().replace(',', "").parse::<u64>().ok())
        });

        match label.as_str() {
            "citations" => record.citedby = all_time,
            "h-index" => record.hindex = all_time,
            other => debug!(label = other, "Skipping citation row"),
        }
    }

    Ok(record)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted lookup service for tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned response for one author id
    #[derive(Clone)]
    pub enum Canned {
        Metrics { hindex: Option<u64>, citedby: Option<u64> },
        Unknown,
        FillError(String),
    }

    #[derive(Default)]
    pub struct StubLookup {
        responses: HashMap<String, Canned>,
        calls: AtomicUsize,
    }

    impl StubLookup {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, author_id: &str, hindex: u64, citedby: u64) -> Self {
            self.responses.insert(
                author_id.to_string(),
                Canned::Metrics {
                    hindex: Some(hindex),
                    citedby: Some(citedby),
                },
            );
            self
        }

        pub fn with_canned(mut self, author_id: &str, canned: Canned) -> Self {
            self.responses.insert(author_id.to_string(), canned);
            self
        }

        /// Number of resolve calls made
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthorLookup for StubLookup {
        async fn search_author_id(&self, author_id: &str) -> Result<AuthorHandle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(author_id) {
                Some(Canned::Unknown) | None => {
                    Err(MetricsError::NotFound(format!("Author id '{}' not found", author_id)))
                }
                Some(_) => Ok(AuthorHandle {
                    scholar_id: author_id.to_string(),
                    name: format!("Author {}", author_id),
                    affiliation: String::new(),
                    page: None,
                }),
            }
        }

        async fn fill(&self, handle: AuthorHandle) -> Result<AuthorRecord> {
            match self.responses.get(&handle.scholar_id) {
                Some(Canned::Metrics { hindex, citedby }) => Ok(AuthorRecord {
                    scholar_id: handle.scholar_id,
                    name: handle.name,
                    hindex: *hindex,
                    citedby: *citedby,
                    ..Default::default()
                }),
                Some(Canned::FillError(msg)) => Err(MetricsError::Parse(msg.clone())),
                _ => Err(MetricsError::NotFound(handle.scholar_id)),
            }
        }
    }
}
