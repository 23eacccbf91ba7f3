//! Cookie persistence for Google Scholar requests.
//!
//! Profile lookups from a fresh client hit CAPTCHAs quickly. Operators can paste
//! the cookies of a browser session that already passed one, and every lookup
//! sends them along.

use crate::error::{MetricsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the cookie jar in the home directory
const COOKIE_FILE: &str = ".scholarboard_cookies.json";

/// Cookie entry as exported by browser extensions and devtools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, alias = "httpOnly")]
    pub http_only: bool,
    #[serde(default, alias = "expirationDate")]
    pub expires: Option<f64>,
}

impl Cookie {
    /// Whether Google Scholar would receive this cookie
    pub fn is_google(&self) -> bool {
        self.domain.contains("google")
    }
}

/// `Cookie` header value for the Google cookies in a jar. Empty when there are none.
pub fn build_cookie_header(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .filter(|c| c.is_google())
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Cookie jar stored as a JSON array on disk
pub struct CookieManager {
    path: PathBuf,
}

impl CookieManager {
    /// Jar at `~/.scholarboard_cookies.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| MetricsError::Config("Cannot determine home directory".to_string()))?;
        Ok(Self::with_path(home.join(COOKIE_FILE)))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the jar. `Ok(None)` when no jar has been saved yet.
    pub fn read(&self) -> Result<Option<Vec<Cookie>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Cookies to send with lookups. A missing or unreadable jar yields none.
    pub fn load(&self) -> Vec<Cookie> {
        match self.read() {
            Ok(Some(cookies)) => {
                debug!(path = %self.path.display(), count = cookies.len(), "Loaded cookies");
                cookies
            }
            Ok(None) => {
                debug!(path = %self.path.display(), "No cookie jar");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring unreadable cookie jar");
                Vec::new()
            }
        }
    }

    /// Replace the jar
    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        std::fs::write(&self.path, serde_json::to_string_pretty(cookies)?)?;
        info!(path = %self.path.display(), count = cookies.len(), "Saved cookies");
        Ok(())
    }

    /// Parse a pasted browser export and save its Google cookies.
    ///
    /// Returns the number of cookies kept. Cookies for other domains are dropped.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let pasted: Vec<Cookie> = serde_json::from_str(json.trim())?;
        let total = pasted.len();
        let kept: Vec<Cookie> = pasted.into_iter().filter(Cookie::is_google).collect();

        if kept.is_empty() {
            return Err(MetricsError::Validation(
                "No Google cookies found in the pasted export".to_string(),
            ));
        }
        if kept.len() < total {
            debug!(dropped = total - kept.len(), "Dropped non-Google cookies");
        }

        self.save(&kept)?;
        Ok(kept.len())
    }

    /// Delete the jar if present
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "Cleared cookies");
        }
        Ok(())
    }
}

impl Default for CookieManager {
    /// Falls back to the working directory when there is no home directory
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_path(PathBuf::from(COOKIE_FILE)))
    }
}
