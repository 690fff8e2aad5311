//! Presence-prober platform catalog.
//!
//! The catalog is configuration, not logic: a versioned list of platforms
//! with a URL template and a sensitive-category flag. It is loaded once at
//! startup and handed to the search engine, so tests can run against a tiny
//! fake catalog and deployments can extend it without touching scoring.

use crate::errors::{FootprintError, FootprintResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Placeholder substituted with the username in every template
pub const USERNAME_PLACEHOLDER: &str = "{username}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub name: String,
    /// e.g. `https://github.com/{username}`
    pub url_template: String,
    /// Sensitive-category platforms trigger the absolute score override
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Extra platform-specific not-found phrases, on top of the classifier's own
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_found_markers: Vec<String>,
}

impl PlatformEntry {
    pub fn new(name: &str, url_template: &str) -> Self {
        Self {
            name: name.to_string(),
            url_template: url_template.to_string(),
            sensitive: false,
            category: None,
            not_found_markers: Vec::new(),
        }
    }

    pub fn sensitive(mut self, category: &str) -> Self {
        self.sensitive = true;
        self.category = Some(category.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.not_found_markers = markers.iter().map(|m| m.to_string()).collect();
        self
    }

    /// Profile URL for a username
    pub fn url_for(&self, username: &str) -> String {
        self.url_template.replace(USERNAME_PLACEHOLDER, username)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformCatalog {
    pub version: String,
    pub platforms: Vec<PlatformEntry>,
}

impl PlatformCatalog {
    pub fn new(version: impl Into<String>, platforms: Vec<PlatformEntry>) -> FootprintResult<Self> {
        let catalog = Self {
            version: version.into(),
            platforms,
        };
        catalog.validate(None)?;
        Ok(catalog)
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> FootprintResult<Self> {
        log::info!("Loading platform catalog from {:?}", path);
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FootprintError::io(e, Some(path.to_path_buf())))?;
        let catalog: PlatformCatalog = serde_json::from_str(&raw)
            .map_err(|e| FootprintError::catalog(e.to_string(), Some(path.to_path_buf())))?;
        catalog.validate(Some(path))?;
        log::info!(
            "Catalog {} loaded with {} platforms ({} sensitive)",
            catalog.version,
            catalog.platforms.len(),
            catalog.sensitive_count()
        );
        Ok(catalog)
    }

    fn validate(&self, path: Option<&Path>) -> FootprintResult<()> {
        let path = path.map(Path::to_path_buf);
        let mut seen = HashSet::new();
        for entry in &self.platforms {
            if entry.name.trim().is_empty() {
                return Err(FootprintError::catalog("platform with empty name", path));
            }
            if !seen.insert(entry.name.to_lowercase()) {
                return Err(FootprintError::catalog(
                    format!("duplicate platform '{}'", entry.name),
                    path,
                ));
            }
            if !entry.url_template.contains(USERNAME_PLACEHOLDER) {
                return Err(FootprintError::catalog(
                    format!("template for '{}' lacks {}", entry.name, USERNAME_PLACEHOLDER),
                    path,
                ));
            }
            if !(entry.url_template.starts_with("https://") || entry.url_template.starts_with("http://")) {
                return Err(FootprintError::catalog(
                    format!("template for '{}' is not an http(s) URL", entry.name),
                    path,
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    pub fn sensitive_count(&self) -> usize {
        self.platforms.iter().filter(|p| p.sensitive).count()
    }

    /// Catalog shipped with the binary
    pub fn builtin() -> Self {
        Self {
            version: "2024.1".to_string(),
            platforms: vec![
                PlatformEntry::new("twitter", "https://twitter.com/{username}").category("social"),
                PlatformEntry::new("instagram", "https://instagram.com/{username}").category("social"),
                PlatformEntry::new("github", "https://github.com/{username}").category("developer"),
                PlatformEntry::new("reddit", "https://reddit.com/user/{username}")
                    .category("social")
                    .with_markers(&["nobody on reddit goes by that name"]),
                PlatformEntry::new("linkedin", "https://linkedin.com/in/{username}").category("professional"),
                PlatformEntry::new("tiktok", "https://tiktok.com/@{username}")
                    .category("social")
                    .with_markers(&["couldn't find this account"]),
                PlatformEntry::new("youtube", "https://youtube.com/@{username}").category("video"),
                PlatformEntry::new("facebook", "https://facebook.com/{username}")
                    .category("social")
                    .with_markers(&["this content isn't available"]),
                PlatformEntry::new("gitlab", "https://gitlab.com/{username}").category("developer"),
                PlatformEntry::new("medium", "https://medium.com/@{username}").category("blogging"),
                PlatformEntry::new("twitch", "https://twitch.tv/{username}").category("video"),
                PlatformEntry::new("pinterest", "https://pinterest.com/{username}").category("social"),
                PlatformEntry::new("onlyfans", "https://onlyfans.com/{username}").sensitive("adult"),
                PlatformEntry::new("fansly", "https://fansly.com/{username}").sensitive("adult"),
                PlatformEntry::new("pornhub", "https://www.pornhub.com/users/{username}")
                    .sensitive("adult")
                    .with_markers(&["error page not found"]),
                PlatformEntry::new("chaturbate", "https://chaturbate.com/{username}/")
                    .sensitive("adult")
                    .with_markers(&["http 404"]),
            ],
        }
    }
}
