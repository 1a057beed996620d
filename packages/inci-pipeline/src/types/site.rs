//! Site identity and per-site declarative configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Operating status of a site in the external registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    #[default]
    Active,
    Paused,
    Blocked,
}

/// A site as known to the registry. Read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Stable identifier, used as the run scope
    pub slug: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Canonical domains; a host matches exactly or as a subdomain
    pub allowed_domains: Vec<String>,

    /// Catalog entry pages used by the link-crawl discoverer
    #[serde(default)]
    pub entrypoints: Vec<String>,

    #[serde(default)]
    pub status: SiteStatus,
}

impl Site {
    /// Create a site with a single allowed domain.
    pub fn new(slug: impl Into<String>, domain: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            name: slug.clone(),
            slug,
            allowed_domains: vec![domain.into()],
            entrypoints: Vec::new(),
            status: SiteStatus::Active,
        }
    }

    /// Add an entry URL.
    pub fn with_entrypoint(mut self, url: impl Into<String>) -> Self {
        self.entrypoints.push(url.into());
        self
    }

    /// Add another allowed domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.allowed_domains.push(domain.into());
        self
    }

    /// Check whether a URL's host is on this site's allow-list.
    pub fn allows_url(&self, url: &str) -> bool {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .map(|host| host_matches(&host, &self.allowed_domains))
            .unwrap_or(false)
    }
}

/// Exact or subdomain match of `host` against any of `domains`.
pub fn host_matches(host: &str, domains: &[String]) -> bool {
    domains.iter().any(|d| {
        let d = d.trim().trim_start_matches('.').to_lowercase();
        !d.is_empty() && (host == d || host.ends_with(&format!(".{}", d)))
    })
}

/// How candidate URLs are enumerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Sitemap or sitemap-index URLs
    #[serde(default)]
    pub sitemap_urls: Vec<String>,

    /// Regex forcing a URL to classify as a product
    #[serde(default)]
    pub product_url_pattern: Option<String>,

    /// Cap on discovered URLs per run
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

fn default_max_pages() -> usize {
    500
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            sitemap_urls: Vec::new(),
            product_url_pattern: None,
            max_pages: default_max_pages(),
        }
    }
}

/// Ordered selector lists per field. First match wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_name_selectors")]
    pub name_selectors: Vec<String>,

    #[serde(default = "default_ingredient_selectors")]
    pub ingredient_selectors: Vec<String>,

    #[serde(default = "default_image_selectors")]
    pub image_selectors: Vec<String>,

    #[serde(default = "default_description_selectors")]
    pub description_selectors: Vec<String>,

    /// Allow Tier 2 for this site
    #[serde(default = "default_true")]
    pub use_model_fallback: bool,
}

fn default_true() -> bool {
    true
}

fn default_name_selectors() -> Vec<String> {
    strings(&["h1.product-name", "h1", ".product-title", ".product-name"])
}

fn default_ingredient_selectors() -> Vec<String> {
    strings(&[
        ".product-ingredients p",
        ".product-ingredients",
        "#composicao",
        "#ingredientes",
        "[data-tab='ingredientes']",
    ])
}

fn default_image_selectors() -> Vec<String> {
    strings(&[".product-image img", "img.product-img", ".gallery img"])
}

fn default_description_selectors() -> Vec<String> {
    strings(&[".product-description", "[itemprop='description']"])
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            name_selectors: default_name_selectors(),
            ingredient_selectors: default_ingredient_selectors(),
            image_selectors: default_image_selectors(),
            description_selectors: default_description_selectors(),
            use_model_fallback: true,
        }
    }
}

/// Per-site declarative document ("blueprint").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(flatten)]
    pub site: Site,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    #[serde(default)]
    pub extraction: SelectorConfig,

    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl SiteConfig {
    /// Build a config with default selectors for a site.
    pub fn new(site: Site) -> Self {
        Self {
            site,
            discovery: DiscoveryConfig::default(),
            extraction: SelectorConfig::default(),
            version: default_version(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.site.slug
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(text: &str, origin: &Path) -> ConfigResult<Self> {
        let config: SiteConfig =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `<dir>/<slug>.yaml`.
    pub fn load(dir: &Path, slug: &str) -> ConfigResult<Self> {
        let path = site_config_path(dir, slug);
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml(&text, &path)?;
        if config.site.slug != slug {
            return Err(ConfigError::Invalid(format!(
                "{} declares slug '{}'",
                path.display(),
                config.site.slug
            )));
        }
        Ok(config)
    }

    /// Reject configs the pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.site.slug.trim().is_empty() {
            return Err(ConfigError::Invalid("slug is empty".into()));
        }
        if self.site.allowed_domains.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "{}: at least one allowed domain is required",
                self.site.slug
            )));
        }
        for url in self.site.entrypoints.iter().chain(&self.discovery.sitemap_urls) {
            url::Url::parse(url).map_err(|e| {
                ConfigError::Invalid(format!("{}: bad URL '{}': {}", self.site.slug, url, e))
            })?;
        }
        if let Some(pattern) = &self.discovery.product_url_pattern {
            regex::Regex::new(pattern).map_err(|e| {
                ConfigError::Invalid(format!("{}: bad product_url_pattern: {}", self.site.slug, e))
            })?;
        }
        let selectors = &self.extraction;
        for sel in selectors
            .name_selectors
            .iter()
            .chain(&selectors.ingredient_selectors)
            .chain(&selectors.image_selectors)
            .chain(&selectors.description_selectors)
        {
            scraper::Selector::parse(sel).map_err(|e| {
                ConfigError::Invalid(format!("{}: bad selector '{}': {}", self.site.slug, sel, e))
            })?;
        }
        Ok(())
    }
}

/// Path of a site's YAML document inside a config directory.
pub fn site_config_path(dir: &Path, slug: &str) -> PathBuf {
    dir.join(format!("{}.yaml", slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r##"
slug: amend
name: Amend
allowed_domains: [amend.com.br]
entrypoints: ["https://www.amend.com.br/cabelos"]
discovery:
  sitemap_urls: ["https://www.amend.com.br/sitemap.xml"]
  max_pages: 200
extraction:
  ingredient_selectors: ["#tab-ingredientes p"]
"##;

    #[test]
    fn test_parse_with_defaults() {
        let config = SiteConfig::from_yaml(YAML, Path::new("amend.yaml")).unwrap();
        assert_eq!(config.slug(), "amend");
        assert_eq!(config.discovery.max_pages, 200);
        assert_eq!(config.extraction.ingredient_selectors, vec!["#tab-ingredientes p"]);
        // Unspecified lists fall back to generic defaults
        assert!(config.extraction.name_selectors.contains(&"h1".to_string()));
        assert!(config.extraction.use_model_fallback);
        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_rejects_missing_domains() {
        let yaml = "slug: x\nallowed_domains: []\n";
        let err = SiteConfig::from_yaml(yaml, Path::new("x.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_bad_selector() {
        let yaml = "slug: x\nallowed_domains: [x.com]\nextraction:\n  name_selectors: ['h1[']\n";
        let err = SiteConfig::from_yaml(yaml, Path::new("x.yaml")).unwrap_err();
        assert!(err.to_string().contains("bad selector"));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let err = SiteConfig::from_yaml("slug: [", Path::new("x.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_load_checks_slug_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("other.yaml"), YAML).unwrap();
        assert!(SiteConfig::load(dir.path(), "other").is_err());
        assert!(matches!(
            SiteConfig::load(dir.path(), "missing"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_allows_url_subdomains() {
        let site = Site::new("amend", "amend.com.br");
        assert!(site.allows_url("https://www.amend.com.br/p"));
        assert!(site.allows_url("https://amend.com.br/p"));
        assert!(!site.allows_url("https://amend.com.br.evil.io/p"));
        assert!(!site.allows_url("https://notamend.com.br/p"));
        assert!(!site.allows_url("not a url"));
    }
}
