//! Candidate URL discovery for one site.
//!
//! Two adapters run in order: sitemaps (with sitemap-index recursion),
//! then a link crawl of the site's entry pages. Each URL is classified as
//! found (with the anchor text for crawled links), then canonicalized,
//! deduplicated in first-seen order and capped at `max_pages`.
//! An adapter failure is logged and recorded; it never fails the run.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::pipeline::classify::UrlClassifier;
use crate::pipeline::markup::{self, PageLink};
use crate::traits::fetcher::PageFetcher;
use crate::types::product::{canonical_url, DiscoveredUrl, DiscoverySource, UrlKind};
use crate::types::site::SiteConfig;

/// Sitemap indexes nested deeper than this are ignored.
const MAX_SITEMAP_DEPTH: usize = 3;

static SITEMAP_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<sitemap\b[^>]*>.*?<loc>\s*(.*?)\s*</loc>").unwrap());

static URL_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<url\b[^>]*>.*?<loc>\s*(.*?)\s*</loc>").unwrap());

/// A URL as first seen, before canonicalization.
#[derive(Debug)]
struct Candidate {
    raw: String,
    source: DiscoverySource,
    context: Option<String>,
}

/// Output of a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub urls: Vec<DiscoveredUrl>,
    /// Adapter failures, for the coverage report
    pub errors: Vec<String>,
}

impl Discovery {
    pub fn count(&self, kind: UrlKind) -> usize {
        self.urls.iter().filter(|u| u.kind == kind).count()
    }

    pub fn products(&self) -> impl Iterator<Item = &DiscoveredUrl> {
        self.urls.iter().filter(|u| u.kind == UrlKind::Product)
    }
}

/// Discoverer for one site.
#[derive(Debug, Clone)]
pub struct Discoverer<'a> {
    config: &'a SiteConfig,
    classifier: UrlClassifier,
}

impl<'a> Discoverer<'a> {
    /// Site configs are validated on load, so the pattern compiles; a bad
    /// one here is ignored with a warning.
    pub fn new(config: &'a SiteConfig) -> Self {
        let pattern = config.discovery.product_url_pattern.as_deref();
        let classifier = UrlClassifier::from_pattern(pattern).unwrap_or_else(|e| {
            warn!(site = %config.slug(), error = %e, "Ignoring invalid product_url_pattern");
            UrlClassifier::new()
        });
        Self { config, classifier }
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    pub async fn discover(&self, fetcher: &dyn PageFetcher) -> Discovery {
        let slug = self.config.slug();
        let mut found: IndexMap<String, Candidate> = IndexMap::new();
        let mut errors = Vec::new();

        for sitemap in &self.config.discovery.sitemap_urls {
            let urls = self.read_sitemap(fetcher, sitemap, &mut errors).await;
            info!(site = %slug, sitemap = %sitemap, count = urls.len(), "Read sitemap");
            for raw in urls {
                found.entry(canonical_url(&raw)).or_insert(Candidate {
                    raw,
                    source: DiscoverySource::Sitemap,
                    context: None,
                });
            }
        }

        for entry in &self.config.site.entrypoints {
            match fetcher.fetch(entry).await {
                Ok(page) => {
                    let links = same_site_links(&page.html, &page.url, self.config);
                    info!(site = %slug, entrypoint = %entry, count = links.len(), "Crawled entry page");
                    for link in links {
                        found.entry(canonical_url(&link.url)).or_insert(Candidate {
                            raw: link.url,
                            source: DiscoverySource::Crawl,
                            context: Some(link.text).filter(|t| !t.is_empty()),
                        });
                    }
                }
                Err(e) => {
                    warn!(site = %slug, entrypoint = %entry, error = %e, "Failed to crawl entry page");
                    errors.push(format!("crawl {}: {}", entry, e));
                }
            }
        }

        let max_pages = self.config.discovery.max_pages;
        if found.len() > max_pages {
            debug!(site = %slug, found = found.len(), max_pages, "Capping discovered URLs");
        }
        let urls = found
            .into_iter()
            .take(max_pages)
            .map(|(url, candidate)| {
                let kind = self
                    .classifier
                    .classify_with_context(&candidate.raw, candidate.context.as_deref());
                DiscoveredUrl::new(url, candidate.source, kind)
            })
            .collect();

        Discovery { urls, errors }
    }

    /// URLs listed in a sitemap, following sitemap indexes.
    async fn read_sitemap(
        &self,
        fetcher: &dyn PageFetcher,
        root: &str,
        errors: &mut Vec<String>,
    ) -> Vec<String> {
        let mut urls = Vec::new();
        let mut pending = vec![(root.to_string(), 0usize)];

        while let Some((sitemap, depth)) = pending.pop() {
            let xml = match fetcher.fetch(&sitemap).await {
                Ok(page) => page.html,
                Err(e) => {
                    warn!(site = %self.config.slug(), sitemap = %sitemap, error = %e, "Failed to fetch sitemap");
                    errors.push(format!("sitemap {}: {}", sitemap, e));
                    continue;
                }
            };

            let children = sitemap_locs(&SITEMAP_ENTRY, &xml);
            if depth < MAX_SITEMAP_DEPTH {
                // Reversed so children are read in document order
                pending.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
            } else if !children.is_empty() {
                warn!(sitemap = %sitemap, "Sitemap index nested too deep, skipping children");
            }
            urls.extend(sitemap_locs(&URL_ENTRY, &xml));
        }
        urls
    }
}

fn sitemap_locs(entry: &Regex, xml: &str) -> Vec<String> {
    entry
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

fn unescape_xml(text: &str) -> String {
    text.trim()
        .trim_start_matches("<![CDATA[")
        .trim_end_matches("]]>")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Links on a page whose host is allow-listed for the site.
fn same_site_links(html: &str, base_url: &str, config: &SiteConfig) -> Vec<PageLink> {
    let doc = Html::parse_document(html);
    markup::extract_links(&doc, base_url)
        .into_iter()
        .filter(|link| config.site.allows_url(&link.url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetchers::MockFetcher;
    use crate::testing::sitemap_xml;
    use crate::types::site::Site;

    fn config() -> SiteConfig {
        let mut config = SiteConfig::new(
            Site::new("amend", "amend.com.br").with_entrypoint("https://www.amend.com.br/cabelos"),
        );
        config.discovery.sitemap_urls = vec!["https://www.amend.com.br/sitemap.xml".into()];
        config
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_sitemap_index_and_crawl_merge_in_order() {
        let index = r#"<?xml version="1.0"?><sitemapindex>
            <sitemap><loc>https://www.amend.com.br/sitemap-products.xml</loc></sitemap>
            </sitemapindex>"#;
        let fetcher = MockFetcher::new()
            .with_page("https://www.amend.com.br/sitemap.xml", index)
            .with_page(
                "https://www.amend.com.br/sitemap-products.xml",
                sitemap_xml(&urls(&[
                    "https://www.amend.com.br/shampoo-gold-black-300ml",
                    "https://www.amend.com.br/condicionador-gold-black-250ml?utm_source=x",
                ])),
            )
            .with_page(
                "https://www.amend.com.br/cabelos",
                r#"<a href="/shampoo-gold-black-300ml">dup</a>
                   <a href="/mascara-hidratante-500g">new</a>
                   <a href="https://facebook.com/amend">social</a>
                   <a href="/kit-gold-black">kit</a>"#,
            );

        let config = config();
        let discovery = Discoverer::new(&config).discover(&fetcher).await;
        let found: Vec<&str> = discovery.urls.iter().map(|u| u.url.as_str()).collect();

        assert_eq!(
            found,
            vec![
                "https://www.amend.com.br/shampoo-gold-black-300ml",
                "https://www.amend.com.br/condicionador-gold-black-250ml",
                "https://www.amend.com.br/mascara-hidratante-500g",
                "https://www.amend.com.br/kit-gold-black",
            ]
        );
        assert_eq!(discovery.urls[0].source, DiscoverySource::Sitemap);
        assert_eq!(discovery.urls[2].source, DiscoverySource::Crawl);
        assert!(discovery.urls[3].is_kit);
        assert_eq!(discovery.count(UrlKind::Product), 3);
        assert!(discovery.errors.is_empty());
    }

    #[tokio::test]
    async fn test_query_urls_classified_before_canonicalization() {
        let fetcher = MockFetcher::new().with_page(
            "https://loja.com.br/sitemap.xml",
            sitemap_xml(&urls(&[
                "https://loja.com.br/busca?cgid=cabelos",
                "https://loja.com.br/produto.php?id=1",
                "https://loja.com.br/produto.php?id=2&amp;utm_source=news",
                "https://loja.com.br/produto.php?id=1#avaliacoes",
            ])),
        );

        let mut config = SiteConfig::new(Site::new("loja", "loja.com.br"));
        config.discovery.sitemap_urls = vec!["https://loja.com.br/sitemap.xml".into()];
        config.discovery.product_url_pattern = Some(r"produto\.php\?id=\d+".into());

        let discovery = Discoverer::new(&config).discover(&fetcher).await;
        let found: Vec<(&str, UrlKind)> = discovery
            .urls
            .iter()
            .map(|u| (u.url.as_str(), u.kind))
            .collect();

        assert_eq!(
            found,
            vec![
                ("https://loja.com.br/busca?cgid=cabelos", UrlKind::Category),
                ("https://loja.com.br/produto.php?id=1", UrlKind::Product),
                ("https://loja.com.br/produto.php?id=2", UrlKind::Product),
            ]
        );
        assert_eq!(discovery.count(UrlKind::Category), 1);
        assert_eq!(discovery.count(UrlKind::Product), 2);
    }

    #[tokio::test]
    async fn test_crawl_uses_anchor_text() {
        let fetcher = MockFetcher::new().with_page(
            "https://www.amend.com.br/cabelos",
            r#"<a href="/novidades/gold-black">Shampoo Gold Black</a>
               <a href="/novidades/verao">Coleção Verão</a>"#,
        );

        let mut config = config();
        config.discovery.sitemap_urls.clear();
        let discovery = Discoverer::new(&config).discover(&fetcher).await;

        assert_eq!(discovery.urls.len(), 2);
        assert_eq!(discovery.urls[0].kind, UrlKind::Product);
        assert_eq!(discovery.urls[1].kind, UrlKind::Other);
    }

    #[tokio::test]
    async fn test_failures_are_recorded_not_fatal() {
        let fetcher = MockFetcher::new()
            .with_failure("https://www.amend.com.br/sitemap.xml")
            .with_page(
                "https://www.amend.com.br/cabelos",
                r#"<a href="/shampoo-gold-black-300ml">p</a>"#,
            );

        let config = config();
        let discovery = Discoverer::new(&config).discover(&fetcher).await;
        assert_eq!(discovery.urls.len(), 1);
        assert_eq!(discovery.errors.len(), 1);
        assert!(discovery.errors[0].starts_with("sitemap "));
    }

    #[tokio::test]
    async fn test_max_pages_cap() {
        let listed: Vec<String> = (0..10)
            .map(|i| format!("https://www.amend.com.br/shampoo-{}-300ml", i))
            .collect();
        let fetcher =
            MockFetcher::new().with_page("https://www.amend.com.br/sitemap.xml", sitemap_xml(&listed));

        let mut config = config();
        config.site.entrypoints.clear();
        config.discovery.max_pages = 4;
        let discovery = Discoverer::new(&config).discover(&fetcher).await;
        assert_eq!(discovery.urls.len(), 4);
        assert_eq!(discovery.urls[0].url, listed[0]);
    }

    #[test]
    fn test_sitemap_locs_unescape() {
        let xml = "<urlset><url><loc> https://x.com/a?b=1&amp;c=2 </loc></url></urlset>";
        assert_eq!(sitemap_locs(&URL_ENTRY, xml), vec!["https://x.com/a?b=1&c=2"]);
        assert!(sitemap_locs(&SITEMAP_ENTRY, xml).is_empty());
    }
}
