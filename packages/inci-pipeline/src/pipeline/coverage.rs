//! The coverage engine: per-site orchestration.
//!
//! A site run is sequential: discover, classify, then for every product URL
//! fetch, extract, gate, label and persist, counting as it goes. The run
//! halts early ("stop-the-line") once enough products have been extracted
//! and the quarantined share exceeds the configured ratio. Remaining URLs
//! are counted as skipped, and partial results stay persisted.
//!
//! The engine is the only writer of [`SiteCoverage`].
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = CoverageEngine::new(fetcher, store, LabelEngine::bundled()?)
//!     .with_config(PipelineConfig::default().with_max_model_calls(20))
//!     .with_model(OpenAiExtractor::from_env()?);
//!
//! let coverage = engine.run_site(&site_config).await?;
//! println!("{}", serde_json::to_string_pretty(&coverage)?);
//! ```

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};
use crate::pipeline::budget::BudgetTracker;
use crate::pipeline::discover::Discoverer;
use crate::pipeline::extract::Extractor;
use crate::pipeline::labels::{LabelDetection, LabelEngine, LabelInput};
use crate::pipeline::quality::{GateInput, GateOutcome, QualityGate};
use crate::pipeline::taxonomy;
use crate::traits::fetcher::{FetchedPage, PageFetcher};
use crate::traits::model::ModelExtractor;
use crate::traits::store::ProductStore;
use crate::types::{
    config::PipelineConfig,
    coverage::{CoverageStatus, SiteCoverage},
    labels::LabelResult,
    product::{Field, ProductRecord, RawExtraction, UrlKind},
    quality::{QuarantineDetail, Tier},
    site::{SiteConfig, SiteStatus},
};

/// Orchestrates site runs over a fetcher, a store and an optional model.
pub struct CoverageEngine<F: PageFetcher, S: ProductStore> {
    fetcher: F,
    store: S,
    model: Option<Box<dyn ModelExtractor>>,
    labels: LabelEngine,
    config: PipelineConfig,
}

/// A product whose tier changed during an audit.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TierChange {
    pub canonical_url: String,
    pub from: Tier,
    pub to: Tier,
}

/// Outcome of re-gating stored records.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditReport {
    pub coverage: SiteCoverage,
    pub changes: Vec<TierChange>,
}

/// Recomputed labels for one stored product.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LabelUpdate {
    pub canonical_url: String,
    pub previous: LabelResult,
    pub labels: LabelResult,
    pub evidence_rows: usize,
}

impl LabelUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.labels
    }
}

impl<F: PageFetcher, S: ProductStore> CoverageEngine<F, S> {
    /// Create an engine with default config and no model (Tier 2 disabled).
    pub fn new(fetcher: F, store: S, labels: LabelEngine) -> Self {
        Self {
            fetcher,
            store,
            model: None,
            labels,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable model-assisted extraction.
    pub fn with_model(mut self, model: impl ModelExtractor + 'static) -> Self {
        self.model = Some(Box::new(model));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    // =========================================================================
    // Site run
    // =========================================================================

    /// Discover and process one site, then write its coverage row.
    ///
    /// Only configuration and storage failures are errors. Fetch and model
    /// failures degrade single pages or fields.
    pub async fn run_site(&self, site: &SiteConfig) -> Result<SiteCoverage> {
        site.validate()?;
        let slug = site.slug();
        let mut coverage = SiteCoverage::new(slug);
        coverage.report.started_at = Some(Utc::now());

        if site.site.status != SiteStatus::Active {
            warn!(site = %slug, status = ?site.site.status, "Site is not active, skipping run");
            coverage.report.errors.push(format!("site status is {:?}", site.site.status));
            coverage.finish(CoverageStatus::Blocked);
            self.store.upsert_site_coverage(&coverage).await?;
            return Ok(coverage);
        }

        // Counters are scoped to this run
        let mut budget = BudgetTracker::new(self.config.max_model_calls);
        let extractor = Extractor::new(site.extraction.clone(), &self.config);
        let gate = QualityGate::new(&site.site.allowed_domains, &self.config);

        info!(site = %slug, max_model_calls = self.config.max_model_calls, "Starting site run");

        let discovery = Discoverer::new(site).discover(&self.fetcher).await;
        coverage.discovered_total = discovery.urls.len() as u32;
        coverage.hair_total =
            (discovery.count(UrlKind::Product) + discovery.count(UrlKind::Category)) as u32;
        coverage.kits_total = discovery.count(UrlKind::Kit) as u32;
        coverage.non_hair_total = discovery.count(UrlKind::NonHair) as u32;
        coverage.other_total = discovery.count(UrlKind::Other) as u32;
        coverage.report.errors.extend(discovery.errors.iter().cloned());

        info!(
            site = %slug,
            discovered = coverage.discovered_total,
            products = discovery.count(UrlKind::Product),
            "Discovery complete"
        );

        let mut stopped = false;
        for candidate in discovery.products() {
            let url = candidate.url.as_str();
            if stopped {
                coverage.report.skipped_after_stop += 1;
                continue;
            }
            if !site.site.allows_url(url) {
                debug!(site = %slug, url = %url, "Skipping URL outside allowed domains");
                coverage.report.skipped_disallowed += 1;
                continue;
            }

            coverage.report.attempted_total += 1;
            let page = match self.fetch(url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(site = %slug, url = %url, error = %e, "Fetch failed, skipping URL");
                    coverage.report.fetch_failures += 1;
                    coverage.report.errors.push(format!("fetch {}: {}", url, e));
                    continue;
                }
            };

            let raw = extractor
                .extract(url, &page, self.model.as_deref(), &mut budget)
                .await;
            let tier = self.persist_extraction(slug, &gate, raw).await?;
            coverage.record_tier(tier);

            if self.should_stop(&coverage) {
                warn!(
                    site = %slug,
                    extracted = coverage.extracted_total,
                    quarantined = coverage.quarantined_total,
                    ratio = self.config.stop_the_line_ratio,
                    "Stop-the-line: failure rate exceeded, halting site run"
                );
                stopped = true;
            }
        }

        coverage.report.stopped_early = stopped;
        coverage.report.budget = budget.summary();
        coverage.finish(if stopped {
            CoverageStatus::NeedsReview
        } else {
            CoverageStatus::Done
        });
        self.store.upsert_site_coverage(&coverage).await?;

        info!(
            site = %slug,
            status = coverage.status.as_str(),
            extracted = coverage.extracted_total,
            verified_inci = coverage.verified_inci_total,
            catalog_only = coverage.catalog_only_total,
            quarantined = coverage.quarantined_total,
            model_calls = budget.total_calls(),
            "Site run complete"
        );
        Ok(coverage)
    }

    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, FetchError> {
        match tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
        }
    }

    fn should_stop(&self, coverage: &SiteCoverage) -> bool {
        coverage.extracted_total >= self.config.stop_the_line_min_sample
            && coverage.failure_rate() > self.config.stop_the_line_ratio
    }

    /// Gate, label and persist one extraction. Returns its tier.
    async fn persist_extraction(
        &self,
        slug: &str,
        gate: &QualityGate,
        raw: RawExtraction,
    ) -> Result<Tier> {
        let url = raw.url.clone();
        let name = raw.name().unwrap_or_default();
        let description = raw.description().unwrap_or_default();
        let hair_reason = taxonomy::product_hair_relevance(name, &url, description);

        let outcome = gate.evaluate(&GateInput::from_raw(&raw, hair_reason.as_deref()));
        let previous = self.store.get_product(&url).await?;

        let mut record = build_record(slug, &raw, hair_reason, &outcome);
        let detection = self.labels.detect(&url, &label_input(&record));
        record.labels = match &previous {
            Some(stored) => detection.result.clone().preserving_review(&stored.record.labels),
            None => detection.result.clone(),
        };

        let mut evidence = raw.evidence;
        evidence.extend(detection.evidence);
        self.store.upsert_product(&record, &evidence).await?;
        self.sync_quarantine(slug, &url, &outcome).await?;

        debug!(
            site = %slug,
            url = %url,
            tier = ?record.tier,
            reason = ?outcome.qa.rejection_reason,
            seals = record.labels.detected.len() + record.labels.inferred.len(),
            "Product processed"
        );
        Ok(record.tier)
    }

    async fn sync_quarantine(&self, slug: &str, url: &str, outcome: &GateOutcome) -> Result<()> {
        if outcome.tier() == Tier::Quarantined {
            let detail = QuarantineDetail::from_qa(slug, url, &outcome.qa);
            self.store.write_quarantine_detail(&detail).await?;
        } else {
            self.store.clear_quarantine_detail(url).await?;
        }
        Ok(())
    }

    // =========================================================================
    // Replays over stored records
    // =========================================================================

    /// Re-run the quality gate over stored records without fetching.
    ///
    /// Only records extracted by the site's last run are audited, so tier
    /// totals stay within the discovery counters that run wrote. Older
    /// records are left untouched and counted as stale. When a tier or the
    /// verified ingredient list changes, labels are recomputed (reviewer
    /// decisions kept) so no seal outlives the list it was inferred from.
    pub async fn audit_site(&self, site: &SiteConfig) -> Result<AuditReport> {
        site.validate()?;
        let slug = site.slug();
        let gate = QualityGate::new(&site.site.allowed_domains, &self.config);

        let mut coverage = self
            .store
            .get_site_coverage(slug)
            .await?
            .unwrap_or_else(|| SiteCoverage::new(slug));
        let last_run = coverage.report.started_at;
        coverage.reset_tiers();
        coverage.report.stale_products = 0;

        let mut changes = Vec::new();
        for stored in self.store.get_products_for_site(slug).await? {
            let mut record = stored.record;
            if last_run.is_some_and(|started| record.extracted_at < started) {
                coverage.report.stale_products += 1;
                continue;
            }

            let outcome = gate.evaluate(&GateInput::from_record(&record));
            let ingredients = outcome.verified_ingredients().map(<[String]>::to_vec);

            if outcome.tier() != record.tier || ingredients != record.ingredients {
                if outcome.tier() != record.tier {
                    changes.push(TierChange {
                        canonical_url: record.canonical_url.clone(),
                        from: record.tier,
                        to: outcome.tier(),
                    });
                }
                record.tier = outcome.tier();
                record.ingredients = ingredients;

                let LabelDetection { result, evidence } =
                    self.labels.detect(&record.canonical_url, &label_input(&record));
                record.labels = result.preserving_review(&record.labels);
                self.store.upsert_product(&record, &evidence).await?;
            }
            self.sync_quarantine(slug, &record.canonical_url, &outcome).await?;
            coverage.record_tier(record.tier);
        }

        if coverage.report.stale_products > 0 {
            debug!(
                site = %slug,
                stale = coverage.report.stale_products,
                "Skipped records not seen in the last run"
            );
        }

        let status = match coverage.status {
            CoverageStatus::Active => CoverageStatus::Done,
            other => other,
        };
        coverage.finish(status);
        self.store.upsert_site_coverage(&coverage).await?;

        info!(
            site = %slug,
            audited = coverage.extracted_total,
            changed = changes.len(),
            stale = coverage.report.stale_products,
            "Audit complete"
        );
        Ok(AuditReport { coverage, changes })
    }

    /// Re-run the label engine over stored records.
    ///
    /// Reviewer decisions are preserved. With `dry_run`, nothing is written.
    pub async fn relabel_site(&self, slug: &str, dry_run: bool) -> Result<Vec<LabelUpdate>> {
        let mut updates = Vec::new();
        for stored in self.store.get_products_for_site(slug).await? {
            let record = stored.record;
            let LabelDetection { result, evidence } =
                self.labels.detect(&record.canonical_url, &label_input(&record));
            let labels = result.preserving_review(&record.labels);

            if !dry_run {
                self.store
                    .update_labels(&record.canonical_url, &labels, &evidence)
                    .await?;
            }
            updates.push(LabelUpdate {
                canonical_url: record.canonical_url.clone(),
                previous: record.labels,
                labels,
                evidence_rows: evidence.len(),
            });
        }

        info!(
            site = %slug,
            products = updates.len(),
            changed = updates.iter().filter(|u| u.changed()).count(),
            dry_run,
            "Relabel complete"
        );
        Ok(updates)
    }
}

/// Assemble the persisted record from an extraction and its gate outcome.
fn build_record(
    slug: &str,
    raw: &RawExtraction,
    hair_relevance_reason: Option<String>,
    outcome: &GateOutcome,
) -> ProductRecord {
    let name = raw.name().unwrap_or_default();
    let mut record = ProductRecord::new(slug, raw.url.as_str());
    record.product_name = raw.name().map(str::to_string);
    record.brand = raw.brand.clone();
    record.image_url_main = raw.image_url().map(str::to_string);
    record.image_urls_gallery = raw.gallery.clone();
    record.description = raw.description().map(str::to_string);
    record.image_texts = raw.image_texts.clone();
    record.price = raw.price.as_ref().map(|p| p.value);
    record.currency = raw.currency.clone();
    record.product_type = taxonomy::normalize_product_type(name).map(str::to_string);
    record.gender_target = taxonomy::detect_gender_target(name, &raw.url);
    record.hair_relevance_reason = hair_relevance_reason;
    record.ingredients_raw = raw.ingredients_text().map(str::to_string);
    record.ingredients = outcome.verified_ingredients().map(<[String]>::to_vec);
    record.ingredients_method = raw.method_of(Field::Ingredients);
    record.tier = outcome.tier();
    record.confidence = raw.confidence();
    record
}

fn label_input(record: &ProductRecord) -> LabelInput<'_> {
    LabelInput {
        product_name: record.product_name.as_deref(),
        description: record.description.as_deref(),
        image_texts: &record.image_texts,
        ingredients: record.ingredients.as_deref(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{MockModel, ProductPage, TestSite};

    const INCI: &str = "Aqua, Sodium Laureth Sulfate, Cocamidopropyl Betaine, Glycerin, Parfum, Citric Acid";

    fn engine(site: &TestSite) -> CoverageEngine<crate::fetchers::MockFetcher, MemoryStore> {
        CoverageEngine::new(
            site.fetcher.clone(),
            MemoryStore::new(),
            LabelEngine::bundled().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_run_assigns_tiers_and_writes_coverage() {
        let site = TestSite::new("amend", "amend.com.br")
            .with_product(
                "/shampoo-gold-black-300ml",
                ProductPage::new("Shampoo Gold Black").with_ingredients(INCI),
            )
            .with_product("/condicionador-gold-250ml", ProductPage::new("Condicionador Gold"))
            .with_product(
                "/mascara-gold-500g",
                ProductPage::new("Máscara Gold").without_image(),
            );
        let engine = engine(&site);

        let coverage = engine.run_site(&site.config).await.unwrap();
        assert_eq!(coverage.status, CoverageStatus::Done);
        assert_eq!(coverage.discovered_total, 3);
        assert_eq!(coverage.extracted_total, 3);
        assert_eq!(coverage.verified_inci_total, 1);
        assert_eq!(coverage.catalog_only_total, 1);
        assert_eq!(coverage.quarantined_total, 1);
        assert!((coverage.verified_inci_rate - 1.0 / 3.0).abs() < 1e-9);

        let store = engine.store();
        let verified = store
            .get_product(&site.url("/shampoo-gold-black-300ml"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(verified.record.tier, Tier::VerifiedInci);
        assert_eq!(verified.record.ingredients.as_ref().map(Vec::len), Some(6));
        assert_eq!(verified.record.product_type.as_deref(), Some("shampoo"));
        assert!(verified.record.labels.inferred.contains("silicone_free"));

        let detail = store
            .get_quarantine_detail(&site.url("/mascara-gold-500g"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(detail.rejection_code, "no_image");

        let stored = store.get_site_coverage("amend").await.unwrap().unwrap();
        assert_eq!(stored, coverage);
    }

    #[tokio::test]
    async fn test_inactive_site_is_blocked_without_fetching() {
        let mut site = TestSite::new("paused", "paused.com.br")
            .with_product("/shampoo-300ml", ProductPage::new("Shampoo"));
        site.config.site.status = SiteStatus::Paused;
        let engine = engine(&site);

        let coverage = engine.run_site(&site.config).await.unwrap();
        assert_eq!(coverage.status, CoverageStatus::Blocked);
        assert_eq!(site.fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failures_are_counted_and_skipped() {
        let site = TestSite::new("amend", "amend.com.br")
            .with_broken_product("/shampoo-quebrado-300ml")
            .with_product("/shampoo-gold-300ml", ProductPage::new("Shampoo Gold"));
        let engine = engine(&site);

        let coverage = engine.run_site(&site.config).await.unwrap();
        assert_eq!(coverage.report.attempted_total, 2);
        assert_eq!(coverage.report.fetch_failures, 1);
        assert_eq!(coverage.extracted_total, 1);
        assert_eq!(coverage.status, CoverageStatus::Done);
    }

    #[tokio::test]
    async fn test_disallowed_hosts_are_not_fetched() {
        let site = TestSite::new("amend", "amend.com.br")
            .with_listed_url("https://cdn.other.com/shampoo-gold-300ml")
            .with_product("/shampoo-gold-300ml", ProductPage::new("Shampoo Gold"));
        let engine = engine(&site);

        let coverage = engine.run_site(&site.config).await.unwrap();
        assert_eq!(coverage.report.skipped_disallowed, 1);
        assert!(!site.fetcher.was_fetched("https://cdn.other.com/shampoo-gold-300ml"));
    }

    #[tokio::test]
    async fn test_model_budget_is_reported() {
        let site = TestSite::new("amend", "amend.com.br")
            .with_product("/shampoo-a-300ml", ProductPage::new("Shampoo A"))
            .with_product("/shampoo-b-300ml", ProductPage::new("Shampoo B"));
        let model = MockModel::new().with_usage(1000, 50);
        let engine = engine(&site)
            .with_config(PipelineConfig::default().with_max_model_calls(1))
            .with_model(model.clone());

        let coverage = engine.run_site(&site.config).await.unwrap();
        let budget = coverage.report.budget;
        assert_eq!(model.call_count(), 1);
        assert_eq!(budget.total_calls, 1);
        assert_eq!(budget.denied_calls, 1);
        assert_eq!(budget.total_input_tokens, 1000);
        assert!(budget.budget_exceeded);
    }

    #[tokio::test]
    async fn test_run_without_model_never_exceeds_budget() {
        let site = TestSite::new("amend", "amend.com.br")
            .with_product("/shampoo-a-300ml", ProductPage::new("Shampoo A"));
        let engine = engine(&site).with_config(PipelineConfig::default().with_max_model_calls(0));

        let coverage = engine.run_site(&site.config).await.unwrap();
        assert_eq!(coverage.report.budget.denied_calls, 0);
        assert!(!coverage.report.budget.budget_exceeded);
    }

    #[tokio::test]
    async fn test_audit_replays_gate_without_fetching() {
        let site = TestSite::new("amend", "amend.com.br").with_product(
            "/shampoo-gold-300ml",
            ProductPage::new("Shampoo Gold").with_ingredients(INCI),
        );
        let engine = engine(&site);
        engine.run_site(&site.config).await.unwrap();
        site.fetcher.reset_calls();

        // A stricter threshold moves the product to quarantine
        let strict = CoverageEngine::new(
            site.fetcher.clone(),
            engine.store.clone(),
            LabelEngine::bundled().unwrap(),
        )
        .with_config(PipelineConfig::default().with_min_confidence(0.95));
        let report = strict.audit_site(&site.config).await.unwrap();

        assert_eq!(site.fetcher.fetch_count(), 0);
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].from, Tier::VerifiedInci);
        assert_eq!(report.changes[0].to, Tier::Quarantined);
        assert_eq!(report.coverage.quarantined_total, 1);
        assert_eq!(report.coverage.discovered_total, 1);

        let url = site.url("/shampoo-gold-300ml");
        let stored = strict.store().get_product(&url).await.unwrap().unwrap();
        assert!(stored.record.ingredients.is_none());
        let detail = strict.store().get_quarantine_detail(&url).await.unwrap().unwrap();
        assert_eq!(detail.rejection_reason, "low_confidence");
    }

    #[tokio::test]
    async fn test_audit_drops_seals_inferred_from_rejected_list() {
        let site = TestSite::new("amend", "amend.com.br").with_product(
            "/shampoo-gold-300ml",
            ProductPage::new("Shampoo Gold").with_ingredients(INCI),
        );
        let engine = engine(&site);
        engine.run_site(&site.config).await.unwrap();
        let url = site.url("/shampoo-gold-300ml");

        let before = engine.store().get_product(&url).await.unwrap().unwrap();
        assert!(before.record.labels.inferred.contains("silicone_free"));

        let strict = CoverageEngine::new(
            site.fetcher.clone(),
            engine.store.clone(),
            LabelEngine::bundled().unwrap(),
        )
        .with_config(PipelineConfig::default().with_min_confidence(0.95));
        strict.audit_site(&site.config).await.unwrap();

        let demoted = engine.store().get_product(&url).await.unwrap().unwrap();
        assert_eq!(demoted.record.tier, Tier::Quarantined);
        assert!(demoted.record.labels.inferred.is_empty());
        assert_eq!(demoted.record.labels.confidence, 0.0);

        // Auditing back at the default threshold restores the inferred seals
        engine.audit_site(&site.config).await.unwrap();
        let restored = engine.store().get_product(&url).await.unwrap().unwrap();
        assert_eq!(restored.record.tier, Tier::VerifiedInci);
        assert!(restored.record.labels.inferred.contains("silicone_free"));
    }

    #[tokio::test]
    async fn test_audit_keeps_extracted_within_discovered() {
        let mut site = TestSite::new("amend", "amend.com.br")
            .with_product("/shampoo-gold-300ml", ProductPage::new("Shampoo Gold"))
            .with_product("/shampoo-prata-300ml", ProductPage::new("Shampoo Prata"));
        let engine = engine(&site);
        engine.run_site(&site.config).await.unwrap();

        site.remove_from_sitemap("/shampoo-prata-300ml");
        let second = engine.run_site(&site.config).await.unwrap();
        assert_eq!(second.discovered_total, 1);
        assert_eq!(engine.store().product_count(), 2);

        let report = engine.audit_site(&site.config).await.unwrap();
        let coverage = report.coverage;
        assert_eq!(coverage.discovered_total, 1);
        assert_eq!(coverage.extracted_total, 1);
        assert!(coverage.extracted_total <= coverage.discovered_total);
        assert_eq!(coverage.report.stale_products, 1);
    }

    #[tokio::test]
    async fn test_relabel_dry_run_writes_nothing() {
        let site = TestSite::new("amend", "amend.com.br").with_product(
            "/shampoo-gold-300ml",
            ProductPage::new("Shampoo Gold")
                .with_ingredients(INCI)
                .with_description("Shampoo vegano"),
        );
        let engine = engine(&site);
        engine.run_site(&site.config).await.unwrap();
        let url = site.url("/shampoo-gold-300ml");
        let evidence_before = engine.store().get_evidence(&url).await.unwrap().len();

        let updates = engine.relabel_site("amend", true).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].labels.detected.contains("vegan"));
        assert!(!updates[0].changed());
        assert_eq!(engine.store().get_evidence(&url).await.unwrap().len(), evidence_before);

        engine.relabel_site("amend", false).await.unwrap();
        assert!(engine.store().get_evidence(&url).await.unwrap().len() > evidence_before);
    }
}
