//! Persistence capability.
//!
//! The pipeline writes through this trait and never defines a schema of
//! its own; `MemoryStore` and `SqliteStore` are reference backends.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{
    coverage::SiteCoverage,
    evidence::Evidence,
    labels::LabelResult,
    product::{ProductRecord, StoredProduct},
    quality::QuarantineDetail,
};

/// Store for product records, evidence, quarantine details and coverage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Insert or update by canonical URL, appending `evidence`.
    ///
    /// Returns the stable record id.
    async fn upsert_product(&self, record: &ProductRecord, evidence: &[Evidence])
        -> StoreResult<String>;

    /// Write the initial quarantine detail. Replaces any pending detail
    /// for the same URL; a reviewed detail keeps its review status.
    async fn write_quarantine_detail(&self, detail: &QuarantineDetail) -> StoreResult<()>;

    /// Remove a pending quarantine detail when a product leaves quarantine.
    async fn clear_quarantine_detail(&self, canonical_url: &str) -> StoreResult<()>;

    /// Overwrite the site's coverage row.
    async fn upsert_site_coverage(&self, coverage: &SiteCoverage) -> StoreResult<()>;

    /// Get a product by canonical URL.
    async fn get_product(&self, canonical_url: &str) -> StoreResult<Option<StoredProduct>>;

    /// Get all products for a site, ordered by canonical URL.
    async fn get_products_for_site(&self, site_slug: &str) -> StoreResult<Vec<StoredProduct>>;

    /// Evidence rows for a product, oldest first.
    async fn get_evidence(&self, canonical_url: &str) -> StoreResult<Vec<Evidence>>;

    /// Quarantine detail for a product, if any.
    async fn get_quarantine_detail(
        &self,
        canonical_url: &str,
    ) -> StoreResult<Option<QuarantineDetail>>;

    /// Coverage row for a site.
    async fn get_site_coverage(&self, site_slug: &str) -> StoreResult<Option<SiteCoverage>>;

    /// Replace a product's labels and append their evidence.
    async fn update_labels(
        &self,
        canonical_url: &str,
        labels: &LabelResult,
        evidence: &[Evidence],
    ) -> StoreResult<()>;
}

#[async_trait]
impl<S: ProductStore + ?Sized> ProductStore for std::sync::Arc<S> {
    async fn upsert_product(
        &self,
        record: &ProductRecord,
        evidence: &[Evidence],
    ) -> StoreResult<String> {
        (**self).upsert_product(record, evidence).await
    }

    async fn write_quarantine_detail(&self, detail: &QuarantineDetail) -> StoreResult<()> {
        (**self).write_quarantine_detail(detail).await
    }

    async fn clear_quarantine_detail(&self, canonical_url: &str) -> StoreResult<()> {
        (**self).clear_quarantine_detail(canonical_url).await
    }

    async fn upsert_site_coverage(&self, coverage: &SiteCoverage) -> StoreResult<()> {
        (**self).upsert_site_coverage(coverage).await
    }

    async fn get_product(&self, canonical_url: &str) -> StoreResult<Option<StoredProduct>> {
        (**self).get_product(canonical_url).await
    }

    async fn get_products_for_site(&self, site_slug: &str) -> StoreResult<Vec<StoredProduct>> {
        (**self).get_products_for_site(site_slug).await
    }

    async fn get_evidence(&self, canonical_url: &str) -> StoreResult<Vec<Evidence>> {
        (**self).get_evidence(canonical_url).await
    }

    async fn get_quarantine_detail(
        &self,
        canonical_url: &str,
    ) -> StoreResult<Option<QuarantineDetail>> {
        (**self).get_quarantine_detail(canonical_url).await
    }

    async fn get_site_coverage(&self, site_slug: &str) -> StoreResult<Option<SiteCoverage>> {
        (**self).get_site_coverage(site_slug).await
    }

    async fn update_labels(
        &self,
        canonical_url: &str,
        labels: &LabelResult,
        evidence: &[Evidence],
    ) -> StoreResult<()> {
        (**self).update_labels(canonical_url, labels, evidence).await
    }
}
