//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::traits::store::ProductStore;
use crate::types::{
    coverage::SiteCoverage,
    evidence::Evidence,
    labels::LabelResult,
    product::{ProductRecord, StoredProduct},
    quality::{QuarantineDetail, ReviewStatus},
};

#[derive(Default)]
struct State {
    /// Keyed by canonical URL so site listings come out ordered
    products: BTreeMap<String, StoredProduct>,
    evidence: HashMap<String, Vec<Evidence>>,
    quarantine: HashMap<String, QuarantineDetail>,
    coverage: HashMap<String, SiteCoverage>,
}

/// In-memory product store.
///
/// Clones share state, so a test can keep a handle while the engine owns
/// another. Data is lost on drop.
#[derive(Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product_count(&self) -> usize {
        self.state.read().unwrap().products.len()
    }

    pub fn evidence_count(&self) -> usize {
        self.state.read().unwrap().evidence.values().map(Vec::len).sum()
    }

    pub fn quarantine_count(&self) -> usize {
        self.state.read().unwrap().quarantine.len()
    }

    /// Record a reviewer decision on a quarantined product.
    pub fn set_review_status(&self, canonical_url: &str, status: ReviewStatus) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let detail = state
            .quarantine
            .get_mut(canonical_url)
            .ok_or_else(|| StoreError::NotFound(canonical_url.to_string()))?;
        detail.review_status = status;
        Ok(())
    }

    pub fn clear(&self) {
        *self.state.write().unwrap() = State::default();
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn upsert_product(
        &self,
        record: &ProductRecord,
        evidence: &[Evidence],
    ) -> StoreResult<String> {
        let mut state = self.state.write().unwrap();
        let now = Utc::now();
        let url = record.canonical_url.clone();

        let id = match state.products.get_mut(&url) {
            Some(existing) => {
                existing.record = record.clone();
                existing.updated_at = now;
                existing.id.clone()
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                state.products.insert(
                    url.clone(),
                    StoredProduct {
                        id: id.clone(),
                        record: record.clone(),
                        created_at: now,
                        updated_at: now,
                    },
                );
                id
            }
        };

        state
            .evidence
            .entry(url)
            .or_default()
            .extend_from_slice(evidence);
        Ok(id)
    }

    async fn write_quarantine_detail(&self, detail: &QuarantineDetail) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let mut detail = detail.clone();
        if let Some(previous) = state.quarantine.get(&detail.canonical_url) {
            if previous.review_status != ReviewStatus::Pending {
                detail.review_status = previous.review_status;
                detail.created_at = previous.created_at;
            }
        }
        state.quarantine.insert(detail.canonical_url.clone(), detail);
        Ok(())
    }

    async fn clear_quarantine_detail(&self, canonical_url: &str) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let pending = state
            .quarantine
            .get(canonical_url)
            .is_some_and(|d| d.review_status == ReviewStatus::Pending);
        if pending {
            state.quarantine.remove(canonical_url);
        }
        Ok(())
    }

    async fn upsert_site_coverage(&self, coverage: &SiteCoverage) -> StoreResult<()> {
        self.state
            .write()
            .unwrap()
            .coverage
            .insert(coverage.site_slug.clone(), coverage.clone());
        Ok(())
    }

    async fn get_product(&self, canonical_url: &str) -> StoreResult<Option<StoredProduct>> {
        Ok(self.state.read().unwrap().products.get(canonical_url).cloned())
    }

    async fn get_products_for_site(&self, site_slug: &str) -> StoreResult<Vec<StoredProduct>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .products
            .values()
            .filter(|p| p.record.site_slug == site_slug)
            .cloned()
            .collect())
    }

    async fn get_evidence(&self, canonical_url: &str) -> StoreResult<Vec<Evidence>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .evidence
            .get(canonical_url)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_quarantine_detail(
        &self,
        canonical_url: &str,
    ) -> StoreResult<Option<QuarantineDetail>> {
        Ok(self.state.read().unwrap().quarantine.get(canonical_url).cloned())
    }

    async fn get_site_coverage(&self, site_slug: &str) -> StoreResult<Option<SiteCoverage>> {
        Ok(self.state.read().unwrap().coverage.get(site_slug).cloned())
    }

    async fn update_labels(
        &self,
        canonical_url: &str,
        labels: &LabelResult,
        evidence: &[Evidence],
    ) -> StoreResult<()> {
        let mut state = self.state.write().unwrap();
        let product = state
            .products
            .get_mut(canonical_url)
            .ok_or_else(|| StoreError::NotFound(canonical_url.to_string()))?;
        product.record.labels = labels.clone();
        product.updated_at = Utc::now();

        state
            .evidence
            .entry(canonical_url.to_string())
            .or_default()
            .extend_from_slice(evidence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::evidence::ExtractionMethod;
    use crate::types::quality::Tier;

    fn record(url: &str) -> ProductRecord {
        let mut record = ProductRecord::new("amend", url);
        record.product_name = Some("Shampoo Gold".into());
        record
    }

    fn evidence(url: &str) -> Evidence {
        Evidence::new("product_name", url, "h1", "Shampoo Gold", ExtractionMethod::Selector)
    }

    fn detail(url: &str) -> QuarantineDetail {
        QuarantineDetail {
            canonical_url: url.into(),
            site_slug: "amend".into(),
            rejection_code: "no_image".into(),
            rejection_reason: "no_image".into(),
            review_status: ReviewStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_id_and_appends_evidence() {
        let store = MemoryStore::new();
        let url = "https://amend.com.br/shampoo-gold";

        let first = store.upsert_product(&record(url), &[evidence(url)]).await.unwrap();
        let mut changed = record(url);
        changed.tier = Tier::VerifiedInci;
        let second = store.upsert_product(&changed, &[evidence(url)]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.product_count(), 1);
        assert_eq!(store.get_evidence(url).await.unwrap().len(), 2);
        let stored = store.get_product(url).await.unwrap().unwrap();
        assert_eq!(stored.record.tier, Tier::VerifiedInci);
    }

    #[tokio::test]
    async fn test_products_for_site_are_ordered() {
        let store = MemoryStore::new();
        store.upsert_product(&record("https://amend.com.br/b"), &[]).await.unwrap();
        store.upsert_product(&record("https://amend.com.br/a"), &[]).await.unwrap();
        store
            .upsert_product(&ProductRecord::new("other", "https://other.com/c"), &[])
            .await
            .unwrap();

        let urls: Vec<String> = store
            .get_products_for_site("amend")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.record.canonical_url)
            .collect();
        assert_eq!(urls, vec!["https://amend.com.br/a", "https://amend.com.br/b"]);
    }

    #[tokio::test]
    async fn test_reviewed_quarantine_survives_rewrite_and_clear() {
        let store = MemoryStore::new();
        let url = "https://amend.com.br/mascara";
        store.write_quarantine_detail(&detail(url)).await.unwrap();
        store.set_review_status(url, ReviewStatus::Approved).unwrap();

        store.write_quarantine_detail(&detail(url)).await.unwrap();
        let stored = store.get_quarantine_detail(url).await.unwrap().unwrap();
        assert_eq!(stored.review_status, ReviewStatus::Approved);

        store.clear_quarantine_detail(url).await.unwrap();
        assert!(store.get_quarantine_detail(url).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_pending_quarantine_is_cleared() {
        let store = MemoryStore::new();
        let url = "https://amend.com.br/mascara";
        store.write_quarantine_detail(&detail(url)).await.unwrap();
        store.clear_quarantine_detail(url).await.unwrap();
        assert_eq!(store.quarantine_count(), 0);
    }

    #[tokio::test]
    async fn test_update_labels_requires_product() {
        let store = MemoryStore::new();
        let err = store
            .update_labels("https://amend.com.br/missing", &LabelResult::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
