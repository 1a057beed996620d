//! Collects provenance rows for one page.

use crate::types::evidence::{Evidence, ExtractionMethod};

/// Evidence rows recorded against a single source URL.
#[derive(Debug, Clone)]
pub struct EvidenceTracker {
    source_url: String,
    rows: Vec<Evidence>,
}

impl EvidenceTracker {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            rows: Vec::new(),
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Record that `field` was filled from `snippet`, found at `locator`.
    pub fn record(
        &mut self,
        field: &str,
        locator: &str,
        snippet: &str,
        method: ExtractionMethod,
    ) -> &Evidence {
        self.rows.push(Evidence::new(
            field,
            self.source_url.as_str(),
            locator,
            snippet,
            method,
        ));
        &self.rows[self.rows.len() - 1]
    }

    pub fn rows(&self) -> &[Evidence] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Evidence> {
        self.rows
    }
}
