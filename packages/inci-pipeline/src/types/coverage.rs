//! Per-site coverage counters and report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::quality::Tier;

/// Run status of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    #[default]
    Active,
    NeedsReview,
    Blocked,
    Done,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::NeedsReview => "needs_review",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "needs_review" => Some(Self::NeedsReview),
            "blocked" => Some(Self::Blocked),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Model budget usage for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub max_calls: u32,
    pub total_calls: u32,
    pub denied_calls: u32,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub budget_remaining: u32,
    /// A model call was denied for lack of budget
    pub budget_exceeded: bool,
}

/// Structured report blob stored alongside the counters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageReport {
    /// URLs handed to fetch
    pub attempted_total: u32,
    /// Fetch failures after retries (discovery losses)
    pub fetch_failures: u32,
    /// URLs skipped because their host was not allow-listed
    pub skipped_disallowed: u32,
    /// Product URLs never attempted because the line was stopped
    pub skipped_after_stop: u32,
    pub stopped_early: bool,
    /// Stored records an audit skipped because the last run did not extract them
    #[serde(default)]
    pub stale_products: u32,
    pub budget: BudgetSummary,
    #[serde(default)]
    pub errors: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One row per site, overwritten each run. Only the orchestrator writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCoverage {
    pub site_slug: String,
    pub discovered_total: u32,
    /// Product and category URLs
    pub hair_total: u32,
    pub kits_total: u32,
    pub non_hair_total: u32,
    pub other_total: u32,
    pub extracted_total: u32,
    pub verified_inci_total: u32,
    pub catalog_only_total: u32,
    pub quarantined_total: u32,
    pub verified_inci_rate: f64,
    pub status: CoverageStatus,
    pub report: CoverageReport,
    pub updated_at: DateTime<Utc>,
}

impl SiteCoverage {
    pub fn new(site_slug: impl Into<String>) -> Self {
        Self {
            site_slug: site_slug.into(),
            discovered_total: 0,
            hair_total: 0,
            kits_total: 0,
            non_hair_total: 0,
            other_total: 0,
            extracted_total: 0,
            verified_inci_total: 0,
            catalog_only_total: 0,
            quarantined_total: 0,
            verified_inci_rate: 0.0,
            status: CoverageStatus::Active,
            report: CoverageReport::default(),
            updated_at: Utc::now(),
        }
    }

    /// Count one extracted product in its tier.
    pub fn record_tier(&mut self, tier: Tier) {
        self.extracted_total += 1;
        match tier {
            Tier::VerifiedInci => self.verified_inci_total += 1,
            Tier::CatalogOnly => self.catalog_only_total += 1,
            Tier::Quarantined => self.quarantined_total += 1,
        }
    }

    /// Share of extracted products that ended quarantined.
    pub fn failure_rate(&self) -> f64 {
        if self.extracted_total == 0 {
            return 0.0;
        }
        f64::from(self.quarantined_total) / f64::from(self.extracted_total)
    }

    /// `verified_inci_total / max(extracted_total, 1)`.
    pub fn compute_verified_rate(&self) -> f64 {
        f64::from(self.verified_inci_total) / f64::from(self.extracted_total.max(1))
    }

    /// Close the run with a final status.
    pub fn finish(&mut self, status: CoverageStatus) {
        self.verified_inci_rate = self.compute_verified_rate();
        self.status = status;
        let now = Utc::now();
        self.report.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Reset tier totals before a recount (audit).
    pub fn reset_tiers(&mut self) {
        self.extracted_total = 0;
        self.verified_inci_total = 0;
        self.catalog_only_total = 0;
        self.quarantined_total = 0;
    }
}
