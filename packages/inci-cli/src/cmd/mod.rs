//! Command implementations

pub mod audit;
pub mod discover;
pub mod labels;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use inci_pipeline::fetchers::FetcherExt;
use inci_pipeline::{
    CoverageEngine, HttpFetcher, LabelEngine, LabelRules, PipelineConfig, RateLimitedFetcher,
    SiteConfig, SqliteStore,
};
use serde::Serialize;

/// Requests per second against a single site.
const FETCH_RATE: u32 = 1;

/// Settings shared by every command.
pub struct Context {
    pub sites_dir: PathBuf,
    pub database_url: String,
    pub labels_path: Option<PathBuf>,
}

pub type Engine = CoverageEngine<RateLimitedFetcher<HttpFetcher>, SqliteStore>;

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Results were persisted but the model budget ran out
    Partial,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Partial => ExitCode::from(2),
        }
    }
}

impl Context {
    pub fn load_site(&self, slug: &str) -> Result<SiteConfig> {
        SiteConfig::load(&self.sites_dir, slug)
            .with_context(|| format!("Failed to load site config for '{}'", slug))
    }

    fn label_engine(&self) -> Result<LabelEngine> {
        let rules = match &self.labels_path {
            Some(path) => LabelRules::load(path)?,
            None => LabelRules::bundled()?,
        };
        Ok(LabelEngine::new(rules))
    }

    /// Build an engine over the HTTP fetcher and the SQLite store.
    pub async fn engine(&self, config: PipelineConfig) -> Result<Engine> {
        let store = SqliteStore::new(&self.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", self.database_url))?;
        let fetcher = HttpFetcher::new()?.rate_limited(FETCH_RATE);

        Ok(CoverageEngine::new(fetcher, store, self.label_engine()?).with_config(config))
    }
}

/// Print a report as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
