//! `inci audit`

use anyhow::Result;
use colored::Colorize;
use inci_pipeline::{PipelineConfig, Tier};

use super::{print_json, Context, Outcome};

pub async fn run(ctx: &Context, slug: &str) -> Result<Outcome> {
    let site = ctx.load_site(slug)?;
    let engine = ctx.engine(PipelineConfig::default()).await?;

    let report = engine.audit_site(&site).await?;
    print_json(&report)?;

    let coverage = &report.coverage;
    eprintln!();
    eprintln!("{} audit", coverage.site_slug.bold());
    eprintln!(
        "  {} {}  {} {}  {} {}",
        Tier::VerifiedInci.as_str().green(),
        coverage.verified_inci_total,
        Tier::CatalogOnly.as_str().cyan(),
        coverage.catalog_only_total,
        Tier::Quarantined.as_str().red(),
        coverage.quarantined_total
    );
    for change in &report.changes {
        eprintln!(
            "  {} {} -> {}",
            change.canonical_url,
            change.from.as_str(),
            change.to.as_str().bold()
        );
    }
    Ok(Outcome::Success)
}
