//! `inci discover-and-extract`

use anyhow::Result;
use colored::Colorize;
use inci_pipeline::{CoverageStatus, OpenAiExtractor, PipelineConfig, SiteCoverage};
use tracing::info;

use super::{print_json, Context, Outcome};

pub async fn run(ctx: &Context, slug: &str, max_calls: Option<u32>) -> Result<Outcome> {
    let site = ctx.load_site(slug)?;

    let mut config = PipelineConfig::default();
    if let Some(max) = max_calls {
        config = config.with_max_model_calls(max);
    }

    let mut engine = ctx.engine(config).await?;
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let mut model = OpenAiExtractor::new(key);
            if let Ok(name) = std::env::var("INCI_MODEL") {
                model = model.with_model(name);
            }
            info!(model = %model.model(), "Model-assisted extraction enabled");
            engine = engine.with_model(model);
        }
        _ => info!("OPENAI_API_KEY not set, model-assisted extraction disabled"),
    }

    let coverage = engine.run_site(&site).await?;
    print_json(&coverage)?;
    print_summary(&coverage);

    if coverage.report.budget.denied_calls > 0 {
        eprintln!(
            "{}",
            format!(
                "Model budget exhausted: {} calls denied, partial results persisted",
                coverage.report.budget.denied_calls
            )
            .yellow()
        );
        return Ok(Outcome::Partial);
    }
    Ok(Outcome::Success)
}

fn print_summary(coverage: &SiteCoverage) {
    let status = match coverage.status {
        CoverageStatus::Done => coverage.status.as_str().green(),
        CoverageStatus::NeedsReview => coverage.status.as_str().yellow(),
        _ => coverage.status.as_str().red(),
    };
    eprintln!();
    eprintln!("{} {}", coverage.site_slug.bold(), status.bold());
    eprintln!(
        "  discovered {}  hair {}  kits {}  non-hair {}  other {}",
        coverage.discovered_total,
        coverage.hair_total,
        coverage.kits_total,
        coverage.non_hair_total,
        coverage.other_total
    );
    eprintln!(
        "  extracted {}  {} {}  {} {}  {} {}",
        coverage.extracted_total,
        "verified".green(),
        coverage.verified_inci_total,
        "catalog".cyan(),
        coverage.catalog_only_total,
        "quarantined".red(),
        coverage.quarantined_total
    );
    eprintln!(
        "  verified rate {:.1}%  model calls {}/{}",
        coverage.verified_inci_rate * 100.0,
        coverage.report.budget.total_calls,
        coverage.report.budget.max_calls
    );
    if coverage.report.stopped_early {
        eprintln!(
            "  {}",
            format!(
                "stopped early, {} products skipped",
                coverage.report.skipped_after_stop
            )
            .yellow()
        );
    }
}
