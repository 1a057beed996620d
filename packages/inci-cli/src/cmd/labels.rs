//! `inci labels`

use anyhow::Result;
use colored::Colorize;
use inci_pipeline::PipelineConfig;

use super::{print_json, Context, Outcome};

pub async fn run(ctx: &Context, slug: &str, dry_run: bool) -> Result<Outcome> {
    let engine = ctx.engine(PipelineConfig::default()).await?;
    let updates = engine.relabel_site(slug, dry_run).await?;
    print_json(&updates)?;

    let changed: Vec<_> = updates.iter().filter(|u| u.changed()).collect();
    eprintln!();
    eprintln!(
        "{} {} products, {} changed{}",
        slug.bold(),
        updates.len(),
        changed.len(),
        if dry_run { " (dry run)".yellow().to_string() } else { String::new() }
    );
    for update in changed {
        let seals: Vec<&str> = update.labels.all_seals().collect();
        eprintln!("  {} [{}]", update.canonical_url, seals.join(", "));
    }
    Ok(Outcome::Success)
}
