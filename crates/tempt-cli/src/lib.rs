//! Helpers behind the `tempt` command-line client.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tempt_core::access::Feature;
use tempt_core::models::PlanTier;
use tempt_core::{LayoutItem, LayoutResult, MasonryLayout};

/// One feature and the tiers that unlock it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRow {
    pub feature: Feature,
    pub required_plan: PlanTier,
    pub allowed: Vec<PlanTier>,
}

/// The full plan-by-feature table.
pub fn access_matrix() -> Vec<AccessRow> {
    Feature::ALL
        .iter()
        .map(|feature| AccessRow {
            feature: *feature,
            required_plan: feature.required_plan(),
            allowed: feature.allowed_plans().to_vec(),
        })
        .collect()
}

/// Plain-text rendering: one row per feature, one column per tier.
pub fn render_access_matrix(rows: &[AccessRow]) -> String {
    let mut out = format!("{:<22}", "feature");
    for tier in PlanTier::ALL {
        out.push_str(&format!("{:>10}", tier.as_str()));
    }
    out.push('\n');

    for row in rows {
        out.push_str(&format!("{:<22}", row.feature.as_str()));
        for tier in PlanTier::ALL {
            let mark = if row.allowed.contains(&tier) { "yes" } else { "-" };
            out.push_str(&format!("{:>10}", mark));
        }
        out.push('\n');
    }
    out
}

/// Lay out items read from a JSON array of `{id, width, height}` objects.
pub fn layout_from_file(path: &Path, container_width: u32, gap: f64) -> Result<LayoutResult> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let items: Vec<LayoutItem> =
        serde_json::from_str(&raw).context("Expected a JSON array of layout items")?;
    let layout = MasonryLayout::fit(container_width, gap)?;
    Ok(layout.compute(&items))
}

pub fn print_json(value: &impl Serialize) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}
