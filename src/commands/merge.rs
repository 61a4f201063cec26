// ABOUTME: Orchestrates the two-pass merge from input dump to output dump
// ABOUTME: Pass 1 builds the tenant registry, pass 2 streams the rewrite

use crate::config::FkRules;
use crate::dump::copy::{self, ROOT_SCHEMA};
use crate::dump::stream::{DumpReader, DumpWriter};
use crate::merge::registry::RegistryBuilder;
use crate::merge::rewrite::MergeHandler;
use crate::naming::ConventionNames;
use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

/// Drop repeats, keeping first-occurrence order.
fn dedup_warnings(warnings: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    warnings
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Run the full merge: scan, summarize, rewrite, report.
///
/// A fatal error aborts mid-stream; the partially written output must be
/// discarded by the operator.
pub fn merge(input: &Path, output: &Path, rules: &FkRules) -> Result<()> {
    let mut reader = DumpReader::open(input)?;

    tracing::info!("Scanning dump for tenants and table classification");
    println!("Scanning dump");
    let mut builder = RegistryBuilder::new();
    copy::scan(&mut reader, None, &mut builder)?;
    let registry = builder.finish();

    // Operator verification point before the destructive pass.
    println!("\n{registry}");
    tracing::info!(
        "Registered {} tenants; rewriting into the {} schema",
        registry.tenant_count(),
        ROOT_SCHEMA
    );

    reader.reset()?;
    let mut writer = DumpWriter::create(output)?;
    println!("Merging tenant schemas");

    let names = ConventionNames;
    let mut handler = MergeHandler::new(&registry, rules, &names);
    copy::scan(&mut reader, Some(&mut writer), &mut handler)?;
    writer.finish()?;

    let warnings = dedup_warnings(handler.into_warnings());
    println!("\nWarnings:");
    for warning in &warnings {
        println!("  {warning}");
    }
    println!("\nDONE");
    Ok(())
}
