//! chemres - chemical identifier resolver
//!
//! Resolves names, CAS numbers, SMILES and InChIKeys to PubChem CIDs and
//! writes standardized compound records as CSV.
//!
//! # Usage
//!
//! ```bash
//! # Identifier to CID table
//! chemres resolve d-limonene 98-86-2 "(+)-carvone"
//!
//! # Records for known CIDs
//! chemres enrich 7410 6184 --output records.csv
//!
//! # Both steps, identifiers from a file, gentler on the service
//! chemres run --input identifiers.txt --min-interval-ms 500 -o records.csv
//! ```
//!
//! Diagnostics (unmatched, ambiguous, failed, skipped) go to stderr as JSON.
//! Ctrl-C cancels outstanding lookups and still writes partial results.

mod config;
mod table;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Result};
use chemres_core::{
    CancellationToken, ChemicalRecord, Cid, DiagnosticsReport, HttpTransport, Resolver,
};
use clap::Parser;
use config::{read_lines, Cli, Command, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = cli.resolver_config()?;
    tracing::debug!(base_url = %config.service.base_url, "Loaded configuration");
    let resolver = Resolver::new(config)?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing with partial results");
            trigger.cancel();
        }
    });

    match cli.command {
        Command::Resolve {
            input,
            format,
            output,
        } => {
            let identifiers = input.collect()?;
            let (map, diagnostics) = resolver.resolve_with_cancel(&identifiers, &cancel).await?;
            let mut out = table::output(output.as_deref())?;
            match format {
                OutputFormat::Csv => table::write_resolution_map(&mut out, &map)?,
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut out, &map)?;
                    writeln!(out)?;
                }
            }
            report(&diagnostics)?;
        }
        Command::Enrich {
            mut cids,
            input,
            output,
            update,
        } => {
            if let Some(path) = &input {
                cids.extend(read_cids(path)?);
            }
            let diagnostics =
                enrich_into(&resolver, cids, output.as_deref(), update, &cancel).await?;
            report(&diagnostics)?;
        }
        Command::Run {
            input,
            output,
            update,
        } => {
            let identifiers = input.collect()?;
            let (map, resolution) = resolver.resolve_with_cancel(&identifiers, &cancel).await?;
            report(&resolution)?;

            let enrichment =
                enrich_into(&resolver, map.cids(), output.as_deref(), update, &cancel).await?;
            report(&enrichment)?;
        }
    }

    Ok(())
}

/// Enrich `cids` and write the table. With `update`, rows already in the
/// output file are kept and their CIDs are not fetched again.
async fn enrich_into<T, I>(
    resolver: &Resolver<T>,
    cids: I,
    output: Option<&Path>,
    update: bool,
    cancel: &CancellationToken,
) -> Result<DiagnosticsReport>
where
    T: HttpTransport,
    I: IntoIterator<Item = Cid>,
{
    let existing = match output {
        Some(path) if update && path.exists() => table::read_records_file(path)?,
        _ => Vec::new(),
    };
    let mut merged: BTreeMap<Cid, ChemicalRecord> =
        existing.into_iter().map(|r| (r.cid, r)).collect();
    let wanted: Vec<Cid> = cids
        .into_iter()
        .filter(|cid| !merged.contains_key(cid))
        .collect();

    let (records, diagnostics) = resolver.enrich_with_cancel(wanted, cancel).await?;
    merged.extend(records.into_iter().map(|r| (r.cid, r)));

    let rows: Vec<ChemicalRecord> = merged.into_values().collect();
    table::write_records(table::output(output)?, &rows)?;
    Ok(diagnostics)
}

fn read_cids(path: &Path) -> Result<Vec<Cid>> {
    read_lines(path)?
        .iter()
        .map(|line| {
            line.parse::<Cid>()
                .map_err(|e| anyhow!("{}: {}", path.display(), e))
        })
        .collect()
}

fn report(diagnostics: &DiagnosticsReport) -> Result<()> {
    if diagnostics.is_clean() {
        return Ok(());
    }
    tracing::info!(
        unmatched = diagnostics.unmatched.len(),
        ambiguous = diagnostics.ambiguous.len(),
        failures = diagnostics.failures.len(),
        skipped = diagnostics.skipped.len(),
        cancelled = diagnostics.cancelled,
        "Diagnostics"
    );
    eprintln!("{}", serde_json::to_string_pretty(diagnostics)?);
    Ok(())
}
