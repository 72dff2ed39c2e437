// src/ingest/mod.rs
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{DocumentSpec, Release};
use crate::period::{classify_period, Frequency};
use crate::process::{reshape, Layout, Sheet};

pub mod source;

pub use source::{DirectorySource, DocumentSource};

/// One observation in the ingested pool. Provenance identity is
/// (source_file, source_sheet, source_series_id, period).
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRow {
    pub vintage: String,
    pub frequency: Frequency,
    pub period: String,
    /// Document label from the release config.
    pub variable: String,
    /// Sheet name.
    pub subvariable: String,
    pub value: Option<f64>,
    pub units: String,
    pub source_file: String,
    pub source_sheet: String,
    pub source_series_id: String,
}

/// Pool rows plus what happened to each document and sheet.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub rows: Vec<IngestedRow>,
    pub stats: IngestStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub documents_found: usize,
    pub documents_missing: usize,
    pub documents_unreadable: usize,
    pub sheets_ingested: usize,
    pub sheets_skipped: usize,
}

/// Ingest every configured document of `release` into one long pool.
/// Absent documents, unreadable documents and sheets that yield no rows are
/// skipped; nothing here fails the run.
#[tracing::instrument(level = "info", skip_all, fields(release = %release.name))]
pub fn ingest_release(release: &Release, source: &dyn DocumentSource) -> IngestReport {
    let mut report = IngestReport::default();

    for doc in &release.documents {
        let workbook = match source.open(&doc.file) {
            Ok(Some(wb)) => wb,
            Ok(None) => {
                debug!(document = %doc.file, "document not present; skipping");
                report.stats.documents_missing += 1;
                continue;
            }
            Err(e) => {
                warn!(document = %doc.file, "cannot open document: {:#}", e);
                report.stats.documents_unreadable += 1;
                continue;
            }
        };
        report.stats.documents_found += 1;

        let layout = doc.layout_or(release.layout);
        // collect keeps sheet order regardless of scheduling
        let per_sheet: Vec<Option<Vec<IngestedRow>>> = workbook
            .sheets
            .par_iter()
            .map(|sheet| ingest_sheet(&release.vintage, doc, &layout, sheet))
            .collect();

        for rows in per_sheet {
            match rows {
                Some(rows) => {
                    report.stats.sheets_ingested += 1;
                    report.rows.extend(rows);
                }
                None => report.stats.sheets_skipped += 1,
            }
        }
    }

    info!(
        rows = report.rows.len(),
        documents = report.stats.documents_found,
        missing = report.stats.documents_missing,
        sheets = report.stats.sheets_ingested,
        skipped = report.stats.sheets_skipped,
        "ingested release"
    );
    report
}

/// Parse, clean and melt one sheet. `None` when the sheet contributes nothing.
fn ingest_sheet(
    vintage: &str,
    doc: &DocumentSpec,
    layout: &Layout,
    sheet: &Sheet,
) -> Option<Vec<IngestedRow>> {
    let raw = match sheet.parse() {
        Ok(t) => t,
        Err(e) => {
            debug!(document = %doc.file, sheet = %sheet.name, "unparseable sheet: {:#}", e);
            return None;
        }
    };

    let table = raw.drop_empty();
    if table.is_empty() {
        debug!(document = %doc.file, sheet = %sheet.name, "empty sheet");
        return None;
    }

    let long = reshape(&table, layout);
    if long.is_empty() {
        debug!(document = %doc.file, sheet = %sheet.name, "no period columns to melt");
        return None;
    }

    let rows = long
        .rows
        .into_iter()
        .map(|r| {
            let (period, frequency) = classify_period(&r.period);
            IngestedRow {
                vintage: vintage.to_string(),
                frequency,
                period,
                variable: doc.label.clone(),
                subvariable: sheet.name.clone(),
                value: r.value,
                units: String::new(),
                source_file: doc.file.clone(),
                source_sheet: sheet.name.clone(),
                source_series_id: r.series_id().to_string(),
            }
        })
        .collect();
    Some(rows)
}
