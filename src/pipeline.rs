// src/pipeline.rs
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{MappingDocument, PipelineConfig, Release};
use crate::error::PipelineError;
use crate::history::RunHistory;
use crate::ingest::{ingest_release, DirectorySource, IngestStats, IngestedRow};
use crate::mapping::{apply_mappings, compile_rules, CanonicalRow, CompiledRule, RuleDiagnostic};
use crate::schema::{baseline_to_batch, batch_to_pool, pool_to_batch};
use crate::store::{read_parquet, store_table, StoredTable};

/// The canonical dataset plus the per-rule diagnostics gathered on the way.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub rows: Vec<CanonicalRow>,
    pub diagnostics: Vec<RuleDiagnostic>,
    pub matched_rules: usize,
}

/// Run every rule over the pool and concatenate what matched. Fails only
/// when no rule produced a single row.
pub fn assemble_baseline(
    pool: &[IngestedRow],
    rules: &[CompiledRule],
) -> Result<Baseline, PipelineError> {
    let outcome = apply_mappings(pool, rules);
    if outcome.rows.is_empty() {
        return Err(PipelineError::NoRowsMatched { rules: rules.len() });
    }
    Ok(Baseline {
        rows: outcome.rows,
        diagnostics: outcome.diagnostics,
        matched_rules: outcome.matched_rules,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub release: String,
    pub stats: IngestStats,
    /// `None` when no sheet produced rows and nothing was written.
    pub table: Option<StoredTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaselineSummary {
    pub name: String,
    pub rules: usize,
    pub matched_rules: usize,
    pub diagnostics: Vec<RuleDiagnostic>,
    pub table: StoredTable,
}

fn open_history(config: &PipelineConfig) -> Result<Option<RunHistory>> {
    config
        .history_dir
        .as_ref()
        .map(|dir| RunHistory::new(dir.clone()))
        .transpose()
}

/// Ingest one release from its raw directory and persist the interim pool.
#[tracing::instrument(level = "info", skip_all, fields(release = %release.name))]
pub fn run_ingest(config: &PipelineConfig, release: &Release) -> Result<IngestSummary> {
    let source = DirectorySource::new(&release.raw_dir);
    let report = ingest_release(release, &source);

    if report.rows.is_empty() {
        warn!(raw_dir = %release.raw_dir.display(), "no sheets parsed; check file names/locations");
        return Ok(IngestSummary {
            release: release.name.clone(),
            stats: report.stats,
            table: None,
        });
    }

    let batch = pool_to_batch(&report.rows)?;
    let table = store_table(
        &config.interim_dir,
        &format!("{}_interim.parquet", release.name),
        &format!("{}_sample.csv", release.name),
        &batch,
        config.preview_rows,
    )?;
    info!(path = %table.parquet.display(), rows = table.rows, "wrote interim pool");

    if let Some(history) = open_history(config)? {
        history.record(&release.name, "ingest", table.rows as u64)?;
    }

    Ok(IngestSummary {
        release: release.name.clone(),
        stats: report.stats,
        table: Some(table),
    })
}

/// Map the configured pool into the baseline and persist it. Nothing is
/// written when no rule matched.
#[tracing::instrument(level = "info", skip_all)]
pub fn run_baseline(config: &PipelineConfig) -> Result<BaselineSummary> {
    let baseline_cfg = config.baseline()?;
    config.release(&baseline_cfg.pool)?;
    let history = open_history(config)?;

    if let Some(history) = &history {
        if !history.names_for("ingest")?.contains(&baseline_cfg.pool) {
            warn!(pool = %baseline_cfg.pool, "no ingest recorded for this pool; it may be stale");
        }
    }

    let pool_path = config.pool_path(&baseline_cfg.pool);
    let pool = batch_to_pool(&read_parquet(&pool_path)?)
        .with_context(|| format!("loading pool {:?}", pool_path))?;
    info!(rows = pool.len(), path = %pool_path.display(), "loaded pool");

    let mapping = MappingDocument::load(&baseline_cfg.mapping)?;
    let rules = compile_rules(&mapping.mappings)?;
    let baseline = assemble_baseline(&pool, &rules)?;

    let batch = baseline_to_batch(&baseline.rows)?;
    let table = store_table(
        &config.processed_dir,
        &format!("{}.parquet", baseline_cfg.name),
        &format!("{}_sample.csv", baseline_cfg.name),
        &batch,
        config.preview_rows,
    )?;
    info!(
        path = %table.parquet.display(),
        rows = table.rows,
        matched = baseline.matched_rules,
        skipped = baseline.diagnostics.len(),
        "wrote baseline"
    );

    if let Some(history) = &history {
        history.record(&baseline_cfg.name, "baseline", table.rows as u64)?;
    }

    Ok(BaselineSummary {
        name: baseline_cfg.name.clone(),
        rules: rules.len(),
        matched_rules: baseline.matched_rules,
        diagnostics: baseline.diagnostics,
        table,
    })
}
