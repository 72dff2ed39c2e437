// src/mapping/mod.rs
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::config::{MappingRule, SheetField};
use crate::error::PipelineError;
use crate::ingest::IngestedRow;
use crate::period::{classify_period, Frequency};

pub mod units;

pub use units::infer_units;

/// A row of the baseline: an ingested observation relabelled with a
/// canonical variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow {
    pub vintage: String,
    pub frequency: Frequency,
    pub period: String,
    pub variable: String,
    pub value: f64,
    pub units: String,
    pub source_file: String,
    pub source_sheet: String,
    pub source_series_id: String,
}

/// Why a rule contributed nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SourceFileNotFound,
    SheetMatchEmpty,
    SeriesMatchEmpty,
    NoNumericValues,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::SourceFileNotFound => "source_file not found",
            SkipReason::SheetMatchEmpty => "sheet_match found no rows",
            SkipReason::SeriesMatchEmpty => "series_match found no rows",
            SkipReason::NoNumericValues => "matched labels but no numeric values; skipping",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleDiagnostic {
    pub canonical: String,
    pub reason: SkipReason,
}

/// A mapping rule with its patterns compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: MappingRule,
    sheet: Regex,
    series: Regex,
}

impl CompiledRule {
    pub fn new(rule: MappingRule) -> Result<Self, PipelineError> {
        let compile = |field: &'static str, pattern: &str| {
            rule.match_mode
                .compile(pattern)
                .map_err(|source| PipelineError::InvalidPattern {
                    canonical: rule.canonical.clone(),
                    field,
                    source,
                })
        };
        let sheet = compile("sheet_match", &rule.sheet_match)?;
        let series = compile("series_match", &rule.series_match)?;
        Ok(Self {
            rule,
            sheet,
            series,
        })
    }

    fn sheet_key<'a>(&self, row: &'a IngestedRow) -> &'a str {
        match self.rule.sheet_field {
            SheetField::Subvariable => &row.subvariable,
            SheetField::SourceSeriesId => &row.source_series_id,
        }
    }

    /// Filter the pool through this rule's stages and relabel the survivors.
    pub fn apply(&self, pool: &[IngestedRow]) -> Result<Vec<CanonicalRow>, SkipReason> {
        let rule = &self.rule;

        let subset: Vec<&IngestedRow> = pool
            .iter()
            .filter(|r| r.source_file == rule.source_file)
            .collect();
        if subset.is_empty() {
            return Err(SkipReason::SourceFileNotFound);
        }

        let subset: Vec<&IngestedRow> = subset
            .into_iter()
            .filter(|r| self.sheet.is_match(self.sheet_key(r)))
            .collect();
        if subset.is_empty() {
            return Err(SkipReason::SheetMatchEmpty);
        }

        let subset: Vec<&IngestedRow> = subset
            .into_iter()
            .filter(|r| self.series.is_match(&r.source_series_id))
            .collect();
        if subset.is_empty() {
            return Err(SkipReason::SeriesMatchEmpty);
        }

        let subset: Vec<(&IngestedRow, f64)> = subset
            .into_iter()
            .filter_map(|r| r.value.map(|v| (r, v)))
            .collect();
        let Some((first, _)) = subset.first() else {
            return Err(SkipReason::NoNumericValues);
        };

        let context = format!("{} {}", first.source_sheet, first.source_series_id).to_lowercase();
        let inferred = infer_units(&rule.canonical, &context);

        Ok(subset
            .into_iter()
            .map(|(r, value)| {
                let (period, frequency) = classify_period(&r.period);
                CanonicalRow {
                    vintage: r.vintage.clone(),
                    frequency,
                    period,
                    variable: rule.canonical.clone(),
                    value,
                    units: if inferred.is_empty() {
                        r.units.clone()
                    } else {
                        inferred.to_string()
                    },
                    source_file: r.source_file.clone(),
                    source_sheet: r.source_sheet.clone(),
                    source_series_id: r.source_series_id.clone(),
                }
            })
            .collect())
    }
}

/// Compile every rule up front so a bad pattern fails before any work.
pub fn compile_rules(rules: &[MappingRule]) -> Result<Vec<CompiledRule>, PipelineError> {
    rules.iter().cloned().map(CompiledRule::new).collect()
}

/// Accumulated result of running all rules over a pool.
#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    pub rows: Vec<CanonicalRow>,
    pub diagnostics: Vec<RuleDiagnostic>,
    pub matched_rules: usize,
}

/// Apply rules in order. A rule that matches nothing logs one warning and
/// is skipped; output rows follow rule order, then pool order.
pub fn apply_mappings(pool: &[IngestedRow], rules: &[CompiledRule]) -> MappingOutcome {
    let mut outcome = MappingOutcome::default();
    for compiled in rules {
        let canonical = &compiled.rule.canonical;
        match compiled.apply(pool) {
            Ok(rows) => {
                info!(canonical = %canonical, rows = rows.len(), "mapping matched");
                outcome.matched_rules += 1;
                outcome.rows.extend(rows);
            }
            Err(reason) => {
                warn!("mapping '{}': {}", canonical, reason);
                outcome.diagnostics.push(RuleDiagnostic {
                    canonical: canonical.clone(),
                    reason,
                });
            }
        }
    }
    outcome
}
