// src/history/mod.rs

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::Utc;
use glob::{glob, Pattern};
use std::{
    collections::HashSet,
    fs,
    path::PathBuf,
    sync::Arc,
};

use crate::store::write_parquet;

/// Completed pipeline stages, one tiny Parquet file per event.
pub struct RunHistory {
    history_dir: PathBuf,
}

impl RunHistory {
    /// Construct a new history store at `history_dir`, creating the directory if needed.
    pub fn new(history_dir: impl Into<PathBuf>) -> Result<Self> {
        let history_dir = history_dir.into();
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("creating history directory {:?}", &history_dir))?;
        Ok(Self { history_dir })
    }

    /// Record that `stage` (e.g. "ingest", "baseline") produced `rows` rows
    /// for `name`. Writes `<name>_<stage>_<ts>.parquet`.
    pub fn record(&self, name: &str, stage: &str, rows: u64) -> Result<PathBuf> {
        let ts = Utc::now().timestamp_micros();
        let path = self
            .history_dir
            .join(format!("{}_{}_{}.parquet", name, stage, ts));

        let schema = Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("stage", DataType::Utf8, false),
            Field::new("rows", DataType::UInt64, false),
            Field::new(
                "recorded_at",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ]);
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec![name.to_string()])),
            Arc::new(StringArray::from(vec![stage.to_string()])),
            Arc::new(UInt64Array::from(vec![rows])),
            Arc::new(TimestampMicrosecondArray::from(vec![ts])),
        ];
        let batch = RecordBatch::try_new(Arc::new(schema), columns)
            .context("building history record batch")?;

        write_parquet(&path, &batch)?;
        Ok(path)
    }

    /// All names with at least one recorded `stage` event, from file names.
    pub fn names_for(&self, stage: &str) -> Result<HashSet<String>> {
        let mut set = HashSet::new();
        let pattern = format!(
            "{}/*_{}_*.parquet",
            Pattern::escape(&self.history_dir.to_string_lossy()),
            Pattern::escape(stage)
        );
        for path in glob(&pattern)?.flatten() {
            if let Some(fname) = path.file_stem().and_then(|s| s.to_str()) {
                // fname = "<name>_<stage>_<ts>"
                if let Some(idx) = fname.rfind(&format!("_{}_", stage)) {
                    set.insert(fname[..idx].to_string());
                }
            }
        }
        Ok(set)
    }
}
