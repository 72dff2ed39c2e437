// src/store/mod.rs

use anyhow::{Context, Result};
use arrow::{compute::concat_batches, csv::WriterBuilder, record_batch::RecordBatch};
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use serde::Serialize;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Paths written for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredTable {
    pub parquet: PathBuf,
    pub sample: PathBuf,
    pub rows: usize,
}

/// Write `batch` as Parquet, going through a temporary file so a reader
/// never sees a half-written table.
pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let temp_path = path.with_extension("parquet.tmp");

    let file =
        File::create(&temp_path).with_context(|| format!("creating {:?}", &temp_path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(batch).context("writing batch")?;
    writer.close().context("closing Parquet writer")?;

    fs::rename(&temp_path, path)
        .with_context(|| format!("renaming {:?} -> {:?}", temp_path, path))?;
    debug!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(())
}

/// Read a whole Parquet file back as one batch.
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading Parquet metadata of {:?}", path))?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building Parquet reader")?;

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("reading batches of {:?}", path))?;
    concat_batches(&schema, &batches).context("concatenating batches")
}

/// Write the first `rows` rows of `batch` as CSV with a header line.
pub fn write_preview_csv(path: &Path, batch: &RecordBatch, rows: usize) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let head = batch.slice(0, rows.min(batch.num_rows()));
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(&head).context("writing preview CSV")?;
    Ok(())
}

/// Persist a table as `<dir>/<parquet_name>` plus a preview `<dir>/<sample_name>`.
pub fn store_table(
    dir: &Path,
    parquet_name: &str,
    sample_name: &str,
    batch: &RecordBatch,
    preview_rows: usize,
) -> Result<StoredTable> {
    let parquet = dir.join(parquet_name);
    let sample = dir.join(sample_name);
    write_parquet(&parquet, batch)?;
    write_preview_csv(&sample, batch, preview_rows)?;
    Ok(StoredTable {
        parquet,
        sample,
        rows: batch.num_rows(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IngestedRow;
    use crate::period::Frequency;
    use crate::schema::{batch_to_pool, pool_to_batch};
    use tempfile::tempdir;

    fn rows(n: usize) -> Vec<IngestedRow> {
        (0..n)
            .map(|i| IngestedRow {
                vintage: "V".into(),
                frequency: Frequency::Annual,
                period: format!("{}", 2000 + i),
                variable: "aggregates".into(),
                subvariable: "1.1".into(),
                value: if i % 2 == 0 { Some(i as f64) } else { None },
                units: String::new(),
                source_file: "agg.zip".into(),
                source_sheet: "1.1".into(),
                source_series_id: "GDP".into(),
            })
            .collect()
    }

    #[test]
    fn parquet_round_trips_pool_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("pool.parquet");
        let original = rows(5);
        write_parquet(&path, &pool_to_batch(&original)?)?;

        assert!(!path.with_extension("parquet.tmp").exists());
        let back = batch_to_pool(&read_parquet(&path)?)?;
        assert_eq!(back, original);
        Ok(())
    }

    #[test]
    fn preview_is_capped() -> Result<()> {
        let dir = tempdir()?;
        let stored = store_table(
            dir.path(),
            "pool.parquet",
            "pool_sample.csv",
            &pool_to_batch(&rows(10))?,
            3,
        )?;
        assert_eq!(stored.rows, 10);

        let text = fs::read_to_string(&stored.sample)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("vintage,frequency,period,variable,subvariable,value"));
        Ok(())
    }

    #[test]
    fn empty_tables_still_write() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.parquet");
        write_parquet(&path, &pool_to_batch(&[])?)?;
        assert_eq!(read_parquet(&path)?.num_rows(), 0);
        Ok(())
    }
}
