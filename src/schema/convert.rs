// src/schema/convert.rs

use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Float64Array, StringArray},
    record_batch::RecordBatch,
};
use std::sync::Arc;

use super::{baseline_schema, pool_schema};
use crate::ingest::IngestedRow;
use crate::mapping::CanonicalRow;
use crate::period::Frequency;

fn utf8<'a, T: 'a>(rows: &'a [T], f: impl Fn(&'a T) -> &'a str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(rows.iter().map(f)))
}

pub fn pool_to_batch(rows: &[IngestedRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        utf8(rows, |r| &r.vintage),
        utf8(rows, |r| r.frequency.as_str()),
        utf8(rows, |r| &r.period),
        utf8(rows, |r| &r.variable),
        utf8(rows, |r| &r.subvariable),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.value))),
        utf8(rows, |r| &r.units),
        utf8(rows, |r| &r.source_file),
        utf8(rows, |r| &r.source_sheet),
        utf8(rows, |r| &r.source_series_id),
    ];
    RecordBatch::try_new(pool_schema(), columns).context("building pool record batch")
}

pub fn baseline_to_batch(rows: &[CanonicalRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        utf8(rows, |r| &r.vintage),
        utf8(rows, |r| r.frequency.as_str()),
        utf8(rows, |r| &r.period),
        utf8(rows, |r| &r.variable),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.value))),
        utf8(rows, |r| &r.units),
        utf8(rows, |r| &r.source_file),
        utf8(rows, |r| &r.source_sheet),
        utf8(rows, |r| &r.source_series_id),
    ];
    RecordBatch::try_new(baseline_schema(), columns).context("building baseline record batch")
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("pool batch has no `{}` column", name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("pool column `{}` is not Utf8", name))
}

/// Read pool rows back out of a batch. Null strings read as empty.
pub fn batch_to_pool(batch: &RecordBatch) -> Result<Vec<IngestedRow>> {
    let vintage = string_column(batch, "vintage")?;
    let frequency = string_column(batch, "frequency")?;
    let period = string_column(batch, "period")?;
    let variable = string_column(batch, "variable")?;
    let subvariable = string_column(batch, "subvariable")?;
    let units = string_column(batch, "units")?;
    let source_file = string_column(batch, "source_file")?;
    let source_sheet = string_column(batch, "source_sheet")?;
    let source_series_id = string_column(batch, "source_series_id")?;
    let value = batch
        .column_by_name("value")
        .ok_or_else(|| anyhow!("pool batch has no `value` column"))?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| anyhow!("pool column `value` is not Float64"))?;

    let text = |arr: &StringArray, i: usize| {
        if arr.is_null(i) {
            String::new()
        } else {
            arr.value(i).to_string()
        }
    };

    Ok((0..batch.num_rows())
        .map(|i| IngestedRow {
            vintage: text(vintage, i),
            frequency: Frequency::from_label(&text(frequency, i)),
            period: text(period, i),
            variable: text(variable, i),
            subvariable: text(subvariable, i),
            value: (!value.is_null(i)).then(|| value.value(i)),
            units: text(units, i),
            source_file: text(source_file, i),
            source_sheet: text(source_sheet, i),
            source_series_id: text(source_series_id, i),
        })
        .collect())
}
