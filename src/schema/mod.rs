// src/schema/mod.rs

use arrow::datatypes::{DataType, Field, Schema as ArrowSchema};
use std::sync::Arc;

pub mod convert;

pub use convert::{baseline_to_batch, batch_to_pool, pool_to_batch};

/// Columns of the ingested pool, in file order.
pub const POOL_COLUMNS: [&str; 10] = [
    "vintage",
    "frequency",
    "period",
    "variable",
    "subvariable",
    "value",
    "units",
    "source_file",
    "source_sheet",
    "source_series_id",
];

/// Columns of the canonical baseline, in file order.
pub const BASELINE_COLUMNS: [&str; 9] = [
    "vintage",
    "frequency",
    "period",
    "variable",
    "value",
    "units",
    "source_file",
    "source_sheet",
    "source_series_id",
];

/// Every column is Utf8 except `value` (Float64). Only the pool's value
/// column is nullable.
fn build_schema(columns: &[&str], value_nullable: bool) -> Arc<ArrowSchema> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|&name| {
            if name == "value" {
                Field::new(name, DataType::Float64, value_nullable)
            } else {
                Field::new(name, DataType::Utf8, false)
            }
        })
        .collect();
    Arc::new(ArrowSchema::new(fields))
}

pub fn pool_schema() -> Arc<ArrowSchema> {
    build_schema(&POOL_COLUMNS, true)
}

pub fn baseline_schema() -> Arc<ArrowSchema> {
    build_schema(&BASELINE_COLUMNS, false)
}
