use arrow::array::{Array, StringArray};
use econbase::store::read_parquet;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{collections::BTreeMap, env, fs::File, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: path to a pool or baseline Parquet file.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <PARQUET_FILE>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print file metadata, the column layout, and row counts per variable and frequency.
fn inspect(path: &Path) -> anyhow::Result<()> {
    let reader = SerializedFileReader::new(File::open(path)?)?;
    let parquet_meta = reader.metadata();
    let file_meta = parquet_meta.file_metadata();

    println!("=== Parquet File: {} ===", path.display());
    println!(
        "Created by:           {}",
        file_meta.created_by().unwrap_or("<unknown>")
    );
    println!("Total rows:           {}", file_meta.num_rows());
    println!("Number of row groups: {}", parquet_meta.num_row_groups());
    println!(
        "File-size on disk:    {} bytes",
        std::fs::metadata(path)?.len()
    );
    println!();

    println!("=== Columns ===");
    for col_desc in file_meta.schema_descr().columns() {
        println!(
            "- {:<20} | Physical: {:?}",
            col_desc.name(),
            col_desc.physical_type()
        );
    }
    println!();

    let batch = read_parquet(path)?;
    for column in ["variable", "frequency"] {
        let Some(arr) = batch
            .column_by_name(column)
            .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        else {
            continue;
        };
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for i in 0..arr.len() {
            if !arr.is_null(i) {
                *counts.entry(arr.value(i)).or_default() += 1;
            }
        }
        println!("=== Rows per {} ===", column);
        for (value, n) in counts {
            println!("  {:<40} {}", value, n);
        }
        println!();
    }

    if let Some(values) = batch.column_by_name("value") {
        println!(
            "Missing values:       {} of {}",
            values.null_count(),
            values.len()
        );
    }
    Ok(())
}
