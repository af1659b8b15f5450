//! Serialising a [`FeatureTable`] for the downstream modelling step.
//!
//! Every numeric cell follows the dense contract: values that could not be
//! computed are written as `0`.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::data::model::{FeatureTable, METADATA_COLUMNS};

/// Write the table to a file.  Dispatch by extension.
///
/// * `.csv` – header row, one line per spectrum
/// * `.parquet` / `.pq` – Float64 feature columns, Utf8 metadata columns
pub fn write_table(table: &FeatureTable, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_csv(table, file)
        }
        "parquet" | "pq" => write_parquet(table, path),
        other => bail!("Unsupported output extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub fn write_csv<W: Write>(table: &FeatureTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.headers()).context("writing CSV header")?;

    for (row_no, row) in table.rows.iter().enumerate() {
        let record: Vec<String> = row
            .dense()
            .iter()
            .map(|v| v.to_string())
            .chain(row.metadata_cells().iter().map(|s| s.to_string()))
            .collect();
        csv.write_record(&record)
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }

    csv.flush().context("flushing CSV output")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Build the Arrow record batch holding the whole table.
pub fn to_record_batch(table: &FeatureTable) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.columns.len() + METADATA_COLUMNS.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(fields.capacity());

    let dense: Vec<Vec<f64>> = table.rows.iter().map(|r| r.dense()).collect();
    for (col, name) in table.columns.iter().enumerate() {
        let values: Vec<f64> = dense
            .iter()
            .map(|row| row.get(col).copied().unwrap_or(0.0))
            .collect();
        fields.push(Field::new(name, DataType::Float64, false));
        arrays.push(Arc::new(Float64Array::from(values)));
    }

    for (idx, name) in METADATA_COLUMNS.iter().enumerate() {
        let values: Vec<&str> = table.rows.iter().map(|r| r.metadata_cells()[idx]).collect();
        fields.push(Field::new(*name, DataType::Utf8, false));
        arrays.push(Arc::new(StringArray::from(values)));
    }

    let schema = Arc::new(Schema::new(fields));
    RecordBatch::try_new(schema, arrays).context("assembling record batch")
}

fn write_parquet(table: &FeatureTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
