//! Parquet export of a stat table.

use std::fs::File;
use std::path::Path;

use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;
use thiserror::Error;

use crate::table::StatTable;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not create {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parquet(#[from] ParquetError),
}

/// Write `table` to a single-row-group parquet file, replacing any existing file
pub fn write_parquet(table: &StatTable, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, table.schema(), Some(props))?;
    writer.write(table.batch())?;
    writer.close()?;
    tracing::info!(path = %path.display(), rows = table.num_rows(), "Wrote parquet export");
    Ok(())
}
