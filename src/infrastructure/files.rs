//! CSV files on disk.

use crate::domain::{export_csv, import_csv, CellStore, CsvImport, ExportError, GridDimensions, ImportError};
use std::fs;
use std::path::Path;
use tracing::info;

/// Rejects anything but `.csv` before the file is opened.
pub fn check_import_extension(path: &Path) -> Result<(), ImportError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => Ok(()),
        "xls" => Err(ImportError::LegacyFormat("xls".to_string())),
        "" => Err(ImportError::UnrecognizedFormat("no extension".to_string())),
        other => Err(ImportError::UnrecognizedFormat(format!(".{other}"))),
    }
}

pub fn export_csv_file(path: &Path, store: &CellStore, dims: GridDimensions) -> Result<(), ExportError> {
    let content = export_csv(store, dims)?;
    fs::write(path, content)?;
    info!(path = %path.display(), rows = dims.rows, cols = dims.cols, "exported csv");
    Ok(())
}

pub fn import_csv_file(path: &Path) -> Result<CsvImport, ImportError> {
    check_import_extension(path)?;
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let imported = import_csv(&text)?;
    info!(path = %path.display(), rows = imported.rows, cols = imported.cols, "imported csv");
    Ok(imported)
}
