pub mod airtable;
pub mod csv_read;
pub mod excel_read;
pub mod rows;

use std::path::Path;

use crate::helios::roster::error::{Result, RosterError};
use rows::RowSource;

/// Opens the row source matching the file extension: `.xlsx` workbooks are
/// read with calamine, everything else as delimited text.
pub fn open_rows(path: &Path, delimiter: u8) -> Result<Box<dyn RowSource>> {
    if !path.exists() {
        return Err(RosterError::MissingInput(path.to_path_buf()));
    }

    if is_workbook(path) {
        Ok(Box::new(excel_read::WorkbookRows::open(path)?))
    } else {
        Ok(Box::new(csv_read::CsvRows::from_path(path, delimiter)?))
    }
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}
