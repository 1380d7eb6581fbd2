use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::helios::roster::error::{Result, RosterError};
use crate::helios::roster::io::rows::RowSource;

/// Rows of the first worksheet in an `.xlsx` export. The first row is the
/// header row; blank rows are skipped.
///
/// calamine decodes the whole sheet when it is opened, so every workbook
/// failure surfaces from [`WorkbookRows::open`] as
/// [`MalformedWorkbook`](RosterError::MalformedWorkbook) and `next_row`
/// never fails.
#[derive(Debug)]
pub struct WorkbookRows {
    headers: Vec<String>,
    rows: std::vec::IntoIter<Vec<String>>,
}

impl WorkbookRows {
    pub fn open(path: &Path) -> Result<Self> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;

        let sheet = workbook.sheet_names().first().cloned().ok_or_else(|| {
            RosterError::Configuration(format!("workbook {} has no sheets", path.display()))
        })?;
        let range = workbook
            .worksheet_range(&sheet)
            .ok_or_else(|| RosterError::Configuration(format!("missing sheet '{sheet}'")))??;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell_to_string(Some(cell))).collect::<Vec<_>>());

        let headers = rows.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = rows
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();

        Ok(Self {
            headers,
            rows: rows.into_iter(),
        })
    }
}

impl RowSource for WorkbookRows {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        Ok(self.rows.next())
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
