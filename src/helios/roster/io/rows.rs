use crate::helios::roster::config::ColumnNames;
use crate::helios::roster::error::{Result, RosterError};

/// A single forward pass over a tabular export. The header row has already
/// been consumed by the time the source is handed out.
pub trait RowSource {
    /// Header names in column order.
    fn headers(&self) -> &[String];

    /// Returns the next data row, `None` once the input is exhausted.
    fn next_row(&mut self) -> Result<Option<Vec<String>>>;
}

/// Returns the position of `name` among `headers`.
pub fn resolve_column(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| RosterError::MissingColumn(name.to_string()))
}

/// Positions of every column the directory builder reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub first_name: usize,
    pub last_name: usize,
    pub class: usize,
    pub grade: usize,
    pub parent1_first: usize,
    pub parent1_last: usize,
    pub parent1_email: usize,
    pub parent2_first: usize,
    pub parent2_last: usize,
    pub parent2_email: usize,
}

impl ColumnIndex {
    /// Resolves all columns up front, failing on the first one missing.
    pub fn resolve(headers: &[String], names: &ColumnNames) -> Result<Self> {
        Ok(Self {
            first_name: resolve_column(headers, &names.first_name)?,
            last_name: resolve_column(headers, &names.last_name)?,
            class: resolve_column(headers, &names.class)?,
            grade: resolve_column(headers, &names.grade)?,
            parent1_first: resolve_column(headers, &names.parent1_first)?,
            parent1_last: resolve_column(headers, &names.parent1_last)?,
            parent1_email: resolve_column(headers, &names.parent1_email)?,
            parent2_first: resolve_column(headers, &names.parent2_first)?,
            parent2_last: resolve_column(headers, &names.parent2_last)?,
            parent2_email: resolve_column(headers, &names.parent2_email)?,
        })
    }
}

/// Reads the field at `index`, empty when the row is shorter.
pub fn field(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or_default()
}
