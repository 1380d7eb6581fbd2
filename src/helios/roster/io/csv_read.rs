use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::helios::roster::error::Result;
use crate::helios::roster::io::rows::RowSource;

/// Delimited-text rows. Every row must carry exactly as many fields as the
/// header row; anything else surfaces as
/// [`MalformedInput`](crate::RosterError::MalformedInput).
pub struct CsvRows<R> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    record: StringRecord,
}

impl CsvRows<File> {
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file, delimiter)
    }
}

impl<R: Read> CsvRows<R> {
    /// Wraps `source` and consumes its header row.
    pub fn new(source: R, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(source);

        let headers = reader.headers()?.iter().map(str::to_string).collect();

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }
}

impl<R: Read> RowSource for CsvRows<R> {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        Ok(Some(self.record.iter().map(str::to_string).collect()))
    }
}
