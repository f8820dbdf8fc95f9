use std::io::Read;

use anyhow::Result;
use csv::{ReaderBuilder, StringRecord};
use tracing::info;

use crate::{
    schema::{RawTable, UsageRow},
    traits::UsageSource,
};

/// Usage ledger exported as CSV, header on the first line.
pub struct CsvUsageSource<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CsvUsageSource<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_reader(input),
        }
    }
}

impl<R: Read> UsageSource for CsvUsageSource<R> {
    fn read_table(&mut self) -> Result<RawTable> {
        let header = self.reader.headers()?.iter().map(str::to_owned).collect();

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        while self.reader.read_record(&mut record)? {
            let row: UsageRow = record.iter().collect();
            if !row.is_blank() {
                rows.push(row);
            }
        }

        info!(rows = rows.len(), "usage rows read from csv");
        Ok(RawTable { header, rows })
    }
}
