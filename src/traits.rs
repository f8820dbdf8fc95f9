use anyhow::Result;

use crate::{
    models::{AggregatedPartition, SummaryEntry},
    schema::{HeaderSchema, RawTable},
};

/// UsageSource trait provides the raw usage ledger.
pub trait UsageSource {
    /// Reads the header row and every data row beneath it.
    ///
    /// # Returns
    /// A Result holding the raw table, or the reason the source is unreadable.
    fn read_table(&mut self) -> Result<RawTable>;
}

impl<T: UsageSource + ?Sized> UsageSource for Box<T> {
    fn read_table(&mut self) -> Result<RawTable> {
        (**self).read_table()
    }
}

/// ReportSink trait receives the partitioned report.
pub trait ReportSink {
    /// Writes one partition as its own named table.
    ///
    /// # Arguments
    /// * `name` - The partition's display name, at most 31 characters.
    /// * `schema` - The resolved header row.
    /// * `partition` - The aggregated partition with its redacted rows.
    ///
    /// # Returns
    /// A Result indicating success or failure.
    fn write_partition(
        &mut self,
        name: &str,
        schema: &HeaderSchema,
        partition: &AggregatedPartition<'_>,
    ) -> Result<()>;

    /// Writes the summary table after every partition.
    fn write_summary(&mut self, entries: &[SummaryEntry]) -> Result<()>;

    /// Flushes the report. Nothing written before this call is guaranteed to be persisted.
    fn finish(&mut self) -> Result<()>;
}

/// SummarySource trait reads the summary back for the routing pass.
pub trait SummarySource {
    /// Reads the summary rows, header excluded.
    fn read_summary(&mut self) -> Result<Vec<SummaryEntry>>;
}
