use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    errors::ReportError,
    models::{AggregatedPartition, Partition},
    money::parse_amount,
    schema::HeaderSchema,
};

/// Totals a partition over its applicable price column and redacts the other one.
///
/// Subdivided (internal company) partitions are billed at distributor price and hide the
/// suggested price; every other partition is billed at suggested price and hides the
/// distributor price.
pub struct Aggregator<'c> {
    schema: &'c HeaderSchema,
}

impl<'c> Aggregator<'c> {
    pub fn new(schema: &'c HeaderSchema) -> Self {
        Self { schema }
    }

    pub fn aggregate<'a>(
        &self,
        partition: Partition<'a>,
    ) -> Result<AggregatedPartition<'a>, ReportError> {
        let (total_idx, blanked_idx) = if partition.key().is_subdivided() {
            (self.schema.distributor_price(), self.schema.suggested_price())
        } else {
            (self.schema.suggested_price(), self.schema.distributor_price())
        };

        let mut total = Decimal::ZERO;
        for (i, row) in partition.rows().iter().enumerate() {
            let cell = row.cell(total_idx);
            match parse_amount(cell) {
                Some(amount) => {
                    total = total.checked_add(amount).ok_or(ReportError::ValueOverflow)?;
                }
                None if cell.trim().is_empty() => {}
                None => debug!(
                    partition = %partition.name(),
                    row = i + 1,
                    value = cell,
                    "unparseable amount counted as zero"
                ),
            }
        }
        debug!(
            customer = partition.key().customer(),
            subscription = partition.key().subscription(),
            total = %total,
            "partition totalled"
        );

        let width = self.schema.width();
        let projection = partition
            .rows()
            .iter()
            .map(|row| row.redacted(width, blanked_idx))
            .collect();

        let total_column = self.schema.name_at(total_idx).to_owned();
        Ok(AggregatedPartition::new(
            partition,
            total_column,
            total_idx,
            total,
            projection,
        ))
    }
}
