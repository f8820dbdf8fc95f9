use crate::models::{AggregatedPartition, SummaryEntry};

/// One entry per aggregated partition, in partition order. No deduplication.
pub fn build_summary(partitions: &[AggregatedPartition<'_>]) -> Vec<SummaryEntry> {
    partitions
        .iter()
        .map(|agg| {
            let partition = agg.partition();
            SummaryEntry::new(
                partition.key().customer(),
                partition.subscription_label().as_str(),
                agg.total_column().as_str(),
                agg.total(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::Aggregator, config::ColumnNames, partition::Partitioner,
        schema::{HeaderSchema, UsageRow},
    };
    use anyhow::Result;
    use rust_decimal::dec;

    #[test]
    fn test_one_entry_per_partition_even_when_labels_collide() -> Result<()> {
        let header: Vec<String> = ["客戶名稱", "訂閱名稱", "經銷價", "建議售價"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let schema = HeaderSchema::resolve(&header, &ColumnNames::default())?;
        let internal = "碩益科技股份有限公司";
        let rows: Vec<UsageRow> = vec![
            [internal, "", "5", ""].into_iter().collect(),
            [internal, " ", "7", ""].into_iter().collect(),
            ["Kiki", "", "", "3"].into_iter().collect(),
        ];

        let aggregator = Aggregator::new(&schema);
        let aggregated = Partitioner::new(&schema, internal, "All")
            .partition(&rows)
            .into_iter()
            .map(|p| aggregator.aggregate(p))
            .collect::<Result<Vec<_>, _>>()?;
        let summary = build_summary(&aggregated);

        assert_eq!(summary.len(), aggregated.len());
        assert_eq!(
            summary,
            vec![
                SummaryEntry::new(internal, "All", "經銷價", dec!(5)),
                SummaryEntry::new(internal, "All", "經銷價", dec!(7)),
                SummaryEntry::new("Kiki", "All", "建議售價", dec!(3)),
            ]
        );
        Ok(())
    }
}
