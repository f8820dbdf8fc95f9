use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use getset::{CopyGetters, Getters};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::{errors::ReportError, schema::UsageRow};

fn round_two_decimals<S>(x: &Decimal, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let rounded = x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    s.serialize_str(&format!("{rounded:.2}"))
}

/// Year and month every draft is labelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, CopyGetters)]
pub struct ReportingPeriod {
    #[getset(get_copy = "pub")]
    year: i32,
    #[getset(get_copy = "pub")]
    month: u32,
}

impl ReportingPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, ReportError> {
        if !(1..=12).contains(&month) {
            return Err(ReportError::InvalidPeriod(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// The calendar month before `date`.
    pub fn preceding(date: NaiveDate) -> Self {
        match date.month() {
            1 => Self {
                year: date.year() - 1,
                month: 12,
            },
            month => Self {
                year: date.year(),
                month: month - 1,
            },
        }
    }
}

impl FromStr for ReportingPeriod {
    type Err = ReportError;

    /// Accepts `YYYY-MM` or `YYYY/MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReportError::InvalidPeriod(s.to_owned());
        let (year, month) = s.trim().split_once(['-', '/']).ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for ReportingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.month)
    }
}

/// How a partition was carved out of the customer grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    /// The whole customer group, no subdivision.
    Customer { customer: String },
    /// One subscription of the internal company.
    Subscription {
        customer: String,
        subscription: String,
    },
}

impl PartitionKey {
    pub fn customer(&self) -> &str {
        match self {
            Self::Customer { customer } | Self::Subscription { customer, .. } => customer,
        }
    }

    /// Raw grouping value, which may be blank. `None` for single-level partitions.
    pub fn subscription(&self) -> Option<&str> {
        match self {
            Self::Customer { .. } => None,
            Self::Subscription { subscription, .. } => Some(subscription.as_str()),
        }
    }

    pub fn is_subdivided(&self) -> bool {
        matches!(self, Self::Subscription { .. })
    }
}

/// Rows sharing a [`PartitionKey`], in input order. Rows are borrowed from the input table.
#[derive(Debug, Clone, Getters)]
pub struct Partition<'a> {
    #[getset(get = "pub")]
    key: PartitionKey,
    #[getset(get = "pub")]
    rows: Vec<&'a UsageRow>,
    #[getset(get = "pub")]
    subscription_label: String,
    #[getset(get = "pub")]
    name: String,
}

impl<'a> Partition<'a> {
    pub fn new(
        key: PartitionKey,
        rows: Vec<&'a UsageRow>,
        subscription_label: String,
        name: String,
    ) -> Self {
        Self {
            key,
            rows,
            subscription_label,
            name,
        }
    }
}

#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct AggregatedPartition<'a> {
    #[getset(get = "pub")]
    partition: Partition<'a>,
    #[getset(get = "pub")]
    total_column: String,
    #[getset(get_copy = "pub")]
    total_column_index: usize,
    #[getset(get_copy = "pub")]
    total: Decimal,
    /// Every row with the inapplicable price cell blanked.
    #[getset(get = "pub")]
    projection: Vec<UsageRow>,
}

impl<'a> AggregatedPartition<'a> {
    pub fn new(
        partition: Partition<'a>,
        total_column: String,
        total_column_index: usize,
        total: Decimal,
        projection: Vec<UsageRow>,
    ) -> Self {
        Self {
            partition,
            total_column,
            total_column_index,
            total,
            projection,
        }
    }
}

/// One summary row: the flattened totals of a single partition.
#[derive(Debug, Clone, PartialEq, Serialize, Getters, CopyGetters)]
pub struct SummaryEntry {
    #[getset(get = "pub")]
    customer: String,
    #[getset(get = "pub")]
    subscription: String,
    #[getset(get = "pub")]
    total_column: String,
    #[getset(get_copy = "pub")]
    #[serde(serialize_with = "round_two_decimals")]
    amount: Decimal,
}

impl SummaryEntry {
    pub fn new(
        customer: impl Into<String>,
        subscription: impl Into<String>,
        total_column: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            customer: customer.into(),
            subscription: subscription.into(),
            total_column: total_column.into(),
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rust_decimal::dec;

    #[test]
    fn test_period_parses_both_separators() -> Result<()> {
        assert_eq!("2025-05".parse::<ReportingPeriod>()?, ReportingPeriod::new(2025, 5)?);
        assert_eq!("2025/5".parse::<ReportingPeriod>()?, ReportingPeriod::new(2025, 5)?);
        Ok(())
    }

    #[test]
    fn test_period_rejects_bad_input() {
        for bad in ["2025", "2025-13", "2025-00", "25-05", "2025-5x", ""] {
            assert!(bad.parse::<ReportingPeriod>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_period_display_is_zero_padded() -> Result<()> {
        assert_eq!(ReportingPeriod::new(2025, 5)?.to_string(), "2025/05");
        Ok(())
    }

    #[test]
    fn test_preceding_month_rolls_over_year() -> Result<()> {
        let jan = NaiveDate::from_ymd_opt(2026, 1, 15).ok_or_else(|| anyhow::anyhow!("date"))?;
        assert_eq!(ReportingPeriod::preceding(jan), ReportingPeriod::new(2025, 12)?);

        let jun = NaiveDate::from_ymd_opt(2025, 6, 1).ok_or_else(|| anyhow::anyhow!("date"))?;
        assert_eq!(ReportingPeriod::preceding(jun), ReportingPeriod::new(2025, 5)?);
        Ok(())
    }

    #[test]
    fn test_partition_key_accessors() {
        let single = PartitionKey::Customer {
            customer: "潘朵拉傳藝有限公司".into(),
        };
        assert_eq!(single.customer(), "潘朵拉傳藝有限公司");
        assert_eq!(single.subscription(), None);
        assert!(!single.is_subdivided());

        let split = PartitionKey::Subscription {
            customer: "碩益科技股份有限公司".into(),
            subscription: "".into(),
        };
        assert_eq!(split.subscription(), Some(""));
        assert!(split.is_subdivided());
    }

    #[test]
    fn test_summary_entry_serializes_two_decimals() -> Result<()> {
        let entry = SummaryEntry::new("客戶", "All", "建議售價", dec!(1234.5));
        let json = serde_json::to_string(&entry)?;
        assert_eq!(
            json,
            r#"{"customer":"客戶","subscription":"All","total_column":"建議售價","amount":"1234.50"}"#
        );
        Ok(())
    }
}
