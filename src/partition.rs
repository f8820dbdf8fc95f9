use std::collections::{HashMap, hash_map::Entry};

use tracing::debug;

use crate::{
    config::MAX_SHEET_NAME_LEN,
    models::{Partition, PartitionKey},
    schema::{HeaderSchema, UsageRow},
};

/// Groups usage rows by customer, splitting the internal company further by subscription.
pub struct Partitioner<'c> {
    schema: &'c HeaderSchema,
    internal_company: &'c str,
    blank_label: &'c str,
}

impl<'c> Partitioner<'c> {
    pub fn new(schema: &'c HeaderSchema, internal_company: &'c str, blank_label: &'c str) -> Self {
        Self {
            schema,
            internal_company,
            blank_label,
        }
    }

    /// Partitions in first-occurrence order of customer, then of subscription.
    pub fn partition<'a>(&self, rows: &'a [UsageRow]) -> Vec<Partition<'a>> {
        let customer_col = self.schema.customer();
        let subscription_col = self.schema.subscription();

        let mut partitions = Vec::new();
        for (customer, members) in group_in_order(rows.iter(), |r| r.cell(customer_col)) {
            if customer == self.internal_company {
                for (subscription, sub_members) in
                    group_in_order(members.into_iter(), |r| r.cell(subscription_col))
                {
                    let label = subscription_label(subscription, self.blank_label);
                    let name = partition_name(customer, &label);
                    partitions.push(Partition::new(
                        PartitionKey::Subscription {
                            customer: customer.to_owned(),
                            subscription: subscription.to_owned(),
                        },
                        sub_members,
                        label,
                        name,
                    ));
                }
            } else {
                // Undivided groups are labelled after their first row's subscription.
                let first = members.first().map(|r| r.cell(subscription_col)).unwrap_or("");
                let label = subscription_label(first, self.blank_label);
                let name = partition_name(customer, &label);
                partitions.push(Partition::new(
                    PartitionKey::Customer {
                        customer: customer.to_owned(),
                    },
                    members,
                    label,
                    name,
                ));
            }
        }

        debug!(partitions = partitions.len(), rows = rows.len(), "rows partitioned");
        partitions
    }
}

fn group_in_order<'a, I, F>(rows: I, key: F) -> Vec<(&'a str, Vec<&'a UsageRow>)>
where
    I: Iterator<Item = &'a UsageRow>,
    F: Fn(&'a UsageRow) -> &'a str,
{
    let mut positions: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(&'a str, Vec<&'a UsageRow>)> = Vec::new();

    for row in rows {
        let value = key(row);
        match positions.entry(value) {
            Entry::Occupied(slot) => groups[*slot.get()].1.push(row),
            Entry::Vacant(slot) => {
                slot.insert(groups.len());
                groups.push((value, vec![row]));
            }
        }
    }
    groups
}

/// Display label for a subscription value; blank values show as `blank_label`.
pub fn subscription_label(raw: &str, blank_label: &str) -> String {
    if raw.trim().is_empty() {
        blank_label.to_owned()
    } else {
        raw.to_owned()
    }
}

/// `customer_label`, cut to its first 31 characters.
pub fn partition_name(customer: &str, label: &str) -> String {
    format!("{customer}_{label}")
        .chars()
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}
