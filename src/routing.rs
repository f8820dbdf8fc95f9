use getset::Getters;
use rust_decimal::Decimal;
use tracing::debug;

use crate::{errors::ReportError, models::SummaryEntry};

#[derive(Debug, Clone)]
struct Route {
    key: String,
    folded: String,
    recipients: Vec<String>,
}

/// Name to recipient list, compared case-insensitively. Keys are kept byte-exact.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    routes: Vec<Route>,
}

impl RoutingTable {
    pub fn from_pairs<I, K>(table: &str, pairs: I) -> Result<Self, ReportError>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: Into<String>,
    {
        let mut routes: Vec<Route> = Vec::new();
        for (key, recipients) in pairs {
            let key = key.into();
            let folded = key.to_lowercase();
            if routes.iter().any(|r| r.folded == folded) {
                return Err(ReportError::DuplicateRoutingKey {
                    table: table.to_owned(),
                    key,
                });
            }
            if recipients.is_empty() {
                return Err(ReportError::Config(format!(
                    "routing table '{table}': '{key}' has no recipients"
                )));
            }
            routes.push(Route {
                key,
                folded,
                recipients,
            });
        }
        Ok(Self { routes })
    }

    /// Matching key as configured, with its recipients.
    pub fn lookup(&self, name: &str) -> Option<(&str, &[String])> {
        let folded = name.to_lowercase();
        self.routes
            .iter()
            .find(|r| r.folded == folded)
            .map(|r| (r.key.as_str(), r.recipients.as_slice()))
    }

    /// Recipients joined for a greeting line, empty when unrouted.
    pub fn greeting_names(&self, name: &str) -> String {
        self.lookup(name)
            .map(|(_, names)| names.join(", "))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Amounts accumulated per key, iterated in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sums {
    entries: Vec<(String, Decimal)>,
}

impl Sums {
    fn add(&mut self, key: &str, amount: Decimal) -> Result<(), ReportError> {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, sum)) => {
                *sum = sum.checked_add(amount).ok_or(ReportError::ValueOverflow)?;
            }
            None => self.entries.push((key.to_owned(), amount)),
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, amount)| *amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Getters)]
pub struct AggregateSums {
    /// Keyed by customer routing key.
    #[getset(get = "pub")]
    customer_sums: Sums,
    /// Keyed by subscription routing key.
    #[getset(get = "pub")]
    internal_sums: Sums,
}

/// Second pass over the summary: sums amounts for every routed customer and subscription.
pub struct Router<'c> {
    customers: &'c RoutingTable,
    subscriptions: &'c RoutingTable,
    sums: AggregateSums,
}

impl<'c> Router<'c> {
    pub fn new(customers: &'c RoutingTable, subscriptions: &'c RoutingTable) -> Self {
        Self {
            customers,
            subscriptions,
            sums: AggregateSums::default(),
        }
    }

    /// An entry may feed both maps, one, or neither.
    pub fn apply(&mut self, entry: &SummaryEntry) -> Result<(), ReportError> {
        let customer = entry.customer().trim();
        let subscription = entry.subscription().trim();
        let mut routed = false;

        if let Some((key, _)) = self.subscriptions.lookup(subscription) {
            self.sums.internal_sums.add(key, entry.amount())?;
            routed = true;
        }
        if let Some((key, _)) = self.customers.lookup(customer) {
            self.sums.customer_sums.add(key, entry.amount())?;
            routed = true;
        }

        if !routed {
            debug!(customer, subscription, "summary entry has no recipients");
        }
        Ok(())
    }

    pub fn finish(self) -> AggregateSums {
        self.sums
    }
}

pub fn route_summary(
    entries: &[SummaryEntry],
    customers: &RoutingTable,
    subscriptions: &RoutingTable,
) -> Result<AggregateSums, ReportError> {
    let mut router = Router::new(customers, subscriptions);
    for entry in entries {
        router.apply(entry)?;
    }
    Ok(router.finish())
}
