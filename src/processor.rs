use anyhow::Result;
use getset::Getters;
use tracing::info;

use crate::{
    aggregate::Aggregator,
    compose::{Composer, EmailDraft, render_drafts},
    config::Config,
    models::{ReportingPeriod, SummaryEntry},
    partition::Partitioner,
    routing::{AggregateSums, route_summary},
    schema::HeaderSchema,
    summary::build_summary,
    traits::{ReportSink, SummarySource, UsageSource},
};

/// What a run produced besides the report itself.
#[derive(Debug, Getters)]
pub struct RunReport {
    /// Summary as written in pass one.
    #[getset(get = "pub")]
    summary: Vec<SummaryEntry>,
    #[getset(get = "pub")]
    sums: AggregateSums,
    #[getset(get = "pub")]
    drafts: Vec<EmailDraft>,
    #[getset(get = "pub")]
    text: String,
}

pub struct Engine<'c, S, R> {
    config: &'c Config,
    source: S,
    sink: R,
}

impl<'c, S, R> Engine<'c, S, R>
where
    S: UsageSource,
    R: ReportSink + SummarySource,
{
    pub fn new(config: &'c Config, source: S, sink: R) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    /// Builds the report, then re-reads its summary to route amounts and compose drafts.
    pub fn run(&mut self, period: ReportingPeriod) -> Result<RunReport> {
        let summary = self.build_report()?;

        let entries = self.sink.read_summary()?;
        let sums = route_summary(&entries, &self.config.customers, &self.config.subscriptions)?;
        info!(
            customers = sums.customer_sums().len(),
            subscriptions = sums.internal_sums().len(),
            "summary routed"
        );

        let drafts = Composer::new(
            &self.config.mail,
            &self.config.customers,
            &self.config.subscriptions,
            period,
        )
        .compose(&sums);
        let text = render_drafts(&drafts);

        Ok(RunReport {
            summary,
            sums,
            drafts,
            text,
        })
    }

    fn build_report(&mut self) -> Result<Vec<SummaryEntry>> {
        let table = self.source.read_table()?;
        let schema = HeaderSchema::resolve(&table.header, &self.config.columns)?;

        let partitions = Partitioner::new(
            &schema,
            &self.config.internal_company,
            &self.config.blank_subscription_label,
        )
        .partition(&table.rows);
        info!(rows = table.rows.len(), partitions = partitions.len(), "usage partitioned");

        let aggregator = Aggregator::new(&schema);
        let mut aggregated = Vec::with_capacity(partitions.len());
        for partition in partitions {
            let agg = aggregator.aggregate(partition)?;
            self.sink.write_partition(agg.partition().name(), &schema, &agg)?;
            aggregated.push(agg);
        }

        let summary = build_summary(&aggregated);
        self.sink.write_summary(&summary)?;
        self.sink.finish()?;
        Ok(summary)
    }

    pub fn into_sink(self) -> R {
        self.sink
    }
}
