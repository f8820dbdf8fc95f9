use getset::Getters;
use rust_decimal::Decimal;
use tracing::debug;

use crate::{
    config::MailConfig,
    models::ReportingPeriod,
    money::{group_thousands, nt_dollars},
    routing::{AggregateSums, RoutingTable},
};

const SEPARATOR_WIDTH: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct EmailDraft {
    #[getset(get = "pub")]
    subject: String,
    #[getset(get = "pub")]
    body: Vec<String>,
}

impl EmailDraft {
    /// Subject, body lines, then the dashed separator, one line each.
    pub fn render_into(&self, out: &mut String) {
        out.push_str(&self.subject);
        out.push('\n');
        for line in &self.body {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&"-".repeat(SEPARATOR_WIDTH));
        out.push('\n');
    }
}

pub fn render_drafts(drafts: &[EmailDraft]) -> String {
    let mut out = String::new();
    for draft in drafts {
        draft.render_into(&mut out);
    }
    out
}

/// Builds the monthly statement drafts from routed sums.
pub struct Composer<'c> {
    mail: &'c MailConfig,
    customers: &'c RoutingTable,
    subscriptions: &'c RoutingTable,
    period: ReportingPeriod,
}

impl<'c> Composer<'c> {
    pub fn new(
        mail: &'c MailConfig,
        customers: &'c RoutingTable,
        subscriptions: &'c RoutingTable,
        period: ReportingPeriod,
    ) -> Self {
        Self {
            mail,
            customers,
            subscriptions,
            period,
        }
    }

    /// Customer invoices, the merged draft, remaining internal notices, then the accounting roll-up.
    pub fn compose(&self, sums: &AggregateSums) -> Vec<EmailDraft> {
        let mut drafts = Vec::new();

        for (customer, amount) in sums.customer_sums().iter() {
            drafts.push(self.invoice(customer, amount));
        }

        let merged = self.merged_total(sums);
        if merged > Decimal::ZERO {
            drafts.push(self.internal_notice(
                &self.mail.merged_label,
                &self.mail.merged_recipients.join(", "),
                merged,
            ));
        }

        for (subscription, amount) in self.unmerged(sums) {
            let label = self.short_subscription(subscription);
            let recipients = self.subscriptions.greeting_names(subscription);
            drafts.push(self.internal_notice(&label, &recipients, amount));
        }

        drafts.push(self.rollup(sums, merged));

        debug!(drafts = drafts.len(), period = %self.period, "drafts composed");
        drafts
    }

    /// Sum of the merged subscriptions, zero when none were routed.
    pub fn merged_total(&self, sums: &AggregateSums) -> Decimal {
        sums.internal_sums()
            .iter()
            .filter(|(key, _)| self.mail.is_merged(key))
            .map(|(_, amount)| amount)
            .sum()
    }

    fn unmerged<'s>(&self, sums: &'s AggregateSums) -> impl Iterator<Item = (&'s str, Decimal)> {
        let mail = self.mail;
        sums.internal_sums()
            .iter()
            .filter(move |(key, _)| !mail.is_merged(key))
    }

    fn invoice(&self, customer: &str, amount: Decimal) -> EmailDraft {
        EmailDraft {
            subject: self.subject(&self.short_customer(customer)),
            body: vec![
                format!("Dear {},", self.customers.greeting_names(customer)),
                String::new(),
                self.amount_sentence(amount),
                "If you have any questions about the details, please let us know; \
                 if everything is correct, please reply to confirm. Thank you."
                    .to_owned(),
                String::new(),
                "Note: objections must be raised within 3 business days, \
                 otherwise the statement is deemed confirmed."
                    .to_owned(),
            ],
        }
    }

    fn internal_notice(&self, label: &str, recipients: &str, amount: Decimal) -> EmailDraft {
        EmailDraft {
            subject: self.subject(label),
            body: vec![
                format!("Dear {recipients},"),
                String::new(),
                self.amount_sentence(amount),
                "If you have any questions about the details, please let us know. Thank you."
                    .to_owned(),
            ],
        }
    }

    fn rollup(&self, sums: &AggregateSums, merged: Decimal) -> EmailDraft {
        let mut body = vec![
            format!("Dear {},", self.mail.accounting_recipient),
            String::new(),
            format!(
                "Attached is the Azure statement for {} provided by {}; \
                 the amounts have been confirmed with the customers.",
                self.period, self.mail.vendor
            ),
            "Please issue the following invoices to the customers:".to_owned(),
            String::new(),
        ];

        for (customer, amount) in sums.customer_sums().iter() {
            body.push(self.ledger_line(customer, amount));
        }

        body.push(String::new());
        body.push("Company cost allocation is as follows:".to_owned());

        for (subscription, amount) in self.unmerged(sums) {
            body.push(self.ledger_line(&self.short_subscription(subscription), amount));
        }
        body.push(self.ledger_line(&self.mail.merged_label, merged));

        body.push(String::new());
        body.push("Thank you for your help!".to_owned());

        EmailDraft {
            subject: format!("Azure statement {}", self.period),
            body,
        }
    }

    fn subject(&self, label: &str) -> String {
        format!("[{label}] Azure statement {}", self.period)
    }

    fn amount_sentence(&self, amount: Decimal) -> String {
        format!(
            "Attached is the Azure statement detail for {}. The actual amount is {} (tax excluded).",
            self.period,
            nt_dollars(amount)
        )
    }

    fn ledger_line(&self, name: &str, amount: Decimal) -> String {
        format!(
            "{:<name_w$} NT$ {:>amount_w$}",
            name,
            group_thousands(amount, 0),
            name_w = self.mail.name_width,
            amount_w = self.mail.amount_width,
        )
    }

    fn short_customer(&self, customer: &str) -> String {
        self.mail
            .corporate_suffixes
            .iter()
            .filter(|s| !s.is_empty())
            .fold(customer.to_owned(), |name, suffix| name.replace(suffix.as_str(), ""))
    }

    fn short_subscription(&self, subscription: &str) -> String {
        match self.mail.subscription_suffix.as_str() {
            "" => subscription.to_owned(),
            suffix => subscription.replace(suffix, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::SummaryEntry, routing::route_summary};
    use anyhow::Result;
    use rust_decimal::dec;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn tables() -> Result<(RoutingTable, RoutingTable)> {
        let customers = RoutingTable::from_pairs(
            "customers",
            [
                ("台灣保時捷車業股份有限公司", names(&["David"])),
                ("瑞士商福維克有限公司台灣分公司", names(&["Edison"])),
            ],
        )?;
        let subscriptions = RoutingTable::from_pairs(
            "subscriptions",
            [
                ("BA Microsoft Azure", names(&["Ben", "Victor"])),
                ("Soetek BA", names(&["Ben", "Victor"])),
                ("FY Microsoft Azure", names(&["Jimmy", "Potter"])),
            ],
        )?;
        Ok((customers, subscriptions))
    }

    fn period() -> Result<ReportingPeriod> {
        Ok(ReportingPeriod::new(2025, 5)?)
    }

    fn compose(entries: &[SummaryEntry]) -> Result<(Vec<EmailDraft>, Decimal)> {
        let (customers, subscriptions) = tables()?;
        let mail = MailConfig::default();
        let sums = route_summary(entries, &customers, &subscriptions)?;
        let composer = Composer::new(&mail, &customers, &subscriptions, period()?);
        Ok((composer.compose(&sums), composer.merged_total(&sums)))
    }

    #[test]
    fn test_merged_draft_reads_combined_amount() -> Result<()> {
        let internal = "碩益科技股份有限公司";
        let (drafts, merged) = compose(&[
            SummaryEntry::new(internal, "BA Microsoft Azure", "經銷價", dec!(100)),
            SummaryEntry::new(internal, "Soetek BA", "經銷價", dec!(200)),
        ])?;

        assert_eq!(merged, dec!(300));
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].subject(), "[BA] Azure statement 2025/05");
        assert_eq!(drafts[0].body()[0], "Dear Ben, Victor,");
        assert!(drafts[0].body()[2].contains("NT$300 "));
        Ok(())
    }

    #[test]
    fn test_draft_order_and_shapes() -> Result<()> {
        let (drafts, _) = compose(&[
            SummaryEntry::new("碩益科技股份有限公司", "FY Microsoft Azure", "經銷價", dec!(1234.5)),
            SummaryEntry::new("台灣保時捷車業股份有限公司", "All", "建議售價", dec!(45678)),
            SummaryEntry::new("瑞士商福維克有限公司台灣分公司", "All", "建議售價", dec!(12)),
            SummaryEntry::new("Unrouted Ltd", "All", "建議售價", dec!(99)),
        ])?;

        let subjects: Vec<&str> = drafts.iter().map(|d| d.subject().as_str()).collect();
        assert_eq!(
            subjects,
            [
                "[台灣保時捷車業] Azure statement 2025/05",
                "[瑞士商福維克] Azure statement 2025/05",
                "[FY] Azure statement 2025/05",
                "Azure statement 2025/05",
            ]
        );

        let invoice = &drafts[0];
        assert_eq!(invoice.body()[0], "Dear David,");
        assert!(invoice.body()[2].contains("NT$45,678"));
        assert!(invoice.body().iter().any(|l| l.contains("3 business days")));

        let notice = &drafts[2];
        assert_eq!(notice.body()[0], "Dear Jimmy, Potter,");
        assert!(notice.body()[2].contains("NT$1,235"));
        assert!(!notice.body().iter().any(|l| l.contains("3 business days")));
        Ok(())
    }

    #[test]
    fn test_rollup_lists_every_routed_amount() -> Result<()> {
        let (drafts, _) = compose(&[
            SummaryEntry::new("台灣保時捷車業股份有限公司", "All", "建議售價", dec!(45678)),
            SummaryEntry::new("碩益科技股份有限公司", "FY Microsoft Azure", "經銷價", dec!(800)),
        ])?;

        let rollup = drafts.last().ok_or_else(|| anyhow::anyhow!("no rollup"))?;
        assert_eq!(rollup.body()[0], "Dear Evelyn,");
        assert!(rollup.body()[2].contains("零壹"));

        let expected = [
            format!("{:<30} NT$ {:>10}", "台灣保時捷車業股份有限公司", "45,678"),
            format!("{:<30} NT$ {:>10}", "FY", "800"),
            format!("{:<30} NT$ {:>10}", "BA", "0"),
        ];
        for line in &expected {
            assert!(rollup.body().contains(line), "missing {line:?}");
        }
        assert_eq!(rollup.body().last().map(String::as_str), Some("Thank you for your help!"));
        Ok(())
    }

    #[test]
    fn test_no_merged_draft_when_total_is_zero() -> Result<()> {
        let (drafts, merged) = compose(&[])?;
        assert_eq!(merged, Decimal::ZERO);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].subject(), "Azure statement 2025/05");
        Ok(())
    }

    #[test]
    fn test_render_terminates_each_draft_with_separator() -> Result<()> {
        let (drafts, _) = compose(&[SummaryEntry::new(
            "碩益科技股份有限公司",
            "Soetek BA",
            "經銷價",
            dec!(5),
        )])?;
        let text = render_drafts(&drafts);
        let separator = "-".repeat(60);

        assert_eq!(text.lines().filter(|l| *l == separator).count(), drafts.len());
        assert!(text.starts_with("[BA] Azure statement 2025/05\n"));
        assert!(text.ends_with(&format!("{separator}\n")));
        Ok(())
    }
}
