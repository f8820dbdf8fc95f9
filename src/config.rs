use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{errors::ReportError, routing::RoutingTable};

/// Excel refuses longer sheet names; partition names honour the same limit everywhere.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Runtime configuration, loaded from a TOML file.
///
/// Everything except the two routing tables has a default matching the monthly Azure usage export.
#[derive(Debug, Clone)]
pub struct Config {
    pub internal_company: String,
    pub blank_subscription_label: String,
    pub input: InputConfig,
    pub columns: ColumnNames,
    pub report: ReportConfig,
    pub mail: MailConfig,
    pub customers: RoutingTable,
    pub subscriptions: RoutingTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_company: default_internal_company(),
            blank_subscription_label: default_blank_label(),
            input: InputConfig::default(),
            columns: ColumnNames::default(),
            report: ReportConfig::default(),
            mail: MailConfig::default(),
            customers: RoutingTable::default(),
            subscriptions: RoutingTable::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading config {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;

        let config = Self {
            internal_company: file.internal_company,
            blank_subscription_label: file.blank_subscription_label,
            input: file.input,
            columns: file.columns,
            report: file.report,
            mail: file.mail,
            customers: RoutingTable::from_pairs(
                "customers",
                file.routing.customers.into_iter().map(|(k, v)| (k, v.into_names())),
            )?,
            subscriptions: RoutingTable::from_pairs(
                "subscriptions",
                file.routing.subscriptions.into_iter().map(|(k, v)| (k, v.into_names())),
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ReportError> {
        if self.internal_company.trim().is_empty() {
            return Err(ReportError::Config("internal_company must not be empty".into()));
        }

        let required = self.columns.required();
        for (i, name) in required.iter().enumerate() {
            if name.is_empty() {
                return Err(ReportError::Config("column names must not be empty".into()));
            }
            if required[..i].contains(name) {
                return Err(ReportError::Config(format!("column '{name}' is mapped twice")));
            }
        }

        let summary = &self.report.summary_sheet;
        if summary.trim().is_empty() || summary.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(ReportError::Config(format!(
                "summary sheet name must be 1..={MAX_SHEET_NAME_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ConfigFile {
    internal_company: String,
    blank_subscription_label: String,
    input: InputConfig,
    columns: ColumnNames,
    report: ReportConfig,
    mail: MailConfig,
    routing: RoutingFile,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            internal_company: default_internal_company(),
            blank_subscription_label: default_blank_label(),
            input: InputConfig::default(),
            columns: ColumnNames::default(),
            report: ReportConfig::default(),
            mail: MailConfig::default(),
            routing: RoutingFile::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RoutingFile {
    customers: BTreeMap<String, Recipients>,
    subscriptions: BTreeMap<String, Recipients>,
}

/// Recipients may be written as a list or as one comma separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    fn into_names(self) -> Vec<String> {
        let names = match self {
            Self::One(joined) => joined.split(',').map(str::to_owned).collect(),
            Self::Many(names) => names,
        };
        names
            .into_iter()
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

fn default_internal_company() -> String {
    "碩益科技股份有限公司".into()
}

fn default_blank_label() -> String {
    "All".into()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Sheet holding the usage rows when the input is a workbook.
    pub sheet: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sheet: "用量明細".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub customer: String,
    pub subscription: String,
    pub distributor_price: String,
    pub suggested_price: String,
}

impl ColumnNames {
    pub fn required(&self) -> [&str; 4] {
        [
            &self.customer,
            &self.subscription,
            &self.distributor_price,
            &self.suggested_price,
        ]
    }
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            customer: "客戶名稱".into(),
            subscription: "訂閱名稱".into(),
            distributor_price: "經銷價".into(),
            suggested_price: "建議售價".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub summary_sheet: String,
    /// Customer, subscription, total column, total.
    pub summary_headers: [String; 4],
    pub total_label: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            summary_sheet: "總表".into(),
            summary_headers: [
                "客戶名稱".into(),
                "訂閱名稱".into(),
                "金額欄位".into(),
                "總計".into(),
            ],
            total_label: "總計".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub merged_label: String,
    pub merged_subscriptions: Vec<String>,
    pub merged_recipients: Vec<String>,
    pub subscription_suffix: String,
    pub corporate_suffixes: Vec<String>,
    pub accounting_recipient: String,
    pub vendor: String,
    pub name_width: usize,
    pub amount_width: usize,
}

impl MailConfig {
    pub fn is_merged(&self, subscription: &str) -> bool {
        self.merged_subscriptions
            .iter()
            .any(|m| m.to_lowercase() == subscription.to_lowercase())
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            merged_label: "BA".into(),
            merged_subscriptions: vec!["BA Microsoft Azure".into(), "Soetek BA".into()],
            merged_recipients: vec!["Ben".into(), "Victor".into()],
            subscription_suffix: " Microsoft Azure".into(),
            corporate_suffixes: vec!["有限公司".into(), "股份".into(), "台灣分公司".into()],
            accounting_recipient: "Evelyn".into(),
            vendor: "零壹".into(),
            name_width: 30,
            amount_width: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() -> Result<()> {
        let config = Config::from_toml_str("")?;
        assert_eq!(config.internal_company, "碩益科技股份有限公司");
        assert_eq!(config.columns, ColumnNames::default());
        assert_eq!(config.report.summary_sheet, "總表");
        assert!(config.customers.is_empty());
        assert!(config.subscriptions.is_empty());
        Ok(())
    }

    #[test]
    fn test_routing_tables_accept_lists_and_joined_strings() -> Result<()> {
        let config = Config::from_toml_str(
            r#"
[routing.customers]
"台灣保時捷車業股份有限公司" = ["David"]

[routing.subscriptions]
"FY Microsoft Azure" = "Jimmy, Potter"
"#,
        )?;

        let (key, names) = config
            .subscriptions
            .lookup("fy microsoft azure")
            .ok_or_else(|| anyhow::anyhow!("missing route"))?;
        assert_eq!(key, "FY Microsoft Azure");
        assert_eq!(names, ["Jimmy".to_string(), "Potter".to_string()]);

        assert!(config.customers.lookup("台灣保時捷車業股份有限公司").is_some());
        Ok(())
    }

    #[test]
    fn test_overrides_are_applied() -> Result<()> {
        let config = Config::from_toml_str(
            r#"
internal_company = "Contoso"
blank_subscription_label = "全部"

[columns]
customer = "Customer"

[mail]
accounting_recipient = "Ann"
"#,
        )?;
        assert_eq!(config.internal_company, "Contoso");
        assert_eq!(config.blank_subscription_label, "全部");
        assert_eq!(config.columns.customer, "Customer");
        assert_eq!(config.columns.subscription, "訂閱名稱");
        assert_eq!(config.mail.accounting_recipient, "Ann");
        assert_eq!(config.mail.merged_label, "BA");
        Ok(())
    }

    #[test]
    fn test_shipped_routing_file_loads() -> Result<()> {
        let config = Config::from_toml_str(include_str!("../routing.toml"))?;
        assert_eq!(config.customers.len(), 8);
        assert_eq!(config.subscriptions.len(), 6);
        assert_eq!(config.customers.greeting_names("潘朵拉傳藝有限公司"), "許小姐");
        assert_eq!(config.subscriptions.greeting_names("soetek ba"), "Ben, Victor");
        Ok(())
    }

    #[test]
    fn test_case_insensitive_duplicate_keys_rejected() {
        let res = Config::from_toml_str(
            r#"
[routing.subscriptions]
"SMB Microsoft Azure" = ["Momo"]
"smb microsoft azure" = ["Momo"]
"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_column_mapped_twice_rejected() {
        let res = Config::from_toml_str(
            r#"
[columns]
distributor_price = "price"
suggested_price = "price"
"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_merge_membership_ignores_case() {
        let mail = MailConfig::default();
        assert!(mail.is_merged("soetek ba"));
        assert!(!mail.is_merged("SMB Microsoft Azure"));
    }
}
