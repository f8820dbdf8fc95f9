use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

mod aggregate;
mod compose;
mod config;
mod csv_writer;
mod errors;
mod logging;
mod models;
mod money;
mod partition;
mod processor;
mod report;
mod routing;
mod schema;
mod sources;
mod summary;
mod traits;
mod workbook;

use config::Config;
use models::ReportingPeriod;
use processor::{Engine, RunReport};
use report::MemoryReport;
use sources::CsvUsageSource;
use traits::UsageSource;
use workbook::{WorkbookReport, WorkbookUsageSource};

const DEFAULT_CONFIG: &str = "routing.toml";

/// Splits a monthly Azure usage ledger into per-customer sheets and drafts the statement emails.
#[derive(Parser)]
#[command(name = "azure-billing-report", version)]
struct Cli {
    /// Usage ledger, `.csv` or an Excel workbook
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Routing and column configuration
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Reporting period as YYYY-MM (default: the month before today)
    #[arg(long, short = 'p')]
    period: Option<ReportingPeriod>,

    /// Directory for the default output files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Report workbook path (default: "<yyyyMMdd> 處理完成.xlsx" in the output directory)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Email drafts path (default: "<yyyyMMdd> Azure_對帳單_信件總表.txt" in the output directory)
    #[arg(long)]
    drafts: Option<PathBuf>,

    /// Also print the summary table to stdout as CSV
    #[arg(long)]
    print_summary: bool,

    /// Build everything in memory and print the drafts instead of writing files
    #[arg(long)]
    dry_run: bool,
}

fn open_source(path: &Path, config: &Config) -> Result<Box<dyn UsageSource>> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Box::new(CsvUsageSource::new(BufReader::new(file))))
    } else {
        Ok(Box::new(WorkbookUsageSource::new(path, config.input.sheet.as_str())))
    }
}

fn report_routing(report: &RunReport) {
    let sums = report.sums();
    if sums.customer_sums().is_empty() {
        warn!("no summary entry matched a customer route; no invoices drafted");
    }
    info!(
        invoices = sums.customer_sums().len(),
        internal = sums.internal_sums().len(),
        "routing complete"
    );
}

fn main() -> Result<()> {
    tracing::subscriber::set_global_default(logging::subscriber(
        logging::env_filter(),
        std::io::stderr,
    ))?;

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    if config.customers.is_empty() && config.subscriptions.is_empty() {
        warn!(path = %cli.config.display(), "routing tables are empty");
    }
    info!(
        customers = config.customers.len(),
        subscriptions = config.subscriptions.len(),
        "routing loaded"
    );
    let today = Local::now().date_naive();
    let period = cli.period.unwrap_or_else(|| ReportingPeriod::preceding(today));
    info!(period = %period, input = %cli.input.display(), "starting run");

    let source = open_source(&cli.input, &config)?;

    let report = if cli.dry_run {
        let sink = MemoryReport::new(&config.report.summary_sheet, &config.report.total_label);
        let mut engine = Engine::new(&config, source, sink);
        let report = engine.run(period)?;
        info!(sheets = engine.into_sink().sheets().len(), "report built in memory");
        print!("{}", report.text());
        report
    } else {
        let stamp = today.format("%Y%m%d");
        let report_path = cli
            .report
            .unwrap_or_else(|| cli.output_dir.join(format!("{stamp} 處理完成.xlsx")));
        let drafts_path = cli
            .drafts
            .unwrap_or_else(|| cli.output_dir.join(format!("{stamp} Azure_對帳單_信件總表.txt")));

        let sink = WorkbookReport::new(&report_path, &config.report)?;
        let mut engine = Engine::new(&config, source, sink);
        let report = engine.run(period)?;
        let sink = engine.into_sink();

        if let Some(dir) = drafts_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        fs::write(&drafts_path, report.text())
            .with_context(|| format!("writing drafts {}", drafts_path.display()))?;
        info!(
            report = %sink.path().display(),
            path = %drafts_path.display(),
            drafts = report.drafts().len(),
            "drafts saved"
        );
        report
    };
    report_routing(&report);

    if cli.print_summary {
        let mut writer = csv_writer::CsvSummaryWriter::stdout();
        writer.write_entries(report.summary())?;
        writer.into_inner()?;
    }

    Ok(())
}
