use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use calamine::{Data, Reader, open_workbook_auto};
use rust_decimal::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, info};

use crate::{
    config::ReportConfig,
    errors::ReportError,
    models::{AggregatedPartition, SummaryEntry},
    money::parse_amount,
    report::SheetNames,
    schema::{HeaderSchema, RawTable, UsageRow},
    traits::{ReportSink, SummarySource, UsageSource},
};

const FONT: &str = "Calibri";
const MONEY_FORMAT: &str = "\"NT$\"#,##0.00";

/// Cell text as the usage export shows it. Numbers render without exponent.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn cell_amount(cell: &Data) -> Option<Decimal> {
    match cell {
        Data::Float(f) => Decimal::from_f64(*f),
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::String(s) => parse_amount(s),
        _ => None,
    }
}

fn read_sheet(path: &Path, sheet: &str) -> Result<Vec<Vec<Data>>> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("opening {}", path.display()))?;
    if !workbook.sheet_names().iter().any(|n| n == sheet) {
        return Err(ReportError::SheetNotFound(sheet.to_owned()).into());
    }
    let range = workbook
        .worksheet_range(sheet)
        .with_context(|| format!("reading sheet '{sheet}' of {}", path.display()))?;
    Ok(range.rows().map(|r| r.to_vec()).collect())
}

fn is_blank_row(row: &[Data]) -> bool {
    row.iter().all(|c| cell_text(c).trim().is_empty())
}

/// Usage ledger stored as a sheet of an Excel workbook.
pub struct WorkbookUsageSource {
    path: PathBuf,
    sheet: String,
}

impl WorkbookUsageSource {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
        }
    }
}

impl UsageSource for WorkbookUsageSource {
    fn read_table(&mut self) -> Result<RawTable> {
        let mut used = read_sheet(&self.path, &self.sheet)?
            .into_iter()
            .filter(|r| !is_blank_row(r));

        let header = match used.next() {
            Some(row) => row.iter().map(cell_text).collect(),
            None => Vec::new(),
        };
        let rows: Vec<UsageRow> = used.map(|r| r.iter().map(cell_text).collect()).collect();

        info!(sheet = %self.sheet, rows = rows.len(), "usage rows read from workbook");
        Ok(RawTable { header, rows })
    }
}

/// The partitioned report as an `.xlsx` workbook: the summary sheet first, then one sheet per
/// partition. Nothing reaches disk until [`ReportSink::finish`].
pub struct WorkbookReport {
    path: PathBuf,
    workbook: Workbook,
    names: SheetNames,
    summary_sheet: String,
    summary_headers: [String; 4],
    total_label: String,
    plain: Format,
    bold: Format,
    money: Format,
    bold_money: Format,
    saved: bool,
}

impl WorkbookReport {
    pub fn new(path: impl Into<PathBuf>, report: &ReportConfig) -> Result<Self> {
        let mut workbook = Workbook::new();
        workbook.add_worksheet().set_name(&report.summary_sheet)?;

        let plain = Format::new().set_font_name(FONT);
        Ok(Self {
            path: path.into(),
            workbook,
            names: SheetNames::with_reserved([report.summary_sheet.as_str()]),
            summary_sheet: report.summary_sheet.clone(),
            summary_headers: report.summary_headers.clone(),
            total_label: report.total_label.clone(),
            bold: plain.clone().set_bold(),
            money: plain.clone().set_num_format(MONEY_FORMAT),
            bold_money: plain.clone().set_bold().set_num_format(MONEY_FORMAT),
            plain,
            saved: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn position(row: usize, col: usize) -> Result<(u32, u16)> {
    Ok((u32::try_from(row)?, u16::try_from(col)?))
}

impl ReportSink for WorkbookReport {
    fn write_partition(
        &mut self,
        name: &str,
        schema: &HeaderSchema,
        partition: &AggregatedPartition<'_>,
    ) -> Result<()> {
        let sheet_name = self.names.allocate(name);
        let sheet = self.workbook.add_worksheet();
        sheet.set_name(&sheet_name)?;

        for (c, title) in schema.names().iter().enumerate() {
            let (r, c) = position(0, c)?;
            sheet.write_string_with_format(r, c, title, &self.bold)?;
        }

        let mut row = 1;
        for projected in partition.projection() {
            for (c, value) in projected.cells().iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let (r, c) = position(row, c)?;
                sheet.write_string_with_format(r, c, value, &self.plain)?;
            }
            row += 1;
        }

        let total_idx = partition.total_column_index();
        if total_idx != 0 {
            let (r, c) = position(row, 0)?;
            sheet.write_string_with_format(r, c, &self.total_label, &self.bold)?;
        }
        let total = partition.total().to_f64().ok_or(ReportError::ValueOverflow)?;
        let (r, c) = position(row, total_idx)?;
        sheet.write_number_with_format(r, c, total, &self.bold_money)?;

        debug!(sheet = %sheet_name, rows = partition.projection().len(), "partition sheet written");
        Ok(())
    }

    fn write_summary(&mut self, entries: &[SummaryEntry]) -> Result<()> {
        let sheet = self.workbook.worksheet_from_index(0)?;

        for (c, title) in self.summary_headers.iter().enumerate() {
            let (r, c) = position(0, c)?;
            sheet.write_string_with_format(r, c, title, &self.bold)?;
        }
        for (i, entry) in entries.iter().enumerate() {
            let row = u32::try_from(i + 1)?;
            sheet.write_string_with_format(row, 0, entry.customer(), &self.plain)?;
            sheet.write_string_with_format(row, 1, entry.subscription(), &self.plain)?;
            sheet.write_string_with_format(row, 2, entry.total_column(), &self.plain)?;
            let amount = entry.amount().to_f64().ok_or(ReportError::ValueOverflow)?;
            sheet.write_number_with_format(row, 3, amount, &self.money)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        self.workbook
            .save(&self.path)
            .with_context(|| format!("saving report {}", self.path.display()))?;
        self.saved = true;
        info!(path = %self.path.display(), "report saved");
        Ok(())
    }
}

impl SummarySource for WorkbookReport {
    /// Reopens the saved workbook and reads its summary sheet.
    fn read_summary(&mut self) -> Result<Vec<SummaryEntry>> {
        if !self.saved {
            return Err(anyhow!("report {} has not been saved", self.path.display()));
        }
        read_summary_sheet(&self.path, &self.summary_sheet)
    }
}

/// Summary rows below the header: customer, subscription, total column, amount.
pub fn read_summary_sheet(path: &Path, sheet: &str) -> Result<Vec<SummaryEntry>> {
    let mut entries = Vec::new();
    for (i, row) in read_sheet(path, sheet)?.iter().enumerate().skip(1) {
        if is_blank_row(row) {
            continue;
        }
        let text = |c: usize| row.get(c).map(cell_text).unwrap_or_default();
        let amount = row.get(3).and_then(cell_amount).ok_or_else(|| {
            ReportError::InvalidSummaryRow {
                row: i + 1,
                reason: format!("amount '{}' is not a number", text(3)),
            }
        })?;
        entries.push(SummaryEntry::new(
            text(0).trim(),
            text(1).trim(),
            text(2).trim(),
            amount,
        ));
    }
    debug!(entries = entries.len(), "summary read back");
    Ok(entries)
}
