use std::collections::HashSet;

use anyhow::Result;
use getset::Getters;
use tracing::warn;

use crate::{
    config::MAX_SHEET_NAME_LEN,
    models::{AggregatedPartition, SummaryEntry},
    money::group_thousands,
    schema::HeaderSchema,
    traits::{ReportSink, SummarySource},
};

const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Hands out unique sheet names. Names compare case-insensitively, like Excel does.
///
/// A taken name gets `~2`, `~3`, ... in place of its tail so it never exceeds 31 characters.
#[derive(Debug, Default)]
pub struct SheetNames {
    taken: HashSet<String>,
}

impl SheetNames {
    pub fn with_reserved<'r>(reserved: impl IntoIterator<Item = &'r str>) -> Self {
        Self {
            taken: reserved.into_iter().map(str::to_lowercase).collect(),
        }
    }

    pub fn allocate(&mut self, name: &str) -> String {
        let base = sanitize(name);
        let mut candidate = base.clone();
        let mut n = 2usize;
        while self.taken.contains(&candidate.to_lowercase()) {
            let suffix = format!("~{n}");
            let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
            candidate = base.chars().take(keep).chain(suffix.chars()).collect();
            n += 1;
        }
        if candidate != base {
            warn!(name, sheet = %candidate, "sheet name already used, renamed");
        }
        self.taken.insert(candidate.to_lowercase());
        candidate
    }
}

fn sanitize(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if cleaned.starts_with('\'') {
        cleaned.replace_range(..1, "_");
    }
    if cleaned.ends_with('\'') {
        cleaned.pop();
        cleaned.push('_');
    }
    if cleaned.trim().is_empty() {
        cleaned = "Sheet".to_owned();
    }
    cleaned
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct MemorySheet {
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    rows: Vec<Vec<String>>,
}

/// Keeps the report in memory. Used for dry runs and tests.
#[derive(Debug, Getters)]
pub struct MemoryReport {
    #[getset(get = "pub")]
    sheets: Vec<MemorySheet>,
    #[getset(get = "pub")]
    summary: Vec<SummaryEntry>,
    #[getset(get = "pub")]
    finished: bool,
    names: SheetNames,
    total_label: String,
}

impl MemoryReport {
    pub fn new(summary_sheet: &str, total_label: &str) -> Self {
        Self {
            sheets: Vec::new(),
            summary: Vec::new(),
            finished: false,
            names: SheetNames::with_reserved([summary_sheet]),
            total_label: total_label.to_owned(),
        }
    }
}

impl ReportSink for MemoryReport {
    fn write_partition(
        &mut self,
        name: &str,
        schema: &HeaderSchema,
        partition: &AggregatedPartition<'_>,
    ) -> Result<()> {
        let mut rows = vec![schema.names().clone()];
        rows.extend(partition.projection().iter().map(|r| r.cells().to_vec()));

        let mut total_row = vec![String::new(); schema.width()];
        if let Some(first) = total_row.first_mut() {
            *first = self.total_label.clone();
        }
        total_row[partition.total_column_index()] =
            format!("NT${}", group_thousands(partition.total(), 2));
        rows.push(total_row);

        self.sheets.push(MemorySheet {
            name: self.names.allocate(name),
            rows,
        });
        Ok(())
    }

    fn write_summary(&mut self, entries: &[SummaryEntry]) -> Result<()> {
        self.summary = entries.to_vec();
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

impl SummarySource for MemoryReport {
    fn read_summary(&mut self) -> Result<Vec<SummaryEntry>> {
        Ok(self.summary.clone())
    }
}
