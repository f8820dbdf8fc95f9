use std::collections::HashMap;

use getset::{CopyGetters, Getters};

use crate::{config::ColumnNames, errors::ReportError};

/// One usage line item. Cells are only addressed through a [`HeaderSchema`] index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageRow {
    cells: Vec<String>,
}

impl UsageRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    /// Missing trailing cells read as empty text.
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    /// Copies `width` cells, leaving the cell at `blanked` empty.
    pub fn redacted(&self, width: usize, blanked: usize) -> UsageRow {
        let cells = (0..width)
            .map(|i| {
                if i == blanked {
                    String::new()
                } else {
                    self.cell(i).to_owned()
                }
            })
            .collect();
        UsageRow { cells }
    }
}

impl<S: Into<String>> FromIterator<S> for UsageRow {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Header row plus the data rows beneath it, as read from the input collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<UsageRow>,
}

/// Header row resolved once into stable column indices.
#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct HeaderSchema {
    #[getset(get = "pub")]
    names: Vec<String>,
    index: HashMap<String, usize>,
    #[getset(get_copy = "pub")]
    customer: usize,
    #[getset(get_copy = "pub")]
    subscription: usize,
    #[getset(get_copy = "pub")]
    distributor_price: usize,
    #[getset(get_copy = "pub")]
    suggested_price: usize,
}

impl HeaderSchema {
    /// Builds the lookup and checks that every required column is present.
    ///
    /// Names match exactly. When a name repeats, its first position wins.
    pub fn resolve(header: &[String], columns: &ColumnNames) -> Result<Self, ReportError> {
        let mut index = HashMap::with_capacity(header.len());
        for (i, name) in header.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }

        let mut schema = Self {
            names: header.to_vec(),
            index,
            customer: 0,
            subscription: 0,
            distributor_price: 0,
            suggested_price: 0,
        };
        schema.customer = schema.index_of(&columns.customer)?;
        schema.subscription = schema.index_of(&columns.subscription)?;
        schema.distributor_price = schema.index_of(&columns.distributor_price)?;
        schema.suggested_price = schema.index_of(&columns.suggested_price)?;
        Ok(schema)
    }

    /// Position of a column by exact name; absent names fail like a missing required column.
    pub fn index_of(&self, name: &str) -> Result<usize, ReportError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ReportError::MissingColumn(name.to_owned()))
    }

    pub fn name_at(&self, index: usize) -> &str {
        self.names.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_resolve_finds_required_columns() -> Result<()> {
        let schema = HeaderSchema::resolve(
            &header(&["日期", "客戶名稱", "訂閱名稱", "建議售價", "經銷價"]),
            &ColumnNames::default(),
        )?;
        assert_eq!(schema.customer(), 1);
        assert_eq!(schema.subscription(), 2);
        assert_eq!(schema.suggested_price(), 3);
        assert_eq!(schema.distributor_price(), 4);
        assert_eq!(schema.index_of("日期")?, 0);
        assert_eq!(schema.width(), 5);
        Ok(())
    }

    #[test]
    fn test_missing_required_column_fails() {
        let res = HeaderSchema::resolve(
            &header(&["客戶名稱", "訂閱名稱", "經銷價"]),
            &ColumnNames::default(),
        );
        assert!(matches!(res, Err(ReportError::MissingColumn(name)) if name == "建議售價"));
    }

    #[test]
    fn test_match_is_exact() {
        let res = HeaderSchema::resolve(
            &header(&["客戶名稱 ", "訂閱名稱", "經銷價", "建議售價"]),
            &ColumnNames::default(),
        );
        assert!(matches!(res, Err(ReportError::MissingColumn(_))));
    }

    #[test]
    fn test_unknown_lookup_fails() -> Result<()> {
        let schema = HeaderSchema::resolve(
            &header(&["客戶名稱", "訂閱名稱", "經銷價", "建議售價"]),
            &ColumnNames::default(),
        )?;
        assert!(matches!(
            schema.index_of("Meter"),
            Err(ReportError::MissingColumn(name)) if name == "Meter"
        ));
        Ok(())
    }

    #[test]
    fn test_duplicate_header_keeps_first_position() -> Result<()> {
        let schema = HeaderSchema::resolve(
            &header(&["客戶名稱", "訂閱名稱", "經銷價", "建議售價", "客戶名稱"]),
            &ColumnNames::default(),
        )?;
        assert_eq!(schema.customer(), 0);
        Ok(())
    }

    #[test]
    fn test_redacted_pads_and_blanks() {
        let row: UsageRow = ["a", "b"].into_iter().collect();
        let projected = row.redacted(3, 1);
        assert_eq!(projected.cells(), ["a".to_string(), String::new(), String::new()]);
    }
}
