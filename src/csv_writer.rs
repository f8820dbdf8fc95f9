use crate::models::SummaryEntry;
use anyhow::{Result, anyhow};
use csv::{Writer, WriterBuilder};
use std::io::{self, Stdout, Write};

/// Writes summary entries as CSV, amounts with two decimals.
pub struct CsvSummaryWriter<W: Write> {
    writer: Writer<W>,
}

impl CsvSummaryWriter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> CsvSummaryWriter<W> {
    pub fn new(out: W) -> Self {
        CsvSummaryWriter {
            writer: WriterBuilder::new().from_writer(out),
        }
    }

    pub fn write_entries(&mut self, entries: &[SummaryEntry]) -> Result<()> {
        for entry in entries {
            self.writer.serialize(entry)?;
        }
        Ok(())
    }

    /// Flushes buffered rows and hands back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow!("flushing summary csv: {}", e.error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn test_writes_header_and_rounded_amounts() -> Result<()> {
        let mut writer = CsvSummaryWriter::new(Vec::new());
        writer.write_entries(&[
            SummaryEntry::new("碩益科技股份有限公司", "Soetek BA", "經銷價", dec!(200)),
            SummaryEntry::new("Kiki", "All", "建議售價", dec!(12.345)),
        ])?;

        let text = String::from_utf8(writer.into_inner()?)?;
        assert_eq!(
            text,
            "customer,subscription,total_column,amount\n\
             碩益科技股份有限公司,Soetek BA,經銷價,200.00\n\
             Kiki,All,建議售價,12.35\n"
        );
        Ok(())
    }
}
