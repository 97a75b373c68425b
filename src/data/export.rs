use std::io::Write;

use anyhow::{Context, Result};

use super::model::LongRecord;

/// Column sets of the CSV download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvLayout {
    /// `Year,Country,Metric,Value,Source`
    WithSource,
    /// `Year,Country,Metric,Value`
    WithoutSource,
}

/// Write `records` as UTF-8 CSV to any writer.
///
/// Values keep their full `f64` precision; no rounding is applied.
pub fn write_csv<W: Write>(records: &[LongRecord], layout: CsvLayout, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    match layout {
        CsvLayout::WithSource => {
            if records.is_empty() {
                writer.write_record(["Year", "Country", "Metric", "Value", "Source"])?;
            }
            for rec in records {
                writer.serialize(rec).context("serializing record")?;
            }
        }
        CsvLayout::WithoutSource => {
            writer.write_record(["Year", "Country", "Metric", "Value"])?;
            for rec in records {
                writer
                    .serialize((rec.year, &rec.country, rec.metric, rec.value))
                    .context("serializing record")?;
            }
        }
    }

    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// CSV as bytes, ready for a download/save dialog.
pub fn to_csv_bytes(records: &[LongRecord], layout: CsvLayout) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(records, layout, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Metric, Provenance};

    fn records() -> Vec<LongRecord> {
        vec![
            LongRecord {
                year: 2001,
                country: "Côte d'Ivoire (CIV)".into(),
                metric: Metric::Ratio,
                value: 2.5 / 5.5,
                source: Provenance::Synthesized,
            },
            LongRecord {
                year: 2002,
                country: "Chad (TCD)".into(),
                metric: Metric::Military,
                value: 3.0,
                source: Provenance::Observed,
            },
        ]
    }

    #[test]
    fn with_source() {
        let text = String::from_utf8(to_csv_bytes(&records(), CsvLayout::WithSource).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Year,Country,Metric,Value,Source");
        assert_eq!(lines[1], format!("2001,Côte d'Ivoire (CIV),G/B Ratio,{},Synthesized", 2.5 / 5.5));
        assert_eq!(lines[2], "2002,Chad (TCD),Military,3.0,Observed");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn without_source() {
        let text = String::from_utf8(to_csv_bytes(&records(), CsvLayout::WithoutSource).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Year,Country,Metric,Value");
        assert_eq!(lines[2], "2002,Chad (TCD),Military,3.0");
    }

    #[test]
    fn empty_dataset_still_has_header() {
        let text = String::from_utf8(to_csv_bytes(&[], CsvLayout::WithSource).unwrap()).unwrap();
        assert_eq!(text.trim_end(), "Year,Country,Metric,Value,Source");
    }
}
