//! Sample landing files for exercising a deployed pipeline

use crate::error::Result;
use chrono::{Days, NaiveDate};
use gsp_common::types::OrderRecord;
use std::io::Write;

const PRODUCTS: [&str; 6] = ["widget", "gadget", "sprocket", "gizmo", "doohickey", "flange"];
const STATUSES: [&str; 4] = ["PENDING", "SHIPPED", "DELIVERED", "CANCELLED"];

/// Deterministic order records starting at `first_id`
pub fn sample_orders(rows: usize, first_id: i64, start: NaiveDate) -> Vec<OrderRecord> {
    (0..rows)
        .map(|i| OrderRecord {
            order_id: first_id + i as i64,
            product: PRODUCTS[i % PRODUCTS.len()].to_string(),
            quantity: (i % 9 + 1) as i64,
            order_status: STATUSES[i % STATUSES.len()].to_string(),
            order_date: start
                .checked_add_days(Days::new((i % 28) as u64))
                .unwrap_or(start),
        })
        .collect()
}

/// Write records as a headerless CSV landing file
pub fn write_orders<W: Write>(writer: W, records: &[OrderRecord], delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_writer(writer);
    for record in records {
        csv_writer.write_record(record.to_fields())?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a file the pipe must reject: every row is short two columns
pub fn write_malformed<W: Write>(writer: W, records: &[OrderRecord], delimiter: u8) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_writer(writer);
    for record in records {
        let fields = record.to_fields();
        csv_writer.write_record(&fields[..3])?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::csvcheck::{validate_csv, ValidateOptions};
    use gsp_common::types::LandingSchema;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_sample_passes_validation() {
        let records = sample_orders(25, 1000, start());
        assert_eq!(records.len(), 25);
        assert_eq!(records[0].order_id, 1000);

        let mut buf = Vec::new();
        write_orders(&mut buf, &records, b',').unwrap();
        let report = validate_csv(buf.as_slice(), &LandingSchema::orders(), &ValidateOptions::default()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.valid_rows, 25);
    }

    #[test]
    fn test_malformed_fails_validation() {
        let mut buf = Vec::new();
        write_malformed(&mut buf, &sample_orders(4, 1, start()), b',').unwrap();
        let report = validate_csv(buf.as_slice(), &LandingSchema::orders(), &ValidateOptions::default()).unwrap();
        assert_eq!(report.total_errors, 4);
        assert_eq!(report.valid_rows, 0);
    }

    #[test]
    fn test_round_trips_through_order_record() {
        let records = sample_orders(3, 7, start());
        let mut buf = Vec::new();
        write_orders(&mut buf, &records, b',').unwrap();
        let text = String::from_utf8(buf).unwrap();
        let first: Vec<&str> = text.lines().next().unwrap().split(',').collect();
        assert_eq!(OrderRecord::from_fields(&first).unwrap(), records[0]);
    }
}
