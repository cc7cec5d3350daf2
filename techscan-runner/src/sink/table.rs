//! CSV encoding of the indicator table.
//!
//! Columns: `Date, Close, High, Low, Volume`, then indicator columns in
//! engine order. Omitted indicators do not appear. NaN cells are written as
//! empty fields and floats use the shortest representation that round-trips,
//! so the same input always encodes to the same bytes.

use techscan_core::domain::AnalysisResult;

use super::SinkError;

const PRICE_COLUMNS: [&str; 5] = ["Date", "Close", "High", "Low", "Volume"];

pub fn table_columns(result: &AnalysisResult) -> Vec<String> {
    PRICE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(result.indicators.names().into_iter().map(str::to_string))
        .collect()
}

fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value}")
    }
}

pub fn encode_table(result: &AnalysisResult) -> Result<Vec<u8>, SinkError> {
    let series = &result.series;
    let indicators = result.indicators.columns();
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(table_columns(result))
        .map_err(|e| SinkError::Encode(e.to_string()))?;

    for (i, date) in series.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(PRICE_COLUMNS.len() + indicators.len());
        record.push(date.format("%Y-%m-%d").to_string());
        record.push(cell(series.close()[i]));
        record.push(cell(series.high()[i]));
        record.push(cell(series.low()[i]));
        record.push(cell(series.volume()[i]));
        record.extend(indicators.iter().map(|col| cell(col.values[i])));
        wtr.write_record(&record)
            .map_err(|e| SinkError::Encode(e.to_string()))?;
    }

    wtr.into_inner()
        .map_err(|e| SinkError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::result_with_rows;
    use proptest::prelude::*;

    #[test]
    fn header_lists_price_then_indicator_columns() {
        let result = result_with_rows(22);
        let bytes = encode_table(&result).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("Date,Close,High,Low,Volume,MA10,MA20,RSI"));
        assert!(!header.contains("MACD"));
        assert_eq!(text.lines().count(), 23);
    }

    #[test]
    fn warm_up_cells_are_empty() {
        let result = result_with_rows(30);
        let text = String::from_utf8(encode_table(&result).unwrap()).unwrap();
        let first_row: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(first_row[0], "2024-01-01");
        // MA10 has no value on the first row.
        assert_eq!(first_row[5], "");
        let tenth_row: Vec<&str> = text.lines().nth(10).unwrap().split(',').collect();
        assert!(!tenth_row[5].is_empty());
    }

    #[test]
    fn encoding_is_deterministic() {
        let result = result_with_rows(60);
        assert_eq!(encode_table(&result).unwrap(), encode_table(&result).unwrap());
    }

    proptest! {
        #[test]
        fn every_row_has_every_column(n in 20usize..90) {
            let result = result_with_rows(n);
            let text = String::from_utf8(encode_table(&result).unwrap()).unwrap();
            let width = table_columns(&result).len();
            prop_assert_eq!(text.lines().count(), n + 1);
            for line in text.lines() {
                prop_assert_eq!(line.split(',').count(), width);
            }
        }
    }

    #[test]
    fn whole_numbers_have_no_fraction() {
        assert_eq!(cell(1029.0), "1029");
        assert_eq!(cell(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(cell(f64::NAN), "");
    }
}
