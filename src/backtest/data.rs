//! Historical data sources for backtests: CSV files and a deterministic
//! synthetic series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use polars::prelude::*;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::types::{Bar, BarSeries, SeriesError};

/// Errors raised while loading historical bars.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Polars(#[from] PolarsError),

    #[error("missing value in column '{column}' at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("invalid number '{value}' in column '{column}' at row {row}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error("invalid timestamp '{value}' at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("unsupported timestamp column type: {0}")]
    UnsupportedTimestampType(String),

    #[error("invalid bar order: {0}")]
    Series(#[from] SeriesError),
}

fn parse_timestamp(row: usize, value: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }
    Err(DataError::InvalidTimestamp {
        row,
        value: value.to_string(),
    })
}

fn timestamps(df: &DataFrame) -> Result<Vec<DateTime<Utc>>, DataError> {
    let column = df.column("timestamp")?;
    match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                let v = v.ok_or_else(|| DataError::MissingValue {
                    column: "timestamp".to_string(),
                    row,
                })?;
                parse_timestamp(row, v)
            })
            .collect(),
        DataType::Int64 => column
            .i64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                let secs = v.ok_or_else(|| DataError::MissingValue {
                    column: "timestamp".to_string(),
                    row,
                })?;
                Utc.timestamp_opt(secs, 0)
                    .single()
                    .ok_or_else(|| DataError::InvalidTimestamp {
                        row,
                        value: secs.to_string(),
                    })
            })
            .collect(),
        other => Err(DataError::UnsupportedTimestampType(other.to_string())),
    }
}

/// Decimal values of a numeric column, read through its string form so no
/// binary floating point rounding leaks in. `None` if the column is absent.
fn decimals(df: &DataFrame, name: &str) -> Result<Option<Vec<Decimal>>, DataError> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let as_text = column.cast(&DataType::String)?;
    let values = as_text
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            let v = v.ok_or_else(|| DataError::MissingValue {
                column: name.to_string(),
                row,
            })?;
            Decimal::from_str(v.trim())
                .or_else(|_| Decimal::from_scientific(v.trim()))
                .map_err(|_| DataError::InvalidNumber {
                    column: name.to_string(),
                    row,
                    value: v.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(values))
}

/// Load bars from a CSV file with a header row.
///
/// Required columns: `timestamp` (RFC 3339, `YYYY-MM-DD` or unix seconds)
/// and `close`. `open`, `high`, `low` default to `close`; `volume` to zero.
///
/// # Errors
/// Returns `DataError` on I/O, parse failures or non-increasing timestamps.
pub fn load_csv(path: &Path) -> Result<BarSeries, DataError> {
    info!(path = %path.display(), "Loading CSV data");
    let file = File::open(path)?;
    let df = CsvReader::new(file).finish()?;

    let times = timestamps(&df)?;
    let close = decimals(&df, "close")?.ok_or_else(|| DataError::MissingValue {
        column: "close".to_string(),
        row: 0,
    })?;
    let open = decimals(&df, "open")?;
    let high = decimals(&df, "high")?;
    let low = decimals(&df, "low")?;
    let volume = decimals(&df, "volume")?;

    let pick = |col: &Option<Vec<Decimal>>, i: usize, fallback: Decimal| {
        col.as_ref().map(|v| v[i]).unwrap_or(fallback)
    };

    let bars = times
        .into_iter()
        .enumerate()
        .map(|(i, timestamp)| Bar {
            timestamp,
            open: pick(&open, i, close[i]),
            high: pick(&high, i, close[i]),
            low: pick(&low, i, close[i]),
            close: close[i],
            volume: pick(&volume, i, Decimal::ZERO),
        })
        .collect();

    Ok(BarSeries::from_bars(bars)?)
}

/// Deterministic random-walk minute bars, seeded from the symbol so each
/// symbol gets its own path.
pub fn synthetic_series(symbol: &str, bar_count: usize) -> BarSeries {
    info!(symbol = %symbol, bars = bar_count, "Generating synthetic data");

    let start = Utc
        .with_ymd_and_hms(2024, 1, 2, 14, 30, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let seed: u64 = symbol.bytes().map(|b| b as u64).sum();
    let mut state = seed;
    let mut price = 100.0_f64;

    let mut bars = Vec::with_capacity(bar_count);
    for i in 0..bar_count {
        // LCG step
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let rand = ((state >> 33) as f64) / (u32::MAX as f64) - 0.5;

        let drift = 0.0001;
        let volatility = 0.02;
        let open = price;
        price *= 1.0 + drift + volatility * rand;
        price = price.max(1.0);

        let to_dec = |v: f64| Decimal::from_f64(v).unwrap_or(Decimal::ONE).round_dp(2);
        let (o, c) = (to_dec(open), to_dec(price));
        bars.push(Bar {
            timestamp: start + Duration::minutes(i as i64),
            open: o,
            high: o.max(c),
            low: o.min(c),
            close: c,
            volume: Decimal::from(1000),
        });
    }

    // Timestamps are generated strictly increasing.
    BarSeries::from_bars(bars).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_synthetic_data_generation() {
        let series = synthetic_series("AAPL", 100);
        assert_eq!(series.len(), 100);
        assert!(series.closes().all(|c| c >= Decimal::ONE));
        assert_eq!(series, synthetic_series("AAPL", 100));
    }

    #[test]
    fn test_load_csv_with_rfc3339_timestamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "timestamp,open,high,low,close,volume").unwrap();
        writeln!(file, "2024-01-02T14:30:00Z,10.0,10.5,9.5,10.25,100").unwrap();
        writeln!(file, "2024-01-02T14:31:00Z,10.25,11.0,10.0,10.75,200").unwrap();
        drop(file);

        let series = load_csv(&path).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].close, dec!(10.25));
        assert_eq!(series.bars()[1].high, dec!(11));
        assert_eq!(series.bars()[1].volume, dec!(200));
    }

    #[test]
    fn test_load_csv_close_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("closes.csv");
        std::fs::write(&path, "timestamp,close\n1704205800,10\n1704205860,11\n").unwrap();

        let series = load_csv(&path).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[1].open, dec!(11));
        assert_eq!(series.bars()[1].volume, Decimal::ZERO);
    }

    #[test]
    fn test_load_csv_rejects_unordered_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "timestamp,close\n1704205860,10\n1704205800,11\n").unwrap();
        assert!(matches!(load_csv(&path), Err(DataError::Series(_))));
    }

    #[test]
    fn test_missing_close_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noclose.csv");
        std::fs::write(&path, "timestamp,price\n1704205800,10\n").unwrap();
        assert!(load_csv(&path).is_err());
    }
}
