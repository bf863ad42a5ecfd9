//! CSV Trade Recorder
//!
//! Appends trades to a CSV file, writing the header once for a new or
//! empty file.

use super::recorder::{RecordError, TradeRecord, TradeRecorder};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// CSV file recorder.
///
/// Uses `spawn_blocking` to avoid blocking the async runtime during file I/O.
pub struct CsvRecorder {
    file_path: Arc<PathBuf>,
    /// Serializes writes and tracks header state
    state: Arc<Mutex<CsvState>>,
}

struct CsvState {
    header_written: bool,
}

impl CsvRecorder {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path: Arc::new(file_path),
            state: Arc::new(Mutex::new(CsvState {
                header_written: false,
            })),
        }
    }
}

#[async_trait]
impl TradeRecorder for CsvRecorder {
    async fn record(&self, trade: &TradeRecord) -> Result<(), RecordError> {
        let file_path = Arc::clone(&self.file_path);
        let state = Arc::clone(&self.state);
        let csv_line = trade.to_csv_line();

        tokio::task::spawn_blocking(move || {
            let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&*file_path)?;

            if !guard.header_written {
                if file.metadata()?.len() == 0 {
                    writeln!(file, "{}", TradeRecord::csv_header())?;
                }
                guard.header_written = true;
            }

            writeln!(file, "{}", csv_line)?;
            Ok::<(), RecordError>(())
        })
        .await
        .map_err(|e| RecordError::Io(std::io::Error::other(e)))??;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderSide;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn trade(side: OrderSide) -> TradeRecord {
        TradeRecord::with_timestamp("ord", "AAPL", side, 3, dec!(101.25), true, Utc::now())
    }

    #[tokio::test]
    async fn test_csv_recorder_writes_header_once() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("paper_trades.csv");

        let recorder = CsvRecorder::new(file_path.clone());
        recorder.record(&trade(OrderSide::Buy)).await.unwrap();
        recorder.record(&trade(OrderSide::Sell)).await.unwrap();

        let contents = std::fs::read_to_string(&file_path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TradeRecord::csv_header());
        assert!(lines[1].contains(",buy,3,101.25,"));
        assert!(lines[2].contains(",sell,3,101.25,"));
    }

    #[tokio::test]
    async fn test_csv_recorder_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("trades.csv");
        std::fs::write(
            &file_path,
            format!("{}\nexisting\n", TradeRecord::csv_header()),
        )
        .unwrap();

        CsvRecorder::new(file_path.clone())
            .record(&trade(OrderSide::Buy))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&file_path).unwrap();
        assert_eq!(contents.matches("trade_id,").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }
}
