//! Trade Recording Module
//!
//! - `TradeRecorder` trait - pluggable recorder interface
//! - `CsvRecorder` - append-only CSV trade journal
//! - `TracingRecorder` - structured `trades` log events
//! - `MultiRecorder` - fan-out to several backends

pub mod csv_recorder;
pub mod recorder;
pub mod tracing_recorder;

pub use csv_recorder::CsvRecorder;
pub use recorder::{MultiRecorder, RecordError, TradeRecord, TradeRecorder};
pub use tracing_recorder::TracingRecorder;
