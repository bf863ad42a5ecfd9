//! Shared utilities for Alpaca module

use crate::exchange::{ExchangeError, Granularity};
use apca::data::v2::bars as alpaca_bars;
use chrono::{DateTime, Duration, Utc};
use num_decimal::Num;
use rust_decimal::Decimal;
use tracing::error;

/// Convert Decimal to num_decimal::Num with error handling.
#[inline]
pub fn decimal_to_num(d: Decimal) -> Result<Num, ExchangeError> {
    d.to_string().parse::<Num>().map_err(|e| {
        error!(decimal = %d, error = %e, "Failed to convert Decimal to Num");
        ExchangeError::Other(format!(
            "Decimal to Num conversion failed for '{}': {}",
            d, e
        ))
    })
}

/// Convert num_decimal::Num to Decimal with error handling.
#[inline]
pub fn num_to_decimal(n: &Num) -> Result<Decimal, ExchangeError> {
    n.to_string().parse::<Decimal>().map_err(|e| {
        error!(num = %n, error = %e, "Failed to convert Num to Decimal");
        ExchangeError::MalformedData(format!(
            "Num to Decimal conversion failed for '{}': {}",
            n, e
        ))
    })
}

/// Alpaca bar timeframe to request for `g`. The bars endpoint has no 5 or
/// 15 minute frame, so those are fetched as 1Min and resampled (see
/// `needs_resample`).
pub fn granularity_to_timeframe(g: Granularity) -> alpaca_bars::TimeFrame {
    match g {
        Granularity::OneMinute | Granularity::FiveMinute | Granularity::FifteenMinute => {
            alpaca_bars::TimeFrame::OneMinute
        }
        Granularity::OneHour => alpaca_bars::TimeFrame::OneHour,
        Granularity::OneDay => alpaca_bars::TimeFrame::OneDay,
    }
}

/// Whether bars fetched for `g` must be aggregated to reach `g`.
pub fn needs_resample(g: Granularity) -> bool {
    matches!(g, Granularity::FiveMinute | Granularity::FifteenMinute)
}

/// Minutes in a regular US equity session (09:30-16:00 ET).
const SESSION_MINUTES: i64 = 390;

/// Calendar days added for a weekend plus a market holiday.
const GAP_SLACK_DAYS: i64 = 4;

/// Start of a request window ending at `end` that holds at least `limit`
/// bars at `g`, counting only regular sessions. Overnight, weekend and
/// holiday gaps are covered by converting sessions to calendar days.
pub fn lookback_start(end: DateTime<Utc>, g: Granularity, limit: usize) -> DateTime<Utc> {
    let bars = limit.max(1) as i64;
    let sessions = match g {
        Granularity::OneDay => bars,
        _ => {
            let per_session = (SESSION_MINUTES / g.duration().num_minutes().max(1)).max(1);
            (bars + per_session - 1) / per_session
        }
    };
    // Five sessions per seven days, plus roughly one holiday per twenty sessions.
    let calendar_days = (sessions * 7 + 4) / 5 + sessions / 20 + GAP_SLACK_DAYS;
    end - Duration::days(calendar_days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decimal_to_num_conversion() {
        let d = Decimal::new(12345, 2); // 123.45
        let n = decimal_to_num(d).expect("conversion should succeed");
        assert_eq!(n.to_string(), "123.45");
    }

    #[test]
    fn test_num_to_decimal_conversion() {
        let n: Num = "123.45".parse().unwrap();
        let d = num_to_decimal(&n).expect("conversion should succeed");
        assert_eq!(d, Decimal::new(12345, 2));
    }

    #[test]
    fn test_granularity_to_timeframe() {
        assert!(matches!(
            granularity_to_timeframe(Granularity::OneMinute),
            alpaca_bars::TimeFrame::OneMinute
        ));
        assert!(matches!(
            granularity_to_timeframe(Granularity::FifteenMinute),
            alpaca_bars::TimeFrame::OneMinute
        ));
        assert!(matches!(
            granularity_to_timeframe(Granularity::OneDay),
            alpaca_bars::TimeFrame::OneDay
        ));
        assert!(needs_resample(Granularity::FiveMinute));
        assert!(needs_resample(Granularity::FifteenMinute));
        assert!(!needs_resample(Granularity::OneMinute));
        assert!(!needs_resample(Granularity::OneHour));
    }

    #[test]
    fn test_lookback_spans_weekend_for_minute_bars() {
        // Monday 10:00 ET: the newest 200 one-minute bars reach back into
        // Friday's session, which opened at 13:30 UTC.
        let monday = Utc.with_ymd_and_hms(2024, 3, 11, 14, 0, 0).unwrap();
        let friday_open = Utc.with_ymd_and_hms(2024, 3, 8, 13, 30, 0).unwrap();

        let start = lookback_start(monday, Granularity::OneMinute, 200);

        assert!(start <= friday_open, "start {} misses Friday", start);
        assert!(monday - start > Duration::hours(72));
    }

    #[test]
    fn test_lookback_scales_with_sessions() {
        let end = Utc.with_ymd_and_hms(2024, 6, 3, 15, 0, 0).unwrap();

        // 200 hourly bars at six per session is 34 sessions.
        let hourly = end - lookback_start(end, Granularity::OneHour, 200);
        assert!(hourly >= Duration::days(34 * 7 / 5));

        // 200 daily bars need more than 200 * 7 / 5 calendar days once
        // holidays are counted.
        let daily = end - lookback_start(end, Granularity::OneDay, 200);
        assert!(daily > Duration::days(280));

        let five = end - lookback_start(end, Granularity::FiveMinute, 200);
        assert!(five > Duration::days(3));
    }
}
