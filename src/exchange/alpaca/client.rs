//! Alpaca Exchange Client Implementation
//!
//! Provides order execution and bar retrieval for US stocks/ETFs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::state::direct::NotKeyed;
use governor::{clock::DefaultClock, state::InMemoryState, Quota, RateLimiter};
use rust_decimal::Decimal;
use std::num::NonZeroU32;
use tracing::{debug, info, warn};

use apca::api::v2::order as alpaca_order;
use apca::data::v2::bars as alpaca_bars;
use apca::{ApiInfo, Client, RequestError};

use super::utils::{
    decimal_to_num, granularity_to_timeframe, lookback_start, needs_resample, num_to_decimal,
};
use crate::exchange::{
    ExchangeError, Executor, Granularity, MarketDataSource, Order, OrderAck, OrderSide,
};
use crate::types::{Bar, BarSeries};

const PAPER_URL: &str = "https://paper-api.alpaca.markets";
const LIVE_URL: &str = "https://api.alpaca.markets";

/// Page size for the bars endpoint.
const BARS_PAGE_LIMIT: usize = 10_000;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Alpaca client for US equities.
///
/// Implements `MarketDataSource` and `Executor`. Requests are rate limited
/// below Alpaca's 200 requests per minute.
pub struct AlpacaClient {
    client: Client,
    paper: bool,
    rate_limiter: DirectRateLimiter,
}

fn request_error<E>(err: RequestError<E>, on_endpoint: fn(String) -> ExchangeError) -> ExchangeError
where
    E: std::error::Error + 'static,
{
    match err {
        RequestError::Endpoint(e) => on_endpoint(e.to_string()),
        other => ExchangeError::Network(other.to_string()),
    }
}

impl AlpacaClient {
    /// Create a client from environment variables.
    ///
    /// # Environment Variables
    /// - `ALPACA_API_KEY`: Your Alpaca API key
    /// - `ALPACA_API_SECRET`: Your Alpaca API secret
    pub fn from_env(paper: bool) -> Result<Self, ExchangeError> {
        let api_key = std::env::var("ALPACA_API_KEY").map_err(|_| {
            ExchangeError::Configuration(
                "ALPACA_API_KEY must be set in .env file or environment".to_string(),
            )
        })?;
        let api_secret = std::env::var("ALPACA_API_SECRET").map_err(|_| {
            ExchangeError::Configuration(
                "ALPACA_API_SECRET must be set in .env file or environment".to_string(),
            )
        })?;
        Self::with_credentials(&api_key, &api_secret, paper)
    }

    /// Create a client with explicit credentials.
    pub fn with_credentials(
        api_key: &str,
        api_secret: &str,
        paper: bool,
    ) -> Result<Self, ExchangeError> {
        let base_url = if paper { PAPER_URL } else { LIVE_URL };
        info!(paper, "Initializing Alpaca client (paper={})", paper);

        let api_info = ApiInfo::from_parts(base_url, api_key, api_secret).map_err(|e| {
            ExchangeError::Configuration(format!("Failed to create Alpaca API info: {}", e))
        })?;

        const RATE_LIMIT_NZ: NonZeroU32 = match NonZeroU32::new(180) {
            Some(v) => v,
            None => panic!("RATE_LIMIT must be non-zero"),
        };

        Ok(Self {
            client: Client::new(api_info),
            paper,
            rate_limiter: RateLimiter::direct(Quota::per_minute(RATE_LIMIT_NZ)),
        })
    }

    pub fn is_paper(&self) -> bool {
        self.paper
    }

    /// Test API connectivity by fetching the account.
    pub async fn test_connection(&self) -> Result<(), ExchangeError> {
        self.rate_limiter.until_ready().await;

        let account = self
            .client
            .issue::<apca::api::v2::account::Get>(&())
            .await
            .map_err(|e| ExchangeError::Network(format!("Failed to connect to Alpaca: {}", e)))?;

        info!(
            account_id = %account.id.as_hyphenated(),
            status = ?account.status,
            buying_power = %account.buying_power,
            "Connected to Alpaca"
        );
        Ok(())
    }

    fn convert_bar(bar: &alpaca_bars::Bar) -> Result<Bar, ExchangeError> {
        Ok(Bar {
            timestamp: bar.time,
            open: num_to_decimal(&bar.open)?,
            high: num_to_decimal(&bar.high)?,
            low: num_to_decimal(&bar.low)?,
            close: num_to_decimal(&bar.close)?,
            volume: Decimal::from(bar.volume),
        })
    }

    /// Fetch every bar in `[start, end]`, following page tokens.
    async fn fetch_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<BarSeries, ExchangeError> {
        let timeframe = granularity_to_timeframe(granularity);

        debug!(
            symbol,
            start = %start,
            end = %end,
            timeframe = %granularity,
            "Fetching Alpaca bars"
        );

        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            self.rate_limiter.until_ready().await;

            let request = alpaca_bars::ListReqInit {
                limit: Some(BARS_PAGE_LIMIT),
                page_token: page_token.take(),
                ..Default::default()
            }
            .init(symbol, start, end, timeframe);

            let page = self
                .client
                .issue::<alpaca_bars::List>(&request)
                .await
                .map_err(|e| request_error(e, ExchangeError::MalformedData))?;

            for bar in &page.bars {
                bars.push(Self::convert_bar(bar)?);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let mut series = BarSeries::from_bars(bars)
            .map_err(|e| ExchangeError::MalformedData(e.to_string()))?;
        if needs_resample(granularity) {
            series = series.resample(granularity.duration());
        }

        debug!(symbol, bars_count = series.len(), "Fetched Alpaca bars");
        Ok(series)
    }
}

#[async_trait]
impl MarketDataSource for AlpacaClient {
    async fn fetch_bars(
        &self,
        symbol: &str,
        granularity: Granularity,
        limit: usize,
    ) -> Result<BarSeries, ExchangeError> {
        let end = Utc::now();
        let start = lookback_start(end, granularity, limit);
        let mut series = self.fetch_range(symbol, start, end, granularity).await?;
        series.truncate_front(limit);
        if series.len() < limit {
            warn!(
                symbol,
                requested = limit,
                received = series.len(),
                "Fewer bars than requested"
            );
        }
        Ok(series)
    }

    async fn fetch_historical_bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarSeries, ExchangeError> {
        self.fetch_range(symbol, start, end, Granularity::OneDay).await
    }
}

#[async_trait]
impl Executor for AlpacaClient {
    async fn submit_order(&self, order: &Order) -> Result<OrderAck, ExchangeError> {
        self.rate_limiter.until_ready().await;

        let side = match order.side {
            OrderSide::Buy => alpaca_order::Side::Buy,
            OrderSide::Sell => alpaca_order::Side::Sell,
        };
        let qty_num = decimal_to_num(Decimal::from(order.quantity))?;

        info!(
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            paper = self.paper,
            "Submitting Alpaca order"
        );

        let request = alpaca_order::CreateReqInit {
            type_: alpaca_order::Type::Market,
            time_in_force: alpaca_order::TimeInForce::UntilCanceled,
            ..Default::default()
        }
        .init(
            order.symbol.as_str(),
            side,
            alpaca_order::Amount::quantity(qty_num),
        );

        let created = self
            .client
            .issue::<alpaca_order::Create>(&request)
            .await
            .map_err(|e| request_error(e, ExchangeError::OrderRejected))?;

        info!(
            order_id = %created.id.as_hyphenated(),
            symbol = %order.symbol,
            status = ?created.status,
            "Alpaca order created"
        );

        Ok(OrderAck {
            order_id: created.id.as_hyphenated().to_string(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_credentials_selects_endpoint() {
        let client = AlpacaClient::with_credentials("key", "secret", true).unwrap();
        assert!(client.is_paper());
        let client = AlpacaClient::with_credentials("key", "secret", false).unwrap();
        assert!(!client.is_paper());
    }
}
