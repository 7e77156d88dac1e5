use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::config::YahooProviderConfig;
use crate::core::error::ProviderError;
use crate::core::price::{PriceHistoryProvider, PriceSample, PriceSeries, Quote};

fn to_timestamp(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn extract_open_prices(chart_item: &PriceChartItem) -> PriceSeries {
    let offset = chart_item.meta.gmt_offset.unwrap_or(0);

    let (Some(timestamps), Some(opens)) = (
        chart_item.timestamp.as_ref(),
        chart_item
            .indicators
            .as_ref()
            .and_then(|inds| inds.quote.first())
            .and_then(|q| q.open.as_ref()),
    ) else {
        return PriceSeries::default();
    };

    let samples = timestamps
        .iter()
        .zip(opens)
        .filter_map(|(ts, open)| {
            let open = open.filter(|p| p.is_finite() && *p > 0.0)?;
            // Shift to exchange-local time so the bar lands on its trading day
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            Some(PriceSample { date, open })
        })
        .collect();

    PriceSeries::new(samples)
}

// YahooFinanceProvider implementation for PriceHistoryProvider
pub struct YahooFinanceProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl YahooFinanceProvider {
    pub fn new(config: &YahooProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("hindsight/1.0")
            .build()?;
        Ok(YahooFinanceProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    /// `Ok(None)` when Yahoo has no chart for the query: a 404, a `chart.error`
    /// body or an empty result.
    async fn fetch_chart(
        &self,
        symbol: &str,
        query: &str,
    ) -> Result<Option<PriceChartItem>, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}?{}", self.base_url, symbol, query);
        debug!("Requesting chart data from {}", url);

        let response = with_retry(
            || self.client.get(&url).send(),
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|source| ProviderError::Request {
            symbol: symbol.to_string(),
            source,
        })?;

        debug!(status = %response.status(), "Received Yahoo response");

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Http {
                status,
                symbol: symbol.to_string(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| ProviderError::Request {
                symbol: symbol.to_string(),
                source,
            })?;

        let data: YahooChartResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Malformed {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(error) = data.chart.error {
            debug!(code = %error.code, description = ?error.description, "Yahoo reported an error");
            return Ok(None);
        }

        Ok(data.chart.result.and_then(|items| items.into_iter().next()))
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Bars>,
}

#[derive(Deserialize, Debug)]
struct Bars {
    open: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "previousClose")]
    previous_close: Option<f64>,
    #[serde(alias = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
    #[serde(alias = "gmtoffset")]
    gmt_offset: Option<i64>,
}

#[async_trait]
impl PriceHistoryProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooQuoteFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let item = self
            .fetch_chart(symbol, "range=1d&interval=1d")
            .await?
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))?;
        let meta = &item.meta;

        let current_price = meta.regular_market_price;
        let previous_close = meta
            .previous_close
            .or(meta.chart_previous_close)
            .or(current_price)
            .ok_or_else(|| ProviderError::MissingPrice(symbol.to_string()))?;

        Ok(Quote {
            current_price,
            previous_close,
        })
    }

    #[instrument(
        name = "YahooHistoryFetch",
        skip(self),
        fields(symbol = %symbol, %start, %end)
    )]
    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, ProviderError> {
        let period1 = to_timestamp(start);
        let period2 = to_timestamp(end.succ_opt().unwrap_or(end));
        let query = format!("period1={period1}&period2={period2}&interval=1d&events=history");

        // Symbol validity is settled by the quote; here a missing chart means no bars
        let Some(item) = self.fetch_chart(symbol, &query).await? else {
            debug!("No chart for the requested period");
            return Ok(PriceSeries::default());
        };
        let series = extract_open_prices(&item);
        debug!(samples = series.len(), "Parsed daily open prices");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider_for(server: &MockServer) -> YahooFinanceProvider {
        YahooFinanceProvider::new(&YahooProviderConfig {
            base_url: server.uri(),
            retries: 0,
            retry_delay_ms: 0,
        })
        .unwrap()
    }

    async fn mount_quote(server: &MockServer, symbol: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .and(query_param("range", "1d"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_quote_fetch() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 150.65,
                        "previousClose": 149.1,
                        "currency": "USD"
                    }
                }],
                "error": null
            }
        }"#;
        mount_quote(
            &mock_server,
            "AAPL",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let quote = provider_for(&mock_server).fetch_quote("AAPL").await.unwrap();
        assert_eq!(quote.current_price, Some(150.65));
        assert_eq!(quote.previous_close, 149.1);
        assert_eq!(quote.ending_price(), 150.65);
    }

    #[tokio::test]
    async fn test_quote_without_market_price_uses_previous_close() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "chart": {
                "result": [{ "meta": { "chartPreviousClose": 88.0 } }]
            }
        }"#;
        mount_quote(
            &mock_server,
            "IBM",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let quote = provider_for(&mock_server).fetch_quote("IBM").await.unwrap();
        assert_eq!(quote.current_price, None);
        assert_eq!(quote.ending_price(), 88.0);
    }

    #[tokio::test]
    async fn test_quote_without_any_price() {
        let mock_server = MockServer::start().await;
        mount_quote(
            &mock_server,
            "IBM",
            ResponseTemplate::new(200).set_body_string(r#"{"chart": {"result": [{"meta": {}}]}}"#),
        )
        .await;

        let result = provider_for(&mock_server).fetch_quote("IBM").await;
        assert!(matches!(result, Err(ProviderError::MissingPrice(_))));
    }

    #[tokio::test]
    async fn test_not_found_is_unknown_symbol() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": {
                    "code": "Not Found",
                    "description": "No data found, symbol may be delisted"
                }
            }
        }"#;
        mount_quote(
            &mock_server,
            "ZZZZZ",
            ResponseTemplate::new(404).set_body_string(mock_response),
        )
        .await;

        let result = provider_for(&mock_server).fetch_quote("ZZZZZ").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "No price data found for symbol: ZZZZZ"
        );
    }

    #[tokio::test]
    async fn test_error_body_is_unknown_symbol() {
        let mock_server = MockServer::start().await;
        let mock_response = r#"{
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": null }
            }
        }"#;
        mount_quote(
            &mock_server,
            "ZZZZZ",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let result = provider_for(&mock_server).fetch_quote("ZZZZZ").await;
        assert!(matches!(result, Err(ProviderError::UnknownSymbol(ref s)) if s == "ZZZZZ"));
    }

    #[tokio::test]
    async fn test_empty_result_is_unknown_symbol() {
        let mock_server = MockServer::start().await;
        mount_quote(
            &mock_server,
            "INVALID",
            ResponseTemplate::new(200).set_body_string(r#"{"chart": {"result": []}}"#),
        )
        .await;

        let result = provider_for(&mock_server).fetch_quote("INVALID").await;
        assert!(matches!(result, Err(ProviderError::UnknownSymbol(_))));
    }

    #[tokio::test]
    async fn test_server_error_response() {
        let mock_server = MockServer::start().await;
        mount_quote(&mock_server, "AAPL", ResponseTemplate::new(500)).await;

        let result = provider_for(&mock_server).fetch_quote("AAPL").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for symbol: AAPL"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = MockServer::start().await;
        mount_quote(
            &mock_server,
            "AAPL",
            ResponseTemplate::new(200).set_body_string(r#"{"charts": {"result": []}}"#),
        )
        .await;

        let result = provider_for(&mock_server).fetch_quote("AAPL").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse response for AAPL")
        );
    }

    #[tokio::test]
    async fn test_history_fetch_parses_open_prices() {
        let mock_server = MockServer::start().await;
        // 14:30 UTC bars of an exchange at UTC-5
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": { "regularMarketPrice": 190.0, "gmtoffset": -18000 },
                    "timestamp": [1704205800, 1704292200, 1704378600, 1704465000],
                    "indicators": {
                        "quote": [{
                            "open": [187.15, null, 182.15, 0.0],
                            "close": [185.64, 184.25, 181.91, 181.18]
                        }]
                    }
                }]
            }
        }"#;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("period1", "1704153600"))
            .and(query_param("period2", "1704499200"))
            .and(query_param("events", "history"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        let series = provider_for(&mock_server)
            .fetch_history("AAPL", date(2024, 1, 2), date(2024, 1, 5))
            .await
            .unwrap();

        assert_eq!(
            series.samples(),
            &[
                PriceSample {
                    date: date(2024, 1, 2),
                    open: 187.15
                },
                PriceSample {
                    date: date(2024, 1, 4),
                    open: 182.15
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_history_without_bars_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("events", "history"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 1.0}}]}}"#),
            )
            .mount(&mock_server)
            .await;

        let series = provider_for(&mock_server)
            .fetch_history("AAPL", date(2024, 1, 6), date(2024, 1, 7))
            .await
            .unwrap();
        assert!(series.is_empty());
    }

    #[tokio::test]
    async fn test_history_without_chart_is_empty() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("events", "history"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"Data doesn't exist for startDate = 1704153600, endDate = 1704499200"}}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/MSFT"))
            .and(query_param("events", "history"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":null}}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        for symbol in ["AAPL", "MSFT"] {
            let series = provider
                .fetch_history(symbol, date(2024, 1, 2), date(2024, 1, 5))
                .await
                .unwrap();
            assert!(series.is_empty(), "{symbol} should have no samples");
        }
    }

    #[tokio::test]
    async fn test_known_symbol_without_history_has_no_data_at_start() {
        use crate::core::{ReturnCalculator, ReturnError, SearchRequest};

        let mock_server = MockServer::start().await;
        mount_quote(
            &mock_server,
            "AAPL",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 190.0}}]}}"#),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("events", "history"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data"}}}"#,
            ))
            .mount(&mock_server)
            .await;

        let provider = provider_for(&mock_server);
        let today = date(2024, 6, 1);
        let request = SearchRequest::new_as_of("AAPL", date(2024, 1, 2), 100, 0, today).unwrap();
        let calculator = ReturnCalculator::new(request, &provider).as_of(today);

        let err = calculator.returns().await.unwrap_err();
        assert!(matches!(err, ReturnError::NoDataAtStart { ref symbol, .. } if symbol == "AAPL"));
    }
}
