//! Crypto tracker capability: CoinGecko market data and the Fear & Greed index.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CryptoConfig;
use crate::error::{Error, Result};

/// Most coins `top_coins` will request.
pub const MAX_TOP_LIMIT: usize = 100;
/// Search hits shown before summarizing the rest.
pub const SEARCH_DISPLAY_LIMIT: usize = 10;

/// `/simple/price` entry, USD only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimplePrice {
    pub usd: Option<f64>,
    pub usd_market_cap: Option<f64>,
    pub usd_24h_vol: Option<f64>,
    pub usd_24h_change: Option<f64>,
}

/// `/coins/markets` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
}

/// Coin as listed by `/search` and `/search/trending`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinRef {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<CoinRef>,
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    coins: Vec<TrendingItem>,
}

#[derive(Debug, Deserialize)]
struct TrendingItem {
    item: CoinRef,
}

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    #[serde(default)]
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: Value,
    timestamp: Option<Value>,
}

/// Latest Fear & Greed reading.
#[derive(Debug, Clone, PartialEq)]
pub struct FearGreed {
    /// Raw value as reported.
    pub value: String,
    /// Unix seconds or the raw timestamp text.
    pub timestamp: String,
}

impl FearGreed {
    /// Sentiment band for the numeric value.
    pub fn sentiment(&self) -> Sentiment {
        self.value
            .trim()
            .parse::<f64>()
            .map(Sentiment::from_value)
            .unwrap_or(Sentiment::Unknown)
    }
}

/// Fear & Greed band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
    Unknown,
}

impl Sentiment {
    pub fn from_value(value: f64) -> Self {
        if value <= 25.0 {
            Sentiment::ExtremeFear
        } else if value <= 45.0 {
            Sentiment::Fear
        } else if value <= 55.0 {
            Sentiment::Neutral
        } else if value <= 75.0 {
            Sentiment::Greed
        } else {
            Sentiment::ExtremeGreed
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::ExtremeFear => "Extreme Fear",
            Sentiment::Fear => "Fear",
            Sentiment::Neutral => "Neutral",
            Sentiment::Greed => "Greed",
            Sentiment::ExtremeGreed => "Extreme Greed",
            Sentiment::Unknown => "Unknown",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Sentiment::ExtremeFear => "😰",
            Sentiment::Fear => "😟",
            Sentiment::Neutral => "😐",
            Sentiment::Greed => "😊",
            Sentiment::ExtremeGreed => "🚀",
            Sentiment::Unknown => "❓",
        }
    }
}

/// HTTP client for the market data APIs.
#[derive(Debug, Clone)]
pub struct CryptoClient {
    http: reqwest::Client,
    api_base: String,
    fear_greed_url: String,
}

impl CryptoClient {
    /// Build a client from config.
    pub fn new(config: &CryptoConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            fear_greed_url: config.fear_greed_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        debug!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match response {
            Ok(r) => r.json::<T>().await.map_err(|e| {
                warn!("Undecodable response from {}: {}", url, e);
                Error::Http(e)
            }),
            Err(e) => {
                warn!("API request failed: {}", e);
                Err(Error::Http(e))
            }
        }
    }

    /// Current USD price for a coin id. `Ok(None)` when the id is unknown.
    pub async fn price(&self, coin_id: &str) -> Result<Option<SimplePrice>> {
        let id = coin_id.trim().to_lowercase();
        let url = format!("{}/simple/price", self.api_base);
        let mut data: HashMap<String, SimplePrice> = self
            .get_json(
                &url,
                &[
                    ("ids", id.clone()),
                    ("vs_currencies", "usd".into()),
                    ("include_market_cap", "true".into()),
                    ("include_24hr_vol", "true".into()),
                    ("include_24hr_change", "true".into()),
                ],
            )
            .await?;
        Ok(data.remove(&id))
    }

    /// Top coins by market cap; `limit` is clamped to 1..=100.
    pub async fn top_coins(&self, limit: usize) -> Result<Vec<MarketCoin>> {
        let limit = limit.clamp(1, MAX_TOP_LIMIT);
        let url = format!("{}/coins/markets", self.api_base);
        self.get_json(
            &url,
            &[
                ("vs_currency", "usd".into()),
                ("order", "market_cap_desc".into()),
                ("per_page", limit.to_string()),
                ("page", "1".into()),
                ("sparkline", "false".into()),
            ],
        )
        .await
    }

    /// Coins matching a name or symbol.
    pub async fn search(&self, query: &str) -> Result<Vec<CoinRef>> {
        let url = format!("{}/search", self.api_base);
        let response: SearchResponse = self.get_json(&url, &[("query", query.to_string())]).await?;
        Ok(response.coins)
    }

    /// Currently trending coins.
    pub async fn trending(&self) -> Result<Vec<CoinRef>> {
        let url = format!("{}/search/trending", self.api_base);
        let response: TrendingResponse = self.get_json(&url, &[]).await?;
        Ok(response.coins.into_iter().map(|i| i.item).collect())
    }

    /// Latest Fear & Greed reading.
    pub async fn fear_greed(&self) -> Result<FearGreed> {
        let response: FearGreedResponse = self
            .get_json(&self.fear_greed_url, &[("limit", "1".into())])
            .await?;
        let Some(entry) = response.data.into_iter().next() else {
            warn!("Fear & Greed index returned no data");
            return Err(Error::Upstream("Fear & Greed index returned no data".into()));
        };
        Ok(FearGreed {
            value: scalar_text(&entry.value),
            timestamp: entry
                .timestamp
                .as_ref()
                .map(scalar_text)
                .unwrap_or_else(|| "Unknown".into()),
        })
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "Unknown".into(),
        other => other.to_string(),
    }
}

/// Fixed-point with thousands separators: `1234567.891, 2` -> `1,234,567.89`.
pub fn with_commas(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (formatted, None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && formatted_nonzero(&int_part, frac_part.as_deref()) {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{}{}.{}", sign, grouped, f),
        None => format!("{}{}", sign, grouped),
    }
}

fn formatted_nonzero(int_part: &str, frac_part: Option<&str>) -> bool {
    int_part.chars().chain(frac_part.unwrap_or("").chars()).any(|c| c != '0')
}

/// `$1.23T`, `$4.56B`, `$7.89M`, `$1.00K` or `$12.34`.
pub fn format_compact_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e12 {
        format!("${:.2}T", value / 1e12)
    } else if abs >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

fn rank(rank: Option<u32>) -> String {
    rank.map(|r| r.to_string()).unwrap_or_else(|| "N/A".into())
}

pub fn render_price(coin_id: &str, price: &SimplePrice) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Price Information for {}:", coin_id.to_uppercase());
    let _ = writeln!(out, "Current Price: ${}", with_commas(price.usd.unwrap_or(0.0), 2));
    let _ = writeln!(
        out,
        "Market Cap: ${}",
        with_commas(price.usd_market_cap.unwrap_or(0.0), 0)
    );
    let _ = writeln!(
        out,
        "24h Volume: ${}",
        with_commas(price.usd_24h_vol.unwrap_or(0.0), 0)
    );
    let _ = write!(out, "24h Change: {:+.2}%", price.usd_24h_change.unwrap_or(0.0));
    out
}

pub fn render_top(coins: &[MarketCoin]) -> String {
    let mut out = format!("Top {} Cryptocurrencies by Market Cap:\n\n", coins.len());
    for (i, coin) in coins.iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({})", i + 1, coin.name, coin.symbol.to_uppercase());
        let _ = writeln!(out, "   Price: ${}", with_commas(coin.current_price.unwrap_or(0.0), 2));
        let _ = writeln!(
            out,
            "   Market Cap: ${}",
            with_commas(coin.market_cap.unwrap_or(0.0), 0)
        );
        let _ = writeln!(
            out,
            "   24h Volume: {}",
            format_compact_usd(coin.total_volume.unwrap_or(0.0))
        );
        let _ = writeln!(
            out,
            "   24h Change: {:+.2}%\n",
            coin.price_change_percentage_24h.unwrap_or(0.0)
        );
    }
    out.trim_end().to_string()
}

fn render_coin_refs(out: &mut String, coins: &[CoinRef]) {
    for (i, coin) in coins.iter().enumerate() {
        let _ = writeln!(out, "{}. {} ({})", i + 1, coin.name, coin.symbol.to_uppercase());
        let _ = writeln!(out, "   Market Cap Rank: #{}", rank(coin.market_cap_rank));
        let _ = writeln!(out, "   ID: {}\n", coin.id);
    }
}

/// Search listing; the caller handles the empty case.
pub fn render_search(query: &str, coins: &[CoinRef]) -> String {
    let mut out = format!("Search Results for '{}':\n\n", query);
    let shown = &coins[..coins.len().min(SEARCH_DISPLAY_LIMIT)];
    render_coin_refs(&mut out, shown);
    if coins.len() > SEARCH_DISPLAY_LIMIT {
        let _ = write!(out, "... and {} more results", coins.len() - SEARCH_DISPLAY_LIMIT);
    }
    out.trim_end().to_string()
}

pub fn render_trending(coins: &[CoinRef]) -> String {
    let mut out = String::from("🔥 Trending Cryptocurrencies:\n\n");
    render_coin_refs(&mut out, coins);
    out.trim_end().to_string()
}

pub fn render_fear_greed(reading: &FearGreed) -> String {
    let sentiment = reading.sentiment();
    let updated = reading
        .timestamp
        .parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| reading.timestamp.clone());

    format!(
        "📊 Crypto Fear & Greed Index\n\nCurrent Value: {}\nSentiment: {} {}\nLast Updated: {}",
        reading.value,
        sentiment.emoji(),
        sentiment.label(),
        updated
    )
}

/// Text of the `crypto://{symbol}` resource.
pub fn describe_resource(symbol: &str) -> String {
    format!("Crypto resource: {}", symbol.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_commas() {
        assert_eq!(with_commas(0.0, 2), "0.00");
        assert_eq!(with_commas(999.7, 0), "1,000");
        assert_eq!(with_commas(1234567.891, 2), "1,234,567.89");
        assert_eq!(with_commas(-1234.5, 2), "-1,234.50");
        assert_eq!(with_commas(-0.001, 2), "0.00");
    }

    #[test]
    fn test_format_compact_usd() {
        assert_eq!(format_compact_usd(1.5e12), "$1.50T");
        assert_eq!(format_compact_usd(2.25e9), "$2.25B");
        assert_eq!(format_compact_usd(3_400_000.0), "$3.40M");
        assert_eq!(format_compact_usd(1000.0), "$1.00K");
        assert_eq!(format_compact_usd(12.5), "$12.50");
    }

    #[test]
    fn test_sentiment_bands() {
        assert_eq!(Sentiment::from_value(25.0), Sentiment::ExtremeFear);
        assert_eq!(Sentiment::from_value(26.0), Sentiment::Fear);
        assert_eq!(Sentiment::from_value(55.0), Sentiment::Neutral);
        assert_eq!(Sentiment::from_value(75.0), Sentiment::Greed);
        assert_eq!(Sentiment::from_value(76.0), Sentiment::ExtremeGreed);

        let odd = FearGreed {
            value: "n/a".into(),
            timestamp: "Unknown".into(),
        };
        assert_eq!(odd.sentiment(), Sentiment::Unknown);
    }

    #[test]
    fn test_render_price() {
        let price = SimplePrice {
            usd: Some(43210.5),
            usd_market_cap: Some(845_000_000_000.4),
            usd_24h_vol: Some(12_000_000.0),
            usd_24h_change: Some(-1.234),
        };
        let text = render_price("bitcoin", &price);
        assert!(text.starts_with("Price Information for BITCOIN:"));
        assert!(text.contains("Current Price: $43,210.50"));
        assert!(text.contains("Market Cap: $845,000,000,000"));
        assert!(text.ends_with("24h Change: -1.23%"));
    }

    #[test]
    fn test_render_search_truncates() {
        let coins: Vec<CoinRef> = (0..12)
            .map(|i| CoinRef {
                id: format!("coin-{}", i),
                name: format!("Coin {}", i),
                symbol: format!("c{}", i),
                market_cap_rank: if i == 0 { None } else { Some(i) },
            })
            .collect();
        let text = render_search("coin", &coins);
        assert!(text.contains("1. Coin 0 (C0)\n   Market Cap Rank: #N/A"));
        assert!(text.contains("10. Coin 9"));
        assert!(!text.contains("Coin 10"));
        assert!(text.ends_with("... and 2 more results"));
    }

    #[test]
    fn test_render_fear_greed() {
        let text = render_fear_greed(&FearGreed {
            value: "20".into(),
            timestamp: "0".into(),
        });
        assert!(text.contains("Sentiment: 😰 Extreme Fear"));
        assert!(text.contains("Last Updated: 1970-01-01 00:00 UTC"));
    }
}
