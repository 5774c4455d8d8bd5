//! Crypto client and tools against a mocked market API.

use std::io;
use std::sync::{Arc, Mutex};

use httpmock::prelude::*;
use serde_json::json;

use workspace_agent_mcp::config::{CryptoConfig, EmailConfig, FilesConfig};
use workspace_agent_mcp::crypto::CryptoClient;
use workspace_agent_mcp::email::EmailService;
use workspace_agent_mcp::files::FileManager;
use workspace_agent_mcp::system::SystemMonitor;
use workspace_agent_mcp::{CapabilityGroup, ToolContext, ToolRegistry};

/// Log sink shared with the subscriber under test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn capture_logs() -> (Captured, tracing::subscriber::DefaultGuard) {
    let logs = Captured::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

fn client(server: &MockServer) -> CryptoClient {
    CryptoClient::new(&CryptoConfig {
        api_base: server.base_url(),
        fear_greed_url: server.url("/fng/"),
        timeout_secs: 5,
        ..CryptoConfig::default()
    })
    .unwrap()
}

fn registry(server: &MockServer) -> ToolRegistry {
    let context = ToolContext::new(
        FileManager::new(&FilesConfig::default()),
        SystemMonitor::default(),
        client(server),
        EmailService::from_config(&EmailConfig::default()),
    );
    ToolRegistry::for_groups(&[CapabilityGroup::Crypto], context)
}

#[tokio::test]
async fn test_price_tool_formats_quote() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/simple/price")
                .query_param("ids", "bitcoin")
                .query_param("vs_currencies", "usd")
                .header("user-agent", "crypto-tracker/1.0");
            then.status(200).json_body(json!({
                "bitcoin": {
                    "usd": 43250.5,
                    "usd_market_cap": 846000000000.0,
                    "usd_24h_vol": 21000000000.0,
                    "usd_24h_change": 2.5
                }
            }));
        })
        .await;

    let result = registry(&server)
        .execute("get_crypto_price", json!({ "symbol": "BitCoin" }))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(!result.is_error);
    assert_eq!(
        result.joined_text(),
        "Price Information for BITCOIN:\n\
         Current Price: $43,250.50\n\
         Market Cap: $846,000,000,000\n\
         24h Volume: $21,000,000,000\n\
         24h Change: +2.50%"
    );
}

#[tokio::test]
async fn test_unknown_coin_is_tool_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/simple/price");
            then.status(200).json_body(json!({}));
        })
        .await;

    let result = registry(&server)
        .execute("get_crypto_price", json!({ "symbol": "nope" }))
        .await
        .unwrap();
    assert!(result.is_error);
    assert!(result
        .joined_text()
        .starts_with("Cryptocurrency 'nope' not found."));
}

#[tokio::test]
async fn test_top_limit_is_clamped_and_upstream_failure_reported() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/coins/markets")
                .query_param("per_page", "100")
                .query_param("order", "market_cap_desc");
            then.status(500).body("boom");
        })
        .await;

    let result = registry(&server)
        .execute("get_top_cryptos", json!({ "limit": 500 }))
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(result.is_error);
    assert_eq!(
        result.joined_text(),
        "Failed to fetch cryptocurrency data. Please try again later."
    );
}

#[tokio::test]
async fn test_top_coins_render() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/markets").query_param("per_page", "1");
            then.status(200).json_body(json!([{
                "id": "ethereum",
                "name": "Ethereum",
                "symbol": "eth",
                "current_price": 2250.0,
                "market_cap": 270000000000.0,
                "total_volume": 12500000000.0,
                "price_change_percentage_24h": -1.25
            }]));
        })
        .await;

    let text = registry(&server)
        .execute("get_top_cryptos", json!({ "limit": 1 }))
        .await
        .unwrap()
        .joined_text();
    assert!(text.starts_with("Top 1 Cryptocurrencies by Market Cap:"));
    assert!(text.contains("1. Ethereum (ETH)"));
    assert!(text.contains("   Price: $2,250.00"));
    assert!(text.contains("   24h Volume: $12.50B"));
    assert!(text.contains("   24h Change: -1.25%"));
}

#[tokio::test]
async fn test_search_summarizes_overflow() {
    let server = MockServer::start_async().await;
    let coins: Vec<_> = (1..=12)
        .map(|i| {
            json!({
                "id": format!("coin-{}", i),
                "name": format!("Coin {}", i),
                "symbol": format!("c{}", i),
                "market_cap_rank": if i == 1 { json!(null) } else { json!(i) }
            })
        })
        .collect();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search").query_param("query", "coin");
            then.status(200).json_body(json!({ "coins": coins }));
        })
        .await;

    let text = registry(&server)
        .execute("search_crypto", json!({ "query": "coin" }))
        .await
        .unwrap()
        .joined_text();
    assert!(text.starts_with("Search Results for 'coin':"));
    assert!(text.contains("1. Coin 1 (C1)\n   Market Cap Rank: #N/A\n   ID: coin-1"));
    assert!(!text.contains("Coin 11"));
    assert!(text.ends_with("... and 2 more results"));
}

#[tokio::test]
async fn test_empty_search_and_trending() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search");
            then.status(200).json_body(json!({ "coins": [] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search/trending");
            then.status(200).json_body(json!({
                "coins": [{ "item": { "id": "pepe", "name": "Pepe", "symbol": "PEPE", "market_cap_rank": 30 } }]
            }));
        })
        .await;
    let registry = registry(&server);

    let empty = registry
        .execute("search_crypto", json!({ "query": "zzz" }))
        .await
        .unwrap();
    assert!(!empty.is_error);
    assert_eq!(empty.joined_text(), "No cryptocurrencies found matching 'zzz'.");

    let trending = registry
        .execute("get_crypto_trending", json!({}))
        .await
        .unwrap()
        .joined_text();
    assert_eq!(
        trending,
        "🔥 Trending Cryptocurrencies:\n\n1. Pepe (PEPE)\n   Market Cap Rank: #30\n   ID: pepe"
    );
}

#[tokio::test]
async fn test_fear_greed_reading() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fng/").query_param("limit", "1");
            then.status(200).json_body(json!({
                "name": "Fear and Greed Index",
                "data": [{
                    "value": "20",
                    "value_classification": "Extreme Fear",
                    "timestamp": "1700000000"
                }]
            }));
        })
        .await;

    let reading = client(&server).fear_greed().await.unwrap();
    assert_eq!(reading.value, "20");

    let text = registry(&server)
        .execute("get_crypto_fear_greed", json!({}))
        .await
        .unwrap()
        .joined_text();
    assert!(text.contains("Current Value: 20"));
    assert!(text.contains("Sentiment: 😰 Extreme Fear"));
    assert!(text.contains("Last Updated: 2023-11-14 22:13 UTC"));
}

#[tokio::test]
async fn test_fear_greed_without_data_is_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fng/");
            then.status(200).json_body(json!({ "data": [] }));
        })
        .await;

    assert!(client(&server).fear_greed().await.is_err());
    let result = registry(&server)
        .execute("get_crypto_fear_greed", json!({}))
        .await
        .unwrap();
    assert!(result.is_error);
}

#[tokio::test]
async fn test_undecodable_and_empty_responses_are_logged() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/search/trending");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/fng/");
            then.status(200).json_body(json!({ "data": [] }));
        })
        .await;
    let (logs, _guard) = capture_logs();
    let registry = registry(&server);

    let trending = registry
        .execute("get_crypto_trending", json!({}))
        .await
        .unwrap();
    assert!(trending.is_error);
    let fear_greed = registry
        .execute("get_crypto_fear_greed", json!({}))
        .await
        .unwrap();
    assert!(fear_greed.is_error);

    let text = logs.text();
    assert!(text.contains("WARN"));
    assert!(text.contains("Undecodable response from"));
    assert!(text.contains("Fear & Greed index returned no data"));
}
