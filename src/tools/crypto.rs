//! Crypto tracker tools.
//!
//! Upstream failures are already logged by the client; here they become
//! `isError` results with a short retry hint.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{parse_args, Tool, ToolContext};
use crate::crypto::{render_fear_greed, render_price, render_search, render_top, render_trending};
use crate::error::Result;
use crate::protocol::{ToolCallResult, ToolDefinition};

pub(super) fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(PriceTool),
        Arc::new(TopTool),
        Arc::new(SearchTool),
        Arc::new(TrendingTool),
        Arc::new(FearGreedTool),
    ]
}

/// Tool quoting one coin.
pub struct PriceTool;

#[derive(Debug, Deserialize)]
struct PriceArgs {
    symbol: String,
}

#[async_trait::async_trait]
impl Tool for PriceTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_crypto_price".into(),
            description: "Get the current USD price, market cap, volume and 24h change of a cryptocurrency.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "symbol": {
                        "type": "string",
                        "description": "CoinGecko coin id, e.g. 'bitcoin' or 'ethereum'"
                    }
                },
                "required": ["symbol"]
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: PriceArgs = parse_args(arguments)?;
        let symbol = args.symbol.trim().to_lowercase();

        Ok(match context.crypto.price(&symbol).await {
            Ok(Some(price)) => ToolCallResult::text(render_price(&symbol, &price)),
            Ok(None) => ToolCallResult::error(format!(
                "Cryptocurrency '{}' not found. Please check the symbol and try again.",
                symbol
            )),
            Err(_) => ToolCallResult::error(format!(
                "Failed to fetch price data for {}. Please check the symbol and try again.",
                symbol
            )),
        })
    }
}

/// Tool listing the largest coins.
pub struct TopTool;

#[derive(Debug, Deserialize)]
struct TopArgs {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    10
}

#[async_trait::async_trait]
impl Tool for TopTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_top_cryptos".into(),
            description: "Get the top cryptocurrencies by market cap.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 100,
                        "description": "Number of coins to return",
                        "default": 10
                    }
                }
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: TopArgs = parse_args(arguments)?;
        Ok(match context.crypto.top_coins(args.limit).await {
            Ok(coins) => ToolCallResult::text(render_top(&coins)),
            Err(_) => {
                ToolCallResult::error("Failed to fetch cryptocurrency data. Please try again later.")
            }
        })
    }
}

/// Tool searching coins by name or symbol.
pub struct SearchTool;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

#[async_trait::async_trait]
impl Tool for SearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_crypto".into(),
            description: "Search for cryptocurrencies by name or symbol.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Name or symbol to search for" }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: SearchArgs = parse_args(arguments)?;
        Ok(match context.crypto.search(&args.query).await {
            Ok(coins) if coins.is_empty() => ToolCallResult::text(format!(
                "No cryptocurrencies found matching '{}'.",
                args.query
            )),
            Ok(coins) => ToolCallResult::text(render_search(&args.query, &coins)),
            Err(_) => ToolCallResult::error(format!(
                "Failed to search for '{}'. Please try again later.",
                args.query
            )),
        })
    }
}

/// Tool listing trending coins.
pub struct TrendingTool;

#[async_trait::async_trait]
impl Tool for TrendingTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_crypto_trending".into(),
            description: "Get currently trending cryptocurrencies.".into(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        Ok(match context.crypto.trending().await {
            Ok(coins) if coins.is_empty() => {
                ToolCallResult::text("No trending cryptocurrencies found.")
            }
            Ok(coins) => ToolCallResult::text(render_trending(&coins)),
            Err(_) => ToolCallResult::error(
                "Failed to fetch trending cryptocurrencies. Please try again later.",
            ),
        })
    }
}

/// Tool reporting the Fear & Greed index.
pub struct FearGreedTool;

#[async_trait::async_trait]
impl Tool for FearGreedTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_crypto_fear_greed".into(),
            description: "Get the latest Crypto Fear & Greed Index reading.".into(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    async fn execute(&self, _arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        Ok(match context.crypto.fear_greed().await {
            Ok(reading) => ToolCallResult::text(render_fear_greed(&reading)),
            Err(_) => {
                ToolCallResult::error("Failed to fetch Fear & Greed Index. Please try again later.")
            }
        })
    }
}
