//! Finnhub 美股接口实现
//!
//! 对接 https://finnhub.io/api/v1，token 以查询参数传递

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::{AppConfig, FinnhubConfig};
use crate::error::UpstreamError;
use crate::services::common::build_http_client;
use crate::services::provider::{UpstreamResult, UsEquityProvider, UsRequest};

pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FinnhubClient {
    pub fn new(client: Client, config: &FinnhubConfig) -> Self {
        if config.api_key.is_empty() {
            log::warn!("未设置 FINNHUB_API_KEY，美股数据服务不可用");
        } else {
            log::info!("Finnhub 客户端初始化完成");
        }
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = build_http_client(&config.http)?;
        Ok(Self::new(client, &config.finnhub))
    }
}

#[async_trait]
impl UsEquityProvider for FinnhubClient {
    async fn fetch(&self, request: &UsRequest) -> UpstreamResult<Value> {
        if self.api_key.is_empty() {
            return Err(UpstreamError::NotConfigured("finnhub"));
        }

        let (path, mut params) = endpoint(request);
        params.push(("token", self.api_key.clone()));
        let url = format!("{}{}", self.base_url, path);

        let response = self.client.get(&url).query(&params).send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(UpstreamError::Unavailable("rate limited".to_string()));
        }
        if !status.is_success() {
            return Err(UpstreamError::Unavailable(format!("{} 请求失败: {}", request.name(), status)));
        }

        let body: Value = response.json().await?;
        classify(body)
    }
}

/// 请求对应的路径和查询参数（不含 token）
pub fn endpoint(request: &UsRequest) -> (&'static str, Vec<(&'static str, String)>) {
    use UsRequest::*;

    match request {
        CompanyProfile { symbol } => ("/stock/profile2", vec![("symbol", symbol.clone())]),
        Peers { symbol } => ("/stock/peers", vec![("symbol", symbol.clone())]),
        Quote { symbol } => ("/quote", vec![("symbol", symbol.clone())]),
        BasicFinancials { symbol } => (
            "/stock/metric",
            vec![("symbol", symbol.clone()), ("metric", "all".to_string())],
        ),
        Earnings { symbol, limit } => (
            "/stock/earnings",
            vec![("symbol", symbol.clone()), ("limit", limit.to_string())],
        ),
        Dividends { symbol, range } => ("/stock/dividend", ranged(symbol, range)),
        RecommendationTrends { symbol } => ("/stock/recommendation", vec![("symbol", symbol.clone())]),
        CompanyNews { symbol, range } => ("/company-news", ranged(symbol, range)),
        Transcript { id } => ("/stock/transcripts", vec![("id", id.clone())]),
        TranscriptList { symbol } => ("/stock/transcripts/list", vec![("symbol", symbol.clone())]),
        Executives { symbol } => ("/stock/executive", vec![("symbol", symbol.clone())]),
        Filings { symbol, range } => ("/stock/filings", ranged(symbol, range)),
        InsiderTransactions { symbol, range } => ("/stock/insider-transactions", ranged(symbol, range)),
        Ownership { symbol, limit } => (
            "/stock/ownership",
            vec![("symbol", symbol.clone()), ("limit", limit.to_string())],
        ),
        FundOwnership { symbol, limit } => (
            "/stock/fund-ownership",
            vec![("symbol", symbol.clone()), ("limit", limit.to_string())],
        ),
        NewsSentiment { symbol } => ("/news-sentiment", vec![("symbol", symbol.clone())]),
        SocialSentiment { symbol } => ("/stock/social-sentiment", vec![("symbol", symbol.clone())]),
        InsiderSentiment { symbol, range } => ("/stock/insider-sentiment", ranged(symbol, range)),
        UpgradeDowngrade { symbol, range } => ("/stock/upgrade-downgrade", ranged(symbol, range)),
        PatternRecognition { symbol, resolution } => (
            "/scan/pattern",
            vec![("symbol", symbol.clone()), ("resolution", resolution.as_str().to_string())],
        ),
        SupportResistance { symbol, resolution } => (
            "/scan/support-resistance",
            vec![("symbol", symbol.clone()), ("resolution", resolution.as_str().to_string())],
        ),
        AggregateIndicator { symbol, resolution } => (
            "/scan/technical-indicator",
            vec![("symbol", symbol.clone()), ("resolution", resolution.as_str().to_string())],
        ),
    }
}

fn ranged(symbol: &str, range: &crate::models::DateRange) -> Vec<(&'static str, String)> {
    vec![
        ("symbol", symbol.to_string()),
        ("from", range.start_str()),
        ("to", range.end_str()),
    ]
}

/// 区分正常数据、无数据和业务错误
///
/// `null` 和 `{}` 视为无数据；只含 `error` 字段的对象视为上游错误；空数组是合法的空结果
fn classify(body: Value) -> UpstreamResult<Value> {
    match &body {
        Value::Null => Err(UpstreamError::NoData),
        Value::Object(map) if map.is_empty() => Err(UpstreamError::NoData),
        Value::Object(map) if map.len() == 1 && map.contains_key("error") => Err(UpstreamError::Unavailable(
            map["error"].as_str().unwrap_or("unknown error").to_string(),
        )),
        _ => Ok(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, Resolution};
    use serde_json::json;

    #[test]
    fn test_endpoint_mapping() {
        let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let (path, params) = endpoint(&UsRequest::CompanyNews { symbol: "AAPL".to_string(), range });
        assert_eq!(path, "/company-news");
        assert_eq!(
            params,
            vec![
                ("symbol", "AAPL".to_string()),
                ("from", "2024-01-01".to_string()),
                ("to", "2024-01-31".to_string()),
            ]
        );

        let (path, params) = endpoint(&UsRequest::AggregateIndicator {
            symbol: "MSFT".to_string(),
            resolution: Resolution::Weekly,
        });
        assert_eq!(path, "/scan/technical-indicator");
        assert_eq!(params[1], ("resolution", "W".to_string()));

        let (path, params) = endpoint(&UsRequest::BasicFinancials { symbol: "AAPL".to_string() });
        assert_eq!(path, "/stock/metric");
        assert_eq!(params[1], ("metric", "all".to_string()));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(Value::Null), Err(UpstreamError::NoData));
        assert_eq!(classify(json!({})), Err(UpstreamError::NoData));
        assert_eq!(
            classify(json!({"error": "You don't have access to this resource."})),
            Err(UpstreamError::Unavailable("You don't have access to this resource.".to_string()))
        );
        assert_eq!(classify(json!([])), Ok(json!([])));
        assert_eq!(classify(json!({"c": 1.0})), Ok(json!({"c": 1.0})));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = FinnhubClient::new(Client::new(), &FinnhubConfig::default());
        let err = client
            .fetch(&UsRequest::Quote { symbol: "AAPL".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err, UpstreamError::NotConfigured("finnhub"));
    }
}
