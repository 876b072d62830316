//! 美股数据聚合服务
//!
//! 按分类（公司概况、行情、财务、分析师预期、舆情）封装上游接口，
//! 单个子请求失败只会让对应字段为 null，不影响同分类的其他字段；
//! `aggregate` 并发获取全部分类并合并成功的部分。

use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::finnhub::FinnhubClient;
use super::provider::{UsEquityProvider, UsRequest};
use crate::config::AppConfig;
use crate::error::{UpstreamError, ValidationError};
use crate::models::{get_beijing_time, normalize_symbol, Category, DateRange, ResponseEnvelope, Resolution};

/// 新闻最多保留的条数
pub const MAX_NEWS_ITEMS: usize = 10;

/// 最近一次业绩对比的季度数
const EARNINGS_LIMIT: u32 = 4;

/// 机构/基金持仓返回的条数
const OWNERSHIP_LIMIT: u32 = 10;

pub struct ProfileAggregator {
    provider: Arc<dyn UsEquityProvider>,
}

impl ProfileAggregator {
    pub fn new(provider: Arc<dyn UsEquityProvider>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self::new(Arc::new(FinnhubClient::from_config(config)?)))
    }

    // ==================== 分类接口 ====================

    /// 公司概况：基本资料和同行公司
    pub async fn company_profile(&self, symbol: &str) -> ResponseEnvelope {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        self.run_category(Category::Profile, &symbol, None).await
    }

    /// 行情：最新报价
    pub async fn market_data(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        match validate(symbol, start, end) {
            Ok((symbol, range)) => self.run_category(Category::Market, &symbol, Some(range)).await,
            Err(resp) => resp,
        }
    }

    /// 财务：基本财务指标、业绩对比、分红
    pub async fn financials(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        match validate(symbol, start, end) {
            Ok((symbol, range)) => self.run_category(Category::Financials, &symbol, Some(range)).await,
            Err(resp) => resp,
        }
    }

    /// 分析师预期：评级趋势
    pub async fn estimates(&self, symbol: &str) -> ResponseEnvelope {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        self.run_category(Category::Estimates, &symbol, None).await
    }

    /// 舆情：区间内最近的公司新闻
    pub async fn sentiment(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        match validate(symbol, start, end) {
            Ok((symbol, range)) => self.run_category(Category::Sentiment, &symbol, Some(range)).await,
            Err(resp) => resp,
        }
    }

    /// 并发获取全部分类，只合并成功的分类
    ///
    /// 全部分类失败时仍返回成功和一个空对象，失败的分类记录在 `failed_categories`
    pub async fn aggregate(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        let (symbol, range) = match validate(symbol, start, end) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        log::info!("开始聚合 {} 的数据（{}）", symbol, range.period());

        let (profile, market, financials, estimates, sentiment) = futures::join!(
            self.run_category(Category::Profile, &symbol, Some(range)),
            self.run_category(Category::Market, &symbol, Some(range)),
            self.run_category(Category::Financials, &symbol, Some(range)),
            self.run_category(Category::Estimates, &symbol, Some(range)),
            self.run_category(Category::Sentiment, &symbol, Some(range)),
        );

        let mut report = Map::new();
        let mut failed = Vec::new();
        for (category, resp) in Category::ALL.iter().zip([profile, market, financials, estimates, sentiment]) {
            match resp.data {
                Some(data) if resp.success => {
                    report.insert(category.report_key().to_string(), data);
                }
                _ => {
                    log::warn!("{} 的 {} 分类获取失败: {:?}", symbol, category.report_key(), resp.error);
                    failed.push(category.report_key());
                }
            }
        }

        log::info!("{} 聚合完成，成功 {} 个分类", symbol, report.len());
        let mut resp = ResponseEnvelope::success(Value::Object(report))
            .with_meta("symbol", symbol)
            .with_meta("period", range.period())
            .with_meta("generated_at", get_beijing_time());
        if !failed.is_empty() {
            resp = resp.with_meta("failed_categories", failed);
        }
        resp
    }

    // ==================== 单项接口 ====================

    /// 业绩会记录全文
    pub async fn transcript(&self, id: &str) -> ResponseEnvelope {
        let id = id.trim();
        if id.is_empty() {
            return ValidationError::EmptyTranscriptId.into();
        }
        self.single(UsRequest::Transcript { id: id.to_string() })
            .await
            .with_meta("id", id)
    }

    pub async fn transcripts_list(&self, symbol: &str) -> ResponseEnvelope {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        self.single(UsRequest::TranscriptList { symbol: symbol.clone() })
            .await
            .with_meta("symbol", symbol)
    }

    pub async fn executives(&self, symbol: &str) -> ResponseEnvelope {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        self.single(UsRequest::Executives { symbol: symbol.clone() })
            .await
            .with_meta("symbol", symbol)
    }

    pub async fn sec_filings(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        self.single_ranged(symbol, start, end, |symbol, range| UsRequest::Filings { symbol, range })
            .await
    }

    pub async fn insider_transactions(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        self.single_ranged(symbol, start, end, |symbol, range| UsRequest::InsiderTransactions { symbol, range })
            .await
    }

    /// 机构持仓（前 10 名），日期区间只做校验和记录
    pub async fn institutional_ownership(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        self.single_ranged(symbol, start, end, |symbol, _| UsRequest::Ownership {
            symbol,
            limit: OWNERSHIP_LIMIT,
        })
        .await
    }

    pub async fn fund_ownership(&self, symbol: &str) -> ResponseEnvelope {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        self.single(UsRequest::FundOwnership {
            symbol: symbol.clone(),
            limit: OWNERSHIP_LIMIT,
        })
        .await
        .with_meta("symbol", symbol)
    }

    pub async fn news_sentiment(&self, symbol: &str) -> ResponseEnvelope {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        self.single(UsRequest::NewsSentiment { symbol: symbol.clone() })
            .await
            .with_meta("symbol", symbol)
    }

    pub async fn social_sentiment(&self, symbol: &str) -> ResponseEnvelope {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        self.single(UsRequest::SocialSentiment { symbol: symbol.clone() })
            .await
            .with_meta("symbol", symbol)
    }

    pub async fn insider_sentiment(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        self.single_ranged(symbol, start, end, |symbol, range| UsRequest::InsiderSentiment { symbol, range })
            .await
    }

    /// 评级上调/下调记录
    pub async fn upgrade_downgrade(&self, symbol: &str, start: &str, end: &str) -> ResponseEnvelope {
        self.single_ranged(symbol, start, end, |symbol, range| UsRequest::UpgradeDowngrade { symbol, range })
            .await
    }

    /// K线形态识别
    pub async fn pattern_recognition(&self, symbol: &str, resolution: &str) -> ResponseEnvelope {
        self.single_technical(symbol, resolution, |symbol, resolution| UsRequest::PatternRecognition {
            symbol,
            resolution,
        })
        .await
    }

    /// 支撑位和阻力位
    pub async fn support_resistance(&self, symbol: &str, resolution: &str) -> ResponseEnvelope {
        self.single_technical(symbol, resolution, |symbol, resolution| UsRequest::SupportResistance {
            symbol,
            resolution,
        })
        .await
    }

    /// 综合技术指标信号
    pub async fn aggregate_indicator(&self, symbol: &str, resolution: &str) -> ResponseEnvelope {
        self.single_technical(symbol, resolution, |symbol, resolution| UsRequest::AggregateIndicator {
            symbol,
            resolution,
        })
        .await
    }

    // ==================== 内部实现 ====================

    /// 并发执行一个分类下的全部子请求
    ///
    /// 只有所有子请求都以非 NoData 的错误失败时，分类才算失败
    async fn run_category(&self, category: Category, symbol: &str, range: Option<DateRange>) -> ResponseEnvelope {
        let calls = category_calls(category, symbol, range);
        let results = join_all(calls.iter().map(|(_, request)| self.provider.fetch(request))).await;

        let mut data = Map::new();
        let mut field_errors = Map::new();
        let mut first_error: Option<UpstreamError> = None;
        let mut failed = 0;

        for ((field, request), result) in calls.iter().zip(results) {
            match result {
                Ok(value) => {
                    let value = if *field == "news" { latest_news(value) } else { value };
                    data.insert(field.to_string(), value);
                }
                Err(err) => {
                    log::warn!("{} 的 {} 获取失败: {}", symbol, request.name(), err);
                    if err != UpstreamError::NoData {
                        failed += 1;
                    }
                    field_errors.insert(
                        field.to_string(),
                        json!({"kind": err.kind(), "message": err.to_string()}),
                    );
                    data.insert(field.to_string(), Value::Null);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        if !calls.is_empty() && failed == calls.len() {
            let kind = first_error.as_ref().map_or("unavailable", UpstreamError::kind);
            return ResponseEnvelope::error(format!("Failed to fetch {} for {}", category.report_key(), symbol))
                .with_meta("symbol", symbol)
                .with_meta("error_kind", kind)
                .with_meta("field_errors", Value::Object(field_errors));
        }

        let mut resp = ResponseEnvelope::success(Value::Object(data)).with_meta("symbol", symbol);
        if let Some(range) = range {
            resp = resp.with_meta("period", range.period());
        }
        if !field_errors.is_empty() {
            resp = resp.with_meta("field_errors", Value::Object(field_errors));
        }
        resp
    }

    async fn single(&self, request: UsRequest) -> ResponseEnvelope {
        match self.provider.fetch(&request).await {
            Ok(value) => ResponseEnvelope::success(value),
            Err(err) => {
                log::warn!("{} 获取失败: {}", request.name(), err);
                err.into()
            }
        }
    }

    async fn single_ranged<F>(&self, symbol: &str, start: &str, end: &str, build: F) -> ResponseEnvelope
    where
        F: FnOnce(String, DateRange) -> UsRequest,
    {
        let (symbol, range) = match validate(symbol, start, end) {
            Ok(v) => v,
            Err(resp) => return resp,
        };
        self.single(build(symbol.clone(), range))
            .await
            .with_meta("symbol", symbol)
            .with_meta("period", range.period())
    }

    async fn single_technical<F>(&self, symbol: &str, resolution: &str, build: F) -> ResponseEnvelope
    where
        F: FnOnce(String, Resolution) -> UsRequest,
    {
        let symbol = match normalize_symbol(symbol) {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        let resolution = if resolution.trim().is_empty() {
            Resolution::default()
        } else {
            match resolution.parse::<Resolution>() {
                Ok(r) => r,
                Err(e) => return e.into(),
            }
        };
        self.single(build(symbol.clone(), resolution))
            .await
            .with_meta("symbol", symbol)
            .with_meta("resolution", resolution.as_str())
    }
}

/// 校验代码和日期区间，失败时直接给出响应
fn validate(symbol: &str, start: &str, end: &str) -> Result<(String, DateRange), ResponseEnvelope> {
    let symbol = normalize_symbol(symbol).map_err(ResponseEnvelope::from)?;
    let range = DateRange::parse(start, end).map_err(ResponseEnvelope::from)?;
    Ok((symbol, range))
}

/// 分类下的子请求（字段名, 请求）
fn category_calls(category: Category, symbol: &str, range: Option<DateRange>) -> Vec<(&'static str, UsRequest)> {
    let symbol = symbol.to_string();
    match category {
        Category::Profile => vec![
            ("profile", UsRequest::CompanyProfile { symbol: symbol.clone() }),
            ("peers", UsRequest::Peers { symbol }),
        ],
        Category::Market => vec![("quote", UsRequest::Quote { symbol })],
        Category::Financials => {
            let mut calls = vec![
                ("basic_financials", UsRequest::BasicFinancials { symbol: symbol.clone() }),
                (
                    "earnings_surprises",
                    UsRequest::Earnings {
                        symbol: symbol.clone(),
                        limit: EARNINGS_LIMIT,
                    },
                ),
            ];
            if let Some(range) = range {
                calls.push(("dividends", UsRequest::Dividends { symbol, range }));
            }
            calls
        }
        Category::Estimates => vec![("recommendation_trends", UsRequest::RecommendationTrends { symbol })],
        Category::Sentiment => match range {
            Some(range) => vec![("news", UsRequest::CompanyNews { symbol, range })],
            None => Vec::new(),
        },
    }
}

/// 按发布时间倒序保留最近的新闻
fn latest_news(value: Value) -> Value {
    match value {
        Value::Array(mut items) => {
            items.sort_by(|a, b| b["datetime"].as_i64().cmp(&a["datetime"].as_i64()));
            items.truncate(MAX_NEWS_ITEMS);
            Value::Array(items)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_calls() {
        let range = DateRange::parse("2024-01-01", "2024-03-31").unwrap();
        let fields: Vec<&str> = category_calls(Category::Financials, "AAPL", Some(range))
            .iter()
            .map(|(f, _)| *f)
            .collect();
        assert_eq!(fields, vec!["basic_financials", "earnings_surprises", "dividends"]);

        let calls = category_calls(Category::Financials, "AAPL", Some(range));
        assert_eq!(
            calls[1].1,
            UsRequest::Earnings {
                symbol: "AAPL".to_string(),
                limit: 4
            }
        );
    }

    #[test]
    fn test_latest_news_keeps_ten_newest() {
        let items: Vec<Value> = (0..15).map(|i| json!({"datetime": i, "headline": format!("n{}", i)})).collect();
        let news = latest_news(Value::Array(items));
        let news = news.as_array().unwrap();
        assert_eq!(news.len(), 10);
        assert_eq!(news[0]["datetime"], json!(14));
        assert_eq!(news[9]["datetime"], json!(5));
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let resp = validate("AAPL", "2024-13-01", "2024-12-31").unwrap_err();
        assert!(!resp.success);
        assert_eq!(resp.meta("error_kind"), Some(&json!("validation")));

        let resp = validate("", "2024-01-01", "2024-12-31").unwrap_err();
        assert_eq!(resp.error.as_deref(), Some("symbol cannot be empty"));
    }
}
