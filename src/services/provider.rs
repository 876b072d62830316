//! 上游数据源接口
//!
//! 美股和A股数据源都以 trait 的形式注入服务，便于替换实现和在测试中打桩

use async_trait::async_trait;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::models::{DateRange, MinuteFrequency, RankingSource, Resolution, Table};

pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// 美股数据源的单次查询
#[derive(Debug, Clone, PartialEq)]
pub enum UsRequest {
    CompanyProfile { symbol: String },
    Peers { symbol: String },
    Quote { symbol: String },
    BasicFinancials { symbol: String },
    Earnings { symbol: String, limit: u32 },
    Dividends { symbol: String, range: DateRange },
    RecommendationTrends { symbol: String },
    CompanyNews { symbol: String, range: DateRange },
    Transcript { id: String },
    TranscriptList { symbol: String },
    Executives { symbol: String },
    Filings { symbol: String, range: DateRange },
    InsiderTransactions { symbol: String, range: DateRange },
    Ownership { symbol: String, limit: u32 },
    FundOwnership { symbol: String, limit: u32 },
    NewsSentiment { symbol: String },
    SocialSentiment { symbol: String },
    InsiderSentiment { symbol: String, range: DateRange },
    UpgradeDowngrade { symbol: String, range: DateRange },
    PatternRecognition { symbol: String, resolution: Resolution },
    SupportResistance { symbol: String, resolution: Resolution },
    AggregateIndicator { symbol: String, resolution: Resolution },
}

impl UsRequest {
    /// 用于日志的接口名
    pub fn name(&self) -> &'static str {
        match self {
            UsRequest::CompanyProfile { .. } => "company_profile",
            UsRequest::Peers { .. } => "peers",
            UsRequest::Quote { .. } => "quote",
            UsRequest::BasicFinancials { .. } => "basic_financials",
            UsRequest::Earnings { .. } => "earnings",
            UsRequest::Dividends { .. } => "dividends",
            UsRequest::RecommendationTrends { .. } => "recommendation_trends",
            UsRequest::CompanyNews { .. } => "company_news",
            UsRequest::Transcript { .. } => "transcript",
            UsRequest::TranscriptList { .. } => "transcript_list",
            UsRequest::Executives { .. } => "executives",
            UsRequest::Filings { .. } => "filings",
            UsRequest::InsiderTransactions { .. } => "insider_transactions",
            UsRequest::Ownership { .. } => "ownership",
            UsRequest::FundOwnership { .. } => "fund_ownership",
            UsRequest::NewsSentiment { .. } => "news_sentiment",
            UsRequest::SocialSentiment { .. } => "social_sentiment",
            UsRequest::InsiderSentiment { .. } => "insider_sentiment",
            UsRequest::UpgradeDowngrade { .. } => "upgrade_downgrade",
            UsRequest::PatternRecognition { .. } => "pattern_recognition",
            UsRequest::SupportResistance { .. } => "support_resistance",
            UsRequest::AggregateIndicator { .. } => "aggregate_indicator",
        }
    }
}

/// 美股数据源
#[async_trait]
pub trait UsEquityProvider: Send + Sync {
    async fn fetch(&self, request: &UsRequest) -> UpstreamResult<Value>;
}

/// A股数据源，所有接口都返回带列名的表格
#[async_trait]
pub trait AShareProvider: Send + Sync {
    /// 全部上市股票的代码表（ts_code, symbol, name）
    async fn list_symbols(&self) -> UpstreamResult<Table>;

    /// 实时报价，codes 为 Tushare 代码
    async fn realtime_quote(&self, codes: &[String]) -> UpstreamResult<Table>;

    /// 单只股票当日分笔成交
    async fn realtime_tick(&self, code: &str) -> UpstreamResult<Table>;

    /// 实时分钟线
    async fn realtime_minute(&self, codes: &[String], freq: MinuteFrequency) -> UpstreamResult<Table>;

    /// 全市场实时行情快照
    async fn realtime_list(&self, source: RankingSource) -> UpstreamResult<Table>;
}
