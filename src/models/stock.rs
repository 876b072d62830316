//! A股数据模型
//!
//! 定义代码表、实时报价、分笔成交、分钟线和排行榜相关的数据结构，
//! 以及把上游表格转换为这些记录的字段模式

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use super::schema::FieldSpec;
use crate::error::ValidationError;

/// 代码表条目
///
/// 整表获取、整表替换，不做增量更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Tushare 代码，如 600000.SH
    #[serde(rename = "ts_code", alias = "code")]
    pub code: String,
    /// 纯数字代码，如 600000
    #[serde(default)]
    pub symbol: String,
    /// 股票名称
    pub name: String,
}

/// 实时报价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub ts_code: String,
    pub name: String,
    /// 当前价格
    pub price: Option<f64>,
    /// 涨跌额
    #[serde(default)]
    pub change: Option<f64>,
    /// 涨跌幅（%）
    #[serde(default)]
    pub pct_change: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    /// 昨日收盘价
    pub pre_close: Option<f64>,
    /// 成交量（股）
    pub volume: Option<i64>,
    /// 成交金额（元）
    pub amount: Option<f64>,
    /// 买一价
    pub bid: Option<f64>,
    /// 卖一价
    pub ask: Option<f64>,
    pub date: String,
    pub time: String,
}

impl QuoteRecord {
    /// 由现价和昨收计算涨跌额、涨跌幅（保留两位小数）
    pub fn fill_change(&mut self) {
        match (self.price, self.pre_close) {
            (Some(price), Some(pre_close)) => {
                self.change = Some(round2(price - pre_close));
                self.pct_change = if pre_close != 0.0 {
                    Some(round2((price - pre_close) / pre_close * 100.0))
                } else {
                    None
                };
            }
            _ => {
                self.change = None;
                self.pct_change = None;
            }
        }
    }
}

/// 分笔成交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// 成交时间，如 09:30:05
    pub time: Option<String>,
    pub price: Option<f64>,
    /// 相对上一笔的价格变动
    pub change: Option<f64>,
    /// 成交量（手）
    pub volume: Option<i64>,
    /// 成交金额（元）
    pub amount: Option<f64>,
    /// 买盘/卖盘/中性
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// 分钟K线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteBar {
    pub ts_code: String,
    #[serde(default)]
    pub name: String,
    pub time: Option<String>,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub vol: Option<f64>,
    pub amount: Option<f64>,
}

/// 排行榜记录，字段随数据源不同
pub type RankingRecord = Map<String, Value>;

/// 分钟线周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinuteFrequency {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
}

impl MinuteFrequency {
    pub const ALL: [MinuteFrequency; 5] = [
        MinuteFrequency::Min1,
        MinuteFrequency::Min5,
        MinuteFrequency::Min15,
        MinuteFrequency::Min30,
        MinuteFrequency::Min60,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MinuteFrequency::Min1 => "1MIN",
            MinuteFrequency::Min5 => "5MIN",
            MinuteFrequency::Min15 => "15MIN",
            MinuteFrequency::Min30 => "30MIN",
            MinuteFrequency::Min60 => "60MIN",
        }
    }
}

impl FromStr for MinuteFrequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        MinuteFrequency::ALL
            .into_iter()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| ValidationError::InvalidFrequency { value: s.to_string() })
    }
}

impl fmt::Display for MinuteFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 全市场排行数据源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RankingSource {
    /// 东方财富（字段更丰富）
    #[default]
    Dc,
    /// 新浪财经
    Sina,
}

impl RankingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingSource::Dc => "dc",
            RankingSource::Sina => "sina",
        }
    }

    /// 该数据源排行榜记录的字段模式
    pub fn schema(&self) -> &'static [FieldSpec] {
        match self {
            RankingSource::Dc => DC_RANKING_SCHEMA,
            RankingSource::Sina => SINA_RANKING_SCHEMA,
        }
    }
}

impl FromStr for RankingSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dc" => Ok(RankingSource::Dc),
            "sina" => Ok(RankingSource::Sina),
            _ => Err(ValidationError::InvalidSource { value: s.to_string() }),
        }
    }
}

impl fmt::Display for RankingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== 字段模式 ====================

pub const DIRECTORY_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required_text("ts_code", &[]),
    FieldSpec::required_text("symbol", &[]),
    FieldSpec::required_text("name", &[]),
];

pub const QUOTE_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required_text("ts_code", &[]),
    FieldSpec::required_text("name", &[]),
    FieldSpec::float("price", &[]),
    FieldSpec::float("open", &[]),
    FieldSpec::float("high", &[]),
    FieldSpec::float("low", &[]),
    FieldSpec::float("pre_close", &[]),
    FieldSpec::int("volume", &[]),
    FieldSpec::float("amount", &[]),
    FieldSpec::float("bid", &[]),
    FieldSpec::float("ask", &[]),
    FieldSpec::required_text("date", &[]),
    FieldSpec::required_text("time", &[]),
];

pub const TICK_SCHEMA: &[FieldSpec] = &[
    FieldSpec::text("time", &[]),
    FieldSpec::float("price", &[]),
    FieldSpec::float("change", &[]),
    FieldSpec::int("volume", &[]),
    FieldSpec::float("amount", &[]),
    FieldSpec::text("type", &[]),
];

pub const MINUTE_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required_text("ts_code", &[]),
    FieldSpec::text("time", &[]),
    FieldSpec::float("open", &[]),
    FieldSpec::float("close", &[]),
    FieldSpec::float("high", &[]),
    FieldSpec::float("low", &[]),
    FieldSpec::float("vol", &[]),
    FieldSpec::float("amount", &[]),
];

const DC_RANKING_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required_text("ts_code", &[]),
    FieldSpec::required_text("name", &[]),
    FieldSpec::float("price", &[]),
    FieldSpec::float("pct_change", &[]),
    FieldSpec::float("change", &[]),
    FieldSpec::float("volume", &[]),
    FieldSpec::float("amount", &[]),
    FieldSpec::float("swing", &[]),
    FieldSpec::float("low", &[]),
    FieldSpec::float("high", &[]),
    FieldSpec::float("open", &[]),
    FieldSpec::float("close", &[]),
    FieldSpec::float("vol_ratio", &[]),
    FieldSpec::float("turnover_rate", &[]),
    FieldSpec::float("pe", &[]),
    FieldSpec::float("pb", &[]),
    FieldSpec::float("total_mv", &[]),
    FieldSpec::float("float_mv", &[]),
    FieldSpec::float("rise", &[]),
    FieldSpec::float("5min", &[]),
    FieldSpec::float("60day", &[]),
    FieldSpec::float("1tyear", &[]),
];

const SINA_RANKING_SCHEMA: &[FieldSpec] = &[
    FieldSpec::required_text("ts_code", &[]),
    FieldSpec::required_text("name", &[]),
    FieldSpec::float("price", &[]),
    FieldSpec::float("pct_change", &[]),
    FieldSpec::float("change", &[]),
    FieldSpec::float("buy", &[]),
    FieldSpec::float("sale", &[]),
    FieldSpec::float("open", &[]),
    FieldSpec::float("close", &[]),
    FieldSpec::float("high", &[]),
    FieldSpec::float("low", &[]),
    FieldSpec::float("volume", &[]),
    FieldSpec::float("amount", &[]),
    FieldSpec::text("time", &[]),
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parse() {
        assert_eq!("5min".parse::<MinuteFrequency>().unwrap(), MinuteFrequency::Min5);
        assert_eq!(" 60MIN ".parse::<MinuteFrequency>().unwrap(), MinuteFrequency::Min60);
        let err = "2MIN".parse::<MinuteFrequency>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidFrequency { value: "2MIN".to_string() });
    }

    #[test]
    fn test_source_parse() {
        assert_eq!("DC".parse::<RankingSource>().unwrap(), RankingSource::Dc);
        assert_eq!("sina".parse::<RankingSource>().unwrap(), RankingSource::Sina);
        assert!("ths".parse::<RankingSource>().is_err());
        assert_eq!(RankingSource::default(), RankingSource::Dc);
    }

    #[test]
    fn test_fill_change() {
        let mut quote = QuoteRecord {
            ts_code: "600000.SH".to_string(),
            name: "浦发银行".to_string(),
            price: Some(10.30),
            change: None,
            pct_change: None,
            open: None,
            high: None,
            low: None,
            pre_close: Some(10.00),
            volume: None,
            amount: None,
            bid: None,
            ask: None,
            date: String::new(),
            time: String::new(),
        };
        quote.fill_change();
        assert_eq!(quote.change, Some(0.3));
        assert_eq!(quote.pct_change, Some(3.0));

        quote.pre_close = Some(0.0);
        quote.fill_change();
        assert_eq!(quote.change, Some(10.3));
        assert_eq!(quote.pct_change, None);
    }

    #[test]
    fn test_directory_entry_accepts_cached_shape() {
        let entry: DirectoryEntry = serde_json::from_str(
            r#"{"ts_code":"600000.SH","symbol":"600000","name":"浦发银行"}"#,
        )
        .unwrap();
        assert_eq!(entry.code, "600000.SH");
        let entry: DirectoryEntry =
            serde_json::from_str(r#"{"code":"000001.SZ","name":"平安银行"}"#).unwrap();
        assert_eq!(entry.symbol, "");
    }
}
