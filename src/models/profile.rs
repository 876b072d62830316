//! 美股数据模型
//!
//! 日期区间、技术指标周期和分类聚合相关的类型

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 闭区间日期范围（YYYY-MM-DD）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// 解析起止日期，格式错误或起始晚于结束都返回校验错误
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        let start_date = parse_date(start)?;
        let end_date = parse_date(end)?;
        if start_date > end_date {
            return Err(ValidationError::InvalidDateRange {
                start: start.trim().to_string(),
                end: end.trim().to_string(),
            });
        }
        Ok(Self { start: start_date, end: end_date })
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// 元数据中的 period 字段
    pub fn period(&self) -> String {
        format!("{} to {}", self.start_str(), self.end_str())
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        log::warn!("日期格式错误: {}", value);
        ValidationError::InvalidDate { value: value.to_string() }
    })
}

/// 校验并规范化股票代码
pub fn normalize_symbol(symbol: &str) -> Result<String, ValidationError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ValidationError::EmptySymbol);
    }
    Ok(symbol.to_uppercase())
}

/// 技术指标周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Min1 => "1",
            Resolution::Min5 => "5",
            Resolution::Min15 => "15",
            Resolution::Min30 => "30",
            Resolution::Min60 => "60",
            Resolution::Daily => "D",
            Resolution::Weekly => "W",
            Resolution::Monthly => "M",
        }
    }
}

impl FromStr for Resolution {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1" => Ok(Resolution::Min1),
            "5" => Ok(Resolution::Min5),
            "15" => Ok(Resolution::Min15),
            "30" => Ok(Resolution::Min30),
            "60" => Ok(Resolution::Min60),
            "D" => Ok(Resolution::Daily),
            "W" => Ok(Resolution::Weekly),
            "M" => Ok(Resolution::Monthly),
            _ => Err(ValidationError::InvalidResolution { value: s.to_string() }),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 聚合报告中的数据分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Profile,
    Market,
    Financials,
    Estimates,
    Sentiment,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Profile,
        Category::Market,
        Category::Financials,
        Category::Estimates,
        Category::Sentiment,
    ];

    /// 聚合结果中的键名
    pub fn report_key(&self) -> &'static str {
        match self {
            Category::Profile => "company_profile",
            Category::Market => "market_data",
            Category::Financials => "financials",
            Category::Estimates => "analysis",
            Category::Sentiment => "sentiment",
        }
    }
}
