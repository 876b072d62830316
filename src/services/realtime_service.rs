//! A股实时行情服务
//!
//! 先通过代码表把股票名称解析为代码，再调用上游获取实时报价、分笔成交、
//! 分钟线和全市场排行。所有结果都包装为 `ResponseEnvelope`。

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

use super::directory::SymbolDirectoryCache;
use super::provider::AShareProvider;
use super::stock::HttpAShareProvider;
use crate::config::AppConfig;
use crate::error::ValidationError;
use crate::models::schema::{extract, to_f64, FieldSpec};
use crate::models::{
    MinuteBar, MinuteFrequency, QuoteRecord, RankingRecord, RankingSource, ResponseEnvelope, Table, TickRecord,
    MINUTE_SCHEMA, QUOTE_SCHEMA, TICK_SCHEMA,
};

/// 单次报价请求最多的股票数
pub const MAX_QUOTE_NAMES: usize = 50;

/// 实时报价、分笔成交、分钟线各自的数据源标识
const QUOTE_SRC: &str = "sina";
const TICK_SRC: &str = "dc";
const MINUTE_SRC: &str = "tushare";

/// 上游返回空结果时的提示
pub const EMPTY_RESULT_MESSAGE: &str = "No data returned (market may be closed)";

/// 拆分逗号分隔的股票名称，忽略空项
pub fn split_names(input: &str) -> Vec<String> {
    input
        .split([',', '，'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct RealtimeQuoteService {
    provider: Arc<dyn AShareProvider>,
    directory: Arc<SymbolDirectoryCache>,
}

impl RealtimeQuoteService {
    pub fn new(provider: Arc<dyn AShareProvider>, directory: Arc<SymbolDirectoryCache>) -> Self {
        Self { provider, directory }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let provider: Arc<dyn AShareProvider> = Arc::new(HttpAShareProvider::from_config(config)?);
        let directory = Arc::new(SymbolDirectoryCache::from_config(provider.clone(), &config.cache));
        Ok(Self::new(provider, directory))
    }

    pub fn directory(&self) -> &SymbolDirectoryCache {
        &self.directory
    }

    /// 按名称批量获取实时报价
    ///
    /// 部分名称无法解析时照常返回，未找到的名称记录在 `not_found_names`；
    /// 全部无法解析才返回失败
    pub async fn quote_by_name<S: AsRef<str>>(&self, names: &[S]) -> ResponseEnvelope<Vec<QuoteRecord>> {
        let names = clean_names(names);
        if names.is_empty() {
            return ValidationError::EmptyNames.into();
        }
        if names.len() > MAX_QUOTE_NAMES {
            return ValidationError::TooManyNames { max: MAX_QUOTE_NAMES }.into();
        }

        let (codes, not_found) = match self.resolve(&names).await {
            Ok(v) => v,
            Err(e) => return e.into(),
        };

        let table = match self.provider.realtime_quote(&codes).await {
            Ok(t) => t,
            Err(e) => {
                log::error!("获取实时报价失败: {}", e);
                return ResponseEnvelope::from(e)
                    .with_meta("src", QUOTE_SRC)
                    .with_meta("not_found_names", not_found);
            }
        };

        let records: Vec<QuoteRecord> = records_from(&table, QUOTE_SCHEMA)
            .into_iter()
            .map(|mut q: QuoteRecord| {
                q.fill_change();
                q
            })
            .collect();
        log::info!("获取实时报价 {} 条，未找到 {} 个名称", records.len(), not_found.len());

        let count = records.len();
        with_empty_notice(ResponseEnvelope::success(records), count)
            .with_meta("src", QUOTE_SRC)
            .with_meta("ts_codes", codes)
            .with_meta("count", count)
            .with_meta("not_found_names", not_found)
    }

    /// 按名称获取单只股票当日分笔成交
    pub async fn tick_by_name(&self, name: &str) -> ResponseEnvelope<Vec<TickRecord>> {
        let name = name.trim();
        if name.is_empty() {
            return ValidationError::NameRequired.into();
        }
        if name.contains([',', '，']) {
            return ValidationError::MultipleNames.into();
        }

        let resolved = self.directory.resolve_codes_by_names(&[name]).await;
        let Some(ts_code) = resolved.get(name).cloned() else {
            return ValidationError::NameNotFound(name.to_string()).into();
        };

        let table = match self.provider.realtime_tick(&ts_code).await {
            Ok(t) => t,
            Err(e) => {
                log::error!("获取 {} 分笔数据失败: {}", ts_code, e);
                return ResponseEnvelope::from(e)
                    .with_meta("src", TICK_SRC)
                    .with_meta("ts_code", ts_code)
                    .with_meta("name", name);
            }
        };

        let records: Vec<TickRecord> = records_from(&table, TICK_SCHEMA);
        let count = records.len();
        with_empty_notice(ResponseEnvelope::success(records), count)
            .with_meta("src", TICK_SRC)
            .with_meta("ts_code", ts_code)
            .with_meta("name", name)
            .with_meta("count", count)
    }

    /// 按名称获取实时分钟线
    ///
    /// freq 先于任何上游调用校验
    pub async fn minute_bars_by_name<S: AsRef<str>>(&self, names: &[S], freq: &str) -> ResponseEnvelope<Vec<MinuteBar>> {
        let freq: MinuteFrequency = match freq.parse() {
            Ok(f) => f,
            Err(e) => return e.into(),
        };

        let names = clean_names(names);
        if names.is_empty() {
            return ValidationError::EmptyNames.into();
        }

        let (codes, not_found) = match self.resolve(&names).await {
            Ok(v) => v,
            Err(e) => return e.into(),
        };

        let table = match self.provider.realtime_minute(&codes, freq).await {
            Ok(t) => t,
            Err(e) => {
                log::error!("获取分钟线失败: {}", e);
                return ResponseEnvelope::from(e)
                    .with_meta("src", MINUTE_SRC)
                    .with_meta("freq", freq.as_str())
                    .with_meta("not_found_names", not_found);
            }
        };

        let code_names = self.directory.resolve_names_by_codes(&codes).await;
        let records: Vec<MinuteBar> = records_from(&table, MINUTE_SCHEMA)
            .into_iter()
            .map(|mut bar: MinuteBar| {
                if let Some(name) = code_names.get(&bar.ts_code) {
                    bar.name = name.clone();
                }
                bar
            })
            .collect();

        let count = records.len();
        with_empty_notice(ResponseEnvelope::success(records), count)
            .with_meta("src", MINUTE_SRC)
            .with_meta("ts_codes", codes)
            .with_meta("freq", freq.as_str())
            .with_meta("count", count)
            .with_meta("not_found_names", not_found)
    }

    /// 全市场排行前 N 名
    ///
    /// 排序字段在所有记录中都不存在时不排序，并在元数据中标记 `sort_skipped`；
    /// 空值始终排在最后
    pub async fn ranking_top_n(
        &self,
        source: &str,
        top_n: usize,
        sort_by: &str,
        ascending: bool,
    ) -> ResponseEnvelope<Vec<RankingRecord>> {
        let source: RankingSource = if source.trim().is_empty() {
            RankingSource::default()
        } else {
            match source.parse() {
                Ok(s) => s,
                Err(e) => return e.into(),
            }
        };

        let table = match self.provider.realtime_list(source).await {
            Ok(t) => t,
            Err(e) => {
                log::error!("获取 {} 全市场行情失败: {}", source, e);
                return ResponseEnvelope::from(e).with_meta("src", source.as_str());
            }
        };

        let mut records = extract(&table, source.schema());
        let total = records.len();

        let sort_skipped = !records.iter().any(|r| r.contains_key(sort_by));
        if sort_skipped {
            log::warn!("排序字段 {} 不存在，跳过排序", sort_by);
        } else {
            records.sort_by(|a, b| compare_for_ranking(a.get(sort_by), b.get(sort_by), ascending));
        }
        records.truncate(top_n);

        let count = records.len();
        let mut resp = with_empty_notice(ResponseEnvelope::success(records), total)
            .with_meta("src", source.as_str())
            .with_meta("top_n", top_n)
            .with_meta("sort_by", sort_by)
            .with_meta("ascending", ascending)
            .with_meta("count", count)
            .with_meta("total_stocks", total);
        if sort_skipped && total > 0 {
            resp = resp.with_meta("sort_skipped", true);
        }
        resp
    }

    /// 名称解析为代码，返回（按输入顺序去重后的代码, 未找到的名称）
    async fn resolve(&self, names: &[&str]) -> Result<(Vec<String>, Vec<String>), ValidationError> {
        let resolved = self.directory.resolve_codes_by_names(names).await;

        let not_found: Vec<String> = names
            .iter()
            .filter(|n| !resolved.contains_key(**n))
            .map(|n| n.to_string())
            .collect();
        if resolved.is_empty() {
            log::warn!("未找到任何股票代码: {:?}", not_found);
            return Err(ValidationError::NamesNotFound(not_found.join(", ")));
        }

        let mut codes: Vec<String> = Vec::with_capacity(resolved.len());
        for name in names {
            if let Some(code) = resolved.get(*name) {
                if !codes.contains(code) {
                    codes.push(code.clone());
                }
            }
        }
        Ok((codes, not_found))
    }
}

fn clean_names<S: AsRef<str>>(names: &[S]) -> Vec<&str> {
    names.iter().map(|n| n.as_ref().trim()).filter(|n| !n.is_empty()).collect()
}

/// 按字段模式提取并转换为具体记录类型，无法转换的行丢弃
fn records_from<T: DeserializeOwned>(table: &Table, schema: &[FieldSpec]) -> Vec<T> {
    extract(table, schema)
        .into_iter()
        .filter_map(|record| match serde_json::from_value(Value::Object(record)) {
            Ok(r) => Some(r),
            Err(e) => {
                log::warn!("跳过无法解析的记录: {}", e);
                None
            }
        })
        .collect()
}

fn with_empty_notice<T>(resp: ResponseEnvelope<T>, count: usize) -> ResponseEnvelope<T> {
    if count == 0 {
        resp.with_meta("message", EMPTY_RESULT_MESSAGE)
    } else {
        resp
    }
}

#[derive(Debug, PartialEq)]
enum SortKey<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> SortKey<'a> {
    fn of(value: Option<&'a Value>) -> Option<Self> {
        let value = value?;
        match value {
            Value::Number(_) => to_f64(value).map(SortKey::Number),
            Value::String(s) => Some(to_f64(value).map_or(SortKey::Text(s.as_str()), SortKey::Number)),
            _ => None,
        }
    }
}

/// 排行排序：空值在最后，数值在字符串之前，方向只作用于同类值之间
fn compare_for_ranking(a: Option<&Value>, b: Option<&Value>, ascending: bool) -> Ordering {
    let ord = match (SortKey::of(a), SortKey::of(b)) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(SortKey::Number(_)), Some(SortKey::Text(_))) => return Ordering::Less,
        (Some(SortKey::Text(_)), Some(SortKey::Number(_))) => return Ordering::Greater,
        (Some(SortKey::Number(x)), Some(SortKey::Number(y))) => x.total_cmp(&y),
        (Some(SortKey::Text(x)), Some(SortKey::Text(y))) => x.cmp(y),
    };
    if ascending {
        ord
    } else {
        ord.reverse()
    }
}
