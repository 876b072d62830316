//! 新浪财经股票接口实现
//!
//! 提供实时行情和沪深A股全市场列表
//! 对接 https://hq.sinajs.cn 和 https://vip.stock.finance.sina.com.cn

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::models::Table;
use crate::services::common::{
    from_sina_symbol, to_sina_symbol, MAX_PAGES, SINA_MARKET_LIST_API, SINA_REALTIME_API, SINA_REFERER,
};
use crate::services::provider::UpstreamResult;

/// 实时行情表的列
const QUOTE_COLUMNS: [&str; 13] = [
    "ts_code", "name", "open", "pre_close", "price", "high", "low", "bid", "ask", "volume", "amount", "date", "time",
];

/// 全市场列表的列
const LIST_COLUMNS: [&str; 14] = [
    "ts_code", "name", "price", "pct_change", "change", "buy", "sale", "open", "close", "high", "low", "volume",
    "amount", "time",
];

/// 每页条数
const PAGE_SIZE: usize = 80;

/// 行情行: var hq_str_<symbol>="<content>"
static QUOTE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"hq_str_([a-z]{2}\d+)="([^"]*)""#).expect("行情正则无效"));

pub struct SinaClient {
    client: Client,
}

impl SinaClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 批量获取实时行情
    ///
    /// 对接新浪财经实时行情 API: https://hq.sinajs.cn/list=<symbol,...>
    pub async fn realtime_quote(&self, codes: &[String]) -> UpstreamResult<Table> {
        let symbols: Vec<String> = codes.iter().filter_map(|c| to_sina_symbol(c)).collect();
        if symbols.is_empty() {
            return Ok(Table::new(QUOTE_COLUMNS));
        }

        let url = format!("{}{}", SINA_REALTIME_API, symbols.join(","));
        log::debug!("请求实时行情 URL: {}", url);

        let response = self.client.get(&url).header("Referer", SINA_REFERER).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Unavailable(format!("获取股票数据失败: {}", response.status())));
        }

        let bytes = response.bytes().await?;
        let text = encoding_rs::GBK.decode(&bytes).0.to_string();

        parse_sina_quotes(&text)
    }

    /// 获取沪深A股全市场实时行情（分页拉取直到返回空页）
    /// 对应 akshare 的 stock_zh_a_spot
    pub async fn market_snapshot(&self) -> UpstreamResult<Table> {
        let mut table = Table::new(LIST_COLUMNS);

        for page in 1..=MAX_PAGES {
            let page_str = page.to_string();
            let num_str = PAGE_SIZE.to_string();
            let response = self
                .client
                .get(SINA_MARKET_LIST_API)
                .query(&[
                    ("page", page_str.as_str()),
                    ("num", num_str.as_str()),
                    ("sort", "symbol"),
                    ("asc", "1"),
                    ("node", "hs_a"),
                    ("symbol", ""),
                    ("_s_r_a", "page"),
                ])
                .header("Referer", SINA_REFERER)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(UpstreamError::Unavailable(format!("获取股票列表失败: {}", response.status())));
            }

            let bytes = response.bytes().await?;
            let text = encoding_rs::GBK.decode(&bytes).0.to_string();
            let added = append_list_page(&text, &mut table)?;
            if added < PAGE_SIZE {
                break;
            }
        }

        log::info!("新浪全市场行情共 {} 条", table.len());
        Ok(table)
    }
}

/// 解析新浪股票实时数据
///
/// 格式: var hq_str_sh600000="浦发银行,10.00,10.01,10.05,10.07,9.98,10.05,10.06,123456,123456789,...";
/// 内容为空（无效或已退市）或字段不足的记录跳过，不影响同批其他股票；
/// 只有整个响应都没有可解析的记录时才视为格式异常
pub fn parse_sina_quotes(data: &str) -> UpstreamResult<Table> {
    let mut table = Table::new(QUOTE_COLUMNS);
    let mut matched = 0;
    let mut short = 0;

    for cap in QUOTE_LINE.captures_iter(data) {
        matched += 1;
        let content = &cap[2];
        if content.is_empty() {
            log::warn!("股票代码 {} 可能无效或已退市", &cap[1]);
            continue;
        }

        let fields: Vec<&str> = content.split(',').collect();
        if fields.len() < 32 {
            log::warn!("股票代码 {} 数据字段不足（{} 个），已跳过", &cap[1], fields.len());
            short += 1;
            continue;
        }

        let ts_code = from_sina_symbol(&cap[1]).unwrap_or_else(|| cap[1].to_string());
        let text = |i: usize| Value::String(fields[i].trim().to_string());
        table.push_row(vec![
            Value::String(ts_code),
            text(0),
            text(1),
            text(2),
            text(3),
            text(4),
            text(5),
            text(6),
            text(7),
            text(8),
            text(9),
            text(30),
            text(31),
        ]);
    }

    if table.is_empty() && (short > 0 || (matched == 0 && !data.trim().is_empty())) {
        return Err(UpstreamError::Malformed("响应中没有可解析的行情记录".to_string()));
    }

    Ok(table)
}

/// 解析一页列表数据并追加到表中，返回本页条数
fn append_list_page(text: &str, table: &mut Table) -> UpstreamResult<usize> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(0);
    }

    let json_data: Value = serde_json::from_str(trimmed)?;
    let Some(arr) = json_data.as_array() else {
        return Err(UpstreamError::Malformed("股票列表不是数组".to_string()));
    };

    for item in arr {
        let symbol = item["symbol"].as_str().unwrap_or("");
        let ts_code = from_sina_symbol(symbol).unwrap_or_else(|| symbol.to_string());
        table.push_row(vec![
            Value::String(ts_code),
            item["name"].clone(),
            item["trade"].clone(),
            item["changepercent"].clone(),
            item["pricechange"].clone(),
            item["buy"].clone(),
            item["sell"].clone(),
            item["open"].clone(),
            item["settlement"].clone(),
            item["high"].clone(),
            item["low"].clone(),
            item["volume"].clone(),
            item["amount"].clone(),
            item["ticktime"].clone(),
        ]);
    }

    Ok(arr.len())
}
