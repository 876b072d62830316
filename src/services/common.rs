//! 公共常量和辅助函数

use reqwest::Client;

use crate::config::HttpConfig;

// ==================== 新浪财经 API 常量 ====================

/// 新浪股票实时行情 API
pub const SINA_REALTIME_API: &str = "https://hq.sinajs.cn/list=";
/// 新浪沪深A股列表 API
pub const SINA_MARKET_LIST_API: &str =
    "https://vip.stock.finance.sina.com.cn/quotes_service/api/json_v2.php/Market_Center.getHQNodeData";
pub const SINA_REFERER: &str = "https://finance.sina.com.cn/";

// ==================== 东方财富 API 常量 ====================

/// 东方财富分笔成交 API
pub const EASTMONEY_TICK_API: &str = "https://push2.eastmoney.com/api/qt/stock/details/get";
/// 东方财富沪深京A股列表 API
pub const EASTMONEY_LIST_API: &str = "https://82.push2.eastmoney.com/api/qt/clist/get";
/// 沪深京A股板块过滤条件
pub const EASTMONEY_A_SHARE_FILTER: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23,m:0 t:81 s:2048";

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/97.0.4692.71 Safari/537.36";

/// 分页接口的最大页数
pub const MAX_PAGES: usize = 100;

/// 按配置创建 HTTP 客户端
pub fn build_http_client(config: &HttpConfig) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// 交易所
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Shanghai,
    Shenzhen,
    Beijing,
}

impl Exchange {
    fn suffix(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "SH",
            Exchange::Shenzhen => "SZ",
            Exchange::Beijing => "BJ",
        }
    }

    fn sina_prefix(&self) -> &'static str {
        match self {
            Exchange::Shanghai => "sh",
            Exchange::Shenzhen => "sz",
            Exchange::Beijing => "bj",
        }
    }

    /// 按纯数字代码推断交易所
    pub fn from_digits(code: &str) -> Self {
        if code.starts_with('6') || (code.starts_with('9') && !code.starts_with("92")) {
            Exchange::Shanghai
        } else if code.starts_with('8') || code.starts_with('4') || code.starts_with("92") {
            Exchange::Beijing
        } else {
            Exchange::Shenzhen
        }
    }
}

/// 拆分 Tushare 代码，如 600000.SH -> ("600000", Shanghai)
pub fn split_ts_code(ts_code: &str) -> Option<(&str, Exchange)> {
    let (digits, suffix) = ts_code.trim().split_once('.')?;
    let exchange = match suffix.to_ascii_uppercase().as_str() {
        "SH" => Exchange::Shanghai,
        "SZ" => Exchange::Shenzhen,
        "BJ" => Exchange::Beijing,
        _ => return None,
    };
    Some((digits, exchange))
}

pub fn make_ts_code(digits: &str, exchange: Exchange) -> String {
    format!("{}.{}", digits, exchange.suffix())
}

/// 600000.SH -> sh600000
pub fn to_sina_symbol(ts_code: &str) -> Option<String> {
    split_ts_code(ts_code).map(|(digits, ex)| format!("{}{}", ex.sina_prefix(), digits))
}

/// sh600000 -> 600000.SH
pub fn from_sina_symbol(symbol: &str) -> Option<String> {
    if symbol.len() < 3 || !symbol.is_char_boundary(2) {
        return None;
    }
    let (prefix, digits) = symbol.split_at(2);
    let exchange = match prefix.to_ascii_lowercase().as_str() {
        "sh" => Exchange::Shanghai,
        "sz" => Exchange::Shenzhen,
        "bj" => Exchange::Beijing,
        _ => return None,
    };
    Some(make_ts_code(digits, exchange))
}

/// 600000.SH -> 1.600000；深市和北交所市场号为 0
pub fn to_eastmoney_secid(ts_code: &str) -> Option<String> {
    split_ts_code(ts_code).map(|(digits, ex)| match ex {
        Exchange::Shanghai => format!("1.{}", digits),
        _ => format!("0.{}", digits),
    })
}

/// 东方财富 (代码, 市场号) -> Tushare 代码
pub fn from_eastmoney(code: &str, market: i64) -> String {
    let exchange = if market == 1 {
        Exchange::Shanghai
    } else if Exchange::from_digits(code) == Exchange::Beijing {
        Exchange::Beijing
    } else {
        Exchange::Shenzhen
    };
    make_ts_code(code, exchange)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sina_symbol_conversion() {
        assert_eq!(to_sina_symbol("600000.SH").as_deref(), Some("sh600000"));
        assert_eq!(to_sina_symbol("000001.sz").as_deref(), Some("sz000001"));
        assert_eq!(to_sina_symbol("600000"), None);
        assert_eq!(from_sina_symbol("bj430047").as_deref(), Some("430047.BJ"));
        assert_eq!(from_sina_symbol("hk00700"), None);
    }

    #[test]
    fn test_eastmoney_conversion() {
        assert_eq!(to_eastmoney_secid("600000.SH").as_deref(), Some("1.600000"));
        assert_eq!(to_eastmoney_secid("000001.SZ").as_deref(), Some("0.000001"));
        assert_eq!(to_eastmoney_secid("830799.BJ").as_deref(), Some("0.830799"));
        assert_eq!(from_eastmoney("600000", 1), "600000.SH");
        assert_eq!(from_eastmoney("300750", 0), "300750.SZ");
        assert_eq!(from_eastmoney("830799", 0), "830799.BJ");
    }
}
