//! 东方财富接口实现
//!
//! 分笔成交明细和沪深京A股全市场实时行情

use reqwest::Client;
use serde_json::Value;

use crate::error::UpstreamError;
use crate::models::Table;
use crate::services::common::{
    from_eastmoney, to_eastmoney_secid, EASTMONEY_A_SHARE_FILTER, EASTMONEY_LIST_API, EASTMONEY_TICK_API,
    MAX_PAGES,
};
use crate::services::provider::UpstreamResult;

const TICK_COLUMNS: [&str; 6] = ["time", "price", "change", "volume", "amount", "type"];

/// 列表接口字段编号与输出列名
const LIST_FIELDS: [(&str, &str); 22] = [
    ("f12", "ts_code"),
    ("f14", "name"),
    ("f2", "price"),
    ("f3", "pct_change"),
    ("f4", "change"),
    ("f5", "volume"),
    ("f6", "amount"),
    ("f7", "swing"),
    ("f16", "low"),
    ("f15", "high"),
    ("f17", "open"),
    ("f18", "close"),
    ("f10", "vol_ratio"),
    ("f8", "turnover_rate"),
    ("f9", "pe"),
    ("f23", "pb"),
    ("f20", "total_mv"),
    ("f21", "float_mv"),
    ("f22", "rise"),
    ("f11", "5min"),
    ("f24", "60day"),
    ("f25", "1tyear"),
];

const PAGE_SIZE: usize = 100;

pub struct EastmoneyClient {
    client: Client,
}

impl EastmoneyClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// 获取单只股票当日全部分笔成交
    pub async fn realtime_tick(&self, ts_code: &str) -> UpstreamResult<Table> {
        let secid = to_eastmoney_secid(ts_code)
            .ok_or_else(|| UpstreamError::Malformed(format!("无法识别的股票代码: {}", ts_code)))?;

        let response = self
            .client
            .get(EASTMONEY_TICK_API)
            .query(&[
                ("secid", secid.as_str()),
                ("fields1", "f1,f2,f3,f4"),
                ("fields2", "f51,f52,f53,f54,f55"),
                ("pos", "-0"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Unavailable(format!("获取分笔数据失败: {}", response.status())));
        }

        let json_data: Value = response.json().await?;
        parse_ticks(&json_data)
    }

    /// 获取全市场实时行情（分页拉取直到取满 total 条）
    pub async fn market_snapshot(&self) -> UpstreamResult<Table> {
        let fields: Vec<&str> = LIST_FIELDS.iter().map(|(f, _)| *f).chain(["f13"]).collect();
        let fields = fields.join(",");
        let mut table = Table::new(LIST_FIELDS.iter().map(|(_, name)| *name));

        for page in 1..=MAX_PAGES {
            let page_str = page.to_string();
            let size_str = PAGE_SIZE.to_string();
            let response = self
                .client
                .get(EASTMONEY_LIST_API)
                .query(&[
                    ("pn", page_str.as_str()),
                    ("pz", size_str.as_str()),
                    ("po", "1"),
                    ("np", "1"),
                    ("fltt", "2"),
                    ("invt", "2"),
                    ("fid", "f3"),
                    ("fs", EASTMONEY_A_SHARE_FILTER),
                    ("fields", fields.as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(UpstreamError::Unavailable(format!("获取股票列表失败: {}", response.status())));
            }

            let json_data: Value = response.json().await?;
            let (added, total) = append_list_page(&json_data, &mut table)?;
            if added == 0 || table.len() >= total {
                break;
            }
        }

        log::info!("东方财富全市场行情共 {} 条", table.len());
        Ok(table)
    }
}

/// 解析分笔数据
///
/// details 每项格式: "09:30:05,10.50,120,3,2"，依次为时间、价格、成交量（手）、笔数、方向
/// 方向 1 卖盘、2 买盘、4 中性；价格变动相对上一笔（首笔相对昨收）
pub fn parse_ticks(json_data: &Value) -> UpstreamResult<Table> {
    let mut table = Table::new(TICK_COLUMNS);
    let data = &json_data["data"];
    if data.is_null() {
        return Ok(table);
    }

    let Some(details) = data["details"].as_array() else {
        return Err(UpstreamError::Malformed("分笔数据缺少 details".to_string()));
    };

    let mut prev_price = data["prePrice"].as_f64();
    for item in details {
        let Some(line) = item.as_str() else { continue };
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 5 {
            continue;
        }

        let price = parts[1].trim().parse::<f64>().ok();
        let volume = parts[2].trim().parse::<f64>().ok();
        let change = match (price, prev_price) {
            (Some(p), Some(prev)) => Value::from(((p - prev) * 100.0).round() / 100.0),
            _ => Value::Null,
        };
        let amount = match (price, volume) {
            (Some(p), Some(v)) => Value::from(p * v * 100.0),
            _ => Value::Null,
        };
        let kind = match parts[4].trim() {
            "1" => "卖盘",
            "2" => "买盘",
            _ => "中性",
        };

        table.push_row(vec![
            Value::String(parts[0].trim().to_string()),
            Value::String(parts[1].trim().to_string()),
            change,
            Value::String(parts[2].trim().to_string()),
            amount,
            Value::String(kind.to_string()),
        ]);

        if price.is_some() {
            prev_price = price;
        }
    }

    Ok(table)
}

/// 解析一页列表数据，返回（本页条数, 总条数）
fn append_list_page(json_data: &Value, table: &mut Table) -> UpstreamResult<(usize, usize)> {
    let data = &json_data["data"];
    if data.is_null() {
        return Ok((0, 0));
    }

    let total = data["total"].as_u64().unwrap_or(0) as usize;
    let Some(diff) = data["diff"].as_array() else {
        return Err(UpstreamError::Malformed("列表数据缺少 diff".to_string()));
    };

    for item in diff {
        let code = item["f12"].as_str().unwrap_or("");
        let market = item["f13"].as_i64().unwrap_or(0);
        let mut row = Vec::with_capacity(LIST_FIELDS.len());
        row.push(Value::String(from_eastmoney(code, market)));
        for (field, _) in LIST_FIELDS.iter().skip(1) {
            row.push(item[*field].clone());
        }
        table.push_row(row);
    }

    Ok((diff.len(), total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::schema::extract;
    use crate::models::{RankingSource, TICK_SCHEMA};
    use serde_json::json;

    #[test]
    fn test_parse_ticks() {
        let payload = json!({
            "data": {
                "code": "600000",
                "market": 1,
                "prePrice": 10.0,
                "details": [
                    "09:25:00,10.02,100,1,4",
                    "09:30:03,10.05,20,2,2",
                    "09:30:06,10.01,-,1,1"
                ]
            }
        });
        let table = parse_ticks(&payload).unwrap();
        let records = extract(&table, TICK_SCHEMA);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["time"], json!("09:25:00"));
        assert_eq!(records[0]["change"], json!(0.02));
        assert_eq!(records[0]["type"], json!("中性"));
        assert_eq!(records[1]["change"], json!(0.03));
        assert_eq!(records[1]["volume"], json!(20));
        assert_eq!(records[1]["type"], json!("买盘"));
        assert_eq!(records[2]["volume"], Value::Null);
        assert_eq!(records[2]["amount"], Value::Null);
        assert_eq!(records[2]["type"], json!("卖盘"));
    }

    #[test]
    fn test_parse_ticks_without_data() {
        let table = parse_ticks(&json!({"rc": 0, "data": null})).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_append_list_page() {
        let payload = json!({
            "data": {
                "total": 2,
                "diff": [
                    {"f12": "600000", "f13": 1, "f14": "浦发银行", "f2": 10.05, "f3": 1.52, "f8": 0.3},
                    {"f12": "830799", "f13": 0, "f14": "艾融软件", "f2": "-", "f3": "-"}
                ]
            }
        });
        let mut table = Table::new(LIST_FIELDS.iter().map(|(_, name)| *name));
        assert_eq!(append_list_page(&payload, &mut table).unwrap(), (2, 2));

        let records = extract(&table, RankingSource::Dc.schema());
        assert_eq!(records[0]["ts_code"], json!("600000.SH"));
        assert_eq!(records[0]["pct_change"], json!(1.52));
        assert_eq!(records[0]["turnover_rate"], json!(0.3));
        assert_eq!(records[1]["ts_code"], json!("830799.BJ"));
        assert_eq!(records[1]["price"], Value::Null);
        assert_eq!(records[1]["pe"], Value::Null);
    }
}
