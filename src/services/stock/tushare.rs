//! Tushare Pro 接口实现
//!
//! 通过 HTTP 调用 Tushare Pro：POST {api_name, token, params, fields}，
//! 响应为 {code, msg, data: {fields, items}}

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::TushareConfig;
use crate::error::UpstreamError;
use crate::models::{MinuteFrequency, Table};
use crate::services::provider::UpstreamResult;

#[derive(Debug, Deserialize)]
struct TushareResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Table>,
}

pub struct TushareClient {
    client: Client,
    token: String,
    base_url: String,
}

impl TushareClient {
    pub fn new(client: Client, config: &TushareConfig) -> Self {
        if config.token.is_empty() {
            log::warn!("未设置 TUSHARE_TOKEN，代码表和分钟线接口不可用");
        } else {
            log::info!("Tushare 客户端初始化完成");
        }
        Self {
            client,
            token: config.token.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }

    /// 上市股票代码表
    pub async fn stock_basic(&self) -> UpstreamResult<Table> {
        self.query("stock_basic", json!({"exchange": "", "list_status": "L"}), "ts_code,symbol,name")
            .await
    }

    /// 实时分钟线，codes 以逗号拼接后一次请求
    pub async fn rt_min(&self, codes: &[String], freq: MinuteFrequency) -> UpstreamResult<Table> {
        self.query("rt_min", json!({"ts_code": codes.join(","), "freq": freq.as_str()}), "")
            .await
    }

    async fn query(&self, api_name: &str, params: Value, fields: &str) -> UpstreamResult<Table> {
        if !self.is_configured() {
            return Err(UpstreamError::NotConfigured("tushare"));
        }

        let body = json!({
            "api_name": api_name,
            "token": self.token,
            "params": params,
            "fields": fields,
        });

        let response = self.client.post(&self.base_url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Unavailable(format!("Tushare {} 请求失败: {}", api_name, response.status())));
        }

        let text = response.text().await?;
        parse_response(api_name, &text)
    }
}

fn parse_response(api_name: &str, text: &str) -> UpstreamResult<Table> {
    let parsed: TushareResponse = serde_json::from_str(text)?;
    if parsed.code != 0 {
        let msg = parsed.msg.unwrap_or_default();
        log::warn!("Tushare {} 返回错误 {}: {}", api_name, parsed.code, msg);
        return Err(UpstreamError::Unavailable(format!("tushare {} error {}: {}", api_name, parsed.code, msg)));
    }
    Ok(parsed.data.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ok_response() {
        let text = r#"{"code":0,"msg":"","data":{"fields":["ts_code","time","close"],"items":[["600000.SH","2024-05-06 10:01:00",10.05]]}}"#;
        let table = parse_response("rt_min", text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_index("close"), Some(2));
    }

    #[test]
    fn test_parse_error_response() {
        let text = r#"{"code":40203,"msg":"抱歉，您没有访问该接口的权限","data":null}"#;
        let err = parse_response("rt_min", text).unwrap_err();
        assert!(matches!(err, UpstreamError::Unavailable(msg) if msg.contains("40203")));
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(parse_response("stock_basic", "<html>"), Err(UpstreamError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_token_is_not_configured() {
        let client = TushareClient::new(Client::new(), &TushareConfig::default());
        let err = client.stock_basic().await.unwrap_err();
        assert_eq!(err, UpstreamError::NotConfigured("tushare"));
    }
}
