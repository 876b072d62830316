//! 通用响应模型
//!
//! 定义统一的响应信封格式

use chrono::Utc;
use chrono_tz::Asia::Shanghai;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{UpstreamError, ValidationError};

/// 获取北京时间字符串（ISO 8601 格式，带+08:00时区）
pub fn get_beijing_time() -> String {
    Utc::now().with_timezone(&Shanghai).to_rfc3339()
}

/// 统一响应结构
///
/// 所有操作返回统一格式，包含：
/// - success: 请求是否成功
/// - data: 响应数据（仅成功时有值）
/// - error: 错误信息（仅失败时有值）
/// - metadata: 查询时间及各操作的上下文（代码、日期区间、数据源等）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub metadata: Map<String, Value>,
}

impl<T> ResponseEnvelope<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: base_metadata(),
        }
    }

    /// 创建错误响应
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            metadata: base_metadata(),
        }
    }

    /// 追加一条元数据
    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }
}

impl<T> From<ValidationError> for ResponseEnvelope<T> {
    fn from(err: ValidationError) -> Self {
        ResponseEnvelope::error(err.to_string()).with_meta("error_kind", "validation")
    }
}

impl<T> From<UpstreamError> for ResponseEnvelope<T> {
    fn from(err: UpstreamError) -> Self {
        let kind = err.kind();
        ResponseEnvelope::error(err.to_string()).with_meta("error_kind", kind)
    }
}

fn base_metadata() -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("query_time".to_string(), Value::String(get_beijing_time()));
    metadata
}
