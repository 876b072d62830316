//! 错误类型
//!
//! 上游调用失败、输入校验失败、缓存读写失败三类错误，
//! 最终都会被转换为 `ResponseEnvelope` 中的失败信息，不会向调用方抛出。

use thiserror::Error;

/// 上游数据源调用错误
///
/// 区分“上游不可用”、“查询无数据”和“响应格式异常”，
/// 替代把所有失败折叠成一个 null 的做法。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// 缺少凭证，服务处于不可用但不崩溃的状态
    #[error("{0} not configured: missing credential")]
    NotConfigured(&'static str),

    /// 网络错误、HTTP 错误状态或上游返回的业务错误
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// 上游正常响应但没有数据
    #[error("no data returned for this query")]
    NoData,

    /// 响应无法解析
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// 用于元数据中的错误分类标识
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::NotConfigured(_) => "not_configured",
            UpstreamError::Unavailable(_) => "unavailable",
            UpstreamError::NoData => "no_data",
            UpstreamError::Malformed(_) => "malformed",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Malformed(err.to_string())
        } else {
            UpstreamError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Malformed(err.to_string())
    }
}

/// 输入校验错误，以 `{success: false, error}` 的形式返回
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No stock names provided")]
    EmptyNames,
    #[error("Maximum {max} stocks per request")]
    TooManyNames { max: usize },
    #[error("Could not find codes for: {0}")]
    NamesNotFound(String),
    #[error("Could not find code for: {0}")]
    NameNotFound(String),
    #[error("stock_name is required")]
    NameRequired,
    #[error("Only single stock name is supported for realtime_tick")]
    MultipleNames,
    #[error("Invalid freq: {value}. Must be one of [\"1MIN\", \"5MIN\", \"15MIN\", \"30MIN\", \"60MIN\"]")]
    InvalidFrequency { value: String },
    #[error("Invalid date format: {value}, expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("transcript id cannot be empty")]
    EmptyTranscriptId,
    #[error("Invalid resolution: {value}. Must be one of 1, 5, 15, 30, 60, D, W, M")]
    InvalidResolution { value: String },
    #[error("Invalid source: {value}. Must be one of dc, sina")]
    InvalidSource { value: String },
}

/// 本地缓存读写错误，只在缓存模块内部使用，一律按未命中处理
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache task failed: {0}")]
    Task(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_freq_message() {
        let err = ValidationError::InvalidFrequency { value: "2MIN".to_string() };
        assert!(err.to_string().starts_with("Invalid freq: 2MIN"));
    }

    #[test]
    fn test_serde_error_is_malformed() {
        let err: UpstreamError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), "malformed");
    }
}
