//! 行情数据服务
//! 
//! 获取并规范化美股和A股行情数据，统一以 `ResponseEnvelope` 返回：
//! - 美股：Finnhub，按分类聚合公司概况、行情、财务、分析师预期和舆情
//! - A股：Tushare Pro、新浪财经、东方财富，按股票名称查询实时行情
//!
//! 股票代码表缓存在本地磁盘，有效期内不重复请求上游

pub mod config;   // 配置加载
pub mod error;    // 错误类型
pub mod models;   // 数据模型定义
pub mod services; // 业务逻辑服务

pub use config::AppConfig;
pub use error::{UpstreamError, ValidationError};
pub use models::ResponseEnvelope;
pub use services::{ProfileAggregator, RealtimeQuoteService, SymbolDirectoryCache};
