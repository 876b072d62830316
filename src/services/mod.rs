//! 业务逻辑服务模块
//! 
//! 封装上游数据获取、本地缓存和数据处理逻辑

pub mod cache;            // 本地磁盘缓存
pub mod common;           // 公共常量和代码转换
pub mod directory;        // 股票代码表缓存
pub mod finnhub;          // Finnhub 美股接口
pub mod profile_service;  // 美股数据聚合服务
pub mod provider;         // 上游数据源接口
pub mod realtime_service; // A股实时行情服务
pub mod stock;            // A股数据源

pub use directory::SymbolDirectoryCache;
pub use profile_service::ProfileAggregator;
pub use provider::{AShareProvider, UpstreamResult, UsEquityProvider, UsRequest};
pub use realtime_service::{split_names, RealtimeQuoteService};
