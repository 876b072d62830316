//! A股数据源模块
//!
//! 组合多个数据源实现 `AShareProvider`：
//! - Tushare Pro：代码表、实时分钟线
//! - 新浪财经：实时报价、全市场行情
//! - 东方财富：分笔成交、全市场行情

pub mod eastmoney;
pub mod sina;
pub mod tushare;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::models::{MinuteFrequency, RankingSource, Table};
use crate::services::common::build_http_client;
use crate::services::provider::{AShareProvider, UpstreamResult};

pub use eastmoney::EastmoneyClient;
pub use sina::SinaClient;
pub use tushare::TushareClient;

/// 基于 HTTP 的A股数据源
pub struct HttpAShareProvider {
    tushare: TushareClient,
    sina: SinaClient,
    eastmoney: EastmoneyClient,
}

impl HttpAShareProvider {
    pub fn new(tushare: TushareClient, sina: SinaClient, eastmoney: EastmoneyClient) -> Self {
        Self { tushare, sina, eastmoney }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let client = build_http_client(&config.http)?;
        Ok(Self::new(
            TushareClient::new(client.clone(), &config.tushare),
            SinaClient::new(client.clone()),
            EastmoneyClient::new(client),
        ))
    }
}

#[async_trait]
impl AShareProvider for HttpAShareProvider {
    async fn list_symbols(&self) -> UpstreamResult<Table> {
        self.tushare.stock_basic().await
    }

    async fn realtime_quote(&self, codes: &[String]) -> UpstreamResult<Table> {
        self.sina.realtime_quote(codes).await
    }

    async fn realtime_tick(&self, code: &str) -> UpstreamResult<Table> {
        self.eastmoney.realtime_tick(code).await
    }

    async fn realtime_minute(&self, codes: &[String], freq: MinuteFrequency) -> UpstreamResult<Table> {
        self.tushare.rt_min(codes, freq).await
    }

    async fn realtime_list(&self, source: RankingSource) -> UpstreamResult<Table> {
        match source {
            RankingSource::Dc => self.eastmoney.market_snapshot().await,
            RankingSource::Sina => self.sina.market_snapshot().await,
        }
    }
}
