//! 股票代码表缓存
//!
//! 维护“代码 ↔ 名称”全量代码表的本地快照，每个有效期内最多刷新一次。
//! 内存中保留一份快照，磁盘上按固定缓存键持久化；上游失败时退回旧快照。

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::cache::{Clock, DiskCache, SystemClock};
use super::provider::AShareProvider;
use crate::config::CacheConfig;
use crate::error::UpstreamError;
use crate::models::schema::extract;
use crate::models::{DirectoryEntry, DIRECTORY_SCHEMA};

/// 代码表的缓存键
pub const DIRECTORY_CACHE_KEY: &str = "stock_basic";

#[derive(Debug, Clone)]
struct Snapshot {
    fetched_at: DateTime<Utc>,
    entries: Arc<Vec<DirectoryEntry>>,
}

/// 代码表缓存
///
/// 每个服务实例持有一份，时钟和上游均可注入
pub struct SymbolDirectoryCache {
    provider: Arc<dyn AShareProvider>,
    disk: DiskCache,
    clock: Arc<dyn Clock>,
    expire_after: chrono::Duration,
    snapshot: RwLock<Option<Snapshot>>,
}

impl SymbolDirectoryCache {
    pub fn new(provider: Arc<dyn AShareProvider>, disk: DiskCache, expire_after: chrono::Duration) -> Self {
        Self {
            provider,
            disk,
            clock: Arc::new(SystemClock),
            expire_after,
            snapshot: RwLock::new(None),
        }
    }

    pub fn from_config(provider: Arc<dyn AShareProvider>, config: &CacheConfig) -> Self {
        Self::new(provider, DiskCache::new(&config.dir), config.expire_after())
    }

    /// 替换时钟
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 获取代码表
    ///
    /// 快照未过期直接返回；否则请求上游并持久化。
    /// 上游失败时返回旧快照（如有），否则返回空表。
    pub async fn get_directory(&self) -> Arc<Vec<DirectoryEntry>> {
        let now = self.clock.now();

        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            if now.signed_duration_since(snapshot.fetched_at) < self.expire_after {
                return snapshot.entries.clone();
            }
        }

        let mut stale = self.snapshot.read().await.clone();

        if let Some(record) = self.disk.load(DIRECTORY_CACHE_KEY).await {
            match serde_json::from_value::<Vec<DirectoryEntry>>(record.payload.clone()) {
                Ok(entries) if !entries.is_empty() => {
                    let snapshot = Snapshot {
                        fetched_at: record.fetched_at,
                        entries: Arc::new(entries),
                    };
                    if record.is_fresh(now, self.expire_after) {
                        log::debug!("从本地缓存加载代码表，共 {} 条", snapshot.entries.len());
                        let entries = snapshot.entries.clone();
                        *self.snapshot.write().await = Some(snapshot);
                        return entries;
                    }
                    if stale.as_ref().map_or(true, |s| s.fetched_at < snapshot.fetched_at) {
                        stale = Some(snapshot);
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("代码表缓存内容无效: {}", e),
            }
        }

        match self.fetch_directory().await {
            Ok(entries) => {
                log::info!("刷新代码表成功，共 {} 条", entries.len());
                let payload = serde_json::to_value(&entries).unwrap_or_default();
                self.disk.store(DIRECTORY_CACHE_KEY, &payload, now).await;

                let entries = Arc::new(entries);
                *self.snapshot.write().await = Some(Snapshot {
                    fetched_at: now,
                    entries: entries.clone(),
                });
                entries
            }
            Err(e) => {
                log::error!("获取代码表失败: {}", e);
                match stale {
                    Some(snapshot) => {
                        log::warn!("使用过期的代码表快照（{}）", snapshot.fetched_at);
                        snapshot.entries
                    }
                    None => Arc::new(Vec::new()),
                }
            }
        }
    }

    /// 按名称精确匹配代码（区分大小写），未匹配的名称不出现在结果中
    pub async fn resolve_codes_by_names<S: AsRef<str>>(&self, names: &[S]) -> HashMap<String, String> {
        let directory = self.get_directory().await;
        let mut by_name: HashMap<&str, &str> = HashMap::with_capacity(directory.len());
        for entry in directory.iter() {
            by_name.entry(entry.name.as_str()).or_insert(entry.code.as_str());
        }

        names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                by_name.get(name).map(|code| (name.to_string(), code.to_string()))
            })
            .collect()
    }

    /// 按代码查名称
    pub async fn resolve_names_by_codes<S: AsRef<str>>(&self, codes: &[S]) -> HashMap<String, String> {
        let directory = self.get_directory().await;
        let mut by_code: HashMap<&str, &str> = HashMap::with_capacity(directory.len());
        for entry in directory.iter() {
            by_code.entry(entry.code.as_str()).or_insert(entry.name.as_str());
        }

        codes
            .iter()
            .filter_map(|code| {
                let code = code.as_ref();
                by_code.get(code).map(|name| (code.to_string(), name.to_string()))
            })
            .collect()
    }

    async fn fetch_directory(&self) -> Result<Vec<DirectoryEntry>, UpstreamError> {
        let table = self.provider.list_symbols().await?;
        let entries: Vec<DirectoryEntry> = extract(&table, DIRECTORY_SCHEMA)
            .into_iter()
            .filter_map(|record| serde_json::from_value(record.into()).ok())
            .filter(|entry: &DirectoryEntry| !entry.code.is_empty() && !entry.name.is_empty())
            .collect();

        if entries.is_empty() {
            return Err(UpstreamError::NoData);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MinuteFrequency, RankingSource, Table};
    use crate::services::provider::UpstreamResult;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubProvider {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl StubProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl AShareProvider for StubProvider {
        async fn list_symbols(&self) -> UpstreamResult<Table> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(UpstreamError::Unavailable("down".to_string()));
            }
            let mut table = Table::new(["ts_code", "symbol", "name"]);
            table.push_row(vec![json!("600000.SH"), json!("600000"), json!("浦发银行")]);
            table.push_row(vec![json!("000001.SZ"), json!("000001"), json!("平安银行")]);
            Ok(table)
        }

        async fn realtime_quote(&self, _codes: &[String]) -> UpstreamResult<Table> {
            unreachable!()
        }

        async fn realtime_tick(&self, _code: &str) -> UpstreamResult<Table> {
            unreachable!()
        }

        async fn realtime_minute(&self, _codes: &[String], _freq: MinuteFrequency) -> UpstreamResult<Table> {
            unreachable!()
        }

        async fn realtime_list(&self, _source: RankingSource) -> UpstreamResult<Table> {
            unreachable!()
        }
    }

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: chrono::Duration) {
            let mut now = self.0.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn setup(dir: &std::path::Path) -> (Arc<StubProvider>, Arc<ManualClock>, SymbolDirectoryCache) {
        let provider = StubProvider::new();
        let clock = Arc::new(ManualClock(Mutex::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        )));
        let cache = SymbolDirectoryCache::new(provider.clone(), DiskCache::new(dir), chrono::Duration::hours(24))
            .with_clock(clock.clone());
        (provider, clock, cache)
    }

    #[tokio::test]
    async fn test_fetch_within_window_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, clock, cache) = setup(dir.path());

        assert_eq!(cache.get_directory().await.len(), 2);
        clock.advance(chrono::Duration::hours(23));
        assert_eq!(cache.get_directory().await.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_snapshot_refetches_once() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, clock, cache) = setup(dir.path());

        cache.get_directory().await;
        clock.advance(chrono::Duration::hours(25));
        cache.get_directory().await;
        cache.get_directory().await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disk_snapshot_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _clock, cache) = setup(dir.path());
        cache.get_directory().await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        let (provider2, _clock2, cache2) = setup(dir.path());
        assert_eq!(cache2.get_directory().await.len(), 2);
        assert_eq!(provider2.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_falls_back_to_stale_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, clock, cache) = setup(dir.path());
        cache.get_directory().await;

        provider.fail.store(true, Ordering::SeqCst);
        clock.advance(chrono::Duration::hours(48));
        assert_eq!(cache.get_directory().await.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_disk_snapshot_used_when_upstream_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (_provider, _clock, cache) = setup(dir.path());
        cache.get_directory().await;

        let (provider2, clock2, cache2) = setup(dir.path());
        provider2.fail.store(true, Ordering::SeqCst);
        clock2.advance(chrono::Duration::hours(48));

        let entries = cache2.get_directory().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(provider2.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache2.resolve_codes_by_names(&["平安银行"]).await["平安银行"], "000001.SZ");
    }

    #[tokio::test]
    async fn test_upstream_failure_without_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (provider, _clock, cache) = setup(dir.path());
        provider.fail.store(true, Ordering::SeqCst);
        assert!(cache.get_directory().await.is_empty());
        assert!(cache.resolve_codes_by_names(&["浦发银行"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cache_file_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stock_basic.json"), "garbage").unwrap();
        let (provider, _clock, cache) = setup(dir.path());
        assert_eq!(cache.get_directory().await.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let (_provider, _clock, cache) = setup(dir.path());

        let codes = cache.resolve_codes_by_names(&["浦发银行", "未知公司", "平安银行"]).await;
        assert_eq!(codes.len(), 2);
        assert_eq!(codes["浦发银行"], "600000.SH");
        assert!(!codes.contains_key("未知公司"));

        let names = cache.resolve_names_by_codes(&["000001.SZ", "999999.SH"]).await;
        assert_eq!(names.len(), 1);
        assert_eq!(names["000001.SZ"], "平安银行");
    }
}
