//! 本地磁盘缓存
//!
//! 每个缓存键对应一个 JSON 文件：`{ "timestamp": <unix 秒>, "data": <json> }`。
//! 读写在阻塞线程池中执行；文件损坏或读写失败一律当作未命中，只记日志。
//! 同一键的并发刷新不加锁，后写者覆盖。

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CacheError;

/// 时间来源，测试中可替换为手动时钟
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 一条缓存记录
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    pub key: String,
    pub fetched_at: DateTime<Utc>,
    pub payload: Value,
}

impl CacheRecord {
    /// 在 now 时刻是否仍在有效期内
    pub fn is_fresh(&self, now: DateTime<Utc>, expire_after: chrono::Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < expire_after
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    timestamp: f64,
    data: Value,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 读取缓存，不判断是否过期
    pub async fn load(&self, key: &str) -> Option<CacheRecord> {
        let path = self.path(key);

        let result = tokio::task::spawn_blocking(move || read_file(&path))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(None) => None,
            Ok(Some(file)) => match timestamp_to_datetime(file.timestamp) {
                Some(fetched_at) => {
                    log::debug!("读取缓存 {} 成功", key);
                    Some(CacheRecord {
                        key: key.to_string(),
                        fetched_at,
                        payload: file.data,
                    })
                }
                None => {
                    log::warn!("缓存 {} 时间戳无效: {}", key, file.timestamp);
                    None
                }
            },
            Err(e) => {
                log::warn!("读取缓存 {} 失败: {}", key, e);
                None
            }
        }
    }

    /// 写入缓存，返回是否写入成功
    pub async fn store(&self, key: &str, payload: &Value, fetched_at: DateTime<Utc>) -> bool {
        let path = self.path(key);
        let file = CacheFile {
            timestamp: fetched_at.timestamp_millis() as f64 / 1000.0,
            data: payload.clone(),
        };

        let result = tokio::task::spawn_blocking(move || write_file(&path, &file))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(()) => {
                log::debug!("缓存 {} 已保存", key);
                true
            }
            Err(e) => {
                log::warn!("写入缓存 {} 失败: {}", key, e);
                false
            }
        }
    }

    /// 缓存键对应的文件路径
    pub fn path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

/// 文件不存在时返回 `Ok(None)`
fn read_file(path: &Path) -> Result<Option<CacheFile>, CacheError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

fn write_file(path: &Path, file: &CacheFile) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(file)?;
    fs::write(path, json)?;
    Ok(())
}

fn timestamp_to_datetime(timestamp: f64) -> Option<DateTime<Utc>> {
    if !timestamp.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt((timestamp * 1000.0) as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("nested"));
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        assert!(cache.load("stock_basic").await.is_none());
        assert!(cache.store("stock_basic", &json!([{"ts_code": "600000.SH"}]), now).await);

        let record = cache.load("stock_basic").await.unwrap();
        assert_eq!(record.key, "stock_basic");
        assert_eq!(record.fetched_at, now);
        assert_eq!(record.payload, json!([{"ts_code": "600000.SH"}]));
    }

    #[tokio::test]
    async fn test_reads_python_style_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        fs::write(
            cache.path("stock_basic"),
            r#"{"timestamp": 1700000000.25, "data": {"a": 1}}"#,
        )
        .unwrap();

        let record = cache.load("stock_basic").await.unwrap();
        assert_eq!(record.fetched_at.timestamp_millis(), 1_700_000_000_250);
        assert_eq!(record.payload, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        fs::write(cache.path("stock_basic"), "{not json").unwrap();
        assert!(cache.load("stock_basic").await.is_none());

        fs::write(cache.path("stock_basic"), r#"{"data": []}"#).unwrap();
        assert!(cache.load("stock_basic").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("not_created"));
        assert!(cache.load("stock_basic").await.is_none());
        assert!(matches!(read_file(&cache.path("stock_basic")), Ok(None)));
        assert!(!cache.dir().exists());
    }

    #[test]
    fn test_freshness() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = CacheRecord {
            key: "k".to_string(),
            fetched_at,
            payload: Value::Null,
        };
        let ttl = chrono::Duration::hours(24);
        assert!(record.is_fresh(fetched_at + chrono::Duration::hours(23), ttl));
        assert!(!record.is_fresh(fetched_at + chrono::Duration::hours(24), ttl));
    }

    #[test]
    fn test_key_is_sanitized() {
        let cache = DiskCache::new("/tmp/cache");
        assert_eq!(cache.path("../evil key"), PathBuf::from("/tmp/cache/___evil_key.json"));
    }
}
