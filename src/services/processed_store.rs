// 已处理哈希存储
//
// 持久化"不要再考虑"的哈希集合。进程启动时读入一次，运行中在
// 内存里变更，在每个退出路径（正常结束、鉴权失败、服务不可用
// 放弃、运行级错误）写回。写入走临时文件加重命名，保证原子性。

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// 落盘的记录格式
#[derive(Debug, Serialize, Deserialize)]
struct StoreRecord {
    #[serde(default)]
    processed_hashes: Vec<String>,
    last_updated: DateTime<Utc>,
    total_processed: usize,
}

/// 已处理哈希存储
pub struct ProcessedHashStore {
    path: PathBuf,
    hashes: HashSet<String>,
}

impl ProcessedHashStore {
    /// 默认存储路径
    const DEFAULT_PATH: &'static str = "data/processed_hashes.json";

    /// 从持久化文件加载
    ///
    /// 文件不存在时从空集合开始；文件损坏时记录警告并同样从空
    /// 集合开始（宁可重复检查也不中断运行）
    pub async fn load(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_PATH));

        let hashes = if path.exists() {
            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<StoreRecord>(&content) {
                    Ok(record) => {
                        let set: HashSet<String> = record
                            .processed_hashes
                            .into_iter()
                            .map(|h| h.to_lowercase())
                            .collect();
                        info!("Loaded {} processed hashes from {:?}", set.len(), path);
                        set
                    }
                    Err(e) => {
                        warn!("Corrupt processed-hash store, starting empty: {}", e);
                        HashSet::new()
                    }
                },
                Err(e) => {
                    warn!("Could not read processed-hash store, starting empty: {}", e);
                    HashSet::new()
                }
            }
        } else {
            HashSet::new()
        };

        Self { path, hashes }
    }

    /// 原子写回：先写临时文件再重命名覆盖
    pub async fn save(&self) -> Result<()> {
        let record = StoreRecord {
            processed_hashes: self.hashes.iter().cloned().collect(),
            last_updated: Utc::now(),
            total_processed: self.hashes.len(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.exists() && !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// 记入一个哈希（统一小写）
    pub fn insert(&mut self, hash: &str) {
        self.hashes.insert(hash.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store_path() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("processed_hashes.json");
        (temp_dir, path)
    }

    #[tokio::test]
    async fn test_load_missing_file_starts_empty() {
        let (_temp_dir, path) = temp_store_path();

        let store = ProcessedHashStore::load(Some(path)).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (_temp_dir, path) = temp_store_path();

        let mut store = ProcessedHashStore::load(Some(path.clone())).await;
        store.insert("aaf5bf3a6fd5dcef0ff7038eea8ebf2fdcd17b4c");
        store.insert("53007E625D632AD73F9DEFD5E4F3DDBD4E6D5B9A");
        store.save().await.unwrap();

        let reloaded = ProcessedHashStore::load(Some(path.clone())).await;
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("aaf5bf3a6fd5dcef0ff7038eea8ebf2fdcd17b4c"));
        // 大写写入的哈希按小写保存
        assert!(reloaded.contains("53007e625d632ad73f9defd5e4f3ddbd4e6d5b9a"));

        // 落盘记录带时间戳和总数
        let content = fs::read_to_string(&path).await.unwrap();
        let record: StoreRecord = serde_json::from_str(&content).unwrap();
        assert_eq!(record.total_processed, 2);
        assert!(record.last_updated <= Utc::now());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let (_temp_dir, path) = temp_store_path();
        fs::write(&path, "{not valid json!!").await.unwrap();

        let store = ProcessedHashStore::load(Some(path)).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_leaves_no_temp_file() {
        let (_temp_dir, path) = temp_store_path();

        let mut store = ProcessedHashStore::load(Some(path.clone())).await;
        store.insert("aaf5bf3a6fd5dcef0ff7038eea8ebf2fdcd17b4c");
        store.save().await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let (_temp_dir, path) = temp_store_path();

        let mut store = ProcessedHashStore::load(Some(path)).await;
        store.insert("aaf5bf3a6fd5dcef0ff7038eea8ebf2fdcd17b4c");
        store.insert("AAF5BF3A6FD5DCEF0FF7038EEA8EBF2FDCD17B4C");
        assert_eq!(store.len(), 1);
    }
}
