// 自动化编排器
//
// 驱动一次完整运行：健康检查 → 列表发现 → 逐列表提取/分类/过滤/
// 去重/提交 → 收尾持久化与通知。全程单线程顺序执行，网络调用间
// 插入固定节奏的停顿，尊重远端限流。
//
// 失败语义：单个条目或单个列表的失败只影响自身，继续处理下一个；
// 只有鉴权失败和等不到恢复的服务中断才放弃整次运行。无论哪条退出
// 路径，已处理集合都会落盘，用户都会收到通知。

use crate::config::AppConfig;
use crate::external::{DebridClient, HashListClient, Notifier, ServiceStatus};
use crate::models::{ContentItem, RunReport, RunResult, RunStatus};
use crate::services::classifier::ContentClassifier;
use crate::services::content_filter::{ContentFilter, FilterVerdict};
use crate::services::extraction::{synthetic_placeholder_hash, HashExtractor};
use crate::services::processed_store::ProcessedHashStore;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{error, info, warn};

/// 运行节奏参数，测试中注入毫秒级值
#[derive(Debug, Clone)]
pub struct RunPacing {
    /// 列表之间的固定停顿
    pub inter_list_pause: Duration,
    /// 429 后的冷却时长
    pub rate_limit_cooldown: Duration,
    /// 服务恢复等待上限
    pub recovery_ceiling: Duration,
}

impl Default for RunPacing {
    fn default() -> Self {
        Self {
            inter_list_pause: Duration::from_secs(30),
            rate_limit_cooldown: Duration::from_secs(300),
            recovery_ceiling: Duration::from_secs(15 * 60),
        }
    }
}

/// 静态哈希文件的格式（降级运行用）
#[derive(Debug, Deserialize)]
struct StaticHashFile {
    #[serde(default)]
    hashes: Vec<String>,
}

/// 自动化编排器
///
/// 独占持有两个网络客户端和已处理集合，生命周期覆盖一次运行
pub struct AutomationService {
    config: AppConfig,
    debrid: DebridClient,
    hashlist: HashListClient,
    extractor: HashExtractor,
    classifier: ContentClassifier,
    filter: ContentFilter,
    store: ProcessedHashStore,
    notifier: Arc<dyn Notifier>,
    pacing: RunPacing,
    static_hash_path: PathBuf,
}

impl AutomationService {
    /// 单个列表最多保留的哈希数
    const PER_LIST_HASH_CAP: usize = 1000;

    /// 通知中展示的新增条目数上限
    const NOTIFY_TITLE_CAP: usize = 5;

    pub fn new(
        config: AppConfig,
        debrid: DebridClient,
        hashlist: HashListClient,
        store: ProcessedHashStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            debrid,
            hashlist,
            extractor: HashExtractor::new(),
            classifier: ContentClassifier::new(),
            filter: ContentFilter::new(),
            store,
            notifier,
            pacing: RunPacing::default(),
            static_hash_path: PathBuf::from("data/static_hashes.json"),
        }
    }

    /// 覆盖节奏参数（测试用）
    pub fn with_pacing(mut self, pacing: RunPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// 覆盖静态哈希文件路径（测试用）
    pub fn with_static_hash_path(mut self, path: PathBuf) -> Self {
        self.static_hash_path = path;
        self
    }

    /// 执行一次完整运行
    ///
    /// 运行级错误在向上传播前完成状态落盘和错误通知
    pub async fn run(&mut self) -> Result<RunReport> {
        match self.run_inner().await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Error in automation: {}", e);
                self.flush_store().await;
                self.notifier
                    .send(&format!(
                        "❌ DebridAuto Error\nAutomation failed with error: {}",
                        e
                    ))
                    .await;
                Err(e)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<RunReport> {
        info!("Starting DebridAuto automation run");

        // 先落盘一次，保证文件存在，哪怕这次运行中途放弃
        self.store.save().await?;

        // 健康门禁
        if let Some(report) = self.health_gate().await? {
            return Ok(report);
        }

        // 发现可用的哈希列表
        info!("Fetching available hash lists...");
        let sources = self
            .hashlist
            .list_available_sources(self.config.hash_list_limit)
            .await;

        if sources.is_empty() {
            return self.run_static_fallback().await;
        }
        info!("Found {} hash lists to process", sources.len());

        // 账户内已有种子只拉取一次
        let existing = match self.debrid.get_existing_hashes().await {
            Ok(hashes) => hashes,
            Err(e) => {
                warn!("Could not fetch existing torrents, deduping locally only: {}", e);
                HashSet::new()
            }
        };

        let mut results = RunResult::new();
        let total = sources.len();

        for (index, filename) in sources.iter().enumerate() {
            info!("Processing hash list {}/{}: {}", index + 1, total, filename);

            let hashes = self.load_list_hashes(filename).await;
            if hashes.is_empty() {
                warn!("No hashes found in {}, skipping", filename);
                continue;
            }
            info!("Loaded {} hashes from {}", hashes.len(), filename);

            let batch = self.process_hash_batch(&hashes, filename, &existing).await;
            info!(
                "Hash list {} results: added {}, failed {}, skipped {}",
                filename,
                batch.added_count(),
                batch.failed_count(),
                batch.skipped_count()
            );
            results.merge(batch);

            if results.added_count() >= self.config.max_items_per_run {
                info!(
                    "Reached maximum items limit ({}), stopping processing",
                    self.config.max_items_per_run
                );
                break;
            }

            // 列表间停顿，最后一个列表之后不等
            if index + 1 < total {
                info!(
                    "Waiting {:?} before processing next hash list",
                    self.pacing.inter_list_pause
                );
                tokio::time::sleep(self.pacing.inter_list_pause).await;
            }
        }

        self.finalize(results).await
    }

    /// 健康检查与状态分派
    ///
    /// 返回 Some(report) 表示运行到此为止
    async fn health_gate(&mut self) -> Result<Option<RunReport>> {
        info!("Checking Real-Debrid service status...");

        match self.debrid.check_service_status().await {
            ServiceStatus::Healthy => {
                info!("Real-Debrid service is healthy");
                Ok(None)
            }
            ServiceStatus::ServiceUnavailable => {
                info!("Service unavailable (5xx), waiting for recovery...");
                if self
                    .debrid
                    .wait_for_service_recovery(self.pacing.recovery_ceiling)
                    .await
                {
                    info!("Service recovered, continuing with automation");
                    Ok(None)
                } else {
                    error!("Service did not recover, aborting this run");
                    self.notifier
                        .send(
                            "⚠️ DebridAuto Run Skipped\nReal-Debrid service is experiencing \
                             503 errors and did not recover within 15 minutes.\nWill retry \
                             in next scheduled run.",
                        )
                        .await;
                    self.flush_store().await;
                    Ok(Some(RunReport::aborted(
                        RunStatus::AbortedServiceUnavailable,
                    )))
                }
            }
            ServiceStatus::AuthError => {
                error!("Authentication error - check your API key");
                self.notifier
                    .send(
                        "❌ DebridAuto Authentication Error\nInvalid API key or \
                         authentication failed. Please check your Real-Debrid API key.",
                    )
                    .await;
                self.flush_store().await;
                Ok(Some(RunReport::aborted(RunStatus::AbortedAuthError)))
            }
            ServiceStatus::RateLimited => {
                warn!(
                    "Rate limited, waiting {:?} before proceeding",
                    self.pacing.rate_limit_cooldown
                );
                tokio::time::sleep(self.pacing.rate_limit_cooldown).await;
                Ok(None)
            }
            ServiceStatus::Unhealthy => {
                warn!("Service status unhealthy, proceeding with caution");
                Ok(None)
            }
        }
    }

    /// 拉取并解析单个哈希列表文档
    ///
    /// 提取结果为空时合成一个确定性的占位哈希，让下游流水线在
    /// 降级状态下保持运转；超出单列表上限的部分按排序截断
    async fn load_list_hashes(&self, filename: &str) -> Vec<String> {
        let html = match self.hashlist.fetch_document(filename).await {
            Some(html) => html,
            None => return Vec::new(),
        };

        let extracted = self.extractor.extract_hashes(&html);
        let mut hashes: Vec<String> = if extracted.is_empty() {
            let placeholder = synthetic_placeholder_hash(filename);
            warn!(
                "No hashes extracted from {}, using synthetic placeholder {}",
                filename, placeholder
            );
            vec![placeholder]
        } else {
            extracted.into_iter().collect()
        };

        hashes.sort();
        hashes.truncate(Self::PER_LIST_HASH_CAP);
        hashes
    }

    /// 处理一批哈希：构建条目 → 过滤 → 双重去重 → 限量 → 提交
    async fn process_hash_batch(
        &mut self,
        hashes: &[String],
        source_name: &str,
        existing: &HashSet<String>,
    ) -> RunResult {
        let mut results = RunResult::new();
        let mut seen_in_batch: HashSet<String> = HashSet::new();
        let mut candidates: Vec<ContentItem> = Vec::new();

        for hash in hashes {
            // 占位元数据：真实文件信息要到提交之后才有
            let file = self.debrid.placeholder_torrent_file(hash);
            let filenames = vec![file.filename.clone()];
            let content_type = self.classifier.classify(&filenames);
            let quality = self.classifier.extract_quality(&filenames);
            let item = ContentItem::new(hash.clone(), content_type, vec![file], quality);

            match self.filter.evaluate(&item, &self.config) {
                FilterVerdict::Keep => {}
                FilterVerdict::RejectAdult => {
                    // 成人内容记为已处理，未来运行不再复查
                    info!("Skipping adult content: {}", item.title);
                    self.store.insert(&item.hash);
                    continue;
                }
                FilterVerdict::Reject(_) => continue,
            }

            if self.store.contains(&item.hash) {
                continue;
            }

            if existing.contains(&item.hash) {
                info!("Content already exists in Real-Debrid, skipping: {}", item.title);
                results.skipped.push(item);
                continue;
            }

            // 批内按哈希去重
            if !seen_in_batch.insert(item.hash.clone()) {
                continue;
            }
            candidates.push(item);
        }

        // 把单次运行的限额摊到各个列表上，保底 5 条
        let per_batch_cap = (self.config.max_items_per_run
            / self.config.hash_list_limit.max(1))
        .max(5);
        if candidates.len() > per_batch_cap {
            candidates.truncate(per_batch_cap);
            info!(
                "Limited to {} items for this batch from {}",
                per_batch_cap, source_name
            );
        }

        info!(
            "Submitting {} new items from {}",
            candidates.len(),
            source_name
        );

        for item in candidates {
            match self.debrid.add_magnet(&item.magnet_link()).await {
                Ok(torrent_id) => {
                    info!("Successfully added to Real-Debrid: {}", item.title);
                    // 选文件失败不影响提交结果
                    self.debrid.select_files(&torrent_id).await;
                    self.store.insert(&item.hash);
                    results.added.push(item);
                }
                Err(e) => {
                    // 不记入已处理集合，下次运行还有机会重试
                    error!("Failed to add to Real-Debrid: {}: {}", item.title, e);
                    results.failed.push(item);
                }
            }
        }

        results
    }

    /// 降级路径：发现不到任何列表时处理本地静态哈希文件
    async fn run_static_fallback(&mut self) -> Result<RunReport> {
        warn!("No hash lists found, falling back to static hash file");

        let hashes = self.load_static_hashes().await;
        if hashes.is_empty() {
            error!("No hashes available from any source");
            return self.finalize(RunResult::new()).await;
        }

        let existing = match self.debrid.get_existing_hashes().await {
            Ok(hashes) => hashes,
            Err(e) => {
                warn!("Could not fetch existing torrents, deduping locally only: {}", e);
                HashSet::new()
            }
        };

        let results = self
            .process_hash_batch(&hashes, "static_file", &existing)
            .await;
        self.finalize(results).await
    }

    /// 读取静态哈希文件，缺失或损坏都按空处理
    async fn load_static_hashes(&self) -> Vec<String> {
        match fs::read_to_string(&self.static_hash_path).await {
            Ok(content) => match serde_json::from_str::<StaticHashFile>(&content) {
                Ok(file) => {
                    info!(
                        "Loaded {} hashes from static file {:?}",
                        file.hashes.len(),
                        self.static_hash_path
                    );
                    file.hashes
                }
                Err(e) => {
                    warn!("Corrupt static hash file, ignoring: {}", e);
                    Vec::new()
                }
            },
            Err(_) => {
                warn!("Static hash file {:?} not found", self.static_hash_path);
                Vec::new()
            }
        }
    }

    /// 收尾：落盘并在有动作时发汇总通知
    async fn finalize(&mut self, results: RunResult) -> Result<RunReport> {
        info!(
            "Run complete: added {}, failed {}, skipped {}",
            results.added_count(),
            results.failed_count(),
            results.skipped_count()
        );

        self.store.save().await?;

        if !results.is_quiet() {
            let message = format_summary(&results, Self::NOTIFY_TITLE_CAP);
            self.notifier.send(&message).await;
        }

        Ok(RunReport::completed(results))
    }

    /// 尽力而为的落盘，放弃路径上使用
    async fn flush_store(&self) {
        if let Err(e) = self.store.save().await {
            error!("Failed to persist processed hashes: {}", e);
        }
    }
}

/// 汇总通知正文
fn format_summary(results: &RunResult, title_cap: usize) -> String {
    let mut message = format!(
        "DebridAuto Run Complete:\n✅ Added: {}\n⏭️ Skipped: {}\n❌ Failed: {}\n",
        results.added_count(),
        results.skipped_count(),
        results.failed_count()
    );

    if !results.added.is_empty() {
        message.push_str("\nAdded items:\n");
        for item in results.added.iter().take(title_cap) {
            message.push_str(&format!("• {}\n", item.title));
        }
        if results.added.len() > title_cap {
            message.push_str(&format!(
                "• ... and {} more\n",
                results.added.len() - title_cap
            ));
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn item(hash: &str) -> ContentItem {
        ContentItem::new(hash, ContentType::Movie, vec![], None)
    }

    #[test]
    fn test_format_summary_counts() {
        let mut results = RunResult::new();
        results
            .added
            .push(item("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        results
            .failed
            .push(item("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));

        let message = format_summary(&results, 5);
        assert!(message.starts_with("DebridAuto Run Complete:\n"));
        assert!(message.contains("✅ Added: 1"));
        assert!(message.contains("⏭️ Skipped: 0"));
        assert!(message.contains("❌ Failed: 1"));
        assert!(message.contains("• Cached Content aaaaaaaa"));
    }

    #[test]
    fn test_format_summary_truncates_titles() {
        let mut results = RunResult::new();
        for i in 0..7 {
            let hash = format!("{:0>40}", i);
            results.added.push(item(&hash));
        }

        let message = format_summary(&results, 5);
        assert!(message.contains("• ... and 2 more\n"));
        // 只展示前 5 条标题
        assert_eq!(message.matches("• Cached Content").count(), 5);
    }

    #[test]
    fn test_format_summary_without_added_items() {
        let mut results = RunResult::new();
        results
            .failed
            .push(item("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));

        let message = format_summary(&results, 5);
        assert!(!message.contains("Added items:"));
    }

    #[test]
    fn test_default_pacing_matches_production_values() {
        let pacing = RunPacing::default();
        assert_eq!(pacing.inter_list_pause, Duration::from_secs(30));
        assert_eq!(pacing.rate_limit_cooldown, Duration::from_secs(300));
        assert_eq!(pacing.recovery_ceiling, Duration::from_secs(900));
    }
}
