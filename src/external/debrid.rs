// Real-Debrid API 客户端
//
// 覆盖自动化运行需要的窄接口：
// - GET user 做健康探测
// - GET torrents 拉取账户内已有种子哈希
// - POST torrents/addMagnet 提交磁力链接（带退避重试）
// - POST torrents/selectFiles/{id} 尽力而为的选文件跟进

use crate::external::error::{DebridError, ServiceStatus};
use crate::models::TorrentFile;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 提交重试与恢复等待的节奏参数
///
/// 生产默认值与远端限流预期匹配，测试中注入毫秒级值
#[derive(Debug, Clone)]
pub struct RetryPacing {
    /// 首次重试前的基础延迟
    pub base_retry_delay: Duration,
    /// 服务恢复等待的轮询间隔
    pub recovery_poll_interval: Duration,
}

impl Default for RetryPacing {
    fn default() -> Self {
        Self {
            base_retry_delay: Duration::from_secs(3),
            recovery_poll_interval: Duration::from_secs(60),
        }
    }
}

/// addMagnet 成功时的响应体
#[derive(Debug, Deserialize)]
struct AddMagnetResponse {
    id: String,
    #[serde(default)]
    uri: Option<String>,
}

/// 账户种子列表中的单条记录
#[derive(Debug, Deserialize)]
struct TorrentEntry {
    #[serde(default)]
    hash: Option<String>,
}

/// Real-Debrid API 客户端
pub struct DebridClient {
    client: Client,
    api_key: String,
    base_url: String,
    pacing: RetryPacing,
}

impl DebridClient {
    /// 提交单个磁力链接的最大尝试次数
    const MAX_ATTEMPTS: u32 = 5;

    /// 每次重试的退避倍率
    const BACKOFF_FACTOR: f64 = 1.6;

    /// 单次请求超时
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.real-debrid.com/rest/1.0".to_string(),
            pacing: RetryPacing::default(),
        }
    }

    /// 覆盖 API 地址（测试用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 覆盖节奏参数（测试用）
    pub fn with_pacing(mut self, pacing: RetryPacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// 健康探测：GET user 并把结果归入服务状态
    ///
    /// 每种结果都有对应状态，本方法不报错
    pub async fn check_service_status(&self) -> ServiceStatus {
        let url = format!("{}/user", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                debug!("Real-Debrid health probe: HTTP {}", status);
                match status {
                    200..=299 => ServiceStatus::Healthy,
                    401 | 403 => ServiceStatus::AuthError,
                    429 => ServiceStatus::RateLimited,
                    s if s >= 500 => ServiceStatus::ServiceUnavailable,
                    _ => ServiceStatus::Unhealthy,
                }
            }
            Err(e) => {
                warn!("Real-Debrid health probe failed: {}", e);
                ServiceStatus::Unhealthy
            }
        }
    }

    /// 等待服务从 5xx 中恢复
    ///
    /// 按固定间隔轮询健康探测，到达等待上限仍未恢复则放弃；
    /// 轮询中出现鉴权错误立即结束（等待无济于事）
    pub async fn wait_for_service_recovery(&self, max_wait: Duration) -> bool {
        let interval = self.pacing.recovery_poll_interval;
        let max_checks = (max_wait.as_millis() / interval.as_millis().max(1)).max(1) as u32;

        info!(
            "Waiting for Real-Debrid service recovery (max {:?}, {} polls)",
            max_wait, max_checks
        );

        for attempt in 1..=max_checks {
            match self.check_service_status().await {
                ServiceStatus::Healthy => {
                    info!("Real-Debrid service has recovered");
                    return true;
                }
                ServiceStatus::AuthError => {
                    error!("Authentication error during recovery wait, giving up");
                    return false;
                }
                status => {
                    debug!(
                        "Service still {} (poll {}/{}), next check in {:?}",
                        status.as_str(),
                        attempt,
                        max_checks,
                        interval
                    );
                }
            }
            tokio::time::sleep(interval).await;
        }

        warn!("Service did not recover within {:?}", max_wait);
        false
    }

    /// 拉取账户内已有种子的哈希集合（统一小写）
    pub async fn get_existing_hashes(&self) -> Result<HashSet<String>, DebridError> {
        let url = format!("{}/torrents", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            // 204 空账户不会带响应体，上面已按成功放行
            let body = response.text().await.unwrap_or_default();
            return Err(DebridError::from_status(status, body));
        }

        let text = response.text().await.map_err(DebridError::from)?;
        if text.trim().is_empty() {
            return Ok(HashSet::new());
        }

        let entries: Vec<TorrentEntry> = serde_json::from_str(&text)?;
        let hashes = entries
            .into_iter()
            .filter_map(|entry| entry.hash)
            .map(|h| h.to_lowercase())
            .collect::<HashSet<_>>();

        debug!("Found {} existing torrents in Real-Debrid", hashes.len());
        Ok(hashes)
    }

    /// 提交磁力链接，成功返回远端分配的种子 ID
    ///
    /// 最多尝试 5 次，仅对可重试错误退避后再试；退避延迟按
    /// 1.6 倍指数增长，并叠加由链接内容决定的小抖动，避免多个
    /// 并发运行的重试节拍互相同步
    pub async fn add_magnet(&self, magnet_link: &str) -> Result<String, DebridError> {
        if !validate_magnet_link(magnet_link) {
            return Err(DebridError::InvalidMagnet(magnet_link.to_string()));
        }

        let url = format!("{}/torrents/addMagnet", self.base_url);
        let jitter = jitter_factor(magnet_link);
        let preview = magnet_preview(magnet_link);
        let mut last_error = DebridError::Network("no attempt made".to_string());

        for attempt in 1..=Self::MAX_ATTEMPTS {
            debug!(
                "Adding magnet (attempt {}/{}): {}...",
                attempt,
                Self::MAX_ATTEMPTS,
                preview
            );

            match self.try_add_magnet(&url, magnet_link).await {
                Ok(id) => {
                    info!("Successfully added magnet, torrent id: {}", id);
                    return Ok(id);
                }
                Err(e) if e.is_retryable() && attempt < Self::MAX_ATTEMPTS => {
                    let delay = self.backoff_delay(attempt, jitter);
                    warn!(
                        "Transient error adding magnet ({}), retrying in {:?}",
                        e, delay
                    );
                    last_error = e;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!("Failed to add magnet: {}", e);
                    return Err(e);
                }
            }
        }

        error!("Failed to add magnet after {} attempts", Self::MAX_ATTEMPTS);
        Err(last_error)
    }

    /// 单次提交尝试
    async fn try_add_magnet(&self, url: &str, magnet_link: &str) -> Result<String, DebridError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .timeout(Self::REQUEST_TIMEOUT)
            .form(&[("magnet", magnet_link)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(DebridError::from)?;

        match status {
            200 | 201 | 204 => {
                let parsed: AddMagnetResponse = serde_json::from_str(&text)?;
                if let Some(uri) = &parsed.uri {
                    debug!("Torrent info URL: {}", uri);
                }
                Ok(parsed.id)
            }
            s => Err(DebridError::from_status(s, text)),
        }
    }

    /// 第 attempt 次失败后的退避延迟
    fn backoff_delay(&self, attempt: u32, jitter: f64) -> Duration {
        let base = self.pacing.base_retry_delay.as_secs_f64();
        let scaled = base * Self::BACKOFF_FACTOR.powi(attempt as i32 - 1) * jitter;
        Duration::from_secs_f64(scaled)
    }

    /// 尽力而为的选文件跟进
    ///
    /// 失败只记录日志，不影响提交结果
    pub async fn select_files(&self, torrent_id: &str) {
        let url = format!("{}/torrents/selectFiles/{}", self.base_url, torrent_id);

        let result = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(Self::REQUEST_TIMEOUT)
            .form(&[("files", "all")])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                debug!("Selected all files for torrent {}", torrent_id);
            }
            Ok(resp) => {
                warn!(
                    "Could not select files for torrent {}: HTTP {}",
                    torrent_id,
                    resp.status()
                );
            }
            Err(e) => {
                warn!("Could not select files for torrent {}: {}", torrent_id, e);
            }
        }
    }

    /// 提交前的占位元数据
    ///
    /// Real-Debrid 没有按哈希查询元数据的端点，条目构建统一使用
    /// 确定性占位文件（文件名含哈希前 8 位，大小 1 GiB）；真实
    /// 元数据要到提交之后才会出现
    pub fn placeholder_torrent_file(&self, hash: &str) -> TorrentFile {
        let short: String = hash.chars().take(8).collect();
        TorrentFile::new(format!("content_{}", short), 1_073_741_824)
    }
}

/// 校验磁力链接的结构形状
///
/// 必须以磁力协议头开始、带 BitTorrent info-hash 参数，且哈希
/// 长度为 32（Base32）、40（SHA-1 hex）或 64（SHA-256 hex）
pub fn validate_magnet_link(magnet_link: &str) -> bool {
    if !magnet_link.starts_with("magnet:?") {
        return false;
    }

    let marker = "xt=urn:btih:";
    let hash_part = match magnet_link.split_once(marker) {
        Some((_, rest)) => rest.split('&').next().unwrap_or(""),
        None => return false,
    };

    matches!(hash_part.len(), 32 | 40 | 64)
}

/// 日志展示用的链接前缀
///
/// 按字符截断：dn 参数可能带多字节文本，不能按字节切
fn magnet_preview(magnet_link: &str) -> String {
    magnet_link.chars().take(60).collect()
}

/// 由链接内容决定的重试抖动系数
///
/// 取链接 SHA-256 的首字节模 3，映射到 {1.0, 1.15, 1.3}
fn jitter_factor(magnet_link: &str) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(magnet_link.as_bytes());
    let digest = hasher.finalize();
    match digest[0] % 3 {
        0 => 1.0,
        1 => 1.15,
        _ => 1.3,
    }
}
