// 入口：单次自动化运行
//
// 进程由外部调度器（cron / systemd timer / GitHub Actions）定时拉起，
// 每次启动执行一轮完整流程后退出。正常结束和已妥善处理的放弃
// （鉴权失败、服务不可用）都以 0 退出，只有意外的运行级错误才
// 返回非零让调度器告警。

use anyhow::Context;
use debrid_auto::config::ConfigManager;
use debrid_auto::external::{DebridClient, HashListClient, TelegramNotifier};
use debrid_auto::models::RunStatus;
use debrid_auto::services::{AutomationService, ProcessedHashStore};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    // 工作目录准备
    for dir in ["data", "config"] {
        if let Err(e) = fs::create_dir_all(dir).await {
            warn!("Could not create {} directory: {}", dir, e);
        }
    }

    // 加载配置并应用环境变量覆盖
    let manager = ConfigManager::load(None).await?;
    let mut config = manager.into_config();
    config.apply_env_overrides();

    let api_key = std::env::var("REAL_DEBRID_API_KEY")
        .context("REAL_DEBRID_API_KEY environment variable is required")?;

    let debrid = DebridClient::new(api_key);
    let hashlist = HashListClient::new();
    let store = ProcessedHashStore::load(None).await;
    let notifier = Arc::new(TelegramNotifier::from_env());

    let mut service = AutomationService::new(config, debrid, hashlist, store, notifier);
    let report = service.run().await?;

    match report.status {
        RunStatus::Completed => {
            info!(
                "Automation run completed: added {}, failed {}, skipped {}",
                report.results.added_count(),
                report.results.failed_count(),
                report.results.skipped_count()
            );
        }
        RunStatus::AbortedServiceUnavailable => {
            warn!("Automation run aborted: Real-Debrid service unavailable");
        }
        RunStatus::AbortedAuthError => {
            warn!("Automation run aborted: authentication error");
        }
    }

    Ok(())
}
