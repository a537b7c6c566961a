// 配置管理器 - 管理应用配置的加载与保存
//
// 本模块提供配置文件的持久化管理功能，包括：
// - 从 YAML 文件加载配置
// - 缺失时写出默认配置
// - 损坏时备份旧文件并回退到默认配置

use crate::config::settings::AppConfig;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

/// 配置操作的统一错误类型
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML 序列化错误: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// 配置管理器
///
/// 负责配置文件的读写，加载后配置在一次运行内不再变更
pub struct ConfigManager {
    /// 配置文件路径
    config_path: PathBuf,

    /// 当前配置
    config: AppConfig,
}

impl ConfigManager {
    /// 默认配置文件路径
    const DEFAULT_CONFIG_PATH: &'static str = "config/settings.yml";

    /// 从配置文件加载配置
    ///
    /// # 参数
    /// - `config_path`: 可选的配置文件路径，如果为 None 则使用默认路径
    ///
    /// # 行为
    /// - 如果配置文件不存在，使用默认配置并创建文件
    /// - 如果配置文件损坏，备份旧文件（.bak）并使用默认配置
    /// - 部分缺失的键由 serde 默认值补齐
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path =
            config_path.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_CONFIG_PATH));

        let config = if config_path.exists() {
            match fs::read_to_string(&config_path).await {
                Ok(content) => match serde_yaml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        tracing::info!("成功加载配置: {:?}", config_path);
                        config
                    }
                    Err(e) => {
                        // 配置文件损坏，备份并使用默认配置
                        tracing::warn!("配置文件损坏，使用默认配置: {}", e);
                        Self::backup_corrupted_config(&config_path).await;
                        AppConfig::default()
                    }
                },
                Err(e) => {
                    tracing::warn!("读取配置文件失败，使用默认配置: {}", e);
                    AppConfig::default()
                }
            }
        } else {
            tracing::info!("配置文件不存在，使用默认配置");
            AppConfig::default()
        };

        let manager = Self {
            config_path,
            config,
        };

        // 把默认配置写出，方便用户编辑
        if !manager.config_path.exists() {
            manager.save().await?;
        }

        Ok(manager)
    }

    /// 保存配置到文件
    pub async fn save(&self) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(&self.config)?;

        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() && !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        fs::write(&self.config_path, yaml).await?;

        tracing::info!("成功保存配置: {:?}", self.config_path);
        Ok(())
    }

    /// 获取配置的引用
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 取出配置（消费管理器）
    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// 备份损坏的配置文件
    ///
    /// 备份失败只记录日志，不影响主流程
    async fn backup_corrupted_config(config_path: &PathBuf) {
        let backup_path = config_path.with_extension("yml.bak");

        match fs::rename(config_path, &backup_path).await {
            Ok(_) => {
                tracing::info!("已备份损坏的配置文件到: {:?}", backup_path);
            }
            Err(e) => {
                tracing::warn!("备份配置文件失败: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// 创建临时配置文件路径
    fn create_temp_config_path() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.yml");
        (temp_dir, config_path)
    }

    #[tokio::test]
    async fn test_load_with_nonexistent_file() {
        let (_temp_dir, config_path) = create_temp_config_path();

        let manager = ConfigManager::load(Some(config_path.clone()))
            .await
            .unwrap();

        // 应该使用默认配置
        assert_eq!(manager.config(), &AppConfig::default());

        // 应该创建配置文件
        assert!(config_path.exists());
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let (_temp_dir, config_path) = create_temp_config_path();

        fs::write(&config_path, "max_items_per_run: 3\nforce_sync: true\n")
            .await
            .unwrap();

        let manager = ConfigManager::load(Some(config_path)).await.unwrap();
        let config = manager.config();

        assert_eq!(config.max_items_per_run, 3);
        assert!(config.force_sync);
        // 其余键取默认值
        assert_eq!(config.hash_list_limit, 15);
        assert_eq!(config.min_size_gb, 0.5);
    }

    #[tokio::test]
    async fn test_load_corrupted_config() {
        let (_temp_dir, config_path) = create_temp_config_path();

        // YAML 解析必然失败的内容
        fs::write(&config_path, "max_items_per_run: [unclosed\n  ::::")
            .await
            .unwrap();

        let manager = ConfigManager::load(Some(config_path.clone()))
            .await
            .unwrap();

        // 回退到默认配置
        assert_eq!(manager.config(), &AppConfig::default());

        // 应该创建备份文件
        let backup_path = config_path.with_extension("yml.bak");
        assert!(backup_path.exists());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let (_temp_dir, config_path) = create_temp_config_path();

        let manager = ConfigManager::load(Some(config_path.clone()))
            .await
            .unwrap();
        manager.save().await.unwrap();

        let manager2 = ConfigManager::load(Some(config_path)).await.unwrap();
        assert_eq!(manager2.config(), manager.config());
    }
}
