// 应用配置数据结构
//
// 定义了自动化任务的全部可配置项，包括：
// - 内容筛选策略（质量、类型、关键词、大小）
// - 每次运行的处理上限
// - 环境变量覆盖

use serde::{Deserialize, Serialize};

/// 应用配置（存储在 config/settings.yml）
///
/// 每个字段在配置文件缺失或部分缺失时都有内置默认值，
/// 用户只需覆盖自己关心的键
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// 质量偏好顺序（目前仅作记录，筛选不按此排序）
    #[serde(default = "default_quality_preferences")]
    pub quality_preferences: Vec<String>,

    /// 各内容类型的启用开关
    #[serde(default)]
    pub content_types: ContentTypesConfig,

    /// 年份下界（预留字段，标题中通常无年份信息）
    #[serde(default = "default_min_year")]
    pub min_year: u32,

    /// 年份上界
    #[serde(default = "default_max_year")]
    pub max_year: u32,

    /// 语言偏好列表
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// 排除关键词：文件名中出现任意一个即丢弃
    #[serde(default = "default_exclude_keywords")]
    pub exclude_keywords: Vec<String>,

    /// 包含关键词：非空时文件名中至少要出现一个
    #[serde(default = "default_include_keywords")]
    pub include_keywords: Vec<String>,

    /// 大小下界（GB，含边界）
    #[serde(default = "default_min_size_gb")]
    pub min_size_gb: f64,

    /// 大小上界（GB，含边界）
    #[serde(default = "default_max_size_gb")]
    pub max_size_gb: f64,

    /// 单次运行最多新增条目数
    #[serde(default = "default_max_items_per_run")]
    pub max_items_per_run: usize,

    /// 单次运行最多扫描的哈希列表数
    #[serde(default = "default_hash_list_limit")]
    pub hash_list_limit: usize,

    /// 调度间隔（小时），由外部调度器消费
    #[serde(default = "default_check_interval")]
    pub check_interval: u32,

    /// 强制同步开关
    #[serde(default)]
    pub force_sync: bool,
}

/// 内容类型开关
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentTypesConfig {
    #[serde(default = "default_true")]
    pub movies: bool,

    #[serde(default = "default_true")]
    pub tv_shows: bool,

    #[serde(default = "default_true")]
    pub documentaries: bool,
}

fn default_true() -> bool {
    true
}

fn default_quality_preferences() -> Vec<String> {
    vec!["2160p".into(), "1080p".into(), "720p".into()]
}

fn default_min_year() -> u32 {
    2020
}

fn default_max_year() -> u32 {
    2025
}

fn default_languages() -> Vec<String> {
    vec!["english".into(), "en".into()]
}

fn default_exclude_keywords() -> Vec<String> {
    [
        "cam", "ts", "screener", "workprint", "telecine", "r5", "dvdscr", "hdcam", "hdts",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_include_keywords() -> Vec<String> {
    ["bluray", "web-dl", "webrip", "hdtv", "brrip"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_size_gb() -> f64 {
    0.5
}

fn default_max_size_gb() -> f64 {
    50.0
}

fn default_max_items_per_run() -> usize {
    30
}

fn default_hash_list_limit() -> usize {
    15
}

fn default_check_interval() -> u32 {
    6
}

impl Default for ContentTypesConfig {
    /// 默认全部类型启用
    fn default() -> Self {
        Self {
            movies: true,
            tv_shows: true,
            documentaries: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quality_preferences: default_quality_preferences(),
            content_types: ContentTypesConfig::default(),
            min_year: default_min_year(),
            max_year: default_max_year(),
            languages: default_languages(),
            exclude_keywords: default_exclude_keywords(),
            include_keywords: default_include_keywords(),
            min_size_gb: default_min_size_gb(),
            max_size_gb: default_max_size_gb(),
            max_items_per_run: default_max_items_per_run(),
            hash_list_limit: default_hash_list_limit(),
            check_interval: default_check_interval(),
            force_sync: false,
        }
    }
}

impl AppConfig {
    /// 应用环境变量覆盖
    ///
    /// 识别两个变量：
    /// - `MAX_ITEMS_OVERRIDE`: 覆盖单次运行上限（无法解析时忽略）
    /// - `FORCE_SYNC`: 字面量 "true" 时开启强制同步
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("MAX_ITEMS_OVERRIDE") {
            match raw.trim().parse::<usize>() {
                Ok(n) => {
                    tracing::info!("MAX_ITEMS_OVERRIDE={} 覆盖 max_items_per_run", n);
                    self.max_items_per_run = n;
                }
                Err(_) => {
                    tracing::warn!("MAX_ITEMS_OVERRIDE 无法解析为整数，忽略: {}", raw);
                }
            }
        }

        if let Ok(raw) = std::env::var("FORCE_SYNC") {
            if raw.trim().eq_ignore_ascii_case("true") {
                self.force_sync = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.quality_preferences, vec!["2160p", "1080p", "720p"]);
        assert!(config.content_types.movies);
        assert!(config.content_types.tv_shows);
        assert!(config.content_types.documentaries);
        assert_eq!(config.min_year, 2020);
        assert_eq!(config.max_year, 2025);
        assert_eq!(config.min_size_gb, 0.5);
        assert_eq!(config.max_size_gb, 50.0);
        assert_eq!(config.max_items_per_run, 30);
        assert_eq!(config.hash_list_limit, 15);
        assert_eq!(config.check_interval, 6);
        assert!(!config.force_sync);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        // 用户只覆盖两个键，其余全部取默认值
        let yaml = "max_items_per_run: 5\nmin_size_gb: 1.0\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.max_items_per_run, 5);
        assert_eq!(config.min_size_gb, 1.0);
        assert_eq!(config.hash_list_limit, 15);
        assert_eq!(config.max_size_gb, 50.0);
        assert!(config.content_types.movies);
        assert!(!config.exclude_keywords.is_empty());
    }

    #[test]
    fn test_partial_content_types() {
        let yaml = "content_types:\n  movies: false\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(!config.content_types.movies);
        // 未指定的开关保持默认开启
        assert!(config.content_types.tv_shows);
        assert!(config.content_types.documentaries);
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = AppConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
