// 内容过滤器
//
// 按配置对单个条目做通过/拒绝判定。判定结果是显式的裁决值而非
// 布尔量：成人内容的拒绝被单独区分，编排器据此把这类哈希标记为
// 已处理（永不复查），过滤器本身不碰共享状态。

use crate::config::AppConfig;
use crate::models::{ContentItem, ContentType};
use tracing::debug;

/// 单个条目的过滤裁决
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// 通过全部检查
    Keep,
    /// 成人内容：拒绝并应标记为已处理
    RejectAdult,
    /// 其他原因拒绝（附带原因，仅用于日志）
    Reject(&'static str),
}

impl FilterVerdict {
    pub fn is_keep(&self) -> bool {
        matches!(self, FilterVerdict::Keep)
    }
}

/// 内容过滤器
pub struct ContentFilter;

impl ContentFilter {
    pub fn new() -> Self {
        Self
    }

    /// 判定单个条目
    ///
    /// 检查顺序：成人内容 → 类型开关 → 大小边界 → 排除关键词 →
    /// 包含关键词。大小为 0 视为未知，跳过大小检查；边界本身含端点
    pub fn evaluate(&self, item: &ContentItem, config: &AppConfig) -> FilterVerdict {
        if item.content_type == ContentType::Adult {
            debug!("Rejecting adult content: {}", item.title);
            return FilterVerdict::RejectAdult;
        }

        match item.content_type {
            ContentType::Movie if !config.content_types.movies => {
                debug!("Rejecting movie (disabled in config): {}", item.title);
                return FilterVerdict::Reject("movies disabled");
            }
            ContentType::Tv if !config.content_types.tv_shows => {
                debug!("Rejecting TV content (disabled in config): {}", item.title);
                return FilterVerdict::Reject("tv_shows disabled");
            }
            _ => {}
        }

        if item.size_bytes > 0 {
            let size_gb = item.size_gb();
            if size_gb < config.min_size_gb {
                debug!(
                    "Rejecting content below size bound ({:.2} GB): {}",
                    size_gb, item.title
                );
                return FilterVerdict::Reject("below min size");
            }
            if size_gb > config.max_size_gb {
                debug!(
                    "Rejecting content above size bound ({:.2} GB): {}",
                    size_gb, item.title
                );
                return FilterVerdict::Reject("above max size");
            }
        }

        let joined = item.filenames().join(" ").to_lowercase();

        if config
            .exclude_keywords
            .iter()
            .any(|kw| joined.contains(&kw.to_lowercase()))
        {
            debug!("Rejecting content with excluded keyword: {}", item.title);
            return FilterVerdict::Reject("excluded keyword");
        }

        if !config.include_keywords.is_empty()
            && !config
                .include_keywords
                .iter()
                .any(|kw| joined.contains(&kw.to_lowercase()))
        {
            debug!("Rejecting content without include keywords: {}", item.title);
            return FilterVerdict::Reject("no include keyword");
        }

        FilterVerdict::Keep
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TorrentFile;

    const HASH: &str = "aaf5bf3a6fd5dcef0ff7038eea8ebf2fdcd17b4c";
    const GIB: u64 = 1024 * 1024 * 1024;

    fn item_with(content_type: ContentType, filename: &str, size: u64) -> ContentItem {
        ContentItem::new(
            HASH,
            content_type,
            vec![TorrentFile::new(filename, size)],
            None,
        )
    }

    /// 关键词不干扰大小测试的基础配置
    fn open_config() -> AppConfig {
        AppConfig {
            exclude_keywords: vec![],
            include_keywords: vec![],
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_adult_is_distinct_rejection() {
        let filter = ContentFilter::new();
        let config = open_config();
        let item = item_with(ContentType::Adult, "whatever.mkv", 2 * GIB);

        assert_eq!(filter.evaluate(&item, &config), FilterVerdict::RejectAdult);
    }

    #[test]
    fn test_disabled_content_types() {
        let filter = ContentFilter::new();
        let mut config = open_config();
        config.content_types.movies = false;

        let movie = item_with(ContentType::Movie, "film.1080p.mkv", 2 * GIB);
        assert!(!filter.evaluate(&movie, &config).is_keep());

        // 剧集开关独立
        let tv = item_with(ContentType::Tv, "show.s01e01.mkv", 2 * GIB);
        assert!(filter.evaluate(&tv, &config).is_keep());
    }

    #[test]
    fn test_other_and_unknown_not_gated_by_type_switches() {
        let filter = ContentFilter::new();
        let mut config = open_config();
        config.content_types.movies = false;
        config.content_types.tv_shows = false;

        let other = item_with(ContentType::Other, "archive.zip", 2 * GIB);
        assert!(filter.evaluate(&other, &config).is_keep());
    }

    #[test]
    fn test_size_bounds_are_inclusive() {
        let filter = ContentFilter::new();
        let mut config = open_config();
        config.min_size_gb = 1.0;
        config.max_size_gb = 4.0;

        // 恰好落在边界上的条目保留
        let at_min = item_with(ContentType::Movie, "film.mkv", GIB);
        assert!(filter.evaluate(&at_min, &config).is_keep());

        let at_max = item_with(ContentType::Movie, "film.mkv", 4 * GIB);
        assert!(filter.evaluate(&at_max, &config).is_keep());

        // 偏离边界一个字节即丢弃
        let below = item_with(ContentType::Movie, "film.mkv", GIB - 1);
        assert!(!filter.evaluate(&below, &config).is_keep());

        let above = item_with(ContentType::Movie, "film.mkv", 4 * GIB + 1);
        assert!(!filter.evaluate(&above, &config).is_keep());
    }

    #[test]
    fn test_zero_size_bypasses_size_check() {
        let filter = ContentFilter::new();
        let mut config = open_config();
        config.min_size_gb = 1.0;

        let unknown_size = item_with(ContentType::Movie, "film.mkv", 0);
        assert!(filter.evaluate(&unknown_size, &config).is_keep());
    }

    #[test]
    fn test_exclude_keywords() {
        let filter = ContentFilter::new();
        let mut config = open_config();
        config.exclude_keywords = vec!["cam".into()];

        let item = item_with(ContentType::Movie, "Film.2023.CAM.x264.mkv", 2 * GIB);
        assert_eq!(
            filter.evaluate(&item, &config),
            FilterVerdict::Reject("excluded keyword")
        );
    }

    #[test]
    fn test_include_keywords_require_one_match() {
        let filter = ContentFilter::new();
        let mut config = open_config();
        config.include_keywords = vec!["bluray".into(), "web-dl".into()];

        let with_marker = item_with(ContentType::Movie, "Film.BluRay.mkv", 2 * GIB);
        assert!(filter.evaluate(&with_marker, &config).is_keep());

        let without = item_with(ContentType::Movie, "Film.plain.mkv", 2 * GIB);
        assert!(!filter.evaluate(&without, &config).is_keep());
    }

    #[test]
    fn test_empty_include_list_matches_everything() {
        let filter = ContentFilter::new();
        let config = open_config();

        let item = item_with(ContentType::Movie, "Film.plain.mkv", 2 * GIB);
        assert!(filter.evaluate(&item, &config).is_keep());
    }
}
