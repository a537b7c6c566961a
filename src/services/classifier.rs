// 内容分类器
//
// 根据文件名关键词给内容打粗粒度类型标签，并顺带推断画质标签。
// 优先级固定：成人内容 > 剧集 > 电影 > 其他；空文件名列表归为未知。

use crate::models::ContentType;

/// 成人内容关键词（优先级最高，命中即归类）
const ADULT_KEYWORDS: &[&str] = &[
    "xxx", "porn", "adult", "sex", "anal", "brazzers", "bangbros", "naughty", "playboy",
    "penthouse", "hustler", "x-art", "mofos", "blacked", "reality kings", "pornhub", "xvideos",
    "milf", "mature", "pussy", "cock", "dick", "nude", "hardcore",
];

/// 剧集标记（季/集编号与合集命名）
const TV_KEYWORDS: &[&str] = &[
    "s01", "s02", "s03", "s04", "s05", "e01", "e02", "e03", "season", "episode",
    "complete.series", "complete.season", "tv.pack",
];

/// 电影/发布质量标记
const MOVIE_KEYWORDS: &[&str] = &[
    "1080p", "720p", "2160p", "bdrip", "brrip", "bluray", "webrip", "dvdrip", "x264", "x265",
    "h264", "h265", "hevc", "remux", "hdr", "dts", "aac", "atmos",
];

/// 画质标签映射，按优先级排列，先命中者胜
const QUALITY_LABELS: &[(&str, &str)] = &[
    ("8k", "8K"),
    ("4k", "4K"),
    ("2160p", "4K"),
    ("1080p", "FHD"),
    ("720p", "HD"),
    ("bluray", "BluRay"),
    ("bdrip", "BluRay"),
    ("hdr", "HDR"),
    ("webrip", "WebRip"),
    ("web-dl", "WEB-DL"),
    ("web.dl", "WEB-DL"),
    ("dvdrip", "DVDRip"),
];

/// 内容分类器
pub struct ContentClassifier;

impl ContentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 根据文件名列表判定内容类型
    ///
    /// 大小写不敏感的子串匹配，先检查成人关键词（最需要过滤），
    /// 再依次检查剧集与电影标记
    pub fn classify(&self, filenames: &[String]) -> ContentType {
        if filenames.is_empty() {
            return ContentType::Unknown;
        }

        let joined = filenames.join(" ").to_lowercase();

        if ADULT_KEYWORDS.iter().any(|kw| joined.contains(kw)) {
            return ContentType::Adult;
        }
        if TV_KEYWORDS.iter().any(|kw| joined.contains(kw)) {
            return ContentType::Tv;
        }
        if MOVIE_KEYWORDS.iter().any(|kw| joined.contains(kw)) {
            return ContentType::Movie;
        }
        ContentType::Other
    }

    /// 从文件名推断画质展示标签
    ///
    /// 仅作元数据补充，不参与任何过滤判断
    pub fn extract_quality(&self, filenames: &[String]) -> Option<String> {
        let joined = filenames.join(" ").to_lowercase();

        QUALITY_LABELS
            .iter()
            .find(|(indicator, _)| joined.contains(indicator))
            .map(|(_, label)| label.to_string())
    }
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
