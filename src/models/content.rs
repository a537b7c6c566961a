use serde::{Deserialize, Serialize};

/// 内容类型 - 根据文件名关键词粗分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Tv,
    Adult,
    Other,
    Unknown,
}

impl ContentType {
    /// 转换为字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Tv => "tv",
            ContentType::Adult => "adult",
            ContentType::Other => "other",
            ContentType::Unknown => "unknown",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(ContentType::Movie),
            "tv" => Some(ContentType::Tv),
            "adult" => Some(ContentType::Adult),
            "other" => Some(ContentType::Other),
            "unknown" => Some(ContentType::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 种子内的单个文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentFile {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
}

impl TorrentFile {
    pub fn new(filename: impl Into<String>, size: u64) -> Self {
        Self {
            filename: filename.into(),
            size,
        }
    }
}

/// 一条待处理的内容记录
///
/// 由分类器从哈希加可选的远端元数据一次性构建，之后不再修改。
/// `hash` 始终为小写，是全流程的唯一标识。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub hash: String,
    pub title: String,
    pub content_type: ContentType,
    pub size_bytes: u64,
    #[serde(default)]
    pub files: Vec<TorrentFile>,
    /// 从文件名推断出的画质标签（仅展示用，不参与过滤）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

impl ContentItem {
    /// 创建内容记录，哈希统一转为小写
    pub fn new(
        hash: impl Into<String>,
        content_type: ContentType,
        files: Vec<TorrentFile>,
        quality: Option<String>,
    ) -> Self {
        let hash = hash.into().to_lowercase();
        let short: String = hash.chars().take(8).collect();
        let title = format!("Cached Content {}", short);
        let size_bytes = files.iter().map(|f| f.size).sum();
        Self {
            hash,
            title,
            content_type,
            size_bytes,
            files,
            quality,
        }
    }

    /// 所有文件名集合（分类与关键词过滤的输入）
    pub fn filenames(&self) -> Vec<String> {
        self.files.iter().map(|f| f.filename.clone()).collect()
    }

    /// 大小换算为 GB
    pub fn size_gb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0 * 1024.0)
    }

    /// 构建磁力链接
    pub fn magnet_link(&self) -> String {
        format!("magnet:?xt=urn:btih:{}", self.hash)
    }
}
