// 哈希列表站点客户端
//
// 负责两件事：枚举远端存在哪些哈希列表文件，以及拉取单个列表的
// HTML 文档。主站探测失败后降级到 GitHub 镜像，任何网络故障或
// 畸形响应都只算"该来源无结果"，绝不向上抛错。

use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 哈希列表站点客户端
pub struct HashListClient {
    client: Client,
    base_url: String,
    github_api_url: String,
    raw_github_url: String,
    uuid_filename_regex: Regex,
}

impl HashListClient {
    /// 单次请求超时（哈希列表页面可能很大）
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// HTML 扫描发现的列表文件名上限
    const HTML_SCAN_CAP: usize = 50;

    /// GitHub 镜像回退的文件数上限
    const GITHUB_CAP: usize = 20;

    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: "https://hashlists.debridmediamanager.com".to_string(),
            github_api_url: "https://api.github.com/repos/debridmediamanager/hashlists/contents"
                .to_string(),
            raw_github_url: "https://raw.githubusercontent.com/debridmediamanager/hashlists/main"
                .to_string(),
            uuid_filename_regex: Regex::new(
                r"([a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})\.html",
            )
            .expect("UUID 文件名正则表达式编译失败"),
        }
    }

    /// 覆盖主站地址（测试用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 覆盖镜像地址（测试用）
    pub fn with_mirror_urls(
        mut self,
        github_api_url: impl Into<String>,
        raw_github_url: impl Into<String>,
    ) -> Self {
        self.github_api_url = github_api_url.into();
        self.raw_github_url = raw_github_url.into();
        self
    }

    /// 枚举可用的哈希列表文件名
    ///
    /// 先探测主站的几个已知索引端点，全部落空再查 GitHub 镜像；
    /// 两条路都失败时返回空列表
    pub async fn list_available_sources(&self, limit: usize) -> Vec<String> {
        let mut sources = self.probe_primary_endpoints().await;

        if sources.is_empty() {
            info!("Primary site yielded no hash lists, falling back to mirror");
            sources = self.list_from_mirror().await;
        }

        if sources.len() > limit {
            sources.truncate(limit);
            info!("Limited to {} hash lists for this run", limit);
        }
        sources
    }

    /// 主站索引端点探测，第一个出结果的端点获胜
    async fn probe_primary_endpoints(&self) -> Vec<String> {
        let endpoints = [
            format!("{}/index.json", self.base_url),
            format!("{}/lists.json", self.base_url),
            format!("{}/api/lists", self.base_url),
            format!("{}/", self.base_url),
        ];

        for endpoint in &endpoints {
            match self.fetch_text(endpoint).await {
                Some(content) => {
                    let found = self.parse_source_listing(&content);
                    if !found.is_empty() {
                        info!("Found {} hash lists via {}", found.len(), endpoint);
                        return found;
                    }
                }
                None => {
                    debug!("No usable response from {}", endpoint);
                }
            }
        }
        Vec::new()
    }

    /// 解析索引响应：JSON 数组、带 lists 键的 JSON 对象，
    /// 或 HTML 中 UUID 形状的文件名引用
    fn parse_source_listing(&self, content: &str) -> Vec<String> {
        if let Ok(value) = serde_json::from_str::<Value>(content) {
            match value {
                Value::Array(items) => {
                    let names: Vec<String> = items
                        .into_iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect();
                    if !names.is_empty() {
                        return names;
                    }
                }
                Value::Object(map) => {
                    if let Some(Value::Array(lists)) = map.get("lists") {
                        let names: Vec<String> = lists
                            .iter()
                            .filter_map(|item| item.as_str().map(str::to_string))
                            .collect();
                        if !names.is_empty() {
                            return names;
                        }
                    }
                }
                _ => {}
            }
        }

        // 不是 JSON 索引就在 HTML 里找 UUID 文件名引用
        let mut names = Vec::new();
        for caps in self.uuid_filename_regex.captures_iter(content) {
            if let Some(uuid_part) = caps.get(1) {
                if Uuid::parse_str(uuid_part.as_str()).is_ok() {
                    let filename = format!("{}.html", uuid_part.as_str());
                    if !names.contains(&filename) {
                        names.push(filename);
                    }
                    if names.len() >= Self::HTML_SCAN_CAP {
                        break;
                    }
                }
            }
        }
        names
    }

    /// GitHub 镜像回退：目录列表 API 过滤出 .html 文件
    async fn list_from_mirror(&self) -> Vec<String> {
        let response = self
            .client
            .get(&self.github_api_url)
            .header("User-Agent", "debrid-auto")
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await;

        let entries: Vec<Value> = match response {
            Ok(resp) if resp.status().is_success() => match resp.json().await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Malformed mirror listing response: {}", e);
                    return Vec::new();
                }
            },
            Ok(resp) => {
                warn!("Mirror listing failed: HTTP {}", resp.status());
                return Vec::new();
            }
            Err(e) => {
                warn!("Mirror listing request failed: {}", e);
                return Vec::new();
            }
        };

        let files: Vec<String> = entries
            .iter()
            .filter(|entry| entry.get("type").and_then(Value::as_str) == Some("file"))
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .filter(|name| name.ends_with(".html"))
            .take(Self::GITHUB_CAP)
            .map(str::to_string)
            .collect();

        info!("Found {} hash list files from mirror", files.len());
        files
    }

    /// 拉取单个哈希列表文档
    ///
    /// 主站失败时退回镜像的原始内容地址；两边都拿不到返回 None
    pub async fn fetch_document(&self, filename: &str) -> Option<String> {
        let primary = format!("{}/{}", self.base_url, filename);
        if let Some(content) = self.fetch_text(&primary).await {
            debug!("Loaded hash list from primary: {}", filename);
            return Some(content);
        }

        let mirror = format!("{}/{}", self.raw_github_url, filename);
        match self
            .client
            .get(&mirror)
            .header("User-Agent", "debrid-auto")
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(content) => {
                    debug!("Loaded hash list from mirror: {}", filename);
                    Some(content)
                }
                Err(e) => {
                    warn!("Failed to read mirror document {}: {}", filename, e);
                    None
                }
            },
            Ok(resp) => {
                warn!("Mirror document {} failed: HTTP {}", filename, resp.status());
                None
            }
            Err(e) => {
                warn!("Mirror document request {} failed: {}", filename, e);
                None
            }
        }
    }

    /// 带浏览器化请求头的主站 GET，任何失败都返回 None
    async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = self
            .client
            .get(url)
            .header(
                "User-Agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", "https://debridmediamanager.com/")
            .timeout(Self::REQUEST_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(content) => Some(content),
                Err(e) => {
                    debug!("Failed to read response body from {}: {}", url, e);
                    None
                }
            },
            Ok(resp) => {
                debug!("Request to {} returned HTTP {}", url, resp.status());
                None
            }
            Err(e) => {
                debug!("Request to {} failed: {}", url, e);
                None
            }
        }
    }
}

impl Default for HashListClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_A: &str = "152f7044-6b5b-494c-8878-fdd015d4c9df.html";
    const LIST_B: &str = "a1b2c3d4-0000-1111-2222-333344445555.html";

    #[test]
    fn test_parse_json_array_listing() {
        let client = HashListClient::new();
        let content = format!(r#"["{}", "{}", 42]"#, LIST_A, LIST_B);

        let sources = client.parse_source_listing(&content);
        assert_eq!(sources, vec![LIST_A, LIST_B]);
    }

    #[test]
    fn test_parse_lists_key_listing() {
        let client = HashListClient::new();
        let content = format!(r#"{{"updated": "2024-01-01", "lists": ["{}"]}}"#, LIST_A);

        let sources = client.parse_source_listing(&content);
        assert_eq!(sources, vec![LIST_A]);
    }

    #[test]
    fn test_parse_html_uuid_scan() {
        let client = HashListClient::new();
        let content = format!(
            r#"<html><a href="/{}">list</a><a href="/{}">list</a><a href="/{}">dup</a></html>"#,
            LIST_A, LIST_B, LIST_A
        );

        let sources = client.parse_source_listing(&content);
        // 重复引用只算一次
        assert_eq!(sources, vec![LIST_A, LIST_B]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let client = HashListClient::new();

        assert!(client.parse_source_listing("").is_empty());
        assert!(client.parse_source_listing("not json, no uuids").is_empty());
        assert!(client.parse_source_listing(r#"{"lists": "not-an-array"}"#).is_empty());
        // 形状接近但不是合法 UUID 文件名
        assert!(client
            .parse_source_listing("zzzzzzzz-6b5b-494c-8878-fdd015d4c9df.html")
            .is_empty());
    }

    #[tokio::test]
    async fn test_list_available_sources_respects_limit() {
        // 主站与镜像都指向不可达地址，探测应安静地返回空
        let client = HashListClient::new()
            .with_base_url("http://127.0.0.1:1")
            .with_mirror_urls("http://127.0.0.1:1/api", "http://127.0.0.1:1/raw");

        let sources = client.list_available_sources(5).await;
        assert!(sources.is_empty());
    }
}
