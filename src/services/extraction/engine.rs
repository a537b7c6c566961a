// 哈希提取引擎
//
// 输入一页哈希列表 HTML，输出其中藏着的 BitTorrent info-hash 集合。
// 提取是投机式的：先走 iframe 片段解码主路径，失败后逐级降级到
// script 块扫描和全文十六进制扫描。任何一级失败都不会抛出，
// 最坏结果是空集合。

use crate::services::extraction::decode::decode_fragment;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use url::Url;

/// 哈希提取引擎
///
/// 正则在构造时编译一次，之后可重复用于任意页面
pub struct HashExtractor {
    iframe_regex: Regex,
    hex40_regex: Regex,
    hex64_regex: Regex,
    split_regex: Regex,
    script_regexes: Vec<Regex>,
}

impl HashExtractor {
    pub fn new() -> Self {
        // 已知的状态注入模式，覆盖常见的前端数据内嵌方式
        let script_patterns = [
            r"(?si)<script[^>]*>(.*?)</script>",
            r"(?si)window\.__INITIAL_STATE__\s*=\s*(\{.*?\});",
            r"(?si)window\.__DATA__\s*=\s*(\{.*?\});",
            r"(?si)data\s*:\s*(\[.*?\])",
            r"(?si)hashes\s*:\s*(\[.*?\])",
        ];

        Self {
            iframe_regex: Regex::new(r#"(?i)<iframe[^>]*src="([^"]*)"[^>]*>"#)
                .expect("iframe 正则表达式编译失败"),
            hex40_regex: Regex::new(r"\b[a-fA-F0-9]{40}\b")
                .expect("40 位哈希正则表达式编译失败"),
            hex64_regex: Regex::new(r"\b[a-fA-F0-9]{64}\b")
                .expect("64 位哈希正则表达式编译失败"),
            split_regex: Regex::new(r"\W+").expect("切分正则表达式编译失败"),
            script_regexes: script_patterns
                .iter()
                .map(|p| Regex::new(p).expect("script 正则表达式编译失败"))
                .collect(),
        }
    }

    /// 从 HTML 文本中提取全部候选哈希
    ///
    /// 结果已去重、统一小写，且只含长度恰为 40 或 64 的纯十六进制
    /// 字符串。找不到任何哈希时返回空集合，绝不报错
    pub fn extract_hashes(&self, html: &str) -> HashSet<String> {
        let mut hashes = HashSet::new();

        // 主路径：逐个处理 iframe，结果取并集
        for caps in self.iframe_regex.captures_iter(html) {
            if let Some(src) = caps.get(1) {
                hashes.extend(self.extract_from_iframe_src(src.as_str()));
            }
        }

        if !hashes.is_empty() {
            tracing::info!("Extracted {} hashes from iframe payload", hashes.len());
            return hashes;
        }

        // 降级一：扫描 script 块里的内嵌状态
        hashes.extend(self.extract_from_scripts(html));

        // 降级二：全文十六进制扫描
        if hashes.is_empty() {
            hashes.extend(self.scan_hashes(html));
        }

        hashes
    }

    /// 处理单个 iframe 的 src
    fn extract_from_iframe_src(&self, src: &str) -> HashSet<String> {
        let mut hashes = HashSet::new();

        let payload = match Self::fragment_payload(src) {
            Some(payload) => payload,
            None => return hashes,
        };
        tracing::debug!("Found encoded payload of {} characters", payload.len());

        if let Some((decoded, strategy)) = decode_fragment(&payload) {
            tracing::info!("Decoded iframe payload using {} strategy", strategy);
            hashes.extend(self.scan_hashes(&decoded));
        }

        // 解码失败或解出的文本里没有哈希时，把原始负载按非单词
        // 字符切开，捞出形状正确的片段
        if hashes.is_empty() {
            for token in self.split_regex.split(&payload) {
                Self::insert_candidate(&mut hashes, token);
            }
            if !hashes.is_empty() {
                tracing::info!("Found {} hashes via raw payload split", hashes.len());
            }
        }

        hashes
    }

    /// 取 iframe src 中第一个 # 之后的编码负载
    fn fragment_payload(src: &str) -> Option<String> {
        if let Ok(parsed) = Url::parse(src) {
            if let Some(fragment) = parsed.fragment() {
                if !fragment.is_empty() {
                    return Some(fragment.to_string());
                }
            }
        }

        // 相对地址解析不了，退回手工切分
        src.split_once('#')
            .map(|(_, fragment)| fragment.to_string())
            .filter(|fragment| !fragment.is_empty())
    }

    /// 扫描 script 块中的内嵌状态数据
    fn extract_from_scripts(&self, html: &str) -> HashSet<String> {
        let mut hashes = HashSet::new();

        for regex in &self.script_regexes {
            for caps in regex.captures_iter(html) {
                let block = match caps.get(1) {
                    Some(block) => block.as_str(),
                    None => continue,
                };

                match serde_json::from_str::<serde_json::Value>(block.trim()) {
                    Ok(value) => Self::collect_json_hashes(&value, &mut hashes),
                    // 不是合法 JSON 就退回十六进制扫描
                    Err(_) => hashes.extend(self.scan_hashes(block)),
                }
            }
        }

        if !hashes.is_empty() {
            tracing::info!("Extracted {} hashes from script blocks", hashes.len());
        }
        hashes
    }

    /// 递归搜索 JSON 结构中的哈希
    ///
    /// 命中两类：键名为 hash / btih / info_hash 的字符串值，
    /// 以及任何长度恰为 40 或 64 的十六进制字符串
    fn collect_json_hashes(value: &serde_json::Value, out: &mut HashSet<String>) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, child) in map {
                    if matches!(key.as_str(), "hash" | "btih" | "info_hash") {
                        if let Some(text) = child.as_str() {
                            Self::insert_candidate(out, text);
                        }
                    }
                    Self::collect_json_hashes(child, out);
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::collect_json_hashes(item, out);
                }
            }
            serde_json::Value::String(text) => {
                Self::insert_candidate(out, text);
            }
            _ => {}
        }
    }

    /// 在任意文本中扫描 40 位和 64 位十六进制子串
    fn scan_hashes(&self, text: &str) -> HashSet<String> {
        let mut hashes = HashSet::new();
        for m in self.hex40_regex.find_iter(text) {
            hashes.insert(m.as_str().to_lowercase());
        }
        for m in self.hex64_regex.find_iter(text) {
            hashes.insert(m.as_str().to_lowercase());
        }
        hashes
    }

    /// 校验候选字符串并统一成小写后收入集合
    fn insert_candidate(out: &mut HashSet<String>, raw: &str) {
        if (raw.len() == 40 || raw.len() == 64) && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            out.insert(raw.to_lowercase());
        }
    }
}

impl Default for HashExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 为提取不到任何哈希的文档生成确定性的占位哈希
///
/// 占位哈希只是让下游流水线在降级状态下保持运转，日志里必须
/// 标明 synthetic，避免运维误认为是真实内容
pub fn synthetic_placeholder_hash(identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(identifier.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest).chars().take(40).collect()
}
