// 片段负载解码策略
//
// 哈希列表页面把数据藏在 iframe src 的 # 片段里，编码方式不固定：
// 可能是 LZ-string 压缩、可能是 base64、也可能就是裸哈希文本。
// 本模块把每种猜测实现为一个纯函数策略，由驱动函数按固定顺序逐个
// 尝试，任何一个策略失败都不会中断级联。

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// 40 位十六进制（BitTorrent info-hash）
    static ref HEX40: Regex =
        Regex::new(r"\b[a-fA-F0-9]{40}\b").expect("哈希正则表达式编译失败");
}

/// 解码策略：纯函数，输入原始负载，输出候选明文
pub type DecodeStrategy = fn(&str) -> Option<String>;

/// 按顺序尝试的解码策略表
pub const STRATEGIES: &[(&str, DecodeStrategy)] = &[
    ("lz_string", lz_string_variants),
    ("raw_hex_scan", raw_hex_scan),
    ("normalized_base64", normalized_base64),
    ("url_decoded_base64", url_decoded_base64),
];

/// 解码 iframe 片段负载
///
/// 按 STRATEGIES 顺序尝试，返回第一个产出超过 10 个字符的结果
/// 以及命中的策略名；全部失败时返回 None
pub fn decode_fragment(payload: &str) -> Option<(String, &'static str)> {
    for (name, strategy) in STRATEGIES {
        if let Some(text) = strategy(payload) {
            if text.chars().count() > 10 {
                tracing::debug!("Decoded fragment payload using {}", name);
                return Some((text, name));
            }
        }
    }
    None
}

/// 策略一：LZ-string 解压
///
/// 依次尝试四个已知变体（base64 / UTF16 / 字节数组 / 通用），
/// 接受第一个解出超过 10 个字符文本的变体
pub fn lz_string_variants(payload: &str) -> Option<String> {
    let variants: [(&str, fn(&str) -> Option<Vec<u16>>); 4] = [
        ("decompress_from_base64", |s| {
            lz_str::decompress_from_base64(s)
        }),
        ("decompress_from_utf16", |s| lz_str::decompress_from_utf16(s)),
        ("decompress_from_uint8_array", |s| {
            lz_str::decompress_from_uint8_array(s.as_bytes())
        }),
        ("decompress", |s| lz_str::decompress(s)),
    ];

    for (name, variant) in variants {
        if let Some(wide) = variant(payload) {
            if let Ok(text) = String::from_utf16(&wide) {
                if text.chars().count() > 10 {
                    tracing::debug!("LZ-string variant {} succeeded", name);
                    return Some(text);
                }
            }
        }
    }
    None
}

/// 策略二：负载本身已含裸哈希
///
/// 直接在未解码的负载里找 40 位十六进制子串，命中则按行拼接返回
pub fn raw_hex_scan(payload: &str) -> Option<String> {
    let matches: Vec<&str> = HEX40.find_iter(payload).map(|m| m.as_str()).collect();
    if matches.is_empty() {
        None
    } else {
        tracing::debug!("Found {} hashes directly in payload", matches.len());
        Some(matches.join("\n"))
    }
}

/// 策略三：URL 安全 base64
///
/// 把 URL 安全字符还原（- 换 +，_ 换 /），补齐 = 到 4 的倍数后
/// 按标准 base64 解码；解出的文本必须含哈希模式才算命中
pub fn normalized_base64(payload: &str) -> Option<String> {
    let mut cleaned = payload.replace('-', "+").replace('_', "/");
    while cleaned.len() % 4 != 0 {
        cleaned.push('=');
    }

    let decoded_bytes = BASE64.decode(&cleaned).ok()?;
    let decoded_text = String::from_utf8_lossy(&decoded_bytes).into_owned();

    if HEX40.is_match(&decoded_text) {
        tracing::debug!("Found hashes after base64 decode");
        Some(decoded_text)
    } else {
        None
    }
}

/// 策略四：先 URL 解码再 base64
///
/// 仅当 URL 解码确实改变了字符串才继续；base64 解码时强制补两个
/// 等号，解出的文本同样必须含哈希模式
pub fn url_decoded_base64(payload: &str) -> Option<String> {
    let url_decoded = urlencoding::decode(payload).ok()?;
    if url_decoded == payload {
        return None;
    }

    let decoded_bytes = BASE64.decode(format!("{}==", url_decoded)).ok()?;
    let decoded_text = String::from_utf8_lossy(&decoded_bytes).into_owned();

    if HEX40.is_match(&decoded_text) {
        tracing::debug!("Found hashes after URL+base64 decode");
        Some(decoded_text)
    } else {
        None
    }
}
