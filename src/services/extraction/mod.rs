// 哈希提取：iframe 负载解码与多级降级扫描

pub mod decode;
pub mod engine;

pub use decode::decode_fragment;
pub use engine::{synthetic_placeholder_hash, HashExtractor};
