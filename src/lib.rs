// Debrid 自动化库
//
// 本库提供定时自动化任务的核心功能，包括：
// - 哈希列表发现与提取
// - 内容分类与过滤
// - Real-Debrid API 集成
// - 已处理状态持久化
// - Telegram 通知

pub mod config;
pub mod external;
pub mod models;
pub mod services;
