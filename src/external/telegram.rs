// 通知通道
//
// send 是发后即忘的契约：发送失败只记录日志，永远不向调用方
// 抛错。缺少环境变量时通知被禁用，消息改为落在日志里。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

/// 通知通道契约
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 发送一条文本消息，失败不报错
    async fn send(&self, message: &str);
}

/// Telegram 机器人通知实现
pub struct TelegramNotifier {
    client: Client,
    bot_token: Option<String>,
    chat_id: Option<String>,
}

impl TelegramNotifier {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// 从环境变量构造
    ///
    /// 识别 TELEGRAM_BOT_TOKEN 与 TELEGRAM_CHAT_ID，
    /// 任一缺失时通知被禁用
    pub fn from_env() -> Self {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();

        if bot_token.is_none() || chat_id.is_none() {
            warn!("Telegram notifications disabled - missing bot token or chat ID");
        }

        Self {
            client: Client::new(),
            bot_token,
            chat_id,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) {
        let (token, chat_id) = match (&self.bot_token, &self.chat_id) {
            (Some(token), Some(chat_id)) => (token, chat_id),
            _ => {
                info!("Notification (disabled): {}", message);
                return;
            }
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
        let body = json!({
            "chat_id": chat_id,
            "text": message,
            "parse_mode": "HTML",
        });

        let result = self
            .client
            .post(&url)
            .timeout(Self::REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!("Notification sent successfully");
            }
            Ok(resp) => {
                error!("Failed to send notification: HTTP {}", resp.status());
            }
            Err(e) => {
                error!("Telegram notification failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_env() {
        // 直接构造缺 token 的实例，避免测试间环境变量串扰
        let notifier = TelegramNotifier {
            client: Client::new(),
            bot_token: None,
            chat_id: Some("123".into()),
        };
        assert!(!notifier.is_enabled());

        let notifier = TelegramNotifier {
            client: Client::new(),
            bot_token: Some("token".into()),
            chat_id: Some("123".into()),
        };
        assert!(notifier.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_send_does_not_error() {
        let notifier = TelegramNotifier {
            client: Client::new(),
            bot_token: None,
            chat_id: None,
        };
        // 禁用状态下 send 直接返回，不触网也不报错
        notifier.send("test message").await;
    }
}
