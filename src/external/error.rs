// Debrid 服务错误类型定义
//
// 把远端状态码归入可重试 / 不可重试两类，提交重试循环据此决策

use thiserror::Error;

/// Debrid API 操作的统一错误类型
#[derive(Debug, Error)]
pub enum DebridError {
    #[error("鉴权失败: HTTP {0}")]
    Auth(u16),

    #[error("触发限流 (HTTP 429)")]
    RateLimited,

    #[error("服务端错误: HTTP {0}")]
    Server(u16),

    #[error("客户端错误: HTTP {0}: {1}")]
    Client(u16, String),

    #[error("磁力链接格式无效: {0}")]
    InvalidMagnet(String),

    #[error("请求超时")]
    Timeout,

    #[error("网络错误: {0}")]
    Network(String),

    #[error("响应解析失败: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DebridError {
    /// 该错误是否值得带退避重试
    ///
    /// 仅服务端类错误（5xx、429、超时、网络故障）可重试；
    /// 鉴权失败、400 类错误和非法磁力链接立即失败
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DebridError::Server(_)
                | DebridError::RateLimited
                | DebridError::Timeout
                | DebridError::Network(_)
        )
    }

    /// 从 HTTP 状态码构造错误
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => DebridError::Auth(status),
            429 => DebridError::RateLimited,
            s if s >= 500 => DebridError::Server(s),
            s => DebridError::Client(s, body),
        }
    }
}

// 实现从 reqwest::Error 到 DebridError 的转换
impl From<reqwest::Error> for DebridError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DebridError::Timeout
        } else if err.is_status() {
            if let Some(status) = err.status() {
                DebridError::from_status(status.as_u16(), err.to_string())
            } else {
                DebridError::Network(err.to_string())
            }
        } else {
            DebridError::Network(err.to_string())
        }
    }
}

/// 健康检查映射出的服务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// API 正常响应
    Healthy,
    /// 服务端 5xx，值得等待恢复
    ServiceUnavailable,
    /// 401/403，等待无济于事
    AuthError,
    /// 429，冷却后可继续
    RateLimited,
    /// 其余失败，谨慎继续
    Unhealthy,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::ServiceUnavailable => "service_unavailable",
            ServiceStatus::AuthError => "auth_error",
            ServiceStatus::RateLimited => "rate_limited",
            ServiceStatus::Unhealthy => "unhealthy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DebridError::Server(503).is_retryable());
        assert!(DebridError::RateLimited.is_retryable());
        assert!(DebridError::Timeout.is_retryable());
        assert!(DebridError::Network("connection reset".into()).is_retryable());

        assert!(!DebridError::Auth(401).is_retryable());
        assert!(!DebridError::Client(400, "bad magnet".into()).is_retryable());
        assert!(!DebridError::InvalidMagnet("x".into()).is_retryable());
    }

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            DebridError::from_status(401, String::new()),
            DebridError::Auth(401)
        ));
        assert!(matches!(
            DebridError::from_status(403, String::new()),
            DebridError::Auth(403)
        ));
        assert!(matches!(
            DebridError::from_status(429, String::new()),
            DebridError::RateLimited
        ));
        assert!(matches!(
            DebridError::from_status(503, String::new()),
            DebridError::Server(503)
        ));
        assert!(matches!(
            DebridError::from_status(400, String::new()),
            DebridError::Client(400, _)
        ));
    }
}
