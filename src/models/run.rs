use crate::models::ContentItem;

/// 单次运行的结果聚合
#[derive(Debug, Default, Clone)]
pub struct RunResult {
    pub added: Vec<ContentItem>,
    pub failed: Vec<ContentItem>,
    pub skipped: Vec<ContentItem>,
}

impl RunResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并另一批结果
    pub fn merge(&mut self, other: RunResult) {
        self.added.extend(other.added);
        self.failed.extend(other.failed);
        self.skipped.extend(other.skipped);
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// 本轮是否没有任何值得通知的动作
    pub fn is_quiet(&self) -> bool {
        self.added.is_empty() && self.failed.is_empty()
    }
}

/// 运行终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// 正常跑完（包括无新内容的空跑）
    Completed,
    /// 服务持续 5xx，等待恢复超时后放弃
    AbortedServiceUnavailable,
    /// 鉴权失败，立即放弃
    AbortedAuthError,
}

/// 返回给入口的运行摘要
#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    pub results: RunResult,
}

impl RunReport {
    pub fn aborted(status: RunStatus) -> Self {
        Self {
            status,
            results: RunResult::new(),
        }
    }

    pub fn completed(results: RunResult) -> Self {
        Self {
            status: RunStatus::Completed,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;

    fn item(hash: &str) -> ContentItem {
        ContentItem::new(hash, ContentType::Other, vec![], None)
    }

    #[test]
    fn test_merge_accumulates() {
        let mut total = RunResult::new();
        let mut batch = RunResult::new();
        batch.added.push(item("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        batch.failed.push(item("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        total.merge(batch);

        let mut batch2 = RunResult::new();
        batch2
            .skipped
            .push(item("cccccccccccccccccccccccccccccccccccccccc"));
        total.merge(batch2);

        assert_eq!(total.added_count(), 1);
        assert_eq!(total.failed_count(), 1);
        assert_eq!(total.skipped_count(), 1);
    }

    #[test]
    fn test_is_quiet() {
        let mut results = RunResult::new();
        assert!(results.is_quiet());

        results
            .skipped
            .push(item("cccccccccccccccccccccccccccccccccccccccc"));
        assert!(results.is_quiet());

        results
            .added
            .push(item("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
        assert!(!results.is_quiet());
    }
}
