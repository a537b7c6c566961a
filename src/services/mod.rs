// 业务服务层

pub mod automation;
pub mod classifier;
pub mod content_filter;
pub mod extraction;
pub mod processed_store;

pub use automation::{AutomationService, RunPacing};
pub use classifier::ContentClassifier;
pub use content_filter::{ContentFilter, FilterVerdict};
pub use extraction::HashExtractor;
pub use processed_store::ProcessedHashStore;
