pub mod content;
pub mod run;

pub use content::{ContentItem, ContentType, TorrentFile};
pub use run::{RunReport, RunResult, RunStatus};
