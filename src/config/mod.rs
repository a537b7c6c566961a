pub mod manager;
pub mod settings;

pub use manager::{ConfigError, ConfigManager};
pub use settings::{AppConfig, ContentTypesConfig};
