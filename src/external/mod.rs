pub mod debrid;
pub mod error;
pub mod hashlist;
pub mod telegram;

pub use debrid::{validate_magnet_link, DebridClient, RetryPacing};
pub use error::{DebridError, ServiceStatus};
pub use hashlist::HashListClient;
pub use telegram::{Notifier, TelegramNotifier};
