//! Messaging channel adapter for match notifications.

mod http_notifier;
mod token_cache;

pub use http_notifier::{HttpNotifier, NotifyConfig};
pub use token_cache::AccessTokenCache;
