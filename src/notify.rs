//! Notification boundary: deciding that (and to whom) a notification is due.

use crate::item::Item;
use crate::monitor::ItemSink;
use crate::seen::SeenSet;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Boxed error type carried across the notification seam.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound delivery capability supplied by the embedding application.
///
/// The core never formats or transmits messages itself; implementations
/// must tolerate items without an image reference by falling back to a
/// text-only notification.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Delivers one item notification to the given requester.
    async fn notify(&self, chat_id: i64, item: &Item, base_url: &str) -> Result<(), DynError>;
}

/// Derives the link prefix for item detail pages: the target URL truncated
/// at its first `/category` path segment.
pub fn base_url_of(target: &Url) -> String {
    let raw = target.as_str();
    match raw.split_once("/category") {
        Some((head, _)) => head.to_string(),
        None => raw.to_string(),
    }
}

/// The caller layer around a poll loop: gates matched items on stock, then
/// on dedup admission, then hands them to the notifier.
///
/// The in-stock check runs before admission, so an out-of-stock match is
/// not recorded as seen and a later restock still notifies. Delivery
/// failures are logged and dropped; they must not stall the loop.
pub struct NotificationGate {
    seen: Arc<SeenSet>,
    notifier: Arc<dyn Notify>,
    chat_id: i64,
    base_url: String,
}

impl NotificationGate {
    /// Builds the gate for one subscription.
    pub fn new(seen: Arc<SeenSet>, notifier: Arc<dyn Notify>, chat_id: i64, target: &Url) -> Self {
        Self {
            seen,
            notifier,
            chat_id,
            base_url: base_url_of(target),
        }
    }
}

#[async_trait]
impl ItemSink for NotificationGate {
    async fn accept(&self, item: Item) {
        if item.sku.is_empty() {
            debug!(title = %item.title, "skipping item without sku");
            return;
        }
        if !item.stock.any() {
            debug!(sku = %item.sku, "match is out of stock");
            return;
        }
        if !self.seen.first_sighting(&item.sku) {
            return;
        }

        if let Err(err) = self
            .notifier
            .notify(self.chat_id, &item, &self.base_url)
            .await
        {
            warn!(sku = %item.sku, chat_id = self.chat_id, %err, "notification delivery failed");
        }
    }
}

/// Notifier that renders notifications to the log; used by the demo binary
/// in place of a chat transport.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    /// Creates the notifier.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notify for LogNotifier {
    async fn notify(&self, chat_id: i64, item: &Item, base_url: &str) -> Result<(), DynError> {
        let detail_url = if item.url_path.is_empty() {
            None
        } else {
            Some(format!("{base_url}{}", item.url_path))
        };
        info!(
            chat_id,
            sku = %item.sku,
            title = %item.title,
            price = item.price,
            detail_url = detail_url.as_deref(),
            image_url = item.first_image_url().as_deref(),
            "new item in stock"
        );
        Ok(())
    }
}
