//! Item records deserialized from one poll of the category state payload.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of one listed product, as published in the page state.
///
/// Field names follow the upstream payload; unknown fields are ignored so
/// the record survives additive format changes upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Item {
    /// Stock-keeping identifier; the dedup key for notifications.
    #[serde(default)]
    pub sku: String,
    /// Display title the keyword filter runs against.
    #[serde(default)]
    pub title: String,
    /// Listed price, when the payload carries one.
    #[serde(default)]
    pub price: Option<f64>,
    /// Channel availability flags.
    #[serde(default)]
    pub stock: StockFlags,
    /// Detail-page path suffix, appended to the subscription base URL.
    #[serde(default, rename = "url")]
    pub url_path: String,
    /// Ordered media assets attached to the listing.
    #[serde(default)]
    pub assets: Vec<ItemAsset>,
}

impl Item {
    /// Resolves the first usable image asset to a fetchable URL.
    ///
    /// Image assets without a reference are skipped, so the first image
    /// entry carrying a URL wins. Upstream publishes protocol-relative
    /// references (`//assets…`); those get an `https:` prefix. Items
    /// without any usable image asset yield `None`, which is not an error;
    /// notifiers fall back to text-only delivery.
    pub fn first_image_url(&self) -> Option<String> {
        self.assets
            .iter()
            .filter(|asset| asset.kind == "image")
            .find_map(|asset| asset.url.as_deref())
            .map(|reference| {
                if reference.starts_with("//") {
                    format!("https:{reference}")
                } else {
                    reference.to_string()
                }
            })
    }
}

/// Upstream-provided booleans indicating channel-specific availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StockFlags {
    /// Available through the online store.
    #[serde(default)]
    pub ecom: bool,
    /// Available in a retail location.
    #[serde(default)]
    pub retail: bool,
    /// Some variant of the item is in online stock.
    #[serde(default, rename = "hasVariantInEcomStock")]
    pub has_variant_in_ecom_stock: bool,
}

impl StockFlags {
    /// True when any sales channel reports availability.
    pub fn any(&self) -> bool {
        self.ecom || self.retail || self.has_variant_in_ecom_stock
    }
}

/// One entry of an item's asset list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemAsset {
    /// Asset kind tag (`image`, `video`, …).
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Asset reference, possibly protocol-relative.
    #[serde(default)]
    pub url: Option<String>,
}
