#![warn(missing_docs)]
//! Core library entry points for the dropwatch category monitor.

pub mod controls;
pub mod fetcher;
pub mod filter;
pub mod item;
pub mod monitor;
pub mod notify;
pub mod registry;
pub mod seen;
pub mod state;

pub use controls::{Cli, WatchControls};
pub use fetcher::{CategoryFetcher, Fetch, FetchError};
pub use filter::matching_items;
pub use item::{Item, ItemAsset, StockFlags};
pub use monitor::{ItemSink, PollLoop};
pub use notify::{base_url_of, LogNotifier, NotificationGate, Notify};
pub use registry::{AddOutcome, RemoveOutcome, SubscriptionKey, SubscriptionRegistry};
pub use seen::SeenSet;
pub use state::{CategoryState, ExtractError, StateExtractor};
