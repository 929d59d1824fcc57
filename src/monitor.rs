//! The per-subscription polling state machine.

use crate::fetcher::{Fetch, FetchError};
use crate::filter::matching_items;
use crate::item::Item;
use crate::state::{ExtractError, StateExtractor};
use async_trait::async_trait;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Consumer of matched items produced by a poll loop.
///
/// Called once per matched item, in the order items appeared in the
/// iteration's filtered result. The loop awaits each call before the next,
/// so the sink's processing (dedup admission, notification) for iteration
/// N completes before iteration N+1 starts fetching.
#[async_trait]
pub trait ItemSink: Send + Sync {
    /// Handles one matched item.
    async fn accept(&self, item: Item);
}

/// Failure of one poll iteration. Always recovered by the loop.
#[derive(Debug)]
pub enum PollError {
    /// The category page could not be fetched.
    Fetch(FetchError),
    /// The page did not contain the expected embedded state.
    Extract(ExtractError),
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "fetch failed: {err}"),
            Self::Extract(err) => write!(f, "extraction failed: {err}"),
        }
    }
}

impl Error for PollError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::Extract(err) => Some(err),
        }
    }
}

impl From<FetchError> for PollError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<ExtractError> for PollError {
    fn from(err: ExtractError) -> Self {
        Self::Extract(err)
    }
}

/// Repeatedly fetches, extracts and filters one category page, handing
/// matched items to a sink until cancelled.
///
/// A loop is bound to exactly one subscription. Every iteration failure is
/// logged and treated as an empty result; the only way the loop ends is
/// its cancellation token firing. The token is observed at the
/// inter-iteration sleep and also aborts an in-flight fetch promptly.
pub struct PollLoop {
    fetcher: Arc<dyn Fetch>,
    extractor: StateExtractor,
    target: Url,
    keyword: String,
    interval: Duration,
    cancel: CancellationToken,
}

impl PollLoop {
    /// Binds a loop to a target page and keyword.
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        target: Url,
        keyword: String,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            extractor: StateExtractor::new(),
            target,
            keyword,
            interval,
            cancel,
        }
    }

    /// Drives iterations until the cancellation token fires.
    pub async fn run<S: ItemSink>(self, sink: S) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.poll_once().await {
                Ok(matched) => {
                    for item in matched {
                        sink.accept(item).await;
                    }
                }
                Err(err) => {
                    warn!(target = %self.target, keyword = %self.keyword, %err,
                        "poll iteration failed");
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        debug!(target = %self.target, keyword = %self.keyword, "poll loop cancelled");
    }

    /// One fetch-extract-filter cycle.
    ///
    /// Returns the matched items, or an empty collection when cancellation
    /// interrupts the fetch; the caller's next suspension point observes
    /// the token and terminates.
    async fn poll_once(&self) -> Result<Vec<Item>, PollError> {
        let markup = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(Vec::new()),
            fetched = self.fetcher.fetch(&self.target) => fetched?,
        };

        let state = self.extractor.extract(&markup)?;
        Ok(matching_items(state.items(), &self.keyword))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::timeout;

    const SCENARIO_MARKUP: &str = concat!(
        "<html><body><script id=\"hermes-state\">",
        r#"{"abc123": {"b": {"total": 3, "products": {"items": [
            {"sku": "S1", "title": "Kelly Bag", "stock": {"ecom": true}}
        ]}}}}"#,
        "</script></body></html>"
    );

    struct StubFetcher {
        markup: String,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl StubFetcher {
        fn new(markup: &str) -> Self {
            Self {
                markup: markup.to_string(),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        fn slow(markup: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::new(markup)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetch for StubFetcher {
        async fn fetch(&self, _target: &Url) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                sleep(delay).await;
            }
            Ok(self.markup.clone())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        items: Mutex<Vec<Item>>,
    }

    impl RecordingSink {
        fn skus(&self) -> Vec<String> {
            self.items
                .lock()
                .unwrap()
                .iter()
                .map(|item| item.sku.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ItemSink for Arc<RecordingSink> {
        async fn accept(&self, item: Item) {
            self.items.lock().unwrap().push(item);
        }
    }

    fn target() -> Url {
        Url::parse("https://www.example.com/us/en/category/bags/").unwrap()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn matched_items_reach_the_sink_every_iteration() {
        let fetcher = Arc::new(StubFetcher::new(SCENARIO_MARKUP));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let poll = PollLoop::new(
            Arc::clone(&fetcher) as Arc<dyn Fetch>,
            target(),
            "kelly".into(),
            Duration::from_millis(5),
            cancel.clone(),
        );
        let task = tokio::spawn(poll.run(Arc::clone(&sink)));

        sleep(Duration::from_millis(40)).await;
        cancel.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("loop stops promptly")
            .expect("loop task joins");

        assert!(fetcher.calls() > 1, "loop should have re-polled");
        let skus = sink.skus();
        assert!(!skus.is_empty());
        assert!(skus.iter().all(|sku| sku == "S1"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn non_matching_keyword_produces_nothing() {
        let fetcher = Arc::new(StubFetcher::new(SCENARIO_MARKUP));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let poll = PollLoop::new(
            Arc::clone(&fetcher) as Arc<dyn Fetch>,
            target(),
            "birkin".into(),
            Duration::from_millis(5),
            cancel.clone(),
        );
        let task = tokio::spawn(poll.run(Arc::clone(&sink)));

        sleep(Duration::from_millis(25)).await;
        cancel.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("loop stops")
            .expect("joins");

        assert!(sink.skus().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn iteration_failures_never_kill_the_loop() {
        let fetcher = Arc::new(StubFetcher::new("<html><body>nothing here</body></html>"));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let poll = PollLoop::new(
            Arc::clone(&fetcher) as Arc<dyn Fetch>,
            target(),
            "kelly".into(),
            Duration::from_millis(5),
            cancel.clone(),
        );
        let task = tokio::spawn(poll.run(Arc::clone(&sink)));

        sleep(Duration::from_millis(40)).await;
        cancel.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("loop stops")
            .expect("joins");

        // Extraction failed every time, yet the loop kept polling.
        assert!(fetcher.calls() > 1);
        assert!(sink.skus().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cancelling_mid_sleep_stops_further_fetches() {
        let fetcher = Arc::new(StubFetcher::new(SCENARIO_MARKUP));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let poll = PollLoop::new(
            Arc::clone(&fetcher) as Arc<dyn Fetch>,
            target(),
            "kelly".into(),
            Duration::from_secs(3600),
            cancel.clone(),
        );
        let task = tokio::spawn(poll.run(Arc::clone(&sink)));

        // First iteration completes, then the loop parks in its sleep.
        sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls(), 1);

        cancel.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("wakes out of the sleep")
            .expect("joins");
        assert_eq!(fetcher.calls(), 1, "no fetch after cancellation");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cancelling_mid_fetch_aborts_promptly() {
        let fetcher = Arc::new(StubFetcher::slow(SCENARIO_MARKUP, Duration::from_secs(3600)));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();

        let poll = PollLoop::new(
            Arc::clone(&fetcher) as Arc<dyn Fetch>,
            target(),
            "kelly".into(),
            Duration::from_millis(5),
            cancel.clone(),
        );
        let task = tokio::spawn(poll.run(Arc::clone(&sink)));

        sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls(), 1, "fetch is in flight");

        cancel.cancel();
        timeout(Duration::from_secs(1), task)
            .await
            .expect("fetch abandoned, not awaited to completion")
            .expect("joins");
        assert!(sink.skus().is_empty());
    }
}
