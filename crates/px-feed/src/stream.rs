//! Long-lived price stream connection with fixed-backoff reconnect.
//!
//! One `StreamClient` owns one connection to the price-event endpoint. Each
//! decoded event is forwarded to the [`PriceCache`] exactly once; malformed
//! events are dropped silently. On any connection error or clean end of
//! stream the client sleeps a fixed delay and reconnects, forever, until
//! explicitly stopped. The loop structure guarantees at most one pending
//! reconnect timer at any time.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use px_core::price_cache::PriceCache;
use px_core::time_util;

use crate::decode;

/// Connection lifecycle state, observable via [`StreamClient::state_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
}

impl ConnState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::ReconnectPending => "reconnect_pending",
        }
    }
}

/// Configuration for the stream connection.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Text-event endpoint URL.
    pub url: String,
    /// Fixed delay between reconnect attempts.
    pub reconnect_delay: Duration,
}

/// A price stream connection managed by a background tokio task.
pub struct StreamClient {
    config: StreamConfig,
    state_tx: watch::Sender<ConnState>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl StreamClient {
    /// Create a new (not yet started) client.
    pub fn new(config: StreamConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnState::Disconnected);
        Self { config, state_tx, shutdown_tx: None, task: None }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnState {
        *self.state_tx.borrow()
    }

    /// Watch channel for state transitions.
    pub fn state_watch(&self) -> watch::Receiver<ConnState> {
        self.state_tx.subscribe()
    }

    /// Start the connection task, publishing decoded events into `cache`.
    pub fn start(&mut self, cache: Arc<PriceCache>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();
        let state_tx = self.state_tx.clone();

        let task = tokio::spawn(async move {
            connection_loop(config, cache, state_tx, shutdown_rx).await;
        });

        self.shutdown_tx = Some(shutdown_tx);
        self.task = Some(task);
    }

    /// Stop the connection, cancel any pending reconnect, and wait for the
    /// task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Main connection loop — connects, reads events, forwards, reconnects.
async fn connection_loop(
    config: StreamConfig,
    cache: Arc<PriceCache>,
    state_tx: watch::Sender<ConnState>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let http = reqwest::Client::new();

    loop {
        // Check shutdown before connecting
        if *shutdown_rx.borrow() {
            state_tx.send_replace(ConnState::Disconnected);
            info!("[stream] shutdown requested");
            return;
        }

        state_tx.send_replace(ConnState::Connecting);
        info!("[stream] connecting to {}", config.url);

        let resp = http
            .get(&config.url)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match resp {
            Ok(resp) => {
                state_tx.send_replace(ConnState::Connected);
                info!("[stream] connected");

                let mut body = resp.bytes_stream();
                let mut buf = String::new();

                loop {
                    tokio::select! {
                        _ = shutdown_rx.changed() => {
                            state_tx.send_replace(ConnState::Disconnected);
                            info!("[stream] shutdown signal received");
                            return;
                        }

                        chunk = body.next() => match chunk {
                            Some(Ok(bytes)) => {
                                buf.push_str(&String::from_utf8_lossy(&bytes));
                                forward_events(&mut buf, &cache);
                            }
                            Some(Err(e)) => {
                                error!("[stream] read error: {e}");
                                break;
                            }
                            None => {
                                warn!("[stream] stream ended");
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                error!("[stream] connection failed: {e}");
            }
        }

        // Disconnected — single fixed-delay timer, then retry at the top.
        state_tx.send_replace(ConnState::ReconnectPending);
        warn!("[stream] reconnecting in {:?}", config.reconnect_delay);
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_delay) => {}
            _ = shutdown_rx.changed() => {
                state_tx.send_replace(ConnState::Disconnected);
                return;
            }
        }
    }
}

/// Decode buffered events and publish each to the cache exactly once.
fn forward_events(buf: &mut String, cache: &PriceCache) {
    for payload in decode::drain_events(buf) {
        match decode::parse_price_event(&payload) {
            Some(prices) if !prices.is_empty() => {
                cache.set_many(&prices, time_util::now_ms());
            }
            _ => debug!("[stream] dropping malformed event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_publishes_once_per_event() {
        let cache = PriceCache::new();
        let mut buf = String::from(
            "data: {\"prices\":{\"BTC-USD\":97000}}\n\ndata: garbage\n\ndata: {\"prices\":{\"BTC-USD\":97500}}\n\n",
        );
        forward_events(&mut buf, &cache);
        assert_eq!(cache.get("BTC-USD"), Some(97_500.0));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn stop_without_start_is_harmless() {
        let mut client = StreamClient::new(StreamConfig {
            url: "http://127.0.0.1:1/stream".to_string(),
            reconnect_delay: Duration::from_millis(10),
        });
        assert_eq!(client.state(), ConnState::Disconnected);
        client.stop().await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_keeps_retrying_until_stopped() {
        let mut client = StreamClient::new(StreamConfig {
            // Port 1 refuses connections immediately.
            url: "http://127.0.0.1:1/stream".to_string(),
            reconnect_delay: Duration::from_millis(5),
        });
        let cache = Arc::new(PriceCache::new());
        client.start(cache);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_ne!(client.state(), ConnState::Disconnected);

        client.stop().await;
        assert_eq!(client.state(), ConnState::Disconnected);
    }
}
