use async_trait::async_trait;
use relay_types::BrowserId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::task::{stop, wait_for_shutdown};

/// Upper bound on a single presence request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote "current users" counter. Every call answers with the count after
/// the call took effect.
#[async_trait]
pub trait PresenceApi: Send + Sync + 'static {
    async fn get(&self) -> Result<u64, ClientError>;
    async fn increment(&self, client: Option<&BrowserId>) -> Result<u64, ClientError>;
    async fn decrement(&self, client: Option<&BrowserId>) -> Result<u64, ClientError>;
    /// Renew the lease held by `client`.
    async fn heartbeat(&self, client: &BrowserId) -> Result<u64, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpPresenceApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPresenceApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, action: &str, client: Option<&BrowserId>) -> Result<u64, ClientError> {
        let mut request = self
            .http
            .post(format!("{}/{}", self.base_url, action))
            .timeout(REQUEST_TIMEOUT);
        if let Some(client) = client {
            request = request.query(&[("clientId", client.as_str())]);
        }
        let count = request.send().await?.error_for_status()?.json().await?;
        Ok(count)
    }
}

#[async_trait]
impl PresenceApi for HttpPresenceApi {
    async fn get(&self) -> Result<u64, ClientError> {
        let count = self
            .http
            .get(&self.base_url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(count)
    }

    async fn increment(&self, client: Option<&BrowserId>) -> Result<u64, ClientError> {
        self.post("increment", client).await
    }

    async fn decrement(&self, client: Option<&BrowserId>) -> Result<u64, ClientError> {
        self.post("decrement", client).await
    }

    async fn heartbeat(&self, client: &BrowserId) -> Result<u64, ClientError> {
        self.post("heartbeat", Some(client)).await
    }
}

/// Registers this client as present for as long as it runs and keeps the
/// latest count.
pub struct PresenceTracker {
    count: watch::Receiver<u64>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PresenceTracker {
    pub fn spawn<A: PresenceApi>(api: A, client: Option<BrowserId>, poll_interval: Duration) -> Self {
        Self::spawn_shared(Arc::new(api), client, poll_interval)
    }

    pub fn spawn_shared(
        api: Arc<dyn PresenceApi>,
        client: Option<BrowserId>,
        poll_interval: Duration,
    ) -> Self {
        let (count_tx, count_rx) = watch::channel(0);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = PresenceDriver {
            api,
            client,
            poll_interval,
            count: count_tx,
            shutdown: shutdown_rx,
        };

        Self {
            count: count_rx,
            shutdown: shutdown_tx,
            task: Some(tokio::spawn(driver.run())),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.count.clone()
    }

    pub fn current(&self) -> u64 {
        *self.count.borrow()
    }

    /// Deregister and wait for the decrement to finish.
    pub async fn shutdown(mut self) {
        stop(&self.shutdown, self.task.take(), "presence").await;
    }
}

impl Drop for PresenceTracker {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct PresenceDriver {
    api: Arc<dyn PresenceApi>,
    client: Option<BrowserId>,
    poll_interval: Duration,
    count: watch::Sender<u64>,
    shutdown: watch::Receiver<bool>,
}

impl PresenceDriver {
    async fn run(mut self) {
        tokio::select! {
            _ = wait_for_shutdown(&mut self.shutdown) => return,
            result = self.api.increment(self.client.as_ref()) => self.record("increment", result),
        }

        if self.client.is_none() {
            info!("Presence registered without a client id (legacy counter)");
        }

        // `interval` panics on a zero period.
        let period = self.poll_interval.max(Duration::from_millis(1));
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => break,
                _ = poll.tick() => {
                    let api = self.api.clone();
                    let client = self.client.clone();
                    let request = async move {
                        match &client {
                            Some(client) => api.heartbeat(client).await,
                            None => api.get().await,
                        }
                    };
                    tokio::select! {
                        _ = wait_for_shutdown(&mut self.shutdown) => break,
                        result = request => self.record("poll", result),
                    }
                }
            }
        }

        // `shutdown()` joins this task.
        match tokio::time::timeout(REQUEST_TIMEOUT, self.api.decrement(self.client.as_ref())).await {
            Ok(result) => self.record("decrement", result),
            Err(_) => warn!("Presence decrement timed out; the lease will expire on its own"),
        }
    }

    fn record(&self, action: &str, result: Result<u64, ClientError>) {
        match result {
            Ok(count) => {
                debug!("Presence {} -> {}", action, count);
                self.count.send_replace(count);
            }
            Err(e) => warn!("Presence {} failed, keeping last count: {}", action, e),
        }
    }
}
