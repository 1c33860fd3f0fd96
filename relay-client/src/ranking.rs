use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use relay_core::{ExponentialBackoff, RankingView, ReconnectPolicy};
use relay_types::BrowserId;
use reqwest_eventsource::{Event, RequestBuilderExt, retry::Never};
use std::pin::Pin;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::ClientError;
use crate::task::{stop, wait_for_shutdown};

/// One item of the ranking push channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Open,
    Message { event: String, data: String },
}

pub type PushStream = Pin<Box<dyn Stream<Item = Result<PushEvent, ClientError>> + Send>>;

/// Opens the ranking push channel. The stream ends, or yields an error, when
/// the connection is lost; reconnecting is up to the caller.
#[async_trait]
pub trait RankingTransport: Send + Sync + 'static {
    async fn open(&self, browser_id: &BrowserId) -> Result<PushStream, ClientError>;
}

/// Server-Sent Events over `reqwest`. The library's own retries are turned
/// off so the client's backoff is the only one.
#[derive(Debug, Clone)]
pub struct SseRankingTransport {
    http: reqwest::Client,
    url: String,
}

impl SseRankingTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RankingTransport for SseRankingTransport {
    async fn open(&self, browser_id: &BrowserId) -> Result<PushStream, ClientError> {
        let request = self
            .http
            .get(&self.url)
            .query(&[("browserId", browser_id.as_str())]);

        let mut source = request
            .eventsource()
            .map_err(|e| ClientError::EventStream(e.to_string()))?;
        source.set_retry_policy(Box::new(Never));

        let stream = source.map(|item| match item {
            Ok(Event::Open) => Ok(PushEvent::Open),
            Ok(Event::Message(message)) => Ok(PushEvent::Message {
                event: message.event,
                data: message.data,
            }),
            Err(e) => Err(ClientError::EventStream(describe_sse_error(&e))),
        });
        Ok(Box::pin(stream))
    }
}

fn describe_sse_error(err: &reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, _) => {
            format!("server returned status {}", status)
        }
        reqwest_eventsource::Error::Transport(e) => format!("network error: {}", e),
        other => other.to_string(),
    }
}

#[derive(Debug)]
enum RankingCommand {
    Reconnect,
}

/// Handle to the task that owns the ranking connection.
pub struct RankingClient {
    state: watch::Receiver<RankingView>,
    commands: mpsc::UnboundedSender<RankingCommand>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl RankingClient {
    pub fn spawn<T: RankingTransport>(transport: T, browser_id: BrowserId) -> Self {
        Self::spawn_with_policy(transport, browser_id, ExponentialBackoff::default())
    }

    pub fn spawn_with_policy<T, P>(transport: T, browser_id: BrowserId, policy: P) -> Self
    where
        T: RankingTransport,
        P: ReconnectPolicy + 'static,
    {
        let (state_tx, state_rx) = watch::channel(RankingView::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = RankingDriver {
            transport,
            browser_id,
            policy,
            state: state_tx,
            commands: command_rx,
            shutdown: shutdown_rx,
        };

        Self {
            state: state_rx,
            commands: command_tx,
            shutdown: shutdown_tx,
            task: Some(tokio::spawn(driver.run())),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RankingView> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> RankingView {
        self.state.borrow().clone()
    }

    /// Drop the current connection (if any), reset the retry budget and
    /// connect again right away.
    pub fn reconnect(&self) {
        let _ = self.commands.send(RankingCommand::Reconnect);
    }

    /// Close the stream and cancel any pending retry. No state is written
    /// once this returns.
    pub async fn shutdown(mut self) {
        stop(&self.shutdown, self.task.take(), "ranking").await;
    }
}

impl Drop for RankingClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

enum StreamEnd {
    Shutdown,
    Reconnect,
    Failed(ClientError),
}

struct RankingDriver<T, P> {
    transport: T,
    browser_id: BrowserId,
    policy: P,
    state: watch::Sender<RankingView>,
    commands: mpsc::UnboundedReceiver<RankingCommand>,
    shutdown: watch::Receiver<bool>,
}

impl<T: RankingTransport, P: ReconnectPolicy> RankingDriver<T, P> {
    async fn run(mut self) {
        loop {
            self.state.send_modify(RankingView::on_connecting);
            debug!("Opening ranking stream");

            let opened = tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => return,
                Some(RankingCommand::Reconnect) = self.commands.recv() => {
                    self.policy.reset();
                    continue;
                }
                result = self.transport.open(&self.browser_id) => result,
            };

            let end = match opened {
                Ok(stream) => self.pump(stream).await,
                Err(e) => StreamEnd::Failed(e),
            };

            match end {
                StreamEnd::Shutdown => return,
                StreamEnd::Reconnect => {
                    info!("Manual ranking reconnect requested");
                    self.policy.reset();
                    continue;
                }
                StreamEnd::Failed(e) => {
                    warn!("Ranking stream error: {}", e);
                    self.state.send_modify(RankingView::on_transport_error);
                }
            }

            if !self.wait_before_retry().await {
                return;
            }
        }
    }

    /// Returns `false` when the task should exit.
    async fn wait_before_retry(&mut self) -> bool {
        match self.policy.next_delay() {
            Some(delay) => {
                let attempt = self.policy.attempts();
                info!("Reconnecting ranking stream in {:?} (attempt {})", delay, attempt);
                self.state.send_modify(|view| view.on_backoff(attempt, delay));

                tokio::select! {
                    _ = wait_for_shutdown(&mut self.shutdown) => false,
                    Some(RankingCommand::Reconnect) = self.commands.recv() => {
                        self.policy.reset();
                        true
                    }
                    _ = tokio::time::sleep(delay) => true,
                }
            }
            None => {
                warn!("Ranking stream gave up after {} attempts", self.policy.attempts());
                self.state.send_modify(RankingView::on_exhausted);

                tokio::select! {
                    _ = wait_for_shutdown(&mut self.shutdown) => false,
                    command = self.commands.recv() => match command {
                        Some(RankingCommand::Reconnect) => {
                            info!("Manual ranking reconnect requested");
                            self.policy.reset();
                            true
                        }
                        None => false,
                    },
                }
            }
        }
    }

    async fn pump(&mut self, mut stream: PushStream) -> StreamEnd {
        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => return StreamEnd::Shutdown,
                Some(RankingCommand::Reconnect) = self.commands.recv() => return StreamEnd::Reconnect,
                item = stream.next() => match item {
                    Some(Ok(PushEvent::Open)) => {
                        info!("Ranking stream connected");
                        self.policy.on_open();
                        self.state.send_modify(RankingView::on_open);
                    }
                    Some(Ok(PushEvent::Message { event, data })) => self.handle_event(&event, &data),
                    Some(Err(e)) => return StreamEnd::Failed(e),
                    None => return StreamEnd::Failed(ClientError::Closed),
                },
            }
        }
    }

    fn handle_event(&self, event: &str, data: &str) {
        match event {
            "rankings" => {
                let mut result = Ok(());
                self.state.send_if_modified(|view| {
                    result = view.on_rankings(data);
                    result.is_ok()
                });
                if let Err(e) = result {
                    warn!("Dropping malformed rankings payload: {}", e);
                }
            }
            "score" => {
                let mut result = Ok(());
                self.state.send_if_modified(|view| {
                    result = view.on_score(data);
                    result.is_ok()
                });
                if let Err(e) = result {
                    warn!("Dropping malformed score payload: {}", e);
                }
            }
            "connect" => debug!("Ranking stream acknowledged: {}", data),
            "heartbeat" => trace!("Ranking stream heartbeat"),
            other => debug!("Ignoring ranking stream event {:?}: {}", other, data),
        }
    }
}
