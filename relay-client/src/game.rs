use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relay_core::{FixedDelay, GameView, ReconnectPolicy};
use relay_types::{BrowserId, ConnectMessage, ConnectionState, SubmitWordMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::ClientError;
use crate::stomp::{Command, Frame, Heartbeat, StompError};
use crate::task::{stop, wait_for_shutdown};

pub const WELCOME_DESTINATION: &str = "/user/queue/welcome";
pub const BROADCAST_DESTINATION: &str = "/topic/messages";
pub const ERRORS_DESTINATION: &str = "/user/queue/errors";
pub const CONNECT_DESTINATION: &str = "/app/game.connect";
pub const WORD_DESTINATION: &str = "/app/game.word";

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Subscription ids paired with their destinations, in subscribe order.
pub const SUBSCRIPTIONS: [(&str, &str); 3] = [
    ("sub-0", WELCOME_DESTINATION),
    ("sub-1", BROADCAST_DESTINATION),
    ("sub-2", ERRORS_DESTINATION),
];

#[derive(Debug)]
pub enum Incoming {
    Frame(Frame),
    Heartbeat,
    Closed,
}

/// A connected, frame-oriented duplex to the game server.
#[async_trait]
pub trait FrameChannel: Send {
    async fn send(&mut self, frame: &Frame) -> Result<(), ClientError>;
    async fn send_heartbeat(&mut self) -> Result<(), ClientError>;
    async fn recv(&mut self) -> Result<Incoming, ClientError>;
    async fn close(&mut self);
}

#[async_trait]
pub trait GameTransport: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn FrameChannel>, ClientError>;
}

/// STOMP frames carried one per WebSocket text message.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl GameTransport for WebSocketTransport {
    async fn connect(&self) -> Result<Box<dyn FrameChannel>, ClientError> {
        let (socket, _response) = connect_async(self.url.as_str()).await?;
        debug!("WebSocket open to {}", self.url);
        Ok(Box::new(WebSocketChannel { socket }))
    }
}

struct WebSocketChannel {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WebSocketChannel {
    fn decode(payload: &str) -> Result<Incoming, ClientError> {
        Ok(match Frame::decode(payload)? {
            Some(frame) => Incoming::Frame(frame),
            None => Incoming::Heartbeat,
        })
    }

    fn decode_binary(payload: &[u8]) -> Result<Incoming, ClientError> {
        let text = std::str::from_utf8(payload).map_err(|_| StompError::NotUtf8)?;
        Self::decode(text)
    }
}

#[async_trait]
impl FrameChannel for WebSocketChannel {
    async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        self.socket.send(Message::text(frame.encode())).await?;
        Ok(())
    }

    async fn send_heartbeat(&mut self) -> Result<(), ClientError> {
        self.socket.send(Message::text(String::from("\n"))).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Incoming, ClientError> {
        loop {
            match self.socket.next().await {
                None | Some(Ok(Message::Close(_))) => return Ok(Incoming::Closed),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Text(text))) => return Self::decode(text.as_str()),
                Some(Ok(Message::Binary(bytes))) => return Self::decode_binary(&bytes),
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.socket.close(None).await {
            debug!("WebSocket close failed: {}", e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameClientOptions {
    /// Value of the CONNECT `host` header.
    pub host: String,
    pub heartbeat: Duration,
    pub reconnect_delay: Duration,
    pub chain_capacity: usize,
    pub log_capacity: usize,
}

impl GameClientOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            host: host_of(&config.game_socket_url),
            heartbeat: config.stomp_heartbeat,
            reconnect_delay: config.game_reconnect_delay,
            ..Self::default()
        }
    }
}

impl Default for GameClientOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            heartbeat: Duration::from_millis(4000),
            reconnect_delay: FixedDelay::DEFAULT_DELAY,
            chain_capacity: relay_core::DEFAULT_CHAIN_CAPACITY,
            log_capacity: relay_core::DEFAULT_LOG_CAPACITY,
        }
    }
}

fn host_of(url: &str) -> String {
    url.parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(str::to_string))
        .unwrap_or_else(|| "localhost".to_string())
}

#[derive(Debug)]
enum GameCommand {
    Submit(String),
}

/// Handle to the task that owns the game connection.
pub struct GameClient {
    state: watch::Receiver<GameView>,
    commands: mpsc::UnboundedSender<GameCommand>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl GameClient {
    pub fn spawn<T: GameTransport>(transport: T, browser_id: BrowserId, options: GameClientOptions) -> Self {
        let view = GameView::with_limits(options.chain_capacity, options.log_capacity);
        let (state_tx, state_rx) = watch::channel(view);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let driver = GameDriver {
            transport,
            browser_id,
            policy: FixedDelay::new(options.reconnect_delay),
            options,
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

    pub fn subscribe(&self) -> watch::Receiver<GameView> {
        self.state.clone()
    }

    pub fn snapshot(&self) -> GameView {
        self.state.borrow().clone()
    }

    /// Queue a word for submission. Returns `false` when the trimmed input
    /// is empty and nothing was queued.
    pub fn submit_word(&self, input: &str) -> bool {
        let word = input.trim();
        if word.is_empty() {
            return false;
        }
        self.commands.send(GameCommand::Submit(word.to_string())).is_ok()
    }

    /// Send DISCONNECT, close the socket and cancel pending timers. No state
    /// is written once this returns.
    pub async fn shutdown(mut self) {
        stop(&self.shutdown, self.task.take(), "game").await;
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Session {
    channel: Box<dyn FrameChannel>,
    id: String,
    heartbeat: Heartbeat,
}

enum SessionEnd {
    Shutdown,
    Failed(ClientError),
}

struct GameDriver<T> {
    transport: T,
    browser_id: BrowserId,
    options: GameClientOptions,
    policy: FixedDelay,
    state: watch::Sender<GameView>,
    commands: mpsc::UnboundedReceiver<GameCommand>,
    shutdown: watch::Receiver<bool>,
}

impl<T: GameTransport> GameDriver<T> {
    async fn run(mut self) {
        loop {
            self.state
                .send_modify(|view| view.set_connection(ConnectionState::Connecting));

            let attempt = {
                let connecting = handshake(&self.transport, &self.browser_id, &self.options);
                tokio::pin!(connecting);
                loop {
                    tokio::select! {
                        _ = wait_for_shutdown(&mut self.shutdown) => return,
                        Some(command) = self.commands.recv() => reject_offline(&self.state, command),
                        result = &mut connecting => break result,
                    }
                }
            };

            match attempt {
                Ok(session) => {
                    self.policy.on_open();
                    info!("Game stream connected (session {:?})", session.id);
                    self.state
                        .send_modify(|view| view.set_connection(ConnectionState::Connected));

                    match self.serve(session).await {
                        SessionEnd::Shutdown => return,
                        SessionEnd::Failed(e) => self.report_failure(e),
                    }
                }
                Err(e) => self.report_failure(e),
            }

            if !self.wait_before_retry().await {
                return;
            }
        }
    }

    fn report_failure(&self, error: ClientError) {
        match error {
            ClientError::Protocol(message) => {
                warn!("Game server reported an error: {}", message);
                self.state
                    .send_modify(|view| view.on_protocol_error(Some(&message)));
            }
            other => {
                warn!("Game stream lost: {}", other);
                self.state.send_modify(GameView::on_connection_lost);
            }
        }
    }

    /// Returns `false` when the task should exit.
    async fn wait_before_retry(&mut self) -> bool {
        let delay = self
            .policy
            .next_delay()
            .unwrap_or(self.options.reconnect_delay);
        info!(
            "Reconnecting game stream in {:?} (attempt {})",
            delay,
            self.policy.attempts()
        );
        self.state
            .send_modify(|view| view.set_connection(ConnectionState::ErrorBackoff));

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => return false,
                Some(command) = self.commands.recv() => reject_offline(&self.state, command),
                _ = &mut sleep => return true,
            }
        }
    }

    async fn serve(&mut self, mut session: Session) -> SessionEnd {
        let end = self.pump(&mut session).await;
        if let SessionEnd::Failed(_) = &end {
            close_channel(session.channel.as_mut()).await;
        }
        end
    }

    async fn pump(&mut self, session: &mut Session) -> SessionEnd {
        let mut heartbeat = session.heartbeat.outgoing.map(|every| {
            let mut interval = tokio::time::interval_at(Instant::now() + every, every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let silence_limit = session.heartbeat.incoming.map(|every| every * 2);
        let mut last_heard = Instant::now();

        loop {
            let deadline = silence_limit.map(|limit| last_heard + limit);
            tokio::select! {
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    debug!("Disconnecting game stream");
                    if let Err(e) = session.channel.send(&Frame::disconnect()).await {
                        debug!("DISCONNECT not delivered: {}", e);
                    }
                    close_channel(session.channel.as_mut()).await;
                    return SessionEnd::Shutdown;
                }
                Some(GameCommand::Submit(word)) = self.commands.recv() => {
                    if let Err(e) = self.submit(session, &word).await {
                        return SessionEnd::Failed(e);
                    }
                }
                _ = next_tick(&mut heartbeat) => {
                    if let Err(e) = session.channel.send_heartbeat().await {
                        return SessionEnd::Failed(e);
                    }
                }
                _ = sleep_until(deadline) => {
                    return SessionEnd::Failed(ClientError::HeartbeatTimeout(
                        silence_limit.unwrap_or_default(),
                    ));
                }
                incoming = session.channel.recv() => match incoming {
                    Ok(Incoming::Heartbeat) => last_heard = Instant::now(),
                    Ok(Incoming::Frame(frame)) => {
                        last_heard = Instant::now();
                        if let Some(end) = self.dispatch(frame) {
                            return end;
                        }
                    }
                    Ok(Incoming::Closed) => return SessionEnd::Failed(ClientError::Closed),
                    Err(ClientError::Frame(e)) => {
                        last_heard = Instant::now();
                        warn!("Skipping malformed frame: {}", e);
                    }
                    Err(e) => return SessionEnd::Failed(e),
                },
            }
        }
    }

    async fn submit(&self, session: &mut Session, word: &str) -> Result<(), ClientError> {
        let payload = SubmitWordMessage {
            session_id: session.id.clone(),
            word: word.to_string(),
        };
        session
            .channel
            .send(&Frame::send_json(WORD_DESTINATION, &payload)?)
            .await?;
        self.state.send_modify(|view| view.on_submitted(word));
        Ok(())
    }

    fn dispatch(&self, frame: Frame) -> Option<SessionEnd> {
        match frame.command {
            Command::Message => {
                route_message(&self.state, &frame);
                None
            }
            Command::Error => {
                let message = frame.header("message").unwrap_or("unknown").to_string();
                if !frame.body.is_empty() {
                    debug!("ERROR frame body: {}", frame.body);
                }
                Some(SessionEnd::Failed(ClientError::Protocol(message)))
            }
            Command::Receipt => {
                debug!("Receipt {:?}", frame.header("receipt-id"));
                None
            }
            other => {
                debug!("Ignoring {} frame", other);
                None
            }
        }
    }
}

/// Open the socket and run the STOMP handshake up to the point where the
/// session is ready for submissions. A failed handshake closes the socket.
async fn handshake<T: GameTransport>(
    transport: &T,
    browser_id: &BrowserId,
    options: &GameClientOptions,
) -> Result<Session, ClientError> {
    let mut channel = transport.connect().await?;
    match open_session(channel.as_mut(), browser_id, options).await {
        Ok((id, heartbeat)) => Ok(Session {
            channel,
            id,
            heartbeat,
        }),
        Err(e) => {
            close_channel(channel.as_mut()).await;
            Err(e)
        }
    }
}

async fn open_session(
    channel: &mut dyn FrameChannel,
    browser_id: &BrowserId,
    options: &GameClientOptions,
) -> Result<(String, Heartbeat), ClientError> {
    channel
        .send(&Frame::connect(&options.host, options.heartbeat))
        .await?;

    let connected = loop {
        match channel.recv().await? {
            Incoming::Frame(frame) => break frame,
            Incoming::Heartbeat => continue,
            Incoming::Closed => return Err(ClientError::Closed),
        }
    };
    match connected.command {
        Command::Connected => {}
        Command::Error => {
            let message = connected.header("message").unwrap_or("unknown");
            return Err(ClientError::Protocol(message.to_string()));
        }
        other => return Err(ClientError::UnexpectedFrame(other.to_string())),
    }

    let id = connected.header("session").unwrap_or_default().to_string();
    let heartbeat = Heartbeat::negotiate(options.heartbeat, connected.header("heart-beat"));
    debug!("STOMP session {:?}, heart-beat {:?}", id, heartbeat);

    for (sub_id, destination) in SUBSCRIPTIONS {
        channel.send(&Frame::subscribe(sub_id, destination)).await?;
    }
    let hello = ConnectMessage {
        browser_id: browser_id.clone(),
    };
    channel
        .send(&Frame::send_json(CONNECT_DESTINATION, &hello)?)
        .await?;

    Ok((id, heartbeat))
}

/// Send the close handshake without waiting on an unresponsive peer.
async fn close_channel(channel: &mut dyn FrameChannel) {
    if tokio::time::timeout(CLOSE_TIMEOUT, channel.close()).await.is_err() {
        debug!("WebSocket close timed out after {:?}", CLOSE_TIMEOUT);
    }
}

fn reject_offline(state: &watch::Sender<GameView>, command: GameCommand) {
    match command {
        GameCommand::Submit(word) => {
            debug!("Not connected, dropping submission {:?}", word);
            state.send_modify(GameView::on_offline_submit);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inbox {
    Welcome,
    Broadcast,
    Errors,
}

impl Inbox {
    fn of(frame: &Frame) -> Option<Self> {
        if let Some(subscription) = frame.header("subscription") {
            if let Some(inbox) = Self::from_key(subscription) {
                return Some(inbox);
            }
        }
        frame.header("destination").and_then(Self::from_key)
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "sub-0" | WELCOME_DESTINATION => Some(Inbox::Welcome),
            "sub-1" | BROADCAST_DESTINATION => Some(Inbox::Broadcast),
            "sub-2" | ERRORS_DESTINATION => Some(Inbox::Errors),
            _ => None,
        }
    }
}

fn route_message(state: &watch::Sender<GameView>, frame: &Frame) {
    let body = frame.body.as_str();
    match Inbox::of(frame) {
        Some(Inbox::Welcome) => apply(state, "welcome", |view| view.on_welcome(body)),
        Some(Inbox::Broadcast) => apply(state, "broadcast", |view| view.on_broadcast(body)),
        Some(Inbox::Errors) => {
            info!("Server rejected input: {}", body);
            state.send_modify(|view| view.on_server_error(body));
        }
        None => debug!(
            "Ignoring message for {:?}",
            frame.header("destination").unwrap_or_default()
        ),
    }
}

fn apply<F>(state: &watch::Sender<GameView>, what: &str, update: F)
where
    F: FnOnce(&mut GameView) -> Result<(), serde_json::Error>,
{
    let mut result = Ok(());
    state.send_if_modified(|view| {
        result = update(view);
        result.is_ok()
    });
    if let Err(e) = result {
        warn!("Dropping malformed {} payload: {}", what, e);
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
