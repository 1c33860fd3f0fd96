use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relay_client::terminal::Renderer;
use relay_client::{
    BrowserIdentity, Config, FileStore, GameClient, GameClientOptions, HttpPresenceApi,
    PresenceTracker, RankingClient, SseRankingTransport, WebSocketTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting word relay client...");

    let config = Config::from_env().context("invalid client configuration")?;

    let identity = match &config.browser_id_path {
        Some(path) => {
            info!("Browser id stored at {}", path.display());
            BrowserIdentity::new(Arc::new(FileStore::new(path)))
        }
        None => {
            warn!("No data directory available; using a temporary browser id");
            BrowserIdentity::ephemeral()
        }
    };
    let browser_id = identity.get();

    let game = GameClient::spawn(
        WebSocketTransport::new(&config.game_socket_url),
        browser_id.clone(),
        GameClientOptions::from_config(&config),
    );
    let rankings = RankingClient::spawn(
        SseRankingTransport::new(&config.ranking_stream_url),
        browser_id.clone(),
    );
    let presence = PresenceTracker::spawn(
        HttpPresenceApi::new(&config.presence_url),
        Some(browser_id),
        config.presence_poll_interval,
    );

    let mut game_rx = game.subscribe();
    let mut ranking_rx = rankings.subscribe();
    let mut count_rx = presence.subscribe();
    let mut renderer = Renderer::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Type a word and press enter. /reconnect retries the ranking stream.");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim() == "/reconnect" => rankings.reconnect(),
                Ok(Some(line)) => {
                    game.submit_word(&line);
                }
                Ok(None) => {
                    info!("Input closed, shutting down...");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            },
            Ok(()) = game_rx.changed() => {
                let output = renderer.game_lines(&game_rx.borrow_and_update());
                for line in output {
                    println!("{}", line);
                }
            }
            Ok(()) = ranking_rx.changed() => {
                let output = renderer.ranking_lines(&ranking_rx.borrow_and_update());
                for line in output {
                    println!("{}", line);
                }
            }
            Ok(()) = count_rx.changed() => {
                let count = *count_rx.borrow_and_update();
                println!("{}", Renderer::presence_line(count));
            }
        }
    }

    game.shutdown().await;
    rankings.shutdown().await;
    presence.shutdown().await;
    info!("Client shutdown complete.");
    Ok(())
}
