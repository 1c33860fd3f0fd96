use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use warp::Filter;
use warp::http::StatusCode;

use crate::presence::PresenceRegistry;

pub mod config;
pub mod presence;

#[derive(Debug, Default, Deserialize)]
pub struct PresenceQuery {
    #[serde(rename = "clientId")]
    pub client_id: Option<String>,
}

impl PresenceQuery {
    fn client_id(&self) -> Option<&str> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

pub fn create_routes(
    registry: Arc<PresenceRegistry>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let registry_filter = warp::any().map(move || registry.clone());

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let count = warp::path!("presence")
        .and(warp::get())
        .and(registry_filter.clone())
        .map(|registry: Arc<PresenceRegistry>| warp::reply::json(&registry.count()));

    let increment = warp::path!("presence" / "increment")
        .and(warp::post())
        .and(warp::query::<PresenceQuery>())
        .and(registry_filter.clone())
        .map(|query: PresenceQuery, registry: Arc<PresenceRegistry>| {
            if query.client_id().is_none() {
                tracing::debug!("Presence increment without clientId uses the legacy counter");
            }
            warp::reply::json(&registry.increment(query.client_id()))
        });

    let decrement = warp::path!("presence" / "decrement")
        .and(warp::post())
        .and(warp::query::<PresenceQuery>())
        .and(registry_filter.clone())
        .map(|query: PresenceQuery, registry: Arc<PresenceRegistry>| {
            warp::reply::json(&registry.decrement(query.client_id()))
        });

    let heartbeat = warp::path!("presence" / "heartbeat")
        .and(warp::post())
        .and(warp::query::<PresenceQuery>())
        .and(registry_filter)
        .map(|query: PresenceQuery, registry: Arc<PresenceRegistry>| {
            match query.client_id() {
                Some(id) => warp::reply::with_status(
                    warp::reply::json(&registry.heartbeat(id)),
                    StatusCode::OK,
                ),
                None => warp::reply::with_status(
                    warp::reply::json(&serde_json::json!({
                        "error": "heartbeat requires a clientId"
                    })),
                    StatusCode::BAD_REQUEST,
                ),
            }
        });

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    health
        .or(count)
        .or(increment)
        .or(decrement)
        .or(heartbeat)
        .with(cors)
        .with(warp::log("word_relay"))
}

/// Periodically drop expired leases so the table doesn't grow with every
/// client that ever connected.
pub fn spawn_lease_sweeper(registry: Arc<PresenceRegistry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        // `interval` panics on a zero period.
        let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
        loop {
            interval.tick().await;
            registry.sweep_expired();
        }
    })
}
