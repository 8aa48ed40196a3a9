#![allow(dead_code)]

use atayal_webui::config::{Config, RelayConfig};
use atayal_webui::relay::RelayConvention;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::any,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

/// Requests seen by the stand-in services, in arrival order.
#[derive(Clone, Default)]
pub struct HitLog(Arc<Mutex<Vec<String>>>);

impl HitLog {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub async fn spawn_service(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stand-in service");
    let addr = listener.local_addr().expect("stand-in service address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("stand-in service stopped");
    });
    addr
}

/// A base URL nothing listens on.
pub async fn unreachable_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{}", addr)
}

/// Stand-ins for both relay conventions: `/raw?url=` and `/cors/<target>`.
pub fn relay_router(
    hits: HitLog,
    encoded_reply: (StatusCode, &'static str),
    concat_reply: (StatusCode, &'static str),
) -> Router {
    Router::new()
        .route(
            "/raw",
            any(
                move |State(hits): State<HitLog>, Query(query): Query<HashMap<String, String>>| async move {
                    let target = query.get("url").cloned().unwrap_or_default();
                    hits.record(format!("allorigins {}", target));
                    encoded_reply
                },
            ),
        )
        .route(
            "/cors/{*target}",
            any(
                move |State(hits): State<HitLog>, Path(target): Path<String>| async move {
                    hits.record(format!("cors-anywhere {}", target));
                    concat_reply
                },
            ),
        )
        .with_state(hits)
}

/// Default config with every service under `service_base` and relays under `relay_base`.
pub fn config_for(service_base: &str, relay_base: &str) -> Config {
    let mut config = Config::default();
    config.services.translation_base_url = format!("{}/trans", service_base);
    config.services.asr_base_url = format!("{}/asr", service_base);
    config.services.tts_base_url = format!("{}/tts", service_base);
    config.relays = vec![
        RelayConfig {
            name: "allorigins".to_string(),
            base_url: format!("{}/raw", relay_base),
            convention: RelayConvention::EncodedQuery,
        },
        RelayConfig {
            name: "cors-anywhere".to_string(),
            base_url: format!("{}/cors/", relay_base),
            convention: RelayConvention::Concatenate,
        },
    ];
    config
}
