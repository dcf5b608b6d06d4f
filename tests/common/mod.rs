//! Shared utilities for integration tests.

use std::net::SocketAddr;

use serde_json::Value;
use storefront_relay::{HttpServer, RelayConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A relay serving on an ephemeral local port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl RunningRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST a JSON body and return the status with the parsed body.
    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("relay unreachable");
        let status = response.status().as_u16();
        let body = response.json().await.expect("relay returned non-JSON body");
        (status, body)
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Config whose store domains are reached over plain HTTP, for wiremock.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.scheme = "http".into();
    config
}

/// Start the relay with `config` and wait until it accepts connections.
pub async fn start_relay(config: RelayConfig) -> RunningRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    let server = HttpServer::new(config).expect("failed to build relay");
    tokio::spawn(async move {
        let _ = server
            .run_until(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    RunningRelay {
        addr,
        client,
        shutdown: Some(tx),
    }
}
