use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response};
use tokio::net::TcpListener;

use identity_status::api::create_router;
use identity_status::memory::MemoryBackend;
use identity_status::types::Address;
use identity_status::{AppState, Config};

pub const CHAIN_ID: i64 = 1;

/// Test client for API calls
pub struct TestClient {
    pub base_url: String,
    pub client: Client,
}

impl TestClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            base_url: format!("http://{}", addr),
            client: Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn put<T: serde::Serialize>(&self, path: &str, body: &T) -> Response {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn put_raw(&self, path: &str, body: &'static str) -> Response {
        self.client
            .put(format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send request")
    }
}

pub fn hermes() -> Address {
    Address::from_bytes([0xee; 20])
}

/// Start a test server backed by in-memory providers
pub async fn start_test_server() -> (TestClient, MemoryBackend) {
    let config = Config {
        host: "127.0.0.1".into(),
        port: 0,
        chain_id: CHAIN_ID,
        hermes_address: hermes(),
        ..Config::default()
    };

    let backend = MemoryBackend::new(config.hermes_address);
    let state = AppState::new(config, backend.collaborators());
    let app = create_router(Arc::clone(&state));

    // Bind to random port
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    (TestClient::new(addr), backend)
}
