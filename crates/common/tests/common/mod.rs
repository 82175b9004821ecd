//! Shared harness for upload and gateway integration tests
#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use common::bulletin::UploadOptions;
use common::crypto::{derive_signer, AccountId, DEV_PHRASE};
use common::ledger::MemoryLedger;
use common::linked_data::ContentId;
use tokio::net::TcpListener;

pub const MEMORY_ENDPOINT: &str = "memory://local";

/// Route test logs through the test writer. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("common=debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn account(path: &str) -> AccountId {
    derive_signer(DEV_PHRASE, path).unwrap().account_id()
}

/// Serve `GET /ipfs/{cid}` from whatever has been stored in `ledger`.
/// Returns the gateway base url, with its trailing slash.
pub async fn spawn_gateway(ledger: MemoryLedger) -> String {
    let app = Router::new()
        .route("/ipfs/:cid", get(serve_content))
        .with_state(ledger);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/ipfs/")
}

async fn serve_content(
    State(ledger): State<MemoryLedger>,
    Path(cid): Path<String>,
) -> Response {
    let Ok(cid) = cid.parse::<ContentId>() else {
        return (StatusCode::BAD_REQUEST, "invalid cid").into_response();
    };
    match ledger.content(&cid) {
        Some(bytes) => bytes.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A ledger with a gateway in front of it, and options that point at both.
/// `//Alice` is the sudo key and has quota for direct stores.
pub async fn setup_test_env() -> (MemoryLedger, UploadOptions) {
    init_tracing();
    let ledger = MemoryLedger::new();
    ledger.authorize(account("//Alice"), 100, 1024 * 1024);
    let gateway = spawn_gateway(ledger.clone()).await;
    let opts = UploadOptions::new(MEMORY_ENDPOINT, gateway);
    (ledger, opts)
}
