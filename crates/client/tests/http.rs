//! Drives the reqwest transport against a local axum server.

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::get,
};
use client::{
    Client, ClientError, Credential, CredentialStore, MemoryCredentialStore, ReqwestTransport,
    TransportError,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct Seen {
    auth: Arc<Mutex<Vec<Option<String>>>>,
    query: Arc<Mutex<Vec<Vec<(String, String)>>>>,
}

async fn transactions(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Json<Value> {
    seen.auth.lock().unwrap().push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    seen.query.lock().unwrap().push(query);
    Json(json!({"total_income": 5000, "total_expenses": 3000}))
}

async fn predictions() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"detail": "model offline"})),
    )
}

async fn serve(seen: Seen) -> String {
    let app = Router::new()
        .route("/api/transactions/", get(transactions))
        .route("/api/financial-metrics/predictions/", get(predictions))
        .with_state(seen);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

#[tokio::test]
async fn bearer_token_reaches_the_server() {
    let seen = Seen::default();
    let base_url = serve(seen.clone()).await;
    let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
        "wire-token",
    )));
    let client = Client::new(ReqwestTransport::new(&base_url).unwrap(), store.clone());

    let summary = client.monthly_summary().await.unwrap();
    assert_eq!(summary.total_income, 5000.0);

    store.clear().await.unwrap();
    client.monthly_summary().await.unwrap();

    let auth = seen.auth.lock().unwrap().clone();
    assert_eq!(auth, vec![Some("Bearer wire-token".to_string()), None]);
    let query = seen.query.lock().unwrap().clone();
    assert_eq!(query[0], vec![("period".to_string(), "monthly".to_string())]);
}

#[tokio::test]
async fn server_error_body_is_surfaced() {
    let base_url = serve(Seen::default()).await;
    let client = Client::new(
        ReqwestTransport::new(&base_url).unwrap(),
        MemoryCredentialStore::new(),
    );

    let err = client.predictions().await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.body().unwrap()["detail"], "model offline");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind and immediately drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new(
        ReqwestTransport::new(&format!("http://{addr}/api")).unwrap(),
        MemoryCredentialStore::new(),
    );
    let err = client.categories().await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Unreachable(_))));
}
