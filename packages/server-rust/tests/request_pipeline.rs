//! End-to-end checks of the authentication + correlation pipeline.

use std::collections::HashSet;
use std::io;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use argon2::Params;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::FutureExt;
use suivi_core::{AccountRecord, SecretHash};
use suivi_server::auth::AuthenticationLayer;
use suivi_server::correlation::{self, X_FORWARDED_FOR, X_REQUEST_ID};
use suivi_server::{
    Authenticator, CorrelationLayer, CredentialVerifier, InMemoryAccountStore, NetworkConfig,
    NetworkModule, PrincipalResolver,
};
use tower::{ServiceBuilder, ServiceExt};

const USERS: usize = 8;

fn verifier() -> CredentialVerifier {
    CredentialVerifier::with_params(Params::new(8, 1, 1, None).unwrap())
}

fn authenticator() -> Arc<Authenticator> {
    let verifier = verifier();
    let store = InMemoryAccountStore::new();
    for n in 0..USERS {
        store.insert(AccountRecord {
            id: format!("P-{n}"),
            login: format!("user{n}"),
            secret_hash: SecretHash::new(verifier.hash(&format!("secret{n}")).unwrap()),
            role: "AGENT".to_string(),
        });
    }
    let resolver = PrincipalResolver::new(Arc::new(store));
    Arc::new(Authenticator::new(resolver, verifier).unwrap())
}

type Seen = Option<(String, String, String)>;

async fn echo() -> Json<Seen> {
    tokio::task::yield_now().await;
    tracing::info!("handling");
    Json(correlation::current().map(|c| (c.request_id, c.client_ip, c.user_id)))
}

async fn explode() -> &'static str {
    panic!("handler blew up");
}

fn router(authenticator: Arc<Authenticator>) -> Router {
    Router::new()
        .route("/echo", get(echo))
        .route("/explode", get(explode))
        .layer(
            ServiceBuilder::new()
                .layer(AuthenticationLayer::new(authenticator))
                .layer(CorrelationLayer::default()),
        )
}

fn request(path: &str, forwarded: Option<&str>, basic: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(value) = forwarded {
        builder = builder.header(X_FORWARDED_FOR, value);
    }
    if let Some((login, secret)) = basic {
        builder = builder.header(
            header::AUTHORIZATION,
            format!("Basic {}", STANDARD.encode(format!("{login}:{secret}"))),
        );
    }
    let mut req = builder.body(Body::empty()).unwrap();
    req.extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 50_000))));
    req
}

async fn json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_never_share_context() {
    let app = router(authenticator());

    let handles: Vec<_> = (0..64usize)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                let n = i % USERS;
                let ip = format!("10.0.0.{i}");
                let (login, secret) = (format!("user{n}"), format!("secret{n}"));
                let response = app
                    .oneshot(request("/echo", Some(&ip), Some((&login, &secret))))
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                let header = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
                let seen: Seen = serde_json::from_value(json(response).await).unwrap();
                let (request_id, client_ip, user_id) = seen.unwrap();
                assert_eq!(request_id, header);
                assert_eq!(client_ip, ip);
                assert_eq!(user_id, format!("P-{n}"));
                request_id
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 64);
    assert!(correlation::current().is_none());
}

#[tokio::test]
async fn anonymous_request_passes_through() {
    let response = router(authenticator())
        .oneshot(request("/echo", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let seen: Seen = serde_json::from_value(json(response).await).unwrap();
    let (_, client_ip, user_id) = seen.unwrap();
    assert_eq!(client_ip, "127.0.0.1");
    assert_eq!(user_id, "ANONYMOUS");
}

#[tokio::test]
async fn failures_are_indistinguishable() {
    let app = router(authenticator());

    let unknown = app
        .clone()
        .oneshot(request("/echo", None, Some(("nobody", "secret0"))))
        .await
        .unwrap();
    let wrong = app
        .oneshot(request("/echo", None, Some(("user0", "nope"))))
        .await
        .unwrap();

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        unknown.headers().get(header::WWW_AUTHENTICATE),
        wrong.headers().get(header::WWW_AUTHENTICATE)
    );
    assert_eq!(json(unknown).await, json(wrong).await);
}

#[tokio::test]
async fn panicking_handler_leaves_no_context_behind() {
    let app = router(authenticator());

    let outcome = AssertUnwindSafe(app.clone().oneshot(request("/explode", None, None)))
        .catch_unwind()
        .await;
    assert!(outcome.is_err());
    assert!(correlation::current().is_none());

    // The same task keeps serving with fresh contexts.
    let response = app
        .oneshot(request("/echo", Some("198.51.100.7"), None))
        .await
        .unwrap();
    let seen: Seen = serde_json::from_value(json(response).await).unwrap();
    assert_eq!(seen.unwrap().1, "198.51.100.7");
}

#[tokio::test]
async fn server_routes_behind_full_middleware_stack() {
    let module = NetworkModule::new(NetworkConfig::default(), authenticator());
    let response = module
        .build_router()
        .oneshot(request("/api/me", None, Some(("user3", "secret3"))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(X_REQUEST_ID));
    let view = json(response).await;
    assert_eq!(view["id"], "P-3");
    assert_eq!(view["authorities"], serde_json::json!(["ROLE_AGENT"]));
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn log_lines_carry_context_only_while_in_flight() {
    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    // Anonymous so no work leaves this thread for the blocking pool.
    let response = router(authenticator())
        .oneshot(request("/echo", Some("203.0.113.9"), None))
        .await
        .unwrap();
    let request_id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
    let _ = json(response).await;
    tracing::info!("after request");

    let lines = buf.lines();
    let tagged = format!("request_id={request_id}");

    let handling = lines.iter().find(|l| l.contains("handling")).unwrap();
    assert!(handling.contains(&tagged));
    assert!(handling.contains("client_ip=203.0.113.9"));
    assert!(handling.contains("user_id=ANONYMOUS"));

    let received = lines.iter().find(|l| l.contains("request received")).unwrap();
    assert!(received.contains(&tagged));
    assert!(lines.iter().any(|l| l.contains("request completed")));

    let after = lines.iter().find(|l| l.contains("after request")).unwrap();
    assert!(!after.contains(&request_id));
}
