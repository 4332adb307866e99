use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, calculations, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(calculations::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(b) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn register(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/register",
            None,
            Some(json!({"email": email, "username": email, "password": "testpass123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = build_app(AppState::fake());
        let token = register(&app, "user@example.com").await;
        assert!(!token.is_empty());

        let (status, body) = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({"username": "user@example.com", "password": "testpass123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["token_type"], "bearer");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_app(AppState::fake());
        register(&app, "dup@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/register",
            None,
            Some(json!({
                "email": "dup@example.com",
                "username": "dup@example.com",
                "password": "anotherpass1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "Email already registered");
    }

    #[tokio::test]
    async fn login_with_wrong_password() {
        let app = build_app(AppState::fake());
        register(&app, "user@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({"username": "user@example.com", "password": "wrongpass456"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid credentials");
    }

    #[tokio::test]
    async fn create_calculation_normalizes_type() {
        let app = build_app(AppState::fake());
        let token = register(&app, "calc@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(token.as_str()),
            Some(json!({"a": 10, "b": 5, "type": "add"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].is_string());
        assert_eq!(body["result"], 15.0);
        assert_eq!(body["type"], "ADD");
    }

    #[tokio::test]
    async fn every_operation_returns_exact_result() {
        let app = build_app(AppState::fake());
        let token = register(&app, "ops@example.com").await;
        for (kind, a, b, expected, canonical) in [
            ("add", 5.0, 3.0, 8.0, "ADD"),
            ("Sub", 10.0, 4.0, 6.0, "SUB"),
            ("MUL", 2.0, 7.0, 14.0, "MUL"),
            ("div", 20.0, 4.0, 5.0, "DIV"),
        ] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/calculations",
                Some(token.as_str()),
                Some(json!({"a": a, "b": b, "type": kind})),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{kind}: {body}");
            assert_eq!(body["result"], expected);
            assert_eq!(body["type"], canonical);
        }
    }

    #[tokio::test]
    async fn missing_token_is_not_authenticated_regardless_of_payload() {
        let app = build_app(AppState::fake());
        for payload in [
            json!({"a": 10, "b": 5, "type": "add"}),
            json!({"a": 10, "b": 5, "type": "invalid_op"}),
            json!({"nonsense": true}),
        ] {
            let (status, body) =
                send(&app, Method::POST, "/calculations", None, Some(payload)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["detail"], "Not authenticated");
        }
    }

    #[tokio::test]
    async fn invalid_token_is_not_authenticated() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/calculations",
            Some("forged.token.value"),
            Some(json!({"a": 1, "b": 2, "type": "invalid_op"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn unrecognized_type_is_unprocessable() {
        let app = build_app(AppState::fake());
        let token = register(&app, "bad@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(token.as_str()),
            Some(json!({"a": 5, "b": 3, "type": "invalid_op"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let detail = body["detail"].as_array().unwrap();
        assert!(!detail.is_empty());
        assert_eq!(detail[0]["loc"], json!(["body", "type"]));
    }

    #[tokio::test]
    async fn malformed_body_is_unprocessable() {
        let app = build_app(AppState::fake());
        let token = register(&app, "json@example.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(token.as_str()),
            Some(json!([1, 2])),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!body["detail"].as_array().unwrap().is_empty());

        let (status, _) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(token.as_str()),
            Some(json!({"a": "x", "b": 1, "type": "add"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn division_by_zero_is_bad_request() {
        let app = build_app(AppState::fake());
        let token = register(&app, "zero@example.com").await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(token.as_str()),
            Some(json!({"a": 5, "b": 0, "type": "div"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Division by zero");
    }

    #[tokio::test]
    async fn identical_requests_create_distinct_records() {
        let app = build_app(AppState::fake());
        let token = register(&app, "twice@example.com").await;
        let payload = json!({"a": 10, "b": 5, "type": "add"});

        let (_, first) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(token.as_str()),
            Some(payload.clone()),
        )
        .await;
        let (_, second) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(token.as_str()),
            Some(payload),
        )
        .await;
        assert_ne!(first["id"], second["id"]);
        assert_eq!(first["result"], second["result"]);

        let (status, list) =
            send(&app, Method::GET, "/calculations", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn list_honours_limit_and_offset() {
        let app = build_app(AppState::fake());
        let token = register(&app, "pages@example.com").await;
        for a in [1, 2] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/calculations",
                Some(token.as_str()),
                Some(json!({"a": a, "b": 1, "type": "add"})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        for uri in ["/calculations?limit=1", "/calculations?limit=1&offset=1"] {
            let (status, list) = send(&app, Method::GET, uri, Some(token.as_str()), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(list.as_array().unwrap().len(), 1, "{uri}");
        }

        let (status, list) = send(
            &app,
            Method::GET,
            "/calculations?limit=0&offset=-3",
            Some(token.as_str()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bad_path_and_query_render_json_detail() {
        let app = build_app(AppState::fake());
        let token = register(&app, "parts@example.com").await;

        for (method, uri, part) in [
            (Method::GET, "/calculations/not-a-uuid", "path"),
            (Method::DELETE, "/calculations/not-a-uuid", "path"),
            (Method::GET, "/calculations?limit=abc", "query"),
        ] {
            let (status, body) = send(&app, method, uri, Some(token.as_str()), None).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}: {body}");
            assert_eq!(body["detail"][0]["loc"], json!([part]), "{uri}");
            assert_eq!(body["detail"][0]["type"], "malformed_input");
        }

        // Authentication still wins over a bad path.
        let (status, body) = send(&app, Method::GET, "/calculations/not-a-uuid", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Not authenticated");
    }

    #[tokio::test]
    async fn records_are_private_to_their_owner() {
        let app = build_app(AppState::fake());
        let alice = register(&app, "alice@example.com").await;
        let bob = register(&app, "bob@example.com").await;

        let (_, created) = send(
            &app,
            Method::POST,
            "/calculations",
            Some(alice.as_str()),
            Some(json!({"a": 2, "b": 3, "type": "mul"})),
        )
        .await;
        let uri = format!("/calculations/{}", created["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::GET, &uri, Some(bob.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(bob.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, bob_list) =
            send(&app, Method::GET, "/calculations", Some(bob.as_str()), None).await;
        assert!(bob_list.as_array().unwrap().is_empty());

        let (status, fetched) = send(&app, Method::GET, &uri, Some(alice.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["result"], 6.0);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(alice.as_str()), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &uri, Some(alice.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn me_returns_caller() {
        let app = build_app(AppState::fake());
        let token = register(&app, "me@example.com").await;
        let (status, body) = send(&app, Method::GET, "/me", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "me@example.com");

        let (status, _) = send(&app, Method::GET, "/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stateless_calculate_endpoint() {
        let app = build_app(AppState::fake());
        let (status, body) = send(&app, Method::GET, "/calculate/add?a=2&b=3", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], 5.0);

        let (status, body) =
            send(&app, Method::GET, "/calculate/divide?a=12&b=4", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], 3.0);

        let (status, _) = send(&app, Method::GET, "/calculate/divide?a=5&b=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, "/calculate/power?a=2&b=3", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Unknown operation");

        let (status, body) = send(&app, Method::GET, "/calculate/add?a=x&b=3", None, None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"], json!(["body", "a"]));
    }
}
