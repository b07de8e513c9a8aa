use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth;
use crate::state::AppState;

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
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
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::memory::{InMemorySessionStore, InMemoryUserStore};
    use crate::notify::testing::RecordingNotifier;

    async fn post_json(
        app: Router,
        uri: &str,
        body: Value,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    async fn get_with_cookie(app: Router, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// The `name=value` pair from the response's Set-Cookie header.
    fn cookie_pair(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let app = build_app(AppState::fake());
        let response = get_with_cookie(app, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_sets_session_cookie_and_opens_the_gate() {
        let app = build_app(AppState::fake());

        let response = post_json(
            app.clone(),
            "/auth/register",
            json!({ "email": "gate@example.com", "password": "secret123" }),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Secure"));
        assert!(set_cookie.contains("SameSite=Strict"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let body = body_json(response).await;
        assert_eq!(body["user"]["email"], "gate@example.com");
        assert_eq!(body["verification_pending"], true);
        assert!(body["user"].get("password_hash").is_none());

        let me = get_with_cookie(app.clone(), "/me", Some(&cookie)).await;
        assert_eq!(me.status(), StatusCode::OK);
        let me_body = body_json(me).await;
        assert_eq!(me_body["email"], "gate@example.com");
    }

    #[tokio::test]
    async fn gate_denies_missing_and_bogus_sessions() {
        let app = build_app(AppState::fake());

        let missing = get_with_cookie(app.clone(), "/me", None).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let bogus = get_with_cookie(app, "/me", Some("session_id=bogus")).await;
        assert_eq!(bogus.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_clears_cookie_and_closes_the_gate() {
        let app = build_app(AppState::fake());

        let registered = post_json(
            app.clone(),
            "/auth/register",
            json!({ "email": "bye@example.com", "password": "secret123" }),
            None,
        )
        .await;
        let cookie = cookie_pair(&registered);

        let logout = post_json(app.clone(), "/auth/logout", json!({}), Some(&cookie)).await;
        assert_eq!(logout.status(), StatusCode::NO_CONTENT);
        let cleared = logout
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cleared.contains("Max-Age=0"));

        let me = get_with_cookie(app, "/me", Some(&cookie)).await;
        assert_eq!(me.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_app(AppState::fake());

        let first = post_json(
            app.clone(),
            "/auth/register",
            json!({ "email": "Twice@Example.com", "password": "secret123" }),
            None,
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = post_json(
            app,
            "/auth/register",
            json!({ "email": "twice@example.com", "password": "different1" }),
            None,
        )
        .await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_is_gated_on_verification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let fake = AppState::fake();
        let state = AppState::from_parts(
            fake.db.clone(),
            fake.config.clone(),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionStore::new()),
            notifier.clone(),
        );
        let app = build_app(state);

        let registered = post_json(
            app.clone(),
            "/auth/register",
            json!({ "email": "slow@example.com", "password": "secret123" }),
            None,
        )
        .await;
        assert_eq!(registered.status(), StatusCode::OK);

        // Unverified: login fails with the generic credentials error.
        let early = post_json(
            app.clone(),
            "/auth/login",
            json!({ "email": "slow@example.com", "password": "secret123" }),
            None,
        )
        .await;
        assert_eq!(early.status(), StatusCode::UNAUTHORIZED);

        // Follow the emailed link.
        let link = notifier.sent.lock().unwrap()[0].1.clone();
        let path = link.strip_prefix("http://localhost:8080").unwrap().to_string();
        let verified = get_with_cookie(app.clone(), &path, None).await;
        assert_eq!(verified.status(), StatusCode::OK);

        // The link is single-use.
        let again = get_with_cookie(app.clone(), &path, None).await;
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);

        let login = post_json(
            app,
            "/auth/login",
            json!({ "email": "slow@example.com", "password": "secret123", "remember": true }),
            None,
        )
        .await;
        assert_eq!(login.status(), StatusCode::OK);
        let set_cookie = login
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        // Remember-me stretches Max-Age to 30 days.
        assert!(set_cookie.contains(&format!("Max-Age={}", 30 * 24 * 60 * 60)));
    }

    #[tokio::test]
    async fn check_email_reports_availability() {
        let app = build_app(AppState::fake());

        let free = post_json(
            app.clone(),
            "/auth/check-email",
            json!({ "email": "new@example.com" }),
            None,
        )
        .await;
        assert_eq!(body_json(free).await["exists"], false);

        post_json(
            app.clone(),
            "/auth/register",
            json!({ "email": "new@example.com", "password": "secret123" }),
            None,
        )
        .await;

        let taken = post_json(
            app.clone(),
            "/auth/check-email",
            json!({ "email": "New@Example.com" }),
            None,
        )
        .await;
        assert_eq!(body_json(taken).await["exists"], true);

        let malformed = post_json(
            app,
            "/auth/check-email",
            json!({ "email": "not-an-email" }),
            None,
        )
        .await;
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_validates_input() {
        let app = build_app(AppState::fake());

        let bad_email = post_json(
            app.clone(),
            "/auth/register",
            json!({ "email": "nope", "password": "secret123" }),
            None,
        )
        .await;
        assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);

        let short_password = post_json(
            app,
            "/auth/register",
            json!({ "email": "ok@example.com", "password": "short" }),
            None,
        )
        .await;
        assert_eq!(short_password.status(), StatusCode::BAD_REQUEST);
    }
}
