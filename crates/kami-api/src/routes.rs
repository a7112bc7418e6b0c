// ============================================================================
// Kami API - Router
// File: crates/kami-api/src/routes.rs
// ============================================================================
//! Route table and HTTP middleware

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    routing::{get, post, put},
    Router,
};
use kami_shared::config::AppSettings;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::handlers::{auth, cards, channels, codes, health, orders, profile, proxy, sales, users};
use crate::state::AppState;

pub fn build_router(state: AppState, settings: &AppSettings) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/send-code", post(auth::send_code))
        .route("/auth/register", post(auth::register))
        // Profile and users
        .route("/users/me", get(profile::me).put(profile::update_me))
        .route("/users/me/password", put(profile::change_password))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        // Channels
        .route("/channels", get(channels::list_channels).post(channels::create_channel))
        .route(
            "/channels/{id}",
            get(channels::get_channel)
                .put(channels::update_channel)
                .delete(channels::delete_channel),
        )
        // Cards and their codes
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route(
            "/cards/{id}",
            get(cards::get_card).put(cards::update_card).delete(cards::delete_card),
        )
        .route("/cards/{id}/stock", get(cards::card_stock))
        .route(
            "/cards/{id}/codes",
            get(cards::list_codes).post(cards::generate_codes).delete(cards::delete_codes),
        )
        .route("/cards/{id}/codes/count", get(cards::count_codes))
        // Activation codes
        .route("/codes/check/{code}", get(codes::check_code))
        .route("/codes/available", get(codes::available_codes))
        .route("/codes/export", post(codes::export_codes))
        .route("/codes/{code}", get(codes::get_code))
        .route("/codes/{code}/verify", get(codes::verify_code))
        .route("/codes/{code}/consuming", post(codes::set_consuming))
        .route("/codes/{code}/consumed", post(codes::set_consumed))
        // Orders
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/mine", get(orders::my_orders))
        .route("/orders/pending", get(orders::pending_orders))
        .route("/orders/processing", get(orders::processing_orders))
        .route("/orders/stats", get(orders::order_stats))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/complete", post(orders::complete_order))
        // Proxies
        .route("/proxy/associations", get(proxy::associations))
        .route("/proxy/revenue", get(proxy::revenue))
        .route("/proxy/{id}/cards", get(proxy::proxy_cards).post(proxy::link_cards))
        .route("/proxy/{id}/cards/unlink", post(proxy::unlink_cards))
        .route("/proxy/{id}/cards/{card_id}/access", get(proxy::card_access))
        // Sales
        .route("/sales", get(sales::list_sales))
        .route("/sales/purchase", post(sales::purchase))
        .route("/sales/by-email", get(sales::sales_by_email))
        .route("/sales/stats", get(sales::sales_stats));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(settings.request_timeout_secs.max(1)),
        ))
        .layer(cors_layer(&settings.cors_origins))
}

/// An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use kami_core::repositories::InMemoryVerificationCodeStore;
    use kami_core::services::{
        ActivationCodeService, AuthService, CardService, ChannelService, MailService, OrderService,
        ProxyService, RegistrationPolicy, SaleService, UserService,
    };
    use kami_core::test_utils::{Fixture, FIXTURE_PASSWORD};
    use kami_security::JwtService;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::state::login_limiter;

    const SECRET: &str = "router-test-secret-router-test-secret";

    fn settings() -> AppSettings {
        AppSettings {
            env: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            name: "kami-server".into(),
            cors_origins: Vec::new(),
            request_timeout_secs: 5,
        }
    }

    fn state(fx: &Fixture, attempts_per_minute: u32) -> AppState {
        let db = fx.db.clone();
        let mail = Arc::new(MailService::new(fx.mailer.clone()).unwrap());
        AppState {
            auth: Arc::new(AuthService::new(
                db.clone(),
                Arc::new(JwtService::new(SECRET, 900, 3600)),
                Arc::new(InMemoryVerificationCodeStore::new()),
                mail.clone(),
                RegistrationPolicy {
                    enabled: false,
                    code_ttl: Duration::from_secs(300),
                    tolerate_mail_failure: true,
                },
            )),
            users: Arc::new(UserService::new(db.clone(), db.clone())),
            channels: Arc::new(ChannelService::new(db.clone())),
            cards: Arc::new(CardService::new(db.clone(), db.clone(), db.clone())),
            codes: Arc::new(ActivationCodeService::new(db.clone(), db.clone(), db.clone(), db.clone())),
            orders: Arc::new(OrderService::new(
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                db.clone(),
                mail.clone(),
            )),
            proxies: Arc::new(ProxyService::new(db.clone(), db.clone(), db.clone(), db.clone())),
            sales: Arc::new(SaleService::new(db.clone(), db.clone(), db.clone(), db.clone(), mail)),
            login_limiter: login_limiter(attempts_per_minute),
        }
    }

    fn app(fx: &Fixture) -> (Router, AppState) {
        let state = state(fx, 30);
        (build_router(state.clone(), &settings()), state)
    }

    async fn token(state: &AppState, username: &str) -> String {
        state.auth.login(username, FIXTURE_PASSWORD).await.unwrap().access_token
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let fx = Fixture::new().await;
        let (app, _) = app(&fx);
        let (status, body) = send(&app, request(Method::GET, "/api/v1/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_login_success_and_failure() {
        let fx = Fixture::new().await;
        let (app, _) = app(&fx);

        let ok = json!({ "username": "customer", "password": FIXTURE_PASSWORD });
        let (status, body) = send(&app, request(Method::POST, "/api/v1/auth/login", None, Some(ok))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["token_type"], "bearer");

        let bad = json!({ "username": "customer", "password": "wrong-password" });
        let (status, body) = send(&app, request(Method::POST, "/api/v1/auth/login", None, Some(bad))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_login_is_rate_limited_per_username() {
        let fx = Fixture::new().await;
        let app = build_router(state(&fx, 2), &settings());
        let attempt = || json!({ "username": "customer", "password": "wrong-password" });

        for _ in 0..2 {
            let (status, _) = send(&app, request(Method::POST, "/api/v1/auth/login", None, Some(attempt()))).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        let (status, _) = send(&app, request(Method::POST, "/api/v1/auth/login", None, Some(attempt()))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let other = json!({ "username": "admin", "password": FIXTURE_PASSWORD });
        let (status, _) = send(&app, request(Method::POST, "/api/v1/auth/login", None, Some(other))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_auth_and_role_gates() {
        let fx = Fixture::new().await;
        let (app, state) = app(&fx);

        let (status, _) = send(&app, request(Method::GET, "/api/v1/users/me", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let customer = token(&state, "customer").await;
        let (status, body) = send(&app, request(Method::GET, "/api/v1/users/me", Some(&customer), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "customer");
        assert!(body["data"].get("password_hash").is_none());

        let (status, _) = send(&app, request(Method::GET, "/api/v1/channels", Some(&customer), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = token(&state, "admin").await;
        let (status, body) = send(&app, request(Method::GET, "/api/v1/channels", Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_public_code_check() {
        let fx = Fixture::new().await;
        let (app, _) = app(&fx);

        let uri = format!("/api/v1/codes/check/{}", fx.codes[2].code);
        let (status, body) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["available"], true);
        assert_eq!(body["data"]["channel_id"], fx.channel.id.to_string());

        let (status, body) = send(&app, request(Method::GET, "/api/v1/codes/check/nope", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["available"], false);
    }

    #[tokio::test]
    async fn test_order_redemption_flow() {
        let fx = Fixture::new().await;
        let (app, state) = app(&fx);
        let customer = token(&state, "customer").await;
        let staff = token(&state, "staff-1").await;
        let other_staff = token(&state, "staff-2").await;
        let code = fx.codes[2].code.clone();

        let create = json!({ "code": code });
        let (status, body) =
            send(&app, request(Method::POST, "/api/v1/orders", Some(&customer), Some(create.clone()))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "processing");
        assert_eq!(body["data"]["pricing"], 10.0);
        let order_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, request(Method::POST, "/api/v1/orders", Some(&customer), Some(create))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let complete_uri = format!("/api/v1/orders/{order_id}/complete");
        let (status, _) = send(
            &app,
            request(Method::POST, &complete_uri, Some(&customer), Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            request(Method::POST, &complete_uri, Some(&other_staff), Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            request(Method::POST, &complete_uri, Some(&staff), Some(json!({ "remarks": "done" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "completed");
        assert_eq!(fx.db.code(&code).unwrap().status.as_str(), "consumed");

        let (status, _) = send(
            &app,
            request(Method::POST, &complete_uri, Some(&staff), Some(json!({}))),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, request(Method::GET, "/api/v1/orders/mine", Some(&customer), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_code_and_invalid_payload() {
        let fx = Fixture::new().await;
        let (app, state) = app(&fx);
        let customer = token(&state, "customer").await;

        let unknown = json!({ "code": "ZZZZZZZZZZZZZZZZ" });
        let (status, body) = send(&app, request(Method::POST, "/api/v1/orders", Some(&customer), Some(unknown))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let empty = json!({ "code": "" });
        let (status, _) = send(&app, request(Method::POST, "/api/v1/orders", Some(&customer), Some(empty))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_purchase_and_sales_stats() {
        let fx = Fixture::new().await;
        let (app, state) = app(&fx);
        let customer = token(&state, "customer").await;
        let admin = token(&state, "admin").await;

        let buy = json!({ "card_name": "Card B", "user_email": "buyer@example.com" });
        let (status, body) = send(&app, request(Method::POST, "/api/v1/sales/purchase", Some(&customer), Some(buy))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sale_price"], 20.0);
        assert_eq!(fx.mailer.sent().len(), 1);

        let (status, body) = send(&app, request(Method::GET, "/api/v1/sales/stats", Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_sales"], 1);
        assert_eq!(body["data"]["total_stock"], 6);
    }

    #[tokio::test]
    async fn test_proxy_revenue_scoping() {
        let fx = Fixture::new().await;
        let (app, state) = app(&fx);
        let proxy = token(&state, "proxy-1").await;
        let staff = token(&state, "staff-1").await;

        let (status, body) = send(&app, request(Method::GET, "/api/v1/proxy/revenue", Some(&proxy), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_count"], 1);
        assert_eq!(body["data"]["revenues"][0]["proxy_username"], "proxy-1");

        let (status, _) = send(&app, request(Method::GET, "/api/v1/proxy/revenue", Some(&staff), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
