//! # Routes
//!
//! Axum router configuration for the storefront service.

use crate::state::AppState;
use crate::{admin, handlers};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/v1/products?q=&category= - List/search products
///   - GET  /api/v1/products/{id} - Get product by ID
///
/// - Cart:
///   - GET    /api/v1/cart - Current cart
///   - POST   /api/v1/cart/items - Add a product
///   - PUT    /api/v1/cart/items/{id} - Set quantity (0 removes)
///   - POST   /api/v1/cart/items/{id}/increment | /decrement
///   - DELETE /api/v1/cart/items/{id} - Remove a line
///   - DELETE /api/v1/cart - Empty the cart
///   - GET    /api/v1/quote?shipping=capital - Subtotal, shipping and total
///
/// - Checkout:
///   - GET  /api/v1/checkout - Current checkout state
///   - POST /api/v1/checkout/open | /submit | /cancel | /dismiss
///
/// - Admin (admin role):
///   - POST /api/v1/auth/login | /logout
///   - POST/PUT/DELETE /api/v1/admin/products[/{id}]
///   - GET  /api/v1/admin/sales, DELETE /api/v1/admin/sales/{id}
///   - GET/POST /api/v1/admin/recaudations, DELETE /api/v1/admin/recaudations/{id}
///   - POST /api/v1/admin/images - Upload a product image
///
/// - Misc:
///   - GET  /api/v1/theme?route=/&scroll=0 - Navbar theme tokens
///   - GET/POST /api/v1/pairing - Messaging channel pairing state / events
///   - POST /webhook/payment - Signed payment notifications
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes())
        .route("/webhook/payment", post(handlers::payment_webhook))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    let catalog = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product));

    let cart = Router::new()
        .route("/cart", get(handlers::get_cart).delete(handlers::clear_cart))
        .route("/cart/items", post(handlers::add_to_cart))
        .route(
            "/cart/items/{product_id}",
            put(handlers::update_quantity).delete(handlers::remove_item),
        )
        .route("/cart/items/{product_id}/increment", post(handlers::increment_item))
        .route("/cart/items/{product_id}/decrement", post(handlers::decrement_item))
        .route("/quote", get(handlers::quote));

    let checkout = Router::new()
        .route("/checkout", get(handlers::checkout_state))
        .route("/checkout/open", post(handlers::open_checkout))
        .route("/checkout/submit", post(handlers::submit_checkout))
        .route("/checkout/cancel", post(handlers::cancel_checkout))
        .route("/checkout/dismiss", post(handlers::dismiss_checkout));

    let admin = Router::new()
        .route("/auth/login", post(admin::login))
        .route("/auth/logout", post(admin::logout))
        .route("/admin/products", post(admin::create_product))
        .route(
            "/admin/products/{product_id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/admin/sales", get(admin::list_sales))
        .route("/admin/sales/{sale_id}", delete(admin::delete_sale))
        .route(
            "/admin/recaudations",
            get(admin::list_recaudations).post(admin::close_month),
        )
        .route("/admin/recaudations/{recaudation_id}", delete(admin::delete_recaudation))
        .route("/admin/images", post(admin::upload_image));

    Router::new()
        .merge(catalog)
        .merge(cart)
        .merge(checkout)
        .merge(admin)
        .route("/theme", get(handlers::theme))
        .route(
            "/pairing",
            get(handlers::pairing_state).post(handlers::pairing_event),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AppConfig, Collaborators};
    use crate::webhook::sign;
    use async_trait::async_trait;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use shop_client::{ApiClient, ApiConfig};
    use shop_core::{
        FileTokenStore, OrderDraft, OrderNotifier, PaymentGateway, PaymentSession, PaymentStatus,
        PaymentStatusSource, ShippingRates, ShopResult, StoredLogin, TokenStore,
    };
    use std::sync::{Arc, Mutex};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "whsec_test";

    struct FixedGateway;

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn create_payment(&self, draft: &OrderDraft) -> ShopResult<PaymentSession> {
            Ok(PaymentSession::new(draft.id(), "https://pay.test/checkout/abc"))
        }

        fn provider_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct AlwaysPending;

    #[async_trait]
    impl PaymentStatusSource for AlwaysPending {
        async fn payment_status(&self, _order_id: &str) -> ShopResult<PaymentStatus> {
            Ok(PaymentStatus::Pending)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl OrderNotifier for RecordingNotifier {
        async fn notify(&self, message: &str) -> ShopResult<()> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    async fn catalog_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1, "title": "Remera", "price": 1000
            })))
            .mount(&server)
            .await;
        server
    }

    fn test_state(api: &MockServer, config: AppConfig) -> (AppState, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let collaborators = Collaborators {
            gateway: Arc::new(FixedGateway),
            status: Arc::new(AlwaysPending),
            notifier: notifier.clone(),
            ledger: None,
        };
        let state = AppState::build(
            config,
            ApiClient::new(ApiConfig::new(api.uri())).unwrap(),
            ShippingRates::default(),
            collaborators,
        )
        .unwrap();
        (state, notifier)
    }

    fn config() -> AppConfig {
        AppConfig {
            webhook_secret: Some(SECRET.to_string()),
            ..AppConfig::default()
        }
    }

    fn signature(body: &[u8]) -> HeaderValue {
        let ts = chrono::Utc::now().timestamp();
        let sig = sign(SECRET, ts, body).unwrap();
        HeaderValue::from_str(&format!("t={},v1={}", ts, sig)).unwrap()
    }

    fn valid_form() -> Value {
        json!({
            "shipping": "capital",
            "cellphone": "1155550000",
            "address": "Av. Siempre Viva 742",
            "city": "CABA",
            "province": "Buenos Aires"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let api = MockServer::start().await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["status"], "healthy");
    }

    #[tokio::test]
    async fn test_duplicate_add_and_quote() {
        let api = catalog_server().await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 1, "quantity": 2}))
            .await;
        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<Value>()["item_count"], 2);

        let duplicate = server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": "1"}))
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);

        let cart = server.get("/api/v1/cart").await.json::<Value>();
        assert_eq!(cart["items"].as_array().unwrap().len(), 1);
        assert_eq!(cart["items"][0]["quantity"], 2);

        let quote = server
            .get("/api/v1/quote")
            .add_query_param("shipping", "capital")
            .await
            .json::<Value>();
        assert_eq!(quote["total_display"], "$ 6.000");

        let no_tier = server.get("/api/v1/quote").await.json::<Value>();
        assert!(no_tier["total"].is_null());
        assert_eq!(no_tier["total_display"], shop_core::pricing::SELECT_SHIPPING_PROMPT);

        let bad_tier = server
            .get("/api/v1/quote")
            .add_query_param("shipping", "moon")
            .await;
        bad_tier.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_negative_catalog_price_is_refused() {
        let api = catalog_server().await;
        Mock::given(method("GET"))
            .and(path("/products/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "title": "Error de carga", "price": -5000
            })))
            .mount(&api)
            .await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 7}))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<Value>()["fields"][0]["field"], "unit_price");

        let cart = server.get("/api/v1/cart").await.json::<Value>();
        assert!(cart["items"].as_array().unwrap().is_empty());
        assert_eq!(cart["subtotal_display"], "$ 0");
    }

    #[tokio::test]
    async fn test_quantity_updates() {
        let api = catalog_server().await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 1}))
            .await
            .assert_status(StatusCode::CREATED);

        let cart = server
            .post("/api/v1/cart/items/1/increment")
            .await
            .json::<Value>();
        assert_eq!(cart["item_count"], 2);

        let cart = server
            .put("/api/v1/cart/items/1")
            .json(&json!({"quantity": 0}))
            .await
            .json::<Value>();
        assert_eq!(cart["item_count"], 0);
        assert!(cart["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_reports_every_missing_field() {
        let api = catalog_server().await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 1}))
            .await
            .assert_status(StatusCode::CREATED);
        server.post("/api/v1/checkout/open").await.assert_status_ok();

        let response = server
            .post("/api/v1/checkout/submit")
            .json(&json!({"shipping": "capital"}))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let fields: Vec<String> = response.json::<Value>()["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["cellphone", "address", "city", "province"]);

        let checkout = server.get("/api/v1/checkout").await.json::<Value>();
        assert_eq!(checkout["state"], "form_open");
    }

    #[tokio::test]
    async fn test_checkout_confirmed_by_webhook() {
        let api = catalog_server().await;
        let (state, notifier) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 1, "quantity": 2}))
            .await
            .assert_status(StatusCode::CREATED);
        server.post("/api/v1/checkout/open").await.assert_status_ok();

        let submitted = server
            .post("/api/v1/checkout/submit")
            .json(&valid_form())
            .await;
        submitted.assert_status_ok();
        let submitted = submitted.json::<Value>();
        assert_eq!(submitted["payment_url"], "https://pay.test/checkout/abc");
        let order_id = submitted["order_id"].as_str().unwrap().to_string();

        // The cart is locked while the payment is pending
        let cart = server.get("/api/v1/cart").await.json::<Value>();
        assert_eq!(cart["locked"], true);
        server
            .delete("/api/v1/cart")
            .await
            .assert_status(StatusCode::CONFLICT);

        let body = serde_json::to_vec(&json!({"order_id": order_id, "status": "approved"})).unwrap();
        let response = server
            .post("/webhook/payment")
            .add_header(HeaderName::from_static("x-signature"), signature(&body))
            .bytes(body.clone().into())
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["outcome"]["outcome"], "succeeded");

        let cart = server.get("/api/v1/cart").await.json::<Value>();
        assert!(cart["items"].as_array().unwrap().is_empty());
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
        assert!(notifier.messages.lock().unwrap()[0].contains("Total: $ 6.000"));

        // Redelivery is acknowledged without a second confirmation
        let again = server
            .post("/webhook/payment")
            .add_header(HeaderName::from_static("x-signature"), signature(&body))
            .bytes(body.into())
            .await;
        again.assert_status_ok();
        assert_eq!(again.json::<Value>()["ignored"], true);
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let api = MockServer::start().await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        let body = br#"{"order_id":"x","status":"approved"}"#.to_vec();
        let response = server
            .post("/webhook/payment")
            .add_header(
                HeaderName::from_static("x-signature"),
                HeaderValue::from_static("t=1,v1=deadbeef"),
            )
            .bytes(body.clone().into())
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<Value>()["error"],
            "Invalid notification signature"
        );

        let unsigned = server.post("/webhook/payment").bytes(body.into()).await;
        unsigned.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cancel_keeps_cart() {
        let api = catalog_server().await;
        let (state, notifier) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 1}))
            .await
            .assert_status(StatusCode::CREATED);
        server.post("/api/v1/checkout/open").await.assert_status_ok();
        server
            .post("/api/v1/checkout/submit")
            .json(&valid_form())
            .await
            .assert_status_ok();

        let cancelled = server.post("/api/v1/checkout/cancel").await.json::<Value>();
        assert_eq!(cancelled["state"], "cancelled");

        let dismissed = server.post("/api/v1/checkout/dismiss").await.json::<Value>();
        assert_eq!(dismissed["state"], "idle");

        let cart = server.get("/api/v1/cart").await.json::<Value>();
        assert_eq!(cart["item_count"], 1);
        assert_eq!(cart["locked"], false);
        assert!(notifier.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approval_after_cancel_still_confirms() {
        let api = catalog_server().await;
        let (state, notifier) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 1}))
            .await
            .assert_status(StatusCode::CREATED);
        server.post("/api/v1/checkout/open").await.assert_status_ok();
        let order_id = server
            .post("/api/v1/checkout/submit")
            .json(&valid_form())
            .await
            .json::<Value>()["order_id"]
            .as_str()
            .unwrap()
            .to_string();
        server.post("/api/v1/checkout/cancel").await.assert_status_ok();

        let body = serde_json::to_vec(&json!({"order_id": order_id, "status": "approved"})).unwrap();
        let response = server
            .post("/webhook/payment")
            .add_header(HeaderName::from_static("x-signature"), signature(&body))
            .bytes(body.clone().into())
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["outcome"]["outcome"], "succeeded");
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);

        let again = server
            .post("/webhook/payment")
            .add_header(HeaderName::from_static("x-signature"), signature(&body))
            .bytes(body.into())
            .await;
        assert_eq!(again.json::<Value>()["ignored"], true);
        assert_eq!(notifier.messages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_admin_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("auth.json");
        FileTokenStore::new(&token_path)
            .save(&StoredLogin::new("tok-admin", Some("admin@shop.test".to_string())))
            .unwrap();

        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/role/admin@shop.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"role": "admin"})))
            .expect(1)
            .mount(&api)
            .await;
        Mock::given(method("GET"))
            .and(path("/boughtProduct/AllboughtProducts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&api)
            .await;

        let config = AppConfig {
            auth_token_path: Some(token_path),
            ..config()
        };
        let (state, _) = test_state(&api, config);
        let server = TestServer::new(create_router(state)).unwrap();

        server.get("/api/v1/admin/sales").await.assert_status_ok();
        server.get("/api/v1/admin/sales").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_cart_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            cart_snapshot_path: Some(dir.path().join("cart.json")),
            ..config()
        };
        let api = catalog_server().await;

        let (state, _) = test_state(&api, config.clone());
        let server = TestServer::new(create_router(state)).unwrap();
        server
            .post("/api/v1/cart/items")
            .json(&json!({"product_id": 1, "quantity": 3}))
            .await
            .assert_status(StatusCode::CREATED);

        let (restarted, _) = test_state(&api, config);
        let server = TestServer::new(create_router(restarted)).unwrap();
        let cart = server.get("/api/v1/cart").await.json::<Value>();
        assert_eq!(cart["item_count"], 3);
    }

    #[tokio::test]
    async fn test_theme_and_pairing() {
        let api = MockServer::start().await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        let home = server
            .get("/api/v1/theme")
            .add_query_param("route", "/")
            .add_query_param("scroll", 0)
            .await
            .json::<Value>();
        assert_eq!(home["navbar_background"], "transparent");

        let pairing = server
            .post("/api/v1/pairing")
            .text(r#"{"event":"whatsapp-qr","data":"qr-data"}"#)
            .await
            .json::<Value>();
        assert_eq!(pairing["status"], "qr");
        assert_eq!(pairing["qr"], "qr-data");

        let pairing = server
            .post("/api/v1/pairing")
            .text(r#"{"event":"whatsapp-status","data":"connected"}"#)
            .await
            .json::<Value>();
        assert_eq!(pairing["status"], "connected");
        assert!(pairing.get("qr").is_none());
    }

    #[tokio::test]
    async fn test_admin_routes_require_admin() {
        let api = MockServer::start().await;
        let (state, _) = test_state(&api, config());
        let server = TestServer::new(create_router(state)).unwrap();

        server
            .get("/api/v1/admin/sales")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .delete("/api/v1/admin/products/1")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        assert!(api.received_requests().await.unwrap().is_empty());
    }
}
