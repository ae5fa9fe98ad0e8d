//! HTTP surface: public storefront, customer account and admin namespaces.

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, config::AppConfig, AppState};

pub mod account;
pub mod addresses;
pub mod admins;
pub mod analytics;
pub mod catalog;
pub mod checkout;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod settings;
pub mod uploads;
pub mod wishlist;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::current_session))
        .route("/products", get(catalog::list_products))
        .route("/products/:key", get(catalog::get_product))
        .route("/categories", get(catalog::list_categories))
        .route("/cart/quote", post(catalog::quote_cart))
        .route("/checkout", post(checkout::checkout))
        .route("/payments/apple-pay", post(payments::apple_pay))
        .route("/payments/google-pay", post(payments::google_pay))
        .route("/payments/swiss", post(payments::swiss))
        .route("/payments/stripe/intent", post(payments::stripe_intent))
        .route("/settings", get(settings::public_settings));

    let account = Router::new()
        .route("/", get(account::profile).put(account::update_profile))
        .route("/password", put(account::change_password))
        .route("/orders", get(account::list_orders))
        .route("/orders/:id", get(account::get_order))
        .route("/orders/:id/cancel", post(account::cancel_order))
        .route("/addresses", get(addresses::list_addresses).post(addresses::create_address))
        .route("/addresses/:id", put(addresses::update_address).delete(addresses::delete_address))
        .route("/addresses/:id/default", post(addresses::set_default_address))
        .route("/wishlist", get(wishlist::list_wishlist).post(wishlist::add_to_wishlist))
        .route("/wishlist/:product_id", delete(wishlist::remove_from_wishlist))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_customer));

    let admin = Router::new()
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/:id", get(products::get_product).put(products::update_product).delete(products::delete_product))
        .route("/products/:id/stock", patch(products::update_stock))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/orders/:id/status", patch(orders::update_status))
        .route("/orders/:id/payment", patch(orders::update_payment_status))
        .route("/customers", get(customers::list_customers))
        .route("/customers/:id", get(customers::get_customer).delete(customers::delete_customer))
        .route("/admins", get(admins::list_admins).post(admins::create_admin))
        .route("/settings", get(settings::all_settings).put(settings::update_settings))
        .route("/analytics", get(analytics::dashboard))
        .route("/uploads", post(uploads::upload_image))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    let cors = cors_layer(&state.config);
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .nest("/api", public)
        .nest("/api/account", account)
        .nest("/api/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config.allowed_origins().iter().filter_map(|o| o.parse().ok()).collect();
    if origins.is_empty() { return CorsLayer::permissive(); }
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
