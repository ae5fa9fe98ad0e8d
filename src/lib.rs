//! Storefront
//!
//! Catalog, checkout and admin back-office API over Postgres.
//!
//! ## Features
//! - Product catalog browsing and cart quotes
//! - Checkout with stock reservation and store-configured tax/shipping
//! - Simulated Apple Pay, Google Pay and Swiss gateways, plus Stripe intents
//! - Customer accounts, addresses and wishlist
//! - Admin order, product, customer and settings management
//! - Optional signed image uploads to Cloudinary
//! - Sales analytics dashboard

use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod extract;
pub mod media;
pub mod models;
pub mod payments;
pub mod settings;
pub mod telemetry;

pub use api::router;
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};

use events::EventPublisher;
use media::CloudinaryClient;
use payments::StripeClient;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<AppConfig>,
    pub events: EventPublisher,
    pub stripe: Option<StripeClient>,
    pub media: Option<CloudinaryClient>,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: AppConfig, events: EventPublisher) -> Self {
        let stripe = config.stripe_secret_key.as_deref().filter(|k| !k.is_empty()).map(StripeClient::new);
        let media = CloudinaryClient::from_config(&config);
        Self { db, config: Arc::new(config), events, stripe, media }
    }
}
