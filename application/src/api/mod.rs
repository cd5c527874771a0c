//! REST API definitions.

pub mod listing;
pub mod sale;
pub mod webhook;

use axum::{
    routing::{get, post, put},
    Router,
};

/// Builds the [`Router`] of the REST API.
///
/// Handlers expect the [`Service`] to be provided as an [`Extension`] layer.
///
/// [`Extension`]: axum::Extension
/// [`Service`]: crate::Service
pub fn router() -> Router {
    Router::new()
        .route("/listings", post(listing::create))
        .route("/listings/vehicle/:vehicle_id", put(listing::update))
        .route("/sales/available", get(sale::list_available))
        .route("/sales/sold", get(sale::list_sold))
        .route("/sales/:id", get(sale::get))
        .route("/sales/:id/purchase", post(sale::purchase))
        .route("/webhooks/payments", post(webhook::payment))
}
