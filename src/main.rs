use std::sync::Arc;

use axum::{extract::FromRef, Router};
use dotenv::dotenv;
use http::{header::CONTENT_TYPE, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::Level;

use crate::calls::CallService;
use crate::config::CallConfig;
use crate::notify::WebhookDecisionNotifier;
use crate::telephony::TwilioCallProvider;
use crate::tracking::CallTrackingIndex;
use crate::twiml::TwilioTwiml;

mod access;
mod calls;
mod config;
mod db;
mod models;
mod note;
mod notify;
mod phone;
mod response;
mod routes;
mod schema;
mod store;
mod telephony;
#[cfg(test)]
mod testutil;
mod tracking;
mod twiml;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let config = CallConfig::from_env();
    let provider = TwilioCallProvider::new(
        config.account_sid.clone().unwrap_or_default(),
        config.auth_token.clone().unwrap_or_default(),
    );
    let notifier = WebhookDecisionNotifier::new(config.decision_webhook_url.clone());
    let tracking = Arc::new(CallTrackingIndex::new());
    let calls = Arc::new(CallService::new(
        config,
        Arc::new(provider),
        Arc::new(TwilioTwiml),
        Arc::new(notifier),
        tracking.clone(),
    ));
    let app_state = AppState { calls, tracking };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    let app = Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .nest("", routes::general::create_router(app_state.clone()))
                .nest("/access", routes::access::create_router(app_state.clone()))
                .nest("/calls", routes::calls::create_router(app_state.clone()))
                .layer(cors),
        )
        // Twilio webhooks live outside /api/v1 so BASE_URL + path stays flat.
        .nest("/twilio", routes::voice::create_router(app_state.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        );

    axum::Server::bind(&"0.0.0.0:3000".parse().unwrap())
        .serve(app.into_make_service())
        .await
        .unwrap();
}

#[derive(Clone)]
pub struct AppState {
    calls: Arc<CallService>,
    tracking: Arc<CallTrackingIndex>,
}

impl FromRef<AppState> for Arc<CallService> {
    fn from_ref(state: &AppState) -> Self {
        state.calls.clone()
    }
}

impl FromRef<AppState> for Arc<CallTrackingIndex> {
    fn from_ref(state: &AppState) -> Self {
        state.tracking.clone()
    }
}
