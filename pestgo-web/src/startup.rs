use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
    REQUEST_ID_HEADER,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{
    app::{dashboard, fallback, health_check},
    auth::{signin_handler, signin_page, signout_handler, signup_handler, signup_page},
    customers::{create_customer, delete_customer, list_customers, update_customer},
    language::set_language,
    metrics::metrics,
    pages::placeholder,
    settings::{settings_page, update_settings},
    visits::{create_visit, delete_visit, list_visits, update_visit},
};
use crate::middleware::{access_guard, metrics_middleware};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    // Every page, public or protected, goes through the access guard
    let pages = Router::new()
        .route("/", get(dashboard))
        .route("/auth/signin", get(signin_page).post(signin_handler))
        .route("/auth/signup", get(signup_page).post(signup_handler))
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/:id", post(update_customer))
        .route("/customers/:id/delete", post(delete_customer))
        .route("/visits", get(list_visits).post(create_visit))
        .route("/visits/:id", post(update_visit))
        .route("/visits/:id/delete", post(delete_visit))
        .route("/settings", get(settings_page).post(update_settings))
        .route("/operators", get(placeholder))
        .route("/equipment", get(placeholder))
        .route("/materials", get(placeholder))
        .route("/warehouse", get(placeholder))
        .route("/service-requests", get(placeholder))
        .route("/reports", get(placeholder))
        .route("/companies", get(placeholder))
        .route("/branches", get(placeholder))
        .route_layer(from_fn_with_state(state.clone(), access_guard));

    Router::new()
        .merge(pages)
        .route("/auth/signout", post(signout_handler))
        .route("/language", post(set_language))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
