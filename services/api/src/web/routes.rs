//! services/api/src/web/routes.rs
//!
//! Assembles the complete axum router.

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::web::{
    auth, comments, middleware::resolve_user, notices, notifications,
    rest::{health_handler, ApiDoc},
    state::AppState,
    ws_handler,
};

/// Builds the REST, WebSocket and Swagger routes over `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    let api_router = Router::new()
        .route("/health", get(health_handler))
        // --- Auth ---
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/me", get(auth::me_handler))
        // --- Notices ---
        .route(
            "/notices",
            get(notices::list_notices_handler).post(notices::create_notice_handler),
        )
        .route(
            "/notices/{id}",
            get(notices::get_notice_handler)
                .put(notices::update_notice_handler)
                .delete(notices::delete_notice_handler),
        )
        .route(
            "/notices/{id}/acknowledge",
            post(notices::acknowledge_notice_handler),
        )
        // --- Comments ---
        .route("/comments", post(comments::create_comment_handler))
        .route(
            "/comments/notice/{notice_id}",
            get(comments::list_comments_handler),
        )
        .route(
            "/comments/{id}",
            put(comments::update_comment_handler).delete(comments::delete_comment_handler),
        )
        // --- Notifications ---
        .route(
            "/notifications",
            get(notifications::list_notifications_handler),
        )
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count_handler),
        )
        .route(
            "/notifications/read-all",
            put(notifications::mark_all_read_handler),
        )
        .route(
            "/notifications/{id}/read",
            put(notifications::mark_read_handler),
        )
        .route(
            "/notifications/{id}",
            delete(notifications::delete_notification_handler),
        )
        // --- Realtime ---
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            resolve_user,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            error!("Invalid CORS_ORIGIN '{}': {}; cross-origin requests are disabled", origin, e);
            layer
        }
    }
}
