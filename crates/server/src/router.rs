use super::{handlers, state::AppState};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Chat
        .route(
            "/api/chat/sessions",
            get(handlers::chat::list_sessions).post(handlers::chat::create_session),
        )
        .route(
            "/api/chat/sessions/{id}",
            delete(handlers::chat::delete_session),
        )
        .route(
            "/api/chat/sessions/{id}/messages",
            get(handlers::chat::list_messages).post(handlers::chat::post_message),
        )
        // Data sources
        .route(
            "/api/datasources",
            get(handlers::datasource::list).post(handlers::datasource::create),
        )
        .route(
            "/api/datasources/{id}",
            get(handlers::datasource::get)
                .put(handlers::datasource::update)
                .delete(handlers::datasource::delete),
        )
        .route("/api/datasources/test", post(handlers::datasource::test_ad_hoc))
        .route("/api/datasources/{id}/test", post(handlers::datasource::test))
        .route(
            "/api/datasources/{id}/sync-schema",
            post(handlers::datasource::sync_schema),
        )
        .route(
            "/api/datasources/{id}/sync-progress",
            get(handlers::datasource::sync_progress),
        )
        // Knowledge base
        .route(
            "/api/knowledge/terms",
            get(handlers::knowledge::list_terms).post(handlers::knowledge::create_term),
        )
        .route(
            "/api/knowledge/terms/{id}",
            delete(handlers::knowledge::delete_term),
        )
        .route(
            "/api/knowledge/examples",
            get(handlers::knowledge::list_examples).post(handlers::knowledge::create_example),
        )
        .route(
            "/api/knowledge/examples/{id}",
            delete(handlers::knowledge::delete_example),
        )
        // Runtime configuration
        .route(
            "/api/config",
            get(handlers::admin::get_config).put(handlers::admin::put_config),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
