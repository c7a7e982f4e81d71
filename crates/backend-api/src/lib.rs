mod docs;
mod error;
mod state;
mod util;

pub mod routes;

pub use docs::ApiDoc;
pub use error::{ApiError, ErrorResponse};
pub use state::{AppState, Learners, SessionAuthenticator};

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{get, post, put},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        // Auth
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        // Subscriptions
        .route("/api/payments/confirm", post(routes::payments::confirm_payment))
        .route("/api/subscription", get(routes::payments::get_subscription))
        // Progress
        .route("/api/progress/lessons", post(routes::progress::complete_lesson))
        .route(
            "/api/progress/modules/:module_id",
            post(routes::progress::complete_module),
        )
        .route("/api/progress/time", post(routes::progress::add_time_spent))
        .route("/api/dashboard", get(routes::progress::dashboard))
        .route(
            "/api/modules/:module_id/access",
            get(routes::progress::module_access),
        )
        // Engagement
        .route("/api/questions", post(routes::questions::ask_question))
        .route(
            "/api/questions/:id/answer",
            post(routes::questions::answer_question),
        )
        .route(
            "/api/questions/:id/close",
            post(routes::questions::close_question),
        )
        .route("/api/comments", post(routes::comments::create_comment))
        .route("/api/comments/:id", put(routes::comments::update_comment))
        .route(
            "/api/notifications",
            get(routes::notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            post(routes::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/:id/read",
            post(routes::notifications::mark_notification_read),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
