use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/select", post(handlers::select_day))
        .route("/emoji", post(handlers::pick_emoji))
        .route("/comment", post(handlers::save_comment))
        .route("/nav/prev", post(handlers::nav_prev))
        .route("/nav/next", post(handlers::nav_next))
        .route("/nav/goto", post(handlers::nav_goto))
        .route("/clear", post(handlers::clear_all))
        .route("/token", post(handlers::set_token))
        .route("/token/clear", post(handlers::clear_token))
        .route("/cloud/save", post(handlers::cloud_save))
        .route("/cloud/load", post(handlers::cloud_load))
        .route("/moods.json", get(handlers::download))
        .route("/api/calendar", get(handlers::get_calendar))
        .route("/api/status", get(handlers::get_status))
        .route(
            "/api/moods",
            get(handlers::get_moods).delete(handlers::api_clear_all),
        )
        .route(
            "/api/moods/:key",
            put(handlers::put_mood).delete(handlers::delete_mood),
        )
        .route("/api/moods/:key/comment", put(handlers::put_comment))
        .route("/api/select", post(handlers::api_select))
        .route("/api/emoji", post(handlers::api_emoji))
        .route("/api/cloud/save", post(handlers::api_cloud_save))
        .route("/api/cloud/load", post(handlers::api_cloud_load))
        .route(
            "/api/token",
            put(handlers::api_set_token).delete(handlers::api_clear_token),
        )
        .with_state(state)
}
