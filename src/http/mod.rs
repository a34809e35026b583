//! HTTP + WebSocket façade (spec.md §6).
//!
//! Every JSON route returns the uniform `{code, message, data?}` envelope;
//! the session endpoint is the one upgrade route outside that shape.

pub mod contact;
pub mod envelope;
pub mod group;
pub mod message;
pub mod session;
pub mod user;
pub mod ws;

use axum::Router;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let avatar_dir = state.config.static_src.avatar_path.clone();
    let file_dir = state.config.static_src.file_path.clone();

    Router::new()
        .route("/user/register", post(user::register))
        .route("/user/login", post(user::login))
        .route("/user/delete", post(user::delete))
        .route("/user/get", post(user::get))
        .route("/user/update", post(user::update))
        .route("/user/list", post(user::list))
        .route("/user/enable", post(user::enable))
        .route("/user/disable", post(user::disable))
        .route("/user/set-admin", post(user::set_admin))
        .route("/group/create", post(group::create))
        .route("/group/load-my", post(group::load_my))
        .route("/group/load-joined", post(group::load_joined))
        .route("/group/check-add-mode", post(group::check_add_mode))
        .route("/group/enter", post(group::enter))
        .route("/group/leave", post(group::leave))
        .route("/group/dismiss", post(group::dismiss))
        .route("/group/info", post(group::info))
        .route("/group/info-list", get(group::info_list))
        .route("/group/delete", post(group::delete))
        .route("/group/set-status", post(group::set_status))
        .route("/group/update", post(group::update))
        .route("/group/members", post(group::members))
        .route("/group/remove-members", post(group::remove_members))
        .route("/contact/list", post(contact::list))
        .route("/contact/info", post(contact::info))
        .route("/contact/delete", post(contact::delete))
        .route("/contact/apply", post(contact::apply))
        .route("/contact/new-list", post(contact::new_list))
        .route("/contact/pass-apply", post(contact::pass_apply))
        .route("/contact/refuse-apply", post(contact::refuse_apply))
        .route("/contact/black", post(contact::black))
        .route("/contact/cancel-black", post(contact::cancel_black))
        .route("/contact/add-group-list", post(contact::add_group_list))
        .route("/contact/black-apply", post(contact::black_apply))
        .route("/session/open", post(session::open))
        .route("/session/check-allowed", post(session::check_allowed))
        .route("/session/user-list", post(session::user_list))
        .route("/session/group-list", post(session::group_list))
        .route("/session/delete", post(session::delete))
        .route("/message/list", post(message::list))
        .route("/message/group-list", post(message::group_list))
        .route("/message/upload-avatar", post(message::upload_avatar))
        .route("/message/upload-file", post(message::upload_file))
        .route("/ws/login", get(ws::login))
        .route("/ws/logout", post(ws::logout))
        .route("/metrics", get(metrics_handler))
        .nest_service("/static/avatars", ServeDir::new(avatar_dir))
        .nest_service("/static/files", ServeDir::new(file_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn metrics_handler() -> String {
    crate::metrics::gather()
}
