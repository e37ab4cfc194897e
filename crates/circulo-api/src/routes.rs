use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{load_session, require_auth};
use crate::state::AppState;
use crate::{auth, comments, feed, follows, profile};

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(feed::index))
        .route("/register/", get(auth::register_page).post(auth::register))
        .route("/login/", get(auth::login_page).post(auth::login))
        .route("/logout/", get(auth::logout).post(auth::logout))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/profile/", get(profile::own_profile).post(profile::post_comment))
        .route(
            "/profile/edit/",
            get(profile::edit_profile_page).post(profile::edit_profile),
        )
        .route("/profile/{username}/", get(profile::other_profile))
        .route("/profile/{username}/follow/", post(follows::follow_user))
        .route("/profile/{username}/unfollow/", post(follows::unfollow_user))
        .route(
            "/delete_comment/{comment_id}/",
            get(comments::delete_comment_page).post(comments::delete_comment),
        )
        .route(
            "/edit_comment/{comment_id}/",
            get(comments::edit_comment_page).post(comments::edit_comment),
        )
        .route("/following/", get(follows::following_list))
        .route("/followers/", get(follows::followers_list))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(state.clone(), load_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
