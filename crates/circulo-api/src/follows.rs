use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use tracing::{info, warn};

use circulo_types::api::Claims;
use circulo_types::models::{FollowEntry, FollowOutcome};

use crate::error::AppError;
use crate::state::{AppState, run_db};

/// POST /profile/{username}/follow/
pub async fn follow_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let viewer = claims.sub;
    let target = username.clone();
    let outcome = run_db(&state, move |db| {
        let Some(user) = db.get_user_by_username(&target)? else {
            return Ok(None);
        };
        db.follow(viewer, user.id, chrono::Utc::now()).map(Some)
    })
    .await?
    .ok_or(AppError::NotFound)?;

    match outcome {
        FollowOutcome::Created => info!("{} followed {}", claims.username, username),
        FollowOutcome::AlreadyFollowing => {}
        FollowOutcome::SelfFollow => {
            warn!("{} tried to follow themselves", claims.username);
            return Ok(Redirect::to("/profile/").into_response());
        }
    }

    Ok(Redirect::to(&profile_url(&username)).into_response())
}

/// POST /profile/{username}/unfollow/
pub async fn unfollow_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let viewer = claims.sub;
    let target = username.clone();
    let removed = run_db(&state, move |db| {
        let Some(user) = db.get_user_by_username(&target)? else {
            return Ok(None);
        };
        db.unfollow(viewer, user.id).map(Some)
    })
    .await?
    .ok_or(AppError::NotFound)?;

    if removed {
        info!("{} unfollowed {}", claims.username, username);
    }

    Ok(Redirect::to(&profile_url(&username)).into_response())
}

/// GET /following/
pub async fn following_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let viewer = claims.sub;
    let entries = run_db(&state, move |db| db.following(viewer)).await?;
    render_list(&state, &claims, "Following", "You are not following anyone yet.", &entries)
}

/// GET /followers/
pub async fn followers_list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let viewer = claims.sub;
    let entries = run_db(&state, move |db| db.followers(viewer)).await?;
    render_list(&state, &claims, "Followers", "Nobody follows you yet.", &entries)
}

fn render_list(
    state: &AppState,
    claims: &Claims,
    heading: &str,
    empty_message: &str,
    entries: &[FollowEntry],
) -> Result<Response, AppError> {
    let page = state.templates.render(
        "follow_list.html",
        context! {
            viewer => &claims.username,
            heading => heading,
            empty_message => empty_message,
            entries => entries,
        },
    )?;
    Ok(page.into_response())
}

fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}
