use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use minijinja::context;

use circulo_types::api::Claims;
use circulo_types::models::Comment;

use crate::error::AppError;
use crate::state::{AppState, run_db};

/// GET / — comments from followed users posted since each follow began.
/// Anonymous visitors get an empty feed.
pub async fn index(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
) -> Result<Response, AppError> {
    let (viewer, feed): (Option<String>, Vec<Comment>) = match claims {
        Some(Extension(claims)) => {
            let (viewer_id, limit) = (claims.sub, state.feed_limit);
            let feed = run_db(&state, move |db| db.feed(viewer_id, limit)).await?;
            (Some(claims.username), feed)
        }
        None => (None, Vec::new()),
    };

    let page = state
        .templates
        .render("index.html", context! { viewer => viewer, feed => feed })?;
    Ok(page.into_response())
}
