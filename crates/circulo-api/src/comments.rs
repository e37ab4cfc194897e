use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use tracing::{info, warn};

use circulo_types::api::Claims;
use circulo_types::forms::{CommentForm, FormErrors};
use circulo_types::models::{Comment, CommentChange};

use crate::error::AppError;
use crate::state::{AppState, run_db};

/// GET /edit_comment/{id}/ — edit form, prefilled. Someone else's comment is a 404.
pub async fn edit_comment_page(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let comment = own_comment(&state, comment_id, &claims).await?;
    let form = CommentForm {
        content: comment.content.clone(),
    };
    render_edit(&state, &claims, &comment, &form, &FormErrors::default())
}

pub async fn edit_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let content = match form.validate() {
        Ok(content) => content,
        Err(errors) => {
            let comment = own_comment(&state, comment_id, &claims).await?;
            return render_edit(&state, &claims, &comment, &form, &errors);
        }
    };

    let author = claims.sub;
    let change = run_db(&state, move |db| {
        db.update_comment(comment_id, author, &content, chrono::Utc::now())
    })
    .await?;
    applied(change, &claims, comment_id, "edit")?;
    info!("{} edited comment {}", claims.username, comment_id);

    Ok(Redirect::to("/profile/").into_response())
}

/// GET /delete_comment/{id}/ — confirmation page; nothing is deleted on GET.
pub async fn delete_comment_page(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let comment = own_comment(&state, comment_id, &claims).await?;
    let page = state.templates.render(
        "comment_delete.html",
        context! { viewer => &claims.username, comment => comment },
    )?;
    Ok(page.into_response())
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let author = claims.sub;
    let change = run_db(&state, move |db| db.delete_comment(comment_id, author)).await?;
    applied(change, &claims, comment_id, "delete")?;
    info!("{} deleted comment {}", claims.username, comment_id);

    Ok(Redirect::to("/profile/").into_response())
}

async fn own_comment(state: &AppState, comment_id: i64, claims: &Claims) -> Result<Comment, AppError> {
    let author = claims.sub;
    run_db(state, move |db| db.get_own_comment(comment_id, author))
        .await?
        .ok_or(AppError::NotFound)
}

fn applied(change: CommentChange, claims: &Claims, comment_id: i64, action: &str) -> Result<(), AppError> {
    match change {
        CommentChange::Applied => Ok(()),
        CommentChange::NotFound => {
            warn!("{} tried to {} comment {} they do not own", claims.username, action, comment_id);
            Err(AppError::NotFound)
        }
    }
}

fn render_edit(
    state: &AppState,
    claims: &Claims,
    comment: &Comment,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let page = state.templates.render(
        "comment_edit.html",
        context! { viewer => &claims.username, comment => comment, form => form, errors => errors },
    )?;
    Ok(page.into_response())
}
