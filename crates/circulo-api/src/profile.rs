use axum::{
    Extension, Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use minijinja::context;
use tracing::info;

use circulo_types::api::Claims;
use circulo_types::forms::{CommentForm, FormErrors, ProfileForm};
use circulo_types::models::{Comment, Follow, FollowCounts, Profile};

use crate::error::AppError;
use crate::state::{AppState, run_db};

/// Comments listed on a profile page.
const PROFILE_COMMENT_LIMIT: u32 = 200;

/// GET /profile/ — own profile, own comments and the comment form.
pub async fn own_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    render_own(&state, &claims, &CommentForm::default(), &FormErrors::default()).await
}

/// POST /profile/ — post a comment as the viewer.
pub async fn post_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let content = match form.validate() {
        Ok(content) => content,
        Err(errors) => return render_own(&state, &claims, &form, &errors).await,
    };

    let author = claims.sub;
    let id = run_db(&state, move |db| {
        db.create_comment(author, &content, chrono::Utc::now())
    })
    .await?;
    info!("{} posted comment {}", claims.username, id);

    Ok(Redirect::to("/profile/").into_response())
}

pub async fn edit_profile_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let user_id = claims.sub;
    let profile = run_db(&state, move |db| db.get_profile(user_id))
        .await?
        .ok_or(AppError::NotFound)?;
    render_edit(&state, &claims, &ProfileForm::from_profile(&profile), &FormErrors::default())
}

/// POST /profile/edit/ — full replace of every profile field.
pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let update = match form.validate() {
        Ok(update) => update,
        Err(errors) => return render_edit(&state, &claims, &form, &errors),
    };

    let user_id = claims.sub;
    let updated = run_db(&state, move |db| db.update_profile(user_id, &update)).await?;
    if !updated {
        return Err(AppError::NotFound);
    }
    info!("{} updated their profile", claims.username);

    Ok(Redirect::to("/profile/").into_response())
}

/// GET /profile/{username}/ — read-only view of someone else's profile.
pub async fn other_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, AppError> {
    let viewer = claims.sub;
    let lookup = run_db(&state, move |db| {
        let Some(user) = db.get_user_by_username(&username)? else {
            return Ok(Lookup::Missing);
        };
        if user.id == viewer {
            return Ok(Lookup::Own);
        }
        let Some(profile) = db.get_profile(user.id)? else {
            return Ok(Lookup::Missing);
        };
        Ok(Lookup::Found {
            comments: db.comments_by_author(user.id, PROFILE_COMMENT_LIMIT)?,
            counts: db.follow_counts(user.id)?,
            follow: db.get_follow(viewer, user.id)?,
            profile,
        })
    })
    .await?;

    match lookup {
        Lookup::Missing => Err(AppError::NotFound),
        // The editable page lives at /profile/.
        Lookup::Own => Ok(Redirect::to("/profile/").into_response()),
        Lookup::Found {
            profile,
            comments,
            counts,
            follow,
        } => {
            let page = state.templates.render(
                "profile.html",
                context! {
                    viewer => claims.username,
                    profile => profile,
                    comments => comments,
                    counts => counts,
                    is_own => false,
                    is_following => follow.is_some(),
                    follow => follow,
                },
            )?;
            Ok(page.into_response())
        }
    }
}

enum Lookup {
    Missing,
    Own,
    Found {
        profile: Profile,
        comments: Vec<Comment>,
        counts: FollowCounts,
        follow: Option<Follow>,
    },
}

async fn render_own(
    state: &AppState,
    claims: &Claims,
    form: &CommentForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let user_id = claims.sub;
    let (profile, comments, counts) = run_db(state, move |db| {
        let profile = db.get_profile(user_id)?;
        let comments = db.comments_by_author(user_id, PROFILE_COMMENT_LIMIT)?;
        let counts = db.follow_counts(user_id)?;
        Ok((profile, comments, counts))
    })
    .await?;
    let profile = profile.ok_or(AppError::NotFound)?;

    let page = state.templates.render(
        "profile.html",
        context! {
            viewer => &claims.username,
            profile => profile,
            comments => comments,
            counts => counts,
            is_own => true,
            form => form,
            errors => errors,
        },
    )?;
    Ok(page.into_response())
}

fn render_edit(
    state: &AppState,
    claims: &Claims,
    form: &ProfileForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let page = state.templates.render(
        "profile_edit.html",
        context! { viewer => &claims.username, form => form, errors => errors },
    )?;
    Ok(page.into_response())
}
