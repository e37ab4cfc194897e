use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use minijinja::context;
use tracing::{info, warn};
use uuid::Uuid;

use circulo_types::api::{Claims, NextQuery, safe_next};
use circulo_types::forms::{FormErrors, LoginForm, RegisterForm};

use crate::error::AppError;
use crate::middleware::SESSION_COOKIE;
use crate::state::{AppState, SessionSettings, run_db};

const LOGIN_FAILED: &str = "Invalid username or password.";

pub async fn register_page(State(state): State<AppState>) -> Result<Response, AppError> {
    render_register(&state, &RegisterForm::default(), &FormErrors::default())
}

/// POST /register/ — creates the user and its empty profile, then logs in.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let account = match form.validate() {
        Ok(account) => account,
        Err(errors) => return render_register(&state, &form, &errors),
    };

    let username = account.username.clone();
    let existing = run_db(&state, move |db| db.get_user_by_username(&username)).await?;
    if existing.is_some() {
        let mut errors = FormErrors::default();
        errors.add("username", "A user with that username already exists.");
        return render_register(&state, &form, &errors);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(account.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
        .to_string();

    let user_id = Uuid::new_v4();
    let username = account.username.clone();
    run_db(&state, move |db| {
        db.create_account(user_id, &username, &password_hash, chrono::Utc::now())
    })
    .await?;
    info!("Registered user {}", account.username);

    let token = create_token(&state.session, user_id, &account.username)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok((jar.add(session_cookie(&state.session, token)), Redirect::to("/")).into_response())
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<NextQuery>,
) -> Result<Response, AppError> {
    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };
    render_login(&state, &form, &FormErrors::default())
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        return render_login(&state, &form, &errors);
    }

    let username = form.username.trim().to_string();
    let lookup = username.clone();
    let user = run_db(&state, move |db| db.get_user_by_username(&lookup)).await?;

    let Some(user) = user.filter(|u| password_matches(&u.password, &form.password)) else {
        warn!("Failed login for {}", username);
        let mut errors = FormErrors::default();
        errors.add_non_field(LOGIN_FAILED);
        return render_login(&state, &form, &errors);
    };

    let token = create_token(&state.session, user.id, &user.username)
        .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;
    let target = safe_next(form.next.as_deref()).to_string();

    Ok((jar.add(session_cookie(&state.session, token)), Redirect::to(&target)).into_response())
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let removal = Cookie::build((SESSION_COOKIE, "")).path("/");
    (jar.remove(removal), Redirect::to("/"))
}

fn password_matches(stored: &str, candidate: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

fn render_register(
    state: &AppState,
    form: &RegisterForm,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let page = state
        .templates
        .render("register.html", context! { form => form, errors => errors })?;
    Ok(page.into_response())
}

fn render_login(state: &AppState, form: &LoginForm, errors: &FormErrors) -> Result<Response, AppError> {
    let page = state.templates.render(
        "login.html",
        context! { form => form, errors => errors, next => form.next.as_deref().unwrap_or("") },
    )?;
    Ok(page.into_response())
}

fn session_cookie(settings: &SessionSettings, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookies)
        .build()
}

pub fn create_token(settings: &SessionSettings, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(settings.ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )?;

    Ok(token)
}
