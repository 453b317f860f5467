//! Account route handlers: registration, login, logout, profile.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::invalid_form;
use crate::db::{FavoriteStore, UserStore};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::forms::{FormErrors, LoginForm, RegisterForm, safe_next};
use crate::middleware::{
    FlashLevel, PageContext, RequireAuth, clear_current_user, push_flash, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService, CartService};
use crate::state::AppState;

/// Registration page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: RegisterForm,
    pub errors: FormErrors,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub next: String,
    pub errors: FormErrors,
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/profile.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub user: User,
    pub favorites: u64,
    pub cart_items: u64,
}

/// `?next=` on the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[instrument(skip(page))]
pub async fn register_page(page: PageContext) -> RegisterTemplate {
    RegisterTemplate {
        page,
        form: RegisterForm::default(),
        errors: FormErrors::default(),
    }
}

/// Create an account with the `user` role and log it in.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let result = match form.check() {
        Ok(()) => AuthService::new(state.repo())
            .register(&form.username, &form.email, &form.password1)
            .await
            .map_err(registration_errors),
        Err(errors) => Err(Ok(errors)),
    };

    let user = match result {
        Ok(user) => user,
        Err(Ok(errors)) => {
            let form = RegisterForm {
                password1: String::new(),
                password2: String::new(),
                ..form
            };
            let page = PageContext::load(&session).await;
            return Ok(invalid_form(RegisterTemplate { page, form, errors }));
        }
        Err(Err(e)) => return Err(e.into()),
    };

    log_in(&session, &user).await?;
    push_flash(
        &session,
        FlashLevel::Success,
        format!("Welcome, {}!", user.username),
    )
    .await?;
    Ok(Redirect::to("/").into_response())
}

/// Sort registration failures into form errors and real errors.
fn registration_errors(err: AuthError) -> std::result::Result<FormErrors, AuthError> {
    let mut errors = FormErrors::default();
    match err {
        AuthError::UserAlreadyExists => {
            errors.add("username", "A user with that username already exists.");
        }
        AuthError::InvalidUsername(e) => errors.add("username", e.to_string()),
        AuthError::InvalidEmail(e) => errors.add("email", e.to_string()),
        AuthError::WeakPassword(message) => errors.add("password1", message),
        other => return Err(other),
    }
    Ok(errors)
}

#[instrument(skip(page))]
pub async fn login_page(page: PageContext, Query(query): Query<NextQuery>) -> LoginTemplate {
    LoginTemplate {
        page,
        username: String::new(),
        next: safe_next(query.next.as_deref()),
        errors: FormErrors::default(),
    }
}

/// Check credentials and follow `next` on success.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref());

    let errors = match form.check() {
        Ok(()) => match AuthService::new(state.repo())
            .login(&form.username, &form.password)
            .await
        {
            Ok(user) => {
                log_in(&session, &user).await?;
                push_flash(
                    &session,
                    FlashLevel::Success,
                    format!("Welcome, {}!", user.username),
                )
                .await?;
                return Ok(Redirect::to(&next).into_response());
            }
            Err(AuthError::InvalidCredentials) => {
                tracing::info!("Login rejected");
                let mut errors = FormErrors::default();
                errors.add(FormErrors::FORM, "Invalid username or password.");
                errors
            }
            Err(e) => return Err(AppError::Auth(e)),
        },
        Err(errors) => errors,
    };

    let page = PageContext::load(&session).await;
    Ok(invalid_form(LoginTemplate {
        page,
        username: form.username,
        next,
        errors,
    }))
}

#[instrument(skip(session, user), fields(user_id = %user.id))]
pub async fn logout(RequireAuth(user): RequireAuth, session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    tracing::info!("User logged out");
    push_flash(&session, FlashLevel::Info, "You have been logged out.").await?;
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, current, page), fields(user_id = %current.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    page: PageContext,
) -> Result<ProfileTemplate> {
    let user = state
        .repo()
        .get_user(current.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", current.id)))?;
    let favorites = state.repo().count_favorites(user.id).await?;
    let cart_items = CartService::new(state.repo())
        .contents(user.id)
        .await?
        .summary()
        .total_items;

    Ok(ProfileTemplate {
        page,
        user,
        favorites,
        cart_items,
    })
}

async fn log_in(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, user.username.as_str());
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(())
}
