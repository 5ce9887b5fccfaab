use std::sync::Arc;

use anyhow::anyhow;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use sensorhub_api::models::*;
use url::Url;

use crate::errors::{ApiError, AuthError};
use crate::middlewares::AUTH_COOKIE;
use crate::models::User;
use crate::repositories::UserRepository;
use crate::services::{AuthService, TokenService};

const DEFAULT_LANDING: &str = "/dashboard";
const SAME_SITE_BASE: &str = "http://sensorhub.local";

#[derive(Clone)]
pub struct AuthState {
    pub auth_service: Arc<AuthService>,
    pub token_service: Arc<TokenService>,
    pub user_repository: Arc<UserRepository>,
    pub cookie_secure: bool,
}

pub fn auth_router(auth_state: AuthState) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/web-login", post(web_login))
        .route("/api/logout", post(logout))
        .with_state(auth_state)
}

/// Checks the credentials and mints a session token for the account.
async fn authenticate(state: &AuthState, email: &str, password: &str) -> Result<(User, String), ApiError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }

    let user = state
        .user_repository
        .find_by_email(email.trim())
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let result = state
        .auth_service
        .verify(&user, password)
        .map_err(|e| anyhow!("Failed to verify password: {}", e))?;

    if !result {
        return Err(AuthError::InvalidPassword.into());
    }

    let token = state
        .token_service
        .generate_token(&user)
        .map_err(|e| anyhow!("Failed to generate token: {}", e))?;

    Ok((user, token))
}

fn session_cookie(state: &AuthState, token: String) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(state.token_service.expiration() as i64))
        .build()
}

/// Browsers read a backslash as `/`, so backslashes and control characters are
/// rejected before resolving the path against a fixed origin.
fn is_same_site_path(path: &str) -> bool {
    if !path.starts_with('/') || path.starts_with("//") {
        return false;
    }

    if path.contains('\\') || path.chars().any(char::is_control) {
        return false;
    }

    let Ok(base) = Url::parse(SAME_SITE_BASE) else {
        return false;
    };

    base.join(path).is_ok_and(|resolved| resolved.origin() == base.origin())
}

/// Only same-site paths are followed after login.
fn landing_path(return_url: Option<&str>) -> &str {
    match return_url {
        Some(url) if is_same_site_path(url) && url != "/login" => url,
        _ => DEFAULT_LANDING,
    }
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, return user token", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 404, description = "User not found"),
        (status = 401, description = "Invalid password"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let Json(body) = body.map_err(|_| AuthError::MissingCredentials)?;

    let (user, token) = authenticate(&state, &body.email, &body.password).await?;

    tracing::info!("user {} logged in", user.email);

    let jar = jar.add(session_cookie(&state, token.clone()));

    Ok((
        jar,
        Json(LoginResponse {
            token,
            user: user.into(),
            message: String::from("Login successful"),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/web-login",
    tag = "auth",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "email, password and optional returnUrl"
    ),
    responses(
        (status = 303, description = "Redirect to the requested page, or back to /login with an error code")
    )
)]
pub async fn web_login(State(state): State<AuthState>, jar: CookieJar, Form(form): Form<WebLoginForm>) -> Response {
    let email = form.email.unwrap_or_default();
    let password = form.password.unwrap_or_default();
    let return_url = form.return_url.filter(|url| !url.is_empty());

    match authenticate(&state, &email, &password).await {
        Ok((user, token)) => {
            tracing::info!("user {} logged in from the web form", user.email);

            let jar = jar.add(session_cookie(&state, token));
            (jar, Redirect::to(landing_path(return_url.as_deref()))).into_response()
        }
        Err(e) => {
            let code = match &e {
                ApiError::AuthError(AuthError::MissingCredentials) => "missing_credentials",
                ApiError::AuthError(AuthError::UserNotFound) => "user_not_found",
                ApiError::AuthError(AuthError::InvalidPassword) => "invalid_password",
                _ => {
                    tracing::error!("web login failed: {}", e);
                    "login_failed"
                }
            };

            let mut location = format!("/login?error={code}");
            if let Some(return_url) = return_url {
                let encoded: String = url::form_urlencoded::byte_serialize(return_url.as_bytes()).collect();
                location.push_str(&format!("&returnUrl={encoded}"));
            }

            Redirect::to(&location).into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Cookie cleared (JSON clients)", body = MessageResponse),
        (status = 303, description = "Cookie cleared, redirect to /login (browsers)")
    )
)]
pub async fn logout(headers: HeaderMap, jar: CookieJar) -> Response {
    // The token itself stays valid until it expires
    let jar = jar.remove(Cookie::build(AUTH_COOKIE).path("/"));

    let wants_json = headers
        .get(header::ACCEPT)
        .and_then(|accept| accept.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"));

    if wants_json {
        (
            jar,
            Json(MessageResponse {
                message: String::from("Logged out successfully"),
            }),
        )
            .into_response()
    } else {
        (jar, Redirect::to("/login?message=logged_out")).into_response()
    }
}
