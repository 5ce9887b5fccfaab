use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, Header};

use crate::errors::{ApiError, AuthError};
use crate::services::{TokenClaims, TokenService};

/// Name of the cookie carrying the session token for browser pages.
pub const AUTH_COOKIE: &str = "authToken";

#[derive(Clone)]
pub struct TokenState {
    pub token_service: Arc<TokenService>,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let mut values = headers.get_all(header::AUTHORIZATION).iter();

    Authorization::<Bearer>::decode(&mut values)
        .ok()
        .map(|header| header.token().to_string())
}

/// API gate: requires `Authorization: Bearer <token>` and attaches [`TokenClaims`].
pub async fn auth(State(state): State<TokenState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    if !req.headers().contains_key(header::AUTHORIZATION) {
        return Err(AuthError::MissingToken.into());
    }

    let token = bearer_token(req.headers()).ok_or(AuthError::InvalidToken)?;

    let token_data = state
        .token_service
        .retrieve_token_claims(&token)
        .map_err(AuthError::from)?;

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}

/// Page gate: takes the token from the cookie or the header and sends the
/// browser to the login view when it is missing or invalid.
pub async fn page_auth(State(state): State<TokenState>, mut req: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let token = jar
        .get(AUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer_token(req.headers()));

    let claims: Option<TokenClaims> = token.and_then(|token| match state.token_service.retrieve_token_claims(&token) {
        Ok(token_data) => Some(token_data.claims),
        Err(e) => {
            tracing::debug!("reject page token: {}", e);
            None
        }
    });

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        None => {
            let requested = req
                .uri()
                .path_and_query()
                .map(|path| path.as_str())
                .unwrap_or("/");
            let return_url: String = url::form_urlencoded::byte_serialize(requested.as_bytes()).collect();

            Redirect::to(&format!("/login?returnUrl={return_url}")).into_response()
        }
    }
}
