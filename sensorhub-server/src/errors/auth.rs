use axum::http::StatusCode;
use jsonwebtoken::errors::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("User not found. Please check your email or sign up.")]
    UserNotFound,

    #[error("Invalid password. Please try again.")]
    InvalidPassword,

    #[error("Not authorized, no token provided.")]
    MissingToken,

    #[error("Not authorized, token failed or expired.")]
    InvalidToken,

    #[error("Not authorized, token failed or expired.")]
    TokenExpired,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidPassword => StatusCode::UNAUTHORIZED,
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}
