use axum::extract::Query;
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum::{Extension, Router, middleware};
use serde::Deserialize;

use crate::middlewares::{TokenState, page_auth};
use crate::services::TokenClaims;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

pub fn view_router(token_state: TokenState) -> Router {
    let pages = Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard))
        .route_layer(middleware::from_fn_with_state(token_state, page_auth));

    Router::new().route("/login", get(login_page)).merge(pages)
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn notice(query: &LoginPageQuery) -> Option<&'static str> {
    match query.error.as_deref() {
        Some("missing_credentials") => Some("Email and password are required."),
        Some("user_not_found") => Some("User not found. Please check your email."),
        Some("invalid_password") => Some("Invalid password. Please try again."),
        Some(_) => Some("Login failed. Please try again."),
        None => match query.message.as_deref() {
            Some("logged_out") => Some("You have been logged out."),
            _ => None,
        },
    }
}

pub async fn login_page(Query(query): Query<LoginPageQuery>) -> Html<String> {
    let notice = notice(&query)
        .map(|text| format!("<p class=\"notice\">{text}</p>"))
        .unwrap_or_default();
    let return_url = escape_html(query.return_url.as_deref().unwrap_or_default());

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Login | Sensor Hub</title></head>
<body>
<h1>Sensor Hub</h1>
{notice}
<form method="post" action="/api/web-login">
<input type="hidden" name="returnUrl" value="{return_url}">
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Login</button>
</form>
</body>
</html>"#
    ))
}

pub async fn index() -> Redirect {
    Redirect::to("/dashboard")
}

pub async fn dashboard(Extension(claims): Extension<TokenClaims>) -> Html<String> {
    let name = escape_html(&claims.name);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Dashboard | Sensor Hub</title></head>
<body data-dashboard-endpoint="/api/dashboard/data" data-chart-endpoint="/api/sensors/chart">
<h1>Sensor Hub</h1>
<p>Signed in as {name}</p>
<form method="post" action="/api/logout"><button type="submit">Logout</button></form>
<main id="dashboard"></main>
</body>
</html>"#
    ))
}
