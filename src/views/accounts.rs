use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use super::page::{csrf_token, escape, Page, PageContext};
use crate::{auth::AuthError, errors::ServiceError, views::part::PART_INDEX_URL, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// Only same-site paths are followed after login: no `//host`, `/\host`
/// or control characters
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(next)
            if next.starts_with('/')
                && !next[1..].starts_with(['/', '\\'])
                && !next.chars().any(char::is_control) =>
        {
            next
        }
        _ => PART_INDEX_URL,
    }
}

fn login_page(
    headers: &HeaderMap,
    next: &str,
    error: Option<&str>,
) -> Result<Response, ServiceError> {
    let token = csrf_token();
    let mut ctx = PageContext::new();
    ctx.insert("csrf_token", &token)?
        .insert("next", next)?
        .insert("error", &error)?;

    let body = format!(
        "{error}<form method=\"post\" action=\"/accounts/login/\">\n\
         <input type=\"hidden\" name=\"csrfmiddlewaretoken\" value=\"{token}\">\n\
         <input type=\"hidden\" name=\"next\" value=\"{next}\">\n\
         <label>Username <input type=\"text\" name=\"username\"></label>\n\
         <label>Password <input type=\"password\" name=\"password\"></label>\n\
         <button type=\"submit\">Log in</button>\n</form>\n",
        error = error
            .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
            .unwrap_or_default(),
        token = token,
        next = escape(next),
    );

    Ok(Page::new("Log in", ctx).body(body).render(headers, None))
}

/// `GET /accounts/login/`
pub async fn login_form(
    Query(params): Query<NextParam>,
    headers: HeaderMap,
) -> Result<Response, ServiceError> {
    login_page(&headers, safe_next(params.next.as_deref()), None)
}

/// `POST /accounts/login/`
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, ServiceError> {
    let next = safe_next(form.next.as_deref()).to_string();
    let auth = &state.services.auth;

    match auth.authenticate(&form.username, &form.password).await {
        Ok(user) => {
            let token = auth.generate_token(&user)?;
            info!(username = %user.username, "User logged in");
            Ok((
                [(header::SET_COOKIE, auth.session_cookie(&token.token))],
                Redirect::to(&next),
            )
                .into_response())
        }
        Err(e @ (AuthError::InvalidCredentials | AuthError::InactiveUser)) => {
            warn!(username = %form.username, "Login failed");
            login_page(&headers, &next, Some(&e.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET|POST /accounts/logout/`
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, state.services.auth.clear_session_cookie())],
        Redirect::to(crate::auth::LOGIN_URL),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_be_local() {
        assert_eq!(safe_next(Some("/build/1/")), "/build/1/");
        assert_eq!(safe_next(Some("https://evil.test/")), PART_INDEX_URL);
        assert_eq!(safe_next(Some("//evil.test/")), PART_INDEX_URL);
        assert_eq!(safe_next(Some("/\\evil.test/")), PART_INDEX_URL);
        assert_eq!(safe_next(Some("/\t/evil.test/")), PART_INDEX_URL);
        assert_eq!(safe_next(Some("/part/?search=a\\b")), "/part/?search=a\\b");
        assert_eq!(safe_next(None), PART_INDEX_URL);
    }
}
