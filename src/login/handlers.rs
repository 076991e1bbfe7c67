use axum::{
    Form,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::AppState;

use super::{
    AuthError, clear_session_cookie_header, constant_time_eq, create_session, is_admin,
    session_cookie_header,
};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    password: String,
}

async fn render_login(app_state: &AppState, message: Option<&str>) -> Response {
    let mut globals = app_state.base_globals(false).await;
    globals.insert(
        "error".into(),
        liquid::model::Value::scalar(message.unwrap_or("").to_string()),
    );

    match app_state
        .template_engine
        .render_page("login.html.liquid", globals)
        .await
    {
        Ok(html) => html.into_response(),
        Err(status) => status.into_response(),
    }
}

pub async fn login_page(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    if is_admin(&headers, &app_state.settings.app.session_secret) {
        return Redirect::to("/admin").into_response();
    }
    render_login(&app_state, None).await
}

pub async fn login_submit(
    State(app_state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Response {
    let app = &app_state.settings.app;

    if !constant_time_eq(&form.password, &app.admin_password) {
        warn!("Admin login failed - invalid password");
        let mut response = render_login(&app_state, Some("Invalid password")).await;
        if response.status() == StatusCode::OK {
            *response.status_mut() = StatusCode::UNAUTHORIZED;
        }
        return response;
    }

    let max_age = chrono::Duration::days(app.session_max_age_days.into());
    let expires_at = (chrono::Utc::now() + max_age).timestamp();

    let token = match create_session(&app.session_secret, expires_at) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to create admin session: {}", e);
            return e.into_response();
        }
    };

    let cookie = match HeaderValue::from_str(&session_cookie_header(&token, max_age.num_seconds()))
    {
        Ok(cookie) => cookie,
        Err(e) => {
            error!("Failed to build session cookie: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    info!("Admin logged in");
    ([(SET_COOKIE, cookie)], Redirect::to("/admin")).into_response()
}

pub async fn logout() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = HeaderValue::from_str(&clear_session_cookie_header()) {
        headers.insert(SET_COOKIE, cookie);
    }

    info!("Admin logged out");
    (headers, Redirect::to("/"))
}

/// Guard for admin pages: anonymous visitors are sent to the login form.
pub async fn require_admin_page(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_admin(request.headers(), &app_state.settings.app.session_secret) {
        next.run(request).await
    } else {
        Redirect::to("/admin/login").into_response()
    }
}

/// Guard for the JSON admin API: anonymous callers get a 401 body.
pub async fn require_admin_api(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if is_admin(request.headers(), &app_state.settings.app.session_secret) {
        Ok(next.run(request).await)
    } else {
        Err(AuthError::Unauthorized)
    }
}
