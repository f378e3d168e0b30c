/// Authentication Routes
///
/// Thin HTTP adapter over the session facade. The refresh token travels in an
/// HttpOnly cookie; the access token is returned in the JSON body.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::Claims;
use crate::error::{AppError, AuthError};
use crate::session::{SessionFacade, SessionTokens};

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Attributes applied to the refresh token cookie
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    fn refresh_cookie(&self, tokens: &SessionTokens) -> Cookie<'static> {
        Cookie::build(REFRESH_COOKIE, tokens.refresh_token.clone())
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(tokens.refresh_expires_in))
            .finish()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(REFRESH_COOKIE, "")
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .finish();
        cookie.make_removal();
        cookie
    }
}

/// Signup and login request body
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: String,
    pub refresh_token_expires_in: i64,
    pub user_id: String,
}

impl AuthResponse {
    fn new(message: &str, tokens: SessionTokens) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            access_token: tokens.access_token,
            token_type: "bearer".to_string(),
            expires_in: tokens.access_expires_in,
            refresh_token: tokens.refresh_token,
            refresh_token_expires_in: tokens.refresh_expires_in,
            user_id: tokens.user_id,
        }
    }
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub is_active: bool,
}

/// POST /auth/signup
///
/// # Errors
/// - 400: Invalid email or weak password
/// - 409: Email already registered
pub async fn signup(
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionFacade>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let tokens = sessions.signup(&form.email, &form.password).await?;

    Ok(HttpResponse::Created()
        .cookie(cookies.refresh_cookie(&tokens))
        .json(AuthResponse::new("Account created", tokens)))
}

/// POST /auth/login
///
/// Unknown email and wrong password share one 401 response.
pub async fn login(
    form: web::Json<CredentialsRequest>,
    sessions: web::Data<SessionFacade>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let tokens = sessions.login(&form.email, &form.password).await?;

    Ok(HttpResponse::Ok()
        .cookie(cookies.refresh_cookie(&tokens))
        .json(AuthResponse::new("Logged in", tokens)))
}

/// POST /auth/refresh
///
/// Rotates the refresh token held in the cookie.
///
/// # Errors
/// - 401 `MISSING_TOKEN`: no refresh cookie
/// - 401 `TOKEN_INVALID` / `TOKEN_EXPIRED` / `TOKEN_REUSE_DETECTED`
/// - 403: Account deactivated since the token was issued
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionFacade>,
    cookies: web::Data<CookiePolicy>,
) -> Result<HttpResponse, AppError> {
    let presented = req
        .cookie(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let tokens = sessions.refresh(&presented).await?;

    Ok(HttpResponse::Ok()
        .cookie(cookies.refresh_cookie(&tokens))
        .json(AuthResponse::new("Token refreshed", tokens)))
}

/// POST /auth/logout
///
/// Always succeeds and clears the cookie.
pub async fn logout(
    req: HttpRequest,
    sessions: web::Data<SessionFacade>,
    cookies: web::Data<CookiePolicy>,
) -> HttpResponse {
    if let Some(cookie) = req.cookie(REFRESH_COOKIE) {
        sessions.logout(cookie.value()).await;
    }

    HttpResponse::Ok()
        .cookie(cookies.removal_cookie())
        .json(serde_json::json!({
            "success": true,
            "message": "Logged out",
        }))
}

/// GET /auth/me
///
/// Claims are injected by the access token middleware.
pub async fn me(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionFacade>,
) -> Result<HttpResponse, AppError> {
    let user = sessions.current_user(&claims.sub).await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id.to_string(),
        email: user.email,
        is_active: user.is_active,
    }))
}
