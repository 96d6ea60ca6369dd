use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse},
        jwt::{AuthContext, JwtKeys},
        password::verify_password,
        repo_types::AccessToken,
    },
    error::{ApiError, FieldErrors},
    state::AppState,
};

pub const TOKEN_TYPE: &str = "Bearer";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Accepts the usual boolean spellings of form inputs: true/false, 1/0, "1"/"0".
fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Null => Some(false),
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.as_str() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

struct Credentials {
    email: String,
    password: String,
    remember_me: bool,
}

fn validate_login(req: LoginRequest) -> Result<Credentials, ApiError> {
    let mut errors = FieldErrors::default();

    let email = req.email.map(|e| e.trim().to_string()).unwrap_or_default();
    if email.is_empty() {
        errors.add("email", "The email field is required.");
    } else if !is_valid_email(&email) {
        errors.add("email", "The email must be a valid email address.");
    }

    let password = req.password.unwrap_or_default();
    if password.is_empty() {
        errors.add("password", "The password field is required.");
    }

    let remember_me = match req.remember_me.as_ref().map(parse_boolean) {
        None => false,
        Some(Some(b)) => b,
        Some(None) => {
            errors.add("remember_me", "The remember me field must be true or false.");
            false
        }
    };

    errors.into_result()?;
    Ok(Credentials {
        email,
        password,
        remember_me,
    })
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<LoginResponse, ApiError> {
    let creds = validate_login(req)?;

    let Some(user) = st.users.find_by_email(&creds.email).await? else {
        warn!(email = %creds.email, "login unknown email");
        return Err(ApiError::Unauthorized);
    };
    if !verify_password(&creds.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized);
    }

    let keys = JwtKeys::from_ref(st);
    let now = OffsetDateTime::now_utc();
    let token = AccessToken::new(user.id, keys.expiry(now, creds.remember_me));
    st.tokens.insert(&token).await?;
    let access_token = keys.sign(user.id, token.id, now, token.expires_at)?;

    info!(user_id = %user.id, token_id = %token.id, remember_me = creds.remember_me, "user logged in");
    Ok(LoginResponse {
        access_token,
        token_type: TOKEN_TYPE,
        expires_at: token.expires_at,
    })
}

pub async fn logout(st: &AppState, ctx: AuthContext) -> Result<(), ApiError> {
    st.tokens.revoke(ctx.token_id).await?;
    info!(user_id = %ctx.user_id, token_id = %ctx.token_id, "token revoked");
    Ok(())
}
