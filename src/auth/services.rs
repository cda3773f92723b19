use axum::extract::FromRef;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::LoginRequest,
        jwt::{JwtKeys, TokenKind},
    },
    error::{ServiceError, ServiceResult},
    state::AppState,
    users::User,
};

fn unauthorized() -> ServiceError {
    ServiceError::Unauthorized("Unauthorized".into())
}

/// Tokens issued on a successful login.
#[derive(Debug)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn login(state: &AppState, req: LoginRequest) -> ServiceResult<Session> {
    let (Some(username), Some(password)) = (
        req.username.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        req.password.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(ServiceError::validation("All fields are required"));
    };

    let user = match state.users.store().find_by_username(username).await? {
        Some(u) if u.active => u,
        Some(u) => {
            let _ = state.users.passwords().verify(password, &u.password_hash);
            warn!(user_id = %u.id, "login to inactive account");
            return Err(unauthorized());
        }
        None => {
            state.users.passwords().verify_dummy(password);
            warn!(username = %username, "login unknown username");
            return Err(unauthorized());
        }
    };

    if !state.users.passwords().verify(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(unauthorized());
    }

    if !user.email_verified {
        warn!(user_id = %user.id, "login before email confirmation");
        return Err(ServiceError::Forbidden(
            "Please verify your email before signing in".into(),
        ));
    }

    let keys = JwtKeys::from_ref(state);
    let session = Session {
        access_token: keys.sign_access(&user)?,
        refresh_token: keys.sign_refresh(&user)?,
    };
    info!(user_id = %user.id, username = %user.username, "user logged in");
    Ok(session)
}

/// Exchanges a refresh token for a new access token.
pub async fn refresh(state: &AppState, refresh_token: Option<&str>) -> ServiceResult<String> {
    let token = refresh_token.ok_or_else(unauthorized)?;
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_kind(token, TokenKind::Refresh).map_err(|e| {
        warn!(error = %e, "refresh with bad token");
        ServiceError::Forbidden("Forbidden".into())
    })?;

    let user = match state.users.store().find_by_id(claims.sub).await? {
        Some(u) if u.active => u,
        _ => {
            warn!(user_id = %claims.sub, "refresh for missing or inactive user");
            return Err(unauthorized());
        }
    };
    Ok(keys.sign_access(&user)?)
}

/// Signs a verification token for `user` and mails the confirmation link.
pub async fn send_verification(state: &AppState, user: &User) -> anyhow::Result<()> {
    let token = JwtKeys::from_ref(state).sign_verify(user)?;
    let link = format!(
        "{}/auth/verification/{}",
        state.config.public_url.trim_end_matches('/'),
        token
    );
    state.mailer.send_verification(&user.email, &link).await?;
    info!(user_id = %user.id, "verification email sent");
    Ok(())
}

pub async fn resend_verification(state: &AppState, email: &str) -> ServiceResult<String> {
    let email = email.trim();
    let user = state
        .users
        .store()
        .find_by_email(email)
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))?;
    if user.email_verified {
        return Err(ServiceError::validation("Email already verified"));
    }
    send_verification(state, &user).await?;
    Ok(format!("Verification email sent to {}", user.email))
}

pub async fn confirm_email(state: &AppState, token: &str) -> ServiceResult<String> {
    let invalid = || ServiceError::validation("Invalid or expired verification link");
    let claims = JwtKeys::from_ref(state)
        .verify_kind(token, TokenKind::Verify)
        .map_err(|e| {
            warn!(error = %e, "bad verification token");
            invalid()
        })?;
    let user = state
        .users
        .store()
        .mark_email_verified(claims.sub)
        .await?
        .ok_or_else(invalid)?;
    info!(user_id = %user.id, "email verified");
    Ok(format!("{} verified", user.email))
}
