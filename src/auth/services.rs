use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, is_strong_password, verify_password, MIN_PASSWORD_LEN},
    },
    error::{unique_or_internal, AppError},
    state::AppState,
    users::repo_types::{Role, User, UserWrite},
};

pub const USERNAME_LEN: std::ops::RangeInclusive<usize> = 2..=50;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lower-cases, then checks the shape.
pub(crate) fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation("email: Invalid email".into()));
    }
    Ok(email)
}

pub(crate) fn validate_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    if !USERNAME_LEN.contains(&username.chars().count()) {
        return Err(AppError::Validation(
            "username: Username must be between 2 and 50 characters".into(),
        ));
    }
    // Keeps usernames disjoint from emails so a login identifier is unambiguous.
    if username.contains('@') {
        return Err(AppError::Validation(
            "username: Username must not contain '@'".into(),
        ));
    }
    Ok(username.to_string())
}

pub(crate) fn validate_password(plain: &str) -> Result<(), AppError> {
    if !is_strong_password(plain) {
        return Err(AppError::Validation(format!(
            "password: Password must be at least {MIN_PASSWORD_LEN} characters and contain a digit, \
             a lower-case letter, an upper-case letter and one of !@#$%^&+=. with no spaces"
        )));
    }
    Ok(())
}

/// Creates a USER account. The welcome email is best-effort.
pub async fn register(st: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    let username = validate_username(&req.username)?;
    let email = normalize_email(&req.email)?;
    validate_password(&req.password)?;

    if User::find_by_username(&st.db, &username).await?.is_some() {
        warn!(%username, "username already registered");
        return Err(AppError::AlreadyExists("Username is already taken".into()));
    }
    if User::find_by_email(&st.db, &email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(AppError::AlreadyExists("Email is already registered".into()));
    }

    let user = User::create(
        &st.db,
        &UserWrite {
            username,
            email,
            password_hash: hash_password(&req.password)?,
            role: Role::User,
        },
    )
    .await
    .map_err(|e| unique_or_internal(e, "Username or email is already taken"))?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    if let Err(e) = st.notifier.registration(&user.email, &user.username).await {
        warn!(error = %e, user_id = %user.id, "registration email failed");
    }
    Ok(user)
}

fn issue_tokens(st: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(st);
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id, user.role)?,
        refresh_token: keys.sign_refresh(user.id, user.role)?,
        user: user.into(),
    })
}

pub async fn login(st: &AppState, req: LoginRequest) -> Result<AuthResponse, AppError> {
    let identifier = req.identifier.trim();
    if identifier.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "identifier: Username or email and password are required".into(),
        ));
    }

    let Some(user) = User::find_by_identifier(&st.db, identifier).await? else {
        warn!(%identifier, "login unknown identifier");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };
    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    info!(user_id = %user.id, "user logged in");
    issue_tokens(st, user)
}

/// Role is re-read from the database so a demoted user does not keep admin rights.
pub async fn refresh(st: &AppState, req: RefreshRequest) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(st);
    let claims = keys.verify_refresh(&req.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("Invalid or expired refresh token".into())
    })?;
    let user = User::find_by_id(&st.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    issue_tokens(st, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.com"));
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(matches!(normalize_email("nope"), Err(AppError::Validation(_))));
    }

    #[test]
    fn username_length_bounds() {
        assert!(validate_username("a").is_err());
        assert_eq!(validate_username(" ab ").unwrap(), "ab");
        assert!(validate_username(&"x".repeat(50)).is_ok());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn username_cannot_look_like_an_email() {
        assert!(matches!(
            validate_username("bea@corp.com"),
            Err(AppError::Validation(_))
        ));
        assert!(validate_username("bea.corp").is_ok());
    }

    #[test]
    fn weak_password_message_names_the_field() {
        let err = validate_password("short").unwrap_err();
        assert!(err.to_string().starts_with("password:"));
        assert!(validate_password("Sup3r.Secret!").is_ok());
    }
}
