use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{Role, User};
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub async fn register(
    db: &PgPool,
    keys: &JwtKeys,
    payload: RegisterRequest,
) -> Result<RegisterResponse, ApiError> {
    if User::find_by_email(db, &payload.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let role = payload
        .role
        .as_deref()
        .and_then(Role::parse)
        .unwrap_or(Role::Student);
    let hash = hash_password(&payload.password)?;
    let user = User::create(db, &payload.email, &hash, payload.name.as_deref(), role).await?;
    let token = keys.sign(user.id, &user.email, user.role)?;

    info!(user_id = %user.id, email = %user.email, role = ?user.role, "user registered");
    Ok(RegisterResponse { user, token })
}

/// Account gate, applied before the password is ever checked: a deactivated
/// account is refused outright. Absent user and wrong password share one
/// message so the endpoint never reveals whether an email is registered.
fn check_account(user: Option<User>) -> Result<User, ApiError> {
    let user = user.ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;
    if !user.is_active {
        return Err(ApiError::Forbidden("Account is deactivated".to_string()));
    }
    Ok(user)
}

pub async fn login(
    db: &PgPool,
    keys: &JwtKeys,
    payload: LoginRequest,
) -> Result<LoginResponse, ApiError> {
    let user = check_account(User::find_by_email(db, &payload.email).await?)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = keys.sign(user.id, &user.email, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(LoginResponse {
        user: user.into(),
        token,
    })
}

pub async fn get_user_by_id(db: &PgPool, id: Uuid) -> Result<User, ApiError> {
    User::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn email_regex_rejects_malformed_addresses() {
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@b.com"));
    }

    fn user(is_active: bool) -> User {
        let now = time::OffsetDateTime::now_utc();
        User {
            id: uuid::Uuid::new_v4(),
            email: "a@b.com".into(),
            // The gate must reject before this is ever inspected.
            password_hash: "not-a-real-hash".into(),
            name: Some("Alice Student".into()),
            role: Role::Student,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unknown_account_gets_generic_unauthorized() {
        let err = check_account(None).unwrap_err();
        let ApiError::Unauthorized(msg) = err else {
            panic!("expected unauthorized");
        };
        assert_eq!(msg, "Invalid email or password");
    }

    #[test]
    fn deactivated_account_is_refused_before_password_check() {
        let err = check_account(Some(user(false))).unwrap_err();
        let ApiError::Forbidden(msg) = err else {
            panic!("expected forbidden");
        };
        assert_eq!(msg, "Account is deactivated");
    }

    #[test]
    fn active_account_passes_the_gate() {
        assert!(check_account(Some(user(true))).is_ok());
    }
}
