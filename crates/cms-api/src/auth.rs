use std::sync::Arc;

use anyhow::{Context, anyhow};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use cms_db::{Database, is_unique_violation};
use cms_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use cms_types::models::Role;

use crate::Error;
use crate::blocking;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

// -- Handlers --

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, Error>,
) -> Result<impl IntoResponse, Error> {
    let token = blocking(&state, move |s| register_user(s, req)).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, Error>,
) -> Result<impl IntoResponse, Error> {
    let token = blocking(&state, move |s| login_user(s, req)).await?;
    Ok(Json(AuthResponse { token }))
}

// -- Service --

/// Creates a `USER` account and returns a token for it.
pub fn register_user(state: &AppStateInner, req: RegisterRequest) -> Result<String, Error> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(Error::BadRequest("username, email and password are required".into()));
    }

    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(Error::Conflict(format!("email {} is already registered", req.email)));
    }

    let password_hash = hash_password(&req.password)?;

    // A concurrent registration can still win the race; the UNIQUE index decides
    let id = state
        .db
        .create_user(&req.username, &req.email, &password_hash, Role::User.as_str())
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("email {} is already registered", req.email))
            } else {
                Error::Internal(e)
            }
        })?;

    info!("Registered user {} ({})", id, req.email);

    Ok(issue_token(&state.jwt_secret, state.token_ttl, id, &req.email, Role::User)?)
}

/// Verifies credentials and returns a fresh token.
pub fn login_user(state: &AppStateInner, req: LoginRequest) -> Result<String, Error> {
    let user = state.db.get_user_by_email(&req.email)?.ok_or_else(|| {
        warn!("Login rejected: unknown email {}", req.email);
        Error::InvalidCredentials
    })?;

    if !password_matches(&user.password, &req.password)
        .with_context(|| format!("corrupt password hash for user {}", user.id))?
    {
        warn!("Login rejected: wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let role: Role = user.role.parse().map_err(anyhow::Error::from)?;

    Ok(issue_token(&state.jwt_secret, state.token_ttl, user.id, &user.email, role)?)
}

/// Creates the account if needed and gives it the `ADMIN` role.
pub fn ensure_admin(db: &Database, username: &str, email: &str, password: &str) -> anyhow::Result<i64> {
    let id = match db.get_user_by_email(email)? {
        Some(user) => {
            // The stored password is kept; say so if it differs from the configured one
            if !password_matches(&user.password, password)? {
                warn!(
                    "Admin account {} already exists with a different password; configured password ignored",
                    email
                );
            }
            db.set_user_role(user.id, Role::Admin.as_str())?;
            user.id
        }
        None => db.create_user(username, email, &hash_password(password)?, Role::Admin.as_str())?,
    };

    info!("Admin account ready: {} ({})", id, email);
    Ok(id)
}

// -- Passwords & tokens --

fn hash_password(password: &str) -> anyhow::Result<String> {
    // Argon2id with a fresh random salt
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// `Ok(false)` on a wrong password, `Err` only when the stored hash is unreadable.
fn password_matches(password_hash: &str, password: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|e| anyhow!("invalid password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: i64,
    email: &str,
    role: Role,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let expires_at = now
        .checked_add_signed(ttl)
        .context("token expiry is outside the representable date range")?;
    let claims = Claims {
        sub: email.to_string(),
        id: user_id,
        role,
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Checks signature and expiry.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| Error::Unauthorized)?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppStateInner {
        AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            token_ttl: chrono::Duration::hours(1),
        }
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: "ana".into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn register_stores_hash_and_issues_user_token() {
        let state = state();
        let token = register_user(&state, register_req("ana@example.com", "correct horse")).unwrap();

        let stored = state.db.get_user_by_email("ana@example.com").unwrap().unwrap();
        assert_ne!(stored.password, "correct horse");
        assert!(stored.password.starts_with("$argon2id$"));
        assert_eq!(stored.role, "USER");

        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.id, stored.id);
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.sub, "ana@example.com");
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let state = state();
        register_user(&state, register_req("ana@example.com", "pw-one")).unwrap();

        let err = register_user(&state, register_req("ana@example.com", "pw-two")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn register_rejects_blank_fields() {
        let err = register_user(&state(), register_req("  ", "pw")).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn login_with_correct_password_yields_decodable_token() {
        let state = state();
        register_user(&state, register_req("ana@example.com", "s3cret!")).unwrap();
        let id = state.db.get_user_by_email("ana@example.com").unwrap().unwrap().id;

        let token = login_user(&state, login_req("ana@example.com", "s3cret!")).unwrap();
        let claims = decode_token("test-secret", &token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.role, Role::User);
    }

    #[test]
    fn login_with_wrong_password_or_unknown_email_fails() {
        let state = state();
        register_user(&state, register_req("ana@example.com", "s3cret!")).unwrap();

        let err = login_user(&state, login_req("ana@example.com", "guess")).unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));

        let err = login_user(&state, login_req("bob@example.com", "s3cret!")).unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
    }

    #[test]
    fn ensure_admin_promotes_existing_account() {
        let state = state();
        register_user(&state, register_req("root@example.com", "pw")).unwrap();

        let id = ensure_admin(&state.db, "root", "root@example.com", "ignored").unwrap();
        assert_eq!(state.db.get_user_by_id(id).unwrap().unwrap().role, "ADMIN");

        // Existing password is kept
        let token = login_user(&state, login_req("root@example.com", "pw")).unwrap();
        assert_eq!(decode_token("test-secret", &token).unwrap().role, Role::Admin);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = issue_token("other-secret", chrono::Duration::hours(1), 1, "a@b.c", Role::Admin).unwrap();
        assert!(matches!(decode_token("test-secret", &token), Err(Error::Unauthorized)));
    }

    #[test]
    fn oversized_token_lifetime_is_an_error_not_a_panic() {
        let result = issue_token("test-secret", chrono::Duration::hours(3_000_000_000), 1, "a@b.c", Role::User);
        assert!(result.is_err());
    }

    #[test]
    fn password_matches_distinguishes_wrong_password_from_bad_hash() {
        let password_hash = hash_password("s3cret!").unwrap();
        assert!(password_matches(&password_hash, "s3cret!").unwrap());
        assert!(!password_matches(&password_hash, "guess").unwrap());
        assert!(password_matches("not-a-phc-string", "s3cret!").is_err());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = issue_token("test-secret", chrono::Duration::hours(-2), 1, "a@b.c", Role::User).unwrap();
        assert!(matches!(decode_token("test-secret", &token), Err(Error::Unauthorized)));
    }
}
