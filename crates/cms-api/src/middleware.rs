use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use cms_types::api::Claims;
use cms_types::models::Role;

use crate::Error;
use crate::auth::{AppState, decode_token};

/// Extract and validate the JWT from the Authorization header, then expose
/// its claims to handlers as an `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Error> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(Error::Unauthorized)?;

    let claims = decode_token(&state.jwt_secret, token)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Must be layered inside `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, Error> {
    let claims = req.extensions().get::<Claims>().ok_or(Error::Unauthorized)?;

    if claims.role != Role::Admin {
        return Err(Error::Forbidden("administrator role required"));
    }

    Ok(next.run(req).await)
}

/// Owners may read their own complaints; admins may read anyone's.
pub fn ensure_owner_or_admin(claims: &Claims, owner_id: i64) -> Result<(), Error> {
    if claims.role == Role::Admin || claims.id == owner_id {
        Ok(())
    } else {
        Err(Error::Forbidden("complaints belong to another user"))
    }
}
