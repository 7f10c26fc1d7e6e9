use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{AuthError, Claims};
use crate::error::ApiError;
use crate::models::{Role, Subrole};
use crate::AppState;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub subrole: Option<Subrole>,
    /// Raw bearer token, kept so logout can revoke it
    pub token: String,
    pub expires_at: i64,
}

impl AuthUser {
    pub fn new(claims: Claims, token: String) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
            subrole: claims.subrole,
            token,
            expires_at: claims.exp,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the role or the staff subrole is one of `allowed`
    /// (`"admin"`, `"staff"`, `"bursar"`, ...).
    pub fn has_any(&self, allowed: &[&str]) -> bool {
        allowed.iter().any(|name| {
            *name == self.role.as_str() || self.subrole.map(|s| s.as_str() == *name).unwrap_or(false)
        })
    }

    pub fn require_any(&self, allowed: &[&str]) -> Result<(), ApiError> {
        if self.has_any(allowed) {
            Ok(())
        } else {
            tracing::debug!("User {} ({}) denied, needs one of {:?}", self.user_id, self.role.as_str(), allowed);
            Err(AuthError::Forbidden.into())
        }
    }

    /// Admins may act on anyone; other users only on themselves.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(AuthError::Forbidden.into())
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Resolve the bearer token in `headers` to a user context.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = extract_jwt_from_headers(headers)?;
    let claims = state.tokens.verify(&token)?;

    if state.revocations.is_revoked(&token).await {
        return Err(AuthError::Revoked.into());
    }

    Ok(AuthUser::new(claims, token))
}

/// Extract JWT token from Authorization header. Only a missing header is
/// `MissingToken`; a header without a usable bearer token is `InvalidToken`.
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, AuthError> {
    let auth_str = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::InvalidToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn user(role: Role, subrole: Option<Subrole>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
            subrole,
            token: "t".into(),
            expires_at: 0,
        }
    }

    #[test]
    fn subroles_satisfy_gates_that_name_them() {
        let bursar = user(Role::Staff, Some(Subrole::Bursar));
        assert!(bursar.has_any(&["admin", "bursar"]));
        assert!(bursar.has_any(&["staff"]));

        let teacher = user(Role::Staff, Some(Subrole::Teacher));
        assert!(!teacher.has_any(&["admin", "bursar"]));
        assert!(teacher.require_any(&["admin"]).is_err());

        let admin = user(Role::Admin, None);
        assert!(admin.require_self_or_admin(Uuid::new_v4()).is_ok());
        assert!(teacher.require_self_or_admin(teacher.user_id).is_ok());
        assert!(teacher.require_self_or_admin(Uuid::new_v4()).is_err());
    }

    #[test]
    fn bearer_token_is_required() {
        let mut headers = HeaderMap::new();
        assert!(matches!(extract_jwt_from_headers(&headers), Err(AuthError::MissingToken)));

        headers.insert("authorization", HeaderValue::from_static("Token abc"));
        assert!(matches!(extract_jwt_from_headers(&headers), Err(AuthError::InvalidToken)));

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(matches!(extract_jwt_from_headers(&headers), Err(AuthError::InvalidToken)));

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }
}
