use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub exp: usize,
}

/// Who is calling. Set by [`session_middleware`]; anonymous when there is no valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentUser {
    Anonymous,
    User(Uuid),
}

impl CurrentUser {
    pub fn require(&self) -> Result<Uuid, AppError> {
        match self {
            CurrentUser::User(id) => Ok(*id),
            CurrentUser::Anonymous => Err(AppError::AuthenticationError(
                "Please log in first".to_string(),
            )),
        }
    }

    /// Only the owner may act on their own records.
    pub fn require_owner(&self, owner_id: Uuid) -> Result<Uuid, AppError> {
        let id = self.require()?;
        if id != owner_id {
            return Err(AppError::AuthorizationError(
                "Reservation belongs to another user".to_string(),
            ));
        }
        Ok(id)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .unwrap_or(CurrentUser::Anonymous))
    }
}

pub fn issue_token(secret: &str, user_id: Uuid, ttl_seconds: u64) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::seconds(ttl_seconds as i64)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

fn session_from_header(secret: &str, header: Option<&str>) -> CurrentUser {
    let Some(token) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return CurrentUser::Anonymous;
    };

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default()) {
        Ok(data) => match Uuid::parse_str(&data.claims.sub) {
            Ok(id) => CurrentUser::User(id),
            Err(_) => CurrentUser::Anonymous,
        },
        Err(e) => {
            tracing::debug!("Rejected bearer token: {}", e);
            CurrentUser::Anonymous
        }
    }
}

pub async fn session_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    let user = session_from_header(&state.auth.secret, header);

    req.extensions_mut().insert(user);
    next.run(req).await
}
