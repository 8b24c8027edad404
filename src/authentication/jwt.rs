use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::{ConfigError, ServiceError};
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

/// HMAC key shared with the identity service that issues session tokens.
#[derive(Clone)]
pub struct SessionKey {
    key: Hmac<Sha256>,
}

impl SessionKey {
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|e| ConfigError::new(format!("Invalid JWT secret: {e}")))?;

        Ok(Self { key })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(1)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }

    pub fn expired(mut self) -> Self {
        self.exp = self.iat - 1;
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ServiceError> {
        if !action.authenticate(&self) {
            return Err(ServiceError::PermissionDenied(
                "You don't have permission to perform this action".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Into<SessionData> for JwtSessionData {
    fn into(self) -> SessionData {
        SessionData {
            username: self.username,
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Signs claims the same way the identity service does.
pub fn sign_jwt_session(claims: &JwtSessionData, key: &SessionKey) -> Result<String, ServiceError> {
    claims
        .sign_with_key(&key.key)
        .map_err(|e| ServiceError::Unauthorized(format!("Could not sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, key: &SessionKey) -> Result<JwtSessionData, ServiceError> {
    let session: JwtSessionData = token
        .verify_with_key(&key.key)
        .map_err(|_| ServiceError::Unauthorized("Invalid session; Invalid token".to_owned()))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(ServiceError::Unauthorized(
            "Invalid session; Token expired".to_owned(),
        ));
    }

    Ok(session)
}
