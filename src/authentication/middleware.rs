use warp::{reject::Rejection, Filter};

use crate::{constants::SESSION_COOKIE, error::ServiceError, routes::reply::reject};

use super::jwt::{verify_jwt_session, SessionData, SessionKey};

/// Pulls the raw token from `Authorization: Token <jwt>` / `Bearer <jwt>`,
/// falling back to the session cookie.
pub fn extract_token(header: Option<String>, cookie: Option<String>) -> Option<String> {
    header
        .and_then(|value| {
            let value = value.trim();
            ["Token ", "Bearer "]
                .iter()
                .find_map(|scheme| value.strip_prefix(scheme))
                .map(|token| token.trim().to_string())
        })
        .filter(|token| !token.is_empty())
        .or(cookie.filter(|token| !token.is_empty()))
}

fn with_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>(SESSION_COOKIE))
        .map(extract_token)
}

/// Requires a valid session.
pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_token().and_then(move |token: Option<String>| {
        let key = key.clone();
        async move {
            let token = token.ok_or_else(|| {
                reject(ServiceError::Unauthorized(
                    "Authentication credentials were not provided".to_owned(),
                ))
            })?;

            verify_jwt_session(&token, &key)
                .map(Into::<SessionData>::into)
                .map_err(reject)
        }
    })
}

/// Anonymous requests pass through as `None`; a token that is present but
/// invalid is still rejected.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    with_token().and_then(move |token: Option<String>| {
        let key = key.clone();
        async move {
            match token {
                Some(token) => verify_jwt_session(&token, &key)
                    .map(|data| Some(Into::<SessionData>::into(data)))
                    .map_err(reject),
                None => Ok(None),
            }
        }
    })
}
