use std::convert::Infallible;

use serde::Serialize;
use warp::{
    http::StatusCode,
    reject::{self, Reject, Rejection},
    Reply,
};

use crate::error::{ServiceError, TypeError};

/// A failed request carrying the status it should be answered with.
#[derive(Debug)]
pub struct Failure {
    pub status: StatusCode,
    pub info: String,
}

impl Reject for Failure {}

impl From<potion::Error> for Failure {
    fn from(e: potion::Error) -> Self {
        let status =
            StatusCode::from_u16(e.code as u16).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let info = e.info.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_owned()
        });

        Self { status, info }
    }
}

impl From<ServiceError> for Failure {
    fn from(e: ServiceError) -> Self {
        Self {
            status: StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_REQUEST),
            info: e.to_string(),
        }
    }
}

impl From<TypeError> for Failure {
    fn from(e: TypeError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            info: e.info().to_owned(),
        }
    }
}

pub fn reject(e: impl Into<Failure>) -> Rejection {
    reject::custom(e.into())
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

fn error_reply(status: StatusCode, info: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&ErrorBody { error: info }), status)
}

/// Renders every rejection as `{"error": ...}`.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(failure) = err.find::<Failure>() {
        if failure.status.is_server_error() {
            log::error!("Request failed: {}", failure.info);
        }
        return Ok(error_reply(failure.status, &failure.info));
    }

    if err.is_not_found() {
        return Ok(error_reply(StatusCode::NOT_FOUND, "Not found"));
    }

    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(error_reply(StatusCode::BAD_REQUEST, &e.to_string()));
    }

    if err.find::<reject::PayloadTooLarge>().is_some() {
        return Ok(error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Payload too large"));
    }

    if err.find::<reject::MethodNotAllowed>().is_some() {
        return Ok(error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"));
    }

    log::error!("Unhandled rejection: {:?}", err);
    Ok(error_reply(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_keep_their_status() {
        let failure = Failure::from(ServiceError::PermissionDenied("no".into()));
        assert_eq!(failure.status, StatusCode::FORBIDDEN);
        assert_eq!(failure.info, "no");
    }

    #[test]
    fn potion_errors_map_their_code() {
        let err: potion::Error = ServiceError::NotFound("gone".into()).into();
        let failure = Failure::from(err);
        assert_eq!(failure.status, StatusCode::NOT_FOUND);
        assert_eq!(failure.info, "gone");
    }

    #[test]
    fn type_errors_are_bad_requests() {
        let failure = Failure::from(TypeError::new("Invalid type conversion"));
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.info, "Invalid type conversion");
    }
}
